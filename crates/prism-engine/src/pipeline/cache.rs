use std::hash::Hash;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::resources::ResourceId;

/// Bound resource identities of one bind group, in binding order.
pub(crate) type BindingKey = SmallVec<[ResourceId; 8]>;

/// Color-target formats of a render pipeline, in attachment order.
pub(crate) type FormatKey = SmallVec<[wgpu::TextureFormat; 8]>;

/// Bind groups kept per program before the cache is flushed.
const MAX_BIND_GROUPS: usize = 16;

/// Hit/miss counters of a program's bind-group cache.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Bounded map from resource identities to a built value.
///
/// Identities change whenever a resource is resized or replaced, so stale
/// entries are never hit; the bound only limits how many linger.
#[derive(Debug)]
pub(crate) struct IdentityCache<K, V> {
    entries: FxHashMap<K, V>,
    capacity: usize,
    hits: u64,
    misses: u64,
}

impl<K: Hash + Eq, V: Clone> IdentityCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self { entries: FxHashMap::default(), capacity, hits: 0, misses: 0 }
    }

    pub fn get_or_insert_with<E>(&mut self, key: K, build: impl FnOnce() -> Result<V, E>) -> Result<V, E> {
        if let Some(v) = self.entries.get(&key) {
            self.hits += 1;
            return Ok(v.clone());
        }
        self.misses += 1;
        let v = build()?;
        if self.entries.len() >= self.capacity {
            self.entries.clear();
        }
        self.entries.insert(key, v.clone());
        Ok(v)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats { hits: self.hits, misses: self.misses, entries: self.entries.len() }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

pub(crate) type BindGroupCache = IdentityCache<BindingKey, wgpu::BindGroup>;

impl BindGroupCache {
    pub fn bind_groups() -> Self {
        Self::new(MAX_BIND_GROUPS)
    }
}

/// Context-wide bind group layouts, deduplicated by entry list.
#[derive(Debug, Default)]
pub(crate) struct LayoutCache {
    layouts: FxHashMap<Vec<wgpu::BindGroupLayoutEntry>, wgpu::BindGroupLayout>,
}

impl LayoutCache {
    pub fn get_or_create(
        &mut self,
        device: &wgpu::Device,
        entries: Vec<wgpu::BindGroupLayoutEntry>,
    ) -> wgpu::BindGroupLayout {
        self.layouts
            .entry(entries)
            .or_insert_with_key(|entries| {
                log::trace!("bind group layout miss ({} entries)", entries.len());
                device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("prism bind group layout"),
                    entries,
                })
            })
            .clone()
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn clear(&mut self) {
        self.layouts.clear();
    }
}
