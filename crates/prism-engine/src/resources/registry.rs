use rustc_hash::FxHashMap;
use slotmap::SlotMap;

use crate::binding::plan::ResourceInfo;
use crate::binding::TextureRef;
use crate::error::{Error, Result};

use super::ids::{ContextId, ResourceId, ResourceIds, SamplerKey, StorageKey, TargetKey, TextureKey};
use super::sampler::{Sampler, SamplerEntry, SamplerOptions};
use super::storage::{StorageBuffer, StorageEntry};
use super::target::{RenderTarget, TargetEntry};
use super::texture::{Texture, TextureEntry};

/// Live resource counts, mostly for leak checks in tests.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ResourceCounts {
    pub targets: usize,
    pub textures: usize,
    pub storage_buffers: usize,
    /// Distinct GPU samplers, not handles.
    pub samplers: usize,
}

/// Borrowed view of a target or texture for binding.
pub(crate) struct BoundImage<'a> {
    pub view: &'a wgpu::TextureView,
    pub format: wgpu::TextureFormat,
    pub sampler: SamplerOptions,
    pub id: ResourceId,
}

/// Arena of every GPU resource a context owns.
///
/// Lookups validate that a handle belongs to this context and has not been
/// disposed. Removal destroys the GPU object immediately.
pub(crate) struct Registry {
    pub ctx: ContextId,
    pub ids: ResourceIds,
    targets: SlotMap<TargetKey, TargetEntry>,
    textures: SlotMap<TextureKey, TextureEntry>,
    storages: SlotMap<StorageKey, StorageEntry>,
    sampler_handles: SlotMap<SamplerKey, SamplerOptions>,
    samplers: FxHashMap<SamplerOptions, SamplerEntry>,
}

impl Registry {
    pub fn new(ctx: ContextId) -> Self {
        Self {
            ctx,
            ids: ResourceIds::default(),
            targets: SlotMap::with_key(),
            textures: SlotMap::with_key(),
            storages: SlotMap::with_key(),
            sampler_handles: SlotMap::with_key(),
            samplers: FxHashMap::default(),
        }
    }

    fn check_owner(&self, owner: ContextId, what: &'static str) -> Result<()> {
        if owner == self.ctx {
            Ok(())
        } else {
            Err(Error::ForeignHandle(what))
        }
    }

    // ── targets ──────────────────────────────────────────────────────────

    pub fn insert_target(&mut self, entry: TargetEntry) -> RenderTarget {
        RenderTarget { ctx: self.ctx, key: self.targets.insert(entry) }
    }

    pub fn target(&self, t: RenderTarget) -> Result<&TargetEntry> {
        self.check_owner(t.ctx, "render target")?;
        self.targets.get(t.key).ok_or(Error::Disposed("render target"))
    }

    /// Swaps in a new allocation under the same handle; the old texture is destroyed.
    pub fn replace_target(&mut self, key: TargetKey, mut fresh: TargetEntry) {
        if let Some(slot) = self.targets.get_mut(key) {
            fresh.pinned = slot.pinned;
            let old = std::mem::replace(slot, fresh);
            log::debug!("target {:?} replaced by {:?}", old.id, slot.id);
            old.texture.destroy();
        }
    }

    pub fn remove_target(&mut self, key: TargetKey) {
        match self.targets.get(key) {
            Some(e) if e.pinned => log::debug!("ignoring dispose of context-owned target {:?}", e.id),
            Some(_) => {
                if let Some(e) = self.targets.remove(key) {
                    log::debug!("target {:?} disposed", e.id);
                    e.texture.destroy();
                }
            }
            None => {}
        }
    }

    // ── textures ─────────────────────────────────────────────────────────

    pub fn insert_texture(&mut self, entry: TextureEntry) -> Texture {
        Texture { ctx: self.ctx, key: self.textures.insert(entry) }
    }

    pub fn texture(&self, t: Texture) -> Result<&TextureEntry> {
        self.check_owner(t.ctx, "texture")?;
        self.textures.get(t.key).ok_or(Error::Disposed("texture"))
    }

    pub fn remove_texture(&mut self, key: TextureKey) {
        if let Some(e) = self.textures.remove(key) {
            log::debug!("texture {:?} disposed", e.id);
            e.texture.destroy();
        }
    }

    // ── storage ──────────────────────────────────────────────────────────

    pub fn insert_storage(&mut self, entry: StorageEntry) -> StorageBuffer {
        StorageBuffer { ctx: self.ctx, key: self.storages.insert(entry) }
    }

    pub fn storage(&self, s: StorageBuffer) -> Result<&StorageEntry> {
        self.check_owner(s.ctx, "storage buffer")?;
        self.storages.get(s.key).ok_or(Error::Disposed("storage buffer"))
    }

    pub fn remove_storage(&mut self, key: StorageKey) {
        if let Some(e) = self.storages.remove(key) {
            log::debug!("storage {:?} disposed", e.id);
            e.buffer.destroy();
        }
    }

    // ── samplers ─────────────────────────────────────────────────────────

    fn sampler_entry(&mut self, device: &wgpu::Device, options: SamplerOptions) -> &mut SamplerEntry {
        let ids = &mut self.ids;
        self.samplers.entry(options).or_insert_with(|| {
            let id = ids.allocate();
            log::debug!("sampler {id:?} created: {options:?}");
            SamplerEntry { sampler: options.create(device), refs: 0, pinned: false, id }
        })
    }

    /// New caller handle; shares the GPU sampler with equal options.
    pub fn acquire_sampler(&mut self, device: &wgpu::Device, options: SamplerOptions) -> Sampler {
        self.sampler_entry(device, options).refs += 1;
        Sampler { ctx: self.ctx, key: self.sampler_handles.insert(options) }
    }

    /// Makes sure an implicit sampler for `options` exists for the context's lifetime.
    pub fn ensure_implicit_sampler(&mut self, device: &wgpu::Device, options: SamplerOptions) {
        self.sampler_entry(device, options).pinned = true;
    }

    pub fn implicit_sampler(&self, options: &SamplerOptions) -> Option<&SamplerEntry> {
        self.samplers.get(options).filter(|e| e.pinned)
    }

    pub fn sampler_options(&self, s: Sampler) -> Result<SamplerOptions> {
        self.check_owner(s.ctx, "sampler")?;
        self.sampler_handles.get(s.key).copied().ok_or(Error::Disposed("sampler"))
    }

    pub fn sampler(&self, s: Sampler) -> Result<(&SamplerEntry, SamplerOptions)> {
        let options = self.sampler_options(s)?;
        let entry = self.samplers.get(&options).ok_or(Error::Disposed("sampler"))?;
        Ok((entry, options))
    }

    pub fn release_sampler(&mut self, key: SamplerKey) {
        let Some(options) = self.sampler_handles.remove(key) else { return };
        let drop_entry = match self.samplers.get_mut(&options) {
            Some(e) => {
                e.refs = e.refs.saturating_sub(1);
                e.refs == 0 && !e.pinned
            }
            None => false,
        };
        if drop_entry {
            if let Some(e) = self.samplers.remove(&options) {
                log::debug!("sampler {:?} released", e.id);
            }
        }
    }

    // ── binding lookups ──────────────────────────────────────────────────

    /// Everything a bind group needs from a sampled image.
    pub fn image(&self, image: &TextureRef) -> Result<BoundImage<'_>> {
        Ok(match image {
            TextureRef::Target(t) => {
                let e = self.target(*t)?;
                BoundImage { view: &e.view, format: e.format(), sampler: e.options.sampler, id: e.id }
            }
            TextureRef::Texture(t) => {
                let e = self.texture(*t)?;
                BoundImage { view: &e.view, format: e.format, sampler: e.sampler, id: e.id }
            }
        })
    }

    // ── lifecycle ────────────────────────────────────────────────────────

    pub fn counts(&self) -> ResourceCounts {
        ResourceCounts {
            targets: self.targets.len(),
            textures: self.textures.len(),
            storage_buffers: self.storages.len(),
            samplers: self.samplers.len(),
        }
    }

    /// Destroys everything, pinned entries included.
    pub fn release_all(&mut self) {
        let counts = self.counts();
        for (_, e) in self.targets.drain() {
            e.texture.destroy();
        }
        for (_, e) in self.textures.drain() {
            e.texture.destroy();
        }
        for (_, e) in self.storages.drain() {
            e.buffer.destroy();
        }
        self.sampler_handles.clear();
        self.samplers.clear();
        log::debug!("registry released: {counts:?}");
    }

    pub fn next_id(&mut self) -> ResourceId {
        self.ids.allocate()
    }
}

impl ResourceInfo for Registry {
    fn image_format(&self, image: &TextureRef) -> Result<wgpu::TextureFormat> {
        self.image(image).map(|i| i.format)
    }

    fn target_format(&self, target: RenderTarget) -> Result<wgpu::TextureFormat> {
        self.target(target).map(TargetEntry::format)
    }

    fn sampler_filtering(&self, sampler: Sampler) -> Result<bool> {
        self.sampler_options(sampler).map(|o| o.is_filtering())
    }
}
