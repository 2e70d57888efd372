//! Derivation of a [`BindingPlan`] from scanned shader source and a caller
//! uniform dictionary.
//!
//! Conventions:
//! - group 0 holds only `globals`, auto-declared when referenced
//! - group 1 holds the simple-style block `u` at binding 0 (when present)
//!   followed by one slot per manual binding
//! - declared slots keep their binding; undeclared ones take the lowest free
//!   binding in insertion order

use std::collections::BTreeSet;
use std::fmt::Write as _;

use prism_wgsl::{Access, AddressSpace, Declaration, ShaderScan, WgslType};
use wgpu::TextureFormat;

use crate::error::{Error, Result};
use crate::resources::format::{from_wgsl_storage_name, is_filterable, wgsl_storage_name};
use crate::resources::{RenderTarget, Sampler};

use super::globals::{GlobalField, GLOBALS_NAME, GLOBALS_WGSL};
use super::kind::{UniformDescriptor, UniformKind};
use super::packing::{layout_block, BlockField};
use super::value::{BindingValue, TextureRef, UniformStyle, Uniforms};

/// Name of the simple-style uniform block.
pub const BLOCK_NAME: &str = "u";
const BLOCK_STRUCT: &str = "Uniforms";
const SAMPLER_SUFFIX: &str = "_sampler";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ProgramStage {
    /// Pass or material: vertex + fragment.
    Raster,
    Compute,
}

/// Resource facts the plan needs from values (formats decide sample types).
pub(crate) trait ResourceInfo {
    fn image_format(&self, image: &TextureRef) -> Result<TextureFormat>;
    fn target_format(&self, target: RenderTarget) -> Result<TextureFormat>;
    fn sampler_filtering(&self, sampler: Sampler) -> Result<bool>;
}

/// The packed simple-style block at `@group(1) @binding(0)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UniformBlock {
    pub struct_name: String,
    pub fields: Vec<BlockField>,
    pub size: u32,
    /// `u` is declared by the source rather than injected.
    pub declared: bool,
}

impl UniformBlock {
    pub fn field(&self, name: &str) -> Option<&BlockField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// One group-1 binding other than the block.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Slot {
    pub name: String,
    pub binding: u32,
    pub kind: UniformKind,
    pub array_size: Option<u32>,
    pub declared: bool,
    /// Sampler filled from this texture's own sampler options.
    pub implicit_for: Option<String>,
    wgsl_type: String,
}

/// Immutable binding layout of one program.
///
/// Equal sources and equal dictionaries produce equal plans.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindingPlan {
    stage: ProgramStage,
    globals: Vec<GlobalField>,
    globals_binding: bool,
    block: Option<UniformBlock>,
    slots: Vec<Slot>,
    preambles: Vec<String>,
}

impl BindingPlan {
    pub fn stage(&self) -> ProgramStage {
        self.stage
    }

    /// Referenced reserved fields, in canonical order.
    pub fn globals(&self) -> &[GlobalField] {
        &self.globals
    }

    /// `true` when group 0 is part of the layout.
    pub fn uses_globals(&self) -> bool {
        self.globals_binding
    }

    pub fn uses_locals(&self) -> bool {
        self.block.is_some() || !self.slots.is_empty()
    }

    pub fn block(&self) -> Option<&UniformBlock> {
        self.block.as_ref()
    }

    /// Group-1 slots ordered by binding.
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn slot(&self, name: &str) -> Option<&Slot> {
        self.slots.iter().find(|s| s.name == name)
    }

    pub fn has_uniform(&self, name: &str) -> bool {
        self.slot(name).is_some() || self.block.as_ref().is_some_and(|b| b.field(name).is_some())
    }

    /// Declarations injected ahead of module `index` (in the order the
    /// sources were given).
    pub fn preamble(&self, index: usize) -> &str {
        self.preambles.get(index).map(String::as_str).unwrap_or("")
    }

    /// Caller-visible bindings: block fields first, then slots.
    pub fn descriptors(&self) -> Vec<UniformDescriptor> {
        let block = self.block.iter().flat_map(|b| &b.fields).map(|f| UniformDescriptor {
            name: f.name.clone(),
            kind: f.kind.clone(),
            array_size: None,
        });
        let slots = self.slots.iter().map(|s| UniformDescriptor {
            name: s.name.clone(),
            kind: s.kind.clone(),
            array_size: s.array_size,
        });
        block.chain(slots).collect()
    }
}

// ── derivation ────────────────────────────────────────────────────────────

struct Builder<'a> {
    label: &'a str,
    stage: ProgramStage,
    scans: &'a [&'a ShaderScan],
    uniforms: &'a Uniforms,
    info: &'a dyn ResourceInfo,
}

pub(crate) fn build_plan(
    label: &str,
    stage: ProgramStage,
    scans: &[&ShaderScan],
    uniforms: &Uniforms,
    info: &dyn ResourceInfo,
) -> Result<BindingPlan> {
    Builder { label, stage, scans, uniforms, info }.build()
}

impl Builder<'_> {
    fn err(&self, message: impl Into<String>) -> Error {
        Error::binding(self.label, message)
    }

    fn build(&self) -> Result<BindingPlan> {
        let decls = self.merged_declarations()?;
        self.check_groups(&decls)?;

        let globals: BTreeSet<GlobalField> = self
            .scans
            .iter()
            .flat_map(|s| s.members_of(GLOBALS_NAME))
            .filter_map(GlobalField::from_name)
            .collect();
        let globals_binding = decls.iter().any(|d| d.name == GLOBALS_NAME)
            || self.scans.iter().any(|s| s.members_of(GLOBALS_NAME).next().is_some());

        let block = self.block(&decls)?;
        let slots = self.slots(&decls, block.is_some())?;
        let preambles = self
            .scans
            .iter()
            .map(|scan| preamble(scan, globals_binding, block.as_ref(), &slots))
            .collect();

        Ok(BindingPlan {
            stage: self.stage,
            globals: globals.into_iter().collect(),
            globals_binding,
            block,
            slots,
            preambles,
        })
    }

    /// Bound declarations from every module, deduplicated by name.
    fn merged_declarations(&self) -> Result<Vec<Declaration>> {
        let mut out: Vec<Declaration> = Vec::new();
        for d in self.scans.iter().flat_map(|s| &s.declarations).filter(|d| d.is_resource()) {
            match out.iter().find(|e| e.name == d.name) {
                Some(e) if (e.group, e.binding, e.space, &e.ty) != (d.group, d.binding, d.space, &d.ty) => {
                    return Err(self.err(format!("`{}` is declared differently across stages", d.name)));
                }
                Some(_) => {}
                None => out.push(d.clone()),
            }
        }
        Ok(out)
    }

    fn check_groups(&self, decls: &[Declaration]) -> Result<()> {
        for d in decls {
            let (group, binding) = (d.group.unwrap_or(0), d.binding.unwrap_or(0));
            match group {
                0 if d.name == GLOBALS_NAME && binding == 0 && d.space == AddressSpace::Uniform => {}
                0 => {
                    return Err(self.err(format!(
                        "`{}` is declared in @group(0), which is reserved for `globals`",
                        d.name
                    )));
                }
                1 if d.name == GLOBALS_NAME => {
                    return Err(self.err("`globals` must be declared at @group(0) @binding(0)"));
                }
                1 => {}
                g => {
                    return Err(self.err(format!(
                        "`{}` uses @group({g}); only group 0 (globals) and group 1 are available",
                        d.name
                    )));
                }
            }
        }
        let group1: Vec<_> = decls.iter().filter(|d| d.group == Some(1)).collect();
        for (i, a) in group1.iter().enumerate() {
            if let Some(b) = group1[i + 1..].iter().find(|b| b.binding == a.binding) {
                return Err(self.err(format!(
                    "`{}` and `{}` share @group(1) @binding({})",
                    a.name,
                    b.name,
                    a.binding.unwrap_or(0)
                )));
            }
        }
        Ok(())
    }

    fn struct_members(&self, name: &str) -> Option<&prism_wgsl::StructDecl> {
        self.scans.iter().find_map(|s| s.struct_decl(name))
    }

    fn block(&self, decls: &[Declaration]) -> Result<Option<UniformBlock>> {
        let declared = decls.iter().find(|d| d.name == BLOCK_NAME);
        let simple: Vec<_> = self
            .uniforms
            .entries()
            .filter(|e| e.style == UniformStyle::Simple)
            .filter(|e| !decls.iter().any(|d| d.name == e.name))
            .collect();
        if declared.is_none() && simple.is_empty() {
            return Ok(None);
        }

        let struct_name = match declared {
            Some(d) => {
                if d.binding != Some(0) || d.space != AddressSpace::Uniform {
                    return Err(self.err("`u` must be declared as `@group(1) @binding(0) var<uniform>`"));
                }
                match &d.ty {
                    WgslType::Named(n) => n.clone(),
                    other => return Err(self.err(format!("`u` must have a struct type, found `{other}`"))),
                }
            }
            None => BLOCK_STRUCT.to_string(),
        };

        let fields: Vec<(String, UniformKind)> = match self.struct_members(&struct_name) {
            Some(decl) => {
                let mut fields = Vec::with_capacity(decl.members.len());
                for m in &decl.members {
                    let kind = UniformKind::from_data_type(&m.ty).ok_or_else(|| {
                        self.err(format!("member `{}` of `{struct_name}` has unsupported type `{}`", m.name, m.ty))
                    })?;
                    fields.push((m.name.clone(), kind));
                }
                for e in &simple {
                    let Some((_, kind)) = fields.iter().find(|(n, _)| *n == e.name) else {
                        return Err(self.err(format!("`{struct_name}` has no member `{}`", e.name)));
                    };
                    if !kind.accepts(&e.value) {
                        return Err(self.err(format!(
                            "`{}` is declared as `{}` but was given {:?}",
                            e.name,
                            kind.wgsl_type(),
                            e.value
                        )));
                    }
                }
                fields
            }
            None if declared.is_some() => {
                return Err(self.err(format!("struct `{struct_name}` used by `u` is not declared")));
            }
            None => simple
                .iter()
                .filter_map(|e| match e.value {
                    BindingValue::Uniform(v) => Some((e.name.clone(), UniformKind::infer(&v))),
                    _ => None,
                })
                .collect(),
        };

        let (fields, size) = layout_block(fields);
        Ok(Some(UniformBlock { struct_name, fields, size, declared: declared.is_some() }))
    }

    fn slots(&self, decls: &[Declaration], has_block: bool) -> Result<Vec<Slot>> {
        let mut slots = Vec::new();
        let mut used: BTreeSet<u32> = BTreeSet::new();
        if has_block {
            used.insert(0);
        }

        for d in decls.iter().filter(|d| d.group == Some(1) && d.name != BLOCK_NAME) {
            let binding = d.binding.unwrap_or(0);
            if has_block && binding == 0 {
                return Err(self.err(format!(
                    "`{}` takes @group(1) @binding(0), which is reserved for the `u` block",
                    d.name
                )));
            }
            let value = self.uniforms.get(&d.name);
            let kind = self.declared_kind(d, value)?;
            if let Some(v) = value {
                if !kind.accepts(v) {
                    return Err(self.err(format!(
                        "`{}` is declared as `{}` but was given a {}",
                        d.name,
                        d.ty,
                        v.describe()
                    )));
                }
            }
            used.insert(binding);
            slots.push(Slot {
                name: d.name.clone(),
                binding,
                kind,
                array_size: array_size(&d.ty),
                declared: true,
                implicit_for: None,
                wgsl_type: d.ty.to_string(),
            });
        }

        let manual = self
            .uniforms
            .entries()
            .filter(|e| e.style == UniformStyle::Manual)
            .filter(|e| !decls.iter().any(|d| d.name == e.name));
        for e in manual {
            if e.name == GLOBALS_NAME || e.name == BLOCK_NAME {
                return Err(self.err(format!("`{}` is a reserved name", e.name)));
            }
            if slots.iter().any(|s: &Slot| s.name == e.name) {
                continue;
            }
            let kind = self.inferred_kind(&e.value)?;
            let binding = next_free(&mut used);
            let texture_filterable = match &kind {
                UniformKind::Texture { sample_type } => {
                    Some(matches!(sample_type, wgpu::TextureSampleType::Float { filterable: true }))
                }
                _ => None,
            };
            slots.push(Slot {
                name: e.name.clone(),
                binding,
                wgsl_type: kind.wgsl_type(),
                kind,
                array_size: None,
                declared: false,
                implicit_for: None,
            });

            let sampler_name = format!("{}{SAMPLER_SUFFIX}", e.name);
            let sampler_supplied = self.uniforms.get(&sampler_name).is_some()
                || decls.iter().any(|d| d.name == sampler_name);
            if let (Some(filtering), false) = (texture_filterable, sampler_supplied) {
                let kind = UniformKind::Sampler { filtering };
                slots.push(Slot {
                    name: sampler_name,
                    binding: next_free(&mut used),
                    wgsl_type: kind.wgsl_type(),
                    kind,
                    array_size: None,
                    declared: false,
                    implicit_for: Some(e.name.clone()),
                });
            }
        }

        // Declared `<tex>_sampler` without a value follows its texture.
        let textures: Vec<(String, bool)> = slots
            .iter()
            .filter_map(|s| match &s.kind {
                UniformKind::Texture { sample_type } => Some((
                    s.name.clone(),
                    matches!(sample_type, wgpu::TextureSampleType::Float { filterable: true }),
                )),
                _ => None,
            })
            .collect();
        for slot in slots.iter_mut().filter(|s| s.declared && s.implicit_for.is_none()) {
            if !matches!(slot.kind, UniformKind::Sampler { .. }) || self.uniforms.get(&slot.name).is_some() {
                continue;
            }
            let Some(base) = slot.name.strip_suffix(SAMPLER_SUFFIX) else { continue };
            if let Some((tex, filterable)) = textures.iter().find(|(n, _)| n == base) {
                slot.implicit_for = Some(tex.clone());
                slot.kind = UniformKind::Sampler { filtering: *filterable };
            }
        }

        slots.sort_by_key(|s| s.binding);
        Ok(slots)
    }

    fn declared_kind(&self, d: &Declaration, value: Option<&BindingValue>) -> Result<UniformKind> {
        let unsupported = || self.err(format!("`{}` has unsupported binding type `{}`", d.name, d.ty));
        match (&d.space, &d.ty) {
            (AddressSpace::Uniform, ty) => UniformKind::from_data_type(ty).ok_or_else(|| {
                self.err(format!(
                    "`{}: {ty}` cannot be filled by a single value; put struct fields in the `u` block",
                    d.name
                ))
            }),
            (AddressSpace::Storage(access), _) => {
                Ok(UniformKind::StorageBuffer { read_only: *access == Access::Read })
            }
            (AddressSpace::Handle, WgslType::Texture2d(scalar)) => {
                let sample_type = match scalar {
                    prism_wgsl::Scalar::U32 => wgpu::TextureSampleType::Uint,
                    prism_wgsl::Scalar::I32 => wgpu::TextureSampleType::Sint,
                    _ => {
                        let filterable = match value {
                            Some(BindingValue::Texture(image)) => is_filterable(self.lookup(self.info.image_format(image))?),
                            _ => true,
                        };
                        wgpu::TextureSampleType::Float { filterable }
                    }
                };
                Ok(UniformKind::Texture { sample_type })
            }
            (AddressSpace::Handle, WgslType::Sampler) => {
                let filtering = match value {
                    Some(BindingValue::Sampler(s)) => self.lookup(self.info.sampler_filtering(*s))?,
                    _ => true,
                };
                Ok(UniformKind::Sampler { filtering })
            }
            (AddressSpace::Handle, WgslType::StorageTexture2d { format, access }) => {
                let format = from_wgsl_storage_name(format).ok_or_else(unsupported)?;
                Ok(UniformKind::StorageTexture { format, access: *access })
            }
            _ => Err(unsupported()),
        }
    }

    /// Disposed or foreign resources are binding errors of this program.
    fn lookup<T>(&self, found: Result<T>) -> Result<T> {
        found.map_err(|e| self.err(e.to_string()))
    }

    fn inferred_kind(&self, value: &BindingValue) -> Result<UniformKind> {
        Ok(match value {
            BindingValue::Uniform(v) => UniformKind::infer(v),
            BindingValue::Texture(image) => UniformKind::Texture {
                sample_type: wgpu::TextureSampleType::Float {
                    filterable: is_filterable(self.lookup(self.info.image_format(image))?),
                },
            },
            BindingValue::Sampler(s) => UniformKind::Sampler { filtering: self.lookup(self.info.sampler_filtering(*s))? },
            BindingValue::Storage(_) => UniformKind::StorageBuffer { read_only: self.stage == ProgramStage::Raster },
            BindingValue::StorageTexture(t) => {
                let format = self.lookup(self.info.target_format(*t))?;
                if wgsl_storage_name(format).is_none() {
                    return Err(self.err(format!("{format:?} cannot be bound as a storage texture")));
                }
                UniformKind::StorageTexture { format, access: Access::Write }
            }
        })
    }
}

fn next_free(used: &mut BTreeSet<u32>) -> u32 {
    let b = (0..).find(|b| !used.contains(b)).unwrap_or(0);
    used.insert(b);
    b
}

fn array_size(ty: &WgslType) -> Option<u32> {
    let WgslType::Array(inner) = ty else { return None };
    let (_, count) = inner.rsplit_once(',')?;
    count.trim_end_matches(['u', 'i']).parse().ok()
}

fn preamble(scan: &ShaderScan, globals: bool, block: Option<&UniformBlock>, slots: &[Slot]) -> String {
    let mut out = String::new();
    if globals && scan.members_of(GLOBALS_NAME).next().is_some() && !scan.declares(GLOBALS_NAME) {
        out.push_str(GLOBALS_WGSL);
    }
    if let Some(block) = block {
        if !scan.declares_struct(&block.struct_name) {
            let _ = writeln!(out, "struct {} {{", block.struct_name);
            for f in &block.fields {
                let _ = writeln!(out, "    {}: {},", f.name, f.kind.wgsl_type());
            }
            out.push_str("}\n");
        }
        if !scan.declares(BLOCK_NAME) {
            let _ = writeln!(
                out,
                "@group(1) @binding(0) var<uniform> {BLOCK_NAME}: {};",
                block.struct_name
            );
        }
    }
    for s in slots.iter().filter(|s| !scan.declares(&s.name)) {
        let _ = writeln!(
            out,
            "@group(1) @binding({}) var{} {}: {};",
            s.binding,
            s.kind.wgsl_space(),
            s.name,
            s.wgsl_type
        );
    }
    out
}
