//! State shared by passes, materials and compute programs: compiled modules,
//! the binding plan, the mutable binding table and the bind-group cache.

use rustc_hash::FxHashMap;

use prism_wgsl::{ShaderScan, Stage};

use crate::binding::plan::build_plan;
use crate::binding::layout::local_entries;
use crate::binding::{
    pack_value, slot_size, BindingPlan, BindingValue, ProgramStage, Slot, TextureRef, UniformKind,
    UniformStyle, Uniforms,
};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::resources::format::{is_blendable, is_filterable};
use crate::resources::registry::Registry;
use crate::resources::{ResourceId, SamplerOptions};

use super::blend::BlendMode;
use super::cache::{BindGroupCache, BindingKey, CacheStats, FormatKey};
use super::shader::{create_module, validate, ShaderDiagnostic, ShaderRole, ShaderSource};

// ── buffers ───────────────────────────────────────────────────────────────

pub(crate) struct UniformBuffer {
    pub buffer: wgpu::Buffer,
    pub size: u64,
    pub id: ResourceId,
}

impl UniformBuffer {
    fn new(device: &wgpu::Device, registry: &mut Registry, label: &str, size: u64) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self { buffer, size, id: registry.next_id() }
    }
}

enum BoundResource {
    Buffer(wgpu::Buffer),
    View(wgpu::TextureView),
    Sampler(wgpu::Sampler),
}

struct Bound {
    binding: u32,
    id: ResourceId,
    resource: BoundResource,
}

impl Bound {
    fn entry(&self) -> wgpu::BindGroupEntry<'_> {
        wgpu::BindGroupEntry {
            binding: self.binding,
            resource: match &self.resource {
                BoundResource::Buffer(b) => b.as_entire_binding(),
                BoundResource::View(v) => wgpu::BindingResource::TextureView(v),
                BoundResource::Sampler(s) => wgpu::BindingResource::Sampler(s),
            },
        }
    }
}

/// Sampler options an implicit `<name>_sampler` uses for an image.
fn implicit_options(format: wgpu::TextureFormat, options: SamplerOptions) -> SamplerOptions {
    if is_filterable(format) { options } else { options.nearest() }
}

// ── core ──────────────────────────────────────────────────────────────────

pub(crate) struct ProgramCore {
    pub label: String,
    pub plan: BindingPlan,
    pub values: Uniforms,
    /// Compilation failed; draws and dispatches are skipped.
    pub broken: bool,
    warned_skip: bool,
    /// One module per caller source with its entry point, empty when broken.
    pub modules: Vec<(wgpu::ShaderModule, String)>,
    pub layout: Option<wgpu::PipelineLayout>,
    local_layout: Option<wgpu::BindGroupLayout>,
    block: Option<UniformBuffer>,
    slot_buffers: FxHashMap<String, UniformBuffer>,
    bind_groups: BindGroupCache,
}

fn entry_stage(role: ShaderRole) -> Stage {
    match role {
        ShaderRole::Vertex => Stage::Vertex,
        ShaderRole::Fragment => Stage::Fragment,
        ShaderRole::Compute => Stage::Compute,
    }
}

/// Scans, plans and compiles a program.
///
/// Binding convention violations are returned as errors. Shader problems are
/// reported as diagnostics and yield a broken program instead.
pub(crate) fn compile(
    ctx: &mut Context,
    label: String,
    stage: ProgramStage,
    sources: &[ShaderSource<'_>],
    uniforms: Uniforms,
) -> Result<ProgramCore> {
    let diag = |role: ShaderRole, message: String, line: usize, column: usize| ShaderDiagnostic {
        program: Some(label.clone()),
        role: Some(role),
        message,
        line: Some(line as u32),
        column: Some(column as u32),
    };

    let mut diagnostics = Vec::new();
    let mut scans: Vec<ShaderScan> = Vec::with_capacity(sources.len());
    for src in sources {
        match prism_wgsl::scan(src.code) {
            Ok(scan) if scan.entry_point(entry_stage(src.role)).is_none() => {
                diagnostics.push(diag(src.role, format!("no @{} entry point", src.role), 1, 1));
            }
            Ok(scan) => scans.push(scan),
            Err(e) => diagnostics.push(diag(src.role, e.message, e.line, e.col)),
        }
    }

    let scan_refs: Vec<&ShaderScan> = if diagnostics.is_empty() { scans.iter().collect() } else { Vec::new() };
    let plan = build_plan(&label, stage, &scan_refs, &uniforms, &ctx.registry)?;
    for slot in plan.slots() {
        if let Some(value) = uniforms.get(&slot.name) {
            check_resource(&label, &ctx.registry, slot, value)?;
        }
    }

    let mut modules = Vec::new();
    if diagnostics.is_empty() {
        for (i, (src, scan)) in sources.iter().zip(&scans).enumerate() {
            match validate(&label, src.role, plan.preamble(i), src.code) {
                Ok(full) => {
                    let entry = scan
                        .entry_point(entry_stage(src.role))
                        .map(|e| e.name.clone())
                        .unwrap_or_default();
                    modules.push((create_module(ctx.gpu.device(), &label, full), entry));
                }
                Err(d) => diagnostics.push(d),
            }
        }
    }
    let broken = !diagnostics.is_empty();
    for d in diagnostics {
        ctx.report(d);
    }
    if broken {
        modules.clear();
    }

    let device = ctx.gpu.device();
    let local_layout = plan
        .uses_locals()
        .then(|| ctx.layouts.get_or_create(device, local_entries(&plan)));

    let layout = (!broken).then(|| {
        let mut groups: Vec<&wgpu::BindGroupLayout> = Vec::with_capacity(2);
        if plan.uses_globals() {
            groups.push(&ctx.globals.layout);
        } else if local_layout.is_some() {
            groups.push(&ctx.globals.empty_layout);
        }
        groups.extend(local_layout.as_ref());
        device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&label),
            bind_group_layouts: &groups,
            immediate_size: 0,
        })
    });

    let block = plan
        .block()
        .map(|b| UniformBuffer::new(device, &mut ctx.registry, &label, u64::from(b.size)));
    let slot_buffers = plan
        .slots()
        .iter()
        .filter(|s| s.kind.is_plain_data())
        .map(|s| (s.name.clone(), UniformBuffer::new(device, &mut ctx.registry, &s.name, slot_size(&s.kind))))
        .collect();

    log::debug!(
        "program `{label}` created: {} globals, {} slots{}",
        plan.globals().len(),
        plan.slots().len(),
        if broken { " (broken)" } else { "" }
    );

    Ok(ProgramCore {
        label,
        plan,
        values: uniforms,
        broken,
        warned_skip: false,
        modules,
        layout,
        local_layout,
        block,
        slot_buffers,
        bind_groups: BindGroupCache::bind_groups(),
    })
}

/// Verifies that `value` can currently fill `slot`.
fn check_resource(label: &str, registry: &Registry, slot: &Slot, value: &BindingValue) -> Result<()> {
    let fail = |message: String| Error::binding(label, format!("`{}`: {message}", slot.name));
    if !slot.kind.accepts(value) {
        return Err(fail(format!(
            "expected {}, got a {}",
            slot.kind.wgsl_type(),
            value.describe()
        )));
    }
    match (&slot.kind, value) {
        (UniformKind::Texture { sample_type }, BindingValue::Texture(image)) => {
            let format = registry.image(image).map_err(|e| fail(e.to_string()))?.format;
            let wants_filterable = matches!(sample_type, wgpu::TextureSampleType::Float { filterable: true });
            if wants_filterable && !is_filterable(format) {
                return Err(fail(format!("{format:?} is not filterable")));
            }
        }
        (UniformKind::StorageTexture { format, .. }, BindingValue::StorageTexture(target)) => {
            let entry = registry.target(*target).map_err(|e| fail(e.to_string()))?;
            if !entry.options.storage {
                return Err(fail("target was not created with storage usage".into()));
            }
            if entry.format() != *format {
                return Err(fail(format!("expected {format:?}, target is {:?}", entry.format())));
            }
        }
        (UniformKind::Sampler { filtering }, BindingValue::Sampler(s)) => {
            let options = registry.sampler_options(*s).map_err(|e| fail(e.to_string()))?;
            if !filtering && options.is_filtering() {
                return Err(fail("a filtering sampler cannot sample a non-filterable texture".into()));
            }
        }
        (UniformKind::StorageBuffer { .. }, BindingValue::Storage(s)) => {
            registry.storage(*s).map_err(|e| fail(e.to_string()))?;
        }
        _ => {}
    }
    Ok(())
}

impl ProgramCore {
    pub fn fail(&self, message: impl Into<String>) -> Error {
        Error::binding(&self.label, message)
    }

    /// Warns about a skipped call once per program.
    pub fn note_skipped(&mut self) {
        if !self.warned_skip {
            log::warn!("`{}` failed to compile; its calls are skipped", self.label);
            self.warned_skip = true;
        }
    }

    pub fn set_uniform(&mut self, registry: &Registry, name: &str, value: BindingValue) -> Result<()> {
        let style = if let Some(field) = self.plan.block().and_then(|b| b.field(name)) {
            if !field.kind.accepts(&value) {
                return Err(self.fail(format!(
                    "`{name}` expects {}, got a {}",
                    field.kind.wgsl_type(),
                    value.describe()
                )));
            }
            UniformStyle::Simple
        } else if let Some(slot) = self.plan.slot(name) {
            check_resource(&self.label, registry, slot, &value)?;
            UniformStyle::Manual
        } else {
            return Err(Error::UnknownUniform { program: self.label.clone(), name: name.to_string() });
        };
        if !self.values.replace_value(name, value) {
            self.values.insert(name.to_string(), style, value);
        }
        Ok(())
    }

    pub fn uniform(&self, name: &str) -> Result<Option<BindingValue>> {
        if !self.plan.has_uniform(name) {
            return Err(Error::UnknownUniform { program: self.label.clone(), name: name.to_string() });
        }
        Ok(self.values.get(name).copied())
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.bind_groups.stats()
    }

    fn write_uniforms(&self, queue: &wgpu::Queue) -> Result<()> {
        if let (Some(block), Some(buffer)) = (self.plan.block(), &self.block) {
            let mut bytes = vec![0u8; block.size as usize];
            for field in &block.fields {
                let Some(BindingValue::Uniform(value)) = self.values.get(&field.name) else { continue };
                pack_value(&field.kind, value, &mut bytes[field.offset as usize..])
                    .map_err(|m| self.fail(format!("`{}`: {m}", field.name)))?;
            }
            queue.write_buffer(&buffer.buffer, 0, &bytes);
        }
        for slot in self.plan.slots() {
            let Some(buffer) = self.slot_buffers.get(&slot.name) else { continue };
            let mut bytes = vec![0u8; buffer.size as usize];
            if let Some(BindingValue::Uniform(value)) = self.values.get(&slot.name) {
                pack_value(&slot.kind, value, &mut bytes).map_err(|m| self.fail(format!("`{}`: {m}", slot.name)))?;
            }
            queue.write_buffer(&buffer.buffer, 0, &bytes);
        }
        Ok(())
    }

    fn image_value(&self, name: &str) -> Result<TextureRef> {
        match self.values.get(name) {
            Some(BindingValue::Texture(image)) => Ok(*image),
            _ => Err(self.fail(format!("`{name}` has no texture bound"))),
        }
    }

    fn resolve(&self, device: &wgpu::Device, registry: &mut Registry) -> Result<Vec<Bound>> {
        let mut out = Vec::with_capacity(self.plan.slots().len() + 1);
        if let Some(block) = &self.block {
            out.push(Bound { binding: 0, id: block.id, resource: BoundResource::Buffer(block.buffer.clone()) });
        }
        for slot in self.plan.slots() {
            let wrap = |e: Error| self.fail(format!("`{}`: {e}", slot.name));
            let (id, resource) = if let Some(buffer) = self.slot_buffers.get(&slot.name) {
                (buffer.id, BoundResource::Buffer(buffer.buffer.clone()))
            } else if let (Some(texture), None) = (&slot.implicit_for, self.values.get(&slot.name)) {
                let image = self.image_value(texture)?;
                let options = {
                    let info = registry.image(&image).map_err(wrap)?;
                    implicit_options(info.format, info.sampler)
                };
                registry.ensure_implicit_sampler(device, options);
                let entry = registry
                    .implicit_sampler(&options)
                    .ok_or_else(|| self.fail(format!("`{}`: implicit sampler missing", slot.name)))?;
                (entry.id, BoundResource::Sampler(entry.sampler.clone()))
            } else {
                let value = self
                    .values
                    .get(&slot.name)
                    .ok_or_else(|| self.fail(format!("`{}` has no value bound", slot.name)))?;
                check_resource(&self.label, registry, slot, value)?;
                match value {
                    BindingValue::Texture(image) => {
                        let info = registry.image(image).map_err(wrap)?;
                        (info.id, BoundResource::View(info.view.clone()))
                    }
                    BindingValue::StorageTexture(target) => {
                        let entry = registry.target(*target).map_err(wrap)?;
                        (entry.id, BoundResource::View(entry.view.clone()))
                    }
                    BindingValue::Sampler(sampler) => {
                        let (entry, _) = registry.sampler(*sampler).map_err(wrap)?;
                        (entry.id, BoundResource::Sampler(entry.sampler.clone()))
                    }
                    BindingValue::Storage(storage) => {
                        let entry = registry.storage(*storage).map_err(wrap)?;
                        (entry.id, BoundResource::Buffer(entry.buffer.clone()))
                    }
                    BindingValue::Uniform(_) => {
                        return Err(self.fail(format!("`{}` is not a uniform slot", slot.name)));
                    }
                }
            };
            out.push(Bound { binding: slot.binding, id, resource });
        }
        Ok(out)
    }

    /// Writes uniform data and returns the group-1 bind group, if the plan
    /// has one. Reuses the cached group while resource identities match.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        registry: &mut Registry,
    ) -> Result<Option<wgpu::BindGroup>> {
        let Some(layout) = self.local_layout.clone() else { return Ok(None) };
        self.write_uniforms(queue)?;
        let bound = self.resolve(device, registry)?;
        let key: BindingKey = bound.iter().map(|b| b.id).collect();
        let label = &self.label;
        self.bind_groups
            .get_or_insert_with(key, || {
                log::trace!("bind group miss for `{label}`");
                let entries: Vec<_> = bound.iter().map(Bound::entry).collect();
                Ok(device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(label),
                    layout: &layout,
                    entries: &entries,
                }))
            })
            .map(Some)
    }

    /// Destroys program-owned buffers. Caller resources are untouched.
    pub fn release(&mut self) {
        self.bind_groups.clear();
        if let Some(block) = self.block.take() {
            block.buffer.destroy();
        }
        for (_, b) in self.slot_buffers.drain() {
            b.buffer.destroy();
        }
        self.modules.clear();
        self.layout = None;
    }
}

// ── raster pipelines ──────────────────────────────────────────────────────

/// Lazily built render pipelines, one per color-target format set.
pub(crate) struct RasterState {
    pub blend: BlendMode,
    pub topology: wgpu::PrimitiveTopology,
    pipelines: FxHashMap<FormatKey, wgpu::RenderPipeline>,
    warned_blend: bool,
}

impl RasterState {
    pub fn new(blend: BlendMode, topology: wgpu::PrimitiveTopology) -> Self {
        Self { blend, topology, pipelines: FxHashMap::default(), warned_blend: false }
    }

    pub fn pipeline(
        &mut self,
        device: &wgpu::Device,
        core: &ProgramCore,
        vertex: (&wgpu::ShaderModule, &str),
        fragment: (&wgpu::ShaderModule, &str),
        formats: &FormatKey,
    ) -> wgpu::RenderPipeline {
        if let Some(p) = self.pipelines.get(formats) {
            return p.clone();
        }
        log::trace!("render pipeline miss for `{}`: {formats:?}", core.label);

        let blend = self.blend.state();
        let targets: Vec<Option<wgpu::ColorTargetState>> = formats
            .iter()
            .map(|&format| {
                let blend = if is_blendable(format) {
                    blend
                } else {
                    if blend.is_some() && !self.warned_blend {
                        log::warn!("`{}`: {format:?} is not blendable; blending disabled", core.label);
                        self.warned_blend = true;
                    }
                    None
                };
                Some(wgpu::ColorTargetState { format, blend, write_mask: wgpu::ColorWrites::ALL })
            })
            .collect();

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&core.label),
            layout: core.layout.as_ref(),
            vertex: wgpu::VertexState {
                module: vertex.0,
                entry_point: Some(vertex.1),
                compilation_options: Default::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: fragment.0,
                entry_point: Some(fragment.1),
                compilation_options: Default::default(),
                targets: &targets,
            }),
            primitive: wgpu::PrimitiveState {
                topology: self.topology,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });
        self.pipelines.insert(formats.clone(), pipeline.clone());
        pipeline
    }

    pub fn clear(&mut self) {
        self.pipelines.clear();
    }
}

// ── program arena entry ───────────────────────────────────────────────────

pub(crate) enum ProgramKind {
    Pass(RasterState),
    Material {
        raster: RasterState,
        vertex_count: u32,
        instances: u32,
    },
    Compute {
        pipeline: Option<wgpu::ComputePipeline>,
        workgroup_size: Option<[u32; 3]>,
    },
}

pub(crate) struct Program {
    pub core: ProgramCore,
    pub kind: ProgramKind,
}

impl Program {
    pub fn release(&mut self) {
        self.core.release();
        match &mut self.kind {
            ProgramKind::Pass(raster) | ProgramKind::Material { raster, .. } => raster.clear(),
            ProgramKind::Compute { pipeline, .. } => *pipeline = None,
        }
    }
}
