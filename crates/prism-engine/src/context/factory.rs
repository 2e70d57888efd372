use wgpu::TextureFormat;

use prism_wgsl::Stage;

use crate::binding::{ProgramStage, Uniforms};
use crate::error::Result;
use crate::pipeline::program::{compile, Program, ProgramCore, ProgramKind, RasterState};
use crate::pipeline::shader::{ShaderRole, ShaderSource};
use crate::pipeline::{
    BlendMode, Compute, ComputeOptions, Material, MaterialOptions, Pass, PassOptions,
};
use crate::resources::ids::ProgramKey;
use crate::resources::{
    MultiTargetSet, PingPongTarget, RenderTarget, Sampler, SamplerOptions, StorageBuffer,
    StorageEntry, TargetEntry, TargetOptions, Texture, TextureEntry, TextureOptions, TextureSource,
};

use super::Context;

// ── resources ─────────────────────────────────────────────────────────────

impl Context {
    pub fn target(&mut self, width: u32, height: u32, options: TargetOptions) -> Result<RenderTarget> {
        let entry = TargetEntry::allocate(&self.gpu, &mut self.registry.ids, width, height, options)?;
        Ok(self.registry.insert_target(entry))
    }

    /// Two targets of identical size and format. Both are allocated before
    /// either is registered.
    pub fn ping_pong(&mut self, width: u32, height: u32, options: TargetOptions) -> Result<PingPongTarget> {
        let label = options.label.clone().unwrap_or_else(|| "ping-pong".into());
        let gpu = &self.gpu;
        let a = TargetEntry::allocate(
            gpu,
            &mut self.registry.ids,
            width,
            height,
            options.clone().with_label(format!("{label}.a")),
        )?;
        let b = TargetEntry::allocate(
            gpu,
            &mut self.registry.ids,
            width,
            height,
            options.with_label(format!("{label}.b")),
        )?;
        Ok(PingPongTarget::new(self.registry.insert_target(a), self.registry.insert_target(b)))
    }

    /// Named targets sharing `width` x `height`, attached in the given order.
    pub fn mrt(&mut self, layout: &[(&str, TextureFormat)], width: u32, height: u32) -> Result<MultiTargetSet> {
        MultiTargetSet::validate_names(layout.iter().map(|(name, _)| *name))?;
        let gpu = &self.gpu;
        let entries = layout
            .iter()
            .map(|(name, format)| {
                let options = TargetOptions::format(*format).with_label(*name);
                TargetEntry::allocate(gpu, &mut self.registry.ids, width, height, options)
                    .map(|entry| (name.to_string(), entry))
            })
            .collect::<Result<Vec<_>>>()?;
        let attachments = entries
            .into_iter()
            .map(|(name, entry)| {
                let format = entry.format();
                (name, self.registry.insert_target(entry), format)
            })
            .collect();
        Ok(MultiTargetSet::new(attachments))
    }

    /// Zero-initialized storage of at least `byte_len` bytes.
    pub fn storage(&mut self, byte_len: u64) -> Result<StorageBuffer> {
        let entry = StorageEntry::allocate(self.gpu.device(), &mut self.registry.ids, byte_len)?;
        Ok(self.registry.insert_storage(entry))
    }

    pub fn create_sampler(&mut self, options: SamplerOptions) -> Sampler {
        self.registry.acquire_sampler(self.gpu.device(), options)
    }

    pub fn texture(&mut self, source: TextureSource<'_>, options: TextureOptions) -> Result<Texture> {
        let entry = TextureEntry::upload(self.gpu.device(), self.gpu.queue(), &mut self.registry.ids, source, &options)?;
        Ok(self.registry.insert_texture(entry))
    }
}

// ── programs ──────────────────────────────────────────────────────────────

impl Context {
    /// Default labels count every program ever created, so they stay unique
    /// across disposal.
    fn program_label(&mut self, label: Option<String>, kind: &str) -> String {
        let serial = self.program_serial;
        self.program_serial += 1;
        label.unwrap_or_else(|| format!("{kind}#{serial}"))
    }

    fn insert_program(&mut self, core: ProgramCore, kind: ProgramKind) -> ProgramKey {
        self.programs.insert(Program { core, kind })
    }

    fn raster(
        &mut self,
        label: String,
        sources: &[ShaderSource<'_>],
        uniforms: Uniforms,
        blend: BlendMode,
        topology: wgpu::PrimitiveTopology,
    ) -> Result<(ProgramCore, RasterState)> {
        let core = compile(self, label, ProgramStage::Raster, sources, uniforms)?;
        Ok((core, RasterState::new(blend, topology)))
    }

    /// A fragment shader drawn over a full-screen triangle.
    ///
    /// Binding errors fail the call. Shader errors are reported through
    /// [`take_diagnostics`](Self::take_diagnostics) and yield a pass whose
    /// draws are skipped.
    pub fn pass(&mut self, source: &str, options: PassOptions) -> Result<Pass> {
        let label = self.program_label(options.label, "pass");
        let sources = [ShaderSource { role: ShaderRole::Fragment, code: source }];
        let (core, raster) = self.raster(
            label,
            &sources,
            options.uniforms,
            options.blend,
            wgpu::PrimitiveTopology::TriangleList,
        )?;
        let key = self.insert_program(core, ProgramKind::Pass(raster));
        Ok(Pass { ctx: self.id, key })
    }

    pub fn material(&mut self, vertex: &str, fragment: &str, options: MaterialOptions) -> Result<Material> {
        let label = self.program_label(options.label, "material");
        let sources = [
            ShaderSource { role: ShaderRole::Vertex, code: vertex },
            ShaderSource { role: ShaderRole::Fragment, code: fragment },
        ];
        let (core, raster) = self.raster(label, &sources, options.uniforms, options.blend, options.topology)?;
        let kind = ProgramKind::Material {
            raster,
            vertex_count: options.vertex_count,
            instances: options.instances,
        };
        let key = self.insert_program(core, kind);
        Ok(Material { ctx: self.id, key })
    }

    /// A compute program. Its pipeline is built here since, unlike raster
    /// pipelines, it does not depend on the target.
    pub fn compute(&mut self, source: &str, options: ComputeOptions) -> Result<Compute> {
        let label = self.program_label(options.label, "compute");
        let sources = [ShaderSource { role: ShaderRole::Compute, code: source }];
        let core = compile(self, label, ProgramStage::Compute, &sources, options.uniforms)?;

        let workgroup_size = prism_wgsl::scan(source)
            .ok()
            .and_then(|scan| scan.entry_point(Stage::Compute).and_then(|e| e.workgroup_size));
        let pipeline = core.modules.first().map(|(module, entry)| {
            self.gpu.device().create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(&core.label),
                layout: core.layout.as_ref(),
                module,
                entry_point: Some(entry),
                compilation_options: Default::default(),
                cache: None,
            })
        });

        let key = self.insert_program(core, ProgramKind::Compute { pipeline, workgroup_size });
        Ok(Compute { ctx: self.id, key })
    }
}
