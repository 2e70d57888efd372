//! Encoding and submission of draws and dispatches.
//!
//! Every call records its own command buffer and submits it immediately, so
//! uniform writes of consecutive calls never alias.

use std::time::Instant;

use smallvec::SmallVec;

use crate::binding::BindingValue;
use crate::context::{Attachments, Context};
use crate::error::{Error, Result};
use crate::events::EventPayload;
use crate::resources::ids::{ContextId, ProgramKey};

use super::program::{Program, ProgramKind};
use super::shader::FULLSCREEN_ENTRY;

pub(crate) fn program<'a>(ctx: &'a Context, owner: ContextId, key: ProgramKey, what: &'static str) -> Result<&'a Program> {
    if owner != ctx.id {
        return Err(Error::ForeignHandle(what));
    }
    ctx.programs.get(key).ok_or(Error::Disposed(what))
}

pub(crate) fn program_mut<'a>(
    ctx: &'a mut Context,
    owner: ContextId,
    key: ProgramKey,
    what: &'static str,
) -> Result<&'a mut Program> {
    if owner != ctx.id {
        return Err(Error::ForeignHandle(what));
    }
    ctx.programs.get_mut(key).ok_or(Error::Disposed(what))
}

pub(crate) fn set_uniform(
    ctx: &mut Context,
    owner: ContextId,
    key: ProgramKey,
    what: &'static str,
    name: &str,
    value: BindingValue,
) -> Result<()> {
    if owner != ctx.id {
        return Err(Error::ForeignHandle(what));
    }
    let program = ctx.programs.get_mut(key).ok_or(Error::Disposed(what))?;
    program.core.set_uniform(&ctx.registry, name, value)
}

pub(crate) fn dispose(ctx: &mut Context, owner: ContextId, key: ProgramKey) {
    if owner != ctx.id {
        return;
    }
    if let Some(mut program) = ctx.programs.remove(key) {
        program.release();
        log::debug!("program `{}` disposed", program.core.label);
    }
}

fn finish(ctx: &mut Context, payload: EventPayload, start: Instant) {
    let kind = payload.kind();
    let skipped = payload.skipped();
    ctx.profiler.record(kind, start.elapsed(), skipped);
    ctx.events.emit(payload);
}

fn encode_draw(
    ctx: &Context,
    label: &str,
    attachments: &Attachments,
    pipeline: &wgpu::RenderPipeline,
    groups: [Option<&wgpu::BindGroup>; 2],
    vertex_count: u32,
    instances: u32,
) {
    let device = ctx.gpu.device();
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) });
    {
        let color_attachments: SmallVec<[Option<wgpu::RenderPassColorAttachment<'_>>; 8]> = attachments
            .views
            .iter()
            .map(|view| {
                Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations { load: wgpu::LoadOp::Load, store: wgpu::StoreOp::Store },
                    depth_slice: None,
                })
            })
            .collect();
        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &color_attachments,
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        rpass.set_pipeline(pipeline);
        for (index, group) in groups.into_iter().enumerate() {
            if let Some(group) = group {
                rpass.set_bind_group(index as u32, group, &[]);
            }
        }
        rpass.draw(0..vertex_count, 0..instances);
    }
    ctx.gpu.queue().submit([encoder.finish()]);
}

/// Draws a pass or material into the current target.
pub(crate) fn draw(ctx: &mut Context, owner: ContextId, key: ProgramKey, what: &'static str) -> Result<()> {
    let start = Instant::now();
    let program = program_mut(ctx, owner, key, what)?;
    let label = program.core.label.clone();
    let (vertex_count, instances) = match &program.kind {
        ProgramKind::Pass(_) => (3, 1),
        ProgramKind::Material { vertex_count, instances, .. } => (*vertex_count, *instances),
        ProgramKind::Compute { .. } => return Err(program.core.fail("compute programs are dispatched, not drawn")),
    };
    let skipped = |label| EventPayload::Draw { program: label, vertex_count, instances, skipped: true, cpu_time: start.elapsed() };

    if program.core.broken {
        program.core.note_skipped();
        finish(ctx, skipped(label), start);
        return Ok(());
    }
    let uses_globals = program.core.plan.uses_globals();

    let Some(attachments) = ctx.color_attachments()? else {
        finish(ctx, skipped(label), start);
        return Ok(());
    };
    if uses_globals {
        ctx.write_globals(attachments.size);
    }

    let program = ctx.programs.get_mut(key).ok_or(Error::Disposed(what))?;
    let device = ctx.gpu.device();
    let local = program.core.prepare(device, ctx.gpu.queue(), &mut ctx.registry)?;
    let core = &program.core;
    let pipeline = match &mut program.kind {
        ProgramKind::Pass(raster) => {
            let (fs, fs_entry) = core.modules.first().ok_or_else(|| core.fail("fragment module missing"))?;
            raster.pipeline(device, core, (&ctx.fullscreen_vs, FULLSCREEN_ENTRY), (fs, fs_entry), &attachments.formats)
        }
        ProgramKind::Material { raster, .. } => {
            let [(vs, vs_entry), (fs, fs_entry)] = core.modules.as_slice() else {
                return Err(core.fail("vertex or fragment module missing"));
            };
            raster.pipeline(device, core, (vs, vs_entry), (fs, fs_entry), &attachments.formats)
        }
        ProgramKind::Compute { .. } => return Err(core.fail("compute programs are dispatched, not drawn")),
    };

    let group0 = if uses_globals {
        Some(&ctx.globals.group)
    } else {
        local.as_ref().map(|_| &ctx.globals.empty_group)
    };
    encode_draw(ctx, &label, &attachments, &pipeline, [group0, local.as_ref()], vertex_count, instances);

    let cpu_time = start.elapsed();
    finish(ctx, EventPayload::Draw { program: label, vertex_count, instances, skipped: false, cpu_time }, start);
    Ok(())
}

/// Runs a compute program. Zero workgroups in any dimension is a no-op.
pub(crate) fn dispatch(ctx: &mut Context, owner: ContextId, key: ProgramKey, workgroups: [u32; 3]) -> Result<()> {
    let start = Instant::now();
    let max = ctx.gpu.limits().max_compute_workgroups_per_dimension;
    let program = program_mut(ctx, owner, key, "compute")?;
    let label = program.core.label.clone();
    let skipped = |label| EventPayload::Compute { program: label, workgroups, skipped: true, cpu_time: start.elapsed() };

    if program.core.broken {
        program.core.note_skipped();
        finish(ctx, skipped(label), start);
        return Ok(());
    }
    if workgroups.contains(&0) {
        finish(ctx, skipped(label), start);
        return Ok(());
    }
    if workgroups.iter().any(|&n| n > max) {
        return Err(program.core.fail(format!("{workgroups:?} workgroups exceeds the limit of {max} per dimension")));
    }
    let uses_globals = program.core.plan.uses_globals();
    if uses_globals {
        let size = ctx.target_size();
        ctx.write_globals(size);
    }

    let program = ctx.programs.get_mut(key).ok_or(Error::Disposed("compute"))?;
    let device = ctx.gpu.device();
    let local = program.core.prepare(device, ctx.gpu.queue(), &mut ctx.registry)?;
    let ProgramKind::Compute { pipeline: Some(pipeline), .. } = &program.kind else {
        return Err(program.core.fail("compute pipeline missing"));
    };
    let pipeline = pipeline.clone();

    let group0 = if uses_globals {
        Some(&ctx.globals.group)
    } else {
        local.as_ref().map(|_| &ctx.globals.empty_group)
    };
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(&label) });
    {
        let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(&label),
            timestamp_writes: None,
        });
        cpass.set_pipeline(&pipeline);
        for (index, group) in [group0, local.as_ref()].into_iter().enumerate() {
            if let Some(group) = group {
                cpass.set_bind_group(index as u32, group, &[]);
            }
        }
        let [x, y, z] = workgroups;
        cpass.dispatch_workgroups(x, y, z);
    }
    ctx.gpu.queue().submit([encoder.finish()]);

    let cpu_time = start.elapsed();
    finish(ctx, EventPayload::Compute { program: label, workgroups, skipped: false, cpu_time }, start);
    Ok(())
}
