use std::time::Instant;

use smallvec::SmallVec;

use crate::device::SurfaceErrorAction;
use crate::error::{Error, Result};
use crate::events::EventPayload;
use crate::pipeline::cache::FormatKey;
use crate::resources::{MultiTargetSet, PingPongTarget, RenderTarget};

use super::Context;

/// Where draws land.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Target {
    /// The window swapchain, or the offscreen screen target when headless.
    #[default]
    Screen,
    Texture(RenderTarget),
    /// Several targets written by one draw, `@location(n)` in order.
    Multi(Vec<RenderTarget>),
}

impl From<RenderTarget> for Target {
    fn from(t: RenderTarget) -> Self {
        Self::Texture(t)
    }
}

/// The write side at the time of the call.
impl From<&PingPongTarget> for Target {
    fn from(pp: &PingPongTarget) -> Self {
        Self::Texture(pp.write())
    }
}

impl From<&MultiTargetSet> for Target {
    fn from(mrt: &MultiTargetSet) -> Self {
        Self::Multi(mrt.attachments())
    }
}

/// Resolved color attachments of a target.
pub(crate) struct Attachments {
    pub views: SmallVec<[wgpu::TextureView; 8]>,
    pub formats: FormatKey,
    pub size: (u32, u32),
    pub name: String,
}

impl Context {
    fn target_name(&self, t: RenderTarget) -> String {
        match self.registry.target(t) {
            Ok(e) => e.options.label.clone().unwrap_or_else(|| format!("{:?}", e.id)),
            Err(_) => "disposed target".into(),
        }
    }

    /// Acquires the swapchain texture for this frame if not already held.
    /// `Ok(false)` means the frame must be skipped.
    pub(super) fn ensure_frame(&mut self) -> Result<bool> {
        if self.frame.is_some() {
            return Ok(true);
        }
        match self.gpu.acquire_frame() {
            Ok(frame) => {
                self.frame = frame;
                Ok(self.frame.is_some())
            }
            Err(err) => {
                let message = err.to_string();
                match self.gpu.handle_surface_error(err) {
                    SurfaceErrorAction::Fatal => Err(Error::Surface(message)),
                    action => {
                        log::warn!("surface frame skipped ({message}): {action:?}");
                        Ok(false)
                    }
                }
            }
        }
    }

    fn attachments_for(&mut self, target: &Target) -> Result<Option<Attachments>> {
        let targets: SmallVec<[RenderTarget; 8]> = match target {
            Target::Screen => match self.screen {
                Some(screen) => SmallVec::from_elem(screen, 1),
                None => {
                    if !self.ensure_frame()? {
                        return Ok(None);
                    }
                    let (Some(frame), Some(format)) = (&self.frame, self.gpu.surface_format()) else {
                        return Ok(None);
                    };
                    let size = self.gpu.size();
                    return Ok(Some(Attachments {
                        views: SmallVec::from_elem(frame.view.clone(), 1),
                        formats: SmallVec::from_elem(format, 1),
                        size: (size.width, size.height),
                        name: "screen".into(),
                    }));
                }
            },
            Target::Texture(t) => SmallVec::from_elem(*t, 1),
            Target::Multi(ts) => ts.iter().copied().collect(),
        };
        if targets.is_empty() {
            return Err(Error::target("attachment set", "no targets"));
        }

        let mut out = Attachments {
            views: SmallVec::new(),
            formats: SmallVec::new(),
            size: (0, 0),
            name: match target {
                Target::Screen => "screen".into(),
                _ => targets.iter().map(|t| self.target_name(*t)).collect::<Vec<_>>().join("+"),
            },
        };
        for t in targets {
            let e = self.registry.target(t)?;
            if out.views.is_empty() {
                out.size = (e.width, e.height);
            } else if out.size != (e.width, e.height) {
                return Err(Error::target("attachment set", "targets differ in size"));
            }
            out.views.push(e.view.clone());
            out.formats.push(e.format());
        }
        Ok(Some(out))
    }

    /// Attachments of the current target; `None` when the swapchain frame
    /// is unavailable and the call should be skipped.
    pub(crate) fn color_attachments(&mut self) -> Result<Option<Attachments>> {
        let target = self.current.clone();
        self.attachments_for(&target)
    }

    /// Size of the current target without acquiring a frame.
    pub(crate) fn target_size(&self) -> (u32, u32) {
        let first = match &self.current {
            Target::Screen => self.screen,
            Target::Texture(t) => Some(*t),
            Target::Multi(ts) => ts.first().copied(),
        };
        match first.and_then(|t| self.registry.target(t).ok()) {
            Some(e) => (e.width, e.height),
            None => (self.width(), self.height()),
        }
    }

    pub fn current_target(&self) -> &Target {
        &self.current
    }

    /// Makes `target` current. With `auto_clear` the target is cleared to
    /// the configured clear color as part of this call.
    pub fn set_target(&mut self, target: impl Into<Target>) -> Result<()> {
        let start = Instant::now();
        let target = target.into();
        let attachments = self.attachments_for(&target)?;
        self.current = target;
        let mut cleared = false;
        if self.options.auto_clear {
            if let Some(attachments) = &attachments {
                self.encode_clear(attachments, self.options.clear_color);
                cleared = true;
            }
        }
        let name = attachments.map(|a| a.name).unwrap_or_else(|| "screen".into());
        self.finish_target(name, cleared, start);
        Ok(())
    }

    /// Clears `target` to `color` regardless of `auto_clear`. The current
    /// target is unchanged.
    pub fn clear(&mut self, target: impl Into<Target>, color: wgpu::Color) -> Result<()> {
        let start = Instant::now();
        let target = target.into();
        let Some(attachments) = self.attachments_for(&target)? else {
            self.finish_target("screen".into(), false, start);
            return Ok(());
        };
        self.encode_clear(&attachments, color);
        self.finish_target(attachments.name, true, start);
        Ok(())
    }

    fn finish_target(&mut self, target: String, cleared: bool, start: Instant) {
        let cpu_time = start.elapsed();
        self.profiler.record(crate::events::EventKind::Target, cpu_time, false);
        self.events.emit(EventPayload::Target { target, cleared, cpu_time });
    }

    fn encode_clear(&self, attachments: &Attachments, color: wgpu::Color) {
        let device = self.gpu.device();
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("prism clear") });
        {
            let color_attachments: SmallVec<[Option<wgpu::RenderPassColorAttachment<'_>>; 8]> = attachments
                .views
                .iter()
                .map(|view| {
                    Some(wgpu::RenderPassColorAttachment {
                        view,
                        resolve_target: None,
                        ops: wgpu::Operations { load: wgpu::LoadOp::Clear(color), store: wgpu::StoreOp::Store },
                        depth_slice: None,
                    })
                })
                .collect();
            let _rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("prism clear"),
                color_attachments: &color_attachments,
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }
        self.gpu.queue().submit([encoder.finish()]);
    }
}
