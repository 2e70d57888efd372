use std::time::Duration;

use crate::device::GpuInit;
use crate::error::{Error, Result};
use crate::events::EventBusOptions;
use crate::time::Clock;

/// Context configuration.
#[derive(Debug, Clone)]
pub struct ContextOptions {
    pub gpu: GpuInit,
    /// Clear the target on every `set_target`.
    pub auto_clear: bool,
    pub clear_color: wgpu::Color,
    /// Format of the offscreen screen target in headless mode.
    pub headless_format: wgpu::TextureFormat,
    pub dt_min: Duration,
    pub dt_max: Duration,
    pub events: EventBusOptions,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            gpu: GpuInit::default(),
            auto_clear: true,
            clear_color: wgpu::Color::TRANSPARENT,
            headless_format: wgpu::TextureFormat::Rgba8Unorm,
            dt_min: Clock::DEFAULT_DT_MIN,
            dt_max: Clock::DEFAULT_DT_MAX,
            events: EventBusOptions::default(),
        }
    }
}

impl ContextOptions {
    pub fn with_auto_clear(mut self, auto_clear: bool) -> Self {
        self.auto_clear = auto_clear;
        self
    }

    pub fn with_clear_color(mut self, color: wgpu::Color) -> Self {
        self.clear_color = color;
        self
    }

    pub fn with_headless_format(mut self, format: wgpu::TextureFormat) -> Self {
        self.headless_format = format;
        self
    }

    pub fn with_events(mut self, events: EventBusOptions) -> Self {
        self.events = events;
        self
    }

    pub fn with_dt_clamps(mut self, dt_min: Duration, dt_max: Duration) -> Self {
        self.dt_min = dt_min;
        self.dt_max = dt_max;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.dt_min > self.dt_max {
            return Err(Error::Config(format!(
                "dt_min ({:?}) is larger than dt_max ({:?})",
                self.dt_min, self.dt_max
            )));
        }
        Ok(())
    }
}
