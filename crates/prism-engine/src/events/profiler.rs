use std::collections::VecDeque;
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use super::bus::EventKind;

/// Number of recent frames averaged by [`FrameStats`].
const FRAME_WINDOW: usize = 60;

/// Aggregates for one event kind.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct KindStats {
    pub count: u64,
    pub skipped: u64,
    /// Cumulative CPU encode + submit time.
    pub cpu_time: Duration,
}

#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct FrameStats {
    pub frames: u64,
    pub last: Option<Duration>,
    /// Mean over the last 60 frames.
    pub average: Option<Duration>,
    pub fps: Option<f64>,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct RegionStats {
    pub count: u64,
    pub total: Duration,
    pub last: Duration,
}

/// CPU-side timing aggregates fed by the context.
#[derive(Debug, Default)]
pub struct Profiler {
    kinds: [KindStats; 4],
    frame_start: Option<Instant>,
    frame_times: VecDeque<Duration>,
    frames: u64,
    regions: FxHashMap<String, RegionStats>,
    open_regions: FxHashMap<String, Instant>,
}

impl Profiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, kind: EventKind, cpu_time: Duration, skipped: bool) {
        let stats = &mut self.kinds[kind.index()];
        stats.count += 1;
        stats.cpu_time += cpu_time;
        if skipped {
            stats.skipped += 1;
        }
    }

    pub fn kind(&self, kind: EventKind) -> KindStats {
        self.kinds[kind.index()]
    }

    pub(crate) fn begin_frame(&mut self, now: Instant) {
        self.frame_start = Some(now);
    }

    /// Closes the frame opened by `begin_frame`; unmatched calls are ignored.
    pub(crate) fn end_frame(&mut self, now: Instant) {
        let Some(start) = self.frame_start.take() else { return };
        if self.frame_times.len() == FRAME_WINDOW {
            self.frame_times.pop_front();
        }
        self.frame_times.push_back(now.saturating_duration_since(start));
        self.frames += 1;
    }

    pub fn frame_stats(&self) -> FrameStats {
        let average = (!self.frame_times.is_empty())
            .then(|| self.frame_times.iter().sum::<Duration>() / self.frame_times.len() as u32);
        FrameStats {
            frames: self.frames,
            last: self.frame_times.back().copied(),
            average,
            fps: average.filter(|d| !d.is_zero()).map(|d| 1.0 / d.as_secs_f64()),
        }
    }

    /// Starts (or restarts) the named region.
    pub fn begin_region(&mut self, name: &str) {
        self.begin_region_at(name, Instant::now());
    }

    /// Returns the region's duration, or `None` if it was never begun.
    pub fn end_region(&mut self, name: &str) -> Option<Duration> {
        self.end_region_at(name, Instant::now())
    }

    fn begin_region_at(&mut self, name: &str, now: Instant) {
        self.open_regions.insert(name.to_string(), now);
    }

    fn end_region_at(&mut self, name: &str, now: Instant) -> Option<Duration> {
        let start = self.open_regions.remove(name)?;
        let elapsed = now.saturating_duration_since(start);
        let stats = self.regions.entry(name.to_string()).or_default();
        stats.count += 1;
        stats.total += elapsed;
        stats.last = elapsed;
        Some(elapsed)
    }

    pub fn region(&self, name: &str) -> Option<RegionStats> {
        self.regions.get(name).copied()
    }

    pub fn regions(&self) -> impl Iterator<Item = (&str, RegionStats)> {
        self.regions.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
