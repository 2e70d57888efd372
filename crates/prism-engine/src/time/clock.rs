use std::time::{Duration, Instant};

/// Clock values as seen by shaders through `globals`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ClockSnapshot {
    /// Accumulated unpaused time, in seconds.
    pub time: f32,
    /// Duration of the last unpaused tick, in seconds.
    pub delta_time: f32,
    /// Number of ticks since creation. Keeps counting while paused.
    pub frame: u64,
}

/// Pausable frame clock owned by a context.
///
/// Delta time is clamped to avoid pathological values when the application is
/// suspended by a debugger, minimized, or stalls.
#[derive(Debug, Clone)]
pub struct Clock {
    last: Instant,
    time: f32,
    delta_time: f32,
    frame: u64,
    paused: bool,
    dt_min: Duration,
    dt_max: Duration,
}

impl Clock {
    pub const DEFAULT_DT_MIN: Duration = Duration::from_micros(100);
    pub const DEFAULT_DT_MAX: Duration = Duration::from_millis(250);

    pub fn new() -> Self {
        Self::with_clamps(Self::DEFAULT_DT_MIN, Self::DEFAULT_DT_MAX)
    }

    /// Clamps are ordered on construction, so `update` never sees an empty range.
    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        let (dt_min, dt_max) = if dt_min <= dt_max { (dt_min, dt_max) } else { (dt_max, dt_min) };
        Self {
            last: Instant::now(),
            time: 0.0,
            delta_time: 0.0,
            frame: 0,
            paused: false,
            dt_min,
            dt_max,
        }
    }

    /// Advances the clock from the wall clock.
    pub fn update(&mut self) -> ClockSnapshot {
        self.advance_to(Instant::now())
    }

    pub(crate) fn advance_to(&mut self, now: Instant) -> ClockSnapshot {
        self.frame = self.frame.wrapping_add(1);
        if !self.paused {
            let dt = now
                .saturating_duration_since(self.last)
                .clamp(self.dt_min, self.dt_max);
            self.delta_time = dt.as_secs_f32();
            self.time += self.delta_time;
        }
        self.last = now;
        self.snapshot()
    }

    /// Jumps to an absolute time. `delta_time` is left as is.
    pub fn set_time(&mut self, seconds: f32) {
        self.time = seconds;
    }

    /// Freezes or resumes `time` and `delta_time`.
    ///
    /// Resuming resets the wall-clock baseline so the paused interval is not
    /// counted as one long tick.
    pub fn set_paused(&mut self, paused: bool) {
        if self.paused && !paused {
            self.last = Instant::now();
        }
        self.paused = paused;
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn snapshot(&self) -> ClockSnapshot {
        ClockSnapshot { time: self.time, delta_time: self.delta_time, frame: self.frame }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}
