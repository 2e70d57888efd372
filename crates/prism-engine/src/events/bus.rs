use std::collections::VecDeque;
use std::time::{Duration, Instant};

use bitflags::bitflags;

bitflags! {
    /// Set of event kinds a bus records and delivers.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct EventTypes: u8 {
        const DRAW    = 1 << 0;
        const COMPUTE = 1 << 1;
        const TARGET  = 1 << 2;
        const FRAME   = 1 << 3;
    }
}

impl Default for EventTypes {
    fn default() -> Self {
        Self::all()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    Draw,
    Compute,
    Target,
    Frame,
}

impl From<EventKind> for EventTypes {
    fn from(kind: EventKind) -> Self {
        kind.flag()
    }
}

impl EventKind {
    pub const ALL: [Self; 4] = [Self::Draw, Self::Compute, Self::Target, Self::Frame];

    pub fn flag(self) -> EventTypes {
        match self {
            Self::Draw => EventTypes::DRAW,
            Self::Compute => EventTypes::COMPUTE,
            Self::Target => EventTypes::TARGET,
            Self::Frame => EventTypes::FRAME,
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FramePhase {
    Begin,
    End,
}

/// Kind-specific event data.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Draw {
        program: String,
        vertex_count: u32,
        instances: u32,
        /// The program is broken or the call was a no-op.
        skipped: bool,
        cpu_time: Duration,
    },
    Compute {
        program: String,
        workgroups: [u32; 3],
        skipped: bool,
        cpu_time: Duration,
    },
    Target {
        /// `"screen"` or the target's label.
        target: String,
        cleared: bool,
        cpu_time: Duration,
    },
    Frame {
        phase: FramePhase,
        frame: u64,
        time: f32,
    },
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Draw { .. } => EventKind::Draw,
            Self::Compute { .. } => EventKind::Compute,
            Self::Target { .. } => EventKind::Target,
            Self::Frame { .. } => EventKind::Frame,
        }
    }

    pub fn cpu_time(&self) -> Option<Duration> {
        match self {
            Self::Draw { cpu_time, .. } | Self::Compute { cpu_time, .. } | Self::Target { cpu_time, .. } => {
                Some(*cpu_time)
            }
            Self::Frame { .. } => None,
        }
    }

    pub fn skipped(&self) -> bool {
        matches!(self, Self::Draw { skipped: true, .. } | Self::Compute { skipped: true, .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    /// Time since the bus was created.
    pub timestamp: Duration,
    pub payload: EventPayload,
}

#[derive(Debug, Clone)]
pub struct EventBusOptions {
    pub types: EventTypes,
    /// Ring capacity of [`EventBus::history`]. Zero keeps no history.
    pub history_size: usize,
}

impl Default for EventBusOptions {
    fn default() -> Self {
        Self { types: EventTypes::all(), history_size: 100 }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Box<dyn FnMut(&Event) + Send>;

struct Subscriber {
    id: SubscriptionId,
    kind: EventKind,
    callback: Callback,
}

/// Synchronous fan-out of engine events plus a bounded history.
pub struct EventBus {
    options: EventBusOptions,
    epoch: Instant,
    history: VecDeque<Event>,
    subscribers: Vec<Subscriber>,
    next_id: u64,
}

impl EventBus {
    pub fn new(options: EventBusOptions) -> Self {
        Self {
            history: VecDeque::with_capacity(options.history_size),
            options,
            epoch: Instant::now(),
            subscribers: Vec::new(),
            next_id: 0,
        }
    }

    pub fn options(&self) -> &EventBusOptions {
        &self.options
    }

    pub fn is_enabled(&self, kind: EventKind) -> bool {
        self.options.types.contains(kind.flag())
    }

    /// Calls `callback` for every future event of `kind`, in emission order.
    pub fn on(&mut self, kind: EventKind, callback: impl FnMut(&Event) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push(Subscriber { id, kind, callback: Box::new(callback) });
        id
    }

    /// Returns `false` when `id` was not subscribed.
    pub fn off(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub(crate) fn emit(&mut self, payload: EventPayload) {
        let kind = payload.kind();
        if !self.is_enabled(kind) {
            return;
        }
        let event = Event { kind, timestamp: self.epoch.elapsed(), payload };
        for s in self.subscribers.iter_mut().filter(|s| s.kind == kind) {
            (s.callback)(&event);
        }
        if self.options.history_size == 0 {
            return;
        }
        if self.history.len() == self.options.history_size {
            self.history.pop_front();
        }
        self.history.push_back(event);
    }

    /// Recorded events, oldest first, optionally restricted to `types`.
    pub fn history(&self, types: Option<EventTypes>) -> impl Iterator<Item = &Event> {
        self.history.iter().filter(move |e| types.is_none_or(|t| t.contains(e.kind.flag())))
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("options", &self.options)
            .field("history", &self.history.len())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn frame(frame: u64) -> EventPayload {
        EventPayload::Frame { phase: FramePhase::Begin, frame, time: 0.0 }
    }

    fn draw(program: &str) -> EventPayload {
        EventPayload::Draw {
            program: program.into(),
            vertex_count: 3,
            instances: 1,
            skipped: false,
            cpu_time: Duration::ZERO,
        }
    }

    #[test]
    fn history_is_a_bounded_ring() {
        let mut bus = EventBus::new(EventBusOptions { history_size: 3, ..Default::default() });
        for i in 0..5 {
            bus.emit(frame(i));
        }
        let frames: Vec<_> = bus
            .history(None)
            .map(|e| match e.payload {
                EventPayload::Frame { frame, .. } => frame,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(frames, [2, 3, 4]);
    }

    #[test]
    fn history_filter_and_order() {
        let mut bus = EventBus::new(EventBusOptions::default());
        bus.emit(draw("a"));
        bus.emit(frame(0));
        bus.emit(draw("b"));
        let names: Vec<_> = bus
            .history(Some(EventTypes::DRAW))
            .map(|e| match &e.payload {
                EventPayload::Draw { program, .. } => program.as_str(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(bus.history(Some(EventTypes::DRAW | EventTypes::FRAME)).count(), 3);
        assert_eq!(bus.history(Some(EventTypes::COMPUTE)).count(), 0);
        let stamps: Vec<_> = bus.history(None).map(|e| e.timestamp).collect();
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn disabled_kinds_emit_nothing() {
        let mut bus = EventBus::new(EventBusOptions { types: EventTypes::FRAME, history_size: 10 });
        let seen = Arc::new(Mutex::new(0));
        let counter = seen.clone();
        bus.on(EventKind::Draw, move |_| *counter.lock().unwrap() += 1);
        bus.emit(draw("a"));
        bus.emit(frame(0));
        assert_eq!(*seen.lock().unwrap(), 0);
        assert_eq!(bus.history(None).count(), 1);
    }

    #[test]
    fn subscribers_fan_out_and_unsubscribe() {
        let mut bus = EventBus::new(EventBusOptions::default());
        let log = Arc::new(Mutex::new(Vec::new()));
        let (a, b) = (log.clone(), log.clone());
        let first = bus.on(EventKind::Draw, move |_| a.lock().unwrap().push("first"));
        bus.on(EventKind::Draw, move |_| b.lock().unwrap().push("second"));
        bus.emit(draw("x"));
        assert!(bus.off(first));
        assert!(!bus.off(first));
        bus.emit(draw("y"));
        assert_eq!(*log.lock().unwrap(), ["first", "second", "second"]);
    }

    #[test]
    fn zero_history_keeps_nothing() {
        let mut bus = EventBus::new(EventBusOptions { history_size: 0, ..Default::default() });
        bus.emit(frame(0));
        assert_eq!(bus.history(None).count(), 0);
    }
}
