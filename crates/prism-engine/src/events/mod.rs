//! Instrumentation: the event bus every operation reports to, and the
//! profiler that aggregates the same stream.

mod bus;
mod profiler;

pub use bus::{
    Event, EventBus, EventBusOptions, EventKind, EventPayload, EventTypes, FramePhase, SubscriptionId,
};
pub use profiler::{FrameStats, KindStats, Profiler, RegionStats};
