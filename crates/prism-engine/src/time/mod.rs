//! Time subsystem.
//!
//! One `Clock` per context. `Context::update_time` ticks it once per frame and
//! its snapshot feeds the `globals` uniform block.

mod clock;

pub use clock::{Clock, ClockSnapshot};
