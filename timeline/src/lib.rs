//! Intervals and bridges layered over a shared [`tnet::Stn`]: the container
//! the planner and executor use to reason about a realized plan's timing, and
//! the sole place in this system permitted to widen a fixed-point constraint.

mod bridge;
mod segment;
mod timeline;

pub use bridge::{Bridge, BridgeKind};
pub use segment::{Segment, SegmentMetadata};
pub use timeline::{widen_fixed_point, AutoBridgePolicy, BridgePlacementError, Timeline, TimelineError, MIN_EPSILON};
