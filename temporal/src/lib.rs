//! Time points, intervals and Allen-style temporal relations.
//!
//! This crate holds the vocabulary shared by the temporal network (`tnet`) and
//! the timeline layer (`timeline`): a timepoint identifier, a bound type wide
//! enough to saturate to infinity, an `Interval` with ISO-8601 duration
//! parsing, and the `Relation` catalog with its compilation to STN bounds.

mod interval;
mod relation;
mod tp;

pub use interval::{add_duration, parse_iso8601_duration, DurationParseError, Interval, IntervalError};
pub use relation::{relation_to_constraints, Relation};
pub use tp::{add_bounds, Bound, TpId, INFINITE};
