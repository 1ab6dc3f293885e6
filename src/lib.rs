//! `chronoplan`: a hierarchical task network planner with an integrated
//! simple temporal network constraint solver. Decomposes tasks and goals
//! into primitive actions the way an HTN planner does, schedules them onto a
//! shared timeline the way a temporal CSP solver does, and replans around
//! execution failures via a blacklist-driven coordinator loop.
//!
//! The pieces live in their own crates (`state`, `temporal`, `tnet`,
//! `timeline`, `domain`, `planner`, `executor`, `transformer`,
//! `coordinator`, `backtrack`); this crate is the facade that wires them
//! together behind [`PlannerBuilder`] and re-exports the types a caller
//! needs without reaching into each subsystem crate directly.

mod builder;
mod config;

pub use builder::{Logger, Planner, PlannerBuilder};
pub use config::{external_solver_path, EnvParam, PlannerConfig, PlannerConfigBuilder};

pub use coordinator::{
    CancellationToken, CloneStateStrategy, Coordinator, CoordinatorError, DomainStrategy, ExecutionStrategy,
    HtnPlannerStrategy, LinearExecutionStrategy, LoggingStrategy, NullLogger, OwnedDomainStrategy, PlannerStrategy,
    StaticDomainStrategy, StnTemporalStrategy, TemporalStrategy, TemporalViolation, TracingLogger,
};
pub use domain::{
    ActionFn, ActionMetadata, Blacklist, Domain, DomainError, DurationSpec, EntityRequirement, MethodFailure,
    Multigoal, RelationSpec, TodoItem, UnigoalSpec,
};
pub use executor::{ActivityLogEntry, ActivityOutcome, ExecOutcome, Executor};
pub use planner::{plan, plan_with_blacklist, Node, NodeId, NodeKind, PlanError, PlanOptions, SolutionTree};
pub use state::{State, Value};
pub use temporal::{parse_iso8601_duration, DurationParseError, Interval, IntervalError, Relation};
pub use timeline::{Bridge, BridgeKind, Segment, SegmentMetadata, Timeline, TimelineError};
pub use tnet::{Bounds, SolverError, SolverOutcome, Stn, TimeUnit};
pub use transformer::{convert, ActivitySpec, ConstraintSpec, DurationInput, EntitySpec, GoalSpec, PlanRequest, TransformError};

/// Installs a `tracing` subscriber reading its filter from `RUST_LOG`,
/// defaulting to `info` when unset. Optional: callers embedding `chronoplan`
/// in a larger application that already configures `tracing` should skip
/// this and install their own subscriber instead.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}
