//! The Simple Temporal Network: a sparse bounds matrix over timepoints
//! ([`core`]) plus a hierarchical solving strategy that prefers an external
//! CSP solver, falls back to a Floyd–Warshall closure, and falls back again
//! to a conservative consistency check ([`solver`]).

mod core;
mod solver;

pub use crate::core::{compose, intersect, Bounds, Stn, StnError};
pub use solver::{
    domain_bound, ConservativeChecker, ExternalTemporalSolver, MatrixFallbackSolver, PinStrategy, SolverError,
    SolverOutcome, StnSolver, TimeUnit,
};
