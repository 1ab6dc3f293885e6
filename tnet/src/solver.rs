use crate::core::Stn;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use temporal::{Bound, TpId};
use tracing::{debug, warn};

/// Where the pinned-to-zero origin timepoint comes from when extracting an
/// assignment from the Floyd–Warshall closure.
#[derive(Clone, Debug)]
pub enum PinStrategy {
    /// Pin an explicit timepoint.
    Explicit(TpId),
    /// Pin whichever timepoint was added first.
    First,
}

impl PinStrategy {
    fn resolve(&self, stn: &Stn) -> Option<TpId> {
        match self {
            PinStrategy::Explicit(tp) => Some(*tp),
            PinStrategy::First => stn.timepoints().first().copied(),
        }
    }
}

/// The unit a timeline's durations are expressed in; used only to compute the
/// domain bound handed to an external solver, never to convert stored ticks.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TimeUnit {
    Micros,
    Millis,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    fn scale(self) -> f64 {
        match self {
            TimeUnit::Micros => 1e6,
            TimeUnit::Millis => 1e3,
            TimeUnit::Seconds => 1.0,
            TimeUnit::Minutes => 1.0 / 10.0,
            TimeUnit::Hours => 1.0 / 100.0,
            TimeUnit::Days => 1.0 / 1000.0,
        }
    }
}

/// `bound = lod_resolution * scale(time_unit)`, clamped to `max_domain`. The
/// solver never hardcodes a numeric bound; every caller goes through here.
pub fn domain_bound(lod_resolution: f64, time_unit: TimeUnit, max_domain: i64) -> i64 {
    let raw = (lod_resolution * time_unit.scale()).round() as i64;
    raw.clamp(0, max_domain)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolverOutcome {
    Assignment(HashMap<TpId, i64>),
    Unsatisfiable,
    /// The solver could not produce a definite answer (e.g. it timed out, or
    /// only ran a conservative check); the network's consistency is unknown.
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolverError {
    Timeout,
    /// A non-transient failure (bad binary, malformed input); the caller
    /// should blacklist this solver's identity for the remainder of the
    /// planning attempt rather than retry it.
    NonTransient(String),
    /// A transient failure (e.g. a momentary I/O error); safe to retry later.
    Transient(String),
}

/// A pluggable external temporal constraint solver, e.g. a MiniZinc-like CSP
/// binary invoked out-of-process. `tnet` only depends on this trait; nothing
/// here assumes a particular solver exists.
pub trait ExternalTemporalSolver {
    fn identity(&self) -> &str;
    fn solve(&self, stn: &Stn, domain_bound: i64, timeout: Duration) -> Result<SolverOutcome, SolverError>;
}

/// Closes the network with Floyd–Warshall and extracts `time(tp) =
/// -d(origin, tp)`, pinning `origin` to zero per `pin`.
pub struct MatrixFallbackSolver {
    pub pin: PinStrategy,
}

impl MatrixFallbackSolver {
    pub fn new(pin: PinStrategy) -> Self {
        MatrixFallbackSolver { pin }
    }

    pub fn solve(&self, stn: &mut Stn) -> SolverOutcome {
        if !stn.propagate_all() {
            return SolverOutcome::Unsatisfiable;
        }
        match self.pin.resolve(stn) {
            Some(origin) => match stn.extract_assignment(origin) {
                Some(assignment) => SolverOutcome::Assignment(assignment),
                None => SolverOutcome::Unsatisfiable,
            },
            None => SolverOutcome::Assignment(HashMap::new()),
        }
    }
}

/// Validates only the obvious inconsistencies (empty bound intersection,
/// negative self-cycle from a single closure pass) and otherwise reports
/// `Unknown` rather than falsely claiming satisfiability.
pub struct ConservativeChecker;

impl ConservativeChecker {
    pub fn check(&self, stn: &Stn) -> SolverOutcome {
        if stn.is_consistent() {
            SolverOutcome::Unknown
        } else {
            SolverOutcome::Unsatisfiable
        }
    }
}

/// Hierarchical solving strategy: an optional external solver tried first
/// under a timeout, then the matrix fallback, then the conservative checker
/// as a last resort. A non-transient external-solver error blacklists that
/// solver's identity for the remainder of the planning attempt.
pub struct StnSolver {
    external: Vec<Box<dyn ExternalTemporalSolver>>,
    external_timeout: Duration,
    fallback: MatrixFallbackSolver,
    conservative: ConservativeChecker,
    blacklisted: HashSet<String>,
}

impl StnSolver {
    pub fn new(pin: PinStrategy, external_timeout: Duration) -> Self {
        StnSolver {
            external: Vec::new(),
            external_timeout,
            fallback: MatrixFallbackSolver::new(pin),
            conservative: ConservativeChecker,
            blacklisted: HashSet::new(),
        }
    }

    pub fn with_external(mut self, solver: Box<dyn ExternalTemporalSolver>) -> Self {
        self.external.push(solver);
        self
    }

    pub fn is_blacklisted(&self, identity: &str) -> bool {
        self.blacklisted.contains(identity)
    }

    pub fn solve(&mut self, stn: &mut Stn, lod_resolution: f64, time_unit: TimeUnit, max_domain: i64) -> SolverOutcome {
        let bound = domain_bound(lod_resolution, time_unit, max_domain);

        for solver in &self.external {
            if self.blacklisted.contains(solver.identity()) {
                continue;
            }
            match solver.solve(stn, bound, self.external_timeout) {
                Ok(outcome) => {
                    debug!(solver = solver.identity(), "external temporal solver produced an outcome");
                    return outcome;
                }
                Err(SolverError::Timeout) => {
                    debug!(solver = solver.identity(), "external temporal solver timed out, falling back");
                }
                Err(SolverError::Transient(reason)) => {
                    debug!(solver = solver.identity(), reason, "transient external solver error, falling back");
                }
                Err(SolverError::NonTransient(reason)) => {
                    warn!(solver = solver.identity(), reason, "blacklisting external solver for this attempt");
                    self.blacklisted.insert(solver.identity().to_string());
                }
            }
        }

        let fallback = self.fallback.solve(stn);
        if fallback != SolverOutcome::Unknown {
            return fallback;
        }
        self.conservative.check(stn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_bound_scales_and_clamps() {
        assert_eq!(domain_bound(100.0, TimeUnit::Seconds, 1000), 100);
        assert_eq!(domain_bound(100.0, TimeUnit::Micros, 1000), 1000);
        assert_eq!(domain_bound(1.0, TimeUnit::Minutes, 1000), 0);
    }

    #[test]
    fn fallback_solver_extracts_assignment_with_pinned_origin() {
        let mut stn = Stn::new();
        let a = stn.add_time_point();
        let b = stn.add_time_point();
        stn.add_constraint(a, b, 5, 10).unwrap();
        let solver = MatrixFallbackSolver::new(PinStrategy::Explicit(a));
        match solver.solve(&mut stn) {
            SolverOutcome::Assignment(times) => {
                assert_eq!(times[&a], 0);
                assert!(times[&b] >= 5 && times[&b] <= 10);
            }
            other => panic!("expected an assignment, got {other:?}"),
        }
    }

    #[test]
    fn fallback_reports_unsatisfiable_on_contradiction() {
        let mut stn = Stn::new();
        let a = stn.add_time_point();
        let b = stn.add_time_point();
        let c = stn.add_time_point();
        stn.add_constraint(a, b, 5, i64::MAX / 8).unwrap();
        stn.add_constraint(b, c, 5, i64::MAX / 8).unwrap();
        let _ = stn.add_constraint(c, a, 5, i64::MAX / 8);
        let solver = MatrixFallbackSolver::new(PinStrategy::First);
        assert_eq!(solver.solve(&mut stn), SolverOutcome::Unsatisfiable);
    }

    struct AlwaysNonTransient;
    impl ExternalTemporalSolver for AlwaysNonTransient {
        fn identity(&self) -> &str {
            "always-non-transient"
        }
        fn solve(&self, _stn: &Stn, _domain_bound: Bound, _timeout: Duration) -> Result<SolverOutcome, SolverError> {
            Err(SolverError::NonTransient("binary missing".into()))
        }
    }

    #[test]
    fn non_transient_external_error_gets_blacklisted() {
        let mut stn = Stn::new();
        stn.add_time_point();
        let mut solver = StnSolver::new(PinStrategy::First, Duration::from_millis(50))
            .with_external(Box::new(AlwaysNonTransient));
        solver.solve(&mut stn, 10.0, TimeUnit::Seconds, 1000);
        assert!(solver.is_blacklisted("always-non-transient"));
    }
}
