use crate::config::PlannerConfig;
use coordinator::{
    CancellationToken, CloneStateStrategy, Coordinator, HtnPlannerStrategy, LinearExecutionStrategy, LoggingStrategy,
    NullLogger, OwnedDomainStrategy, StnTemporalStrategy, TracingLogger,
};
use domain::{Domain, TodoItem};
use executor::ActivityLogEntry;
use state::State;

/// Dispatches to one of the coordinator's built-in loggers. A plain enum
/// rather than `Box<dyn LoggingStrategy>` since there are exactly two
/// choices and [`Planner`]'s type needs to stay nameable without a trait
/// object indirection in its signature.
pub enum Logger {
    Null(NullLogger),
    Tracing(TracingLogger),
}

impl LoggingStrategy for Logger {
    fn log_replan(&self, attempt: u32, reason: &str) {
        match self {
            Logger::Null(l) => l.log_replan(attempt, reason),
            Logger::Tracing(l) => l.log_replan(attempt, reason),
        }
    }

    fn log_failure(&self, stage: &str, detail: &str) {
        match self {
            Logger::Null(l) => l.log_failure(stage, detail),
            Logger::Tracing(l) => l.log_failure(stage, detail),
        }
    }
}

type BuiltCoordinator =
    Coordinator<HtnPlannerStrategy, StnTemporalStrategy, CloneStateStrategy, OwnedDomainStrategy, Logger, LinearExecutionStrategy>;

/// Runs the plan/validate/execute/replan cycle against one fixed domain and
/// configuration. Constructed via [`PlannerBuilder`]; mirrors the teacher's
/// `Stn::new()`-plus-incremental-mutation top-level construction style, just
/// at the facade's scale (build once, `run` many times against different
/// starting states and todos).
pub struct Planner {
    coordinator: BuiltCoordinator,
}

impl Planner {
    pub fn run(
        &self,
        state: &State,
        todos: &[TodoItem],
        cancel: &CancellationToken,
    ) -> anyhow::Result<(State, Vec<ActivityLogEntry>)> {
        Ok(self.coordinator.run(state, todos, cancel)?)
    }
}

/// Builds a [`Planner`] from a domain and configuration, matching
/// `GTRusthop`'s `PlannerBuilder` shape.
pub struct PlannerBuilder {
    domain: Domain,
    config: PlannerConfig,
    logger: Logger,
    executor_safety_factor: f64,
}

impl PlannerBuilder {
    pub fn new(domain: Domain) -> Self {
        PlannerBuilder { domain, config: PlannerConfig::default(), logger: Logger::Tracing(TracingLogger), executor_safety_factor: 2.0 }
    }

    pub fn with_config(mut self, config: PlannerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_null_logger(mut self) -> Self {
        self.logger = Logger::Null(NullLogger);
        self
    }

    pub fn with_executor_safety_factor(mut self, factor: f64) -> Self {
        self.executor_safety_factor = factor;
        self
    }

    pub fn build(self) -> Planner {
        let coordinator = Coordinator::new(
            HtnPlannerStrategy,
            StnTemporalStrategy,
            CloneStateStrategy,
            OwnedDomainStrategy(self.domain),
            self.logger,
            LinearExecutionStrategy { executor: executor::Executor::new(self.executor_safety_factor) },
            self.config.max_retries,
            self.config.seed,
        );
        Planner { coordinator }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{ActionMetadata, DurationSpec};
    use state::Value;
    use std::sync::Arc;

    #[test]
    fn builder_runs_a_single_action_domain_to_completion() {
        let mut domain = Domain::new();
        domain
            .add_action(
                "move",
                Arc::new(|s: &State, args: &[Value]| {
                    let dest = args[0].as_str().unwrap_or_default().to_string();
                    Ok(s.clone().set_fact("at", "r1", Value::Str(dest)))
                }),
                ActionMetadata::new(DurationSpec::Seconds(1.0)),
            )
            .unwrap();

        let planner = PlannerBuilder::new(domain).with_null_logger().build();
        let todos = vec![TodoItem::Action { name: "move".into(), args: vec![Value::Str("shop".into())] }];
        let (final_state, log) = planner.run(&State::new(), &todos, &CancellationToken::new()).unwrap();
        assert_eq!(final_state.get_fact("at", "r1"), Some(&Value::Str("shop".into())));
        assert_eq!(log.len(), 1);
    }
}
