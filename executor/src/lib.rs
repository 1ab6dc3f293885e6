//! Executes a [`planner::SolutionTree`]'s linear action sequence against the
//! real action/command bindings in a [`domain::Domain`], failing fast on the
//! first unmet entity requirement, timeout, or action error.

use domain::{ActionMetadata, Domain};
use planner::{NodeId, SolutionTree};
use state::{State, Value};
use std::time::{Duration, Instant};

#[derive(Clone, Debug, PartialEq)]
pub enum ActivityOutcome {
    Succeeded,
    TimedOut,
    EntityUnavailable(String),
    ActionFailed(String),
}

#[derive(Clone, Debug)]
pub struct ActivityLogEntry {
    pub node_id: NodeId,
    pub label: String,
    pub outcome: ActivityOutcome,
}

#[derive(Debug)]
pub enum ExecOutcome {
    Success { final_state: State, log: Vec<ActivityLogEntry> },
    Partial { trace: Vec<ActivityLogEntry>, failing_node: NodeId, reason: String },
}

/// Checks an action's declared entity requirements against its bound
/// arguments. Convention: the first `requires_entities.len()` positional
/// arguments name the entity ids the requirements apply to, in order — the
/// same convention the transformer uses when registering entity facts.
fn validate_entities(state: &State, metadata: &ActionMetadata, args: &[Value]) -> Result<(), String> {
    for (index, requirement) in metadata.requires_entities.iter().enumerate() {
        let Some(entity_id) = args.get(index).and_then(|v| v.as_atom().or_else(|| v.as_str())) else {
            return Err(format!("no entity bound for requirement {index} ({})", requirement.entity_type));
        };
        match state.get_fact("type", entity_id) {
            Some(Value::Str(t)) | Some(Value::Atom(t)) if t == &requirement.entity_type => {}
            _ => return Err(format!("entity {entity_id:?} is not of required type {:?}", requirement.entity_type)),
        }
        if !state.matches("status", entity_id, &Value::Str("available".to_string())) {
            return Err(format!("entity {entity_id:?} is not available"));
        }
        if !requirement.capabilities.is_empty() {
            let has_all = match state.get_fact("capabilities", entity_id) {
                Some(Value::List(items)) => requirement
                    .capabilities
                    .iter()
                    .all(|needed| items.iter().any(|v| v.as_str() == Some(needed.as_str()))),
                _ => false,
            };
            if !has_all {
                return Err(format!("entity {entity_id:?} lacks required capabilities {:?}", requirement.capabilities));
            }
        }
    }
    Ok(())
}

pub struct Executor {
    /// Multiplier applied to a durative action's declared duration to get its
    /// execution timeout budget.
    pub safety_factor: f64,
}

impl Default for Executor {
    fn default() -> Self {
        Executor { safety_factor: 2.0 }
    }
}

impl Executor {
    pub fn new(safety_factor: f64) -> Self {
        Executor { safety_factor }
    }

    pub fn run(&self, domain: &Domain, tree: &SolutionTree, state: &State) -> ExecOutcome {
        let mut log = Vec::new();
        let mut current_state = state.clone();

        for node_id in tree.flatten_actions() {
            let node = tree.node(node_id);
            let Some(name) = node.action_name.clone() else { continue };
            let args = node.action_args.clone();

            if let Some(metadata) = domain.get_action_metadata(&name) {
                if let Err(reason) = validate_entities(&current_state, metadata, &args) {
                    log.push(ActivityLogEntry { node_id, label: node.label.clone(), outcome: ActivityOutcome::EntityUnavailable(reason.clone()) });
                    return ExecOutcome::Partial { trace: log, failing_node: node_id, reason };
                }
            }

            // a registered command is preferred over the planning-time action
            // simulation when both exist, since it's the one that actually
            // drives the external world.
            let body = domain.get_command(&name).or_else(|| domain.get_action(&name));
            let Some(body) = body.cloned() else {
                let reason = format!("no action or command registered for {name:?}");
                log.push(ActivityLogEntry { node_id, label: node.label.clone(), outcome: ActivityOutcome::ActionFailed(reason.clone()) });
                return ExecOutcome::Partial { trace: log, failing_node: node_id, reason };
            };

            let budget = node
                .durative
                .then(|| domain.get_action_metadata(&name))
                .flatten()
                .and_then(|meta| duration_budget(meta, self.safety_factor));

            let started = Instant::now();
            let result = body(&current_state, &args);
            let elapsed = started.elapsed();

            if let Some(budget) = budget {
                if elapsed > budget {
                    log.push(ActivityLogEntry { node_id, label: node.label.clone(), outcome: ActivityOutcome::TimedOut });
                    return ExecOutcome::Partial {
                        trace: log,
                        failing_node: node_id,
                        reason: format!("{name} exceeded its {budget:?} execution budget"),
                    };
                }
            }

            match result {
                Ok(new_state) => {
                    current_state = new_state;
                    log.push(ActivityLogEntry { node_id, label: node.label.clone(), outcome: ActivityOutcome::Succeeded });
                }
                Err(failure) => {
                    let reason = failure.0.unwrap_or_else(|| "action failed".to_string());
                    log.push(ActivityLogEntry { node_id, label: node.label.clone(), outcome: ActivityOutcome::ActionFailed(reason.clone()) });
                    return ExecOutcome::Partial { trace: log, failing_node: node_id, reason };
                }
            }
        }

        ExecOutcome::Success { final_state: current_state, log }
    }
}

fn duration_budget(metadata: &ActionMetadata, safety_factor: f64) -> Option<Duration> {
    let seconds = match &metadata.duration {
        domain::DurationSpec::Seconds(secs) => *secs,
        domain::DurationSpec::Iso8601(text) => temporal::parse_iso8601_duration(text).ok()?.num_milliseconds() as f64 / 1000.0,
    };
    Some(Duration::from_secs_f64((seconds * safety_factor).max(0.0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{DurationSpec, EntityRequirement, MethodFailure, TodoItem};
    use planner::{plan, PlanOptions};
    use std::sync::Arc;

    fn entity_state() -> State {
        State::new()
            .set_fact("type", "a1", Value::Str("agent".into()))
            .set_fact("status", "a1", Value::Str("available".into()))
            .set_fact("capabilities", "a1", Value::List(vec![Value::Str("moving".into())]))
            .set_fact("location", "a1", Value::Str("home".into()))
    }

    fn move_domain() -> Domain {
        let mut domain = Domain::new();
        domain
            .add_action(
                "move",
                Arc::new(|s: &State, args: &[Value]| {
                    let dest = args[1].as_str().unwrap_or_default().to_string();
                    Ok(s.clone().set_fact("location", args[0].as_str().unwrap_or_default(), Value::Str(dest)))
                }),
                ActionMetadata::new(DurationSpec::Seconds(0.001))
                    .with_requires_entities(vec![EntityRequirement::new("agent", vec!["moving".to_string()])]),
            )
            .unwrap();
        domain
    }

    #[test]
    fn successful_run_advances_state_and_logs_one_entry() {
        let domain = move_domain();
        let state = entity_state();
        let todos = vec![TodoItem::Action { name: "move".into(), args: vec![Value::Str("a1".into()), Value::Str("shop".into())] }];
        let tree = plan(&domain, &state, todos, &PlanOptions::default()).unwrap();
        let outcome = Executor::default().run(&domain, &tree, &state);
        match outcome {
            ExecOutcome::Success { final_state, log } => {
                assert_eq!(final_state.get_fact("location", "a1"), Some(&Value::Str("shop".into())));
                assert_eq!(log.len(), 1);
                assert_eq!(log[0].outcome, ActivityOutcome::Succeeded);
            }
            ExecOutcome::Partial { reason, .. } => panic!("expected success, got {reason}"),
        }
    }

    #[test]
    fn unavailable_entity_fails_fast_before_invoking_the_action() {
        let domain = move_domain();
        let state = entity_state().set_fact("status", "a1", Value::Str("busy".into()));
        let todos = vec![TodoItem::Action { name: "move".into(), args: vec![Value::Str("a1".into()), Value::Str("shop".into())] }];
        let tree = plan(&domain, &state, todos, &PlanOptions::default()).unwrap();
        let outcome = Executor::default().run(&domain, &tree, &state);
        match outcome {
            ExecOutcome::Partial { trace, .. } => {
                assert_eq!(trace.len(), 1);
                assert!(matches!(trace[0].outcome, ActivityOutcome::EntityUnavailable(_)));
            }
            ExecOutcome::Success { .. } => panic!("expected entity unavailability to fail execution"),
        }
    }

    #[test]
    fn registered_command_is_preferred_over_the_action_at_execution_time() {
        let mut domain = move_domain();
        domain
            .add_command(
                "move",
                Arc::new(|s: &State, args: &[Value]| {
                    let dest = args[1].as_str().unwrap_or_default().to_string();
                    Ok(s.clone().set_fact("location", args[0].as_str().unwrap_or_default(), Value::Str(format!("commanded:{dest}"))))
                }),
            )
            .unwrap();
        let state = entity_state();
        let todos = vec![TodoItem::Action { name: "move".into(), args: vec![Value::Str("a1".into()), Value::Str("shop".into())] }];
        let tree = plan(&domain, &state, todos, &PlanOptions::default()).unwrap();
        let outcome = Executor::default().run(&domain, &tree, &state);
        match outcome {
            ExecOutcome::Success { final_state, .. } => {
                assert_eq!(final_state.get_fact("location", "a1"), Some(&Value::Str("commanded:shop".into())));
            }
            ExecOutcome::Partial { reason, .. } => panic!("expected success, got {reason}"),
        }
    }

    #[test]
    fn action_failure_reports_partial_outcome() {
        let mut domain = Domain::new();
        domain
            .add_action(
                "fail_always",
                Arc::new(|_: &State, _: &[Value]| Err(MethodFailure::new("deliberately unreachable"))),
                ActionMetadata::new(DurationSpec::Seconds(0.001)),
            )
            .unwrap();
        let state = State::new();
        let todos = vec![TodoItem::Action { name: "fail_always".into(), args: vec![] }];
        // planning itself fails for an action whose body errors, so build the
        // tree by hand via a trivially-succeeding stand-in, then execute
        // against the domain that only has the failing binding registered.
        let mut planning_domain = Domain::new();
        planning_domain
            .add_action("fail_always", Arc::new(|s: &State, _: &[Value]| Ok(s.clone())), ActionMetadata::new(DurationSpec::Seconds(0.001)))
            .unwrap();
        let tree = plan(&planning_domain, &state, todos, &PlanOptions::default()).unwrap();
        let outcome = Executor::default().run(&domain, &tree, &state);
        match outcome {
            ExecOutcome::Partial { trace, .. } => {
                assert!(matches!(trace[0].outcome, ActivityOutcome::ActionFailed(_)));
            }
            ExecOutcome::Success { .. } => panic!("expected the real action binding to fail"),
        }
    }
}
