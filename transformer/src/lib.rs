//! Pure conversion of an external planning request — activities, entities,
//! goals and constraints exchanged in a loosely-typed wire shape — into the
//! `(Domain, State, Vec<TodoItem>)` triple the planner actually consumes.

use domain::{ActionMetadata, Domain, DomainError, DurationSpec, EntityRequirement, MethodFailure, RelationSpec, TodoItem, UnigoalSpec};
use serde::{Deserialize, Serialize};
use state::{State, Value};
use std::sync::Arc;
use thiserror::Error;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DurationInput {
    Iso8601(String),
    Seconds(f64),
}

impl From<DurationInput> for DurationSpec {
    fn from(input: DurationInput) -> Self {
        match input {
            DurationInput::Iso8601(s) => DurationSpec::Iso8601(s),
            DurationInput::Seconds(n) => DurationSpec::Seconds(n),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActivitySpec {
    pub name: String,
    pub duration: DurationInput,
    #[serde(default)]
    pub requires_entities: Vec<EntityRequirementSpec>,
    /// Declared effects; `None` means the activity is a no-op placeholder
    /// until a real action body is registered over it separately.
    #[serde(default)]
    pub effects: Vec<(String, String, Value)>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntityRequirementSpec {
    pub entity_type: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntitySpec {
    pub id: String,
    pub entity_type: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GoalSpec {
    pub predicate: String,
    pub subject: String,
    pub value: Value,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConstraintSpec {
    pub relation_tag: String,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub bounds: Option<(i64, i64)>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PlanRequest {
    #[serde(default)]
    pub activities: Vec<ActivitySpec>,
    #[serde(default)]
    pub entities: Vec<EntitySpec>,
    #[serde(default)]
    pub goals: Vec<GoalSpec>,
    #[serde(default)]
    pub constraints: Vec<ConstraintSpec>,
    /// When `true`, each activity is wrapped in a task the planner refines
    /// through a method before reaching the durative action; when `false`,
    /// the activity is scheduled directly as a `DurativeAction` todo.
    #[serde(default)]
    pub hierarchical: bool,
}

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("invalid domain registration for activity {0:?}: {1}")]
    InvalidActivity(String, DomainError),
    #[error("duplicate activity name {0:?}")]
    DuplicateActivity(String),
}

/// Converts a request into a ready-to-plan `(Domain, State, Vec<TodoItem>)`
/// triple. Total and side-effect-free beyond constructing the returned
/// values — never touches the filesystem, network, or wall clock.
pub fn convert(request: PlanRequest) -> Result<(Domain, State, Vec<TodoItem>), TransformError> {
    let mut domain = Domain::new();
    let mut state = State::new();

    for entity in &request.entities {
        state = state
            .set_fact("type", &entity.id, Value::Str(entity.entity_type.clone()))
            .set_fact("status", &entity.id, Value::Str("available".to_string()))
            .set_fact(
                "capabilities",
                &entity.id,
                Value::List(entity.capabilities.iter().cloned().map(Value::Str).collect()),
            );
    }

    for activity in &request.activities {
        let relations: Vec<RelationSpec> = request
            .constraints
            .iter()
            .filter(|c| c.from == activity.name)
            .map(|c| RelationSpec { relation_tag: c.relation_tag.clone(), target: c.to.clone(), bounds: c.bounds })
            .collect();

        let metadata = ActionMetadata::new(activity.duration.clone().into())
            .with_requires_entities(activity.requires_entities.iter().map(|r| EntityRequirement::new(r.entity_type.clone(), r.capabilities.clone())).collect())
            .with_temporal_relations(relations);

        let effects = activity.effects.clone();
        let body: domain::ActionFn = Arc::new(move |s: &State, _args: &[Value]| -> Result<State, MethodFailure> {
            let mut next = s.clone();
            for (predicate, subject, value) in &effects {
                next = next.set_fact(predicate, subject, value.clone());
            }
            Ok(next)
        });

        domain.add_action(activity.name.clone(), body, metadata).map_err(|e| match e {
            DomainError::DuplicateAction(name) => TransformError::DuplicateActivity(name),
            other => TransformError::InvalidActivity(activity.name.clone(), other),
        })?;

        if request.hierarchical {
            let action_name = activity.name.clone();
            domain.add_task_method(
                activity.name.clone(),
                "direct",
                Arc::new(move |_: &State, args: &[Value]| {
                    Ok(vec![TodoItem::DurativeAction { name: action_name.clone(), args: args.to_vec() }])
                }),
            );
        }
    }

    let mut todos: Vec<TodoItem> = request
        .activities
        .iter()
        .map(|activity| {
            if request.hierarchical {
                TodoItem::Task { name: activity.name.clone(), args: Vec::new() }
            } else {
                TodoItem::DurativeAction { name: activity.name.clone(), args: Vec::new() }
            }
        })
        .collect();

    todos.extend(request.goals.iter().map(|g| {
        TodoItem::Goal(UnigoalSpec { predicate: g.predicate.clone(), subject: g.subject.clone(), value: g.value.clone() })
    }));

    Ok((domain, state, todos))
}
