use crate::metadata::{validate_metadata, ActionMetadata, MetadataError};
use crate::todo::{Multigoal, TodoItem};
use state::{State, Value};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Failure result of an action, command, or method body. Carries an optional
/// human-readable reason for logging; this is the standardized tagged-result
/// shape every method function returns instead of raising.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MethodFailure(pub Option<String>);

impl MethodFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        MethodFailure(Some(reason.into()))
    }
}

pub type ActionFn = Arc<dyn Fn(&State, &[Value]) -> Result<State, MethodFailure> + Send + Sync>;
pub type TaskMethodFn = Arc<dyn Fn(&State, &[Value]) -> Result<Vec<TodoItem>, MethodFailure> + Send + Sync>;
pub type UnigoalMethodFn =
    Arc<dyn Fn(&State, &str, &Value) -> Result<Vec<TodoItem>, MethodFailure> + Send + Sync>;
pub type MultigoalMethodFn = Arc<dyn Fn(&State, &Multigoal) -> Result<Vec<TodoItem>, MethodFailure> + Send + Sync>;
pub type MultitodoMethodFn = Arc<dyn Fn(&State, &[TodoItem]) -> Result<Vec<TodoItem>, MethodFailure> + Send + Sync>;

struct Registered<F> {
    id: String,
    body: F,
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum DomainError {
    #[error("action {0:?} is already registered")]
    DuplicateAction(String),
    #[error("command {0:?} is already registered")]
    DuplicateCommand(String),
    #[error("invalid metadata for {name:?}: {source}")]
    InvalidMetadata { name: String, source: MetadataError },
}

/// Registry of actions, commands, and methods, plus the verify-goals flag.
/// Methods are tried in registration order, matching the planner's
/// requirement that method-try order be deterministic given a fixed seed.
#[derive(Default)]
pub struct Domain {
    actions: HashMap<String, (ActionFn, ActionMetadata)>,
    commands: HashMap<String, ActionFn>,
    task_methods: HashMap<String, Vec<Registered<TaskMethodFn>>>,
    unigoal_methods: HashMap<String, Vec<Registered<UnigoalMethodFn>>>,
    multigoal_methods: Vec<Registered<MultigoalMethodFn>>,
    multitodo_methods: Vec<Registered<MultitodoMethodFn>>,
    pub verify_goals: bool,
}

impl Domain {
    pub fn new() -> Self {
        Domain::default()
    }

    pub fn add_action(
        &mut self,
        name: impl Into<String>,
        body: ActionFn,
        metadata: ActionMetadata,
    ) -> Result<(), DomainError> {
        let name = name.into();
        validate_metadata(&metadata).map_err(|source| DomainError::InvalidMetadata { name: name.clone(), source })?;
        if self.actions.contains_key(&name) {
            return Err(DomainError::DuplicateAction(name));
        }
        self.actions.insert(name, (body, metadata));
        Ok(())
    }

    pub fn add_command(&mut self, name: impl Into<String>, body: ActionFn) -> Result<(), DomainError> {
        let name = name.into();
        if self.commands.contains_key(&name) {
            return Err(DomainError::DuplicateCommand(name));
        }
        self.commands.insert(name, body);
        Ok(())
    }

    pub fn add_task_method(&mut self, task: impl Into<String>, method_id: impl Into<String>, body: TaskMethodFn) {
        self.task_methods
            .entry(task.into())
            .or_default()
            .push(Registered { id: method_id.into(), body });
    }

    pub fn add_unigoal_method(
        &mut self,
        predicate: impl Into<String>,
        method_id: impl Into<String>,
        body: UnigoalMethodFn,
    ) {
        self.unigoal_methods
            .entry(predicate.into())
            .or_default()
            .push(Registered { id: method_id.into(), body });
    }

    pub fn add_multigoal_method(&mut self, method_id: impl Into<String>, body: MultigoalMethodFn) {
        self.multigoal_methods.push(Registered { id: method_id.into(), body });
    }

    pub fn add_multitodo_method(&mut self, method_id: impl Into<String>, body: MultitodoMethodFn) {
        self.multitodo_methods.push(Registered { id: method_id.into(), body });
    }

    pub fn get_action(&self, name: &str) -> Option<&ActionFn> {
        self.actions.get(name).map(|(f, _)| f)
    }

    pub fn get_command(&self, name: &str) -> Option<&ActionFn> {
        self.commands.get(name)
    }

    pub fn get_action_metadata(&self, name: &str) -> Option<&ActionMetadata> {
        self.actions.get(name).map(|(_, m)| m)
    }

    pub fn all_methods_for_task(&self, task: &str) -> Vec<(&str, &TaskMethodFn)> {
        self.task_methods
            .get(task)
            .map(|methods| methods.iter().map(|m| (m.id.as_str(), &m.body)).collect())
            .unwrap_or_default()
    }

    pub fn get_methods_for(&self, predicate: &str) -> Vec<(&str, &UnigoalMethodFn)> {
        self.unigoal_methods
            .get(predicate)
            .map(|methods| methods.iter().map(|m| (m.id.as_str(), &m.body)).collect())
            .unwrap_or_default()
    }

    pub fn multigoal_methods(&self) -> Vec<(&str, &MultigoalMethodFn)> {
        self.multigoal_methods.iter().map(|m| (m.id.as_str(), &m.body)).collect()
    }

    pub fn multitodo_methods(&self) -> Vec<(&str, &MultitodoMethodFn)> {
        self.multitodo_methods.iter().map(|m| (m.id.as_str(), &m.body)).collect()
    }
}
