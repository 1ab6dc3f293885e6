use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum StateError {
    #[error("no fact for predicate {predicate:?} subject {subject:?}")]
    NotFound { predicate: String, subject: String },
}

/// A single `(predicate, subject, value)` triple, used for the wire/interop
/// representation returned by [`State::to_triples`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Triple {
    pub predicate: String,
    pub subject: String,
    pub value: Value,
}

type Key = (String, String);

/// A predicate-centric triple store: `(predicate, subject) -> value`.
///
/// `State` is logically immutable: every mutating operation consumes `self`
/// and returns a new `State`. The backing map is held behind an `Arc` and
/// cloned copy-on-write, so a chain of non-aliased writes costs one clone of
/// the changed map rather than a clone of every snapshot along the way.
#[derive(Clone, Debug, Default)]
pub struct State {
    facts: Arc<HashMap<Key, Value>>,
}

impl State {
    pub fn new() -> Self {
        State { facts: Arc::new(HashMap::new()) }
    }

    pub fn with_facts(initial: HashMap<Key, Value>) -> Self {
        State { facts: Arc::new(initial) }
    }

    /// Idempotent for an identical value: writing the same `(predicate,
    /// subject, value)` twice returns a `State` equal in content to writing
    /// it once, and an `Arc::clone` rather than a fresh allocation when the
    /// entry is already present and unchanged.
    pub fn set_fact(mut self, predicate: &str, subject: &str, value: Value) -> Self {
        let key = (predicate.to_string(), subject.to_string());
        if self.facts.get(&key) == Some(&value) {
            return self;
        }
        Arc::make_mut(&mut self.facts).insert(key, value);
        self
    }

    pub fn remove_fact(mut self, predicate: &str, subject: &str) -> Self {
        let key = (predicate.to_string(), subject.to_string());
        if self.facts.contains_key(&key) {
            Arc::make_mut(&mut self.facts).remove(&key);
        }
        self
    }

    pub fn get_fact(&self, predicate: &str, subject: &str) -> Option<&Value> {
        self.facts.get(&(predicate.to_string(), subject.to_string()))
    }

    pub fn try_get_fact(&self, predicate: &str, subject: &str) -> Result<&Value, StateError> {
        self.get_fact(predicate, subject).ok_or_else(|| StateError::NotFound {
            predicate: predicate.to_string(),
            subject: subject.to_string(),
        })
    }

    pub fn has_predicate(&self, predicate: &str) -> bool {
        self.facts.keys().any(|(p, _)| p == predicate)
    }

    pub fn get_subjects_with_fact(&self, predicate: &str, value: &Value) -> Vec<String> {
        self.facts
            .iter()
            .filter(|((p, _), v)| p == predicate && *v == value)
            .map(|((_, s), _)| s.clone())
            .collect()
    }

    pub fn get_subjects_with_predicate(&self, predicate: &str) -> Vec<String> {
        self.facts.keys().filter(|(p, _)| p == predicate).map(|(_, s)| s.clone()).collect()
    }

    pub fn matches(&self, predicate: &str, subject: &str, value: &Value) -> bool {
        self.get_fact(predicate, subject) == Some(value)
    }

    pub fn exists(&self, predicate: &str, value: &Value) -> bool {
        !self.get_subjects_with_fact(predicate, value).is_empty()
    }

    pub fn forall(&self, predicate: &str, value: &Value, subjects: &[String]) -> bool {
        !subjects.is_empty() && subjects.iter().all(|s| self.matches(predicate, s, value))
    }

    pub fn to_triples(&self) -> Vec<Triple> {
        self.facts
            .iter()
            .map(|((predicate, subject), value)| Triple {
                predicate: predicate.clone(),
                subject: subject.clone(),
                value: value.clone(),
            })
            .collect()
    }

    pub fn from_triples(triples: Vec<Triple>) -> Self {
        let facts = triples
            .into_iter()
            .map(|t| ((t.predicate, t.subject), t.value))
            .collect::<HashMap<_, _>>();
        State::with_facts(facts)
    }

    /// Merges `other` into `self`; on key collision `other`'s value wins.
    pub fn merge(self, other: State) -> Self {
        let mut merged = (*self.facts).clone();
        for (k, v) in other.facts.iter() {
            merged.insert(k.clone(), v.clone());
        }
        State::with_facts(merged)
    }

    pub fn copy(&self) -> Self {
        self.clone()
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_fact_distinguishes_missing_from_stored_none_like_value() {
        let state = State::new().set_fact("at", "robot1", Value::Atom("nil".into()));
        assert_eq!(state.get_fact("at", "robot1"), Some(&Value::Atom("nil".into())));
        assert_eq!(state.get_fact("at", "robot2"), None);
        assert!(state.try_get_fact("at", "robot2").is_err());
    }

    #[test]
    fn set_fact_is_idempotent_for_identical_value() {
        let s1 = State::new().set_fact("at", "robot1", Value::Str("dock".into()));
        let s2 = s1.clone().set_fact("at", "robot1", Value::Str("dock".into()));
        assert_eq!(s1.to_triples(), s2.to_triples());
    }

    #[test]
    fn triples_round_trip() {
        let state = State::new()
            .set_fact("at", "robot1", Value::Str("dock".into()))
            .set_fact("battery", "robot1", Value::Num(90.0));
        let triples = state.to_triples();
        let restored = State::from_triples(triples);
        assert_eq!(restored.get_fact("at", "robot1"), Some(&Value::Str("dock".into())));
        assert_eq!(restored.get_fact("battery", "robot1"), Some(&Value::Num(90.0)));
    }

    #[test]
    fn merge_right_wins() {
        let left = State::new().set_fact("at", "robot1", Value::Str("dock".into()));
        let right = State::new().set_fact("at", "robot1", Value::Str("bay".into()));
        let merged = left.merge(right);
        assert_eq!(merged.get_fact("at", "robot1"), Some(&Value::Str("bay".into())));
    }

    #[test]
    fn writes_do_not_mutate_prior_snapshot() {
        let s1 = State::new().set_fact("at", "robot1", Value::Str("dock".into()));
        let s2 = s1.clone().set_fact("at", "robot1", Value::Str("bay".into()));
        assert_eq!(s1.get_fact("at", "robot1"), Some(&Value::Str("dock".into())));
        assert_eq!(s2.get_fact("at", "robot1"), Some(&Value::Str("bay".into())));
    }
}
