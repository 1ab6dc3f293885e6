use crate::value::Value;
use crate::State;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Cmp {
    Gt,
    Lt,
    Ge,
    Le,
}

/// A tagged condition over a [`State`]. Evaluation ([`evaluate_condition`]) is
/// total: a condition that does not type-check against the stored value (e.g.
/// a comparison against a non-numeric fact) evaluates to `false` rather than
/// raising, matching `State`'s pure-and-total reading contract.
#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    Eq {
        predicate: String,
        subject: String,
        value: Value,
    },
    Cmp {
        op: Cmp,
        predicate: String,
        subject: String,
        number: f64,
    },
    Exists {
        predicate: String,
        value: Value,
        subject_filter: Option<String>,
    },
    Forall {
        predicate: String,
        value: Value,
        subject_filter: Vec<String>,
    },
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
}

pub fn evaluate_condition(state: &State, condition: &Condition) -> bool {
    match condition {
        Condition::Eq { predicate, subject, value } => {
            state.get_fact(predicate, subject).map(|v| v == value).unwrap_or(false)
        }
        Condition::Cmp { op, predicate, subject, number } => {
            let stored = match state.get_fact(predicate, subject) {
                Some(v) => v,
                None => return false,
            };
            let stored = match stored.as_number() {
                Some(n) => n,
                None => return false,
            };
            match op {
                Cmp::Gt => stored > *number,
                Cmp::Lt => stored < *number,
                Cmp::Ge => stored >= *number,
                Cmp::Le => stored <= *number,
            }
        }
        Condition::Exists { predicate, value, subject_filter } => {
            state.get_subjects_with_fact(predicate, value).into_iter().any(|subject| {
                subject_filter.as_ref().map(|f| f == &subject).unwrap_or(true)
            })
        }
        Condition::Forall { predicate, value, subject_filter } => {
            if subject_filter.is_empty() {
                return false;
            }
            subject_filter.iter().all(|subject| state.matches(predicate, subject, value))
        }
        Condition::And(conditions) => conditions.iter().all(|c| evaluate_condition(state, c)),
        Condition::Or(conditions) => conditions.iter().any(|c| evaluate_condition(state, c)),
        Condition::Not(inner) => !evaluate_condition(state, inner),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn sample_state() -> State {
        State::new()
            .set_fact("at", "robot1", Value::Str("dock".into()))
            .set_fact("battery", "robot1", Value::Num(42.0))
    }

    #[test]
    fn eq_condition_is_total_on_missing_keys() {
        let state = sample_state();
        let cond = Condition::Eq {
            predicate: "at".into(),
            subject: "robot2".into(),
            value: Value::Str("dock".into()),
        };
        assert!(!evaluate_condition(&state, &cond));
    }

    #[test]
    fn comparison_against_non_numeric_fact_is_false_not_an_error() {
        let state = sample_state();
        let cond = Condition::Cmp {
            op: Cmp::Gt,
            predicate: "at".into(),
            subject: "robot1".into(),
            number: 0.0,
        };
        assert!(!evaluate_condition(&state, &cond));
    }

    #[test]
    fn comparison_respects_operator() {
        let state = sample_state();
        let cond = Condition::Cmp {
            op: Cmp::Ge,
            predicate: "battery".into(),
            subject: "robot1".into(),
            number: 42.0,
        };
        assert!(evaluate_condition(&state, &cond));
    }

    #[test]
    fn and_or_not_compose() {
        let state = sample_state();
        let has_dock = Condition::Eq {
            predicate: "at".into(),
            subject: "robot1".into(),
            value: Value::Str("dock".into()),
        };
        let low_battery = Condition::Cmp {
            op: Cmp::Lt,
            predicate: "battery".into(),
            subject: "robot1".into(),
            number: 10.0,
        };
        assert!(evaluate_condition(&state, &Condition::And(vec![has_dock.clone(), Condition::Not(Box::new(low_battery.clone()))])));
        assert!(!evaluate_condition(&state, &Condition::And(vec![has_dock, low_battery])));
    }

    #[test]
    fn forall_over_empty_subject_filter_is_false() {
        let state = sample_state();
        let cond = Condition::Forall {
            predicate: "at".into(),
            value: Value::Str("dock".into()),
            subject_filter: vec![],
        };
        assert!(!evaluate_condition(&state, &cond));
    }
}
