//! The planner's fact store: a predicate-centric triple map with pure,
//! logically-immutable reads and writes, plus the `Condition` language used to
//! gate task methods and goals.

mod condition;
mod state;
mod value;

pub use condition::{evaluate_condition, Cmp, Condition};
pub use state::{State, StateError, Triple};
pub use value::Value;
