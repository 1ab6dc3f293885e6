//! The HTN planner: a solution-tree builder that refines task, unigoal,
//! multigoal and multitodo methods against a [`domain::Domain`] registry,
//! backtracking over method choice points via a per-attempt blacklist.

mod refine;
mod tree;

pub use refine::{apply_multitodo_methods, plan, plan_with_blacklist, PlanError, PlanOptions};
pub use tree::{Node, NodeId, NodeKind, SolutionTree};
