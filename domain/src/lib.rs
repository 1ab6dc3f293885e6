//! The domain registry: actions, commands, and the four method kinds the HTN
//! planner refines against, plus the per-attempt method blacklist.

mod blacklist;
mod metadata;
mod registry;
mod todo;

pub use blacklist::{fingerprint, Blacklist};
pub use metadata::{
    validate_metadata, ActionMetadata, DurationSpec, EntityRequirement, MetadataError, RelationSpec,
    KNOWN_RELATION_TAGS,
};
pub use registry::{
    ActionFn, Domain, DomainError, MethodFailure, MultigoalMethodFn, MultitodoMethodFn, TaskMethodFn,
    UnigoalMethodFn,
};
pub use todo::{Multigoal, TodoItem, UnigoalSpec};
