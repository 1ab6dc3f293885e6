use state::Value;
use temporal::Bound;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq)]
pub struct EntityRequirement {
    pub entity_type: String,
    pub capabilities: Vec<String>,
}

impl EntityRequirement {
    pub fn new(entity_type: impl Into<String>, capabilities: Vec<String>) -> Self {
        EntityRequirement { entity_type: entity_type.into(), capabilities }
    }
}

/// Declares a temporal relation this action's metadata contributes once
/// instantiated; `target` names the other action/interval this relation is
/// relative to. Kept as a string tag (rather than `temporal::Relation`
/// directly) since this is the shape domain registration and the plan
/// transformer exchange at their boundary, which may originate from
/// string-typed external requests.
#[derive(Clone, Debug, PartialEq)]
pub struct RelationSpec {
    pub relation_tag: String,
    pub target: String,
    pub bounds: Option<(Bound, Bound)>,
}

pub const KNOWN_RELATION_TAGS: &[&str] = &[
    "EQ",
    "PRECEDES",
    "FOLLOWS",
    "ADJ_F",
    "ADJ_B",
    "WITHIN",
    "CONTAINS",
    "START_ALIGN",
    "START_EXTEND",
    "END_ALIGN",
    "END_EXTEND",
    "OVERLAP_F",
    "OVERLAP_B",
    "FLEXIBLE",
    "MUTEX",
    "RESOURCE_BOUND",
    "FUZZY",
    "CONDITIONAL",
];

#[derive(Clone, Debug, PartialEq)]
pub enum DurationSpec {
    Iso8601(String),
    Seconds(f64),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ActionMetadata {
    pub duration: DurationSpec,
    pub requires_entities: Vec<EntityRequirement>,
    pub temporal_relations: Vec<RelationSpec>,
    pub preconditions: Option<state::Condition>,
    /// Declared effects as `(predicate, subject, value)` triples; `None`
    /// means effects are determined by actually running the action function.
    pub effects: Option<Vec<(String, String, Value)>>,
}

impl ActionMetadata {
    pub fn new(duration: DurationSpec) -> Self {
        ActionMetadata {
            duration,
            requires_entities: Vec::new(),
            temporal_relations: Vec::new(),
            preconditions: None,
            effects: None,
        }
    }

    pub fn with_requires_entities(mut self, requirements: Vec<EntityRequirement>) -> Self {
        self.requires_entities = requirements;
        self
    }

    pub fn with_temporal_relations(mut self, relations: Vec<RelationSpec>) -> Self {
        self.temporal_relations = relations;
        self
    }
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum MetadataError {
    #[error("unrecognized temporal relation tag {0:?}")]
    UnknownRelationTag(String),
    #[error("entity requirement at index {index} has an empty entity type")]
    EmptyEntityType { index: usize },
}

pub fn validate_metadata(metadata: &ActionMetadata) -> Result<(), MetadataError> {
    for relation in &metadata.temporal_relations {
        if !KNOWN_RELATION_TAGS.contains(&relation.relation_tag.as_str()) {
            return Err(MetadataError::UnknownRelationTag(relation.relation_tag.clone()));
        }
    }
    for (index, requirement) in metadata.requires_entities.iter().enumerate() {
        if requirement.entity_type.is_empty() {
            return Err(MetadataError::EmptyEntityType { index });
        }
    }
    Ok(())
}
