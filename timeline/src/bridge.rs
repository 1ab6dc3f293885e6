use chrono::{DateTime, Utc};
use state::Value;
use std::collections::HashMap;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BridgeKind {
    Decision,
    Event,
    Sync,
}

/// A point that partitions a timeline into segments: a decision point, an
/// external event, or a synchronization point between otherwise independent
/// intervals.
#[derive(Clone, Debug, PartialEq)]
pub struct Bridge {
    pub id: String,
    pub position: DateTime<Utc>,
    pub kind: BridgeKind,
    pub metadata: HashMap<String, Value>,
}

impl Bridge {
    pub fn new(id: impl Into<String>, position: DateTime<Utc>, kind: BridgeKind) -> Self {
        Bridge {
            id: id.into(),
            position,
            kind,
            metadata: HashMap::new(),
        }
    }
}
