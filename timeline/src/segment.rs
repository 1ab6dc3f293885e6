use crate::bridge::BridgeKind;
use chrono::{DateTime, Utc};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SegmentMetadata {
    /// 1-based position of this segment among its siblings.
    pub segment_index: usize,
    pub bridge_before: Option<String>,
    pub bridge_after: Option<String>,
    /// Kind of the bridge that opens this segment, if any.
    pub kind: Option<BridgeKind>,
    pub interval_count: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub intervals: Vec<String>,
    pub metadata: SegmentMetadata,
}
