use crate::bridge::{Bridge, BridgeKind};
use crate::segment::{Segment, SegmentMetadata};
use chrono::{DateTime, Utc};
use state::Value;
use std::collections::HashMap;
use temporal::{Interval, TpId};
use thiserror::Error;
use tnet::Stn;

/// Minimum widening applied to a fixed-point duration or equality constraint
/// before it reaches the STN, expressed in the network's tick unit
/// (microseconds). `timeline` is the sole place in this system allowed to
/// perform this widening.
pub const MIN_EPSILON: i64 = 1;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum TimelineError {
    #[error("interval id {0:?} is already present")]
    DuplicateInterval(String),
    #[error("interval id {0:?} is not present")]
    UnknownInterval(String),
    #[error("bridge id {0:?} is already present")]
    DuplicateBridge(String),
    #[error("bridge id {0:?} is not present")]
    UnknownBridge(String),
    #[error("the duration constraint for interval {0:?} makes the timeline inconsistent")]
    Inconsistent(String),
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum BridgePlacementError {
    #[error("bridge {bridge:?} sits at or before the timeline's start ({start})")]
    AtOrBeforeStart { bridge: String, start: DateTime<Utc> },
    #[error("bridge {bridge:?} sits at or after the timeline's end ({end})")]
    AtOrAfterEnd { bridge: String, end: DateTime<Utc> },
}

/// Widens a `lower == upper` constraint to `(lower - epsilon, upper +
/// epsilon)`. Any other bound pair is returned unchanged.
pub fn widen_fixed_point(lower: i64, upper: i64, epsilon: i64) -> (i64, i64) {
    if lower == upper {
        (lower - epsilon.max(1), upper + epsilon.max(1))
    } else {
        (lower, upper)
    }
}

struct IntervalEntry {
    interval: Interval,
    start_tp: TpId,
    end_tp: TpId,
}

/// A container of intervals and bridges backed by a shared [`Stn`]. Adding an
/// interval inserts its start/end timepoints and a (widened) duration
/// constraint; removing one retracts both timepoints and every constraint
/// mentioning them via [`Stn::remove_timepoints`].
pub struct Timeline {
    intervals: HashMap<String, IntervalEntry>,
    bridges: HashMap<String, Bridge>,
    pub metadata: HashMap<String, Value>,
    stn: Stn,
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Timeline {
    pub fn new() -> Self {
        Timeline {
            intervals: HashMap::new(),
            bridges: HashMap::new(),
            metadata: HashMap::new(),
            stn: Stn::new(),
        }
    }

    pub fn add_interval(&mut self, id: impl Into<String>, interval: Interval) -> Result<(), TimelineError> {
        let id = id.into();
        if self.intervals.contains_key(&id) {
            return Err(TimelineError::DuplicateInterval(id));
        }
        let start_tp = self.stn.add_time_point();
        let end_tp = self.stn.add_time_point();
        let micros = interval.duration().num_microseconds().unwrap_or(i64::MAX / 8);
        let (lower, upper) = widen_fixed_point(micros, micros, MIN_EPSILON);
        if self.stn.add_constraint(start_tp, end_tp, lower, upper).is_err() {
            return Err(TimelineError::Inconsistent(id));
        }
        self.intervals.insert(id, IntervalEntry { interval, start_tp, end_tp });
        Ok(())
    }

    pub fn remove_interval(&mut self, id: &str) -> Result<(), TimelineError> {
        let entry = self.intervals.remove(id).ok_or_else(|| TimelineError::UnknownInterval(id.to_string()))?;
        self.stn.remove_timepoints(&[entry.start_tp, entry.end_tp]);
        Ok(())
    }

    pub fn get_interval(&self, id: &str) -> Option<&Interval> {
        self.intervals.get(id).map(|e| &e.interval)
    }

    pub fn interval_ids(&self) -> impl Iterator<Item = &str> {
        self.intervals.keys().map(String::as_str)
    }

    /// The `(start, end)` timepoint pair backing a registered interval, for
    /// callers that need to compile further temporal relations against it.
    pub fn interval_timepoints(&self, id: &str) -> Option<(TpId, TpId)> {
        self.intervals.get(id).map(|e| (e.start_tp, e.end_tp))
    }

    pub fn add_bridge(&mut self, bridge: Bridge) -> Result<(), TimelineError> {
        if self.bridges.contains_key(&bridge.id) {
            return Err(TimelineError::DuplicateBridge(bridge.id));
        }
        self.bridges.insert(bridge.id.clone(), bridge);
        Ok(())
    }

    pub fn remove_bridge(&mut self, id: &str) -> Result<(), TimelineError> {
        self.bridges.remove(id).map(|_| ()).ok_or_else(|| TimelineError::UnknownBridge(id.to_string()))
    }

    pub fn bridges_in_range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<&Bridge> {
        let mut found: Vec<&Bridge> = self.bridges.values().filter(|b| b.position >= from && b.position <= to).collect();
        found.sort_by_key(|b| b.position);
        found
    }

    fn sorted_bridges(&self) -> Vec<&Bridge> {
        let mut bridges: Vec<&Bridge> = self.bridges.values().collect();
        bridges.sort_by_key(|b| b.position);
        bridges
    }

    fn overall_span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let starts = self.intervals.values().map(|e| e.interval.start);
        let ends = self.intervals.values().map(|e| e.interval.end);
        let start = starts.min()?;
        let end = ends.max()?;
        Some((start, end))
    }

    /// Bridges must lie strictly inside the timeline's overall span, never at
    /// or beyond its boundary.
    pub fn validate_all_bridge_placements(&self) -> Result<(), Vec<BridgePlacementError>> {
        let Some((start, end)) = self.overall_span() else {
            return Ok(());
        };
        let mut errors = Vec::new();
        for bridge in self.bridges.values() {
            if bridge.position <= start {
                errors.push(BridgePlacementError::AtOrBeforeStart { bridge: bridge.id.clone(), start });
            } else if bridge.position >= end {
                errors.push(BridgePlacementError::AtOrAfterEnd { bridge: bridge.id.clone(), end });
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Splits the timeline into `N + 1` segments around its `N` bridges,
    /// sorted by position. Total over any configuration, including zero
    /// bridges (a single segment spanning the whole timeline).
    pub fn segment_by_bridges(&self) -> Vec<Segment> {
        let bridges = self.sorted_bridges();
        let span = self.overall_span();
        let boundaries: Vec<Option<&Bridge>> = {
            let mut v = vec![None];
            v.extend(bridges.iter().map(|b| Some(*b)));
            v
        };

        let mut segments = Vec::with_capacity(boundaries.len());
        for (index, &bridge_before) in boundaries.iter().enumerate() {
            let bridge_after = bridges.get(index).copied();
            let start = bridge_before.map(|b| b.position).or(span.map(|(s, _)| s));
            let end = bridge_after.map(|b| b.position).or(span.map(|(_, e)| e));
            let intervals = self.intervals_within(start, end);
            segments.push(Segment {
                start,
                end,
                metadata: SegmentMetadata {
                    segment_index: index + 1,
                    bridge_before: bridge_before.map(|b| b.id.clone()),
                    bridge_after: bridge_after.map(|b| b.id.clone()),
                    kind: bridge_after.map(|b| b.kind),
                    interval_count: intervals.len(),
                },
                intervals,
            });
        }
        segments
    }

    fn intervals_within(&self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Vec<String> {
        self.intervals
            .iter()
            .filter(|(_, e)| {
                let after_start = start.map(|s| e.interval.start >= s).unwrap_or(true);
                let before_end = end.map(|en| e.interval.end <= en).unwrap_or(true);
                after_start && before_end
            })
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Inserts bridges automatically per `policy`, skipping any interval too
    /// short to place a bridge strictly inside it.
    pub fn auto_insert_bridges(&mut self, policy: AutoBridgePolicy) -> Vec<String> {
        let mut inserted = Vec::new();
        let candidates: Vec<(String, DateTime<Utc>)> = self
            .intervals
            .iter()
            .filter(|(_, e)| e.interval.start < e.interval.end)
            .map(|(id, e)| {
                let midpoint = e.interval.start + e.interval.duration() / 2;
                (id.clone(), midpoint)
            })
            .collect();

        for (interval_id, position) in candidates {
            let bridge_id = format!("auto:{interval_id}");
            if self.bridges.contains_key(&bridge_id) {
                continue;
            }
            let bridge = Bridge::new(bridge_id.clone(), position, policy.kind());
            if self.add_bridge(bridge).is_ok() {
                inserted.push(bridge_id);
            }
        }
        inserted
    }

    pub fn consistent(&self) -> bool {
        self.stn.is_consistent()
    }

    /// Re-runs propagation over the underlying STN and reports consistency.
    pub fn apply_closure(&mut self) -> bool {
        self.stn.propagate_all()
    }

    pub fn stn(&self) -> &Stn {
        &self.stn
    }

    pub fn stn_mut(&mut self) -> &mut Stn {
        &mut self.stn
    }

    /// Pairs the timeline with its current bridge segmentation; a read-only
    /// convenience view, not a persistent structure.
    pub fn with_bridge_segmentation(&self) -> (&Timeline, Vec<Segment>) {
        (self, self.segment_by_bridges())
    }
}

/// Policy for [`Timeline::auto_insert_bridges`].
#[derive(Copy, Clone, Debug)]
pub enum AutoBridgePolicy {
    /// Insert a sync bridge at the midpoint of every interval.
    Midpoint,
    /// Insert a decision bridge at the midpoint of every interval.
    MidpointDecision,
}

impl AutoBridgePolicy {
    fn kind(self) -> BridgeKind {
        match self {
            AutoBridgePolicy::Midpoint => BridgeKind::Sync,
            AutoBridgePolicy::MidpointDecision => BridgeKind::Decision,
        }
    }
}
