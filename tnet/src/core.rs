use backtrack::{Backtrack, BacktrackWith, DecLvl, ObsTrail};
use std::collections::HashMap;
use temporal::{add_bounds, Bound, TpId, INFINITE};
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum StnError {
    #[error("lower bound {lower} exceeds upper bound {upper}")]
    InvalidBounds { lower: Bound, upper: Bound },
    #[error("constraint ({lower}, {lower}) is a fixed point; widen it at the Bridge layer before it reaches the STN")]
    FixedPointConstraint { lower: Bound },
    #[error("constraint makes the network inconsistent (witness timepoint {witness:?})")]
    Inconsistent { witness: TpId },
    #[error("timepoint {0:?} is not part of this network")]
    UnknownTimepoint(TpId),
}

/// `(lower, upper)` bound pair on `time(j) - time(i)`.
pub type Bounds = (Bound, Bound);

/// `intersect(a, b) = (max(a.lo, b.lo), min(a.hi, b.hi))`. Returns `None` when
/// the intersection is empty (`lower > upper`).
pub fn intersect(a: Bounds, b: Bounds) -> Option<Bounds> {
    let lower = a.0.max(b.0);
    let upper = a.1.min(b.1);
    if lower > upper {
        None
    } else {
        Some((lower, upper))
    }
}

/// `compose(a, b) = (a.lo + b.lo, a.hi + b.hi)` with saturating infinity
/// arithmetic; used when chaining two constraints along a path.
pub fn compose(a: Bounds, b: Bounds) -> Bounds {
    (add_bounds(a.0, b.0), add_bounds(a.1, b.1))
}

enum StnEvent {
    NewTimepoint,
    Bound { key: (TpId, TpId), prev: Option<Bounds> },
}

/// A Simple Temporal Network: a sparse constraint map over a set of
/// timepoints, plus an incrementally-maintained all-pairs distance closure.
///
/// The constraint map (`bounds`) is the source of truth; `dist` is a derived
/// cache kept consistent by [`Stn::add_constraint`]'s incremental relaxation
/// and rebuilt from scratch on backtracking (removals are rare enough, and
/// hard enough to undo incrementally, that a full recompute there is the
/// right trade).
pub struct Stn {
    timepoints: Vec<TpId>,
    next_tp: u32,
    bounds: HashMap<(TpId, TpId), Bounds>,
    dist: HashMap<(TpId, TpId), Bound>,
    trail: ObsTrail<StnEvent>,
}

impl Default for Stn {
    fn default() -> Self {
        Self::new()
    }
}

impl Stn {
    pub fn new() -> Self {
        Stn {
            timepoints: Vec::new(),
            next_tp: 0,
            bounds: HashMap::new(),
            dist: HashMap::new(),
            trail: ObsTrail::new(),
        }
    }

    pub fn timepoints(&self) -> &[TpId] {
        &self.timepoints
    }

    /// Inserts a new timepoint with no constraints on it. O(1).
    pub fn add_time_point(&mut self) -> TpId {
        let tp = TpId::new(self.next_tp);
        self.next_tp += 1;
        self.timepoints.push(tp);
        self.trail.push(StnEvent::NewTimepoint);
        tp
    }

    fn dist_of(&self, i: TpId, j: TpId) -> Bound {
        let default = if i == j { 0 } else { INFINITE };
        self.dist.get(&(i, j)).copied().unwrap_or(default)
    }

    fn relax_edge(&mut self, u: TpId, v: TpId, weight: Bound) {
        if weight < self.dist_of(u, v) {
            self.dist.insert((u, v), weight);
        }
        let tps = self.timepoints.clone();
        for &x in &tps {
            let d_xu = self.dist_of(x, u);
            if d_xu >= INFINITE {
                continue;
            }
            for &y in &tps {
                let d_vy = self.dist_of(v, y);
                if d_vy <= -INFINITE {
                    continue;
                }
                let via = add_bounds(add_bounds(d_xu, weight), d_vy);
                if via < self.dist_of(x, y) {
                    self.dist.insert((x, y), via);
                }
            }
        }
    }

    /// Rebuilds the distance closure from `bounds` alone. Used after a
    /// backtrack, where the incremental relaxation cannot be cheaply undone.
    fn recompute_closure(&mut self) {
        self.dist.clear();
        for (&(i, j), &(lower, upper)) in &self.bounds {
            let d_ij = self.dist.entry((i, j)).or_insert(INFINITE);
            if upper < *d_ij {
                *d_ij = upper;
            }
            let d_ji = self.dist.entry((j, i)).or_insert(INFINITE);
            if -lower < *d_ji {
                *d_ji = -lower;
            }
        }
        let tps = self.timepoints.clone();
        for &k in &tps {
            for &i in &tps {
                let d_ik = self.dist_of(i, k);
                if d_ik >= INFINITE {
                    continue;
                }
                for &j in &tps {
                    let via = add_bounds(d_ik, self.dist_of(k, j));
                    if via < self.dist_of(i, j) {
                        self.dist.insert((i, j), via);
                    }
                }
            }
        }
    }

    /// Adds (intersects in) a constraint `lower <= time(j) - time(i) <=
    /// upper`. Rejects `lower > upper` and the fixed point `lower == upper` —
    /// callers that legitimately want an equality must widen it to a
    /// micro-range themselves (the `timeline` crate's Bridge layer is the one
    /// place in this system allowed to do that).
    pub fn add_constraint(&mut self, i: TpId, j: TpId, lower: Bound, upper: Bound) -> Result<(), StnError> {
        if lower > upper {
            return Err(StnError::InvalidBounds { lower, upper });
        }
        if lower == upper {
            return Err(StnError::FixedPointConstraint { lower });
        }
        if !self.timepoints.contains(&i) {
            return Err(StnError::UnknownTimepoint(i));
        }
        if !self.timepoints.contains(&j) {
            return Err(StnError::UnknownTimepoint(j));
        }

        let key = (i, j);
        let prev = self.bounds.get(&key).copied();
        let combined = match prev {
            Some(existing) => intersect(existing, (lower, upper)).ok_or(StnError::Inconsistent { witness: i })?,
            None => (lower, upper),
        };

        self.bounds.insert(key, combined);
        self.trail.push(StnEvent::Bound { key, prev });

        self.relax_edge(i, j, combined.1);
        self.relax_edge(j, i, -combined.0);

        if let Some(witness) = self.negative_self_cycle() {
            return Err(StnError::Inconsistent { witness });
        }
        Ok(())
    }

    fn negative_self_cycle(&self) -> Option<TpId> {
        self.timepoints.iter().copied().find(|&tp| self.dist_of(tp, tp) < 0)
    }

    /// Runs (or re-checks) propagation and reports whether the network is
    /// consistent: no negative self-cycle survives closure. A self-cycle in
    /// the `(-1, 1)` micro-range used to widen equalities is not negative and
    /// is never flagged.
    pub fn is_consistent(&self) -> bool {
        self.negative_self_cycle().is_none()
    }

    /// Re-closes the network from scratch and reports consistency; use this
    /// after constructing an `Stn` from a serialized bounds map rather than
    /// through `add_constraint`.
    pub fn propagate_all(&mut self) -> bool {
        self.recompute_closure();
        self.is_consistent()
    }

    /// Extracts a feasible assignment by pinning `origin` to zero and setting
    /// `time(tp) = -d(origin, tp)` for every other timepoint. Returns `None`
    /// if the network is inconsistent.
    pub fn extract_assignment(&self, origin: TpId) -> Option<HashMap<TpId, i64>> {
        if !self.is_consistent() {
            return None;
        }
        Some(
            self.timepoints
                .iter()
                .map(|&tp| (tp, -self.dist_of(origin, tp)))
                .collect(),
        )
    }

    /// Retracts a set of timepoints and every constraint mentioning them.
    /// Rebuilds the distance closure from the surviving `bounds` entries
    /// afterward, since a cached shortest path between two surviving
    /// timepoints may have been routed through one just removed. Not
    /// trail-tracked: a backtrack to a save point taken before this call will
    /// not resurrect the removed timepoints or their constraints.
    pub fn remove_timepoints(&mut self, tps: &[TpId]) {
        self.timepoints.retain(|tp| !tps.contains(tp));
        self.bounds.retain(|&(i, j), _| !tps.contains(&i) && !tps.contains(&j));
        self.recompute_closure();
    }

    pub fn bounds(&self) -> &HashMap<(TpId, TpId), Bounds> {
        &self.bounds
    }

    pub fn bound_between(&self, i: TpId, j: TpId) -> Option<Bounds> {
        self.bounds.get(&(i, j)).copied()
    }
}

impl Backtrack for Stn {
    fn save_state(&mut self) -> DecLvl {
        self.trail.save_state()
    }

    fn num_saved(&self) -> u32 {
        self.trail.num_saved()
    }

    fn restore_last(&mut self) {
        let bounds = &mut self.bounds;
        let timepoints = &mut self.timepoints;
        self.trail.restore_last_with(|event| match event {
            StnEvent::NewTimepoint => {
                timepoints.pop();
            }
            StnEvent::Bound { key, prev } => match prev {
                Some(b) => {
                    bounds.insert(key, b);
                }
                None => {
                    bounds.remove(&key);
                }
            },
        });
        self.recompute_closure();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersect_empty_is_none() {
        assert_eq!(intersect((0, 5), (10, 20)), None);
        assert_eq!(intersect((0, 10), (5, 20)), Some((5, 10)));
    }

    #[test]
    fn compose_saturates_at_infinity() {
        let (lo, hi) = compose((-INFINITE, 5), (3, INFINITE));
        assert_eq!(lo, -INFINITE);
        assert_eq!(hi, INFINITE);
    }

    #[test]
    fn rejects_fixed_point_constraint() {
        let mut stn = Stn::new();
        let a = stn.add_time_point();
        let b = stn.add_time_point();
        assert_eq!(stn.add_constraint(a, b, 5, 5), Err(StnError::FixedPointConstraint { lower: 5 }));
    }

    #[test]
    fn micro_range_equality_does_not_trip_negative_self_cycle() {
        let mut stn = Stn::new();
        let a = stn.add_time_point();
        let b = stn.add_time_point();
        stn.add_constraint(a, b, -1, 1).unwrap();
        assert!(stn.is_consistent());
    }

    #[test]
    fn contradictory_chain_is_detected() {
        let mut stn = Stn::new();
        let a = stn.add_time_point();
        let b = stn.add_time_point();
        let c = stn.add_time_point();
        stn.add_constraint(a, b, 5, INFINITE).unwrap();
        stn.add_constraint(b, c, 5, INFINITE).unwrap();
        let err = stn.add_constraint(c, a, 5, INFINITE).unwrap_err();
        assert!(matches!(err, StnError::Inconsistent { .. }));
    }

    #[test]
    fn remove_timepoints_purges_their_constraints() {
        let mut stn = Stn::new();
        let a = stn.add_time_point();
        let b = stn.add_time_point();
        let c = stn.add_time_point();
        stn.add_constraint(a, b, 5, 10).unwrap();
        stn.add_constraint(b, c, 5, 10).unwrap();

        // before removal, a-c is transitively bounded via b.
        let before = stn.extract_assignment(a).unwrap()[&c];
        assert!(before > -INFINITE);

        stn.remove_timepoints(&[b]);

        assert_eq!(stn.timepoints(), &[a, c]);
        assert_eq!(stn.bound_between(a, b), None);
        assert_eq!(stn.bound_between(b, c), None);
        // the chain through b is gone, so a-c is unconstrained again.
        assert_eq!(stn.extract_assignment(a).unwrap()[&c], -INFINITE);
    }

    #[test]
    fn extract_assignment_pins_origin_to_zero() {
        let mut stn = Stn::new();
        let a = stn.add_time_point();
        let b = stn.add_time_point();
        stn.add_constraint(a, b, 9, 11).unwrap();
        let assignment = stn.extract_assignment(a).unwrap();
        assert_eq!(assignment[&a], 0);
        assert!(assignment[&b] >= 9 && assignment[&b] <= 11);
    }
}
