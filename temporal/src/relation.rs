use crate::tp::{Bound, TpId, INFINITE};

/// A pair of timepoints for one interval's endpoints: `(start, end)`.
pub type TpPair = (TpId, TpId);

/// Allen's 13 interval relations, plus the extended relations this system
/// layers on top of them. Flexible/fuzzy/resource-bound/conditional relations
/// carry their own bounds rather than deriving canonical Allen bounds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Relation {
    Eq,
    Precedes,
    Follows,
    AdjF,
    AdjB,
    Within,
    Contains,
    StartAlign,
    StartExtend,
    EndAlign,
    EndExtend,
    OverlapF,
    OverlapB,
    /// Caller-supplied `(lower, upper)` bound on `(a.end, b.start)`.
    Flexible(Bound, Bound),
    /// Two intervals may not overlap; compiled the same as `Precedes` or
    /// `Follows` depending on which caller-declared direction wins, so the
    /// caller resolves the direction before calling `relation_to_constraints`
    /// — this variant exists only to round-trip through metadata uninterpreted.
    Mutex,
    /// Resource-bound relations carry an explicit `(lower, upper)` gap, same
    /// shape as `Flexible`, but are kept distinct for readability in metadata
    /// and logs.
    ResourceBound(Bound, Bound),
    /// Fuzzy relations behave like `Flexible` but the bounds represent a
    /// tolerance band rather than a hard requirement; compiled identically.
    Fuzzy(Bound, Bound),
    /// Conditional relations only apply if a guard (checked elsewhere, not by
    /// this function) holds; compiled identically to `Flexible` when asked.
    Conditional(Bound, Bound),
}

/// Compiles a [`Relation`] between two intervals into STN bound constraints.
///
/// `a` and `b` are each `(start, end)` timepoint pairs. The returned vector
/// lists `(from, to, lower, upper)` tuples meaning `time(to) - time(from) ∈
/// [lower, upper]`. This function is total: every `Relation` variant produces
/// a non-empty result, and no variant ever emits a fixed point `(n, n)` —
/// `Eq` instead emits the `(-1, 1)` micro-range pair described by the no-
/// fixed-point invariant.
pub fn relation_to_constraints(relation: Relation, a: TpPair, b: TpPair) -> Vec<(TpId, TpId, Bound, Bound)> {
    let (a_start, a_end) = a;
    let (b_start, b_end) = b;

    match relation {
        Relation::Eq => vec![
            (a_start, b_start, -1, 1),
            (a_end, b_end, -1, 1),
        ],
        Relation::Precedes => vec![(a_end, b_start, -INFINITE, -1)],
        Relation::Follows => vec![(b_end, a_start, -INFINITE, -1)],
        Relation::AdjF => vec![(a_end, b_start, 0, 0).widen_to_micro_range()],
        Relation::AdjB => vec![(b_end, a_start, 0, 0).widen_to_micro_range()],
        Relation::Within => vec![
            (a_start, b_start, -INFINITE, 0),
            (b_end, a_end, -INFINITE, 0),
        ],
        Relation::Contains => vec![
            (b_start, a_start, -INFINITE, 0),
            (a_end, b_end, -INFINITE, 0),
        ],
        Relation::StartAlign => vec![(a_start, b_start, -1, 1)],
        Relation::StartExtend => vec![(a_start, b_start, -INFINITE, 0)],
        Relation::EndAlign => vec![(a_end, b_end, -1, 1)],
        Relation::EndExtend => vec![(b_end, a_end, -INFINITE, 0)],
        Relation::OverlapF => vec![
            (a_start, b_start, -INFINITE, -1),
            (b_start, a_end, -INFINITE, -1),
            (a_end, b_end, -INFINITE, -1),
        ],
        Relation::OverlapB => vec![
            (b_start, a_start, -INFINITE, -1),
            (a_start, b_end, -INFINITE, -1),
            (b_end, a_end, -INFINITE, -1),
        ],
        Relation::Flexible(lower, upper) | Relation::Fuzzy(lower, upper) | Relation::Conditional(lower, upper) => {
            vec![(a_end, b_start, lower, upper).widen_to_micro_range()]
        }
        Relation::ResourceBound(lower, upper) => vec![(a_end, b_start, lower, upper).widen_to_micro_range()],
        Relation::Mutex => vec![(a_end, b_start, -INFINITE, -1)],
    }
}

trait WidenToMicroRange {
    fn widen_to_micro_range(self) -> (TpId, TpId, Bound, Bound);
}

impl WidenToMicroRange for (TpId, TpId, Bound, Bound) {
    fn widen_to_micro_range(self) -> (TpId, TpId, Bound, Bound) {
        let (from, to, lower, upper) = self;
        if lower == upper {
            (from, to, lower - 1, upper + 1)
        } else {
            (from, to, lower, upper)
        }
    }
}
