//! Core data types shared by every component of the presence engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Signed seconds since the Unix epoch. `T_MIN`/`T_MAX` stand in for -∞/+∞.
pub type Ts = i64;

/// "Always was" — the lower sentinel used for retroactive STOPs.
pub const TS_MIN: Ts = i64::MIN;

/// "Still present" — the upper sentinel for an open interval.
pub const TS_MAX: Ts = i64::MAX;

/// Dense integer id assigned to a username in insertion order. Never reused.
pub type PersonId = u32;

/// "No such person" sentinel, returned by lookups that can miss.
pub const NOT_FOUND: PersonId = u32::MAX;

/// Maximum byte length of a username token (matches the original `it` tool).
pub const USERNAME_MAX_LEN: usize = 31;

/// A stored person-timespan tuple. Represents "personId was present from
/// tMin through tMax" under the half-open `[tMin, tMax)` convention: see
/// `OverlapQuery` / `IntervalStore::is_present_at` for the boundary rule.
///
/// Invariants upheld by `IntervalStore`:
/// - `tMin <= tMax`
/// - at most one interval per person has `tMax == TS_MAX` (the open interval)
/// - intervals of the same person never overlap (they may abut)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ti {
    pub person_id: PersonId,
    pub t_min: Ts,
    pub t_max: Ts,
}

impl Ti {
    pub fn new(person_id: PersonId, t_min: Ts, t_max: Ts) -> Self {
        debug_assert!(t_min <= t_max, "interval min must not exceed max");
        Self { person_id, t_min, t_max }
    }

    pub fn is_open(&self) -> bool {
        self.t_max == TS_MAX
    }
}

/// A query-local copy of a `Ti`, clipped to `[min, max]` by `OverlapQuery`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub person_id: PersonId,
    pub t_min: Ts,
    pub t_max: Ts,
}

/// Sweep-line event kind. `Open` must sort before `Close` at equal timestamps
/// so that a point interval (`t_min == t_max`) contributes nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventKind {
    Open,
    Close,
}

/// Sweep-line event: `(ts, kind, who)`, sorted by `(ts asc, kind asc)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ISplit {
    pub ts: Ts,
    pub kind: EventKind,
    pub person_id: PersonId,
}

/// An output range plus the exact set of persons present throughout it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub t_min: Ts,
    pub t_max: Ts,
    pub present: BTreeSet<PersonId>,
}

impl Split {
    pub fn count(&self) -> usize {
        self.present.len()
    }

    pub fn duration(&self) -> Ts {
        self.t_max - self.t_min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ti_open_detection() {
        let open = Ti::new(3, 100, TS_MAX);
        let closed = Ti::new(3, 100, 200);
        assert!(open.is_open());
        assert!(!closed.is_open());
    }

    #[test]
    fn event_kind_ordering() {
        assert!(EventKind::Open < EventKind::Close);
    }

    #[test]
    fn split_duration_and_count() {
        let mut present = BTreeSet::new();
        present.insert(1);
        present.insert(2);
        let split = Split { t_min: 100, t_max: 150, present };
        assert_eq!(split.duration(), 50);
        assert_eq!(split.count(), 2);
    }
}
