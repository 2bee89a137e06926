//! Post-process a split sequence so the union of its ranges equals
//! `[min, max]`, re-running OverlapQuery+SplitEngine on any uncovered gaps
//! (§4.6). With a single IntervalStore playing both "primary" and
//! "background" roles, gap-filling simply re-queries the same store.

use std::collections::BTreeSet;

use crate::error::EngineError;
use crate::model::{Split, Ts};
use crate::split_engine::splits_from_matches;
use crate::store::IntervalStore;
use redb::Database;

fn splits_over(store: &IntervalStore, db: &Database, min: Ts, max: Ts) -> Result<Vec<Split>, EngineError> {
    let matches = store.overlap(db, min, max)?;
    Ok(splits_from_matches(&matches))
}

/// Re-query `[a, b)` and pad whatever comes back so it covers `[a, b)`
/// contiguously: any leading, interior, or trailing sub-range the store has
/// no coverage for becomes an explicit empty-present `Split`, rather than
/// being silently dropped. Required so every gap `gap_fill` splices in
/// still satisfies I3 on its own.
fn fill_range(store: &IntervalStore, db: &Database, a: Ts, b: Ts) -> Result<Vec<Split>, EngineError> {
    let found = splits_over(store, db, a, b)?;
    let mut out = Vec::with_capacity(found.len() + 1);
    let mut cursor = a;
    for split in found {
        if split.t_min > cursor {
            out.push(Split { t_min: cursor, t_max: split.t_min, present: BTreeSet::new() });
        }
        cursor = split.t_max;
        out.push(split);
    }
    if cursor < b {
        out.push(Split { t_min: cursor, t_max: b, present: BTreeSet::new() });
    }
    Ok(out)
}

/// Fill `splits` (already clipped to `[min, max]`) so its ranges cover the
/// whole of `[min, max]` contiguously. Adjacent splits are never merged,
/// even when both end up empty. Matches the original `splits_fill`: each
/// originally-empty split is replaced by a single re-query pass — the
/// replacement splits are not themselves re-checked for emptiness, only
/// padded so the replacement itself covers the gap it stands in for.
pub fn gap_fill(
    store: &IntervalStore,
    db: &Database,
    splits: Vec<Split>,
    min: Ts,
    max: Ts,
) -> Result<Vec<Split>, EngineError> {
    if splits.is_empty() {
        return splits_over(store, db, min, max);
    }

    let mut out = Vec::with_capacity(splits.len());

    let first_min = splits[0].t_min;
    if first_min > min {
        out.extend(fill_range(store, db, min, first_min)?);
    }

    for split in splits {
        if split.present.is_empty() {
            out.extend(fill_range(store, db, split.t_min, split.t_max)?);
        } else {
            out.push(split);
        }
    }

    let last_max = out.last().map(|s| s.t_max).unwrap_or(min);
    if max > last_max {
        out.extend(fill_range(store, db, last_max, max)?);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_db() -> (tempfile::TempDir, Database) {
        let dir = tempdir().unwrap();
        let db = Database::create(dir.path().join("it.db")).unwrap();
        (dir, db)
    }

    #[test]
    fn empty_primary_fills_whole_range_from_store() {
        let (_dir, db) = open_db();
        let store = IntervalStore::new();
        store.insert(&db, 1, 100, 200).unwrap();
        let filled = gap_fill(&store, &db, Vec::new(), 0, 300).unwrap();
        assert_eq!(filled.len(), 1);
        assert_eq!(filled[0].t_min, 100);
        assert_eq!(filled[0].t_max, 200);
    }

    #[test]
    fn b2_empty_primary_and_empty_store_passes_through_unchanged() {
        let (_dir, db) = open_db();
        let store = IntervalStore::new();
        let filled = gap_fill(&store, &db, Vec::new(), 0, 10).unwrap();
        assert!(filled.is_empty());
    }

    #[test]
    fn scenario_5_gap_fill_leaves_trailing_empty_split() {
        // alice present [0,100), nothing afterwards up to 200.
        let (_dir, db) = open_db();
        let store = IntervalStore::new();
        store.insert(&db, 1, 0, 100).unwrap();
        let matches = store.overlap(&db, 0, 200).unwrap();
        let primary = splits_from_matches(&matches);
        let filled = gap_fill(&store, &db, primary, 0, 200).unwrap();

        assert_eq!(filled.len(), 2);
        assert_eq!(filled[0].t_min, 0);
        assert_eq!(filled[0].t_max, 100);
        assert!(!filled[0].present.is_empty());
        assert_eq!(filled[1].t_min, 100);
        assert_eq!(filled[1].t_max, 200);
        assert!(filled[1].present.is_empty());
    }

    #[test]
    fn fills_leading_gap_before_first_split() {
        let (_dir, db) = open_db();
        let store = IntervalStore::new();
        store.insert(&db, 1, 50, 100).unwrap();
        store.insert(&db, 2, 10, 20).unwrap();
        let matches = store.overlap(&db, 0, 100).unwrap();
        let primary = splits_from_matches(&matches);
        let filled = gap_fill(&store, &db, primary, 0, 100).unwrap();

        assert_eq!(filled.first().unwrap().t_min, 0);
        assert_eq!(filled.last().unwrap().t_max, 100);
        for w in filled.windows(2) {
            assert_eq!(w[0].t_max, w[1].t_min);
        }
    }

    #[test]
    fn fills_trailing_gap_after_last_split() {
        let (_dir, db) = open_db();
        let store = IntervalStore::new();
        store.insert(&db, 1, 0, 50).unwrap();
        let matches = store.overlap(&db, 0, 50).unwrap();
        let primary = splits_from_matches(&matches);
        let filled = gap_fill(&store, &db, primary, 0, 100).unwrap();

        assert_eq!(filled.last().unwrap().t_max, 100);
    }
}
