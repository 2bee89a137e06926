//! Persistent multimap of `(personId, tMin, tMax)` tuples with two secondary
//! orderings, backed by `redb`: a primary table keyed by an auto-increment
//! row id, plus two `MultimapTable`s that play the role of the original's
//! BTREE-with-duplicates secondary indexes (`max`, `id`).
//!
//! `redb`'s multimap values for a given key come back ordered by the value
//! type's own ordering; since row ids are assigned in strictly increasing
//! insertion order, iterating a person's duplicates by row id reproduces the
//! original's insertion-ordered duplicate walk without needing a custom
//! comparator on top of `redb`'s already order-preserving integer encoding.

use redb::{Database, MultimapTableDefinition, ReadableMultimapTable, ReadableTable, TableDefinition};

use crate::error::EngineError;
use crate::model::{Match, PersonId, Ti, Ts, TS_MAX};

const TI_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("ti");
const MAX_INDEX: MultimapTableDefinition<i64, u64> = MultimapTableDefinition::new("max");
const ID_INDEX: MultimapTableDefinition<u32, u64> = MultimapTableDefinition::new("id");
const META_TABLE: TableDefinition<&str, u64> = TableDefinition::new("meta");

const NEXT_TI_ID_KEY: &str = "next_ti_id";

pub struct IntervalStore;

impl IntervalStore {
    pub fn new() -> Self {
        Self
    }

    fn next_ti_id(meta: &mut redb::Table<&str, u64>) -> Result<u64, EngineError> {
        let current = meta.get(NEXT_TI_ID_KEY)?.map(|v| v.value()).unwrap_or(0);
        meta.insert(NEXT_TI_ID_KEY, current + 1)?;
        Ok(current)
    }

    /// `insert(personId, tMin, tMax)` — add a new TI across all three views.
    pub fn insert(&self, db: &Database, person_id: PersonId, t_min: Ts, t_max: Ts) -> Result<(), EngineError> {
        let ti = Ti::new(person_id, t_min, t_max);
        let encoded = bincode::serialize(&ti).map_err(|e| EngineError::Store(e.to_string()))?;

        let txn = db.begin_write()?;
        {
            let mut meta = txn.open_table(META_TABLE)?;
            let ti_id = Self::next_ti_id(&mut meta)?;
            let mut ti_table = txn.open_table(TI_TABLE)?;
            let mut max_index = txn.open_multimap_table(MAX_INDEX)?;
            let mut id_index = txn.open_multimap_table(ID_INDEX)?;
            ti_table.insert(ti_id, encoded.as_slice())?;
            max_index.insert(t_max, ti_id)?;
            id_index.insert(person_id, ti_id)?;
        }
        txn.commit()?;
        Ok(())
    }

    /// `findLastOpen(personId) -> Ti` — walk the by-person view and return
    /// the unique TI with `tMax = TS_MAX`. Aborts (invariant violation) if
    /// the caller is misusing the API and no open interval exists.
    pub fn find_last_open(&self, db: &Database, person_id: PersonId) -> Result<(u64, Ti), EngineError> {
        let txn = db.begin_read()?;
        let ti_table = txn.open_table(TI_TABLE)?;
        let id_index = txn.open_multimap_table(ID_INDEX)?;

        for ti_id in id_index.get(person_id)? {
            let ti_id = ti_id?.value();
            let raw = ti_table
                .get(ti_id)?
                .ok_or(EngineError::InvariantViolation("dangling row id in by-person index"))?;
            let ti: Ti = bincode::deserialize(raw.value()).map_err(|e| EngineError::Store(e.to_string()))?;
            if ti.is_open() {
                return Ok((ti_id, ti));
            }
        }
        Err(EngineError::InvariantViolation("find_last_open: no open interval for person"))
    }

    /// `closeLastOpen(personId, tEnd)`: delete the open TI, insert the closed
    /// replacement — in one transaction.
    pub fn close_last_open(&self, db: &Database, person_id: PersonId, t_end: Ts) -> Result<(), EngineError> {
        let (ti_id, ti) = self.find_last_open(db, person_id)?;
        let new_ti = Ti::new(person_id, ti.t_min, t_end);
        let encoded = bincode::serialize(&new_ti).map_err(|e| EngineError::Store(e.to_string()))?;

        let txn = db.begin_write()?;
        {
            let mut meta = txn.open_table(META_TABLE)?;
            let new_ti_id = Self::next_ti_id(&mut meta)?;
            let mut ti_table = txn.open_table(TI_TABLE)?;
            let mut max_index = txn.open_multimap_table(MAX_INDEX)?;
            let mut id_index = txn.open_multimap_table(ID_INDEX)?;

            ti_table.remove(ti_id)?;
            max_index.remove(TS_MAX, ti_id)?;
            id_index.remove(person_id, ti_id)?;

            ti_table.insert(new_ti_id, encoded.as_slice())?;
            max_index.insert(t_end, new_ti_id)?;
            id_index.insert(person_id, new_ti_id)?;
        }
        txn.commit()?;
        Ok(())
    }

    /// `overlap(min, max) -> list<Match>`. Positions a cursor on the by-max
    /// view at the lowest key >= `min` and walks forward. A TI matches iff
    /// `tMax > min && tMin <= max` (see DESIGN.md for the half-open boundary
    /// decision), then is clipped to `[min, max]`.
    pub fn overlap(&self, db: &Database, min: Ts, max: Ts) -> Result<Vec<Match>, EngineError> {
        let txn = db.begin_read()?;
        let ti_table = txn.open_table(TI_TABLE)?;
        let max_index = txn.open_multimap_table(MAX_INDEX)?;

        let mut matches = Vec::new();
        for entry in max_index.range(min..)? {
            let (_key, ti_ids) = entry?;
            for ti_id in ti_ids {
                let ti_id = ti_id?.value();
                let raw = ti_table
                    .get(ti_id)?
                    .ok_or(EngineError::InvariantViolation("dangling row id in by-max index"))?;
                let ti: Ti = bincode::deserialize(raw.value()).map_err(|e| EngineError::Store(e.to_string()))?;
                if ti.t_max > min && ti.t_min <= max {
                    matches.push(Match {
                        person_id: ti.person_id,
                        t_min: ti.t_min.max(min),
                        t_max: ti.t_max.min(max),
                    });
                }
            }
        }
        Ok(matches)
    }

    /// `isPresentAt(personId, t)`: scan by-max from the lowest `tMax >= t`;
    /// true iff some TI for `personId` satisfies `tMin <= t < tMax`.
    pub fn is_present_at(&self, db: &Database, person_id: PersonId, t: Ts) -> Result<bool, EngineError> {
        let txn = db.begin_read()?;
        let ti_table = txn.open_table(TI_TABLE)?;
        let max_index = txn.open_multimap_table(MAX_INDEX)?;

        for entry in max_index.range(t..)? {
            let (_key, ti_ids) = entry?;
            for ti_id in ti_ids {
                let ti_id = ti_id?.value();
                let raw = ti_table
                    .get(ti_id)?
                    .ok_or(EngineError::InvariantViolation("dangling row id in by-max index"))?;
                let ti: Ti = bincode::deserialize(raw.value()).map_err(|e| EngineError::Store(e.to_string()))?;
                if ti.person_id == person_id && ti.t_max > t && ti.t_min <= t {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}

impl Default for IntervalStore {
    fn default() -> Self {
        Self::new()
    }
}
