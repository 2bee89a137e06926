//! Bidirectional username <-> PersonId mapping, backed by two redb tables
//! (`g`: username -> id, `ig`: id -> username) plus a persisted id counter.
//!
//! `ig` is a genuine secondary table here rather than redb's associated-table
//! machinery: redb has no secondary-index callback API like the original's
//! `DB->associate`, so both tables are written together inside one
//! transaction, which gives us the same atomicity the original got from its
//! KV environment's page latches.

use dashmap::DashMap;
use redb::{Database, ReadableTable, TableDefinition};

use crate::error::EngineError;
use crate::model::{PersonId, NOT_FOUND};

pub(crate) const G_TABLE: TableDefinition<&str, u32> = TableDefinition::new("g");
pub(crate) const IG_TABLE: TableDefinition<u32, &str> = TableDefinition::new("ig");
pub(crate) const META_TABLE: TableDefinition<&str, u64> = TableDefinition::new("meta");

const NEXT_PERSON_ID_KEY: &str = "next_person_id";

/// Bidirectional username <-> id store with an in-memory read-through cache
/// for the hot `intern`/`lookup` path (usernames repeat heavily in ingest
/// streams).
pub struct NameTable {
    cache: DashMap<String, PersonId>,
}

impl NameTable {
    pub fn new() -> Self {
        Self { cache: DashMap::new() }
    }

    fn next_person_id(&self, db: &Database) -> Result<PersonId, EngineError> {
        let txn = db.begin_write()?;
        let id = {
            let mut meta = txn.open_table(META_TABLE)?;
            let current = meta.get(NEXT_PERSON_ID_KEY)?.map(|v| v.value()).unwrap_or(0);
            meta.insert(NEXT_PERSON_ID_KEY, current + 1)?;
            current as PersonId
        };
        txn.commit()?;
        Ok(id)
    }

    /// `intern(name) -> id`: inserts if absent, returns the existing or new id.
    pub fn intern(&self, db: &Database, name: &str) -> Result<PersonId, EngineError> {
        if let Some(id) = self.cache.get(name) {
            return Ok(*id);
        }
        if let Some(id) = self.lookup(db, name)? {
            self.cache.insert(name.to_string(), id);
            return Ok(id);
        }

        let id = self.next_person_id(db)?;
        let txn = db.begin_write()?;
        {
            let mut g = txn.open_table(G_TABLE)?;
            let mut ig = txn.open_table(IG_TABLE)?;
            g.insert(name, id)?;
            ig.insert(id, name)?;
        }
        txn.commit()?;
        self.cache.insert(name.to_string(), id);
        Ok(id)
    }

    /// `lookup(name) -> Some(id) | None` ("NOT_FOUND" at the API boundary).
    pub fn lookup(&self, db: &Database, name: &str) -> Result<Option<PersonId>, EngineError> {
        if let Some(id) = self.cache.get(name) {
            return Ok(Some(*id));
        }
        let txn = db.begin_read()?;
        let g = txn.open_table(G_TABLE)?;
        Ok(g.get(name)?.map(|v| v.value()))
    }

    /// Convenience wrapper returning the `NOT_FOUND` sentinel, matching the
    /// original `g_find` contract directly.
    pub fn lookup_or_not_found(&self, db: &Database, name: &str) -> Result<PersonId, EngineError> {
        Ok(self.lookup(db, name)?.unwrap_or(NOT_FOUND))
    }

    /// `nameOf(id) -> name`.
    pub fn name_of(&self, db: &Database, id: PersonId) -> Result<Option<String>, EngineError> {
        let txn = db.begin_read()?;
        let ig = txn.open_table(IG_TABLE)?;
        Ok(ig.get(id)?.map(|v| v.value().to_string()))
    }
}

impl Default for NameTable {
    fn default() -> Self {
        Self::new()
    }
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
    fn intern_assigns_dense_increasing_ids() {
        let (_dir, db) = open_db();
        let table = NameTable::new();
        let alice = table.intern(&db, "alice").unwrap();
        let bob = table.intern(&db, "bob").unwrap();
        assert_eq!(alice, 0);
        assert_eq!(bob, 1);
    }

    #[test]
    fn intern_is_idempotent_on_exact_bytes() {
        let (_dir, db) = open_db();
        let table = NameTable::new();
        let a1 = table.intern(&db, "alice").unwrap();
        let a2 = table.intern(&db, "alice").unwrap();
        assert_eq!(a1, a2);
    }

    #[test]
    fn lookup_missing_is_none() {
        let (_dir, db) = open_db();
        let table = NameTable::new();
        assert_eq!(table.lookup(&db, "ghost").unwrap(), None);
        assert_eq!(table.lookup_or_not_found(&db, "ghost").unwrap(), NOT_FOUND);
    }

    #[test]
    fn name_of_round_trips() {
        let (_dir, db) = open_db();
        let table = NameTable::new();
        let id = table.intern(&db, "carol").unwrap();
        assert_eq!(table.name_of(&db, id).unwrap().as_deref(), Some("carol"));
    }

    #[test]
    fn survives_cache_miss_after_restart() {
        let (_dir, db) = open_db();
        {
            let table = NameTable::new();
            table.intern(&db, "dave").unwrap();
        }
        // Fresh NameTable = empty cache, forcing a KV read.
        let table2 = NameTable::new();
        assert_eq!(table2.lookup(&db, "dave").unwrap(), Some(0));
    }
}
