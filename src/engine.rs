//! Owns the durable backend and wires the `NameTable`/`IntervalStore` views
//! on top of it. One `Engine` is shared (read-only after construction) across
//! every connection the daemon serves.

use std::path::Path;

use redb::Database;

use crate::error::EngineError;
use crate::name_table::NameTable;
use crate::store::IntervalStore;

pub struct Engine {
    db: Database,
    names: NameTable,
    store: IntervalStore,
}

impl Engine {
    /// Open (creating if absent) the redb file at `path` and prepare the
    /// table views. `redb::Database::create` opens an existing file in place
    /// or initializes a fresh one, so no separate "does it exist" branch is
    /// needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Engine, EngineError> {
        let db = Database::create(path)?;
        Ok(Engine { db, names: NameTable::new(), store: IntervalStore::new() })
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn names(&self) -> &NameTable {
        &self.names
    }

    pub fn store(&self) -> &IntervalStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_creates_file_and_reopen_preserves_state() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("it.db");
        {
            let engine = Engine::open(&path).unwrap();
            engine.names().intern(engine.db(), "alice").unwrap();
        }
        let engine = Engine::open(&path).unwrap();
        assert_eq!(engine.names().lookup(engine.db(), "alice").unwrap(), Some(0));
    }
}
