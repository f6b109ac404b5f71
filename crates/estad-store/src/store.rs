use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use estad_core::{EstadError, EstadResult, KeyValueStore};

use crate::schema::init_db;

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn new(path: &Path) -> EstadResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| EstadError::Database(format!("cannot create db directory: {e}")))?;
        }
        let conn = Connection::open(path)
            .map_err(|e| EstadError::Database(format!("cannot open database: {e}")))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| EstadError::Database(e.to_string()))?;
        init_db(&conn)?;
        info!(path = %path.display(), "store opened");
        Ok(Self { conn })
    }

    pub fn in_memory() -> EstadResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| EstadError::Database(format!("cannot open in-memory db: {e}")))?;
        init_db(&conn)?;
        Ok(Self { conn })
    }
}

// ---------------------------------------------------------------------------
// KeyValueStore impl
// ---------------------------------------------------------------------------

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> EstadResult<Option<String>> {
        self.conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(|e| EstadError::Database(e.to_string()))
    }

    fn set(&self, key: &str, value: &str) -> EstadResult<()> {
        self.conn
            .execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )
            .map_err(|e| EstadError::Database(e.to_string()))?;
        Ok(())
    }

    fn list(&self) -> EstadResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM kv ORDER BY key")
            .map_err(|e| EstadError::Database(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| row.get(0))
            .map_err(|e| EstadError::Database(e.to_string()))?;

        let mut keys = Vec::new();
        for row in rows {
            keys.push(row.map_err(|e| EstadError::Database(e.to_string()))?);
        }
        Ok(keys)
    }

    fn delete(&self, key: &str) -> EstadResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])
            .map_err(|e| EstadError::Database(e.to_string()))?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use estad_core::{
        AnalysisType, Dataset, EducationLevel, Project, Repository, Value, Variable,
    };

    fn test_store() -> SqliteStore {
        SqliteStore::in_memory().unwrap()
    }

    #[test]
    fn test_set_and_get() {
        let store = test_store();
        assert!(store.get("a").unwrap().is_none());
        store.set("a", "[1,2]").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("[1,2]"));
    }

    #[test]
    fn test_set_overwrites() {
        let store = test_store();
        store.set("a", "1").unwrap();
        store.set("a", "2").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("2"));
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_list_sorted() {
        let store = test_store();
        store.set("zeta", "1").unwrap();
        store.set("alpha", "2").unwrap();
        store.set("mid", "3").unwrap();
        assert_eq!(store.list().unwrap(), ["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_delete() {
        let store = test_store();
        store.set("a", "1").unwrap();
        assert!(store.delete("a").unwrap());
        assert!(!store.delete("a").unwrap());
        assert!(store.get("a").unwrap().is_none());
    }

    #[test]
    fn test_repository_over_sqlite() {
        let repo = Repository::new(test_store());
        let project = Project::new(
            "Alturas".into(),
            EducationLevel::Secundario,
            AnalysisType::Univariado,
        );
        let id = repo.create_project(project).unwrap();
        let values = vec![Value::from(150), Value::from(162.5), Value::from(171)];
        repo.create_dataset(Dataset::new(
            id.clone(),
            vec![Variable::inferred("altura", values)],
            "manual".into(),
        ))
        .unwrap();

        let datasets = repo.list_datasets(&id).unwrap();
        assert_eq!(datasets.len(), 1);
        assert_eq!(datasets[0].variables[0].values[1], Value::Number(162.5));
    }

    #[test]
    fn test_persists_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("estad.db");

        {
            let store = SqliteStore::new(&path).unwrap();
            store.set("estadisticamente_projects", "[]").unwrap();
        }

        let reopened = SqliteStore::new(&path).unwrap();
        assert_eq!(
            reopened.get("estadisticamente_projects").unwrap().as_deref(),
            Some("[]")
        );
    }
}
