use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::error::EstadResult;

/// String key-value storage backing the repository.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> EstadResult<Option<String>>;

    /// Inserts or replaces the value under `key`.
    fn set(&self, key: &str, value: &str) -> EstadResult<()>;

    /// All keys, sorted.
    fn list(&self) -> EstadResult<Vec<String>>;

    /// Returns whether the key existed.
    fn delete(&self, key: &str) -> EstadResult<bool>;
}

#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: RefCell<BTreeMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKvStore {
    fn get(&self, key: &str) -> EstadResult<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> EstadResult<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn list(&self) -> EstadResult<Vec<String>> {
        Ok(self.entries.borrow().keys().cloned().collect())
    }

    fn delete(&self, key: &str) -> EstadResult<bool> {
        Ok(self.entries.borrow_mut().remove(key).is_some())
    }
}
