use std::collections::HashMap;

use crate::error::StoreResult;
use crate::record::Record;
use crate::traits::{MergeStore, RecordScan};

/// In-memory, HashMap-based merge store.
///
/// Intended for small datasets and tests. Every record's text stays
/// resident for the lifetime of the store.
pub struct InMemoryMergeStore {
    records: HashMap<String, String>,
}

impl InMemoryMergeStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
        }
    }

    /// Look up the current text for `uid`.
    pub fn get(&self, uid: &str) -> Option<&str> {
        self.records.get(uid).map(String::as_str)
    }
}

impl Default for InMemoryMergeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MergeStore for InMemoryMergeStore {
    fn put(&mut self, uid: &str, line: &str) -> StoreResult<()> {
        match self.records.get_mut(uid) {
            Some(existing) => {
                existing.clear();
                existing.push_str(line);
            }
            None => {
                self.records.insert(uid.to_owned(), line.to_owned());
            }
        }
        Ok(())
    }

    fn contains(&self, uid: &str) -> StoreResult<bool> {
        Ok(self.records.contains_key(uid))
    }

    fn len(&self) -> usize {
        self.records.len()
    }

    fn scan(&self) -> StoreResult<RecordScan<'_>> {
        Ok(Box::new(
            self.records
                .iter()
                .map(|(uid, line)| -> StoreResult<Record> {
                    Ok(Record::new(uid.clone(), line.clone()))
                }),
        ))
    }
}

impl std::fmt::Debug for InMemoryMergeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryMergeStore")
            .field("record_count", &self.len())
            .finish()
    }
}
