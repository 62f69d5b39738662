//! Signature storage.
//!
//! [`SignatureStore`] is the seam between the HTTP service and persistence.
//! Two implementations ship with the crate:
//!
//! - [`MemoryStore`]: process-local, used by tests and `--memory` serving
//! - [`JournalStore`]: durable append-only journal on disk
//!
//! Every operation is atomic on its own; there are no multi-record
//! transactions. `list` always returns records in insertion order.

pub mod journal;

pub use journal::{JournalOptions, JournalStore};

use crate::record::{IdGenerator, RecordId, SignatureRecord};
use crate::{Error, Result};
use std::sync::Mutex;

/// Durable mapping from id to [`SignatureRecord`].
pub trait SignatureStore: Send + Sync {
    /// Assign a fresh id, persist `{id, name, signature}` and return it.
    fn insert(&self, name: &str, signature: &str) -> Result<SignatureRecord>;

    /// All records in insertion order.
    fn list(&self) -> Result<Vec<SignatureRecord>>;

    /// Remove and return the record with `id`, or `Ok(None)` if absent.
    fn delete_by_id(&self, id: &RecordId) -> Result<Option<SignatureRecord>>;

    /// Flush and release the store. Later calls fail with
    /// [`Error::StoreUnavailable`].
    fn close(&self) -> Result<()>;
}

impl<S: SignatureStore + ?Sized> SignatureStore for std::sync::Arc<S> {
    fn insert(&self, name: &str, signature: &str) -> Result<SignatureRecord> {
        (**self).insert(name, signature)
    }

    fn list(&self) -> Result<Vec<SignatureRecord>> {
        (**self).list()
    }

    fn delete_by_id(&self, id: &RecordId) -> Result<Option<SignatureRecord>> {
        (**self).delete_by_id(id)
    }

    fn close(&self) -> Result<()> {
        (**self).close()
    }
}

struct MemoryState {
    records: Vec<SignatureRecord>,
    closed: bool,
}

/// In-memory store. Not durable.
pub struct MemoryStore {
    ids: IdGenerator,
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            ids: IdGenerator::new(),
            state: Mutex::new(MemoryState {
                records: Vec::new(),
                closed: false,
            }),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn ensure_open(closed: bool) -> Result<()> {
    if closed {
        return Err(Error::StoreUnavailable("store is closed".into()));
    }
    Ok(())
}

impl SignatureStore for MemoryStore {
    fn insert(&self, name: &str, signature: &str) -> Result<SignatureRecord> {
        let mut state = self.state.lock()?;
        ensure_open(state.closed)?;
        let record = SignatureRecord {
            id: self.ids.next_id(),
            name: name.to_string(),
            signature: signature.to_string(),
        };
        state.records.push(record.clone());
        Ok(record)
    }

    fn list(&self) -> Result<Vec<SignatureRecord>> {
        let state = self.state.lock()?;
        ensure_open(state.closed)?;
        Ok(state.records.clone())
    }

    fn delete_by_id(&self, id: &RecordId) -> Result<Option<SignatureRecord>> {
        let mut state = self.state.lock()?;
        ensure_open(state.closed)?;
        let idx = state.records.iter().position(|r| &r.id == id);
        Ok(idx.map(|idx| state.records.remove(idx)))
    }

    fn close(&self) -> Result<()> {
        self.state.lock()?.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_list_preserves_order() {
        let store = MemoryStore::new();
        for name in ["X", "Y", "Z"] {
            store.insert(name, "data:image/png;base64,AA").unwrap();
        }
        let names: Vec<_> = store.list().unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["X", "Y", "Z"]);
    }

    #[test]
    fn delete_returns_record_once() {
        let store = MemoryStore::new();
        let a = store.insert("A", "sig-a").unwrap();
        let b = store.insert("B", "sig-b").unwrap();

        assert_eq!(store.delete_by_id(&a.id).unwrap(), Some(a.clone()));
        assert_eq!(store.list().unwrap(), vec![b]);
        assert_eq!(store.delete_by_id(&a.id).unwrap(), None);
    }

    #[test]
    fn empty_strings_are_accepted() {
        let store = MemoryStore::new();
        let rec = store.insert("", "").unwrap();
        assert_eq!(rec.name, "");
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn closed_store_is_unavailable() {
        let store = MemoryStore::new();
        store.close().unwrap();
        assert!(matches!(store.list(), Err(Error::StoreUnavailable(_))));
        assert!(matches!(
            store.insert("A", "s"),
            Err(Error::StoreUnavailable(_))
        ));
    }
}
