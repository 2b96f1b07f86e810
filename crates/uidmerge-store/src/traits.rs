use crate::error::{StoreError, StoreResult};
use crate::record::Record;

/// Iterator returned by [`MergeStore::scan`].
pub type RecordScan<'a> = Box<dyn Iterator<Item = StoreResult<Record>> + 'a>;

/// Identifier-keyed, last-writer-wins record table.
///
/// All implementations must satisfy these invariants:
/// - Identifiers are unique: `put` on an existing identifier replaces its
///   text rather than adding a second entry.
/// - `len()` is the number of distinct identifiers written so far.
/// - After `flush()`, `scan()` yields every live record exactly once.
///   Order is implementation-defined and callers must not rely on it.
/// - All I/O errors are propagated, never silently ignored.
pub trait MergeStore {
    /// Insert the record for `uid`, replacing any earlier text.
    fn put(&mut self, uid: &str, line: &str) -> StoreResult<()>;

    /// Check whether a record for `uid` is present.
    fn contains(&self, uid: &str) -> StoreResult<bool>;

    /// Number of distinct identifiers stored.
    fn len(&self) -> usize;

    /// Returns `true` if nothing has been stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Traverse every stored record once.
    fn scan(&self) -> StoreResult<RecordScan<'_>>;

    /// Traverse every stored record once, ordered by uid (byte-wise).
    ///
    /// Default implementation collects the whole scan and sorts it in
    /// memory. Backends that keep record text elsewhere should override it.
    fn scan_sorted(&self) -> StoreResult<RecordScan<'_>> {
        let mut records: Vec<Record> = self.scan()?.collect::<StoreResult<_>>()?;
        records.sort_unstable_by(|a, b| a.uid.cmp(&b.uid));
        Ok(Box::new(records.into_iter().map(Ok::<Record, StoreError>)))
    }

    /// Make every preceding `put` visible to `scan`.
    ///
    /// Default implementation is a no-op for backends without buffering.
    fn flush(&mut self) -> StoreResult<()> {
        Ok(())
    }

    /// Insert an owned record.
    fn put_record(&mut self, record: &Record) -> StoreResult<()> {
        self.put(&record.uid, &record.line)
    }
}
