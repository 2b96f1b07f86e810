use std::path::Path;

use serde::Serialize;
use tracing::debug;
use uidmerge_store::{MergeStore, Record};

use crate::error::MergeResult;
use crate::reader::JsonlReader;

/// Counters from the overlay (second) load pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OverlayCounts {
    /// Records read from the overlay.
    pub records: u64,
    /// Overlay records whose uid was already stored when they arrived.
    pub same: u64,
}

impl OverlayCounts {
    /// Overlay records that introduced a uid not seen before.
    pub fn inserted(&self) -> u64 {
        self.records - self.same
    }
}

/// Statistics for a completed merge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub same_uid_count: u64,
    pub inserted_from_b: u64,
    pub merged_total_unique: u64,
    /// Records read from dataset A.
    pub base_records: u64,
    /// Records read from dataset B.
    pub overlay_records: u64,
}

/// Load every base record into `store`, overwriting on repeated uids.
///
/// Returns the number of records read. Stops at the first error.
pub fn load_base<S, I>(store: &mut S, records: I) -> MergeResult<u64>
where
    S: MergeStore + ?Sized,
    I: IntoIterator<Item = MergeResult<Record>>,
{
    let mut count = 0u64;
    for record in records {
        store.put_record(&record?)?;
        count += 1;
    }
    store.flush()?;
    debug!(records = count, unique = store.len(), "base load complete");
    Ok(count)
}

/// Load overlay records into `store`, counting uids that were already
/// present.
///
/// The presence check runs before each record's own `put`, so a uid
/// repeated within the overlay counts as existing from its second
/// occurrence on. Later occurrences always win.
pub fn load_overlay<S, I>(store: &mut S, records: I) -> MergeResult<OverlayCounts>
where
    S: MergeStore + ?Sized,
    I: IntoIterator<Item = MergeResult<Record>>,
{
    let mut counts = OverlayCounts::default();
    for record in records {
        let record = record?;
        if store.contains(&record.uid)? {
            counts.same += 1;
        }
        store.put_record(&record)?;
        counts.records += 1;
    }
    store.flush()?;
    debug!(
        records = counts.records,
        same = counts.same,
        unique = store.len(),
        "overlay load complete"
    );
    Ok(counts)
}

/// Merge JSONL dataset `b` over dataset `a` into `store`.
///
/// `store` should be empty; whatever it already holds takes part in the
/// merge as if it had come from `a`.
pub fn merge_into<S>(store: &mut S, a: &Path, b: &Path, key_field: &str) -> MergeResult<MergeStats>
where
    S: MergeStore + ?Sized,
{
    let base_records = load_base(store, JsonlReader::open(a, key_field)?)?;
    let overlay = load_overlay(store, JsonlReader::open(b, key_field)?)?;

    Ok(MergeStats {
        same_uid_count: overlay.same,
        inserted_from_b: overlay.inserted(),
        merged_total_unique: store.len() as u64,
        base_records,
        overlay_records: overlay.records,
    })
}
