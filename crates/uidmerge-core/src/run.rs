use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};
use uidmerge_store::{DiskMergeStore, InMemoryMergeStore, MergeStore};

use crate::config::{MergeConfig, StoreBackend};
use crate::error::{MergeError, MergeResult};
use crate::merge::merge_into;
use crate::reader::JsonlReader;
use crate::writer::write_output;

/// Result of a merge run, as reported to the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// Dataset B records whose uid was already present when processed.
    pub same_uid_count: u64,
    /// Dataset B records that introduced a new uid.
    pub inserted_from_b: u64,
    /// Distinct uids in the merged output.
    pub merged_total_unique: u64,
    /// Where the merged output was written.
    pub output: PathBuf,
}

/// Result of validating a single dataset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub records: u64,
    pub distinct_uids: u64,
}

/// Merge dataset `b` over dataset `a` and write the result to `output`.
///
/// A fresh store is opened for the run and destroyed before returning,
/// whether the run succeeds or not. Output is only written after both
/// datasets have loaded cleanly. A fixed store location may not contain
/// the output or either input.
pub fn run(config: &MergeConfig, a: &Path, b: &Path, output: &Path) -> MergeResult<MergeReport> {
    if let StoreBackend::Disk { path: Some(store_path) } = &config.backend {
        check_store_location(store_path, a, b, output)?;
    }
    let mut store = open_store(&config.backend)?;
    let stats = merge_into(&mut *store, a, b, &config.key_field)?;
    let written = write_output(&*store, output, config.order)?;
    drop(store);

    debug_assert_eq!(written, stats.merged_total_unique);
    info!(
        same_uid_count = stats.same_uid_count,
        inserted_from_b = stats.inserted_from_b,
        merged_total_unique = stats.merged_total_unique,
        output = %output.display(),
        "merge complete"
    );

    Ok(MergeReport {
        same_uid_count: stats.same_uid_count,
        inserted_from_b: stats.inserted_from_b,
        merged_total_unique: stats.merged_total_unique,
        output: output.to_path_buf(),
    })
}

/// Read one dataset through the line reader without merging it.
pub fn check(path: &Path, key_field: &str) -> MergeResult<CheckReport> {
    let mut uids = HashSet::new();
    let mut records = 0u64;
    for record in JsonlReader::open(path, key_field)? {
        uids.insert(record?.uid);
        records += 1;
    }
    Ok(CheckReport {
        records,
        distinct_uids: uids.len() as u64,
    })
}

/// Reject a store location that is, or lies above, any file the run reads
/// or writes.
fn check_store_location(store_path: &Path, a: &Path, b: &Path, output: &Path) -> MergeResult<()> {
    let store = resolve(store_path)?;
    for (role, path) in [("output", output), ("input", a), ("input", b)] {
        let resolved = resolve(path)?;
        if resolved.starts_with(&store) {
            return Err(MergeError::Config(format!(
                "store path {} contains {role} {}",
                store_path.display(),
                path.display()
            )));
        }
    }
    Ok(())
}

/// Absolute form of `path`, with symlinks resolved for whatever part of it
/// already exists.
fn resolve(path: &Path) -> MergeResult<PathBuf> {
    let absolute = std::path::absolute(path).map_err(|e| MergeError::io(path, e))?;
    if let Ok(canonical) = absolute.canonicalize() {
        return Ok(canonical);
    }
    match (absolute.parent(), absolute.file_name()) {
        (Some(parent), Some(name)) => Ok(resolve(parent)?.join(name)),
        _ => Ok(absolute),
    }
}

fn open_store(backend: &StoreBackend) -> MergeResult<Box<dyn MergeStore>> {
    let store: Box<dyn MergeStore> = match backend {
        StoreBackend::Memory => Box::new(InMemoryMergeStore::new()),
        StoreBackend::Disk { path: None } => Box::new(DiskMergeStore::temporary()?),
        StoreBackend::Disk { path: Some(path) } => Box::new(DiskMergeStore::at(path)?),
    };
    debug!(?backend, "merge store opened");
    Ok(store)
}
