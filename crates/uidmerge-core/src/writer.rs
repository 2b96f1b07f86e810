use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;
use uidmerge_store::{MergeStore, Record};

use crate::error::{MergeError, MergeResult};

/// Order in which merged records are written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputOrder {
    /// Whatever order the store's scan produces.
    #[default]
    Storage,
    /// Sorted by uid (byte-wise), for reproducible output.
    SortedByKey,
}

/// Write every stored record to `path`, one line each, newline-terminated.
///
/// Lines are written into a temporary file beside `path` and moved into
/// place only once all of them are out, so a failure never leaves partial
/// output behind. Missing parent directories are created. The file gets the
/// permissions of the output it replaces, or the usual umask-derived mode
/// for a new file. Returns the number of lines written.
///
/// [`OutputOrder::SortedByKey`] goes through [`MergeStore::scan_sorted`];
/// the disk store sorts only its uid index, the memory store sorts records
/// it already holds.
pub fn write_output<S>(store: &S, path: &Path, order: OutputOrder) -> MergeResult<u64>
where
    S: MergeStore + ?Sized,
{
    let dir = output_dir(path);
    fs::create_dir_all(&dir).map_err(|e| MergeError::io(&dir, e))?;

    let mut builder = tempfile::Builder::new();
    builder.prefix(".uidmerge-").suffix(".partial");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // Same mode `File::create` asks for; the umask still applies.
        builder.permissions(fs::Permissions::from_mode(0o666));
    }
    let partial = builder
        .tempfile_in(&dir)
        .map_err(|e| MergeError::io(&dir, e))?;
    let mut out = BufWriter::new(partial);

    let records = match order {
        OutputOrder::Storage => store.scan()?,
        OutputOrder::SortedByKey => store.scan_sorted()?,
    };
    let mut written = 0u64;
    for record in records {
        write_line(&mut out, &record?, path)?;
        written += 1;
    }

    let partial = out
        .into_inner()
        .map_err(|e| MergeError::io(path, e.into_error()))?;
    if let Ok(existing) = fs::metadata(path) {
        partial
            .as_file()
            .set_permissions(existing.permissions())
            .map_err(|e| MergeError::io(path, e))?;
    }
    partial
        .persist(path)
        .map_err(|e| MergeError::io(path, e.error))?;

    debug!(path = %path.display(), lines = written, ?order, "output written");
    Ok(written)
}

fn write_line<W: Write>(out: &mut W, record: &Record, path: &Path) -> MergeResult<()> {
    out.write_all(record.line.as_bytes())
        .and_then(|()| out.write_all(b"\n"))
        .map_err(|e| MergeError::io(path, e))
}

fn output_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
