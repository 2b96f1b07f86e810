use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::record::Record;
use crate::traits::{MergeStore, RecordScan};

/// Name of the record log inside the scratch directory.
const LOG_FILE: &str = "records.log";

/// Marker identifying a directory as a merge store.
const MARKER_FILE: &str = ".uidmerge-store";

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// Borrowed view of a record for encoding; bincode lays it out exactly like
/// [`Record`], so frames decode straight back into the owned type.
#[derive(Serialize)]
struct FrameRef<'a> {
    uid: &'a str,
    line: &'a str,
}

/// Where the scratch directory lives and who removes it.
enum Scratch {
    /// Created under the system temp dir; removed when the handle drops.
    Temp(TempDir),
    /// Caller-chosen location; wiped on open and removed on drop.
    Fixed(PathBuf),
}

impl Scratch {
    fn path(&self) -> &Path {
        match self {
            Self::Temp(dir) => dir.path(),
            Self::Fixed(path) => path.as_path(),
        }
    }
}

/// Disk-spilling merge store.
///
/// Record text is appended to a log file and only the identifier index
/// (uid to frame offset) is held in memory. Overwriting a uid appends a new
/// frame and repoints the index; the superseded frame is dead space that
/// `scan` never visits.
///
/// On-disk frame format:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized Record)]
/// ```
///
/// The store is working state for a single run. Its scratch directory is
/// created empty and removed when the store is dropped. Only files the store
/// itself creates are ever deleted.
pub struct DiskMergeStore {
    scratch: Scratch,
    log_path: PathBuf,
    writer: BufWriter<File>,
    /// Current write offset in the log file.
    offset: u64,
    index: HashMap<String, u64>,
}

impl DiskMergeStore {
    /// Create a store in a fresh directory under the system temp dir.
    pub fn temporary() -> StoreResult<Self> {
        let dir = tempfile::Builder::new().prefix("uidmerge-").tempdir()?;
        Self::create(Scratch::Temp(dir))
    }

    /// Create a store in `path`.
    ///
    /// `path` may be missing, an empty directory, or a store left behind by
    /// an earlier run, whose files are cleared so the store starts empty.
    /// Anything else at `path` is refused with [`StoreError::ForeignPath`]
    /// and left untouched.
    pub fn at(path: &Path) -> StoreResult<Self> {
        match fs::symlink_metadata(path) {
            Ok(meta) if meta.is_dir() => {
                if clear_stale_store(path)? {
                    debug!(path = %path.display(), "cleared stale merge store");
                }
            }
            Ok(_) => {
                return Err(StoreError::ForeignPath {
                    path: path.to_path_buf(),
                    reason: "not a directory".into(),
                })
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => fs::create_dir_all(path)?,
            Err(e) => return Err(e.into()),
        }
        Self::create(Scratch::Fixed(path.to_path_buf()))
    }

    fn create(scratch: Scratch) -> StoreResult<Self> {
        fs::write(scratch.path().join(MARKER_FILE), b"uidmerge merge store\n")?;
        let log_path = scratch.path().join(LOG_FILE);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&log_path)?;

        debug!(path = %log_path.display(), "opened merge store log");
        Ok(Self {
            scratch,
            log_path,
            writer: BufWriter::new(file),
            offset: 0,
            index: HashMap::new(),
        })
    }

    /// Scratch directory holding the log.
    pub fn path(&self) -> &Path {
        self.scratch.path()
    }

    /// Path to the record log file.
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Bytes appended to the log so far, including superseded frames.
    pub fn log_bytes(&self) -> u64 {
        self.offset
    }
}

impl DiskMergeStore {
    /// Lazily read the frames at the given offsets, checking each frame's
    /// uid against the index entry that pointed at it.
    fn read_frames<'a, I>(&'a self, entries: I) -> StoreResult<RecordScan<'a>>
    where
        I: Iterator<Item = (&'a str, u64)> + 'a,
    {
        let file = File::open(&self.log_path)?;
        let file_len = file.metadata()?.len();
        let mut reader = BufReader::new(file);

        Ok(Box::new(entries.map(move |(uid, offset)| {
            let record = read_frame(&mut reader, offset, file_len)?;
            if record.uid != uid {
                return Err(StoreError::Corrupt {
                    offset,
                    reason: format!("frame holds uid {} but index expects {uid}", record.uid),
                });
            }
            Ok(record)
        })))
    }
}

impl MergeStore for DiskMergeStore {
    fn put(&mut self, uid: &str, line: &str) -> StoreResult<()> {
        let payload = bincode::serialize(&FrameRef { uid, line })
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let length = u32::try_from(payload.len()).map_err(|_| {
            StoreError::Serialization(format!(
                "record for uid {uid} is too large ({} bytes)",
                payload.len()
            ))
        })?;
        let crc = crc32fast::hash(&payload);

        let entry_offset = self.offset;
        self.writer.write_all(&length.to_le_bytes())?;
        self.writer.write_all(&crc.to_le_bytes())?;
        self.writer.write_all(&payload)?;
        self.offset += HEADER_SIZE as u64 + payload.len() as u64;

        match self.index.get_mut(uid) {
            Some(slot) => *slot = entry_offset,
            None => {
                self.index.insert(uid.to_owned(), entry_offset);
            }
        }
        Ok(())
    }

    fn contains(&self, uid: &str) -> StoreResult<bool> {
        Ok(self.index.contains_key(uid))
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    /// Read every live frame back from the log.
    ///
    /// Frames still sitting in the write buffer are not visible; call
    /// [`MergeStore::flush`] first.
    fn scan(&self) -> StoreResult<RecordScan<'_>> {
        self.read_frames(
            self.index
                .iter()
                .map(|(uid, &offset)| (uid.as_str(), offset)),
        )
    }

    /// Sorts the in-memory index only; record text is still read from disk
    /// one frame at a time.
    fn scan_sorted(&self) -> StoreResult<RecordScan<'_>> {
        let mut entries: Vec<(&str, u64)> = self
            .index
            .iter()
            .map(|(uid, &offset)| (uid.as_str(), offset))
            .collect();
        entries.sort_unstable_by_key(|&(uid, _)| uid);
        self.read_frames(entries.into_iter())
    }

    fn flush(&mut self) -> StoreResult<()> {
        self.writer.flush()?;
        debug!(
            offset = self.offset,
            records = self.index.len(),
            "merge store flushed"
        );
        Ok(())
    }
}

impl Drop for DiskMergeStore {
    fn drop(&mut self) {
        if let Scratch::Fixed(path) = &self.scratch {
            let removed = [LOG_FILE, MARKER_FILE]
                .iter()
                .try_for_each(|name| remove_if_present(&path.join(name)))
                .and_then(|()| fs::remove_dir(path));
            if let Err(e) = removed {
                warn!(path = %path.display(), error = %e, "failed to remove merge store");
            }
        }
    }
}

impl std::fmt::Debug for DiskMergeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskMergeStore")
            .field("path", &self.scratch.path())
            .field("record_count", &self.index.len())
            .field("log_bytes", &self.offset)
            .finish()
    }
}

/// Empty a directory holding nothing but a previous store's files.
///
/// Returns `true` if store files were removed. Fails without deleting
/// anything if the directory holds any other entry.
fn clear_stale_store(dir: &Path) -> StoreResult<bool> {
    let mut stale = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let ours = (name == LOG_FILE || name == MARKER_FILE) && entry.file_type()?.is_file();
        if !ours {
            return Err(StoreError::ForeignPath {
                path: dir.to_path_buf(),
                reason: format!("contains {}", name.to_string_lossy()),
            });
        }
        stale.push(entry.path());
    }
    for path in &stale {
        fs::remove_file(path)?;
    }
    Ok(!stale.is_empty())
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

fn read_frame<R: Read + Seek>(reader: &mut R, offset: u64, file_len: u64) -> StoreResult<Record> {
    if offset + HEADER_SIZE as u64 > file_len {
        return Err(StoreError::Corrupt {
            offset,
            reason: format!("frame header extends past end of log ({file_len} bytes)"),
        });
    }

    reader.seek(SeekFrom::Start(offset))?;
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

    if offset + HEADER_SIZE as u64 + length as u64 > file_len {
        return Err(StoreError::Corrupt {
            offset,
            reason: format!("payload length {length} extends past end of log"),
        });
    }

    let mut payload = vec![0u8; length as usize];
    reader.read_exact(&mut payload)?;

    let actual_crc = crc32fast::hash(&payload);
    if actual_crc != expected_crc {
        return Err(StoreError::Corrupt {
            offset,
            reason: format!("CRC mismatch: expected {expected_crc:#010x}, got {actual_crc:#010x}"),
        });
    }

    bincode::deserialize(&payload).map_err(|e| StoreError::Serialization(e.to_string()))
}
