//! Key-value working storage for a uidmerge run.
//!
//! A merge store maps an identifier (`uid`) to the exact raw text of the
//! latest record seen for it. Writes overwrite; nothing is ever rejected
//! for being a duplicate.
//!
//! # Storage Backends
//!
//! All backends implement the [`MergeStore`] trait:
//!
//! - [`InMemoryMergeStore`] -- `HashMap`-based store for small datasets and tests
//! - [`DiskMergeStore`] -- append-only record log on disk with an in-memory
//!   offset index, for datasets whose record text should not stay resident
//!
//! # Design Rules
//!
//! 1. A store is owned by exactly one run and discarded when the run ends.
//! 2. `put` is last-writer-wins; `len` counts distinct identifiers.
//! 3. `scan` yields every live record exactly once, in no particular order.
//! 4. The store never interprets record text.
//! 5. All I/O errors are propagated, never silently ignored.

pub mod disk;
pub mod error;
pub mod memory;
pub mod record;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use disk::DiskMergeStore;
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryMergeStore;
pub use record::Record;
pub use traits::{MergeStore, RecordScan};
