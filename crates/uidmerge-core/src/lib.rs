//! Keyed merge of two JSONL datasets.
//!
//! Records from the overlay dataset replace records from the base dataset
//! whenever their identifiers collide. The merge runs as one linear
//! pipeline:
//!
//! ```text
//! JsonlReader(A) -> MergeStore (load_base)
//! JsonlReader(B) -> MergeStore (load_overlay, contains-before-put)
//! MergeStore (scan) -> write_output
//! ```
//!
//! Any reader or store failure aborts the run before output is written.

pub mod config;
pub mod error;
pub mod merge;
pub mod reader;
pub mod run;
pub mod writer;

pub use config::{MergeConfig, StoreBackend, DEFAULT_KEY_FIELD};
pub use error::{MergeError, MergeResult};
pub use merge::{load_base, load_overlay, merge_into, MergeStats, OverlayCounts};
pub use reader::{coerce_uid, JsonlReader};
pub use run::{check, run, CheckReport, MergeReport};
pub use writer::{write_output, OutputOrder};

// Re-export store types used in this crate's public API.
pub use uidmerge_store::{DiskMergeStore, InMemoryMergeStore, MergeStore, Record};
