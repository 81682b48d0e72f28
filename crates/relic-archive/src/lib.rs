//! Store manager for the relic artifact archive.
//!
//! Orchestrates the content hasher, the object store, and the metadata
//! index into the public archive operations: create, open, add, query,
//! print, remove, and verify. Mutations commit both physical stores
//! together: the object write is idempotent and digest-keyed, the index
//! mutation is transactional, so the only residual inconsistency window is
//! "object written, index transaction not committed" — which `verify`
//! surfaces as an orphan.
//!
//! # Key Types
//!
//! - [`Archive`] — the open store handle
//! - [`VerifyReport`] — findings of a full integrity pass
//! - [`ArchiveError`] / [`ArchiveResult`] — error surface

pub mod archive;
pub mod error;
pub mod query;
pub mod verify;

pub use archive::{Archive, DATABASE_FILE, OBJECTS_DIR};
pub use error::{ArchiveError, ArchiveResult};
pub use query::{parse_conditions, parse_metadata};
pub use verify::VerifyReport;

// Re-export value types so callers need only this crate.
pub use relic_types::{Condition, Digest, Metadata};
