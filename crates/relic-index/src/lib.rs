//! Transactional metadata index for the relic artifact archive.
//!
//! Maps a content digest to an unordered set of (key, value) string pairs
//! and answers conjunctive key=value queries over them. Backed by a single
//! SQLite file (`database` under the store root), so index mutations are
//! transactional and serialized across cooperating processes by SQLite's
//! own locking.
//!
//! # Key Types
//!
//! - [`MetadataIndex`] — the open index handle
//! - [`IndexError`] / [`IndexResult`] — error surface

pub mod error;
pub mod index;

pub use error::{IndexError, IndexResult};
pub use index::MetadataIndex;
