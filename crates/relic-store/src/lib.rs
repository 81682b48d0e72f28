//! Deduplicated, content-addressed object storage for the relic archive.
//!
//! Objects are raw file bytes keyed by the digest of their content. The
//! store guarantees at most one physical copy per distinct content.
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`FsObjectStore`] — on-disk store under an `objects/` root, sharded by
//!   digest prefix, with atomic rename-into-place writes
//! - [`InMemoryObjectStore`] — `HashMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written (content-addressing guarantees this).
//! 2. Writes go to a temporary location first; no partial write is ever
//!    visible under a final digest-derived path.
//! 3. Concurrent reads are always safe (objects are immutable).
//! 4. Two writers racing on identical content converge on the same outcome.
//! 5. The store never interprets object contents.
//! 6. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod fs;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs::FsObjectStore;
pub use memory::InMemoryObjectStore;
pub use traits::{ObjectStore, VerifyOutcome};
