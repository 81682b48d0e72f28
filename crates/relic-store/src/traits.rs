use relic_types::Digest;

use crate::error::StoreResult;

/// Result of checking one stored object against its digest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// Content hashes back to the digest it is stored under.
    Valid,
    /// Content is present but hashes to a different digest.
    Corrupt,
    /// No readable content exists for the digest.
    Missing,
}

/// Content-addressed object store.
///
/// All implementations must satisfy these invariants:
/// - Objects are immutable once written. Content-addressing guarantees this:
///   the same bytes always produce the same digest.
/// - `put` is idempotent: re-storing existing content is a no-op.
/// - No partial write is ever visible under a final digest-derived key.
/// - Concurrent reads are always safe (objects are immutable).
/// - All I/O errors are propagated, never silently ignored.
pub trait ObjectStore: Send + Sync {
    /// Store content and return its digest.
    ///
    /// If an object with the same digest already exists, the existing copy
    /// is kept untouched (the hash guarantee treats the content as
    /// identical) and its digest is returned.
    fn put(&self, content: &[u8]) -> StoreResult<Digest>;

    /// Read an object's content by digest.
    ///
    /// Returns `Ok(None)` if the object does not exist.
    /// Returns `Err` on I/O failure.
    fn get(&self, digest: &Digest) -> StoreResult<Option<Vec<u8>>>;

    /// Check whether an object exists in the store.
    fn exists(&self, digest: &Digest) -> StoreResult<bool>;

    /// Delete the physical object. Returns `true` if the object existed.
    ///
    /// The caller is responsible for removing associated metadata in the
    /// same logical operation.
    fn remove(&self, digest: &Digest) -> StoreResult<bool>;

    /// Re-read the object and compare its recomputed digest to `digest`.
    ///
    /// Integrity findings are data, not errors: an absent or unreadable
    /// object reports [`VerifyOutcome::Missing`], a hash mismatch reports
    /// [`VerifyOutcome::Corrupt`].
    fn verify_object(&self, digest: &Digest) -> StoreResult<VerifyOutcome>;

    /// Enumerate every digest with a physical object, in sorted order.
    ///
    /// Used for orphan detection during a full verify pass.
    fn digests(&self) -> StoreResult<Vec<Digest>>;
}
