use std::collections::HashMap;
use std::sync::RwLock;

use relic_hash::ContentHasher;
use relic_types::Digest;

use crate::error::StoreResult;
use crate::traits::{ObjectStore, VerifyOutcome};

/// In-memory, HashMap-based object store.
///
/// Intended for tests and embedding. All objects are held in memory behind
/// a `RwLock` for safe concurrent access. Content is cloned on read.
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<Digest, Vec<u8>>>,
}

impl InMemoryObjectStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Overwrite the raw content held under a digest without rehashing.
    ///
    /// Simulates out-of-band corruption so verify paths can be tested.
    pub fn clobber(&self, digest: &Digest, content: impl Into<Vec<u8>>) {
        self.objects
            .write()
            .expect("lock poisoned")
            .insert(*digest, content.into());
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn put(&self, content: &[u8]) -> StoreResult<Digest> {
        let digest = ContentHasher::FILE.hash(content);
        let mut map = self.objects.write().expect("lock poisoned");
        // Idempotent: identical content always maps to the same digest.
        map.entry(digest).or_insert_with(|| content.to_vec());
        Ok(digest)
    }

    fn get(&self, digest: &Digest) -> StoreResult<Option<Vec<u8>>> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.get(digest).cloned())
    }

    fn exists(&self, digest: &Digest) -> StoreResult<bool> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.contains_key(digest))
    }

    fn remove(&self, digest: &Digest) -> StoreResult<bool> {
        let mut map = self.objects.write().expect("lock poisoned");
        Ok(map.remove(digest).is_some())
    }

    fn verify_object(&self, digest: &Digest) -> StoreResult<VerifyOutcome> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(match map.get(digest) {
            None => VerifyOutcome::Missing,
            Some(content) if ContentHasher::FILE.verify(content, digest) => VerifyOutcome::Valid,
            Some(_) => VerifyOutcome::Corrupt,
        })
    }

    fn digests(&self) -> StoreResult<Vec<Digest>> {
        let map = self.objects.read().expect("lock poisoned");
        let mut digests: Vec<Digest> = map.keys().copied().collect();
        digests.sort();
        Ok(digests)
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryObjectStore")
            .field("object_count", &self.len())
            .finish()
    }
}
