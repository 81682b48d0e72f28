use std::io::{self, Read};

use sha1::{Digest as _, Sha1};

use relic_types::Digest;

/// Read buffer size for streaming hashes.
const CHUNK_SIZE: usize = 8192;

/// Domain-separated SHA-1 content hasher.
///
/// Each hasher carries a domain tag (e.g. `"file"`) that is fed to the hash
/// before the content, followed by a newline. Two objects with identical
/// bytes but different domains produce different digests.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for file content objects.
    pub const FILE: Self = Self { domain: "file" };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> Digest {
        let mut hasher = self.start();
        hasher.update(data);
        Digest::from_hash(hasher.finalize().into())
    }

    /// Hash a reader in fixed-size chunks, without buffering the whole
    /// content in memory.
    pub fn hash_reader<R: Read>(&self, mut reader: R) -> io::Result<Digest> {
        let mut hasher = self.start();
        let mut buf = [0u8; CHUNK_SIZE];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(Digest::from_hash(hasher.finalize().into()))
    }

    /// Verify that data produces the expected digest.
    pub fn verify(&self, data: &[u8], expected: &Digest) -> bool {
        self.hash(data) == *expected
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }

    fn start(&self) -> Sha1 {
        let mut hasher = Sha1::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b"\n");
        hasher
    }
}
