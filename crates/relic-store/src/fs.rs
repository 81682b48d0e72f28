use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};
use walkdir::WalkDir;

use relic_hash::ContentHasher;
use relic_types::Digest;

use crate::error::{StoreError, StoreResult};
use crate::traits::{ObjectStore, VerifyOutcome};

/// On-disk object store rooted at an `objects/` directory.
///
/// Objects live at `<root>/<hex[0..2]>/<hex[2..]>`, sharded by the first
/// digest byte to keep directories small. Writes land in a temporary file
/// in the root first and are renamed into place, so a reader never sees a
/// partial object under a final digest-derived path. Two processes racing
/// to store identical content converge on the same file.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Open a store over an existing objects directory.
    ///
    /// Does not touch the filesystem; the caller validates the layout.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the objects directory (and parents) and open a store over it.
    pub fn create(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The objects directory this store is rooted at.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The path an object with this digest is (or would be) stored at.
    pub fn object_path(&self, digest: &Digest) -> PathBuf {
        let hex = digest.to_hex();
        self.root.join(&hex[..2]).join(&hex[2..])
    }

    /// Store a file's content by streaming it from disk, without holding
    /// the whole file in memory. Idempotent like [`ObjectStore::put`].
    ///
    /// The file is read twice: once to compute its digest, once to copy it
    /// into the store.
    pub fn put_path(&self, path: &Path) -> StoreResult<Digest> {
        let digest = ContentHasher::FILE.hash_reader(File::open(path)?)?;
        if self.exists(&digest)? {
            debug!(%digest, "object already present");
            return Ok(digest);
        }
        let mut source = File::open(path)?;
        self.place(&digest, |tmp| {
            io::copy(&mut source, tmp).map(|_| ())
        })?;
        Ok(digest)
    }

    /// Write an object through a temporary file and rename it into place.
    fn place(&self, digest: &Digest, fill: impl FnOnce(&mut File) -> io::Result<()>) -> StoreResult<()> {
        let target = self.object_path(digest);
        let shard = target.parent().expect("object path has a shard parent");
        fs::create_dir_all(shard)?;

        let mut tmp = NamedTempFile::new_in(&self.root)?;
        fill(tmp.as_file_mut())?;
        tmp.as_file_mut().flush()?;

        match tmp.persist(&target) {
            Ok(_) => {
                debug!(%digest, "object stored");
                Ok(())
            }
            // A concurrent writer may have renamed the identical content
            // into place first; the store state is the desired one either
            // way.
            Err(e) if target.is_file() => {
                debug!(%digest, error = %e.error, "lost placement race, object exists");
                Ok(())
            }
            Err(e) => Err(StoreError::Persist {
                digest: digest.to_hex(),
                source: e.error,
            }),
        }
    }
}

impl ObjectStore for FsObjectStore {
    fn put(&self, content: &[u8]) -> StoreResult<Digest> {
        let digest = ContentHasher::FILE.hash(content);
        if self.exists(&digest)? {
            debug!(%digest, "object already present");
            return Ok(digest);
        }
        self.place(&digest, |tmp| tmp.write_all(content))?;
        Ok(digest)
    }

    fn get(&self, digest: &Digest) -> StoreResult<Option<Vec<u8>>> {
        match fs::read(self.object_path(digest)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn exists(&self, digest: &Digest) -> StoreResult<bool> {
        Ok(self.object_path(digest).is_file())
    }

    fn remove(&self, digest: &Digest) -> StoreResult<bool> {
        match fs::remove_file(self.object_path(digest)) {
            Ok(()) => {
                debug!(%digest, "object removed");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn verify_object(&self, digest: &Digest) -> StoreResult<VerifyOutcome> {
        let content = match fs::read(self.object_path(digest)) {
            Ok(content) => content,
            // Unreadable counts the same as absent: there is no content to
            // check the digest against.
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!(%digest, error = %e, "object unreadable during verify");
                }
                return Ok(VerifyOutcome::Missing);
            }
        };
        if ContentHasher::FILE.verify(&content, digest) {
            Ok(VerifyOutcome::Valid)
        } else {
            Ok(VerifyOutcome::Corrupt)
        }
    }

    fn digests(&self) -> StoreResult<Vec<Digest>> {
        let mut found = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(2).max_depth(2) {
            let entry = entry.map_err(|e| StoreError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let shard = entry
                .path()
                .parent()
                .and_then(|p| p.file_name())
                .and_then(|n| n.to_str());
            let name = entry.file_name().to_str();
            let hex = match (shard, name) {
                (Some(shard), Some(name)) => format!("{shard}{name}"),
                _ => continue,
            };
            match Digest::from_hex(&hex) {
                Ok(digest) => found.push(digest),
                Err(_) => {
                    warn!(path = %entry.path().display(), "unrecognized file in objects directory");
                }
            }
        }
        found.sort();
        Ok(found)
    }
}

impl std::fmt::Debug for FsObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsObjectStore")
            .field("root", &self.root)
            .finish()
    }
}
