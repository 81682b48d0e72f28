use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use relic_index::{IndexError, MetadataIndex};
use relic_store::{FsObjectStore, ObjectStore, VerifyOutcome};
use relic_types::{Condition, Digest, Metadata};

use crate::error::{ArchiveError, ArchiveResult};
use crate::verify::VerifyReport;

/// Directory under the store root holding physical objects.
pub const OBJECTS_DIR: &str = "objects";

/// Metadata index file under the store root.
pub const DATABASE_FILE: &str = "database";

/// An open artifact store.
///
/// The aggregate root: an object store rooted at `<root>/objects` plus a
/// metadata index at `<root>/database`. The `Archive` exclusively owns
/// both; nothing else mutates them directly. It is an explicit handle —
/// there is no process-wide store — and every call blocks until its
/// filesystem and index work completes.
pub struct Archive {
    root: PathBuf,
    objects: FsObjectStore,
    index: MetadataIndex,
}

impl Archive {
    /// Create a new store at `root` and open it.
    ///
    /// Fails with [`ArchiveError::AlreadyExists`] if `root` already holds
    /// a store. The root directory itself is created if absent.
    pub fn create(root: impl Into<PathBuf>) -> ArchiveResult<Self> {
        let root = root.into();
        if root.join(OBJECTS_DIR).exists() || root.join(DATABASE_FILE).exists() {
            return Err(ArchiveError::AlreadyExists(root));
        }
        fs::create_dir_all(&root)?;
        let objects = FsObjectStore::create(root.join(OBJECTS_DIR))?;
        let index = MetadataIndex::create(&root.join(DATABASE_FILE))?;
        debug!(root = %root.display(), "store created");
        Ok(Self {
            root,
            objects,
            index,
        })
    }

    /// Open an existing store at `root`.
    ///
    /// Fails with [`ArchiveError::NotAStore`] if the expected layout
    /// (objects directory plus index file with the right schema) is not
    /// there.
    pub fn open(root: impl Into<PathBuf>) -> ArchiveResult<Self> {
        let root = root.into();
        if !root.join(OBJECTS_DIR).is_dir() {
            return Err(ArchiveError::NotAStore {
                path: root,
                reason: "objects is not a directory".into(),
            });
        }
        let database = root.join(DATABASE_FILE);
        if !database.is_file() {
            return Err(ArchiveError::NotAStore {
                path: root,
                reason: "database is not a file".into(),
            });
        }
        let index = match MetadataIndex::open(&database) {
            Ok(index) => index,
            Err(IndexError::InvalidSchema(reason)) => {
                return Err(ArchiveError::NotAStore { path: root, reason })
            }
            Err(e) => return Err(e.into()),
        };
        let objects = FsObjectStore::new(root.join(OBJECTS_DIR));
        Ok(Self {
            root,
            objects,
            index,
        })
    }

    /// The store root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store content with its metadata and return the content digest.
    ///
    /// The object write comes first and is idempotent; the metadata insert
    /// is one index transaction. Re-adding identical content merges the
    /// new entries with any existing ones — entries are additive, never
    /// replaced. If the index transaction fails after the object write,
    /// the operation reports failure and the stray object is later caught
    /// by [`Archive::verify`] as an orphan.
    pub fn add(&mut self, content: &[u8], metadata: &Metadata) -> ArchiveResult<Digest> {
        let digest = self.objects.put(content)?;
        self.index
            .insert_entries(&digest, content.len() as u64, metadata)?;
        Ok(digest)
    }

    /// Store a file from disk with its metadata, streaming the content.
    pub fn add_path(&mut self, path: &Path, metadata: &Metadata) -> ArchiveResult<Digest> {
        let digest = self.objects.put_path(path)?;
        let size = fs::metadata(self.objects.object_path(&digest))?.len();
        self.index.insert_entries(&digest, size, metadata)?;
        Ok(digest)
    }

    /// Read back the content stored under a digest.
    pub fn get(&self, digest: &Digest) -> ArchiveResult<Vec<u8>> {
        if !self.index.contains(digest)? {
            return Err(ArchiveError::NotFound(*digest));
        }
        self.objects
            .get(digest)?
            .ok_or(ArchiveError::NotFound(*digest))
    }

    /// Every digest matching all conditions, in sorted order.
    ///
    /// An empty condition set matches every stored digest; an empty result
    /// is a valid, non-error outcome.
    pub fn find(&self, conditions: &[Condition]) -> ArchiveResult<Vec<Digest>> {
        Ok(self.index.find(conditions)?)
    }

    /// Matching digests together with their metadata, sorted by digest.
    pub fn query(&self, conditions: &[Condition]) -> ArchiveResult<Vec<(Digest, Metadata)>> {
        let digests = self.index.find(conditions)?;
        let mut results = Vec::with_capacity(digests.len());
        for digest in digests {
            // Matched digests are known to the index; a concurrent removal
            // between the two reads just drops the digest from the result.
            if let Some(metadata) = self.index.entries_of(&digest)? {
                results.push((digest, metadata));
            }
        }
        Ok(results)
    }

    /// Metadata for each of the given digests.
    ///
    /// Fails with [`ArchiveError::NotFound`] naming the first digest the
    /// index does not know.
    pub fn print_digests(&self, digests: &[Digest]) -> ArchiveResult<BTreeMap<Digest, Metadata>> {
        let mut results = BTreeMap::new();
        for digest in digests {
            let metadata = self
                .index
                .entries_of(digest)?
                .ok_or(ArchiveError::NotFound(*digest))?;
            results.insert(*digest, metadata);
        }
        Ok(results)
    }

    /// Metadata for every digest matching the conditions.
    pub fn print_matching(
        &self,
        conditions: &[Condition],
    ) -> ArchiveResult<BTreeMap<Digest, Metadata>> {
        Ok(self.query(conditions)?.into_iter().collect())
    }

    /// Remove a digest: its metadata entries and its physical object.
    ///
    /// The index transaction commits first; only then is the file
    /// unlinked, so a failure in between leaves an orphan object that
    /// `verify` detects, never a dangling index entry.
    pub fn remove(&mut self, digest: &Digest) -> ArchiveResult<()> {
        if !self.index.delete_entries(digest)? {
            return Err(ArchiveError::NotFound(*digest));
        }
        if !self.objects.remove(digest)? {
            // Already gone on disk; the index entry was the only residue.
            warn!(%digest, "removed index entry had no physical object");
        }
        Ok(())
    }

    /// Remove every digest matching the conditions; returns how many were
    /// removed.
    ///
    /// Each digest's removal is independently atomic. A digest that
    /// disappears mid-batch (e.g. a concurrent remover) is skipped, not a
    /// batch failure.
    pub fn remove_matching(&mut self, conditions: &[Condition]) -> ArchiveResult<usize> {
        let mut removed = 0;
        for digest in self.index.find(conditions)? {
            match self.remove(&digest) {
                Ok(()) => removed += 1,
                Err(ArchiveError::NotFound(_)) => {
                    debug!(%digest, "digest vanished before batch removal reached it");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(removed)
    }

    /// Full integrity pass: check every indexed digest against its on-disk
    /// content, and every physical object against the index.
    ///
    /// Never raises for integrity findings; the report is the result.
    /// Nothing is repaired automatically.
    pub fn verify(&self) -> ArchiveResult<VerifyReport> {
        let mut report = VerifyReport::default();
        for digest in self.index.digests()? {
            match self.objects.verify_object(&digest)? {
                VerifyOutcome::Valid => {}
                VerifyOutcome::Corrupt => report.corrupt.push(digest),
                VerifyOutcome::Missing => report.missing.push(digest),
            }
        }
        for digest in self.objects.digests()? {
            if !self.index.contains(&digest)? {
                report.orphaned.push(digest);
            }
        }
        debug!(findings = report.findings(), "verify pass complete");
        Ok(report)
    }
}

impl std::fmt::Debug for Archive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archive").field("root", &self.root).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn meta(pairs: &[(&str, &str)]) -> Metadata {
        pairs.iter().copied().collect()
    }

    fn conds(pairs: &[(&str, &str)]) -> Vec<Condition> {
        pairs.iter().map(|(k, v)| Condition::new(*k, *v)).collect()
    }

    fn new_archive(dir: &tempfile::TempDir) -> Archive {
        Archive::create(dir.path().join("store")).unwrap()
    }

    // -----------------------------------------------------------------------
    // Create / open state machine
    // -----------------------------------------------------------------------

    #[test]
    fn create_then_open() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("store");
        {
            let mut archive = Archive::create(&root).unwrap();
            archive.add(b"persisted", &meta(&[("k", "v")])).unwrap();
        }
        let archive = Archive::open(&root).unwrap();
        assert_eq!(archive.find(&[]).unwrap().len(), 1);
    }

    #[test]
    fn create_on_existing_store_is_rejected() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("store");
        Archive::create(&root).unwrap();
        assert!(matches!(
            Archive::create(&root),
            Err(ArchiveError::AlreadyExists(_))
        ));
    }

    #[test]
    fn open_on_plain_directory_is_rejected() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            Archive::open(dir.path()),
            Err(ArchiveError::NotAStore { .. })
        ));
    }

    // -----------------------------------------------------------------------
    // Add / get
    // -----------------------------------------------------------------------

    #[test]
    fn add_then_get_roundtrip() {
        let dir = tempdir().unwrap();
        let mut archive = new_archive(&dir);
        let digest = archive.add(b"artifact", &meta(&[("k", "v")])).unwrap();
        assert_eq!(archive.get(&digest).unwrap(), b"artifact");
    }

    #[test]
    fn add_is_digest_stable_across_sessions() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("store");
        let d1 = Archive::create(&root)
            .unwrap()
            .add(b"same bytes", &Metadata::new())
            .unwrap();
        let d2 = Archive::open(&root)
            .unwrap()
            .add(b"same bytes", &Metadata::new())
            .unwrap();
        assert_eq!(d1, d2);
    }

    #[test]
    fn readd_merges_metadata_into_one_object() {
        let dir = tempdir().unwrap();
        let mut archive = new_archive(&dir);
        let d1 = archive.add(b"content", &meta(&[("model", "weather2")])).unwrap();
        let d2 = archive.add(b"content", &meta(&[("run", "44")])).unwrap();
        assert_eq!(d1, d2);

        // One physical object, merged entries.
        assert_eq!(archive.objects.digests().unwrap(), vec![d1]);
        let entries = archive.print_digests(&[d1]).unwrap().remove(&d1).unwrap();
        assert_eq!(entries, meta(&[("model", "weather2"), ("run", "44")]));
    }

    #[test]
    fn conflicting_value_for_same_key_is_additive() {
        let dir = tempdir().unwrap();
        let mut archive = new_archive(&dir);
        let digest = archive.add(b"content", &meta(&[("cluster", "poly")])).unwrap();
        archive.add(b"content", &meta(&[("cluster", "poly-old")])).unwrap();
        let entries = archive.print_digests(&[digest]).unwrap().remove(&digest).unwrap();
        assert!(entries.contains("cluster", "poly"));
        assert!(entries.contains("cluster", "poly-old"));
    }

    #[test]
    fn add_path_stores_file_content() {
        let dir = tempdir().unwrap();
        let mut archive = new_archive(&dir);
        let file = dir.path().join("artifact.dat");
        fs::write(&file, b"file-backed content").unwrap();

        let digest = archive.add_path(&file, &meta(&[("src", "disk")])).unwrap();
        assert_eq!(archive.get(&digest).unwrap(), b"file-backed content");
    }

    #[test]
    fn get_unknown_digest_is_not_found() {
        let dir = tempdir().unwrap();
        let archive = new_archive(&dir);
        let digest = Digest::from_hash([9; 20]);
        assert!(matches!(
            archive.get(&digest),
            Err(ArchiveError::NotFound(d)) if d == digest
        ));
    }

    // -----------------------------------------------------------------------
    // Query
    // -----------------------------------------------------------------------

    #[test]
    fn query_narrows_by_conjunction() {
        let dir = tempdir().unwrap();
        let mut archive = new_archive(&dir);
        let d1 = archive
            .add(b"f1", &meta(&[("model", "weather2"), ("cluster", "poly")]))
            .unwrap();
        let d2 = archive
            .add(b"f2", &meta(&[("model", "weather2"), ("cluster", "poly-old")]))
            .unwrap();

        let mut both = vec![d1, d2];
        both.sort();
        assert_eq!(
            archive.find(&conds(&[("model", "weather2")])).unwrap(),
            both
        );
        assert_eq!(archive.find(&conds(&[("cluster", "poly")])).unwrap(), vec![d1]);
        assert_eq!(
            archive
                .find(&conds(&[("model", "weather2"), ("cluster", "poly")]))
                .unwrap(),
            vec![d1]
        );
    }

    #[test]
    fn empty_conditions_list_everything() {
        let dir = tempdir().unwrap();
        let mut archive = new_archive(&dir);
        let d1 = archive.add(b"a", &meta(&[("k", "v")])).unwrap();
        let d2 = archive.add(b"b", &Metadata::new()).unwrap();
        let mut all = vec![d1, d2];
        all.sort();
        assert_eq!(archive.find(&[]).unwrap(), all);
    }

    #[test]
    fn query_with_no_match_is_empty_not_error() {
        let dir = tempdir().unwrap();
        let archive = new_archive(&dir);
        assert!(archive.query(&conds(&[("no", "match")])).unwrap().is_empty());
    }

    #[test]
    fn query_returns_metadata_alongside_digests() {
        let dir = tempdir().unwrap();
        let mut archive = new_archive(&dir);
        let expected = meta(&[("model", "weather2")]);
        let digest = archive.add(b"f1", &expected).unwrap();
        let results = archive.query(&conds(&[("model", "weather2")])).unwrap();
        assert_eq!(results, vec![(digest, expected)]);
    }

    // -----------------------------------------------------------------------
    // Print
    // -----------------------------------------------------------------------

    #[test]
    fn print_names_the_missing_digest() {
        let dir = tempdir().unwrap();
        let mut archive = new_archive(&dir);
        let known = archive.add(b"known", &Metadata::new()).unwrap();
        let unknown = Digest::from_hash([7; 20]);
        let err = archive.print_digests(&[known, unknown]).unwrap_err();
        assert!(matches!(err, ArchiveError::NotFound(d) if d == unknown));
    }

    #[test]
    fn print_matching_resolves_conditions_first() {
        let dir = tempdir().unwrap();
        let mut archive = new_archive(&dir);
        let digest = archive.add(b"f1", &meta(&[("model", "weather2")])).unwrap();
        archive.add(b"f2", &meta(&[("model", "ocean")])).unwrap();
        let results = archive.print_matching(&conds(&[("model", "weather2")])).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results.contains_key(&digest));
    }

    // -----------------------------------------------------------------------
    // Remove
    // -----------------------------------------------------------------------

    #[test]
    fn remove_clears_object_index_and_queries() {
        let dir = tempdir().unwrap();
        let mut archive = new_archive(&dir);
        let digest = archive.add(b"doomed", &meta(&[("k", "v")])).unwrap();

        archive.remove(&digest).unwrap();

        assert!(archive.find(&conds(&[("k", "v")])).unwrap().is_empty());
        assert!(matches!(
            archive.print_digests(&[digest]),
            Err(ArchiveError::NotFound(_))
        ));
        assert!(matches!(
            archive.get(&digest),
            Err(ArchiveError::NotFound(_))
        ));
        // No orphan left behind.
        assert!(archive.verify().unwrap().is_clean());
    }

    #[test]
    fn remove_unknown_digest_is_not_found() {
        let dir = tempdir().unwrap();
        let mut archive = new_archive(&dir);
        assert!(matches!(
            archive.remove(&Digest::from_hash([3; 20])),
            Err(ArchiveError::NotFound(_))
        ));
    }

    #[test]
    fn remove_matching_counts_and_empties_the_match() {
        let dir = tempdir().unwrap();
        let mut archive = new_archive(&dir);
        archive
            .add(b"f1", &meta(&[("model", "weather2"), ("cluster", "poly")]))
            .unwrap();
        archive
            .add(b"f2", &meta(&[("model", "weather2"), ("cluster", "poly-old")]))
            .unwrap();
        archive.add(b"f3", &meta(&[("model", "ocean")])).unwrap();

        let removed = archive
            .remove_matching(&conds(&[("model", "weather2")]))
            .unwrap();
        assert_eq!(removed, 2);
        assert!(archive
            .find(&conds(&[("model", "weather2")]))
            .unwrap()
            .is_empty());
        // Unmatched digests survive.
        assert_eq!(archive.find(&[]).unwrap().len(), 1);
    }

    // -----------------------------------------------------------------------
    // Verify
    // -----------------------------------------------------------------------

    #[test]
    fn verify_on_healthy_store_is_clean() {
        let dir = tempdir().unwrap();
        let mut archive = new_archive(&dir);
        archive.add(b"healthy", &meta(&[("k", "v")])).unwrap();
        assert!(archive.verify().unwrap().is_clean());
    }

    #[test]
    fn verify_reports_out_of_band_corruption() {
        let dir = tempdir().unwrap();
        let mut archive = new_archive(&dir);
        let digest = archive.add(b"original", &Metadata::new()).unwrap();

        fs::write(archive.objects.object_path(&digest), b"mangled").unwrap();

        let report = archive.verify().unwrap();
        assert_eq!(report.corrupt, vec![digest]);
        assert!(report.missing.is_empty());
        assert!(report.orphaned.is_empty());
    }

    #[test]
    fn verify_reports_missing_object() {
        let dir = tempdir().unwrap();
        let mut archive = new_archive(&dir);
        let digest = archive.add(b"to vanish", &Metadata::new()).unwrap();

        fs::remove_file(archive.objects.object_path(&digest)).unwrap();

        let report = archive.verify().unwrap();
        assert_eq!(report.missing, vec![digest]);
    }

    #[test]
    fn verify_reports_orphaned_object() {
        let dir = tempdir().unwrap();
        let mut archive = new_archive(&dir);
        let digest = archive.add(b"orphan-to-be", &Metadata::new()).unwrap();

        // Drop the index entry out of band, leaving the file in place.
        archive.index.delete_entries(&digest).unwrap();

        let report = archive.verify().unwrap();
        assert_eq!(report.orphaned, vec![digest]);
        assert!(report.corrupt.is_empty());
        assert!(report.missing.is_empty());
    }
}
