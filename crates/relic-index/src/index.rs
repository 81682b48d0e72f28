use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use relic_types::{Condition, Digest, Metadata};

use crate::error::{IndexError, IndexResult};

/// How long a writer waits on SQLite's lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

const SCHEMA: &str = "
CREATE TABLE objects(
    digest TEXT PRIMARY KEY,
    size INTEGER NOT NULL
);
CREATE TABLE metadata(
    digest TEXT NOT NULL,
    mkey TEXT NOT NULL,
    mvalue TEXT NOT NULL,
    UNIQUE(digest, mkey, mvalue)
);
CREATE INDEX metadata_digest_idx ON metadata(digest);
CREATE INDEX metadata_kv_idx ON metadata(mkey, mvalue);
";

/// The metadata index: a transactional mapping from digest to metadata
/// entries, queryable by condition.
///
/// Two tables back it. `objects` records every stored digest (with its
/// content size), so a digest with no metadata at all still shows up in
/// unconditional listings and in verify enumeration. `metadata` holds one
/// row per (digest, key, value) triple; exact duplicate triples collapse,
/// everything else is additive.
pub struct MetadataIndex {
    conn: Connection,
}

impl MetadataIndex {
    /// Create a new index file with an empty schema.
    ///
    /// The caller (the store manager) is responsible for rejecting paths
    /// that already hold a store.
    pub fn create(path: &Path) -> IndexResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        debug!(path = %path.display(), "index created");
        Ok(Self { conn })
    }

    /// Open an existing index file, validating its schema.
    pub fn open(path: &Path) -> IndexResult<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let index = Self { conn };
        index.check_schema()?;
        Ok(index)
    }

    fn check_schema(&self) -> IndexResult<()> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table'")?;
        let tables: HashSet<String> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<_, _>>()?;
        for required in ["objects", "metadata"] {
            if !tables.contains(required) {
                return Err(IndexError::InvalidSchema(format!(
                    "missing table '{required}'"
                )));
            }
        }
        Ok(())
    }

    /// Record a digest and attach metadata entries to it, atomically.
    ///
    /// Re-inserting an already-known digest merges the new entries with the
    /// existing ones (set union); nothing is ever overwritten.
    pub fn insert_entries(
        &mut self,
        digest: &Digest,
        size: u64,
        metadata: &Metadata,
    ) -> IndexResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO objects(digest, size) VALUES (?1, ?2)
             ON CONFLICT(digest) DO NOTHING",
            params![digest.to_hex(), size],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO metadata(digest, mkey, mvalue) VALUES (?1, ?2, ?3)",
            )?;
            for (key, value) in metadata.iter() {
                stmt.execute(params![digest.to_hex(), key, value])?;
            }
        }
        tx.commit()?;
        debug!(%digest, entries = metadata.len(), "metadata recorded");
        Ok(())
    }

    /// Delete a digest and all its metadata entries, atomically.
    ///
    /// Returns `false` if the digest was not known to the index.
    pub fn delete_entries(&mut self, digest: &Digest) -> IndexResult<bool> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM metadata WHERE digest = ?1",
            params![digest.to_hex()],
        )?;
        let removed = tx.execute(
            "DELETE FROM objects WHERE digest = ?1",
            params![digest.to_hex()],
        )?;
        tx.commit()?;
        debug!(%digest, known = removed > 0, "metadata deleted");
        Ok(removed > 0)
    }

    /// Every digest matching all of `conditions`, in sorted order.
    ///
    /// Conjunction semantics: a digest matches when, for each condition,
    /// it carries an entry with that exact key and value. An empty
    /// condition set matches every digest with a stored object. A digest
    /// with no entries never matches a non-empty condition set.
    pub fn find(&self, conditions: &[Condition]) -> IndexResult<Vec<Digest>> {
        if conditions.is_empty() {
            return self.digests();
        }
        let sql = vec!["SELECT digest FROM metadata WHERE mkey = ? AND mvalue = ?"; conditions.len()]
            .join(" INTERSECT ");
        let sql = format!("{sql} ORDER BY digest");
        let mut stmt = self.conn.prepare(&sql)?;
        let bindings: Vec<&str> = conditions
            .iter()
            .flat_map(|c| [c.key.as_str(), c.value.as_str()])
            .collect();
        let rows = stmt.query_map(rusqlite::params_from_iter(bindings), |row| {
            row.get::<_, String>(0)
        })?;
        rows.map(|row| parse_digest(&row?)).collect()
    }

    /// The metadata attached to a digest.
    ///
    /// Returns `Ok(None)` for a digest the index has never seen; a known
    /// digest with no entries yields an empty set.
    pub fn entries_of(&self, digest: &Digest) -> IndexResult<Option<Metadata>> {
        let known: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM objects WHERE digest = ?1",
                params![digest.to_hex()],
                |row| row.get(0),
            )
            .optional()?;
        if known.is_none() {
            return Ok(None);
        }
        let mut stmt = self
            .conn
            .prepare("SELECT mkey, mvalue FROM metadata WHERE digest = ?1")?;
        let rows = stmt.query_map(params![digest.to_hex()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let metadata: Metadata = rows.collect::<Result<_, _>>()?;
        Ok(Some(metadata))
    }

    /// Whether the index knows this digest.
    pub fn contains(&self, digest: &Digest) -> IndexResult<bool> {
        Ok(self
            .conn
            .query_row(
                "SELECT 1 FROM objects WHERE digest = ?1",
                params![digest.to_hex()],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
            .is_some())
    }

    /// Every digest known to the index, in sorted order.
    pub fn digests(&self) -> IndexResult<Vec<Digest>> {
        let mut stmt = self
            .conn
            .prepare("SELECT digest FROM objects ORDER BY digest")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        rows.map(|row| parse_digest(&row?)).collect()
    }
}

fn parse_digest(hex: &str) -> IndexResult<Digest> {
    Digest::from_hex(hex).map_err(|e| IndexError::CorruptRow(format!("digest '{hex}': {e}")))
}

impl std::fmt::Debug for MetadataIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataIndex").finish_non_exhaustive()
    }
}
