use serde::Serialize;

use relic_types::Digest;

/// Findings of a full integrity pass over one store.
///
/// Verify never raises for data integrity problems; it reports them here
/// and leaves remediation to the caller.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    /// Indexed digests whose on-disk content hashes to something else.
    pub corrupt: Vec<Digest>,
    /// Indexed digests with no readable physical object.
    pub missing: Vec<Digest>,
    /// Physical objects with no corresponding index entry.
    pub orphaned: Vec<Digest>,
}

impl VerifyReport {
    /// Returns `true` if the pass found nothing wrong.
    pub fn is_clean(&self) -> bool {
        self.corrupt.is_empty() && self.missing.is_empty() && self.orphaned.is_empty()
    }

    /// Total number of findings.
    pub fn findings(&self) -> usize {
        self.corrupt.len() + self.missing.len() + self.orphaned.len()
    }
}
