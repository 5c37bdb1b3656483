//! Candidate selection before scoring.

use serde::{Deserialize, Serialize};

use crate::database::{Database, Entry};

/// What kind of target the entries are being matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    Domain,
    Url,
    RelyingParty,
}

/// Whether `entry` may take part in a search of the given mode.
///
/// URL searches keep expired entries while domain and passkey searches drop
/// them. Entries in groups that disable searching or auto-type (directly or
/// through an ancestor) never qualify.
pub fn is_candidate(db: &Database, entry: &Entry, mode: SearchMode) -> bool {
    if entry.is_deleted || entry.is_hidden_from_search() {
        return false;
    }
    let excludes_expired = matches!(mode, SearchMode::Domain | SearchMode::RelyingParty);
    if excludes_expired && entry.is_expired {
        return false;
    }
    db.resolving_searching_enabled(entry.parent) && db.resolving_auto_type_enabled(entry.parent)
}

/// All entries of `db` that pass [`is_candidate`], in database order.
pub fn candidates(db: &Database, mode: SearchMode) -> Vec<&Entry> {
    db.entries()
        .iter()
        .filter(|entry| is_candidate(db, entry, mode))
        .collect()
}
