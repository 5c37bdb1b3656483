//! Grouping of scored entries into exact and partial matches.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::database::{Database, Entry, EntryId, Group, GroupId};

/// Entries scoring at least this much are exact matches.
pub const EXACT_MATCH_THRESHOLD: f64 = 0.99;

/// An entry paired with its similarity to the search target.
#[derive(Debug, Clone, Copy)]
pub struct ScoredEntry<'a> {
    pub entry: &'a Entry,
    pub similarity_score: f64,
}

/// The matching entries of one group, best first.
#[derive(Debug, Clone)]
pub struct GroupedEntries<'a> {
    pub group: &'a Group,
    pub entries: Vec<ScoredEntry<'a>>,
}

/// Search results grouped by parent group.
pub type SearchResults<'a> = Vec<GroupedEntries<'a>>;

/// Group scored entries by their parent group.
///
/// Groups appear in the order their first entry appears in `scored`, and
/// entries keep their relative order within a group.
pub fn arrange_by_groups<'a>(db: &'a Database, scored: Vec<ScoredEntry<'a>>) -> SearchResults<'a> {
    let mut results: SearchResults<'a> = Vec::new();
    let mut positions: HashMap<GroupId, usize> = HashMap::new();

    for scored_entry in scored {
        let parent_id = scored_entry.entry.parent;
        if let Some(&index) = positions.get(&parent_id) {
            results[index].entries.push(scored_entry);
            continue;
        }
        let Some(group) = db.group(parent_id) else {
            tracing::warn!(entry = ?scored_entry.entry.id, "Entry has no parent group, skipping");
            continue;
        };
        positions.insert(parent_id, results.len());
        results.push(GroupedEntries {
            group,
            entries: vec![scored_entry],
        });
    }
    results
}

/// AutoFill search results split by match quality.
#[derive(Debug, Clone, Default)]
pub struct FuzzySearchResults<'a> {
    pub exact_match: SearchResults<'a>,
    pub partial_match: SearchResults<'a>,
}

impl<'a> FuzzySearchResults<'a> {
    /// Partition scored entries at [`EXACT_MATCH_THRESHOLD`] and group each bucket.
    ///
    /// Entries are stable-sorted by descending score first, so ties keep the
    /// order in which they were scored. The two buckets partition the input:
    /// every entry with a positive score lands in exactly one of
    /// `exact_match`/`partial_match`, and no entry appears twice across them.
    /// An entry scored several times (once per service identifier) is
    /// therefore kept once, with its best score.
    pub fn from_scored(db: &'a Database, mut scored: Vec<ScoredEntry<'a>>) -> Self {
        scored.retain(|item| item.similarity_score > 0.0);
        scored.sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));

        let mut seen: HashSet<EntryId> = HashSet::new();
        scored.retain(|item| seen.insert(item.entry.id));

        let (exact, partial): (Vec<_>, Vec<_>) = scored
            .into_iter()
            .partition(|item| item.similarity_score >= EXACT_MATCH_THRESHOLD);

        Self {
            exact_match: arrange_by_groups(db, exact),
            partial_match: arrange_by_groups(db, partial),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.exact_match.is_empty() && self.partial_match.is_empty()
    }

    /// The single exact match, if there is exactly one.
    ///
    /// Callers use this to fill credentials without showing a picker.
    pub fn perfect_match(&self) -> Option<&'a Entry> {
        match self.exact_match.as_slice() {
            [only_group] => match only_group.entries.as_slice() {
                [only_entry] => Some(only_entry.entry),
                _ => None,
            },
            _ => None,
        }
    }

    /// Serializable, id-based form of these results.
    pub fn to_output(&self) -> FuzzySearchOutput {
        FuzzySearchOutput {
            exact_match: to_grouped_output(&self.exact_match),
            partial_match: to_grouped_output(&self.partial_match),
            perfect_match: self.perfect_match().map(|entry| entry.id),
        }
    }
}

/// One scored entry in [`FuzzySearchOutput`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredEntryOutput {
    pub entry_id: EntryId,
    pub score: f64,
}

/// One group in [`FuzzySearchOutput`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupedEntriesOutput {
    pub group_id: GroupId,
    pub entries: Vec<ScoredEntryOutput>,
}

/// Output of a fuzzy search, referring to groups and entries by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuzzySearchOutput {
    pub exact_match: Vec<GroupedEntriesOutput>,
    pub partial_match: Vec<GroupedEntriesOutput>,
    pub perfect_match: Option<EntryId>,
}

pub(crate) fn to_grouped_output(results: &SearchResults<'_>) -> Vec<GroupedEntriesOutput> {
    results
        .iter()
        .map(|grouped| GroupedEntriesOutput {
            group_id: grouped.group.id,
            entries: grouped
                .entries
                .iter()
                .map(|scored| ScoredEntryOutput {
                    entry_id: scored.entry.id,
                    score: scored.similarity_score,
                })
                .collect(),
        })
        .collect()
}
