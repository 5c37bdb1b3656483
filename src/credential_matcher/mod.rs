//! Credential matching for AutoFill.
//!
//! Given the service identifiers the OS hands to an AutoFill extension (or a
//! passkey relying party), score every searchable entry of a database and
//! split the hits into exact and partial matches.
//!
//! Structure:
//! 1. **filter**: drop deleted/expired/hidden entries and entries in groups
//!    that disable searching or auto-type
//! 2. **scorer**: score each candidate against the target in `[0.0, 1.0]`
//! 3. **results**: partition at `0.99` and group by parent group

mod domain;
mod filter;
mod results;
mod scorer;
mod url;

use serde::{Deserialize, Serialize};

use crate::database::{Database, Entry};
use crate::error::FinderResult;

pub use domain::{DomainParser, ParsedHost, SuffixListParser};
pub use filter::{candidates, is_candidate, SearchMode};
pub use results::{
    arrange_by_groups, FuzzySearchOutput, FuzzySearchResults, GroupedEntries,
    GroupedEntriesOutput, ScoredEntry, ScoredEntryOutput, SearchResults, EXACT_MATCH_THRESHOLD,
};
pub(crate) use results::to_grouped_output;
pub use scorer::{
    domain_host_similarity, score_for_domain, score_for_relying_party, score_for_url,
    url_similarity,
};
pub use url::ParsedUrl;

/// How a service identifier should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceIdentifierKind {
    /// A bare domain such as `example.com`
    Domain,
    /// A full URL such as `https://example.com/login`
    Url,
    /// Any kind this version does not know about
    #[serde(other)]
    Unknown,
}

/// A search target provided by the AutoFill host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceIdentifier {
    pub identifier: String,
    pub kind: ServiceIdentifierKind,
}

impl ServiceIdentifier {
    pub fn domain(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            kind: ServiceIdentifierKind::Domain,
        }
    }

    pub fn url(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            kind: ServiceIdentifierKind::Url,
        }
    }
}

/// Scores database entries against AutoFill targets.
#[derive(Debug, Clone, Default)]
pub struct EntryFinder<P: DomainParser = SuffixListParser> {
    parser: P,
}

impl EntryFinder<SuffixListParser> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<P: DomainParser> EntryFinder<P> {
    /// Use a custom domain parser, e.g. one backed by a full public suffix list.
    pub fn with_parser(parser: P) -> Self {
        Self { parser }
    }

    pub fn parser(&self) -> &P {
        &self.parser
    }

    /// Find entries matching the given service identifiers or passkey relying party.
    ///
    /// When `relying_party` is given only passkeys are considered and the
    /// service identifiers are ignored.
    pub fn find<'a>(
        &self,
        db: &'a Database,
        service_identifiers: &[ServiceIdentifier],
        relying_party: Option<&str>,
    ) -> FuzzySearchResults<'a> {
        if let Some(relying_party) = relying_party {
            let relevant = self.search_relying_party(db, relying_party);
            return FuzzySearchResults::from_scored(db, relevant);
        }

        let mut relevant: Vec<ScoredEntry<'a>> = Vec::new();
        for service_identifier in service_identifiers {
            match service_identifier.kind {
                ServiceIdentifierKind::Domain => {
                    relevant.extend(self.search_domain(db, &service_identifier.identifier));
                }
                ServiceIdentifierKind::Url => {
                    relevant.extend(self.search_url(db, &service_identifier.identifier));
                }
                ServiceIdentifierKind::Unknown => {
                    tracing::error!(
                        identifier = %service_identifier.identifier,
                        "Unknown service identifier kind"
                    );
                    debug_assert!(false, "Unknown service identifier kind");
                }
            }
        }
        FuzzySearchResults::from_scored(db, relevant)
    }

    fn search_domain<'a>(&self, db: &'a Database, domain: &str) -> Vec<ScoredEntry<'a>> {
        let all = candidates(db, SearchMode::Domain);
        let total = all.len();
        let relevant = rank(all, |entry| score_for_domain(entry, domain, &self.parser));
        tracing::debug!(found = relevant.len(), total, "Domain search finished");
        relevant
    }

    fn search_url<'a>(&self, db: &'a Database, url: &str) -> Vec<ScoredEntry<'a>> {
        let Some(target) = ParsedUrl::guess_from(url) else {
            tracing::debug!("Service URL could not be parsed");
            return Vec::new();
        };
        let parsed_host = target
            .host()
            .map(|host| self.parser.parse(host))
            .unwrap_or_default();

        let all = candidates(db, SearchMode::Url);
        let total = all.len();
        let relevant = rank(all, |entry| {
            score_for_url(entry, &target, &parsed_host, &self.parser)
        });
        tracing::debug!(found = relevant.len(), total, "URL search finished");
        relevant
    }

    fn search_relying_party<'a>(&self, db: &'a Database, relying_party: &str) -> Vec<ScoredEntry<'a>> {
        let all = candidates(db, SearchMode::RelyingParty);
        let total = all.len();
        let relevant = rank(all, |entry| score_for_relying_party(entry, relying_party));
        tracing::debug!(found = relevant.len(), total, "Passkey search finished");
        relevant
    }
}

/// Score entries, drop the zero scores and sort best first (stable).
fn rank<'a>(
    entries: Vec<&'a Entry>,
    score: impl Fn(&Entry) -> f64,
) -> Vec<ScoredEntry<'a>> {
    let mut scored: Vec<ScoredEntry<'a>> = entries
        .into_iter()
        .map(|entry| ScoredEntry {
            entry,
            similarity_score: score(entry),
        })
        .filter(|scored| scored.similarity_score > 0.0)
        .collect();
    scored.sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));
    scored
}

/// Input for [`find_json`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinderInput {
    pub database: Database,
    #[serde(default)]
    pub service_identifiers: Vec<ServiceIdentifier>,
    #[serde(default)]
    pub relying_party: Option<String>,
}

/// Run [`EntryFinder::find`] on JSON input and return the JSON-encoded
/// [`FuzzySearchOutput`] (convenience function for FFI).
pub fn find_json(input_json: &str) -> FinderResult<String> {
    let input: FinderInput = serde_json::from_str(input_json)?;
    input.database.validate()?;
    let results = EntryFinder::new().find(
        &input.database,
        &input.service_identifiers,
        input.relying_party.as_deref(),
    );
    Ok(serde_json::to_string(&results.to_output())?)
}
