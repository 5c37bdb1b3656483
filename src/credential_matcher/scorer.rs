//! Similarity scoring of entries against AutoFill targets.
//!
//! Every score is in `[0.0, 1.0]`; `0.0` means "not a candidate".

use crate::database::Entry;

use super::domain::{DomainParser, ParsedHost};
use super::url::ParsedUrl;

const TITLE_HOST_SCORE: f64 = 0.8;
const TITLE_SERVICE_SCORE: f64 = 0.5;
const NOTES_HOST_SCORE: f64 = 0.5;
const NOTES_SERVICE_SCORE: f64 = 0.3;
const CUSTOM_FIELD_DOMAIN_SCORE: f64 = 0.5;

const SAME_HOST_BASE_SCORE: f64 = 0.7;
const PATH_WEIGHT: f64 = 0.3;
const PORT_MISMATCH_PENALTY: f64 = 0.2;
const SERVICE_NAME_SCORE: f64 = 0.5;
const SAME_MAIN_DOMAIN_SCORE: f64 = 0.95;

/// Case-insensitive substring check. An empty needle never matches.
pub(crate) fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn max_of(scores: &[f64]) -> f64 {
    scores.iter().copied().fold(0.0, f64::max)
}

/// How similar `candidate` is to `target`.
///
/// Identical URLs score `1.0`. Hosts that are equal or share a registrable
/// domain score `0.7` plus up to `0.3` for a common path prefix, minus `0.2`
/// when both sides name different ports. Unrelated hosts sharing only a
/// service name score `0.5`.
pub fn url_similarity<P: DomainParser>(
    target: &ParsedUrl,
    candidate: Option<&ParsedUrl>,
    parser: &P,
) -> f64 {
    let Some(candidate) = candidate else {
        return 0.0;
    };
    if target == candidate {
        return 1.0;
    }

    let (Some(host1), Some(host2)) = (target.host(), candidate.host()) else {
        return 0.0;
    };
    let host1 = host1.to_lowercase();
    let host2 = host2.to_lowercase();

    let parsed1 = parser.parse(&host1);
    let parsed2 = parser.parse(&host2);
    let same_main_domain = matches!(
        (&parsed1.domain, &parsed2.domain),
        (Some(d1), Some(d2)) if d1 == d2
    );

    if host1 == host2 || same_main_domain {
        let port_penalty = match (target.port(), candidate.port()) {
            (Some(p1), Some(p2)) if p1 != p2 => PORT_MISMATCH_PENALTY,
            _ => 0.0,
        };
        let base = SAME_HOST_BASE_SCORE - port_penalty;
        if candidate.path().is_empty() {
            return base.clamp(0.0, 1.0);
        }
        let score = base + PATH_WEIGHT * path_similarity(target.path(), candidate.path());
        return score.clamp(0.0, 1.0);
    }

    match (&parsed1.service_name, &parsed2.service_name) {
        (Some(s1), Some(s2)) if s1 == s2 => SERVICE_NAME_SCORE,
        _ => 0.0,
    }
}

/// Length of the common case-insensitive prefix relative to the longer path.
fn path_similarity(path1: &str, path2: &str) -> f64 {
    let path1: Vec<char> = path1.to_lowercase().chars().collect();
    let path2: Vec<char> = path2.to_lowercase().chars().collect();
    let max_len = path1.len().max(path2.len());
    if max_len == 0 {
        return 1.0;
    }
    let common = path1
        .iter()
        .zip(path2.iter())
        .take_while(|(a, b)| a == b)
        .count();
    common as f64 / max_len as f64
}

/// How similar the host of `candidate` is to a bare `domain` string:
/// `1.0` for the same host, `0.95` for the same registrable domain.
pub fn domain_host_similarity<P: DomainParser>(
    domain: &str,
    candidate: Option<&ParsedUrl>,
    parser: &P,
) -> f64 {
    let Some(host) = candidate.and_then(ParsedUrl::host) else {
        return 0.0;
    };
    let host = host.to_lowercase();
    let domain = domain.trim().to_lowercase();
    if domain.is_empty() {
        return 0.0;
    }
    if host == domain {
        return 1.0;
    }
    match (parser.main_domain(&host), parser.main_domain(&domain)) {
        (Some(d1), Some(d2)) if d1 == d2 => SAME_MAIN_DOMAIN_SCORE,
        _ => 0.0,
    }
}

/// Score an entry against a domain service identifier.
pub fn score_for_domain<P: DomainParser>(entry: &Entry, domain: &str, parser: &P) -> f64 {
    let url_score = domain_host_similarity(domain, ParsedUrl::guess_from(&entry.url).as_ref(), parser);
    let title_score = if contains_ignore_case(&entry.title, domain) {
        TITLE_HOST_SCORE
    } else {
        0.0
    };
    let notes_score = if contains_ignore_case(&entry.notes, domain) {
        NOTES_HOST_SCORE
    } else {
        0.0
    };

    let Some(override_url) = entry.override_url() else {
        return max_of(&[url_score, title_score, notes_score]);
    };

    let alt_url_score =
        domain_host_similarity(domain, ParsedUrl::guess_from(override_url).as_ref(), parser);
    let max_score_so_far = max_of(&[url_score, title_score, notes_score, alt_url_score]);
    if max_score_so_far >= CUSTOM_FIELD_DOMAIN_SCORE {
        return max_score_so_far;
    }

    let custom_field_score = entry
        .custom_fields()
        .map(|field| {
            if contains_ignore_case(&field.value, domain) {
                CUSTOM_FIELD_DOMAIN_SCORE
            } else {
                0.0
            }
        })
        .fold(0.0, f64::max);
    max_score_so_far.max(custom_field_score)
}

/// Score an entry against a URL service identifier.
///
/// `parsed_host` is the parser output for the target host, computed once per
/// search rather than per entry.
pub fn score_for_url<P: DomainParser>(
    entry: &Entry,
    target: &ParsedUrl,
    parsed_host: &ParsedHost,
    parser: &P,
) -> f64 {
    let url_score = url_similarity(target, ParsedUrl::guess_from(&entry.url).as_ref(), parser);

    let simplified_host = parsed_host
        .domain
        .as_deref()
        .or(target.host())
        .unwrap_or_default();
    let service_name = parsed_host.service_name.as_deref().unwrap_or_default();

    let mut title_score: f64 = 0.0;
    let mut notes_score: f64 = 0.0;
    if contains_ignore_case(&entry.title, simplified_host) {
        title_score = TITLE_HOST_SCORE;
    }
    if contains_ignore_case(&entry.notes, simplified_host) {
        notes_score = NOTES_HOST_SCORE;
    }
    if contains_ignore_case(&entry.title, service_name) {
        title_score = title_score.max(TITLE_SERVICE_SCORE);
    }
    if contains_ignore_case(&entry.notes, service_name) {
        notes_score = notes_score.max(NOTES_SERVICE_SCORE);
    }

    let Some(override_url) = entry.override_url() else {
        return max_of(&[url_score, title_score, notes_score]);
    };

    let alt_url_score = url_similarity(target, ParsedUrl::guess_from(override_url).as_ref(), parser);
    let max_score_so_far = max_of(&[url_score, title_score, notes_score, alt_url_score]);

    let custom_values: Vec<&str> = entry.custom_fields().map(|f| f.value.as_str()).collect();

    // The exact target URL stored in a custom field beats everything else
    if custom_values
        .iter()
        .any(|value| contains_ignore_case(value, target.as_str()))
    {
        return 1.0;
    }

    if let Some(main_domain) = parsed_host.domain.as_deref() {
        if custom_values.iter().any(|value| *value == main_domain) {
            return max_score_so_far.max(SAME_MAIN_DOMAIN_SCORE);
        }
        if custom_values
            .iter()
            .any(|value| contains_ignore_case(value, main_domain))
        {
            return max_score_so_far.max(CUSTOM_FIELD_DOMAIN_SCORE);
        }
    }

    if max_score_so_far > NOTES_SERVICE_SCORE {
        return max_score_so_far;
    }

    if custom_values
        .iter()
        .any(|value| contains_ignore_case(value, service_name))
    {
        return max_score_so_far.max(NOTES_SERVICE_SCORE);
    }
    max_score_so_far
}

/// `1.0` when the entry's passkey belongs to `relying_party` (exact,
/// case-sensitive), otherwise `0.0`.
pub fn score_for_relying_party(entry: &Entry, relying_party: &str) -> f64 {
    match entry.passkey_relying_party() {
        Some(rp) if !relying_party.is_empty() && rp == relying_party => 1.0,
        _ => 0.0,
    }
}
