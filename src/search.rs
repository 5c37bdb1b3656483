//! Plain-text search over a database, as typed into a search bar.
//!
//! The query is split into words on spaces; double quotes keep a phrase
//! together. A word of the form `name:term` only looks at the field called
//! `name`; if the entry has no such field the word is matched as a whole, so
//! a pasted URL still works. An entry matches when every word is found in it.
//!
//! Matching ignores case. It also ignores diacritics (`cafe` finds `Café`)
//! unless the query contains some, in which case they must match.

use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::credential_matcher::{
    arrange_by_groups, to_grouped_output, GroupedEntriesOutput, ScoredEntry, SearchResults,
};
use crate::database::{Database, Entry};
use crate::error::FinderResult;

/// Which parts of an entry the text search looks at.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextSearchOptions {
    /// Also match against field names
    #[serde(default)]
    pub include_field_names: bool,
    /// Also match against the password and other protected values
    #[serde(default)]
    pub include_protected_values: bool,
}

/// Case folding, plus diacritic folding unless the query itself has diacritics.
#[derive(Debug, Clone, Copy)]
struct Folding {
    ignore_diacritics: bool,
}

impl Folding {
    fn for_query(text: &str) -> Self {
        Self {
            ignore_diacritics: !text.nfd().any(is_combining_mark),
        }
    }

    fn fold(&self, text: &str) -> String {
        if self.ignore_diacritics {
            text.nfd()
                .filter(|c| !is_combining_mark(*c))
                .collect::<String>()
                .to_lowercase()
        } else {
            text.nfc().collect::<String>().to_lowercase()
        }
    }

    fn contains(&self, haystack: &str, folded_needle: &str) -> bool {
        self.fold(haystack).contains(folded_needle)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum QueryWord {
    Text(String),
    /// `name:term`; when the entry has no field called `name` the whole
    /// token is matched as text (so `https://...` still finds URLs)
    Field {
        name: String,
        term: String,
        whole: String,
    },
}

impl QueryWord {
    fn from_token(token: &str, folding: &Folding) -> Self {
        let whole = folding.fold(token);
        if let Some((name, term)) = token.split_once(':') {
            let name = name.trim();
            let term = term.trim();
            if !name.is_empty() && !term.is_empty() {
                return QueryWord::Field {
                    name: name.to_string(),
                    term: folding.fold(term),
                    whole,
                };
            }
        }
        QueryWord::Text(whole)
    }

    fn matches(&self, entry: &Entry, options: &TextSearchOptions, folding: &Folding) -> bool {
        match self {
            QueryWord::Text(word) => matches_text(entry, word, options, folding),
            QueryWord::Field { name, term, whole } => {
                let mut scoped = entry
                    .all_fields()
                    .filter(|(field_name, _, _)| field_name.eq_ignore_ascii_case(name))
                    .peekable();
                if scoped.peek().is_none() {
                    return matches_text(entry, whole, options, folding);
                }
                scoped.any(|(_, value, is_protected)| {
                    if is_protected && !options.include_protected_values {
                        return false;
                    }
                    folding.contains(value, term)
                })
            }
        }
    }
}

fn matches_text(entry: &Entry, word: &str, options: &TextSearchOptions, folding: &Folding) -> bool {
    entry.all_fields().any(|(name, value, is_protected)| {
        if options.include_field_names && folding.contains(name, word) {
            return true;
        }
        if is_protected && !options.include_protected_values {
            return false;
        }
        folding.contains(value, word)
    })
}

/// Split a query into words, keeping quoted phrases together.
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut pending = String::new();
    let mut is_quoted = false;
    for c in text.chars() {
        match c {
            '"' => is_quoted = !is_quoted,
            ' ' if !is_quoted => {
                if !pending.is_empty() {
                    tokens.push(std::mem::take(&mut pending));
                }
            }
            _ => pending.push(c),
        }
    }
    if !pending.is_empty() {
        tokens.push(pending);
    }
    tokens
}

/// Find entries containing every word of `text`, grouped by parent group.
///
/// Deleted entries and entries of groups that disable searching are skipped.
/// All hits score `1.0`.
pub fn find_text<'a>(db: &'a Database, text: &str, options: &TextSearchOptions) -> SearchResults<'a> {
    let folding = Folding::for_query(text);
    let words: Vec<QueryWord> = tokenize(text)
        .iter()
        .map(|token| QueryWord::from_token(token, &folding))
        .collect();
    if words.is_empty() {
        return Vec::new();
    }

    let found: Vec<ScoredEntry<'a>> = db
        .entries()
        .iter()
        .filter(|entry| !entry.is_deleted && db.resolving_searching_enabled(entry.parent))
        .filter(|entry| words.iter().all(|word| word.matches(entry, options, &folding)))
        .map(|entry| ScoredEntry {
            entry,
            similarity_score: 1.0,
        })
        .collect();
    tracing::debug!(found = found.len(), total = db.entries().len(), "Text search finished");
    arrange_by_groups(db, found)
}

/// Input for [`find_text_json`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextSearchInput {
    pub database: Database,
    pub text: String,
    #[serde(default)]
    pub options: TextSearchOptions,
}

/// Run [`find_text`] on JSON input; returns the grouped results as JSON.
pub fn find_text_json(input_json: &str) -> FinderResult<String> {
    let input: TextSearchInput = serde_json::from_str(input_json)?;
    input.database.validate()?;
    let results = find_text(&input.database, &input.text, &input.options);
    let output: Vec<GroupedEntriesOutput> = to_grouped_output(&results);
    Ok(serde_json::to_string(&output)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{EntryField, EntryId, Group, GroupId};

    fn test_db() -> Database {
        let groups = vec![
            Group {
                id: GroupId(0),
                name: "Root".into(),
                parent: None,
                searching_enabled: None,
                auto_type_enabled: None,
            },
            Group {
                id: GroupId(1),
                name: "Private".into(),
                parent: Some(GroupId(0)),
                searching_enabled: Some(false),
                auto_type_enabled: None,
            },
        ];

        let mut bank = Entry::new(EntryId(0), GroupId(0), "Bank of Example");
        bank.username = "alice".into();
        bank.password = "hunter2".into();
        bank.fields.push(EntryField::new("Account number", "NL00 1234"));
        bank.fields.push(EntryField::protected("PIN", "9876"));

        let mut mail = Entry::new(EntryId(1), GroupId(0), "Mail");
        mail.username = "alice@example.com".into();
        mail.notes = "Personal mailbox".into();

        let mut deleted = Entry::new(EntryId(2), GroupId(0), "Old bank");
        deleted.is_deleted = true;

        let private = Entry::new(EntryId(3), GroupId(1), "Private bank");

        Database::new(groups, vec![bank, mail, deleted, private]).unwrap()
    }

    fn titles(results: &SearchResults<'_>) -> Vec<String> {
        results
            .iter()
            .flat_map(|g| g.entries.iter().map(|e| e.entry.title.clone()))
            .collect()
    }

    #[test]
    fn test_tokenize_quotes() {
        assert_eq!(
            tokenize(r#"bank  "of example" x"#),
            vec!["bank", "of example", "x"]
        );
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn test_all_words_must_match() {
        let db = test_db();
        let options = TextSearchOptions::default();
        assert_eq!(titles(&find_text(&db, "alice", &options)), vec!["Bank of Example", "Mail"]);
        assert_eq!(titles(&find_text(&db, "alice mailbox", &options)), vec!["Mail"]);
        assert!(find_text(&db, "alice nothing", &options).is_empty());
    }

    #[test]
    fn test_skips_deleted_and_unsearchable_groups() {
        let db = test_db();
        let results = find_text(&db, "BANK", &TextSearchOptions::default());
        assert_eq!(titles(&results), vec!["Bank of Example"]);
    }

    #[test]
    fn test_protected_values_opt_in() {
        let db = test_db();
        assert!(find_text(&db, "hunter2", &TextSearchOptions::default()).is_empty());
        assert!(find_text(&db, "9876", &TextSearchOptions::default()).is_empty());

        let options = TextSearchOptions {
            include_protected_values: true,
            ..Default::default()
        };
        assert_eq!(titles(&find_text(&db, "hunter2", &options)), vec!["Bank of Example"]);
        assert_eq!(titles(&find_text(&db, "9876", &options)), vec!["Bank of Example"]);
    }

    #[test]
    fn test_field_names_opt_in() {
        let db = test_db();
        assert!(find_text(&db, "number", &TextSearchOptions::default()).is_empty());

        let options = TextSearchOptions {
            include_field_names: true,
            ..Default::default()
        };
        assert_eq!(titles(&find_text(&db, "number", &options)), vec!["Bank of Example"]);
    }

    #[test]
    fn test_field_scoped_word() {
        let db = test_db();
        let options = TextSearchOptions::default();
        assert_eq!(titles(&find_text(&db, "username:example", &options)), vec!["Mail"]);
        assert_eq!(titles(&find_text(&db, "title:example", &options)), vec!["Bank of Example"]);
        assert!(find_text(&db, "notes:alice", &options).is_empty());
    }

    #[test]
    fn test_url_query_is_not_a_field_scope() {
        let mut github = Entry::new(EntryId(0), GroupId(0), "GitHub");
        github.url = "https://github.com/login".into();
        let db = Database::new(test_db().groups().to_vec(), vec![github]).unwrap();

        let results = find_text(&db, "https://github.com", &TextSearchOptions::default());
        assert_eq!(titles(&results), vec!["GitHub"]);
        assert!(find_text(&db, "https://gitlab.com", &TextSearchOptions::default()).is_empty());
    }

    #[test]
    fn test_diacritics_ignored_for_plain_query() {
        let mut cafe = Entry::new(EntryId(0), GroupId(0), "Café Noir");
        cafe.username = "zoë".into();
        let plain = Entry::new(EntryId(1), GroupId(0), "Cafe Bleu");
        let db = Database::new(test_db().groups().to_vec(), vec![cafe, plain]).unwrap();
        let options = TextSearchOptions::default();

        assert_eq!(titles(&find_text(&db, "cafe", &options)), vec!["Café Noir", "Cafe Bleu"]);
        assert_eq!(titles(&find_text(&db, "CAFE", &options)), vec!["Café Noir", "Cafe Bleu"]);
        assert_eq!(titles(&find_text(&db, "username:zoe", &options)), vec!["Café Noir"]);
    }

    #[test]
    fn test_diacritics_respected_when_query_has_them() {
        let cafe = Entry::new(EntryId(0), GroupId(0), "Café Noir");
        let plain = Entry::new(EntryId(1), GroupId(0), "Cafe Bleu");
        let db = Database::new(test_db().groups().to_vec(), vec![cafe, plain]).unwrap();
        let options = TextSearchOptions::default();

        assert_eq!(titles(&find_text(&db, "café", &options)), vec!["Café Noir"]);
        assert_eq!(titles(&find_text(&db, "CAFÉ", &options)), vec!["Café Noir"]);
        // Decomposed "e" + combining acute in the query matches the precomposed title
        assert_eq!(titles(&find_text(&db, "cafe\u{301}", &options)), vec!["Café Noir"]);
    }

    #[test]
    fn test_empty_query() {
        let db = test_db();
        assert!(find_text(&db, "", &TextSearchOptions::default()).is_empty());
    }

    #[test]
    fn test_find_text_json() {
        let input = serde_json::json!({
            "database": {
                "groups": [{"id": 0, "name": "Root"}],
                "entries": [{"id": 0, "parent": 0, "title": "Mail"}]
            },
            "text": "mail"
        });
        let output: Vec<GroupedEntriesOutput> =
            serde_json::from_str(&find_text_json(&input.to_string()).unwrap()).unwrap();
        assert_eq!(output.len(), 1);
        assert_eq!(output[0].entries[0].entry_id, EntryId(0));
    }
}
