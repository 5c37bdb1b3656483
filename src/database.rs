//! In-memory database snapshot consumed by the matcher and text search.
//!
//! Groups and entries live in flat vectors and refer to their parent group by
//! index. Nothing here owns a parent; inherited group settings are resolved by
//! walking the parent chain upwards.

use serde::{Deserialize, Serialize};

use crate::error::{FinderError, FinderResult};

/// Custom-data key that hides an entry from AutoFill when set to `true`.
pub const BROWSER_HIDE_ENTRY_KEY: &str = "BrowserHideEntry";

/// Names of the fields every entry has by default.
pub static STANDARD_FIELD_NAMES: &[&str] = &["Title", "UserName", "Password", "URL", "Notes"];

/// Index of a group within [`Database::groups`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub usize);

/// Index of an entry within [`Database::entries`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub usize);

/// A folder of entries and sub-groups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    /// `None` for the root group
    #[serde(default)]
    pub parent: Option<GroupId>,
    /// `None` means "inherit from the parent group"
    #[serde(default)]
    pub searching_enabled: Option<bool>,
    /// `None` means "inherit from the parent group"
    #[serde(default)]
    pub auto_type_enabled: Option<bool>,
}

/// A named field of an entry. Values are already resolved (references and
/// placeholders substituted by the caller).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub is_protected: bool,
}

impl EntryField {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            is_protected: false,
        }
    }

    pub fn protected(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            is_protected: true,
            ..Self::new(name, value)
        }
    }

    /// Whether this is one of the built-in fields rather than a user-defined one.
    pub fn is_standard(&self) -> bool {
        STANDARD_FIELD_NAMES.contains(&self.name.as_str())
    }
}

/// Data only present in entries of the newer database format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtendedEntry {
    /// Alternative URL used for matching
    #[serde(default)]
    pub override_url: String,
    /// Relying party of the stored passkey, if any
    #[serde(default)]
    pub passkey_relying_party: Option<String>,
    /// Plugin/browser custom data, in file order
    #[serde(default)]
    pub custom_data: Vec<(String, String)>,
}

/// A credential record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub parent: GroupId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub notes: String,
    /// Custom fields, in display order
    #[serde(default)]
    pub fields: Vec<EntryField>,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub is_expired: bool,
    #[serde(default)]
    pub is_hidden_from_search: bool,
    /// Present for entries that support the extended format
    #[serde(default)]
    pub extended: Option<ExtendedEntry>,
}

impl Entry {
    /// Create a basic-format entry with only a title set.
    pub fn new(id: EntryId, parent: GroupId, title: impl Into<String>) -> Self {
        Self {
            id,
            parent,
            title: title.into(),
            username: String::new(),
            password: String::new(),
            url: String::new(),
            notes: String::new(),
            fields: Vec::new(),
            is_deleted: false,
            is_expired: false,
            is_hidden_from_search: false,
            extended: None,
        }
    }

    pub fn has_extended_fields(&self) -> bool {
        self.extended.is_some()
    }

    pub fn override_url(&self) -> Option<&str> {
        self.extended.as_ref().map(|ext| ext.override_url.as_str())
    }

    pub fn passkey_relying_party(&self) -> Option<&str> {
        self.extended
            .as_ref()
            .and_then(|ext| ext.passkey_relying_party.as_deref())
    }

    /// Custom fields that are not one of the standard ones.
    pub fn custom_fields(&self) -> impl Iterator<Item = &EntryField> {
        self.fields.iter().filter(|field| !field.is_standard())
    }

    /// Hidden either by the explicit flag or by the `BrowserHideEntry` custom data.
    pub fn is_hidden_from_search(&self) -> bool {
        if self.is_hidden_from_search {
            return true;
        }
        self.extended
            .as_ref()
            .map(|ext| {
                ext.custom_data.iter().any(|(key, value)| {
                    key == BROWSER_HIDE_ENTRY_KEY && value.trim().eq_ignore_ascii_case("true")
                })
            })
            .unwrap_or(false)
    }

    /// All fields of the entry, standard ones first, as `(name, value, is_protected)`.
    pub fn all_fields(&self) -> impl Iterator<Item = (&str, &str, bool)> {
        [
            ("Title", self.title.as_str(), false),
            ("UserName", self.username.as_str(), false),
            ("Password", self.password.as_str(), true),
            ("URL", self.url.as_str(), false),
            ("Notes", self.notes.as_str(), false),
        ]
        .into_iter()
        .chain(
            self.custom_fields()
                .map(|f| (f.name.as_str(), f.value.as_str(), f.is_protected)),
        )
    }
}

/// A loaded database: a group tree plus its entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Database {
    groups: Vec<Group>,
    entries: Vec<Entry>,
}

impl Database {
    /// Build a database, checking that ids match positions and that every
    /// parent reference points at an existing group.
    pub fn new(groups: Vec<Group>, entries: Vec<Entry>) -> FinderResult<Self> {
        let db = Self { groups, entries };
        db.validate()?;
        Ok(db)
    }

    /// Check the invariants of [`Database::new`]; used after deserialization.
    pub fn validate(&self) -> FinderResult<()> {
        for (index, group) in self.groups.iter().enumerate() {
            if group.id.0 != index {
                return Err(FinderError::MisplacedGroup { index, id: group.id });
            }
            if let Some(parent) = group.parent {
                self.group(parent).ok_or(FinderError::UnknownGroup(parent))?;
            }
        }
        for (index, entry) in self.entries.iter().enumerate() {
            if entry.id.0 != index {
                return Err(FinderError::MisplacedEntry { index, id: entry.id });
            }
            self.group(entry.parent)
                .ok_or(FinderError::UnknownGroup(entry.parent))?;
        }
        Ok(())
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.get(id.0)
    }

    pub fn entry(&self, id: EntryId) -> Option<&Entry> {
        self.entries.get(id.0)
    }

    /// The first group without a parent.
    pub fn root(&self) -> Option<&Group> {
        self.groups.iter().find(|g| g.parent.is_none())
    }

    /// Whether entries of `group` may be searched, inherited up the tree.
    pub fn resolving_searching_enabled(&self, group: GroupId) -> bool {
        self.resolve_inherited(group, |g| g.searching_enabled)
    }

    /// Whether entries of `group` may be auto-typed/auto-filled, inherited up the tree.
    pub fn resolving_auto_type_enabled(&self, group: GroupId) -> bool {
        self.resolve_inherited(group, |g| g.auto_type_enabled)
    }

    fn resolve_inherited(&self, start: GroupId, flag: impl Fn(&Group) -> Option<bool>) -> bool {
        let mut current = Some(start);
        // A malformed parent chain could loop; never walk more steps than there are groups.
        for _ in 0..self.groups.len() {
            let Some(group) = current.and_then(|id| self.group(id)) else {
                break;
            };
            if let Some(value) = flag(group) {
                return value;
            }
            current = group.parent;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(id: usize, parent: Option<usize>) -> Group {
        Group {
            id: GroupId(id),
            name: format!("Group {}", id),
            parent: parent.map(GroupId),
            searching_enabled: None,
            auto_type_enabled: None,
        }
    }

    #[test]
    fn test_new_rejects_unknown_parent() {
        let groups = vec![group(0, None)];
        let entries = vec![Entry::new(EntryId(0), GroupId(3), "Orphan")];
        let err = Database::new(groups, entries).unwrap_err();
        assert_eq!(err, FinderError::UnknownGroup(GroupId(3)));
    }

    #[test]
    fn test_new_rejects_misplaced_ids() {
        let groups = vec![group(1, None)];
        assert!(matches!(
            Database::new(groups, vec![]),
            Err(FinderError::MisplacedGroup { index: 0, .. })
        ));
    }

    #[test]
    fn test_inherited_flags_default_to_true() {
        let db = Database::new(vec![group(0, None), group(1, Some(0))], vec![]).unwrap();
        assert!(db.resolving_searching_enabled(GroupId(1)));
        assert!(db.resolving_auto_type_enabled(GroupId(1)));
    }

    #[test]
    fn test_inherited_flags_nearest_ancestor_wins() {
        let mut root = group(0, None);
        root.searching_enabled = Some(false);
        let mut middle = group(1, Some(0));
        middle.auto_type_enabled = Some(false);
        let mut leaf = group(2, Some(1));
        leaf.searching_enabled = Some(true);

        let db = Database::new(vec![root, middle, leaf], vec![]).unwrap();
        assert!(db.resolving_searching_enabled(GroupId(2)));
        assert!(!db.resolving_searching_enabled(GroupId(1)));
        assert!(!db.resolving_auto_type_enabled(GroupId(2)));
        assert!(db.resolving_auto_type_enabled(GroupId(0)));
    }

    #[test]
    fn test_parent_cycle_resolves_to_default() {
        let a = group(0, Some(1));
        let b = group(1, Some(0));
        let db = Database::new(vec![a, b], vec![]).unwrap();
        assert!(db.resolving_searching_enabled(GroupId(0)));
    }

    #[test]
    fn test_browser_hide_entry_custom_data() {
        let mut entry = Entry::new(EntryId(0), GroupId(0), "Hidden");
        assert!(!entry.is_hidden_from_search());
        entry.extended = Some(ExtendedEntry {
            custom_data: vec![(BROWSER_HIDE_ENTRY_KEY.to_string(), "True".to_string())],
            ..Default::default()
        });
        assert!(entry.is_hidden_from_search());
    }

    #[test]
    fn test_custom_fields_skip_standard_names() {
        let mut entry = Entry::new(EntryId(0), GroupId(0), "Fields");
        entry.fields = vec![
            EntryField::new("URL", "https://example.com"),
            EntryField::new("Backup URL", "https://backup.example.com"),
        ];
        let names: Vec<&str> = entry.custom_fields().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Backup URL"]);
    }
}
