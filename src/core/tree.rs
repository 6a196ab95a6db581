//! Validated navigation of the record tree fetched from the store.
//!
//! The tree is kept as raw JSON so it can be cached byte-for-byte; every
//! lookup into it goes through this module and fails with a named error
//! instead of assuming a key exists.

use crate::core::error::ExtractError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Key of the user mapping at the tree root.
pub const USERS_KEY: &str = "users";

/// Key holding a user's display name.
pub const DISPLAY_NAME_KEY: &str = "first_name";

/// Prefix forcing a selector string to be read as a user id.
pub const ID_PREFIX: &str = "id:";

/// The full nested document fetched from the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordTree(Value);

impl RecordTree {
    /// Wrap a raw JSON document.
    pub fn new(root: Value) -> Self {
        Self(root)
    }

    /// Borrow the raw document.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// All users in document order.
    ///
    /// Every entry must be a mapping; one that is not fails the whole
    /// lookup so that index selection never shifts to another subject.
    pub fn users(&self) -> Result<Vec<UserRecord<'_>>, ExtractError> {
        let users = self
            .0
            .get(USERS_KEY)
            .and_then(Value::as_object)
            .ok_or(ExtractError::MissingUsers)?;

        users
            .iter()
            .map(|(id, v)| {
                v.as_object()
                    .map(|fields| UserRecord { id, fields })
                    .ok_or_else(|| ExtractError::MalformedUser { id: id.clone() })
            })
            .collect()
    }

    /// Look up a single user by position or id.
    pub fn user(&self, selector: &UserSelector) -> Result<UserRecord<'_>, ExtractError> {
        let users = self.users()?;
        let available = users.len();

        let found = match selector {
            UserSelector::Index(i) => users.into_iter().nth(*i),
            UserSelector::Id(id) => users.into_iter().find(|u| u.id == id.as_str()),
        };

        found.ok_or_else(|| ExtractError::UserNotFound {
            selector: selector.to_string(),
            available,
        })
    }
}

/// How a caller picks the subject whose windows are extracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserSelector {
    /// Position in document order.
    Index(usize),
    /// Opaque user id key.
    Id(String),
}

impl fmt::Display for UserSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserSelector::Index(i) => write!(f, "index {i}"),
            UserSelector::Id(id) => write!(f, "id \"{id}\""),
        }
    }
}

impl std::str::FromStr for UserSelector {
    type Err = std::convert::Infallible;

    /// `id:<key>` always selects by id. Otherwise numeric strings select by
    /// index and anything else by id.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(id) = s.strip_prefix(ID_PREFIX) {
            return Ok(UserSelector::Id(id.to_string()));
        }
        Ok(match s.parse::<usize>() {
            Ok(i) => UserSelector::Index(i),
            Err(_) => UserSelector::Id(s.to_string()),
        })
    }
}

/// Borrowed view of one user's entry in the tree.
#[derive(Debug, Clone, Copy)]
pub struct UserRecord<'a> {
    id: &'a str,
    fields: &'a Map<String, Value>,
}

impl<'a> UserRecord<'a> {
    /// Build a view over a raw user mapping.
    pub fn from_map(id: &'a str, fields: &'a Map<String, Value>) -> Self {
        Self { id, fields }
    }

    pub fn id(&self) -> &'a str {
        self.id
    }

    /// The subject's display name, if recorded.
    pub fn display_name(&self) -> Option<&'a str> {
        self.fields.get(DISPLAY_NAME_KEY).and_then(Value::as_str)
    }

    /// Names of the data categories (keys holding a mapping).
    pub fn categories(&self) -> Vec<&'a str> {
        self.fields
            .iter()
            .filter(|(_, v)| v.is_object())
            .map(|(k, _)| k.as_str())
            .collect()
    }

    /// Raw value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.fields.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_tree() -> RecordTree {
        RecordTree::new(json!({
            "users": {
                "uid-b": { "first_name": "Bea", "data": {}, "energy_data": {} },
                "uid-a": { "first_name": "Al", "data": {} },
                "uid-c": { "data": {} }
            }
        }))
    }

    #[test]
    fn test_users_in_document_order() {
        let tree = sample_tree();
        let ids: Vec<&str> = tree.users().unwrap().iter().map(|u| u.id()).collect();
        assert_eq!(ids, vec!["uid-b", "uid-a", "uid-c"]);
    }

    #[test]
    fn test_user_selection() {
        let tree = sample_tree();

        let by_index = tree.user(&UserSelector::Index(1)).unwrap();
        assert_eq!(by_index.display_name(), Some("Al"));

        let by_id = tree.user(&UserSelector::Id("uid-b".into())).unwrap();
        assert_eq!(by_id.categories(), vec!["data", "energy_data"]);

        let nameless = tree.user(&UserSelector::Index(2)).unwrap();
        assert_eq!(nameless.display_name(), None);
    }

    #[test]
    fn test_user_not_found() {
        let tree = sample_tree();
        let err = tree.user(&UserSelector::Index(7)).unwrap_err();
        match err {
            ExtractError::UserNotFound { available, .. } => assert_eq!(available, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_users() {
        let tree = RecordTree::new(json!({ "other": {} }));
        assert!(matches!(tree.users(), Err(ExtractError::MissingUsers)));

        let tree = RecordTree::new(json!({ "users": [1, 2] }));
        assert!(matches!(tree.users(), Err(ExtractError::MissingUsers)));
    }

    #[test]
    fn test_non_mapping_user_rejected() {
        let tree = RecordTree::new(json!({
            "users": {
                "uid-a": { "first_name": "Al", "data": {} },
                "uid-broken": "oops",
                "uid-c": { "first_name": "Cy", "data": {} }
            }
        }));

        match tree.users() {
            Err(ExtractError::MalformedUser { id }) => assert_eq!(id, "uid-broken"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(matches!(
            tree.user(&UserSelector::Index(1)),
            Err(ExtractError::MalformedUser { .. })
        ));
    }

    #[test]
    fn test_selector_parsing() {
        assert_eq!("3".parse::<UserSelector>().unwrap(), UserSelector::Index(3));
        assert_eq!(
            "-Lx9abc".parse::<UserSelector>().unwrap(),
            UserSelector::Id("-Lx9abc".into())
        );
        assert_eq!(
            "id:1234".parse::<UserSelector>().unwrap(),
            UserSelector::Id("1234".into())
        );
    }

    #[test]
    fn test_numeric_id_selectable_with_prefix() {
        let tree = RecordTree::new(json!({
            "users": {
                "uid-a": { "first_name": "Al" },
                "0": { "first_name": "Zero" }
            }
        }));

        let by_index = tree.user(&"0".parse().unwrap()).unwrap();
        assert_eq!(by_index.display_name(), Some("Al"));

        let by_id = tree.user(&"id:0".parse().unwrap()).unwrap();
        assert_eq!(by_id.display_name(), Some("Zero"));
    }
}
