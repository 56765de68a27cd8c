//! Identifier types and the list reference union.
//!
//! A list is addressed either by its bare id (a list owned by the current
//! user) or by a composite `{ownerId}_{listId}` key (a list owned by
//! somebody else).  The two are told apart purely by string shape: user ids
//! issued by the auth collaborator are at least 20 ASCII-alphanumeric
//! characters, while list push keys never are (they start with `-`).
//! [`ListRef::parse`] applies that heuristic exactly once, at the string
//! boundary; everything past the boundary works with the tagged union.

use serde::{Deserialize, Serialize};

use crate::constants::{COMPOSITE_DELIMITER, USER_ID_MIN_LEN};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// A user identifier issued by the auth collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// A list identifier, unique within its owner's list collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListId(pub String);

impl ListId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ListId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ListId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// The signed-in user as reported by the auth collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CurrentUser {
    pub uid: UserId,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub photo_url: Option<String>,
}

impl CurrentUser {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: UserId::new(uid),
            display_name: None,
            email: None,
            photo_url: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// The name shown to other members, falling back to the email address.
    pub fn visible_name(&self) -> Option<&str> {
        self.display_name.as_deref().or(self.email.as_deref())
    }
}

// ---------------------------------------------------------------------------
// List references
// ---------------------------------------------------------------------------

/// Whether `raw` has the shape of a store-generated user id: at least
/// [`USER_ID_MIN_LEN`] characters, ASCII alphanumerics only.
///
/// List ids must never satisfy this predicate (store push keys start with
/// `-`), otherwise composite references become ambiguous.
pub fn looks_like_user_id(raw: &str) -> bool {
    raw.len() >= USER_ID_MIN_LEN && raw.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Reference to a list, resolved once at the string boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ListRef {
    /// A list owned by the current user, addressed by its bare id.
    Own(ListId),
    /// A list owned by another user, addressed by `{owner}_{list}`.
    Shared { owner: UserId, list: ListId },
}

impl ListRef {
    pub fn own(list: impl Into<String>) -> Self {
        Self::Own(ListId::new(list))
    }

    pub fn shared(owner: impl Into<String>, list: impl Into<String>) -> Self {
        Self::Shared {
            owner: UserId::new(owner),
            list: ListId::new(list),
        }
    }

    /// Parse a raw reference string.
    ///
    /// The reference is composite iff it contains the delimiter and the
    /// prefix before the *first* delimiter looks like a user id.  The split
    /// is on the first delimiter only, so list ids may themselves contain
    /// `_`.
    pub fn parse(raw: &str) -> Self {
        if let Some((prefix, rest)) = raw.split_once(COMPOSITE_DELIMITER) {
            if looks_like_user_id(prefix) {
                return Self::Shared {
                    owner: UserId::new(prefix),
                    list: ListId::new(rest),
                };
            }
        }
        Self::Own(ListId::new(raw))
    }

    /// The key this reference is stored and selected under: the bare id for
    /// own lists, `{owner}_{list}` for shared ones.
    pub fn storage_key(&self) -> String {
        match self {
            Self::Own(list) => list.0.clone(),
            Self::Shared { owner, list } => {
                format!("{}{}{}", owner.0, COMPOSITE_DELIMITER, list.0)
            }
        }
    }

    /// The list's id within its owner's collection.
    pub fn list_id(&self) -> &ListId {
        match self {
            Self::Own(list) => list,
            Self::Shared { list, .. } => list,
        }
    }

    /// The owning user: the composite owner for shared references,
    /// `current` otherwise.
    pub fn owner_or<'a>(&'a self, current: &'a UserId) -> &'a UserId {
        match self {
            Self::Own(_) => current,
            Self::Shared { owner, .. } => owner,
        }
    }

    pub fn is_shared(&self) -> bool {
        matches!(self, Self::Shared { .. })
    }
}

impl std::fmt::Display for ListRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.storage_key())
    }
}
