//! Canonical storage paths.
//!
//! Pure functions from identifiers to slash-separated store paths.  Nothing
//! here performs I/O or mutates state, so every function is safe to call
//! speculatively.  Resolvers that need a selected list return `None` when
//! there is none; callers treat that as "operation skipped", not an error.

use crate::types::{ListId, ListRef, UserId};

/// `users/{owner}/lists`
pub fn lists_path(owner: &UserId) -> String {
    format!("users/{owner}/lists")
}

/// `users/{owner}/lists/{list}`
pub fn list_path(owner: &UserId, list: &ListId) -> String {
    format!("users/{owner}/lists/{list}")
}

/// `users/{owner}/lists/{list}/members`
pub fn members_path(owner: &UserId, list: &ListId) -> String {
    format!("users/{owner}/lists/{list}/members")
}

/// `users/{owner}/lists/{list}/members/{member}`
pub fn member_path(owner: &UserId, list: &ListId, member: &UserId) -> String {
    format!("users/{owner}/lists/{list}/members/{member}")
}

/// The item collection of the referenced list, resolved to its owner.
///
/// Items live beside the list node, not under it: deleting a list and
/// deleting its items are two independent store operations.
pub fn items_path(user: &UserId, list: Option<&ListRef>) -> Option<String> {
    let r = list?;
    Some(format!("users/{}/items/{}", r.owner_or(user), r.list_id()))
}

/// A single item of the referenced list.
pub fn item_path(user: &UserId, list: Option<&ListRef>, item_id: &str) -> Option<String> {
    Some(format!("{}/{item_id}", items_path(user, list)?))
}

/// `users/{user}/sharedLists`
pub fn shared_lists_path(user: &UserId) -> String {
    format!("users/{user}/sharedLists")
}

/// `users/{user}/sharedLists/{key}` where `key` is a composite storage key.
pub fn shared_list_entry_path(user: &UserId, key: &str) -> String {
    format!("users/{user}/sharedLists/{key}")
}

/// `users/{user}/profile`
pub fn profile_path(user: &UserId) -> String {
    format!("users/{user}/profile")
}
