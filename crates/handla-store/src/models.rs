//! Typed records kept in the store tree.
//!
//! Field names mirror the wire format already used by deployed clients:
//! list, member, index and profile records are camelCase; item records keep
//! their historical snake_case fields.  Timestamps are epoch milliseconds
//! on the wire.

use chrono::{DateTime, Utc};
use handla_shared::types::{ListId, UserId};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Lists
// ---------------------------------------------------------------------------

/// A list node: `users/{owner}/lists/{id}`.
///
/// The member collection nests under the same node and is ignored when the
/// node is read as a record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ListRecord {
    /// Human-readable list name, mutable by the owner.
    pub name: String,
    /// Creation time, immutable.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl ListRecord {
    /// A record created now.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Membership
// ---------------------------------------------------------------------------

/// A membership record: `users/{owner}/lists/{list}/members/{uid}`.
///
/// The owner is never stored here; ownership is implicit in the path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MemberRecord {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub joined_at: DateTime<Utc>,
}

impl MemberRecord {
    /// A record joined now.
    pub fn now() -> Self {
        Self {
            joined_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Shared-list index
// ---------------------------------------------------------------------------

/// Denormalized per-user index entry: `users/{uid}/sharedLists/{key}`.
///
/// A read-optimization cache, not a source of truth: `name` and `createdAt`
/// are snapshots taken at join time, refreshed from the authoritative list
/// while the entry is watched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SharedListEntry {
    /// The list's id within its owner's collection.
    pub original_id: ListId,
    pub owner_id: UserId,
    /// Owner display name captured at join time.
    pub owner_name: String,
    pub name: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    pub is_shared: bool,
    pub is_owner: bool,
}

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

/// Public profile: `users/{uid}/profile`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    #[serde(rename = "displayName", default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "photoURL", default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// A shopping item: `users/{owner}/items/{list}/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemRecord {
    pub name: String,
    /// Category taxonomy references; both optional.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory_id: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: f64,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub font: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    /// Back-reference into the product catalog, when the item was added
    /// from it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
}

impl ItemRecord {
    /// A bare item with the given name and default presentation.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category_id: None,
            subcategory_id: None,
            quantity: default_quantity(),
            unit: String::new(),
            completed: false,
            color: String::new(),
            font: String::new(),
            icon_url: None,
            product_id: None,
        }
    }
}

fn default_quantity() -> f64 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_list_record_wire_format() {
        let record = ListRecord {
            name: "Fredag".to_string(),
            created_at: Utc.timestamp_millis_opt(1_700_000_000_000).unwrap(),
        };
        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({"name": "Fredag", "createdAt": 1_700_000_000_000i64})
        );
    }

    #[test]
    fn test_list_record_ignores_nested_members() {
        let json = serde_json::json!({
            "name": "Fredag",
            "createdAt": 1_700_000_000_000i64,
            "members": {"zyxwvutsrqponmlkjihg99": {"joinedAt": 1_700_000_100_000i64}},
        });
        let record: ListRecord = serde_json::from_value(json).expect("deserialize");
        assert_eq!(record.name, "Fredag");
    }

    #[test]
    fn test_profile_wire_names() {
        let profile = UserProfile {
            display_name: Some("Maja".to_string()),
            email: None,
            photo_url: Some("https://example.com/maja.png".to_string()),
        };
        let json = serde_json::to_value(&profile).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "displayName": "Maja",
                "photoURL": "https://example.com/maja.png",
            })
        );
    }

    #[test]
    fn test_item_defaults() {
        let item: ItemRecord =
            serde_json::from_value(serde_json::json!({"name": "Mjölk"})).expect("deserialize");
        assert_eq!(item.quantity, 1.0);
        assert!(!item.completed);
        assert_eq!(item.unit, "");
    }
}
