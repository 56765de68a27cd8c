//! The member set of a list.
//!
//! Effective membership is the implicit owner plus every explicit
//! membership record stored under the list.  The owner never has a record
//! of their own; the member view synthesizes one from the list node.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use handla_shared::constants::UNKNOWN_USER_NAME;
use handla_shared::paths::{list_path, member_path, members_path, profile_path};
use handla_shared::types::{ListId, ListRef, UserId};
use handla_store::{ListRecord, MemberRecord, Store, Subscription, UserProfile, Value};

use crate::error::{ClientError, Result};
use crate::session::Session;

/// A member of a list, enriched with best-effort profile data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Member {
    pub uid: UserId,
    pub display_name: String,
    pub photo_url: Option<String>,
    pub is_owner: bool,
    pub joined_at: DateTime<Utc>,
}

/// Live member view of one list.
///
/// The caller owns the handle: dropping it releases the store listener and
/// the enrichment task.
pub struct MembersWatch {
    rx: watch::Receiver<Vec<Member>>,
    _sub: Subscription,
    task: JoinHandle<()>,
}

impl MembersWatch {
    /// The member sequence: synthesized owner first, then explicit members
    /// by join time.
    pub fn members(&self) -> watch::Receiver<Vec<Member>> {
        self.rx.clone()
    }
}

impl Drop for MembersWatch {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl Session {
    /// Watch the effective member set of a list.
    ///
    /// Must be called within a tokio runtime.
    pub fn watch_members(&self, owner: &UserId, list: &ListId) -> MembersWatch {
        let (tx, mut snapshots) = mpsc::unbounded_channel();
        let (members_tx, rx) = watch::channel(Vec::new());

        let sub = self.store.subscribe(
            &members_path(owner, list),
            Box::new(move |value| {
                let _ = tx.send(value);
            }),
        );

        let store = self.store.clone();
        let owner = owner.clone();
        let list = list.clone();
        let task = tokio::spawn(async move {
            while let Some(snapshot) = snapshots.recv().await {
                let members = assemble_members(&store, &owner, &list, snapshot).await;
                members_tx.send_replace(members);
            }
        });

        MembersWatch {
            rx,
            _sub: sub,
            task,
        }
    }

    /// One-shot read of the effective member set.
    pub async fn load_members(&self, owner: &UserId, list: &ListId) -> Result<Vec<Member>> {
        let snapshot = self.store.read(&members_path(owner, list)).await?;
        Ok(assemble_members(&self.store, owner, list, snapshot).await)
    }

    /// Remove an explicit member from a list.
    ///
    /// The owner has no membership record to remove: taking the owner off
    /// a list is a deletion, not a membership operation, and is refused
    /// here.
    pub async fn remove_member(&self, r: &ListRef, member: &UserId) -> Result<()> {
        let owner = r.owner_or(self.uid());
        if member == owner {
            return Err(ClientError::PermissionDenied("remove the owner"));
        }
        self.store
            .remove(&member_path(owner, r.list_id(), member))
            .await?;
        info!(list = %r, member = %member, "Member removed");
        Ok(())
    }
}

/// Build the enriched member sequence from a members-collection snapshot.
async fn assemble_members(
    store: &Arc<dyn Store>,
    owner: &UserId,
    list: &ListId,
    snapshot: Option<Value>,
) -> Vec<Member> {
    // The owner joined implicitly the moment the list was created.
    let owner_joined = read_list_record(store, owner, list)
        .await
        .map(|record| record.created_at)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

    let mut explicit: Vec<(UserId, MemberRecord)> = Vec::new();
    if let Some(Value::Object(map)) = snapshot {
        for (uid, node) in map {
            match serde_json::from_value::<MemberRecord>(node) {
                Ok(record) => explicit.push((UserId::new(uid), record)),
                Err(error) => {
                    warn!(member = %uid, %error, "Skipping malformed membership record");
                }
            }
        }
    }
    explicit.sort_by(|a, b| a.1.joined_at.cmp(&b.1.joined_at).then_with(|| a.0.cmp(&b.0)));

    let mut members = Vec::with_capacity(explicit.len() + 1);
    members.push(enriched(store, owner.clone(), true, owner_joined).await);
    for (uid, record) in explicit {
        members.push(enriched(store, uid, false, record.joined_at).await);
    }
    members
}

/// Attach profile data to a member, falling back to a placeholder when the
/// profile is missing or unreadable.  Enrichment never fails the view.
async fn enriched(
    store: &Arc<dyn Store>,
    uid: UserId,
    is_owner: bool,
    joined_at: DateTime<Utc>,
) -> Member {
    let profile = fetch_profile(store, &uid).await.unwrap_or_default();
    Member {
        display_name: profile
            .display_name
            .unwrap_or_else(|| UNKNOWN_USER_NAME.to_string()),
        photo_url: profile.photo_url,
        uid,
        is_owner,
        joined_at,
    }
}

/// Best-effort profile read; `None` covers both absence and failure.
pub(crate) async fn fetch_profile(store: &Arc<dyn Store>, uid: &UserId) -> Option<UserProfile> {
    match store.read(&profile_path(uid)).await {
        Ok(Some(value)) => match serde_json::from_value(value) {
            Ok(profile) => Some(profile),
            Err(error) => {
                warn!(user = %uid, %error, "Unreadable profile");
                None
            }
        },
        Ok(None) => None,
        Err(error) => {
            warn!(user = %uid, %error, "Profile fetch failed");
            None
        }
    }
}

/// Best-effort read of a list node as a record.
pub(crate) async fn read_list_record(
    store: &Arc<dyn Store>,
    owner: &UserId,
    list: &ListId,
) -> Option<ListRecord> {
    match store.read(&list_path(owner, list)).await {
        Ok(Some(value)) => serde_json::from_value(value).ok(),
        _ => None,
    }
}
