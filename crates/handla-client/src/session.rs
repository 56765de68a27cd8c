//! Session state and view models.
//!
//! A [`Session`] is a signed-in user's live connection to their lists.
//! Every collaborator (the store handle, the current user, the
//! configuration and the selection cache) is injected through
//! [`Session::open`]; there are no ambient singletons in the engine.  The
//! session
//! owns its store listeners and background tasks and releases them on drop.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{info, warn};

use handla_shared::paths::{lists_path, profile_path};
use handla_shared::types::{CurrentUser, ListId, ListRef, UserId};
use handla_store::{ListRecord, Store, StoreError, Subscription, UserProfile, Value};

use crate::config::ClientConfig;
use crate::error::Result;
use crate::selection::SelectionCache;
use crate::sync::{SharedListSync, SharedListView};

/// Summary of an own list, as shown in the list picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSummary {
    pub id: ListId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A signed-in user's live connection to their lists.
pub struct Session {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) user: CurrentUser,
    pub(crate) config: ClientConfig,
    selection_cache: Arc<dyn SelectionCache>,
    pub(crate) own_lists_rx: watch::Receiver<Vec<ListSummary>>,
    _own_lists_sub: Subscription,
    pub(crate) shared: SharedListSync,
    pub(crate) selected_tx: watch::Sender<Option<ListRef>>,
}

impl Session {
    /// Open a session: subscribe to the user's own lists, start the
    /// shared-list synchronizer, restore the last selected list, and
    /// publish the user's profile for other members to display.
    ///
    /// Must be called within a tokio runtime.
    pub async fn open(
        store: Arc<dyn Store>,
        user: CurrentUser,
        config: ClientConfig,
        selection_cache: Arc<dyn SelectionCache>,
    ) -> Result<Self> {
        let (lists_tx, own_lists_rx) = watch::channel(Vec::new());
        let own_lists_sub = store.subscribe(
            &lists_path(&user.uid),
            Box::new(move |value| {
                lists_tx.send_replace(parse_lists(value));
            }),
        );

        let shared = SharedListSync::start(store.clone(), &user);

        let restored = selection_cache
            .load(&user.uid)
            .map(|key| ListRef::parse(&key));
        let (selected_tx, _) = watch::channel(restored);

        let session = Self {
            store,
            user,
            config,
            selection_cache,
            own_lists_rx,
            _own_lists_sub: own_lists_sub,
            shared,
            selected_tx,
        };

        if session.config.publish_profile {
            if let Err(error) = session.publish_profile().await {
                warn!(user = %session.user.uid, %error, "Could not publish profile");
            }
        }

        info!(user = %session.user.uid, "Session opened");
        Ok(session)
    }

    pub fn user(&self) -> &CurrentUser {
        &self.user
    }

    /// Live view of the user's own lists, ordered by creation time.
    pub fn lists(&self) -> watch::Receiver<Vec<ListSummary>> {
        self.own_lists_rx.clone()
    }

    /// Live view of lists shared with the user.
    pub fn shared_lists(&self) -> watch::Receiver<Vec<SharedListView>> {
        self.shared.view()
    }

    /// The active list selection.
    pub fn selected_list(&self) -> watch::Receiver<Option<ListRef>> {
        self.selected_tx.subscribe()
    }

    /// Make `list` the active selection (or clear it) and persist the
    /// choice for the next session.
    pub fn select_list(&self, list: Option<ListRef>) {
        let key = list.as_ref().map(ListRef::storage_key);
        self.selection_cache.store(&self.user.uid, key.as_deref());
        self.selected_tx.send_replace(list);
    }

    /// Write the user's public profile so other members can display their
    /// name and photo.
    pub async fn publish_profile(&self) -> Result<()> {
        let profile = UserProfile {
            display_name: self.user.display_name.clone(),
            email: self.user.email.clone(),
            photo_url: self.user.photo_url.clone(),
        };
        let value = serde_json::to_value(&profile).map_err(StoreError::from)?;
        self.store
            .write(&profile_path(&self.user.uid), value)
            .await?;
        Ok(())
    }

    pub(crate) fn uid(&self) -> &UserId {
        &self.user.uid
    }
}

/// Parse a lists-collection snapshot into sorted summaries, skipping
/// malformed nodes rather than failing the whole view.
fn parse_lists(value: Option<Value>) -> Vec<ListSummary> {
    let entries = match value {
        Some(Value::Object(map)) => map,
        _ => return Vec::new(),
    };

    let mut lists: Vec<ListSummary> = entries
        .into_iter()
        .filter_map(|(id, node)| match serde_json::from_value::<ListRecord>(node) {
            Ok(record) => Some(ListSummary {
                id: ListId::new(id),
                name: record.name,
                created_at: record.created_at,
            }),
            Err(error) => {
                warn!(list = %id, %error, "Skipping malformed list record");
                None
            }
        })
        .collect();

    lists.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    lists
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::MemorySelectionCache;
    use handla_store::MemoryStore;

    async fn open(
        store: &Arc<dyn Store>,
        cache: &Arc<MemorySelectionCache>,
        uid: &str,
    ) -> Session {
        let user = CurrentUser::new(uid).with_display_name("Maja");
        Session::open(
            store.clone(),
            user,
            ClientConfig::default(),
            cache.clone() as Arc<dyn SelectionCache>,
        )
        .await
        .expect("open session")
    }

    #[tokio::test]
    async fn test_open_publishes_profile() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let cache = Arc::new(MemorySelectionCache::new());
        let session = open(&store, &cache, "abcdefghijklmnopqrst12").await;

        let profile = store
            .read("users/abcdefghijklmnopqrst12/profile")
            .await
            .expect("read");
        assert_eq!(
            profile,
            Some(serde_json::json!({"displayName": "Maja"}))
        );
        drop(session);
    }

    #[tokio::test]
    async fn test_selection_restored_across_sessions() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let cache = Arc::new(MemorySelectionCache::new());

        let id = {
            let session = open(&store, &cache, "abcdefghijklmnopqrst12").await;
            session.create_list("Fredag").await.expect("create")
        };

        let session = open(&store, &cache, "abcdefghijklmnopqrst12").await;
        let selected = session.selected_list().borrow().clone();
        assert_eq!(selected, Some(ListRef::Own(id)));
    }

    #[tokio::test]
    async fn test_lists_view_tracks_store() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let cache = Arc::new(MemorySelectionCache::new());
        let session = open(&store, &cache, "abcdefghijklmnopqrst12").await;

        assert!(session.lists().borrow().is_empty());

        let first = session.create_list("Fredag").await.expect("create");
        let second = session.create_list("Lördag").await.expect("create");

        let lists = session.lists().borrow().clone();
        assert_eq!(
            lists.iter().map(|l| l.id.clone()).collect::<Vec<_>>(),
            vec![first, second],
            "own lists are ordered by creation time"
        );
        assert_eq!(lists[1].name, "Lördag");
    }
}
