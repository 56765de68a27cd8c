//! Shared-list index synchronizer.
//!
//! Watches the user's `sharedLists` index and keeps one nested listener on
//! the authoritative list behind every entry.  The supervisor task
//! reconciles the nested listeners by diffing index keys on every parent
//! snapshot, cancelling watchers for removed keys before installing new
//! ones, so the number of live nested subscriptions always equals the
//! number of index entries.
//!
//! The index itself is a cache: the materialized view always carries the
//! live upstream name and creation time, and an upstream deletion removes
//! the row from the view without touching the stale index record.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use handla_shared::paths::{list_path, shared_lists_path};
use handla_shared::types::{CurrentUser, ListId, UserId};
use handla_store::{ListRecord, SharedListEntry, Store, Subscription, Value};

/// Messages consumed by the supervisor task.
enum SyncMessage {
    /// A fresh snapshot of the user's `sharedLists` collection.
    Index(Option<Value>),
    /// The authoritative list behind `key` changed (`None` = deleted).
    Upstream { key: String, value: Option<Value> },
}

/// Materialized row of the shared-lists view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedListView {
    /// Composite storage key (`{owner}_{list}`).
    pub key: String,
    pub original_id: ListId,
    pub owner_id: UserId,
    pub owner_name: String,
    /// Live upstream name, not the index snapshot.
    pub name: String,
    /// Live upstream creation time.
    pub created_at: DateTime<Utc>,
    pub is_owner: bool,
}

/// One index entry's nested watcher plus its latest upstream value.
struct NestedWatch {
    entry: SharedListEntry,
    live: Option<ListRecord>,
    _sub: Subscription,
}

/// Supervisor for the per-entry nested subscriptions.
pub struct SharedListSync {
    view_rx: watch::Receiver<Vec<SharedListView>>,
    _index_sub: Subscription,
    task: JoinHandle<()>,
}

impl SharedListSync {
    /// Subscribe to `user`'s index and start the supervisor task.
    ///
    /// Must be called within a tokio runtime.
    pub fn start(store: Arc<dyn Store>, user: &CurrentUser) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(Vec::new());

        let index_tx = tx.clone();
        let index_sub = store.subscribe(
            &shared_lists_path(&user.uid),
            Box::new(move |value| {
                let _ = index_tx.send(SyncMessage::Index(value));
            }),
        );

        let task = tokio::spawn(supervise(store, tx, rx, view_tx));

        Self {
            view_rx,
            _index_sub: index_sub,
            task,
        }
    }

    /// Live materialized view, ordered by list creation time.
    pub fn view(&self) -> watch::Receiver<Vec<SharedListView>> {
        self.view_rx.clone()
    }
}

impl Drop for SharedListSync {
    fn drop(&mut self) {
        // Dropping the task's watch map releases every nested listener.
        self.task.abort();
    }
}

async fn supervise(
    store: Arc<dyn Store>,
    tx: mpsc::UnboundedSender<SyncMessage>,
    mut rx: mpsc::UnboundedReceiver<SyncMessage>,
    view_tx: watch::Sender<Vec<SharedListView>>,
) {
    let mut watches: HashMap<String, NestedWatch> = HashMap::new();

    while let Some(message) = rx.recv().await {
        match message {
            SyncMessage::Index(snapshot) => reconcile(&store, &tx, &mut watches, snapshot),
            SyncMessage::Upstream { key, value } => {
                if let Some(nested) = watches.get_mut(&key) {
                    nested.live = value.and_then(|node| {
                        match serde_json::from_value::<ListRecord>(node) {
                            Ok(record) => Some(record),
                            Err(error) => {
                                warn!(list = %key, %error, "Malformed upstream list record");
                                None
                            }
                        }
                    });
                }
            }
        }
        publish(&view_tx, &watches);
    }
}

/// Diff the index snapshot against the running watchers: cancel removed,
/// spawn added, refresh the denormalized entry of survivors.
fn reconcile(
    store: &Arc<dyn Store>,
    tx: &mpsc::UnboundedSender<SyncMessage>,
    watches: &mut HashMap<String, NestedWatch>,
    snapshot: Option<Value>,
) {
    let mut entries: HashMap<String, SharedListEntry> = HashMap::new();
    if let Some(Value::Object(map)) = snapshot {
        for (key, node) in map {
            match serde_json::from_value::<SharedListEntry>(node) {
                Ok(entry) => {
                    entries.insert(key, entry);
                }
                Err(error) => warn!(entry = %key, %error, "Skipping malformed index entry"),
            }
        }
    }

    // Cancel watchers whose entry disappeared before installing new ones;
    // dropping the NestedWatch releases the store listener.
    watches.retain(|key, _| entries.contains_key(key));

    for (key, entry) in entries {
        match watches.get_mut(&key) {
            Some(existing) => existing.entry = entry,
            None => {
                let path = list_path(&entry.owner_id, &entry.original_id);
                let upstream_tx = tx.clone();
                let upstream_key = key.clone();
                let sub = store.subscribe(
                    &path,
                    Box::new(move |value| {
                        let _ = upstream_tx.send(SyncMessage::Upstream {
                            key: upstream_key.clone(),
                            value,
                        });
                    }),
                );
                debug!(list = %key, "Watching shared list");
                watches.insert(
                    key,
                    NestedWatch {
                        entry,
                        live: None,
                        _sub: sub,
                    },
                );
            }
        }
    }
}

fn publish(view_tx: &watch::Sender<Vec<SharedListView>>, watches: &HashMap<String, NestedWatch>) {
    let mut view: Vec<SharedListView> = watches
        .iter()
        .filter_map(|(key, nested)| {
            let live = nested.live.as_ref()?;
            Some(SharedListView {
                key: key.clone(),
                original_id: nested.entry.original_id.clone(),
                owner_id: nested.entry.owner_id.clone(),
                owner_name: nested.entry.owner_name.clone(),
                name: live.name.clone(),
                created_at: live.created_at,
                is_owner: nested.entry.is_owner,
            })
        })
        .collect();
    view.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.key.cmp(&b.key))
    });
    view_tx.send_replace(view);
}

#[cfg(test)]
mod tests {
    use super::*;
    use handla_store::MemoryStore;
    use serde_json::json;
    use tokio::time::{timeout, Duration};

    const OWNER: &str = "abcdefghijklmnopqrst12";
    const GUEST: &str = "zyxwvutsrqponmlkjihg99";

    async fn eventually<T: Clone>(
        rx: &mut watch::Receiver<T>,
        pred: impl FnMut(&T) -> bool,
    ) -> T {
        timeout(Duration::from_secs(2), rx.wait_for(pred))
            .await
            .expect("view did not converge")
            .expect("view channel closed")
            .clone()
    }

    async fn seed_shared_list(store: &MemoryStore, name: &str) -> String {
        store
            .write(
                &format!("users/{OWNER}/lists/L1"),
                json!({"name": name, "createdAt": 1_700_000_000_000i64}),
            )
            .await
            .expect("seed list");

        let key = format!("{OWNER}_L1");
        store
            .write(
                &format!("users/{GUEST}/sharedLists/{key}"),
                json!({
                    "originalId": "L1",
                    "ownerId": OWNER,
                    "ownerName": "Maja",
                    "name": name,
                    "createdAt": 1_700_000_000_000i64,
                    "isShared": true,
                    "isOwner": false,
                }),
            )
            .await
            .expect("seed entry");
        key
    }

    #[tokio::test]
    async fn test_view_mirrors_live_upstream() {
        let store = MemoryStore::new();
        let key = seed_shared_list(&store, "Fredag").await;

        let sync = SharedListSync::start(
            Arc::new(store.clone()),
            &CurrentUser::new(GUEST),
        );
        let mut view = sync.view();

        let rows = eventually(&mut view, |v| v.len() == 1).await;
        assert_eq!(rows[0].key, key);
        assert_eq!(rows[0].name, "Fredag");
        assert_eq!(rows[0].owner_name, "Maja");
        assert!(!rows[0].is_owner);
    }

    #[tokio::test]
    async fn test_upstream_rename_propagates_without_user_action() {
        let store = MemoryStore::new();
        seed_shared_list(&store, "Fredag").await;

        let sync = SharedListSync::start(
            Arc::new(store.clone()),
            &CurrentUser::new(GUEST),
        );
        let mut view = sync.view();
        eventually(&mut view, |v| v.len() == 1).await;

        store
            .patch(
                &format!("users/{OWNER}/lists/L1"),
                json!({"name": "Lördag"}),
            )
            .await
            .expect("rename");

        let rows = eventually(&mut view, |v| {
            v.first().map(|r| r.name.as_str()) == Some("Lördag")
        })
        .await;
        assert_eq!(rows.len(), 1, "rename must not duplicate the row");
    }

    #[tokio::test]
    async fn test_upstream_delete_prunes_view_but_not_index() {
        let store = MemoryStore::new();
        let key = seed_shared_list(&store, "Fredag").await;

        let sync = SharedListSync::start(
            Arc::new(store.clone()),
            &CurrentUser::new(GUEST),
        );
        let mut view = sync.view();
        eventually(&mut view, |v| v.len() == 1).await;

        store
            .remove(&format!("users/{OWNER}/lists/L1"))
            .await
            .expect("delete upstream");

        eventually(&mut view, Vec::is_empty).await;

        // The stale index record is cache, left for read-time self-healing.
        let entry = store
            .read(&format!("users/{GUEST}/sharedLists/{key}"))
            .await
            .expect("read");
        assert!(entry.is_some());
    }

    #[tokio::test]
    async fn test_index_removal_cancels_nested_watcher() {
        let store = MemoryStore::new();
        let key = seed_shared_list(&store, "Fredag").await;

        let sync = SharedListSync::start(
            Arc::new(store.clone()),
            &CurrentUser::new(GUEST),
        );
        let mut view = sync.view();
        eventually(&mut view, |v| v.len() == 1).await;

        store
            .remove(&format!("users/{GUEST}/sharedLists/{key}"))
            .await
            .expect("remove entry");
        eventually(&mut view, Vec::is_empty).await;

        // A later upstream rename must not resurrect the cancelled row.
        store
            .patch(
                &format!("users/{OWNER}/lists/L1"),
                json!({"name": "Spöklista"}),
            )
            .await
            .expect("rename");
        tokio::task::yield_now().await;
        assert!(view.borrow().is_empty());
    }
}
