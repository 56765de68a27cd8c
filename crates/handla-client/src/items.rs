//! Item operations.
//!
//! Thin CRUD over the referenced list's item collection.  Every operation
//! resolves its path through the path resolver and silently skips when no
//! list is referenced; "no selection" is not an error.

use tokio::sync::watch;
use tracing::{info, warn};

use handla_shared::paths::{item_path, items_path};
use handla_shared::types::ListRef;
use handla_store::{ItemRecord, Store, StoreError, Subscription, Value};

use crate::error::Result;
use crate::session::Session;

/// Scope of a bulk item deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearMode {
    All,
    CompletedOnly,
}

/// An item with its collection key.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemView {
    pub id: String,
    pub record: ItemRecord,
}

/// Live item view of one list.
pub struct ItemsWatch {
    rx: watch::Receiver<Vec<ItemView>>,
    _sub: Subscription,
}

impl ItemsWatch {
    /// Items in push-key (insertion) order.
    pub fn items(&self) -> watch::Receiver<Vec<ItemView>> {
        self.rx.clone()
    }
}

impl Session {
    /// Add an item.  Returns the generated id, or `None` when no list is
    /// referenced.
    pub async fn add_item(&self, r: Option<&ListRef>, item: ItemRecord) -> Result<Option<String>> {
        let Some(path) = items_path(self.uid(), r) else {
            return Ok(None);
        };
        let value = serde_json::to_value(&item).map_err(StoreError::from)?;
        let id = self.store.push_child(&path, value).await?;
        Ok(Some(id))
    }

    /// Overwrite an item.
    pub async fn update_item(&self, r: Option<&ListRef>, id: &str, item: ItemRecord) -> Result<()> {
        let Some(path) = item_path(self.uid(), r, id) else {
            return Ok(());
        };
        let value = serde_json::to_value(&item).map_err(StoreError::from)?;
        self.store.write(&path, value).await?;
        Ok(())
    }

    /// Flip an item's completed flag.
    pub async fn set_completed(&self, r: Option<&ListRef>, id: &str, completed: bool) -> Result<()> {
        let Some(path) = item_path(self.uid(), r, id) else {
            return Ok(());
        };
        self.store
            .patch(&path, serde_json::json!({ "completed": completed }))
            .await?;
        Ok(())
    }

    /// Delete one item.
    pub async fn remove_item(&self, r: Option<&ListRef>, id: &str) -> Result<()> {
        let Some(path) = item_path(self.uid(), r, id) else {
            return Ok(());
        };
        self.store.remove(&path).await?;
        Ok(())
    }

    /// Delete all items, or only the completed ones.
    pub async fn clear_items(&self, r: Option<&ListRef>, mode: ClearMode) -> Result<()> {
        let Some(path) = items_path(self.uid(), r) else {
            return Ok(());
        };
        match mode {
            ClearMode::All => self.store.remove(&path).await?,
            ClearMode::CompletedOnly => {
                for item in self.load_items(r).await? {
                    if item.record.completed {
                        self.store.remove(&format!("{path}/{}", item.id)).await?;
                    }
                }
            }
        }
        info!(list = %r.map(ListRef::storage_key).unwrap_or_default(), ?mode, "Items cleared");
        Ok(())
    }

    /// One-shot read of the referenced list's items, in insertion order.
    pub async fn load_items(&self, r: Option<&ListRef>) -> Result<Vec<ItemView>> {
        let Some(path) = items_path(self.uid(), r) else {
            return Ok(Vec::new());
        };
        Ok(parse_items(self.store.read(&path).await?))
    }

    /// Watch the referenced list's items.  Returns `None` when no list is
    /// referenced.
    pub fn watch_items(&self, r: Option<&ListRef>) -> Option<ItemsWatch> {
        let path = items_path(self.uid(), r)?;
        let (tx, rx) = watch::channel(Vec::new());
        let sub = self.store.subscribe(
            &path,
            Box::new(move |value| {
                tx.send_replace(parse_items(value));
            }),
        );
        Some(ItemsWatch { rx, _sub: sub })
    }
}

fn parse_items(value: Option<Value>) -> Vec<ItemView> {
    let Some(Value::Object(map)) = value else {
        return Vec::new();
    };
    let mut items: Vec<ItemView> = map
        .into_iter()
        .filter_map(|(id, node)| match serde_json::from_value::<ItemRecord>(node) {
            Ok(record) => Some(ItemView { id, record }),
            Err(error) => {
                warn!(item = %id, %error, "Skipping malformed item");
                None
            }
        })
        .collect();
    items.sort_by(|a, b| a.id.cmp(&b.id));
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::selection::{MemorySelectionCache, SelectionCache};
    use handla_shared::types::CurrentUser;
    use handla_store::MemoryStore;
    use std::sync::Arc;

    const OWNER: &str = "abcdefghijklmnopqrst12";

    async fn open_with_list(store: &Arc<dyn Store>) -> (Session, ListRef) {
        let session = Session::open(
            store.clone(),
            CurrentUser::new(OWNER).with_display_name("Maja"),
            ClientConfig::default(),
            Arc::new(MemorySelectionCache::new()) as Arc<dyn SelectionCache>,
        )
        .await
        .expect("open session");
        let id = session.create_list("Fredag").await.expect("create");
        (session, ListRef::Own(id))
    }

    #[tokio::test]
    async fn test_item_crud() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let (session, r) = open_with_list(&store).await;

        let milk = session
            .add_item(Some(&r), ItemRecord::new("Mjölk"))
            .await
            .expect("add")
            .expect("id");
        session
            .add_item(Some(&r), ItemRecord::new("Bröd"))
            .await
            .expect("add");

        session
            .set_completed(Some(&r), &milk, true)
            .await
            .expect("toggle");

        let items = session.load_items(Some(&r)).await.expect("load");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].record.name, "Mjölk");
        assert!(items[0].record.completed);
        assert!(!items[1].record.completed);

        session.remove_item(Some(&r), &milk).await.expect("remove");
        let items = session.load_items(Some(&r)).await.expect("load");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].record.name, "Bröd");
    }

    #[tokio::test]
    async fn test_clear_completed_only() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let (session, r) = open_with_list(&store).await;

        let milk = session
            .add_item(Some(&r), ItemRecord::new("Mjölk"))
            .await
            .expect("add")
            .expect("id");
        session
            .add_item(Some(&r), ItemRecord::new("Bröd"))
            .await
            .expect("add");
        session
            .set_completed(Some(&r), &milk, true)
            .await
            .expect("toggle");

        session
            .clear_items(Some(&r), ClearMode::CompletedOnly)
            .await
            .expect("clear");

        let items = session.load_items(Some(&r)).await.expect("load");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].record.name, "Bröd");
    }

    #[tokio::test]
    async fn test_clear_all_leaves_collection_absent() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let (session, r) = open_with_list(&store).await;

        session
            .add_item(Some(&r), ItemRecord::new("Mjölk"))
            .await
            .expect("add");
        session
            .clear_items(Some(&r), ClearMode::All)
            .await
            .expect("clear");

        assert!(session.load_items(Some(&r)).await.expect("load").is_empty());
    }

    #[tokio::test]
    async fn test_operations_without_selection_are_skipped() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let (session, _) = open_with_list(&store).await;

        assert_eq!(
            session
                .add_item(None, ItemRecord::new("Mjölk"))
                .await
                .expect("add"),
            None
        );
        session
            .clear_items(None, ClearMode::All)
            .await
            .expect("clear is a no-op");
        assert!(session.watch_items(None).is_none());
    }

    #[tokio::test]
    async fn test_watch_items_tracks_changes() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let (session, r) = open_with_list(&store).await;

        let watcher = session.watch_items(Some(&r)).expect("watch");
        assert!(watcher.items().borrow().is_empty());

        session
            .add_item(Some(&r), ItemRecord::new("Mjölk"))
            .await
            .expect("add");
        assert_eq!(watcher.items().borrow().len(), 1);
    }
}
