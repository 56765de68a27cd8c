//! List lifecycle: create, rename, delete, leave.
//!
//! Deletion cascades over the list's item collection and falls back to the
//! next available selection when the active list disappears: next own list,
//! then first shared list, then nothing.

use serde_json::json;
use tracing::info;

use handla_shared::paths::{
    items_path, list_path, lists_path, member_path, shared_list_entry_path,
};
use handla_shared::types::{ListId, ListRef};
use handla_store::{ListRecord, StoreError};

use crate::error::{ClientError, Result};
use crate::session::Session;

impl Session {
    /// Create a list and make it the active selection.
    pub async fn create_list(&self, name: &str) -> Result<ListId> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ClientError::EmptyName);
        }

        let record = serde_json::to_value(ListRecord::new(name)).map_err(StoreError::from)?;
        let key = self
            .store
            .push_child(&lists_path(self.uid()), record)
            .await?;
        let id = ListId::new(key);

        self.select_list(Some(ListRef::Own(id.clone())));
        info!(list = %id, name, "List created");
        Ok(id)
    }

    /// Rename a list.
    ///
    /// Owner-only: renaming somebody else's list fails with
    /// `PermissionDenied` instead of silently doing nothing, so the UI can
    /// tell the user what happened.
    pub async fn rename_list(&self, r: &ListRef, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ClientError::EmptyName);
        }
        if r.owner_or(self.uid()) != self.uid() {
            return Err(ClientError::PermissionDenied("rename a list"));
        }

        let path = list_path(self.uid(), r.list_id());
        if self.store.read(&path).await?.is_none() {
            return Err(ClientError::ListNotFound);
        }
        self.store.patch(&path, json!({ "name": name })).await?;
        info!(list = %r, name, "List renamed");
        Ok(())
    }

    /// Delete an own list and its items.
    ///
    /// Two independent deletes; the store offers no cross-path
    /// transaction, so a failure between them can leave orphaned items.
    pub async fn delete_list(&self, id: &ListId) -> Result<()> {
        self.store.remove(&list_path(self.uid(), id)).await?;

        let own_ref = ListRef::Own(id.clone());
        if let Some(items) = items_path(self.uid(), Some(&own_ref)) {
            self.store.remove(&items).await?;
        }

        info!(list = %id, "List deleted");
        self.reselect_after_removal(&own_ref.storage_key());
        Ok(())
    }

    /// Leave a shared list.
    ///
    /// Leaving a list you own deletes the list itself; leaving somebody
    /// else's removes only your membership record.  Either way the acting
    /// user's own index entry goes.
    pub async fn leave_shared_list(&self, r: &ListRef) -> Result<()> {
        let key = r.storage_key();
        self.store
            .remove(&shared_list_entry_path(self.uid(), &key))
            .await?;

        if r.owner_or(self.uid()) == self.uid() {
            self.delete_list(r.list_id()).await?;
        } else {
            let owner = r.owner_or(self.uid()).clone();
            self.store
                .remove(&member_path(&owner, r.list_id(), self.uid()))
                .await?;
            info!(list = %r, "Left shared list");
        }

        self.reselect_after_removal(&key);
        Ok(())
    }

    /// If the removed list was the active selection, fall back to the next
    /// own list, then the first shared list, then nothing.
    fn reselect_after_removal(&self, removed_key: &str) {
        let selected_key = self
            .selected_tx
            .borrow()
            .as_ref()
            .map(ListRef::storage_key);
        if selected_key.as_deref() != Some(removed_key) {
            return;
        }

        let next = self
            .own_lists_rx
            .borrow()
            .iter()
            .map(|list| ListRef::Own(list.id.clone()))
            .find(|r| r.storage_key() != removed_key)
            .or_else(|| {
                self.shared
                    .view()
                    .borrow()
                    .iter()
                    .find(|view| view.key != removed_key)
                    .map(|view| ListRef::parse(&view.key))
            });

        info!(next = ?next.as_ref().map(ListRef::storage_key), "Reselecting after removal");
        self.select_list(next);
    }
}
