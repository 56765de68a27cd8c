//! In-memory reference implementation of the [`Store`] contract.
//!
//! A single JSON tree behind a mutex.  Listener dispatch is synchronous:
//! every mutation re-reads the value at each affected subscription path and
//! invokes the callback before the mutating call returns.  Semantics mirror
//! the cloud collaborator: last write wins per path, no cross-path
//! transactions, removed subtrees read back as absent.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value as Json};
use tracing::debug;
use uuid::Uuid;

use handla_shared::types::looks_like_user_id;

use crate::error::{Result, StoreError};
use crate::store::{ChangeCallback, Store, Subscription, Value};

/// Tiebreaker space for push keys generated within the same millisecond.
const SEQ_SPACE: u64 = 36u64.pow(4);

struct Listener {
    path: String,
    callback: Arc<dyn Fn(Option<Value>) + Send + Sync>,
}

#[derive(Default)]
struct State {
    tree: Map<String, Json>,
    listeners: HashMap<u64, Listener>,
}

struct Inner {
    state: Mutex<State>,
    next_listener_id: AtomicU64,
    push_seq: AtomicU64,
}

/// In-process store backed by a JSON tree.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::default()),
                next_listener_id: AtomicU64::new(1),
                push_seq: AtomicU64::new(0),
            }),
        }
    }

    /// A mutex poisoned by a panicking callback still holds a usable tree.
    fn state(&self) -> MutexGuard<'_, State> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `mutate` to the tree, then deliver the post-mutation value at
    /// every subscription path affected by a change at `path`.  Callbacks
    /// run after the lock is released so they may use the store again.
    fn mutate_and_notify<F>(&self, path: &str, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut Map<String, Json>, &[&str]),
    {
        let segs = segments(path);
        if segs.is_empty() {
            return Err(StoreError::InvalidPath(path.to_string()));
        }

        let deliveries = {
            let mut state = self.state();
            mutate(&mut state.tree, &segs);
            state
                .listeners
                .values()
                .filter(|l| paths_overlap(&l.path, path))
                .map(|l| (l.callback.clone(), value_at(&state.tree, &l.path).cloned()))
                .collect::<Vec<_>>()
        };

        for (callback, value) in deliveries {
            callback(value);
        }
        Ok(())
    }

    /// Generate a push key: `-` + base36 millis + base36 sequence + random
    /// tail.  Keys sort in generation order, and the leading `-` guarantees
    /// they can never satisfy the user-id shape heuristic that composite
    /// references are decomposed with.
    fn generate_push_key(&self) -> String {
        let millis = Utc::now().timestamp_millis().max(0) as u64;
        let seq = self.inner.push_seq.fetch_add(1, Ordering::Relaxed);
        let tail = Uuid::new_v4().simple().to_string();
        let key = format!(
            "-{}{}{}",
            base36(millis, 9),
            base36(seq % SEQ_SPACE, 4),
            &tail[..6]
        );
        debug_assert!(!looks_like_user_id(&key));
        key
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn read(&self, path: &str) -> Result<Option<Value>> {
        let segs = segments(path);
        if segs.is_empty() {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        Ok(value_at(&self.state().tree, path).cloned())
    }

    async fn write(&self, path: &str, value: Value) -> Result<()> {
        self.mutate_and_notify(path, |tree, segs| {
            if value.is_null() {
                remove_at(tree, segs);
            } else {
                set_at(tree, segs, value);
            }
        })
    }

    async fn patch(&self, path: &str, partial: Value) -> Result<()> {
        let Json::Object(fields) = partial else {
            return Err(StoreError::InvalidPath(format!(
                "patch at {path} requires an object value"
            )));
        };
        self.mutate_and_notify(path, |tree, segs| {
            let target = object_at(tree, segs);
            for (key, value) in fields {
                if value.is_null() {
                    target.remove(&key);
                } else {
                    target.insert(key, value);
                }
            }
        })
    }

    async fn remove(&self, path: &str) -> Result<()> {
        self.mutate_and_notify(path, |tree, segs| remove_at(tree, segs))
    }

    async fn push_child(&self, collection_path: &str, value: Value) -> Result<String> {
        if segments(collection_path).is_empty() {
            return Err(StoreError::InvalidPath(collection_path.to_string()));
        }
        let key = self.generate_push_key();
        let path = format!("{}/{key}", collection_path.trim_end_matches('/'));
        self.write(&path, value).await?;
        Ok(key)
    }

    fn subscribe(&self, path: &str, on_change: ChangeCallback) -> Subscription {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
        let callback: Arc<dyn Fn(Option<Value>) + Send + Sync> = Arc::from(on_change);
        debug!(%path, listener = id, "Listener registered");

        let initial = {
            let mut state = self.state();
            let value = value_at(&state.tree, path).cloned();
            state.listeners.insert(
                id,
                Listener {
                    path: path.to_string(),
                    callback: callback.clone(),
                },
            );
            value
        };
        callback(initial);

        let inner = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner
                    .state
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .listeners
                    .remove(&id);
                debug!(listener = id, "Listener removed");
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Tree helpers
// ---------------------------------------------------------------------------

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Two paths affect each other iff one is an ancestor of the other (or they
/// are equal).
fn paths_overlap(a: &str, b: &str) -> bool {
    segments(a)
        .iter()
        .zip(segments(b).iter())
        .all(|(x, y)| x == y)
}

fn value_at<'a>(root: &'a Map<String, Json>, path: &str) -> Option<&'a Json> {
    let mut segs = segments(path).into_iter();
    let first = segs.next()?;
    let mut current = root.get(first)?;
    for seg in segs {
        current = current.as_object()?.get(seg)?;
    }
    Some(current)
}

fn set_at(root: &mut Map<String, Json>, segs: &[&str], value: Json) {
    let Some((first, rest)) = segs.split_first() else {
        return;
    };
    if rest.is_empty() {
        root.insert((*first).to_string(), value);
        return;
    }
    let child = root
        .entry((*first).to_string())
        .or_insert_with(|| Json::Object(Map::new()));
    if !child.is_object() {
        *child = Json::Object(Map::new());
    }
    if let Json::Object(map) = child {
        set_at(map, rest, value);
    }
}

/// Remove the subtree at `segs`, pruning object nodes left empty so an
/// emptied collection reads back as absent.
fn remove_at(root: &mut Map<String, Json>, segs: &[&str]) {
    let Some((first, rest)) = segs.split_first() else {
        return;
    };
    if rest.is_empty() {
        root.remove(*first);
        return;
    }
    if let Some(Json::Object(child)) = root.get_mut(*first) {
        remove_at(child, rest);
        if child.is_empty() {
            root.remove(*first);
        }
    }
}

/// Navigate to (creating as needed) the object node at `segs`.
fn object_at<'a>(root: &'a mut Map<String, Json>, segs: &[&str]) -> &'a mut Map<String, Json> {
    let Some((first, rest)) = segs.split_first() else {
        return root;
    };
    let child = root
        .entry((*first).to_string())
        .or_insert_with(|| Json::Object(Map::new()));
    if !child.is_object() {
        *child = Json::Object(Map::new());
    }
    if let Json::Object(map) = child {
        object_at(map, rest)
    } else {
        // `child` was replaced with an object two lines up
        unreachable!()
    }
}

fn base36(mut n: u64, width: usize) -> String {
    const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut out = Vec::new();
    while n > 0 {
        out.push(ALPHABET[(n % 36) as usize]);
        n /= 36;
    }
    while out.len() < width {
        out.push(b'0');
    }
    out.reverse();
    out.into_iter().map(char::from).collect()
}
