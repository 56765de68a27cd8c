//! # handla-store
//!
//! The path-addressed reactive key-value tree the Handla engine runs
//! against.  The cloud database itself is an external collaborator; this
//! crate defines the [`Store`] contract it is consumed through, the typed
//! records kept in the tree, and an in-memory reference implementation used
//! by tests and local development.

pub mod memory;
pub mod models;
pub mod store;

mod error;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use models::{ItemRecord, ListRecord, MemberRecord, SharedListEntry, UserProfile};
pub use store::{ChangeCallback, Store, Subscription, Value};
