//! # handla-client
//!
//! Per-session engine for the Handla shopping-list app: list lifecycle,
//! membership, invite issue/redeem, and the shared-list index
//! synchronizer, all running against an injected [`handla_store::Store`]
//! handle and the signed-in [`handla_shared::types::CurrentUser`].
//!
//! The engine exposes reactive view models (`tokio::sync::watch` channels
//! for own lists, shared lists, the active selection and member sets) plus
//! imperative operations that resolve once their store writes have been
//! issued, not necessarily once remote subscribers have observed them.

use tracing_subscriber::{fmt, EnvFilter};

pub mod config;
pub mod invites;
pub mod items;
pub mod lists;
pub mod members;
pub mod selection;
pub mod session;
pub mod sync;

mod error;

pub use config::ClientConfig;
pub use error::ClientError;
pub use invites::RedeemOutcome;
pub use items::{ClearMode, ItemView, ItemsWatch};
pub use members::{Member, MembersWatch};
pub use selection::{FileSelectionCache, MemorySelectionCache, SelectionCache};
pub use session::{ListSummary, Session};
pub use sync::{SharedListSync, SharedListView};

/// Initialise tracing for binaries embedding the engine.
///
/// Respects `RUST_LOG`; defaults to debug for the engine crates and warn
/// for everything else.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("handla_client=debug,handla_store=info,warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
