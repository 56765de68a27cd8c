use thiserror::Error;

use handla_shared::invite::InviteError;
use handla_store::StoreError;

/// Errors surfaced by session operations.
///
/// Every public operation catches store failures at its own boundary and
/// reports them here; nothing propagates uncaught, nothing is retried
/// automatically, and nothing aborts the session.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Malformed invite code.  Terminal, user-facing.
    #[error("Invalid invite: {0}")]
    InvalidInvite(#[from] InviteError),

    /// The target list no longer exists.
    #[error("List no longer exists")]
    ListNotFound,

    /// An owner-only operation was attempted by a non-owner.
    #[error("Only the list owner may {0}")]
    PermissionDenied(&'static str),

    /// Creating or renaming a list requires a non-empty name.
    #[error("List name must not be empty")]
    EmptyName,

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the selection cache directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Store read/write failure.  Logged at the call site, never retried.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClientError>;
