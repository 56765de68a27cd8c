//! # handla-shared
//!
//! Value types shared by every Handla crate: user and list identifiers,
//! list references, invite codes and links, and storage path derivation.
//! Everything here is pure: no I/O, no store access.

pub mod constants;
pub mod invite;
pub mod paths;
pub mod types;
