//! Invite issuing and redemption.
//!
//! Issuing is pure encoding plus a best-effort owner-name lookup for the
//! link.  Redemption is the short read-then-write sequence that grants
//! membership: it validates the code against live store state, checks prior
//! membership, then writes the membership record and the joiner's
//! denormalized index entry.

use tracing::{info, warn};

use handla_shared::constants::UNKNOWN_USER_NAME;
use handla_shared::invite::{build_invite_link, Invite, InviteCode};
use handla_shared::paths::{list_path, member_path, members_path, shared_list_entry_path};
use handla_shared::types::ListRef;
use handla_store::{ListRecord, MemberRecord, SharedListEntry, StoreError, Value};

use crate::error::{ClientError, Result};
use crate::members::fetch_profile;
use crate::session::Session;

/// Terminal result of redeeming an invite code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedeemOutcome {
    /// The user was added to the list's member set.
    Joined,
    /// The user already had access; nothing was written.
    AlreadyMember,
}

impl Session {
    /// Issue a shareable invite for a list.
    ///
    /// The code always names the list's actual owner, also when a member
    /// re-shares a list somebody else owns.
    pub async fn issue_invite(&self, r: &ListRef, list_name: &str) -> Result<Invite> {
        let owner = r.owner_or(self.uid()).clone();
        let owner_name = if &owner == self.uid() {
            self.user.visible_name().map(str::to_string)
        } else {
            fetch_profile(&self.store, &owner)
                .await
                .and_then(|profile| profile.display_name)
        }
        .unwrap_or_else(|| UNKNOWN_USER_NAME.to_string());

        let code = InviteCode::issue(owner, r.list_id().clone());
        let link = build_invite_link(&self.config.invite_host, &owner_name, list_name, &code);

        info!(list = %r, "Invite issued");
        Ok(Invite {
            code: code.encode(),
            link,
        })
    }

    /// Redeem an invite code for the current user.
    ///
    /// Terminal outcomes: [`RedeemOutcome::Joined`],
    /// [`RedeemOutcome::AlreadyMember`], or an error for a malformed code
    /// or a list that no longer exists.  Redemption is idempotent: a second
    /// attempt writes nothing and reports `AlreadyMember`.
    pub async fn redeem_invite(&self, code: &str) -> Result<RedeemOutcome> {
        let invite = InviteCode::decode(code)?;

        let list_node = self
            .store
            .read(&list_path(&invite.owner, &invite.list))
            .await?;
        let Some(node) = list_node else {
            warn!(owner = %invite.owner, list = %invite.list, "Invite points at a deleted list");
            return Err(ClientError::ListNotFound);
        };
        let record: ListRecord = serde_json::from_value(node).map_err(StoreError::from)?;

        // The owner is a member by construction and never gets a record.
        if invite.owner == self.user.uid {
            info!(list = %invite.list, "Owner redeemed their own invite");
            return Ok(RedeemOutcome::AlreadyMember);
        }

        let members = self
            .store
            .read(&members_path(&invite.owner, &invite.list))
            .await?;
        let already_member = members
            .as_ref()
            .and_then(Value::as_object)
            .map(|m| m.contains_key(self.user.uid.as_str()))
            .unwrap_or(false);
        if already_member {
            info!(owner = %invite.owner, list = %invite.list, "Already a member");
            return Ok(RedeemOutcome::AlreadyMember);
        }

        // Two writes with no cross-path transaction.  A failure in between
        // leaves a membership without an index entry; the synchronizer
        // rebuilds display data from the authoritative list, so the index
        // self-heals the next time it is read.
        let member = serde_json::to_value(MemberRecord::now()).map_err(StoreError::from)?;
        self.store
            .write(
                &member_path(&invite.owner, &invite.list, &self.user.uid),
                member,
            )
            .await?;

        let owner_name = fetch_profile(&self.store, &invite.owner)
            .await
            .and_then(|profile| profile.display_name)
            .unwrap_or_else(|| UNKNOWN_USER_NAME.to_string());
        let key = ListRef::Shared {
            owner: invite.owner.clone(),
            list: invite.list.clone(),
        }
        .storage_key();
        let entry = SharedListEntry {
            original_id: invite.list.clone(),
            owner_id: invite.owner.clone(),
            owner_name,
            name: record.name,
            created_at: record.created_at,
            is_shared: true,
            is_owner: false,
        };
        self.store
            .write(
                &shared_list_entry_path(&self.user.uid, &key),
                serde_json::to_value(&entry).map_err(StoreError::from)?,
            )
            .await?;

        info!(owner = %invite.owner, list = %invite.list, "Joined list via invite");
        Ok(RedeemOutcome::Joined)
    }
}
