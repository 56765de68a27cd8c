//! Invite codes and shareable links.
//!
//! An invite code is a stateless token `{owner}|{listId}|{issuedAtMs}`.
//! Nothing about it is stored or signed; validity is checked against live
//! store state at redemption time.  The shareable link wraps the code in a
//! human-readable URL whose slugged path segments are never parsed back;
//! only the `code` query parameter is authoritative.

use chrono::{DateTime, TimeZone, Utc};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;

use crate::constants::INVITE_DELIMITER;
use crate::types::{ListId, UserId};

/// Escape set for the list-id component of a code: everything outside the
/// URL-component unreserved characters.
const CODE_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

#[derive(Debug, thiserror::Error)]
pub enum InviteError {
    /// The code does not split into `owner|list|timestamp`.
    #[error("Invalid invite format")]
    InvalidFormat,
}

/// The decoded payload of an invite code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteCode {
    pub owner: UserId,
    pub list: ListId,
    pub issued_at: DateTime<Utc>,
}

impl InviteCode {
    pub fn new(owner: UserId, list: ListId, issued_at: DateTime<Utc>) -> Self {
        Self {
            owner,
            list,
            issued_at,
        }
    }

    /// Create a code issued now.
    pub fn issue(owner: UserId, list: ListId) -> Self {
        Self::new(owner, list, Utc::now())
    }

    /// Encode as `{owner}|{urlEncode(list)}|{issuedAtMs}`.
    pub fn encode(&self) -> String {
        let list = utf8_percent_encode(self.list.as_str(), CODE_COMPONENT);
        let d = INVITE_DELIMITER;
        format!(
            "{owner}{d}{list}{d}{ms}",
            owner = self.owner,
            ms = self.issued_at.timestamp_millis()
        )
    }

    /// Decode a code string.
    ///
    /// Fails unless the code splits into exactly three parts with a
    /// parseable epoch-millisecond timestamp.
    pub fn decode(code: &str) -> Result<Self, InviteError> {
        let mut parts = code.trim().split(INVITE_DELIMITER);
        let (Some(owner), Some(list), Some(ts), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(InviteError::InvalidFormat);
        };

        let list = percent_decode_str(list)
            .decode_utf8()
            .map_err(|_| InviteError::InvalidFormat)?;

        let millis: i64 = ts.parse().map_err(|_| InviteError::InvalidFormat)?;
        let issued_at = Utc
            .timestamp_millis_opt(millis)
            .single()
            .ok_or(InviteError::InvalidFormat)?;

        Ok(Self {
            owner: UserId::new(owner),
            list: ListId::new(list.into_owned()),
            issued_at,
        })
    }
}

/// A shareable invite: the authoritative code plus a human-readable link.
#[derive(Debug, Clone, Serialize)]
pub struct Invite {
    pub code: String,
    pub link: String,
}

/// Build `https://{host}/invite/{slug(owner)}/{slug(list)}/{ms}?code={code}`.
///
/// Already-issued links rely on this exact shape, so it must not change.
pub fn build_invite_link(
    host: &str,
    owner_name: &str,
    list_name: &str,
    code: &InviteCode,
) -> String {
    format!(
        "https://{host}/invite/{}/{}/{}?code={}",
        slug(owner_name),
        slug(list_name),
        code.issued_at.timestamp_millis(),
        code.encode()
    )
}

/// Lower-cased URL slug: keeps ASCII alphanumerics, extended Latin letters,
/// and hyphens; whitespace runs collapse to a single `-`; everything else is
/// stripped.
pub fn slug(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_gap = false;
    for c in input.chars() {
        if c.is_whitespace() {
            if !out.is_empty() {
                pending_gap = true;
            }
            continue;
        }
        if !(c.is_ascii_alphanumeric() || c == '-' || is_extended_latin(c)) {
            continue;
        }
        if pending_gap {
            out.push('-');
            pending_gap = false;
        }
        for lc in c.to_lowercase() {
            out.push(lc);
        }
    }
    out
}

/// Latin-1 Supplement through Latin Extended-B letters (`å`, `ä`, `ö`, `é`,
/// …), excluding the multiplication and division signs embedded in that
/// range.
fn is_extended_latin(c: char) -> bool {
    ('\u{00C0}'..='\u{024F}').contains(&c) && c != '\u{00D7}' && c != '\u{00F7}'
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: &str = "abcdefghijklmnopqrst12";

    fn ts(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).single().expect("valid ts")
    }

    #[test]
    fn test_encode_known_example() {
        let code = InviteCode::new(
            UserId::new(OWNER),
            ListId::new("L1"),
            ts(1_700_000_000_000),
        );
        assert_eq!(code.encode(), "abcdefghijklmnopqrst12|L1|1700000000000");
    }

    #[test]
    fn test_code_round_trip() {
        let code = InviteCode::new(
            UserId::new(OWNER),
            ListId::new("-0abc123"),
            ts(1_700_000_000_000),
        );
        let decoded = InviteCode::decode(&code.encode()).expect("decode should work");
        assert_eq!(decoded, code);
    }

    #[test]
    fn test_list_id_special_chars_survive_encoding() {
        let code = InviteCode::new(
            UserId::new(OWNER),
            ListId::new("week 42/фи|x"),
            ts(1_700_000_000_000),
        );
        let encoded = code.encode();
        // The raw delimiter may only appear as a field separator.
        assert_eq!(encoded.matches(INVITE_DELIMITER).count(), 2);
        let decoded = InviteCode::decode(&encoded).expect("decode should work");
        assert_eq!(decoded.list, ListId::new("week 42/фи|x"));
    }

    #[test]
    fn test_decode_rejects_wrong_part_count() {
        assert!(InviteCode::decode("onlyowner").is_err());
        assert!(InviteCode::decode(&format!("{OWNER}|L1")).is_err());
        assert!(InviteCode::decode(&format!("{OWNER}|L1|123|extra")).is_err());
    }

    #[test]
    fn test_decode_rejects_bad_timestamp() {
        assert!(InviteCode::decode(&format!("{OWNER}|L1|soon")).is_err());
    }

    #[test]
    fn test_slug_rules() {
        assert_eq!(slug("Fredag"), "fredag");
        assert_eq!(slug("Veckans Inköp"), "veckans-inköp");
        assert_eq!(slug("  Maja   Åkesson  "), "maja-åkesson");
        assert_eq!(slug("Fest! (lördag)"), "fest-lördag");
        assert_eq!(slug("semi-sweet"), "semi-sweet");
    }

    #[test]
    fn test_link_format() {
        let code = InviteCode::new(
            UserId::new(OWNER),
            ListId::new("L1"),
            ts(1_700_000_000_000),
        );
        let link = build_invite_link("handla.app", "Maja Åkesson", "Veckans Inköp", &code);
        assert_eq!(
            link,
            "https://handla.app/invite/maja-åkesson/veckans-inköp/1700000000000\
             ?code=abcdefghijklmnopqrst12|L1|1700000000000"
        );
    }
}
