//! Identifiers carried by clients.
//!
//! A [`SessionToken`] is the opaque key a transport round-trips for a
//! client (as a header or cookie). A [`PageId`] tells apart the views
//! (browser tabs, windows) attached to one session.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque session key, minted as a random UUID v4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(Uuid);

impl SessionToken {
    /// Mint a fresh random token.
    pub fn mint() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a token presented by a client.
    ///
    /// Anything that is not a UUID yields `None`, which callers treat the
    /// same as an absent token.
    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw.trim()).ok().map(Self)
    }
}

impl core::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-session view identifier, handed out in increasing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(pub u64);

impl core::fmt::Display for PageId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}
