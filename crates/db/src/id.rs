use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::{Timestamp, Uuid};

/// Store-assigned document identity.
///
/// Identities are UUIDv7 values so that insertion order and identity order agree.
/// The string form is the hyphenated lowercase hex rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Generate a fresh identity.
    pub fn generate() -> Self {
        Self(Uuid::new_v7(Timestamp::now(uuid::NoContext)))
    }

    /// Parse an identity token.
    pub fn parse(token: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(token).map(Self)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl FromStr for DocumentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
