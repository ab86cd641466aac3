use alloy_primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::did::{encode_address, NftDid};

/// Subject or producer of an index.
///
/// Strict conversion always yields [`Subject::Did`]. Best-effort conversion
/// keeps the header's unparsed string in [`Subject::Raw`] and renders it into
/// the key verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Subject {
    Did(NftDid),
    Raw(String),
}

impl Subject {
    pub fn encode(&self) -> String {
        match self {
            Subject::Did(did) => did.encode(),
            Subject::Raw(raw) => raw.clone(),
        }
    }

    pub fn as_did(&self) -> Option<&NftDid> {
        match self {
            Subject::Did(did) => Some(did),
            Subject::Raw(_) => None,
        }
    }
}

impl From<NftDid> for Subject {
    fn from(did: NftDid) -> Self {
        Subject::Did(did)
    }
}

/// Party responsible for the data behind an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Source {
    Address(Address),
    Raw(String),
}

impl Source {
    pub fn encode(&self) -> String {
        match self {
            Source::Address(address) => encode_address(address),
            Source::Raw(raw) => raw.clone(),
        }
    }

    pub fn as_address(&self) -> Option<&Address> {
        match self {
            Source::Address(address) => Some(address),
            Source::Raw(_) => None,
        }
    }
}

impl From<Address> for Source {
    fn from(address: Address) -> Self {
        Source::Address(address)
    }
}

/// Structured form of an index key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Index {
    /// What the data is about.
    pub subject: Subject,
    /// Event time. Encoded in UTC with second precision.
    pub timestamp: DateTime<Utc>,
    /// Event type marker between the time and the source. Defaults to "MM".
    #[serde(default)]
    pub primary_filler: String,
    pub source: Source,
    /// Schema/version of the payload, left-padded with `!` or truncated to 20 bytes.
    #[serde(default)]
    pub data_version: String,
    /// Reserved slot between the data version and the producer. Defaults to "00".
    #[serde(default)]
    pub secondary_filler: String,
    /// Specific device or process that created the data.
    pub producer: Subject,
    /// Free-form tail appended after the fixed-width fields.
    #[serde(default)]
    pub optional: String,
}
