//! Layout of the `cloud_event` table.
//!
//! The table is created and evolved outside this crate; these constants only
//! describe what the repository reads and writes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cloud_event::CloudEventHeader;
use crate::index::{decode_address, encode_address, NftDid};

use super::error::DbError;
use super::types::{DbValue, InsertStatement};

pub const TABLE_NAME: &str = "cloud_event";

pub const SUBJECT_COLUMN: &str = "subject";
pub const TIMESTAMP_COLUMN: &str = "event_time";
pub const TYPE_COLUMN: &str = "event_type";
pub const ID_COLUMN: &str = "id";
pub const SOURCE_COLUMN: &str = "source";
pub const PRODUCER_COLUMN: &str = "producer";
pub const DATA_CONTENT_TYPE_COLUMN: &str = "data_content_type";
pub const DATA_VERSION_COLUMN: &str = "data_version";
pub const EXTRAS_COLUMN: &str = "extras";
pub const INDEX_KEY_COLUMN: &str = "index_key";

/// Columns in table order.
pub const COLUMNS: [&str; 10] = [
    SUBJECT_COLUMN,
    TIMESTAMP_COLUMN,
    TYPE_COLUMN,
    ID_COLUMN,
    SOURCE_COLUMN,
    PRODUCER_COLUMN,
    DATA_CONTENT_TYPE_COLUMN,
    DATA_VERSION_COLUMN,
    EXTRAS_COLUMN,
    INDEX_KEY_COLUMN,
];

/// How subject, producer and source are stored in the table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierFormat {
    /// `did:nft:...` strings and `0x` checksummed addresses.
    #[default]
    Did,
    /// Index slugs: 64 hex DIDs and unprefixed 40 hex addresses.
    Slug,
}

impl IdentifierFormat {
    pub fn render_did(&self, did: &NftDid) -> String {
        match self {
            IdentifierFormat::Did => did.to_string(),
            IdentifierFormat::Slug => did.encode(),
        }
    }

    pub fn render_address(&self, address: &alloy_primitives::Address) -> String {
        match self {
            IdentifierFormat::Did => address.to_checksum(None),
            IdentifierFormat::Slug => encode_address(address),
        }
    }

    /// Canonical column value of a header DID field, or the raw string when
    /// it does not parse.
    pub fn did_column(&self, raw: &str) -> String {
        match raw.parse::<NftDid>() {
            Ok(did) => self.render_did(&did),
            Err(_) => raw.to_string(),
        }
    }

    /// Canonical column value of a header address field, or the raw string
    /// when it does not parse.
    pub fn address_column(&self, raw: &str) -> String {
        match decode_address(raw) {
            Ok(address) => self.render_address(&address),
            Err(_) => raw.to_string(),
        }
    }
}

/// A row of the `cloud_event` table: the event header plus the key of the
/// object holding its data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudEventMetadata {
    #[serde(flatten)]
    pub header: CloudEventHeader,
    pub index_key: String,
}

impl CloudEventMetadata {
    pub fn new(header: CloudEventHeader, index_key: impl Into<String>) -> Self {
        Self {
            header,
            index_key: index_key.into(),
        }
    }

    /// Rebuild a row from its column values.
    pub fn from_columns(columns: &HashMap<String, DbValue>) -> Result<Self, DbError> {
        let text = |column: &str| -> Result<String, DbError> {
            match columns.get(column) {
                Some(DbValue::Text(value)) => Ok(value.clone()),
                other => Err(DbError::RowDecode(format!(
                    "column {} is not text: {:?}",
                    column, other
                ))),
            }
        };
        let time = match columns.get(TIMESTAMP_COLUMN) {
            Some(DbValue::DateTime(value)) => *value,
            other => {
                return Err(DbError::RowDecode(format!(
                    "column {} is not a timestamp: {:?}",
                    TIMESTAMP_COLUMN, other
                )))
            }
        };

        Ok(Self {
            header: CloudEventHeader {
                id: text(ID_COLUMN)?,
                source: text(SOURCE_COLUMN)?,
                producer: text(PRODUCER_COLUMN)?,
                subject: text(SUBJECT_COLUMN)?,
                time,
                event_type: text(TYPE_COLUMN)?,
                data_content_type: text(DATA_CONTENT_TYPE_COLUMN)?,
                data_version: text(DATA_VERSION_COLUMN)?,
                extras: decode_extras(&text(EXTRAS_COLUMN)?)?,
                ..Default::default()
            },
            index_key: text(INDEX_KEY_COLUMN)?,
        })
    }
}

/// Build the INSERT of a header and its index key. DID and address fields are
/// canonicalized to `format` when they parse.
pub fn insert_statement(
    header: &CloudEventHeader,
    index_key: &str,
    format: IdentifierFormat,
) -> InsertStatement {
    let values = vec![
        DbValue::Text(format.did_column(&header.subject)),
        DbValue::DateTime(header.time),
        DbValue::from(header.event_type.as_str()),
        DbValue::from(header.id.as_str()),
        DbValue::Text(format.address_column(&header.source)),
        DbValue::Text(format.did_column(&header.producer)),
        DbValue::from(header.data_content_type.as_str()),
        DbValue::from(header.data_version.as_str()),
        DbValue::Text(encode_extras(&header.extras)),
        DbValue::from(index_key),
    ];

    InsertStatement {
        table: TABLE_NAME.to_string(),
        columns: COLUMNS.iter().map(|c| c.to_string()).collect(),
        values,
    }
}

pub fn encode_extras(extras: &Map<String, Value>) -> String {
    Value::Object(extras.clone()).to_string()
}

pub fn decode_extras(extras: &str) -> Result<Map<String, Value>, DbError> {
    if extras.is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(extras) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(Map::new()),
        Ok(other) => Err(DbError::RowDecode(format!("extras is not an object: {}", other))),
        Err(e) => Err(DbError::RowDecode(format!("extras is not JSON: {}", e))),
    }
}
