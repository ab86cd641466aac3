use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const TYPE_STATUS: &str = "dimo.status";
pub const TYPE_FINGERPRINT: &str = "dimo.fingerprint";
pub const TYPE_VERIFIABLE_CREDENTIAL: &str = "dimo.verifiablecredential";
pub const TYPE_UNKNOWN: &str = "dimo.unknown";

/// Attributes of a cloud event, without its data.
///
/// A missing `time` deserializes to the Unix epoch, which is outside the
/// range an index can represent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CloudEventHeader {
    #[serde(rename = "specversion", default)]
    pub spec_version: String,
    #[serde(default)]
    pub id: String,
    /// Entity responsible for providing the event, usually a hex address.
    #[serde(default)]
    pub source: String,
    /// Instance, process or device that created the event, usually an NFT DID.
    #[serde(default)]
    pub producer: String,
    /// What the event is about, usually an NFT DID.
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub time: DateTime<Utc>,
    /// One or more comma separated event types.
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(rename = "datacontenttype", default, skip_serializing_if = "String::is_empty")]
    pub data_content_type: String,
    #[serde(rename = "dataschema", default, skip_serializing_if = "String::is_empty")]
    pub data_schema: String,
    #[serde(rename = "dataversion", default, skip_serializing_if = "String::is_empty")]
    pub data_version: String,
    /// Extension attributes not covered above.
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudEvent<T> {
    #[serde(flatten)]
    pub header: CloudEventHeader,
    pub data: T,
}

impl<T> CloudEvent<T> {
    pub fn new(header: CloudEventHeader, data: T) -> Self {
        Self { header, data }
    }
}
