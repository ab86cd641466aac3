//! Mapping from cloud event headers to index records.

use chrono::{SecondsFormat, Utc};

use crate::index::{
    decode_address, encode_index, validate_timestamp, Index, IndexError, NftDid, Source, Subject,
};

use super::types::{
    CloudEventHeader, TYPE_FINGERPRINT, TYPE_STATUS, TYPE_UNKNOWN, TYPE_VERIFIABLE_CREDENTIAL,
};

pub const FILLER_STATUS: &str = "MA";
pub const FILLER_FINGERPRINT: &str = "ME";
pub const FILLER_VERIFIABLE_CREDENTIAL: &str = "MV";
pub const FILLER_UNKNOWN: &str = "MU";

/// Map an event type to its primary filler. Only the first of a comma
/// separated list of types is considered.
pub fn event_type_to_filler(event_types: &str) -> &'static str {
    let first = event_types.split(',').next().unwrap_or_default().trim();
    match first {
        TYPE_STATUS => FILLER_STATUS,
        TYPE_FINGERPRINT => FILLER_FINGERPRINT,
        TYPE_VERIFIABLE_CREDENTIAL => FILLER_VERIFIABLE_CREDENTIAL,
        _ => FILLER_UNKNOWN,
    }
}

/// Inverse of [`event_type_to_filler`].
pub fn filler_to_event_type(filler: &str) -> &'static str {
    match filler {
        FILLER_STATUS => TYPE_STATUS,
        FILLER_FINGERPRINT => TYPE_FINGERPRINT,
        FILLER_VERIFIABLE_CREDENTIAL => TYPE_VERIFIABLE_CREDENTIAL,
        _ => TYPE_UNKNOWN,
    }
}

/// Convert a header into an index, failing on the first malformed field.
pub fn to_index(header: &CloudEventHeader) -> Result<Index, IndexError> {
    let subject = header
        .subject
        .parse::<NftDid>()
        .map_err(|e| IndexError::InvalidSubject(Box::new(e)))?;
    let producer = header
        .producer
        .parse::<NftDid>()
        .map_err(|e| IndexError::InvalidProducer(Box::new(e)))?;
    let source =
        decode_address(&header.source).map_err(|e| IndexError::InvalidSource(Box::new(e)))?;
    validate_timestamp(&header.time).map_err(IndexError::InvalidTimestamp)?;

    Ok(Index {
        subject: Subject::Did(subject),
        timestamp: header.time,
        primary_filler: event_type_to_filler(&header.event_type).to_string(),
        source: Source::Address(source),
        data_version: header.data_version.clone(),
        secondary_filler: String::new(),
        producer: Subject::Did(producer),
        optional: String::new(),
    })
}

/// Convert a header into an index without failing.
///
/// An unrepresentable timestamp is replaced by the current time, and a
/// subject, producer or source that does not parse is kept as its raw string.
pub fn to_partial_index(header: &CloudEventHeader) -> Index {
    let timestamp = match validate_timestamp(&header.time) {
        Ok(()) => header.time,
        Err(reason) => {
            tracing::debug!("Event {} timestamp replaced with now: {}", header.id, reason);
            Utc::now()
        }
    };

    let subject = match header.subject.parse::<NftDid>() {
        Ok(did) => Subject::Did(did),
        Err(_) => Subject::Raw(header.subject.clone()),
    };
    let producer = match header.producer.parse::<NftDid>() {
        Ok(did) => Subject::Did(did),
        Err(_) => Subject::Raw(header.producer.clone()),
    };
    let source = match decode_address(&header.source) {
        Ok(address) => Source::Address(address),
        Err(_) => Source::Raw(header.source.clone()),
    };

    Index {
        subject,
        timestamp,
        primary_filler: event_type_to_filler(&header.event_type).to_string(),
        source,
        data_version: header.data_version.clone(),
        secondary_filler: String::new(),
        producer,
        optional: String::new(),
    }
}

/// Derive the index key of a header. Never fails: if the best-effort index
/// cannot be encoded, a key is assembled from the id, source, time and subject.
pub fn derive_key(header: &CloudEventHeader) -> String {
    match encode_index(&to_partial_index(header)) {
        Ok(key) => key,
        Err(e) => {
            tracing::warn!("Falling back to synthetic key for event {}: {}", header.id, e);
            format!(
                "{}_{}_{}_{}",
                header.id,
                header.source,
                header.time.to_rfc3339_opts(SecondsFormat::Secs, true),
                header.subject
            )
        }
    }
}
