use alloy_primitives::Address;
use chrono::{DateTime, Utc};

use crate::db::schema::{
    DATA_VERSION_COLUMN, EXTRAS_COLUMN, INDEX_KEY_COLUMN, PRODUCER_COLUMN, SOURCE_COLUMN,
    SUBJECT_COLUMN, TIMESTAMP_COLUMN, TYPE_COLUMN,
};
use crate::db::{DbValue, IdentifierFormat, Predicate};
use crate::index::NftDid;

/// Criteria for latest and list queries. Every field left unset matches
/// everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOptions {
    /// Only events strictly after this time.
    pub after: Option<DateTime<Utc>>,
    /// Only events strictly before this time.
    pub before: Option<DateTime<Utc>>,
    /// Return listings oldest first. Ignored by latest lookups.
    pub timestamp_asc: bool,
    pub event_type: Option<String>,
    pub data_version: Option<String>,
    pub subject: Option<NftDid>,
    /// Party responsible for creating the data.
    pub source: Option<Address>,
    /// Specific entity that created the data.
    pub producer: Option<NftDid>,
    /// Exact match on the JSON-encoded extension attributes.
    pub extras: Option<String>,
    pub index_key: Option<String>,
}

impl SearchOptions {
    pub fn with_subject(mut self, subject: NftDid) -> Self {
        self.subject = Some(subject);
        self
    }

    pub fn with_producer(mut self, producer: NftDid) -> Self {
        self.producer = Some(producer);
        self
    }

    pub fn with_source(mut self, source: Address) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn with_data_version(mut self, data_version: impl Into<String>) -> Self {
        self.data_version = Some(data_version.into());
        self
    }

    pub fn after(mut self, after: DateTime<Utc>) -> Self {
        self.after = Some(after);
        self
    }

    pub fn before(mut self, before: DateTime<Utc>) -> Self {
        self.before = Some(before);
        self
    }

    pub fn ascending(mut self) -> Self {
        self.timestamp_asc = true;
        self
    }

    /// One predicate per set field. Identifiers are rendered the way `format`
    /// says the table stores them.
    pub fn predicates(&self, format: IdentifierFormat) -> Vec<Predicate> {
        let mut predicates = Vec::new();

        if let Some(after) = self.after {
            predicates.push(Predicate::Gt(TIMESTAMP_COLUMN.to_string(), DbValue::DateTime(after)));
        }
        if let Some(before) = self.before {
            predicates.push(Predicate::Lt(TIMESTAMP_COLUMN.to_string(), DbValue::DateTime(before)));
        }
        if let Some(event_type) = &self.event_type {
            predicates.push(eq(TYPE_COLUMN, event_type.clone()));
        }
        if let Some(data_version) = &self.data_version {
            predicates.push(eq(DATA_VERSION_COLUMN, data_version.clone()));
        }
        if let Some(subject) = &self.subject {
            predicates.push(eq(SUBJECT_COLUMN, format.render_did(subject)));
        }
        if let Some(source) = &self.source {
            predicates.push(eq(SOURCE_COLUMN, format.render_address(source)));
        }
        if let Some(producer) = &self.producer {
            predicates.push(eq(PRODUCER_COLUMN, format.render_did(producer)));
        }
        if let Some(extras) = &self.extras {
            predicates.push(eq(EXTRAS_COLUMN, extras.clone()));
        }
        if let Some(index_key) = &self.index_key {
            predicates.push(eq(INDEX_KEY_COLUMN, index_key.clone()));
        }

        predicates
    }
}

fn eq(column: &str, value: String) -> Predicate {
    Predicate::Eq(column.to_string(), DbValue::Text(value))
}
