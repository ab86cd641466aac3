//! Index codec error types.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    #[error("invalid index: {0}")]
    InvalidIndex(String),

    #[error("invalid index format: {0}")]
    InvalidFormat(String),

    #[error("index length {len} is less than {min}")]
    TooShort { len: usize, min: usize },

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid {field}: {value:?} is not a valid hex number")]
    InvalidNumeric { field: &'static str, value: String },

    #[error("subject is not a valid NFT DID: {0}")]
    InvalidSubject(#[source] Box<IndexError>),

    #[error("producer is not a valid NFT DID: {0}")]
    InvalidProducer(#[source] Box<IndexError>),

    #[error("source is not a valid address: {0}")]
    InvalidSource(#[source] Box<IndexError>),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

impl IndexError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidIndex(reason.into())
    }

    pub(crate) fn format(reason: impl Into<String>) -> Self {
        Self::InvalidFormat(reason.into())
    }
}
