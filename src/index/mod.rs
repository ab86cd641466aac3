pub mod codec;
pub mod did;
pub mod error;
pub mod types;

pub use codec::{
    decode_data_version, decode_index, encode_data_version, encode_index, validate_index,
    validate_timestamp, with_defaults, TOTAL_LENGTH,
};
pub use did::{decode_address, encode_address, NftDid};
pub use error::IndexError;
pub use types::{Index, Source, Subject};
