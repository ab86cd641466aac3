pub mod convert;
pub mod types;

pub use convert::{derive_key, event_type_to_filler, filler_to_event_type, to_index, to_partial_index};
pub use types::{CloudEvent, CloudEventHeader};
