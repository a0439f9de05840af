mod body;
mod clock;
mod error;
mod traits;
mod types;

pub use body::{
    is_reserved_attribute, parse_body, DEFAULT_TOMBSTONE_RETENTION, DELETED, PARTITION_KEY,
    RESERVED_ATTRIBUTES, SORT_KEY, VERSION,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{BackendError, DocumentError, Result};
pub use traits::DocumentStore;
pub use types::{Document, DocumentKey};
