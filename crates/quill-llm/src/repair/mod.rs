//! Turning near-JSON model output into decodable JSON

mod extract;
mod sanitize;

pub use extract::{balanced_objects, extract, object_span, remove_trailing_commas};
pub use sanitize::sanitize;
