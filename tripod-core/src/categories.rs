//! Decoding of the `dataCategories` annotation.
//!
//! The annotation value is a JSON array of category objects. Only the shape is
//! checked: the top level must be an array and every element must carry a
//! `name`. Values such as `legalBasis` are passed through unvalidated.

use crate::error::DecodeError;
use crate::types::DataCategory;

/// Decode an annotation value into its list of data categories.
pub fn decode(raw: &str) -> Result<Vec<DataCategory>, DecodeError> {
    serde_json::from_str::<Vec<DataCategory>>(raw).map_err(|source| DecodeError {
        raw: raw.to_string(),
        source,
    })
}
