use crate::diagnostics::Diagnostics;
use crate::typed::TypedId;

/// Check that `value` is a well-formed ID of type `T`.
///
/// Used at configuration time so malformed references are rejected before
/// any request is sent. The parsed value is discarded.
pub fn validate_id<T: TypedId>(value: &str, key: &str) -> Diagnostics {
    match T::parse(value) {
        Ok(_) => Diagnostics::ok(),
        Err(e) => Diagnostics::error(format!("parsing {:?} as a {} ID: {}", key, T::DESCRIPTION, e)),
    }
}
