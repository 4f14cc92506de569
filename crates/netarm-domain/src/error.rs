use thiserror::Error;

/// Every way a resource identifier can fail to parse. All variants describe a
/// malformed ID; no partially parsed value is ever returned alongside them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("malformed resource id {id:?}: {reason}")]
    Malformed { id: String, reason: String },

    #[error("resource id {id:?} is missing the {segment:?} segment")]
    MissingSegment { id: String, segment: String },

    #[error("resource id {id:?} has an empty value for the {segment:?} segment")]
    EmptySegment { id: String, segment: String },

    #[error("resource id {id:?} has segment {found:?} where {expected:?} was expected")]
    UnexpectedSegment {
        id: String,
        found: String,
        expected: String,
    },
}

impl IdError {
    pub(crate) fn malformed(id: &str, reason: impl Into<String>) -> Self {
        IdError::Malformed { id: id.to_string(), reason: reason.into() }
    }
}
