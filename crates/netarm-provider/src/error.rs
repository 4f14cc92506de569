use netarm_client::ArmError;
use netarm_domain::IdError;
use netarm_schema::SchemaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Id(#[from] IdError),

    /// Create found a resource that is not tracked yet.
    #[error(
        "a resource with the ID {id:?} already exists - to be managed it needs to be imported into the state; \
         see `netarm import` for `{type_name}`"
    )]
    AlreadyExists { type_name: String, id: String },

    /// Only raised by data sources and imports; a managed Read clears the ID instead.
    #[error("{0}")]
    NotFound(String),

    #[error("{context}: {source}")]
    Api {
        context: String,
        #[source]
        source: ArmError,
    },

    #[error("{0}")]
    Validation(String),

    #[error("{operation} of {type_name} timed out after {seconds}s")]
    Timeout { type_name: String, operation: &'static str, seconds: u64 },

    #[error("unknown resource type {0:?}")]
    UnknownType(String),
}

impl ProviderError {
    /// Wrap a client error with the resource name and group it concerns.
    pub fn api(context: impl Into<String>) -> impl FnOnce(ArmError) -> ProviderError {
        let context = context.into();
        move |source| ProviderError::Api { context, source }
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, ProviderError::AlreadyExists { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ProviderError::Schema(_) | ProviderError::Id(_) | ProviderError::Validation(_))
    }
}
