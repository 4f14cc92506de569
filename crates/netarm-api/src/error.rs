use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use netarm_provider::ProviderError;
use netarm_reconciler::ReconcileError;
use serde_json::json;
use tracing::error;

pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    /// Individual problems behind a validation failure.
    pub details: Vec<String>,
}

impl ApiError {
    fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        ApiError { status, message: msg.into(), details: Vec::new() }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unprocessable(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, "{}", self.message);
        }
        let body = if self.details.is_empty() {
            json!({ "error": self.message })
        } else {
            json!({ "error": self.message, "details": self.details })
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<ProviderError> for ApiError {
    fn from(e: ProviderError) -> Self {
        match &e {
            ProviderError::Schema(schema) => {
                let details = schema.diagnostics().iter().map(|d| d.to_string()).collect();
                ApiError::bad_request(e.to_string()).with_details(details)
            }
            ProviderError::UnknownType(_) | ProviderError::NotFound(_) => ApiError::not_found(e.to_string()),
            ProviderError::AlreadyExists { .. } => ApiError::conflict(e.to_string()),
            _ if e.is_validation() => ApiError::bad_request(e.to_string()),
            _ => ApiError::internal(e.to_string()),
        }
    }
}

impl From<ReconcileError> for ApiError {
    fn from(e: ReconcileError) -> Self {
        match e {
            ReconcileError::Invalid(problems) => {
                ApiError::unprocessable("invalid configuration").with_details(problems)
            }
            ReconcileError::Config(_) | ReconcileError::Graph(_) => ApiError::unprocessable(e.to_string()),
            ReconcileError::Provider { address, source } => {
                let mut err = ApiError::from(source);
                err.message = format!("{}: {}", address, err.message);
                err
            }
            ReconcileError::AlreadyManaged(_) => ApiError::conflict(e.to_string()),
            ReconcileError::NotInState(_) => ApiError::not_found(e.to_string()),
            _ => ApiError::internal(e.to_string()),
        }
    }
}

impl From<netarm_store::StoreError> for ApiError {
    fn from(e: netarm_store::StoreError) -> Self {
        match e {
            netarm_store::StoreError::InvalidAddress(_) => ApiError::bad_request(e.to_string()),
            _ => ApiError::internal(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use netarm_schema::{Diagnostic, SchemaError};
    use netarm_store::ResourceAddress;

    use super::*;

    #[test]
    fn provider_errors_map_to_status_codes() {
        let cases = [
            (ProviderError::UnknownType("azurerm_nope".into()), StatusCode::NOT_FOUND),
            (ProviderError::NotFound("gone".into()), StatusCode::NOT_FOUND),
            (
                ProviderError::AlreadyExists { type_name: "azurerm_subnet".into(), id: "/x".into() },
                StatusCode::CONFLICT,
            ),
            (ProviderError::Validation("bad".into()), StatusCode::BAD_REQUEST),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn schema_diagnostics_become_details() {
        let err = ProviderError::Schema(SchemaError::Invalid(vec![Diagnostic {
            path: "priority".into(),
            message: "must be between 100 and 4096".into(),
        }]));
        let api = ApiError::from(err);
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.details, vec!["priority: must be between 100 and 4096"]);
    }

    #[test]
    fn wrapped_provider_error_keeps_its_status() {
        let err = ReconcileError::Provider {
            address: ResourceAddress::managed("azurerm_subnet", "app"),
            source: ProviderError::AlreadyExists { type_name: "azurerm_subnet".into(), id: "/x".into() },
        };
        let api = ApiError::from(err);
        assert_eq!(api.status, StatusCode::CONFLICT);
        assert!(api.message.starts_with("azurerm_subnet.app: "), "{}", api.message);
    }
}
