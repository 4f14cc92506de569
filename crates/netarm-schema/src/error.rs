use thiserror::Error;

/// One problem found while checking configuration against a schema.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Diagnostic {
    /// Dotted attribute path, e.g. `security_rule.0.priority`.
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid configuration: {}", join(.0))]
    Invalid(Vec<Diagnostic>),

    #[error("{path}: {message}")]
    Decode { path: String, message: String },

    #[error("{0} is required but was not set")]
    Missing(String),
}

impl SchemaError {
    pub fn decode(path: impl Into<String>, message: impl Into<String>) -> Self {
        SchemaError::Decode { path: path.into(), message: message.into() }
    }

    /// The individual diagnostics, if this is a validation failure.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            SchemaError::Invalid(d) => d,
            _ => &[],
        }
    }
}

fn join(diags: &[Diagnostic]) -> String {
    diags.iter().map(|d| d.to_string()).collect::<Vec<_>>().join("; ")
}
