use serde::{Deserialize, Serialize};

/// Result of validating one configuration value: warnings never block an
/// operation, errors always do.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl Diagnostics {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self { warnings: Vec::new(), errors: vec![msg.into()] }
    }

    pub fn warning(msg: impl Into<String>) -> Self {
        Self { warnings: vec![msg.into()], errors: Vec::new() }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.warnings.extend(other.warnings);
        self.errors.extend(other.errors);
    }
}
