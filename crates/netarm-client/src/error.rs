use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArmError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict (409) for {url}: {message}")]
    Conflict { url: String, message: String },

    #[error("unexpected status {status} for {url}: {code}: {message}")]
    Api { status: u16, url: String, code: String, message: String },

    #[error("long-running operation {status}: {message}")]
    OperationFailed { status: String, message: String },

    #[error("timed out after {seconds}s waiting for {url}")]
    Timeout { url: String, seconds: u64 },

    #[error("acquiring token: {0}")]
    Auth(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("decoding response: {0}")]
    Decode(String),
}

impl ArmError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ArmError::NotFound(_) | ArmError::Api { status: 404, .. })
    }

    /// Map a non-success HTTP response onto an error variant.
    pub fn from_status(status: u16, url: &str, body: &Value) -> Self {
        let (code, message) = parse_arm_error(body);
        match status {
            404 => ArmError::NotFound(url.to_string()),
            409 => ArmError::Conflict { url: url.to_string(), message: format!("{}: {}", code, message) },
            _ => ArmError::Api { status, url: url.to_string(), code, message },
        }
    }
}

/// Split an ARM error body (`{"error": {"code", "message"}}`) into code and
/// message. Falls back to the top level when there is no `error` wrapper.
pub fn parse_arm_error(body: &Value) -> (String, String) {
    let err = body.get("error").or_else(|| body.get("Error")).unwrap_or(body);
    let code = err["code"].as_str().unwrap_or("Unknown").to_string();
    let message = err["message"].as_str().unwrap_or("unknown error").to_string();
    (code, message)
}

/// `code: message` rendering used in operation failures.
pub fn format_arm_error(body: &Value) -> String {
    let (code, message) = parse_arm_error(body);
    format!("{}: {}", code, message)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_wrapped_and_bare_errors() {
        let wrapped = json!({ "error": { "code": "InUseSubnetCannotBeDeleted", "message": "Subnet is in use" } });
        assert_eq!(format_arm_error(&wrapped), "InUseSubnetCannotBeDeleted: Subnet is in use");
        let bare = json!({ "code": "Conflict", "message": "busy" });
        assert_eq!(format_arm_error(&bare), "Conflict: busy");
        assert_eq!(format_arm_error(&Value::Null), "Unknown: unknown error");
    }

    #[test]
    fn status_mapping() {
        assert!(ArmError::from_status(404, "u", &Value::Null).is_not_found());
        assert!(matches!(ArmError::from_status(409, "u", &Value::Null), ArmError::Conflict { .. }));
        let e = ArmError::from_status(400, "u", &json!({ "error": { "code": "InvalidRequest", "message": "bad" } }));
        assert!(matches!(e, ArmError::Api { status: 400, ref code, .. } if code == "InvalidRequest"));
    }
}
