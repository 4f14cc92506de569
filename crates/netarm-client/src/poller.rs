use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};

use crate::client::ArmClient;
use crate::config::PollPolicy;
use crate::error::ArmError;

/// Which header the operation URL came from; they report completion
/// differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollKind {
    /// Body carries `status`: `InProgress`, `Succeeded`, `Failed`, `Canceled`.
    AsyncOperation,
    /// `202` while pending, `200`/`201`/`204` once done.
    Location,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollStatus {
    InProgress { retry_after: Option<Duration> },
    Succeeded(Value),
    Failed { status: String, message: String },
}

/// Handle on a long-running ARM operation.
#[derive(Debug, Clone)]
pub struct Poller {
    pub url: String,
    pub kind: PollKind,
    /// `Retry-After` from the initial response.
    pub retry_after: Option<Duration>,
    pub policy: PollPolicy,
}

impl Poller {
    pub fn new(url: impl Into<String>, kind: PollKind, policy: PollPolicy) -> Self {
        Self { url: url.into(), kind, retry_after: None, policy }
    }

    /// Poll until the operation reaches a terminal state or `timeout`
    /// passes. Returns the final body on success.
    pub async fn wait_for_completion(&self, client: &dyn ArmClient, timeout: Duration) -> Result<Value, ArmError> {
        match tokio::time::timeout(timeout, self.poll_until_done(client)).await {
            Ok(result) => result,
            Err(_) => Err(ArmError::Timeout { url: self.url.clone(), seconds: timeout.as_secs() }),
        }
    }

    async fn poll_until_done(&self, client: &dyn ArmClient) -> Result<Value, ArmError> {
        if let Some(wait) = self.retry_after {
            tokio::time::sleep(wait).await;
        }

        for i in 0..self.policy.max_polls {
            let retry_after = match client.poll(self).await? {
                PollStatus::Succeeded(body) => return Ok(body),
                PollStatus::Failed { status, message } => {
                    return Err(ArmError::OperationFailed { status, message });
                }
                PollStatus::InProgress { retry_after } => retry_after,
            };

            let delay = retry_after.unwrap_or_else(|| self.policy.delay(i));
            let poll = i + 1;
            if poll % 10 == 0 {
                info!(poll, url = %self.url, "still waiting for ARM operation");
            } else {
                debug!(poll, url = %self.url, delay_secs = delay.as_secs(), "ARM operation pending");
            }
            tokio::time::sleep(delay).await;
        }

        Err(ArmError::OperationFailed {
            status: "TimedOut".into(),
            message: format!("operation did not finish after {} polls: {}", self.policy.max_polls, self.url),
        })
    }
}

/// Interpret an `Azure-AsyncOperation` status body.
pub fn status_from_body(body: &Value, retry_after: Option<Duration>) -> PollStatus {
    let status = body["status"].as_str().unwrap_or("InProgress");
    match status {
        s if s.eq_ignore_ascii_case("Succeeded") => PollStatus::Succeeded(body.clone()),
        s if s.eq_ignore_ascii_case("Failed") || s.eq_ignore_ascii_case("Canceled") => PollStatus::Failed {
            status: s.to_string(),
            message: crate::error::format_arm_error(body),
        },
        _ => PollStatus::InProgress { retry_after },
    }
}

pub fn parse_retry_after(value: Option<&str>) -> Option<Duration> {
    value.and_then(|v| v.trim().parse::<u64>().ok()).map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn status_bodies() {
        assert!(matches!(status_from_body(&json!({ "status": "Succeeded" }), None), PollStatus::Succeeded(_)));
        assert!(matches!(status_from_body(&json!({ "status": "InProgress" }), None), PollStatus::InProgress { .. }));
        let failed = status_from_body(
            &json!({ "status": "Failed", "error": { "code": "NetcfgInvalidSubnet", "message": "bad" } }),
            None,
        );
        assert_eq!(
            failed,
            PollStatus::Failed { status: "Failed".into(), message: "NetcfgInvalidSubnet: bad".into() }
        );
        assert!(matches!(status_from_body(&json!({ "status": "Canceled" }), None), PollStatus::Failed { .. }));
    }

    #[test]
    fn retry_after_header() {
        assert_eq!(parse_retry_after(Some("5")), Some(Duration::from_secs(5)));
        assert_eq!(parse_retry_after(Some("soon")), None);
        assert_eq!(parse_retry_after(None), None);
    }
}
