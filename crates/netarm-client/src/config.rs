use std::time::Duration;

use serde::{Deserialize, Serialize};

// ── Cloud environment ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Public,
    UsGovernment,
    China,
}

impl Environment {
    pub fn management_endpoint(&self) -> &'static str {
        match self {
            Environment::Public => "https://management.azure.com",
            Environment::UsGovernment => "https://management.usgovcloudapi.net",
            Environment::China => "https://management.chinacloudapi.cn",
        }
    }

    pub fn login_endpoint(&self) -> &'static str {
        match self {
            Environment::Public => "https://login.microsoftonline.com",
            Environment::UsGovernment => "https://login.microsoftonline.us",
            Environment::China => "https://login.chinacloudapi.cn",
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "public" => Ok(Environment::Public),
            "usgovernment" => Ok(Environment::UsGovernment),
            "china" => Ok(Environment::China),
            other => Err(format!("unknown environment {:?} (expected public, usgovernment or china)", other)),
        }
    }
}

// ── Poll policy ───────────────────────────────────────────────────────────────

/// How long-running operations are polled: the delay sequence cycles until
/// `max_polls` is reached. A `Retry-After` header overrides the next delay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    pub delays_secs: Vec<u64>,
    pub max_polls: usize,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self { delays_secs: vec![1, 2, 4, 8, 16, 30], max_polls: 120 }
    }
}

impl PollPolicy {
    /// No waiting between polls. Used in tests.
    pub fn immediate(max_polls: usize) -> Self {
        Self { delays_secs: vec![0], max_polls }
    }

    pub fn delay(&self, poll: usize) -> Duration {
        if self.delays_secs.is_empty() {
            return Duration::ZERO;
        }
        Duration::from_secs(self.delays_secs[poll % self.delays_secs.len()])
    }
}

// ── Client configuration ──────────────────────────────────────────────────────

/// Operator-level settings for talking to ARM.
#[derive(Clone, Default)]
pub struct ArmConfig {
    pub subscription_id: String,
    pub tenant_id: String,
    /// Service principal client ID (optional; falls back to MSI/CLI).
    pub client_id: Option<String>,
    /// Service principal client secret (optional; falls back to MSI/CLI).
    pub client_secret: Option<String>,
    pub environment: Environment,
    /// Overrides the environment's management endpoint.
    pub management_endpoint: Option<String>,
    pub poll: PollPolicy,
}

impl std::fmt::Debug for ArmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArmConfig")
            .field("subscription_id", &self.subscription_id)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("environment", &self.environment)
            .field("management_endpoint", &self.management_endpoint)
            .field("poll", &self.poll)
            .finish()
    }
}

impl ArmConfig {
    pub fn management_endpoint(&self) -> String {
        self.management_endpoint
            .clone()
            .unwrap_or_else(|| self.environment.management_endpoint().to_string())
            .trim_end_matches('/')
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_cycle() {
        let p = PollPolicy::default();
        assert_eq!(p.delay(0), Duration::from_secs(1));
        assert_eq!(p.delay(5), Duration::from_secs(30));
        assert_eq!(p.delay(6), Duration::from_secs(1));
    }

    #[test]
    fn endpoint_override_wins() {
        let mut cfg = ArmConfig { environment: Environment::China, ..Default::default() };
        assert_eq!(cfg.management_endpoint(), "https://management.chinacloudapi.cn");
        cfg.management_endpoint = Some("http://127.0.0.1:8080/".into());
        assert_eq!(cfg.management_endpoint(), "http://127.0.0.1:8080");
    }

    #[test]
    fn secret_is_redacted_in_debug() {
        let cfg = ArmConfig { client_secret: Some("hunter2".into()), ..Default::default() };
        assert!(!format!("{:?}", cfg).contains("hunter2"));
    }

    #[test]
    fn environment_names() {
        assert_eq!("USGovernment".parse::<Environment>().unwrap(), Environment::UsGovernment);
        assert!("mars".parse::<Environment>().is_err());
    }
}
