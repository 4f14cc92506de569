use std::time::Duration;

use netarm_client::{ArmConfig, Environment, PollPolicy};
use netarm_provider::TimeoutOverrides;

use crate::error::ConfigError;
use crate::raw::RawProvider;

/// Provider settings from one source: a `provider:` block, CLI flags or the
/// `ARM_*` environment. Sources are layered with [`ProviderSettings::merge`].
#[derive(Clone, Default, PartialEq)]
pub struct ProviderSettings {
    pub subscription_id: Option<String>,
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub environment: Option<Environment>,
    pub management_endpoint: Option<String>,
    pub poll: Option<PollPolicy>,
    pub timeouts: TimeoutOverrides,
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("subscription_id", &self.subscription_id)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("environment", &self.environment)
            .field("management_endpoint", &self.management_endpoint)
            .field("poll", &self.poll)
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

impl ProviderSettings {
    pub(crate) fn from_raw(raw: RawProvider, path: &str) -> Result<Self, ConfigError> {
        let conversion = |message: String| ConfigError::Conversion { path: path.to_string(), message };

        let environment = raw
            .environment
            .as_deref()
            .map(|e| e.parse::<Environment>().map_err(conversion))
            .transpose()?;

        let poll = raw.poll.map(|p| {
            let defaults = PollPolicy::default();
            PollPolicy {
                delays_secs: p.delays_secs.unwrap_or(defaults.delays_secs),
                max_polls: p.max_polls.unwrap_or(defaults.max_polls),
            }
        });

        let duration = |field: &str, value: Option<String>| -> Result<Option<Duration>, ConfigError> {
            value
                .map(|v| parse_duration(&v).map_err(|e| conversion(format!("timeouts.{}: {}", field, e))))
                .transpose()
        };
        let timeouts = TimeoutOverrides {
            create: duration("create", raw.timeouts.create)?,
            read: duration("read", raw.timeouts.read)?,
            update: duration("update", raw.timeouts.update)?,
            delete: duration("delete", raw.timeouts.delete)?,
        };

        Ok(Self {
            subscription_id: raw.subscription_id,
            tenant_id: raw.tenant_id,
            client_id: raw.client_id,
            client_secret: raw.client_secret,
            environment,
            management_endpoint: raw.management_endpoint,
            poll,
            timeouts,
        })
    }

    /// Read the `ARM_*` variables through `lookup`.
    pub fn from_env_with(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|v| !v.is_empty());
        Self {
            subscription_id: var("ARM_SUBSCRIPTION_ID"),
            tenant_id: var("ARM_TENANT_ID"),
            client_id: var("ARM_CLIENT_ID"),
            client_secret: var("ARM_CLIENT_SECRET"),
            environment: var("ARM_ENVIRONMENT").and_then(|e| e.parse().ok()),
            management_endpoint: var("ARM_MANAGEMENT_ENDPOINT"),
            poll: None,
            timeouts: TimeoutOverrides::default(),
        }
    }

    pub fn from_env() -> Self {
        Self::from_env_with(|name| std::env::var(name).ok())
    }

    /// Layer `over` on top of `self`: every value set in `over` wins.
    pub fn merge(self, over: ProviderSettings) -> Self {
        Self {
            subscription_id: over.subscription_id.or(self.subscription_id),
            tenant_id: over.tenant_id.or(self.tenant_id),
            client_id: over.client_id.or(self.client_id),
            client_secret: over.client_secret.or(self.client_secret),
            environment: over.environment.or(self.environment),
            management_endpoint: over.management_endpoint.or(self.management_endpoint),
            poll: over.poll.or(self.poll),
            timeouts: TimeoutOverrides {
                create: over.timeouts.create.or(self.timeouts.create),
                read: over.timeouts.read.or(self.timeouts.read),
                update: over.timeouts.update.or(self.timeouts.update),
                delete: over.timeouts.delete.or(self.timeouts.delete),
            },
        }
    }

    pub fn arm_config(&self) -> Result<ArmConfig, ConfigError> {
        let subscription_id = self.subscription_id.clone().ok_or_else(|| ConfigError::Conversion {
            path: "provider".into(),
            message: "subscription_id is required (set it in the provider block or ARM_SUBSCRIPTION_ID)".into(),
        })?;
        Ok(ArmConfig {
            subscription_id,
            tenant_id: self.tenant_id.clone().unwrap_or_default(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            environment: self.environment.unwrap_or_default(),
            management_endpoint: self.management_endpoint.clone(),
            poll: self.poll.clone().unwrap_or_default(),
        })
    }
}

/// Parse `90m`, `45s`, `2h` or combinations such as `1h30m`. A bare number
/// is taken as minutes.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration".into());
    }
    if let Ok(minutes) = s.parse::<u64>() {
        return Ok(Duration::from_secs(minutes * 60));
    }

    let mut total = 0u64;
    let mut digits = String::new();
    for c in s.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let unit = match c {
            'h' => 3600,
            'm' => 60,
            's' => 1,
            other => return Err(format!("unknown unit {:?} in {:?}", other, s)),
        };
        let n: u64 = digits.parse().map_err(|_| format!("missing number before {:?} in {:?}", c, s))?;
        total += n * unit;
        digits.clear();
    }
    if !digits.is_empty() {
        return Err(format!("trailing number without unit in {:?}", s));
    }
    Ok(Duration::from_secs(total))
}
