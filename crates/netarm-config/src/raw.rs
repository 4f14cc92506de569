use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw YAML representation of one configuration file. Every section is
/// optional so a directory can split blocks across files.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RawFile {
    pub provider: Option<RawProvider>,
    #[serde(default)]
    pub resources: Vec<RawBlock>,
    #[serde(default)]
    pub data: Vec<RawBlock>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RawProvider {
    pub subscription_id: Option<String>,
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// `public`, `usgovernment` or `china`.
    pub environment: Option<String>,
    pub management_endpoint: Option<String>,
    pub poll: Option<RawPoll>,
    #[serde(default)]
    pub timeouts: RawTimeouts,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RawPoll {
    pub delays_secs: Option<Vec<u64>>,
    pub max_polls: Option<usize>,
}

/// Durations such as `90m`, `30s` or `1h30m`.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RawTimeouts {
    pub create: Option<String>,
    pub read: Option<String>,
    pub update: Option<String>,
    pub delete: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RawBlock {
    #[serde(rename = "type")]
    pub type_name: String,
    pub name: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub config: Map<String, Value>,
}
