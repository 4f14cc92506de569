use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::ArmConfig;
use crate::error::ArmError;

/// Source of ARM bearer tokens.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self) -> Result<String, ArmError>;
}

type Cache = Mutex<Option<(String, Instant)>>;

async fn cached(cache: &Cache) -> Option<String> {
    let guard = cache.lock().await;
    match guard.as_ref() {
        Some((tok, expiry)) if Instant::now() < *expiry => Some(tok.clone()),
        _ => None,
    }
}

async fn store(cache: &Cache, tok: &str, expires_in: u64) {
    let expiry = Instant::now() + Duration::from_secs(expires_in.saturating_sub(60));
    *cache.lock().await = Some((tok.to_string(), expiry));
}

// ── Service Principal ─────────────────────────────────────────────────────────

pub struct ServicePrincipalToken {
    tenant_id:     String,
    client_id:     String,
    client_secret: String,
    login_base:    String,
    scope:         String,
    client:        reqwest::Client,
    cache:         Cache,
}

impl ServicePrincipalToken {
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        login_base: impl Into<String>,
        management_endpoint: &str,
        client: reqwest::Client,
    ) -> Self {
        Self {
            tenant_id:     tenant_id.into(),
            client_id:     client_id.into(),
            client_secret: client_secret.into(),
            login_base:    login_base.into(),
            scope:         format!("{}/.default", management_endpoint.trim_end_matches('/')),
            client,
            cache:         Mutex::new(None),
        }
    }
}

#[async_trait]
impl TokenProvider for ServicePrincipalToken {
    async fn token(&self) -> Result<String, ArmError> {
        if let Some(tok) = cached(&self.cache).await {
            return Ok(tok);
        }

        let url = format!("{}/{}/oauth2/v2.0/token", self.login_base, self.tenant_id);
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", self.scope.as_str()),
        ];
        debug!(url, client_id = %self.client_id, "requesting service principal token");
        let resp: Value = self
            .client
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(|e| ArmError::Auth(format!("SP token request: {}", e)))?
            .json()
            .await
            .map_err(|e| ArmError::Auth(format!("SP token decode: {}", e)))?;

        let tok = resp["access_token"]
            .as_str()
            .ok_or_else(|| ArmError::Auth(format!("SP token: no access_token in response: {}", resp)))?
            .to_string();
        store(&self.cache, &tok, resp["expires_in"].as_u64().unwrap_or(3600)).await;
        Ok(tok)
    }
}

// ── Managed Identity ──────────────────────────────────────────────────────────

/// App Service / Container Apps style identity endpoint when
/// `IDENTITY_ENDPOINT` is set, otherwise the VM metadata service.
pub struct ManagedIdentityToken {
    endpoint: String,
    header:   Option<String>,
    resource: String,
    client:   reqwest::Client,
    cache:    Cache,
}

impl ManagedIdentityToken {
    pub fn from_env(management_endpoint: &str, client: reqwest::Client) -> Self {
        let endpoint = std::env::var("IDENTITY_ENDPOINT")
            .unwrap_or_else(|_| "http://169.254.169.254/metadata/identity/oauth2/token".into());
        Self {
            endpoint,
            header:   std::env::var("IDENTITY_HEADER").ok(),
            resource: format!("{}/", management_endpoint.trim_end_matches('/')),
            client,
            cache:    Mutex::new(None),
        }
    }
}

#[async_trait]
impl TokenProvider for ManagedIdentityToken {
    async fn token(&self) -> Result<String, ArmError> {
        if let Some(tok) = cached(&self.cache).await {
            return Ok(tok);
        }

        let mut req = self.client.get(&self.endpoint).query(&[("resource", self.resource.as_str())]);
        req = match &self.header {
            Some(h) => req.header("X-IDENTITY-HEADER", h).query(&[("api-version", "2019-08-01")]),
            None => req.header("Metadata", "true").query(&[("api-version", "2018-02-01")]),
        };
        let resp: Value = req
            .send()
            .await
            .map_err(|e| ArmError::Auth(format!("managed identity token request: {}", e)))?
            .json()
            .await
            .map_err(|e| ArmError::Auth(format!("managed identity token decode: {}", e)))?;

        let tok = resp["access_token"]
            .as_str()
            .ok_or_else(|| ArmError::Auth(format!("managed identity token: no access_token: {}", resp)))?
            .to_string();
        // expires_in comes back as a string from the identity endpoints
        let expires_in = resp["expires_in"]
            .as_str()
            .and_then(|s| s.parse::<u64>().ok())
            .or_else(|| resp["expires_in"].as_u64())
            .unwrap_or(3600);
        store(&self.cache, &tok, expires_in).await;
        Ok(tok)
    }
}

// ── Azure CLI ─────────────────────────────────────────────────────────────────

pub struct AzureCliToken {
    tenant_id: Option<String>,
    resource:  String,
}

impl AzureCliToken {
    pub fn new(tenant_id: Option<String>, management_endpoint: &str) -> Self {
        Self { tenant_id, resource: management_endpoint.trim_end_matches('/').to_string() }
    }
}

#[async_trait]
impl TokenProvider for AzureCliToken {
    async fn token(&self) -> Result<String, ArmError> {
        let mut cmd = tokio::process::Command::new("az");
        cmd.args(["account", "get-access-token", "--resource", &self.resource, "--output", "json"]);
        if let Some(t) = &self.tenant_id {
            cmd.args(["--tenant", t]);
        }
        let output = cmd.output().await.map_err(|e| {
            ArmError::Auth(format!(
                "az CLI not found: {}. Install Azure CLI or configure service principal credentials.",
                e
            ))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ArmError::Auth(format!(
                "az account get-access-token failed: {}. Run 'az login' first.",
                stderr.trim()
            )));
        }

        let resp: Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| ArmError::Auth(format!("az CLI output parse: {}", e)))?;
        resp["accessToken"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ArmError::Auth("az CLI: no accessToken in output".into()))
    }
}

// ── Static (tests) ────────────────────────────────────────────────────────────

pub struct StaticToken(pub String);

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> Result<String, ArmError> {
        Ok(self.0.clone())
    }
}

/// Pick a token provider:
/// 1. `client_id` + `client_secret` in config → service principal
/// 2. `AZURE_CLIENT_ID` + `AZURE_CLIENT_SECRET` env vars → service principal
/// 3. `IDENTITY_ENDPOINT` env var → managed identity
/// 4. otherwise → Azure CLI
pub fn select_token_provider(config: &ArmConfig, client: &reqwest::Client) -> Box<dyn TokenProvider> {
    let management = config.management_endpoint();
    let login = config.environment.login_endpoint();

    if let (Some(cid), Some(cs)) = (config.client_id.as_deref(), config.client_secret.as_deref()) {
        debug!("using service principal credentials from configuration");
        return Box::new(ServicePrincipalToken::new(&config.tenant_id, cid, cs, login, &management, client.clone()));
    }
    if let (Ok(cid), Ok(cs)) = (std::env::var("AZURE_CLIENT_ID"), std::env::var("AZURE_CLIENT_SECRET")) {
        debug!("using service principal credentials from AZURE_CLIENT_ID/AZURE_CLIENT_SECRET");
        return Box::new(ServicePrincipalToken::new(&config.tenant_id, cid, cs, login, &management, client.clone()));
    }
    if std::env::var("IDENTITY_ENDPOINT").is_ok() {
        debug!("using managed identity");
        return Box::new(ManagedIdentityToken::from_env(&management, client.clone()));
    }
    debug!("falling back to Azure CLI credentials");
    let tenant = (!config.tenant_id.is_empty()).then(|| config.tenant_id.clone());
    Box::new(AzureCliToken::new(tenant, &management))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn service_principal_token_is_cached() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tenant-1/oauth2/v2.0/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "tok-1",
                "expires_in": 3600,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = ServicePrincipalToken::new(
            "tenant-1",
            "client",
            "secret",
            server.uri(),
            "https://management.azure.com",
            reqwest::Client::new(),
        );
        assert_eq!(provider.token().await.unwrap(), "tok-1");
        assert_eq!(provider.token().await.unwrap(), "tok-1");
    }

    #[tokio::test]
    async fn service_principal_without_token_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": "invalid_client" })))
            .mount(&server)
            .await;

        let provider =
            ServicePrincipalToken::new("t", "c", "s", server.uri(), "https://management.azure.com", reqwest::Client::new());
        let err = provider.token().await.unwrap_err();
        assert!(matches!(err, ArmError::Auth(_)), "{err:?}");
    }
}
