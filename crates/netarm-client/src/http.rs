use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::{ArmClient, PutResponse};
use crate::config::{ArmConfig, PollPolicy};
use crate::error::ArmError;
use crate::poller::{parse_retry_after, status_from_body, PollKind, PollStatus, Poller};
use crate::token::{select_token_provider, StaticToken, TokenProvider};

/// ARM client over HTTPS.
pub struct AzureClient {
    client:     reqwest::Client,
    token:      Box<dyn TokenProvider>,
    management: String,
    policy:     PollPolicy,
}

impl AzureClient {
    pub fn new(config: &ArmConfig) -> Self {
        let client = reqwest::Client::new();
        let token = select_token_provider(config, &client);
        Self {
            client,
            token,
            management: config.management_endpoint(),
            policy: config.poll.clone(),
        }
    }

    /// Client with a fixed bearer token against an arbitrary endpoint.
    pub fn with_static_token(management: impl Into<String>, token: &str, policy: PollPolicy) -> Self {
        Self {
            client:     reqwest::Client::new(),
            token:      Box::new(StaticToken(token.to_string())),
            management: management.into().trim_end_matches('/').to_string(),
            policy,
        }
    }

    async fn bearer(&self) -> Result<String, ArmError> {
        self.token.token().await
    }

    fn url(&self, id: &str, api_version: &str) -> String {
        format!("{}{}?api-version={}", self.management, id, api_version)
    }

    fn poller_from(&self, headers: &HeaderMap) -> Option<Poller> {
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
        let retry_after = parse_retry_after(header("Retry-After").as_deref());
        let (url, kind) = match (header("Azure-AsyncOperation"), header("Location")) {
            (Some(u), _) => (u, PollKind::AsyncOperation),
            (None, Some(u)) => (u, PollKind::Location),
            (None, None) => return None,
        };
        let mut poller = Poller::new(url, kind, self.policy.clone());
        poller.retry_after = retry_after;
        Some(poller)
    }

    async fn send(&self, req: reqwest::RequestBuilder, what: &str) -> Result<reqwest::Response, ArmError> {
        let token = self.bearer().await?;
        req.bearer_auth(&token)
            .send()
            .await
            .map_err(|e| ArmError::Transport(format!("{}: {}", what, e)))
    }
}

async fn body_of(resp: reqwest::Response) -> Value {
    resp.json().await.unwrap_or(Value::Null)
}

#[async_trait]
impl ArmClient for AzureClient {
    async fn get(&self, id: &str, api_version: &str) -> Result<Option<Value>, ArmError> {
        let url = self.url(id, api_version);
        debug!(url, "ARM GET");
        let resp = self.send(self.client.get(&url), &format!("GET {}", url)).await?;
        let status = resp.status().as_u16();
        let body = body_of(resp).await;
        match status {
            404 => Ok(None),
            s if (200..300).contains(&s) => Ok(Some(body)),
            s => Err(ArmError::from_status(s, &url, &body)),
        }
    }

    async fn begin_put(&self, id: &str, api_version: &str, body: &Value) -> Result<PutResponse, ArmError> {
        let url = self.url(id, api_version);
        debug!(url, "ARM PUT");
        let resp = self.send(self.client.put(&url).json(body), &format!("PUT {}", url)).await?;
        let status = resp.status().as_u16();
        let poller = self.poller_from(resp.headers());
        let body = body_of(resp).await;

        if !(200..300).contains(&status) {
            return Err(ArmError::from_status(status, &url, &body));
        }
        if body.get("error").is_some() {
            return Err(ArmError::from_status(status.max(400), &url, &body));
        }
        // a 200 without an operation header is synchronously complete
        let poller = if status == 202 || status == 201 { poller } else { poller.filter(|p| p.kind == PollKind::AsyncOperation) };
        Ok(PutResponse { body, poller })
    }

    async fn begin_delete(&self, id: &str, api_version: &str) -> Result<Option<Poller>, ArmError> {
        let url = self.url(id, api_version);
        debug!(url, "ARM DELETE");
        let resp = self.send(self.client.delete(&url), &format!("DELETE {}", url)).await?;
        let status = resp.status().as_u16();
        match status {
            404 | 204 => Ok(None),
            202 => {
                let poller = self.poller_from(resp.headers());
                if poller.is_none() {
                    warn!(url, "202 from DELETE without an operation header, treating as done");
                }
                Ok(poller)
            }
            s if (200..300).contains(&s) => Ok(None),
            s => {
                let body = body_of(resp).await;
                Err(ArmError::from_status(s, &url, &body))
            }
        }
    }

    async fn list(&self, collection: &str, api_version: &str) -> Result<Vec<Value>, ArmError> {
        let mut out = Vec::new();
        let mut next = Some(self.url(collection, api_version));
        while let Some(url) = next.take() {
            debug!(url, "ARM LIST");
            let resp = self.send(self.client.get(&url), &format!("GET {}", url)).await?;
            let status = resp.status().as_u16();
            let body = body_of(resp).await;
            if !(200..300).contains(&status) {
                return Err(ArmError::from_status(status, &url, &body));
            }
            if let Some(items) = body["value"].as_array() {
                out.extend(items.iter().cloned());
            }
            next = body["nextLink"].as_str().filter(|s| !s.is_empty()).map(str::to_string);
        }
        Ok(out)
    }

    async fn poll(&self, poller: &Poller) -> Result<PollStatus, ArmError> {
        let resp = self.send(self.client.get(&poller.url), &format!("poll {}", poller.url)).await?;
        let status = resp.status().as_u16();
        let retry_after = parse_retry_after(
            resp.headers().get("Retry-After").and_then(|v| v.to_str().ok()),
        );
        let body = body_of(resp).await;

        match poller.kind {
            PollKind::AsyncOperation => {
                if !(200..300).contains(&status) {
                    return Err(ArmError::from_status(status, &poller.url, &body));
                }
                Ok(status_from_body(&body, retry_after))
            }
            PollKind::Location => match status {
                202 => Ok(PollStatus::InProgress { retry_after }),
                200 | 201 | 204 => Ok(PollStatus::Succeeded(body)),
                s => Err(ArmError::from_status(s, &poller.url, &body)),
            },
        }
    }
}
