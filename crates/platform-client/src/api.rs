use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared transport for the host platform's REST API: base URL, static
/// access token (refresh is the host SDK's concern) and optional proxy
/// agent.
#[derive(Clone)]
pub struct PlatformApi {
    base_url: Arc<str>,
    token: Arc<str>,
    proxy_agent: Option<Arc<str>>,
    http: reqwest::Client,
}

impl PlatformApi {
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("building http client")?;

        Ok(Self {
            base_url: Arc::from(base_url.trim_end_matches('/')),
            token: Arc::from(token),
            proxy_agent: None,
            http,
        })
    }

    /// Act on behalf of another agent, sent as the `X-Proxy-Agent` header.
    pub fn with_proxy_agent(mut self, agent_id: &str) -> Self {
        self.proxy_agent = Some(Arc::from(agent_id));
        self
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{path}", self.base_url);
        debug!(%method, %url, "platform request");
        let mut request = self
            .http
            .request(method, url)
            .header("Authorization", format!("Token {}", self.token));
        if let Some(agent) = &self.proxy_agent {
            request = request.header("X-Proxy-Agent", agent.as_ref());
        }
        request
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .request(reqwest::Method::GET, path)
            .send()
            .await
            .with_context(|| format!("GET {path}"))?;
        Self::decode(path, response).await
    }

    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T> {
        let response = self
            .request(reqwest::Method::POST, path)
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {path}"))?;
        Self::decode(path, response).await
    }

    /// POST where only the status matters; the platform returns empty or
    /// free-form bodies for these.
    pub async fn post_unit(&self, path: &str, body: &impl Serialize) -> Result<()> {
        let response = self
            .request(reqwest::Method::POST, path)
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {path}"))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("POST {path} failed: {status} - {body}"));
        }
        Ok(())
    }

    async fn decode<T: DeserializeOwned>(path: &str, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(anyhow!("request to {path} failed: {status} - {body}"));
        }
        serde_json::from_str(&body).with_context(|| format!("decoding response from {path}"))
    }
}
