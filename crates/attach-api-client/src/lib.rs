//! HTTP client for the form server's attachment handlers.
//!
//! Provides a minimal client with configurable auth (Bearer token or none),
//! generic GET/POST helpers, and an [`AttachmentServer`]
//! implementation (see [`api`]) used by the CLI.
//!
//! [`AttachmentServer`]: attach_core::AttachmentServer

pub mod api;

use std::time::Duration;

use anyhow::{Context, Result};
use attach_core::AttachConfig;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

pub use api::Endpoints;

/// Authentication strategy for the form server.
#[derive(Clone, Debug)]
pub enum Auth {
    /// `Authorization: Bearer {token}`
    Bearer(String),
    /// Session cookie or open endpoint
    None,
}

/// HTTP client for the form server with configurable auth.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth: Auth,
    endpoints: Endpoints,
}

impl ApiClient {
    pub fn new(base_url: String, auth: Auth, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            endpoints: Endpoints::default(),
        })
    }

    /// Create client from configuration: `ATTACH_SERVER_URL`, optional
    /// `ATTACH_API_TOKEN` (Bearer auth), `ATTACH_REQUEST_TIMEOUT_SECS`.
    pub fn from_config(config: &AttachConfig) -> Result<Self> {
        let base_url = config
            .server_url
            .clone()
            .context("Missing server URL. Set ATTACH_SERVER_URL")?;

        let auth = match &config.api_token {
            Some(token) => Auth::Bearer(token.clone()),
            None => Auth::None,
        };

        Self::new(
            base_url,
            auth,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn apply_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            Auth::Bearer(token) => request.header("Authorization", format!("Bearer {}", token)),
            Auth::None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self
            .apply_auth(request)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow::anyhow!(
                "Request failed with status {}: {}",
                status,
                error_text
            ));
        }

        Ok(response)
    }

    /// GET request returning the body as text (rendered markup).
    pub async fn get_text(&self, path: &str, query: &[(&str, &str)]) -> Result<String> {
        let mut request = self.client.get(self.build_url(path));
        if !query.is_empty() {
            request = request.query(query);
        }

        self.send(request)
            .await?
            .text()
            .await
            .context("Failed to read response body")
    }

    /// POST without a body and deserialize the JSON response.
    pub async fn post_empty<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let request = self.client.post(self.build_url(path)).query(query);

        self.send(request)
            .await?
            .json()
            .await
            .context("Failed to parse response as JSON")
    }

    /// POST JSON body; the response body is ignored.
    pub async fn post_json<B: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        body: &B,
    ) -> Result<()> {
        let request = self.client.post(self.build_url(path)).query(query).json(body);
        self.send(request).await?;
        Ok(())
    }
}
