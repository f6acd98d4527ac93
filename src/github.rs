//! reqwest-backed [`ActivityProvider`] for the GitHub REST API.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use tracing::debug;

use crate::contract::ActivityProvider;
use crate::error::ProviderError;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

#[derive(Debug, Deserialize)]
struct EmailEntry {
    email: String,
    #[serde(default)]
    primary: bool,
    #[serde(default)]
    verified: bool,
}

/// GitHub API client. Timeouts are the reqwest defaults.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: Client,
    api_url: String,
}

impl GithubClient {
    pub fn new(api_url: impl Into<String>) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .user_agent(concat!("github-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn get(&self, url: &str, access_token: &str) -> RequestBuilder {
        self.http
            .get(url)
            .header(AUTHORIZATION, format!("token {access_token}"))
            .header(ACCEPT, "application/vnd.github+json")
    }
}

/// Turn a non-2xx response into [`ProviderError::Status`].
fn ensure_success(resp: Response) -> Result<Response, ProviderError> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        Err(ProviderError::Status {
            status: status.as_u16(),
            url: resp.url().to_string(),
        })
    }
}

#[async_trait]
impl ActivityProvider for GithubClient {
    async fn check_token(&self, access_token: &str) -> Result<(), ProviderError> {
        let url = format!("{}/user", self.api_url);
        let resp = self.get(&url, access_token).send().await?;
        ensure_success(resp)?;
        Ok(())
    }

    async fn list_events(
        &self,
        username: &str,
        access_token: &str,
        page: u32,
    ) -> Result<Vec<serde_json::Value>, ProviderError> {
        let url = format!("{}/users/{}/events", self.api_url, username);
        debug!(url = %url, page, "Fetching activity page");
        let resp = self
            .get(&url, access_token)
            .query(&[("page", page)])
            .send()
            .await?;
        let body = ensure_success(resp)?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn get_commit(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<serde_json::Value, ProviderError> {
        let resp = self.get(url, access_token).send().await?;
        let body = ensure_success(resp)?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn primary_email(&self, access_token: &str) -> Result<Option<String>, ProviderError> {
        let url = format!("{}/user/emails", self.api_url);
        let resp = self.get(&url, access_token).send().await?;
        let body = ensure_success(resp)?.bytes().await?;
        let entries: Vec<EmailEntry> = serde_json::from_slice(&body)?;
        Ok(entries
            .into_iter()
            .find(|e| e.primary && e.verified)
            .map(|e| e.email))
    }
}
