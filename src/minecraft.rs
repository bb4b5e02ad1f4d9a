use crate::{config::ApiConfig, error::QueryError, types::ServerStatus};
use anyhow::{bail, Context};
use reqwest::Url;

use log::debug;

/// HTTP client for the mcsrvstat.us status API.
#[derive(Debug, Clone)]
pub struct StatusClient {
    http: reqwest::Client,
    base: Url,
}

impl StatusClient {
    pub fn new(config: &ApiConfig) -> anyhow::Result<Self> {
        let base = Url::parse(&config.base_url)
            .with_context(|| format!("invalid status API base {:?}", config.base_url))?;
        if base.cannot_be_a_base() {
            bail!("status API base {:?} cannot take a path", config.base_url);
        }
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .context("failed to build HTTP client")?;

        Ok(StatusClient { http, base })
    }

    /// The query becomes one percent-encoded path segment under the base.
    /// URL parsing folds `.` and `..` (even escaped) into the path, so those
    /// are refused instead of silently requesting the base.
    pub fn status_url(&self, query: &str) -> Result<Url, QueryError> {
        if matches!(query, "." | "..") {
            return Err(QueryError::Unaddressable(query.to_string()));
        }
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| QueryError::Unaddressable(query.to_string()))?
            .pop_if_empty()
            .push(query);
        Ok(url)
    }

    pub async fn fetch(&self, query: &str) -> Result<ServerStatus, QueryError> {
        let url = self.status_url(query)?;
        debug!("Checking {}", url);
        let body = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        ServerStatus::from_json(&body)
    }
}
