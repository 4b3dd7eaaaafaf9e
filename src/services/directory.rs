//! Client for the sebacon directory service, which owns names and employment
//! details for every person known to the application.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EmploymentExtras {
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub positions: Vec<Value>,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub domains: Vec<Value>,
}

/// Everything `GET /me` adds on top of the stored profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProfileExtras {
    pub first_name: Option<String>,
    pub nick_name: Option<String>,
    #[schema(value_type = Vec<Object>)]
    pub positions: Vec<Value>,
    #[schema(value_type = Vec<Object>)]
    pub domains: Vec<Value>,
}

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Invalid directory base URL '{0}'")]
    InvalidBaseUrl(String),

    #[error("Directory request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Directory returned {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Directory lookup failed: {0}")]
    Other(String),
}

#[async_trait]
pub trait DirectoryClient: Send + Sync {
    async fn get_user_first_name(&self, remote_id: &str) -> Result<Option<String>, DirectoryError>;
    async fn get_user_nick_name(&self, remote_id: &str) -> Result<Option<String>, DirectoryError>;
    async fn get_user_employment_extras(
        &self,
        remote_id: &str,
    ) -> Result<EmploymentExtras, DirectoryError>;
}

/// Runs the three directory lookups concurrently; the first failure wins.
pub async fn fetch_profile_extras(
    directory: &dyn DirectoryClient,
    remote_id: &str,
) -> Result<ProfileExtras, DirectoryError> {
    let (first_name, nick_name, employment) = tokio::try_join!(
        directory.get_user_first_name(remote_id),
        directory.get_user_nick_name(remote_id),
        directory.get_user_employment_extras(remote_id),
    )?;

    Ok(ProfileExtras {
        first_name,
        nick_name,
        positions: employment.positions,
        domains: employment.domains,
    })
}

pub struct HttpDirectoryClient {
    client: Client,
    base_url: Url,
}

impl HttpDirectoryClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DirectoryError> {
        let base_url = Url::parse(base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| DirectoryError::InvalidBaseUrl(base_url.to_string()))?;

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self { client, base_url })
    }

    fn user_url(&self, remote_id: &str, resource: &str) -> Result<Url, DirectoryError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| DirectoryError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["users", remote_id, resource]);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        remote_id: &str,
        resource: &str,
    ) -> Result<T, DirectoryError> {
        let url = self.user_url(remote_id, resource)?;
        tracing::debug!("Directory lookup: {}", url);

        let response = self.client.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(DirectoryError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl DirectoryClient for HttpDirectoryClient {
    async fn get_user_first_name(&self, remote_id: &str) -> Result<Option<String>, DirectoryError> {
        self.get_json(remote_id, "first-name").await
    }

    async fn get_user_nick_name(&self, remote_id: &str) -> Result<Option<String>, DirectoryError> {
        self.get_json(remote_id, "nick-name").await
    }

    async fn get_user_employment_extras(
        &self,
        remote_id: &str,
    ) -> Result<EmploymentExtras, DirectoryError> {
        self.get_json(remote_id, "employment").await
    }
}
