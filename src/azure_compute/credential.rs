use crate::azure_compute::{error::Error, Result};
use crate::config;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::debug;

/// Supplies bearer tokens for Azure Resource Manager.
#[async_trait]
pub trait TokenCredential: Send + Sync {
    async fn token(&self) -> Result<String>;
}

pub fn build_from_config(config: &config::AzureCredential) -> Arc<dyn TokenCredential> {
    match config {
        config::AzureCredential::Cli { resource } => Arc::new(AzureCliCredential::new(resource)),
        config::AzureCredential::Static { token } => Arc::new(StaticToken::new(token)),
    }
}

pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenCredential for StaticToken {
    async fn token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Tokens issued by `az account get-access-token`, cached until shortly before they expire.
pub struct AzureCliCredential {
    resource: String,
    cached: Mutex<Option<AccessToken>>,
}

#[derive(Clone, Debug, PartialEq)]
struct AccessToken {
    token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliTokenResponse {
    access_token: String,
    #[serde(rename = "expires_on")]
    expires_on: Option<i64>,
}

impl AzureCliCredential {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            cached: Mutex::new(None),
        }
    }

    async fn fetch(&self) -> Result<AccessToken> {
        debug!("Requesting access token for {} from Azure CLI", self.resource);

        let output = Command::new("az")
            .args(&[
                "account",
                "get-access-token",
                "--resource",
                self.resource.as_str(),
                "--output",
                "json",
            ])
            .output()
            .await
            .map_err(|e| Error::Credential(format!("could not run az: {}", e)))?;

        if !output.status.success() {
            return Err(Error::Credential(format!(
                "az exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_cli_token(&output.stdout, Utc::now())
    }
}

#[async_trait]
impl TokenCredential for AzureCliCredential {
    async fn token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Utc::now())) {
            return Ok(token.token.clone());
        }

        let token = self.fetch().await?;
        let value = token.token.clone();
        *cached = Some(token);

        Ok(value)
    }
}

impl AccessToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now > Duration::minutes(5)
    }
}

fn parse_cli_token(stdout: &[u8], now: DateTime<Utc>) -> Result<AccessToken> {
    let response: CliTokenResponse = serde_json::from_slice(stdout)
        .map_err(|e| Error::Credential(format!("unexpected az output: {}", e)))?;

    // Older CLI versions only report a local time string; assume the default lifetime.
    let expires_at = response
        .expires_on
        .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
        .unwrap_or_else(|| now + Duration::hours(1));

    Ok(AccessToken {
        token: response.access_token,
        expires_at,
    })
}
