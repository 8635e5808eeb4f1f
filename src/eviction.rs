mod azure;
mod dry_run;
pub mod worker;

use crate::azure_compute::{credential, VirtualMachineScaleSetVmId};
use crate::{config, AppConfig};
use anyhow::Context;
use async_trait::async_trait;
use futures::future::BoxFuture;
use http::StatusCode;
use std::fmt;
use std::sync::Arc;

pub use azure::AzureEvicter;
pub use dry_run::DryRunEvicter;
pub use worker::{evict, Eviction, EvictionError};

/// Response of an accepted eviction request; the body is read on demand.
pub struct EvictionResponse {
    pub status: StatusCode,
    pub body: BoxFuture<'static, anyhow::Result<String>>,
}

impl fmt::Debug for EvictionResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvictionResponse")
            .field("status", &self.status)
            .finish()
    }
}

/// Requests the (simulated) eviction of a single scale set VM.
#[async_trait]
pub trait Evicter: Send + Sync {
    async fn simulate_eviction(
        &self,
        id: &VirtualMachineScaleSetVmId,
    ) -> anyhow::Result<EvictionResponse>;
}

/// Builds the configured evicter, making sure credentials work before the first sweep.
pub async fn build_from_config(config: AppConfig) -> anyhow::Result<Arc<dyn Evicter>> {
    Ok(match &config.evicter {
        config::Evicter::Azure {
            address,
            api_version,
            credential,
        } => {
            let credential = credential::build_from_config(credential);
            credential
                .token()
                .await
                .context("Failed to acquire an Azure access token")?;

            let client = crate::azure_compute::Client::builder()
                .address(address.clone())
                .api_version(api_version.clone())
                .credential(credential)
                .build()?;

            Arc::new(AzureEvicter::new(client))
        }
        config::Evicter::DryRun => Arc::new(DryRunEvicter),
    })
}
