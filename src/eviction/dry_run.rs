use crate::azure_compute::VirtualMachineScaleSetVmId;
use crate::eviction::{EvictionResponse, Evicter};
use async_trait::async_trait;
use futures::future;
use http::StatusCode;
use tracing::info;

/// Logs eviction requests instead of sending them.
pub struct DryRunEvicter;

#[async_trait]
impl Evicter for DryRunEvicter {
    async fn simulate_eviction(
        &self,
        id: &VirtualMachineScaleSetVmId,
    ) -> anyhow::Result<EvictionResponse> {
        info!("Dry run, not evicting {}", id);

        Ok(EvictionResponse {
            status: StatusCode::NO_CONTENT,
            body: Box::pin(future::ready(Ok(String::new()))),
        })
    }
}
