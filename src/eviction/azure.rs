use crate::azure_compute::scale_set_vms::ScaleSetVms;
use crate::azure_compute::{self, VirtualMachineScaleSetVmId};
use crate::eviction::{EvictionResponse, Evicter};
use anyhow::Context;
use async_trait::async_trait;

pub struct AzureEvicter {
    client: azure_compute::Client,
}

impl AzureEvicter {
    pub fn new(client: azure_compute::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Evicter for AzureEvicter {
    #[tracing::instrument(name = "AzureEvicter::simulate_eviction", skip(self, id), fields(id = %id))]
    async fn simulate_eviction(
        &self,
        id: &VirtualMachineScaleSetVmId,
    ) -> anyhow::Result<EvictionResponse> {
        let response = self.client.simulate_eviction(id).await?;
        let status = response.status();

        Ok(EvictionResponse {
            status,
            body: Box::pin(async move {
                response
                    .text()
                    .await
                    .context("could not read body")
            }),
        })
    }
}
