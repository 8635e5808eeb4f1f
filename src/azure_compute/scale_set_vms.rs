use super::Result;
use crate::azure_compute::request::post_action;
use crate::azure_compute::{Client, VirtualMachineScaleSetVmId};
use async_trait::async_trait;
use reqwest::Response;

#[async_trait]
pub trait ScaleSetVms {
    /// Asks Azure to simulate a spot eviction of one scale set VM.
    async fn simulate_eviction(&self, id: &VirtualMachineScaleSetVmId) -> Result<Response>;
}

#[async_trait]
impl ScaleSetVms for Client {
    async fn simulate_eviction(&self, id: &VirtualMachineScaleSetVmId) -> Result<Response> {
        let token = self.credential.token().await?;
        let path = simulate_eviction_path(id);

        post_action(&self.http_client, &self.config, &token, &path).await
    }
}

fn simulate_eviction_path(id: &VirtualMachineScaleSetVmId) -> String {
    format!("{}/simulateEviction", id)
}
