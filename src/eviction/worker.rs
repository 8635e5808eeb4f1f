use crate::azure_compute::resource_id::{strip_provider_prefix, ResourceIdError};
use crate::azure_compute::VirtualMachineScaleSetVmId;
use crate::eviction::Evicter;
use crate::node::Node;
use http::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, Instrument};

#[derive(Debug, PartialEq, Eq)]
pub enum Eviction {
    /// The node has no cloud instance assigned, nothing to evict.
    Skipped,
    Requested { status: StatusCode, body: String },
}

#[derive(thiserror::Error, Debug)]
pub enum EvictionError {
    #[error("error parsing VM ID {resource_id}")]
    ResourceId {
        resource_id: String,
        source: ResourceIdError,
    },
    #[error("eviction request failed")]
    Request(#[source] anyhow::Error),
    #[error("could not read response body")]
    ReadBody(#[source] anyhow::Error),
    #[error("eviction did not complete within {0:?}")]
    Timeout(Duration),
}

/// Runs one node's eviction as a detached task; the outcome is only logged.
pub fn spawn(
    evicter: Arc<dyn Evicter>,
    node: Node,
    jitter: Duration,
    deadline: Duration,
) -> JoinHandle<()> {
    let span = info_span!("evict", node = %node.name);

    tokio::spawn(
        async move {
            if let Err(e) = evict(evicter.as_ref(), &node, jitter, deadline).await {
                let e = anyhow::Error::new(e).context(format!("error evicting {}", node.name));
                error!("{:#}", e);
            }
        }
        .instrument(span),
    )
}

/// Waits `jitter`, then requests the eviction of `node` within `deadline`.
pub async fn evict(
    evicter: &dyn Evicter,
    node: &Node,
    jitter: Duration,
    deadline: Duration,
) -> Result<Eviction, EvictionError> {
    info!("Sleeping {:?} before evicting {}", jitter, node.name);
    // Spread the evictions of a sweep so they do not share a timestamp.
    tokio::time::sleep(jitter).await;

    tokio::time::timeout(deadline, request_eviction(evicter, node))
        .await
        .map_err(|_| EvictionError::Timeout(deadline))?
}

async fn request_eviction(evicter: &dyn Evicter, node: &Node) -> Result<Eviction, EvictionError> {
    if node.provider_id.is_empty() {
        info!(
            "Node {} has no provider ID (perhaps it was already evicted?), returning",
            node.name
        );
        return Ok(Eviction::Skipped);
    }

    // azure:///subscriptions/... -> /subscriptions/...
    let resource_id = strip_provider_prefix(&node.provider_id);
    debug!("Parsing resource ID {}", resource_id);
    let id: VirtualMachineScaleSetVmId =
        resource_id
            .parse()
            .map_err(|e| EvictionError::ResourceId {
                resource_id: resource_id.to_owned(),
                source: e,
            })?;

    info!("Evicting {}", node.name);
    let response = evicter
        .simulate_eviction(&id)
        .await
        .map_err(EvictionError::Request)?;

    let status = response.status;
    let body = response.body.await.map_err(EvictionError::ReadBody)?;

    info!(
        "Eviction of {} got response code {} with body {}",
        node.name,
        status.as_u16(),
        body
    );

    Ok(Eviction::Requested { status, body })
}
