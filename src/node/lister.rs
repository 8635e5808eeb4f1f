mod file;
pub mod kubernetes;

use crate::node::Node;
use crate::{config, AppConfig};
use async_trait::async_trait;
use std::sync::Arc;

pub use file::FileNodeLister;
pub use kubernetes::KubernetesNodeLister;

/// Enumerates the full, unfiltered set of cluster nodes.
#[async_trait]
pub trait NodeLister: Send + Sync {
    async fn list_nodes(&self) -> anyhow::Result<Vec<Node>>;
}

pub async fn build_from_config(config: AppConfig) -> anyhow::Result<Arc<dyn NodeLister>> {
    Ok(match &config.node_lister {
        config::NodeLister::Kubernetes { context, page_size } => {
            let client = kubernetes::connect(context.as_deref()).await?;

            Arc::new(KubernetesNodeLister::new(client, *page_size))
        }
        config::NodeLister::File { path } => Arc::new(FileNodeLister::new(path)),
    })
}
