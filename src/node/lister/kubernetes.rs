use crate::node::lister::NodeLister;
use crate::node::{ConditionStatus, Node, NodeCondition};
use anyhow::Context;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Node as KubeNode;
use kube::api::ListParams;
use kube::config::KubeConfigOptions;
use kube::{Api, Client, Config};
use std::future::Future;
use tracing::{debug, warn};

/// Lists all cluster nodes through the Kubernetes API.
pub struct KubernetesNodeLister {
    api: Api<KubeNode>,
    page_size: u32,
}

impl KubernetesNodeLister {
    pub fn new(client: Client, page_size: u32) -> Self {
        Self {
            api: Api::all(client),
            page_size,
        }
    }
}

/// Connects with the kubeconfig (optionally a specific context) or the in-cluster service account.
pub async fn connect(context: Option<&str>) -> anyhow::Result<Client> {
    let client = match context {
        None => Client::try_default()
            .await
            .context("Failed to infer a Kubernetes config")?,
        Some(context) => {
            let options = KubeConfigOptions {
                context: Some(context.to_owned()),
                ..Default::default()
            };
            let config = Config::from_kubeconfig(&options)
                .await
                .with_context(|| format!("Failed to load kubeconfig context {}", context))?;

            Client::try_from(config)?
        }
    };

    Ok(client)
}

#[async_trait]
impl NodeLister for KubernetesNodeLister {
    #[tracing::instrument(name = "KubernetesNodeLister::list_nodes", skip(self))]
    async fn list_nodes(&self) -> anyhow::Result<Vec<Node>> {
        let api = &self.api;
        let page_size = self.page_size;

        let nodes = list_all_pages(|continue_token| async move {
            let mut params = ListParams::default().limit(page_size);
            if let Some(token) = &continue_token {
                params = params.continue_token(token);
            }

            let list = api.list(&params).await?;

            Ok::<_, kube::Error>(Page {
                items: list.items,
                continue_token: list.metadata.continue_,
            })
        })
        .await?;

        Ok(nodes.into_iter().map(create_node).collect())
    }
}

struct Page<T> {
    items: Vec<T>,
    continue_token: Option<String>,
}

/// Fetches pages until the server stops handing out a continue token.
async fn list_all_pages<T, E, F, Fut>(mut fetch: F) -> Result<Vec<T>, E>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
{
    let mut all_items = vec![];
    let mut continue_token = None;

    loop {
        let mut page = fetch(continue_token.take()).await?;
        all_items.append(&mut page.items);

        match page.continue_token {
            Some(token) if !token.is_empty() => {
                debug!("Fetching next node page");
                continue_token = Some(token);
            }
            _ => break,
        }
    }

    Ok(all_items)
}

fn create_node(node: KubeNode) -> Node {
    let name = node.metadata.name.unwrap_or_default();
    let provider_id = node
        .spec
        .and_then(|spec| spec.provider_id)
        .unwrap_or_default();

    let conditions = node
        .status
        .and_then(|status| status.conditions)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|c| match c.status.parse::<ConditionStatus>() {
            Ok(status) => Some(NodeCondition {
                condition_type: c.type_,
                status,
            }),
            Err(_) => {
                warn!(
                    "Ignoring condition {} of node {} with unexpected status {}",
                    c.type_, name, c.status
                );
                None
            }
        })
        .collect();

    Node {
        name,
        provider_id,
        conditions,
    }
}
