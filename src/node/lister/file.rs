use crate::node::lister::NodeLister;
use crate::node::Node;
use anyhow::Context;
use async_trait::async_trait;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Reads nodes from a YAML file on every listing.
pub struct FileNodeLister {
    path: PathBuf,
}

impl FileNodeLister {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().into(),
        }
    }
}

#[async_trait]
impl NodeLister for FileNodeLister {
    #[tracing::instrument(name = "FileNodeLister::list_nodes", skip(self), fields(path = %self.path.to_string_lossy()))]
    async fn list_nodes(&self) -> anyhow::Result<Vec<Node>> {
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || parse_node_file(&path))
            .await
            .context("Node file reader panicked")?
    }
}

fn parse_node_file(path: impl AsRef<Path>) -> anyhow::Result<Vec<Node>> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("Failed to open node file {:?}", path))?;
    let reader = BufReader::new(file);
    let result = serde_yaml::from_reader(reader)
        .with_context(|| format!("Failed to parse node file {:?}", path))?;

    Ok(result)
}
