pub mod filter;
pub mod lister;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

pub use filter::NodeFilter;
pub use lister::NodeLister;

/// Snapshot of one cluster worker node as seen by a single sweep.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Node {
    pub name: String,
    /// Backing cloud instance, empty until the cloud provider assigned one.
    #[serde(default)]
    pub provider_id: String,
    #[serde(default)]
    pub conditions: Vec<NodeCondition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NodeCondition {
    #[serde(rename = "type")]
    pub condition_type: String,
    pub status: ConditionStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Display, EnumString)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl Node {
    pub fn has_condition(&self, condition_type: &str, status: ConditionStatus) -> bool {
        self.conditions
            .iter()
            .any(|c| c.condition_type == condition_type && c.status == status)
    }
}
