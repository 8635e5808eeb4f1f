use crate::config;
use crate::node::{ConditionStatus, Node};

/// Decides which nodes are eligible eviction targets.
#[derive(Debug, Clone)]
pub struct NodeFilter {
    system_pool_marker: String,
    scheduled_event_condition: String,
}

impl NodeFilter {
    pub fn new(
        system_pool_marker: impl Into<String>,
        scheduled_event_condition: impl Into<String>,
    ) -> Self {
        Self {
            system_pool_marker: system_pool_marker.into(),
            scheduled_event_condition: scheduled_event_condition.into(),
        }
    }

    pub fn from_config(config: &config::Landlord) -> Self {
        Self::new(
            config.system_pool_marker.as_str(),
            config.scheduled_event_condition.as_str(),
        )
    }

    /// Keeps eligible nodes in their original order.
    pub fn filter(&self, nodes: Vec<Node>) -> Vec<Node> {
        nodes.into_iter().filter(|n| self.is_eligible(n)).collect()
    }

    pub fn is_eligible(&self, node: &Node) -> bool {
        // System pool nodes run cluster infrastructure and cannot be evicted.
        if node.name.contains(&self.system_pool_marker) {
            return false;
        }

        !self.has_scheduled_event(node)
    }

    fn has_scheduled_event(&self, node: &Node) -> bool {
        node.has_condition(&self.scheduled_event_condition, ConditionStatus::True)
    }
}
