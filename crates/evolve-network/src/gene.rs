//! Node and connection genes.

use serde::{Deserialize, Serialize};

/// Identifier of a node gene. Stable across genomes of the same run.
pub type NodeId = u32;

/// Historical marking of a connection gene.
pub type Innovation = u32;

/// Role of a node inside the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Input,
    Hidden,
    Output,
}

/// A node gene. Identity is `id`; only `bias` changes after creation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeGene {
    pub id: NodeId,
    pub node_type: NodeType,
    #[serde(default)]
    pub bias: f32,
}

impl NodeGene {
    #[must_use]
    pub fn new(id: NodeId, node_type: NodeType) -> Self {
        Self {
            id,
            node_type,
            bias: 0.0,
        }
    }
}

/// A connection gene. Identity is `innovation`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConnectionGene {
    pub in_id: NodeId,
    pub out_id: NodeId,
    pub weight: f32,
    pub innovation: Innovation,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}
