use serde::{Deserialize, Serialize};

/// The static analysis view of a flow tree.
///
/// `Schematic` is the graph extracted from a [`Flow`](crate::flow::Flow) builder.
/// It is used for inspection and debugging; evaluation never reads it.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Schematic {
    pub name: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Schematic {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Adds a node and returns its id.
    pub fn add_node(&mut self, kind: NodeKind, label: impl Into<String>) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.nodes.push(Node {
            id: id.clone(),
            kind,
            label: label.into(),
        });
        id
    }

    pub fn connect(&mut self, from: &str, to: &str, label: Option<String>) {
        self.edges.push(Edge {
            from: from.to_string(),
            to: to.to_string(),
            label,
        });
    }

    pub fn count(&self, kind: NodeKind) -> usize {
        self.nodes.iter().filter(|n| n.kind == kind).count()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String, // Uuid
    pub kind: NodeKind,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Root,        // Entry of the tree
    Guard,       // Guarded sub-flow
    Transform,   // Pre/post processing stage
    Delegate,    // Plain sub-flow
    Responder,   // Terminal: synthesized answer
    PassThrough, // Terminal: suspension to the driver
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub label: Option<String>, // e.g. "branch 0"
}
