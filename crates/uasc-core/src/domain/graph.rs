use crate::domain::condition::Condition;
use crate::error::GraphViolation;
use crate::types::{ParamMap, ValueType};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Node every walk starts from
pub const START_NODE: &str = "start";

/// Declared graph input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputDecl {
    /// Parameter name
    pub name: String,

    /// Declared type
    #[serde(rename = "type", default)]
    pub value_type: ValueType,

    /// Whether the caller must supply this parameter
    #[serde(default)]
    pub required: bool,

    /// Value used when the caller omits the parameter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// Declared graph output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputDecl {
    /// Output name
    pub name: String,

    /// Declared type
    #[serde(rename = "type", default)]
    pub value_type: ValueType,
}

/// Execution constraints attached to a graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    /// Soft budget for a single execution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_execution_time_ms: Option<u64>,
}

/// A node in an execution graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Node {
    /// Entry point
    Entry {
        /// Successor
        #[serde(default)]
        next: Option<String>,
    },

    /// Calls an action handler
    Action {
        /// Registered operation name
        operation: String,
        /// Parameters, resolved against the execution context before the call
        #[serde(default)]
        params: ParamMap,
        /// Successor on success
        #[serde(default)]
        next: Option<String>,
        /// Successor on handler failure
        #[serde(default, skip_serializing_if = "Option::is_none")]
        on_error: Option<String>,
    },

    /// Two-way branch
    Condition {
        /// Expression in the condition grammar
        expression: String,
        /// Successor when the expression holds
        on_true: String,
        /// Successor otherwise
        on_false: String,
    },

    /// Terminal node
    Exit {
        /// Output values, resolved against the execution context
        #[serde(default)]
        outputs: ParamMap,
    },
}

impl Node {
    /// Lowercase node kind, as it appears in graph documents
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Entry { .. } => "entry",
            Node::Action { .. } => "action",
            Node::Condition { .. } => "condition",
            Node::Exit { .. } => "exit",
        }
    }

    /// Outgoing references as `(field, target)` pairs
    pub fn references(&self) -> Vec<(&'static str, &str)> {
        let mut refs = Vec::new();
        match self {
            Node::Entry { next } => {
                if let Some(next) = next {
                    refs.push(("next", next.as_str()));
                }
            }
            Node::Action { next, on_error, .. } => {
                if let Some(next) = next {
                    refs.push(("next", next.as_str()));
                }
                if let Some(on_error) = on_error {
                    refs.push(("on_error", on_error.as_str()));
                }
            }
            Node::Condition {
                on_true, on_false, ..
            } => {
                refs.push(("on_true", on_true.as_str()));
                refs.push(("on_false", on_false.as_str()));
            }
            Node::Exit { .. } => {}
        }
        refs
    }
}

/// A versioned, validated workflow bound to one or more glyph codes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionGraph {
    /// Unique identifier
    pub graph_id: String,

    /// Human-readable name
    pub name: String,

    /// Version string
    pub version: String,

    /// Domain tag
    pub domain: String,

    /// Ordered input declarations
    #[serde(default)]
    pub inputs: Vec<InputDecl>,

    /// Output declarations
    #[serde(default)]
    pub outputs: Vec<OutputDecl>,

    /// Nodes by id
    pub nodes: BTreeMap<String, Node>,

    /// Free-form error handling policy
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub error_handling: ParamMap,

    /// Execution constraints
    #[serde(default)]
    pub constraints: Constraints,
}

impl ExecutionGraph {
    /// Check structural invariants, returning every violation found
    pub fn validate(&self) -> Vec<GraphViolation> {
        let mut violations = Vec::new();

        if !self.nodes.contains_key(START_NODE) {
            violations.push(GraphViolation::MissingStart);
        }

        for (node_id, node) in &self.nodes {
            for (field, target) in node.references() {
                if !self.nodes.contains_key(target) {
                    violations.push(GraphViolation::DanglingReference {
                        node: node_id.clone(),
                        field,
                        target: target.to_string(),
                    });
                }
            }

            if let Node::Condition { expression, .. } = node {
                if let Err(e) = Condition::parse(expression) {
                    violations.push(GraphViolation::InvalidCondition {
                        node: node_id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if !self.nodes.values().any(|n| matches!(n, Node::Exit { .. })) {
            violations.push(GraphViolation::NoExit);
        }

        violations
    }

    /// Whether [`ExecutionGraph::validate`] finds nothing
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// First 16 hex chars of SHA-256 over canonical JSON of id, version and nodes
    pub fn checksum(&self) -> String {
        // serde_json::Value maps are sorted, so this is canonical
        let canonical = serde_json::json!({
            "graph_id": self.graph_id,
            "version": self.version,
            "nodes": self.nodes,
        });
        let digest = Sha256::digest(canonical.to_string().as_bytes());
        hex::encode(digest)[..16].to_string()
    }

    /// Look up a node
    pub fn node(&self, node_id: &str) -> Option<&Node> {
        self.nodes.get(node_id)
    }

    /// Operation names referenced by action nodes, sorted and deduplicated
    pub fn operations(&self) -> Vec<String> {
        let mut operations: Vec<String> = self
            .nodes
            .values()
            .filter_map(|node| match node {
                Node::Action { operation, .. } => Some(operation.clone()),
                _ => None,
            })
            .collect();
        operations.sort();
        operations.dedup();
        operations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample_graph() -> ExecutionGraph {
        serde_json::from_value(json!({
            "graph_id": "sample-001",
            "name": "sample",
            "version": "1.0.0",
            "domain": "smart_city",
            "inputs": [
                {"name": "zone", "type": "integer", "required": true},
                {"name": "priority", "type": "integer", "default": 5}
            ],
            "outputs": [{"name": "done", "type": "boolean"}],
            "nodes": {
                "start": {"type": "entry", "next": "check"},
                "check": {
                    "type": "condition",
                    "expression": "priority >= 3",
                    "on_true": "act",
                    "on_false": "done"
                },
                "act": {
                    "type": "action",
                    "operation": "traffic.get_signals",
                    "params": {"zone": "inputs.zone"},
                    "next": "done"
                },
                "done": {"type": "exit", "outputs": {"done": true}}
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_deserialize_graph() {
        let graph = sample_graph();
        assert_eq!(graph.inputs.len(), 2);
        assert!(graph.inputs[0].required);
        assert_eq!(graph.inputs[1].default, Some(json!(5)));
        assert_eq!(graph.inputs[1].value_type, ValueType::Integer);
        assert_eq!(graph.node("start").map(Node::kind), Some("entry"));
        assert_eq!(graph.constraints, Constraints::default());
        assert!(graph.is_valid());
    }

    #[test]
    fn test_validate_collects_every_violation() {
        let mut graph = sample_graph();
        graph.nodes.remove("start");
        graph.nodes.remove("done");
        graph.nodes.insert(
            "bad".to_string(),
            Node::Condition {
                expression: "priority >".to_string(),
                on_true: "act".to_string(),
                on_false: "act".to_string(),
            },
        );

        let violations = graph.validate();
        let codes: Vec<&str> = violations.iter().map(|v| v.code()).collect();
        assert_eq!(
            codes,
            vec![
                "ERR_GRAPH_MISSING_START",
                "ERR_GRAPH_DANGLING_REFERENCE",
                "ERR_GRAPH_INVALID_CONDITION",
                "ERR_GRAPH_DANGLING_REFERENCE",
                "ERR_GRAPH_NO_EXIT",
            ]
        );
        assert_eq!(
            violations[1],
            GraphViolation::DanglingReference {
                node: "act".to_string(),
                field: "next",
                target: "done".to_string(),
            }
        );
    }

    #[test]
    fn test_checksum_is_stable_and_content_sensitive() {
        let graph = sample_graph();
        let checksum = graph.checksum();
        assert_eq!(checksum.len(), 16);
        assert_eq!(checksum, sample_graph().checksum());

        let mut renamed = sample_graph();
        renamed.name = "other name".to_string();
        assert_eq!(renamed.checksum(), checksum);

        let mut bumped = sample_graph();
        bumped.version = "1.0.1".to_string();
        assert_ne!(bumped.checksum(), checksum);
    }

    #[test]
    fn test_operations() {
        assert_eq!(sample_graph().operations(), vec!["traffic.get_signals".to_string()]);
    }

    #[test]
    fn test_unknown_node_type_rejected() {
        let result: Result<Node, _> = serde_json::from_value(json!({"type": "loop"}));
        assert!(result.is_err());
    }
}
