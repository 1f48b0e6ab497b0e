use crate::domain::condition::ConditionScope;
use crate::domain::glyph::GlyphFrame;
use crate::domain::graph::ExecutionGraph;
use crate::error::ExecutionError;
use crate::types::ParamMap;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Reference prefix for execution parameters
pub const INPUTS_PREFIX: &str = "inputs.";

/// Facts about the request, available for logging and auditing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    /// RFC 3339 time the context was built
    pub timestamp: String,
    /// Symbolic token of the frame
    pub glyph: String,
    /// Opcode as `0xXXXX`
    pub glyph_code: String,
    /// Domain code
    pub domain: u8,
    /// Authority id
    pub authority: u16,
}

/// Mutable state of a single graph walk
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionContext {
    /// Frame context merged with input defaults
    pub parameters: ParamMap,
    /// Request facts
    pub system: SystemInfo,
    /// Result of each action node executed so far
    pub node_results: BTreeMap<String, Value>,
}

impl ExecutionContext {
    /// Build a context from a frame and the graph it resolves to.
    ///
    /// Frame context wins over defaults. A required input that is neither
    /// supplied nor defaulted fails with [`ExecutionError::MissingParameter`].
    pub fn build(frame: &GlyphFrame, graph: &ExecutionGraph) -> Result<Self, ExecutionError> {
        let mut parameters = frame.context.clone().unwrap_or_default();

        for input in &graph.inputs {
            if parameters.contains_key(&input.name) {
                continue;
            }
            match &input.default {
                Some(default) => {
                    parameters.insert(input.name.clone(), default.clone());
                }
                None if input.required => {
                    return Err(ExecutionError::MissingParameter(input.name.clone()));
                }
                None => {}
            }
        }

        Ok(Self {
            parameters,
            system: SystemInfo {
                timestamp: Utc::now().to_rfc3339(),
                glyph: frame.token(),
                glyph_code: format!("0x{:04X}", frame.glyph_code),
                domain: frame.domain.code(),
                authority: frame.authority,
            },
            node_results: BTreeMap::new(),
        })
    }

    /// Resolve one value.
    ///
    /// `inputs.<name>` reads a parameter; any other string containing `.`
    /// reads `<node_id>.<key>` from a node result (the whole result when it
    /// is not a map); everything else is returned as-is.
    pub fn resolve_value(&self, value: &Value) -> Value {
        let reference = match value {
            Value::String(s) => s,
            other => return other.clone(),
        };

        if let Some(name) = reference.strip_prefix(INPUTS_PREFIX) {
            return self.parameters.get(name).cloned().unwrap_or(Value::Null);
        }

        match reference.split_once('.') {
            Some((node_id, key)) => match self.node_results.get(node_id) {
                Some(Value::Object(map)) => map.get(key).cloned().unwrap_or(Value::Null),
                Some(other) => other.clone(),
                None => Value::Null,
            },
            None => value.clone(),
        }
    }

    /// Resolve every value of a params or outputs map
    pub fn resolve_params(&self, params: &ParamMap) -> ParamMap {
        params
            .iter()
            .map(|(key, value)| (key.clone(), self.resolve_value(value)))
            .collect()
    }

    /// Record the result of an action node
    pub fn record_result(&mut self, node_id: &str, result: Value) {
        self.node_results.insert(node_id.to_string(), result);
    }

    /// View for condition evaluation
    pub fn scope(&self) -> ConditionScope<'_> {
        ConditionScope {
            parameters: &self.parameters,
            node_results: &self.node_results,
        }
    }
}
