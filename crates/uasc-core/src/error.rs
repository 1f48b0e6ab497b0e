use std::fmt;
use thiserror::Error;

/// Errors produced by the glyph codec
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A frame field does not fit its bit width, or a context value cannot be packed
    #[error("Encoding error: {0}")]
    EncodingError(String),

    /// The input is not a valid binary frame or URI
    #[error("Decoding error: {0}")]
    DecodingError(String),
}

/// A single structural problem found while validating an execution graph
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphViolation {
    /// No node named `start`
    #[error("Missing 'start' node")]
    MissingStart,

    /// A `next`/`on_true`/`on_false`/`on_error` reference points nowhere
    #[error("Node '{node}' references unknown node '{target}' via '{field}'")]
    DanglingReference {
        /// Node holding the reference
        node: String,
        /// Name of the reference field
        field: &'static str,
        /// Referenced node id
        target: String,
    },

    /// Graph has no node of type `exit`
    #[error("No exit node defined")]
    NoExit,

    /// A condition expression does not parse
    #[error("Node '{node}' has an invalid condition: {reason}")]
    InvalidCondition {
        /// Condition node id
        node: String,
        /// Parser message
        reason: String,
    },
}

impl GraphViolation {
    /// Stable machine-readable code for this violation
    pub fn code(&self) -> &'static str {
        match self {
            GraphViolation::MissingStart => "ERR_GRAPH_MISSING_START",
            GraphViolation::DanglingReference { .. } => "ERR_GRAPH_DANGLING_REFERENCE",
            GraphViolation::NoExit => "ERR_GRAPH_NO_EXIT",
            GraphViolation::InvalidCondition { .. } => "ERR_GRAPH_INVALID_CONDITION",
        }
    }
}

// Helper struct to format a list of violations
struct ViolationList<'a>(&'a [GraphViolation]);

impl fmt::Display for ViolationList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} violation(s):", self.0.len())?;
        for (i, violation) in self.0.iter().enumerate() {
            write!(f, "\n  {}. {}", i + 1, violation)?;
        }
        Ok(())
    }
}

/// Errors raised by registry operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Graph failed validation; carries every violation found
    #[error("Invalid graph '{graph_id}': {}", ViolationList(.violations))]
    InvalidGraph {
        /// Offending graph id
        graph_id: String,
        /// All violations, in discovery order
        violations: Vec<GraphViolation>,
    },

    /// Binding target is not registered
    #[error("Graph '{0}' not found in registry")]
    UnknownGraph(String),

    /// Glyph code outside the dynamic range 0x8000..=0xFFFE
    #[error("Glyph code 0x{0:04X} outside valid range 0x8000-0xFFFE")]
    OutOfRange(u16),

    /// Revocation of a code that was never bound
    #[error("No binding for glyph 0x{0:04X}")]
    UnknownBinding(u16),

    /// Rebinding a revoked code
    #[error("Glyph 0x{0:04X} has been revoked")]
    Revoked(u16),

    /// Validity window is empty or inverted
    #[error("Invalid validity window: {0}")]
    InvalidWindow(String),
}

/// Errors produced while parsing or evaluating a condition expression
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConditionError {
    /// Expression text is malformed
    #[error("Condition parse error at offset {offset}: {message}")]
    Parse {
        /// Byte offset of the problem
        offset: usize,
        /// Description
        message: String,
    },
}

/// Errors produced by the action registry
#[derive(Error, Debug)]
pub enum ActionError {
    /// Operation name is not registered
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// Operation name does not match `segment(.segment)*`
    #[error("Invalid operation name: '{0}'")]
    InvalidOperationName(String),

    /// Operation name already has a handler
    #[error("Operation already registered: {0}")]
    DuplicateOperation(String),

    /// Handler returned an error
    #[error("Action '{operation}' failed: {source}")]
    Handler {
        /// Operation name
        operation: String,
        /// Error returned by the handler
        #[source]
        source: anyhow::Error,
    },

    /// Handler panicked
    #[error("Action '{0}' panicked")]
    Panicked(String),
}

/// Errors that stop an execution; mapped to `rejected` or `failed` results
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// Required graph input has no supplied value and no default
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    /// Walk reached a node id that does not exist
    #[error("Unknown node: {0}")]
    UnknownNode(String),

    /// Entry or action node has no successor
    #[error("Node '{0}' has no successor")]
    NoSuccessor(String),

    /// Action failed and the node declares no `on_error`
    #[error("{0}")]
    Action(String),

    /// Condition could not be evaluated
    #[error("{0}")]
    Condition(#[from] ConditionError),

    /// Iteration cap reached
    #[error("Max iterations exceeded ({0})")]
    MaxIterationsExceeded(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let errors = vec![
            (CodecError::EncodingError("domain".to_string()).to_string(), "Encoding error: domain"),
            (CodecError::DecodingError("short".to_string()).to_string(), "Decoding error: short"),
            (RegistryError::UnknownGraph("g1".to_string()).to_string(), "Graph 'g1' not found in registry"),
            (RegistryError::OutOfRange(0x0042).to_string(), "Glyph code 0x0042 outside valid range 0x8000-0xFFFE"),
            (RegistryError::UnknownBinding(0x8003).to_string(), "No binding for glyph 0x8003"),
            (RegistryError::Revoked(0x8003).to_string(), "Glyph 0x8003 has been revoked"),
            (ExecutionError::MissingParameter("zone".to_string()).to_string(), "Missing required parameter: zone"),
            (ExecutionError::MaxIterationsExceeded(100).to_string(), "Max iterations exceeded (100)"),
        ];

        for (actual, expected) in errors {
            assert_eq!(actual, expected);
        }
    }

    #[test]
    fn test_invalid_graph_lists_every_violation() {
        let error = RegistryError::InvalidGraph {
            graph_id: "broken".to_string(),
            violations: vec![GraphViolation::MissingStart, GraphViolation::NoExit],
        };

        let message = error.to_string();
        assert!(message.contains("2 violation(s)"));
        assert!(message.contains("1. Missing 'start' node"));
        assert!(message.contains("2. No exit node defined"));
    }

    #[test]
    fn test_violation_codes_are_distinct() {
        let codes = [
            GraphViolation::MissingStart.code(),
            GraphViolation::NoExit.code(),
            GraphViolation::DanglingReference {
                node: "a".to_string(),
                field: "next",
                target: "b".to_string(),
            }
            .code(),
            GraphViolation::InvalidCondition {
                node: "c".to_string(),
                reason: "x".to_string(),
            }
            .code(),
        ];
        let unique: std::collections::HashSet<_> = codes.iter().collect();
        assert_eq!(unique.len(), codes.len());
    }
}
