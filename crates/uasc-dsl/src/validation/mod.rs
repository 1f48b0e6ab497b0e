use std::error::Error;
use std::fmt;
use uasc_core::ExecutionGraph;

mod inputs;
mod operations;
mod structure;

/// Represents a validation error found in a graph document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Error code (should be a constant identifier)
    pub code: &'static str,

    /// Human-readable error message
    pub message: String,

    /// Optional path to the location of the error (e.g., "nodes.check.on_true")
    pub path: Option<String>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(path) = &self.path {
            write!(f, "{}: {} (at {})", self.code, self.message, path)
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}

impl Error for ValidationError {}

/// Validation error codes
pub mod error_codes {
    /// No `start` node
    pub const MISSING_START: &str = "ERR_GRAPH_MISSING_START";

    /// A node reference points nowhere
    pub const DANGLING_REFERENCE: &str = "ERR_GRAPH_DANGLING_REFERENCE";

    /// No `exit` node
    pub const NO_EXIT: &str = "ERR_GRAPH_NO_EXIT";

    /// Condition expression does not parse
    pub const INVALID_CONDITION: &str = "ERR_GRAPH_INVALID_CONDITION";

    /// Duplicate input or output name
    pub const DUPLICATE_ID: &str = "ERR_DSL_VALIDATION_DUPLICATE_ID";

    /// Input default does not match its declared type
    pub const INVALID_DEFAULT: &str = "ERR_DSL_VALIDATION_INVALID_DEFAULT";

    /// Operation name is malformed
    pub const INVALID_OPERATION: &str = "ERR_DSL_VALIDATION_INVALID_OPERATION";
}

/// A trait for validators that check specific aspects of a graph
pub trait Validator {
    /// Validate the graph and return a list of validation errors (if any)
    fn validate(&self, graph: &ExecutionGraph) -> Vec<ValidationError>;
}

/// Run every validator and collect all errors
pub fn validate_graph(graph: &ExecutionGraph) -> Vec<ValidationError> {
    let validators: Vec<Box<dyn Validator>> = vec![
        Box::new(structure::StructureValidator),
        Box::new(inputs::InputValidator),
        Box::new(operations::OperationValidator),
    ];

    validators
        .iter()
        .flat_map(|validator| validator.validate(graph))
        .collect()
}
