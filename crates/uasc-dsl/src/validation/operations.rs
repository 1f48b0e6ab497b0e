use super::{error_codes, ValidationError, Validator};
use uasc_core::application::actions::is_valid_operation_name;
use uasc_core::{ExecutionGraph, Node};

/// Checks that action nodes name well-formed operations
#[derive(Debug, Default, Clone, Copy)]
pub struct OperationValidator;

impl Validator for OperationValidator {
    fn validate(&self, graph: &ExecutionGraph) -> Vec<ValidationError> {
        graph
            .nodes
            .iter()
            .filter_map(|(node_id, node)| match node {
                Node::Action { operation, .. } if !is_valid_operation_name(operation) => {
                    Some(ValidationError {
                        code: error_codes::INVALID_OPERATION,
                        message: format!("Invalid operation name: '{}'", operation),
                        path: Some(format!("nodes.{}.operation", node_id)),
                    })
                }
                _ => None,
            })
            .collect()
    }
}
