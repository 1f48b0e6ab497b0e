use super::{ValidationError, Validator};
use uasc_core::{ExecutionGraph, GraphViolation};

/// Maps the core graph invariants onto located validation errors
#[derive(Debug, Default, Clone, Copy)]
pub struct StructureValidator;

impl Validator for StructureValidator {
    fn validate(&self, graph: &ExecutionGraph) -> Vec<ValidationError> {
        graph
            .validate()
            .into_iter()
            .map(|violation| {
                let path = match &violation {
                    GraphViolation::MissingStart | GraphViolation::NoExit => {
                        Some("nodes".to_string())
                    }
                    GraphViolation::DanglingReference { node, field, .. } => {
                        Some(format!("nodes.{}.{}", node, field))
                    }
                    GraphViolation::InvalidCondition { node, .. } => {
                        Some(format!("nodes.{}.expression", node))
                    }
                };
                ValidationError {
                    code: violation.code(),
                    message: violation.to_string(),
                    path,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::error_codes;
    use serde_json::json;

    #[test]
    fn test_paths_point_at_offending_field() {
        let graph: ExecutionGraph = serde_json::from_value(json!({
            "graph_id": "g",
            "name": "g",
            "version": "1",
            "domain": "smart_city",
            "nodes": {
                "start": {"type": "entry", "next": "check"},
                "check": {
                    "type": "condition",
                    "expression": "zone >",
                    "on_true": "gone",
                    "on_false": "end"
                },
                "end": {"type": "exit"}
            }
        }))
        .unwrap();

        let errors = StructureValidator::default().validate(&graph);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].code, error_codes::DANGLING_REFERENCE);
        assert_eq!(errors[0].path.as_deref(), Some("nodes.check.on_true"));
        assert_eq!(errors[1].code, error_codes::INVALID_CONDITION);
        assert_eq!(errors[1].path.as_deref(), Some("nodes.check.expression"));
    }
}
