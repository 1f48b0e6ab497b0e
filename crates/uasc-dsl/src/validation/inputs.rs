use super::{error_codes, ValidationError, Validator};
use std::collections::HashSet;
use uasc_core::ExecutionGraph;

/// Checks input/output declarations
#[derive(Debug, Default, Clone, Copy)]
pub struct InputValidator;

impl Validator for InputValidator {
    fn validate(&self, graph: &ExecutionGraph) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        let mut seen = HashSet::new();
        for (i, input) in graph.inputs.iter().enumerate() {
            if !seen.insert(input.name.as_str()) {
                errors.push(ValidationError {
                    code: error_codes::DUPLICATE_ID,
                    message: format!("Duplicate input name: {}", input.name),
                    path: Some(format!("inputs[{}]", i)),
                });
            }

            if let Some(default) = &input.default {
                if !input.value_type.accepts(default) {
                    errors.push(ValidationError {
                        code: error_codes::INVALID_DEFAULT,
                        message: format!(
                            "Default {} for input '{}' does not match declared type {:?}",
                            default, input.name, input.value_type
                        ),
                        path: Some(format!("inputs[{}].default", i)),
                    });
                }
            }
        }

        let mut seen = HashSet::new();
        for (i, output) in graph.outputs.iter().enumerate() {
            if !seen.insert(output.name.as_str()) {
                errors.push(ValidationError {
                    code: error_codes::DUPLICATE_ID,
                    message: format!("Duplicate output name: {}", output.name),
                    path: Some(format!("outputs[{}]", i)),
                });
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_duplicate_and_mistyped_inputs() {
        let graph: ExecutionGraph = serde_json::from_value(json!({
            "graph_id": "g",
            "name": "g",
            "version": "1",
            "domain": "smart_city",
            "inputs": [
                {"name": "zone", "type": "integer", "default": "three"},
                {"name": "zone", "type": "integer"}
            ],
            "outputs": [
                {"name": "ok", "type": "boolean"},
                {"name": "ok", "type": "boolean"}
            ],
            "nodes": {
                "start": {"type": "entry", "next": "end"},
                "end": {"type": "exit"}
            }
        }))
        .unwrap();

        let errors = InputValidator::default().validate(&graph);
        let codes: Vec<&str> = errors.iter().map(|e| e.code).collect();
        assert_eq!(
            codes,
            vec![
                error_codes::INVALID_DEFAULT,
                error_codes::DUPLICATE_ID,
                error_codes::DUPLICATE_ID
            ]
        );
        assert_eq!(errors[0].path.as_deref(), Some("inputs[0].default"));
        assert_eq!(errors[2].path.as_deref(), Some("outputs[1]"));
    }
}
