use crate::error::DslError;
use serde_json::Value;
use uasc_core::ExecutionGraph;

/// Only document version understood by this crate
pub const SUPPORTED_DSL_VERSION: &str = "1.0";

/// Parse a YAML string into an ExecutionGraph.
///
/// This function handles the initial conversion from YAML text to structured data.
/// It does not check graph invariants - that's handled separately by the
/// validation module.
pub fn parse_yaml_document(yaml_str: &str) -> Result<ExecutionGraph, DslError> {
    let document: Value = serde_yaml::from_str(yaml_str)?;
    graph_from_document(document)
}

/// Parse a JSON string into an ExecutionGraph. See [`parse_yaml_document`].
pub fn parse_json_document(json_str: &str) -> Result<ExecutionGraph, DslError> {
    let document: Value = serde_json::from_str(json_str)?;
    graph_from_document(document)
}

fn graph_from_document(mut document: Value) -> Result<ExecutionGraph, DslError> {
    let fields = document.as_object_mut().ok_or_else(|| {
        DslError::InvalidDocument("expected a mapping at the top level".to_string())
    })?;

    // Unquoted `1.0` in YAML arrives as a number
    let version = match fields.remove("dsl_version") {
        None => SUPPORTED_DSL_VERSION.to_string(),
        Some(Value::String(version)) => version,
        Some(other) => other.to_string(),
    };
    if version != SUPPORTED_DSL_VERSION {
        return Err(DslError::UnsupportedVersion(version));
    }

    Ok(serde_json::from_value(document)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        graph_id: minimal-001
        name: minimal
        version: "1.0.0"
        domain: smart_city
        nodes:
          start:
            type: entry
            next: end
          end:
            type: exit
    "#;

    #[test]
    fn test_parse_minimal_document_defaults_version() {
        let graph = parse_yaml_document(MINIMAL).unwrap();
        assert_eq!(graph.graph_id, "minimal-001");
        assert!(graph.inputs.is_empty());
        assert_eq!(graph.nodes.len(), 2);
    }

    #[test]
    fn test_unquoted_version_accepted() {
        let yaml = format!("        dsl_version: 1.0\n{}", MINIMAL.trim_start_matches('\n'));
        assert!(parse_yaml_document(&yaml).is_ok());
    }

    #[test]
    fn test_invalid_yaml_syntax() {
        let yaml = r#"
        graph_id: broken
        nodes: [
          - start  # Incorrect indentation
        "#;

        match parse_yaml_document(yaml).err().unwrap() {
            DslError::YamlError(_) => {}
            err => panic!("Expected YamlError, got {:?}", err),
        }
    }

    #[test]
    fn test_unsupported_dsl_version() {
        let yaml = format!("        dsl_version: \"2.0\"\n{}", MINIMAL.trim_start_matches('\n'));
        match parse_yaml_document(&yaml).err().unwrap() {
            DslError::UnsupportedVersion(version) => assert_eq!(version, "2.0"),
            err => panic!("Expected UnsupportedVersion, got {:?}", err),
        }
    }

    #[test]
    fn test_non_mapping_document() {
        assert!(matches!(
            parse_json_document("[1, 2, 3]"),
            Err(DslError::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_missing_field_reported() {
        let result = parse_json_document(r#"{"graph_id": "g", "nodes": {}}"#);
        assert!(matches!(result, Err(DslError::JsonError(_))));
    }
}
