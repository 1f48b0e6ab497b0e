//! # UASC DSL
//!
//! Execution graphs are authored as YAML (or JSON) documents: an optional
//! `dsl_version` followed by the graph fields at the top level. This crate
//! parses those documents into [`uasc_core::ExecutionGraph`] values and
//! reports every structural problem it finds.
//!
//! ## Example
//!
//! ```
//! use uasc_dsl::parse_and_validate_graph;
//!
//! let yaml = r#"
//! dsl_version: "1.0"
//! graph_id: ping-001
//! name: ping
//! version: "1.0.0"
//! domain: smart_city
//! nodes:
//!   start:
//!     type: entry
//!     next: echo
//!   echo:
//!     type: action
//!     operation: system.echo
//!     params:
//!       message: pong
//!     next: done
//!   done:
//!     type: exit
//!     outputs:
//!       reply: echo.message
//! "#;
//!
//! let graph = parse_and_validate_graph(yaml).unwrap();
//! assert_eq!(graph.graph_id, "ping-001");
//! ```

mod error;
mod parser;

pub mod validation;

pub use error::DslError;
pub use parser::SUPPORTED_DSL_VERSION;
pub use validation::ValidationError;

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uasc_core::ExecutionGraph;

/// Parse a YAML graph document without checking graph invariants
pub fn parse_graph_yaml(yaml_str: &str) -> Result<ExecutionGraph, DslError> {
    parser::parse_yaml_document(yaml_str)
}

/// Parse a JSON graph document without checking graph invariants
pub fn parse_graph_json(json_str: &str) -> Result<ExecutionGraph, DslError> {
    parser::parse_json_document(json_str)
}

/// Run every validator over a parsed graph
pub fn validate_graph(graph: &ExecutionGraph) -> Result<(), DslError> {
    let errors = validation::validate_graph(graph);
    if !errors.is_empty() {
        return Err(DslError::from_validation_errors(errors));
    }
    Ok(())
}

/// Parse and validate a YAML graph document.
///
/// # Errors
///
/// This function can fail for several reasons:
/// * Invalid YAML syntax or missing graph fields
/// * Unsupported DSL version
/// * Validation errors (missing start/exit nodes, dangling references,
///   malformed conditions or operation names, bad input declarations);
///   all of them are reported together
///
/// ```
/// use uasc_dsl::{parse_and_validate_graph, DslError};
///
/// let yaml = r#"
/// graph_id: broken-001
/// name: broken
/// version: "1.0.0"
/// domain: smart_city
/// nodes:
///   begin:
///     type: entry
///     next: nowhere
/// "#;
///
/// let error = parse_and_validate_graph(yaml).unwrap_err();
/// assert!(matches!(error, DslError::MultipleValidationErrors(_)));
/// assert_eq!(error.validation_errors().len(), 3);
/// ```
pub fn parse_and_validate_graph(yaml_str: &str) -> Result<ExecutionGraph, DslError> {
    // First parse the YAML string into a graph
    let graph = parser::parse_yaml_document(yaml_str)?;

    // Then run all validations
    validate_graph(&graph)?;

    Ok(graph)
}

/// Load and validate one graph file; the format follows the extension
pub fn load_graph_file(path: impl AsRef<Path>) -> Result<ExecutionGraph, DslError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| DslError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let graph = match extension(path).as_deref() {
        Some("yaml") | Some("yml") => parser::parse_yaml_document(&contents)?,
        Some("json") => parser::parse_json_document(&contents)?,
        _ => return Err(DslError::UnsupportedFormat(path.to_path_buf())),
    };
    validate_graph(&graph)?;

    debug!(path = %path.display(), graph_id = %graph.graph_id, "Loaded graph file");
    Ok(graph)
}

/// Load and validate every `.yaml`, `.yml` and `.json` file in `dir`,
/// in file name order. Other files are skipped.
pub fn load_graph_dir(dir: impl AsRef<Path>) -> Result<Vec<ExecutionGraph>, DslError> {
    let dir = dir.as_ref();
    let entries = fs::read_dir(dir).map_err(|source| DslError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| DslError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let is_graph = matches!(extension(&path).as_deref(), Some("yaml" | "yml" | "json"));
        if path.is_file() && is_graph {
            paths.push(path);
        }
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let graphs = paths
        .iter()
        .map(|path| load_graph_file(path))
        .collect::<Result<Vec<_>, _>>()?;

    info!(dir = %dir.display(), count = graphs.len(), "Loaded graph directory");
    Ok(graphs)
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Returns a version string for the UASC DSL crate
///
/// ```
/// use uasc_dsl::version;
///
/// assert!(version().starts_with("0."));
/// ```
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::error_codes;

    #[test]
    fn test_parse_valid_document() {
        let yaml = r#"
        dsl_version: "1.0"
        graph_id: emergency-priority-001
        name: emergency_vehicle_priority
        version: "1.0.0"
        domain: smart_city
        inputs:
          - name: zone
            type: integer
            required: true
        nodes:
          start:
            type: entry
            next: check
          check:
            type: condition
            expression: "zone >= 0"
            on_true: done
            on_false: done
          done:
            type: exit
        "#;

        let result = parse_and_validate_graph(yaml);
        assert!(result.is_ok(), "Failed to parse valid document: {:?}", result.err());
        assert_eq!(result.unwrap().inputs.len(), 1);
    }

    #[test]
    fn test_every_violation_reported() {
        let yaml = r#"
        graph_id: broken
        name: broken
        version: "1"
        domain: smart_city
        nodes:
          begin:
            type: action
            operation: "Not Valid"
            next: nowhere
        "#;

        let error = parse_and_validate_graph(yaml).unwrap_err();
        let codes: Vec<&str> = error.validation_errors().iter().map(|e| e.code).collect();
        assert_eq!(
            codes,
            vec![
                error_codes::MISSING_START,
                error_codes::DANGLING_REFERENCE,
                error_codes::NO_EXIT,
                error_codes::INVALID_OPERATION,
            ]
        );
    }

    #[test]
    fn test_single_violation_is_not_wrapped() {
        let yaml = r#"
        graph_id: no-exit
        name: no-exit
        version: "1"
        domain: smart_city
        nodes:
          start:
            type: entry
        "#;

        let error = parse_and_validate_graph(yaml).unwrap_err();
        assert_eq!(error.error_code(), error_codes::NO_EXIT);
    }
}
