use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;
use uasc_dsl::{load_graph_dir, load_graph_file, parse_graph_json, DslError};

const ZONE_GRAPH_YAML: &str = r#"
dsl_version: "1.0"
graph_id: zone-optimization-001
name: zone_traffic_optimization
version: "1.0.0"
domain: smart_city
inputs:
  - name: zone
    type: integer
    required: true
  - name: duration_seconds
    type: integer
    default: 30
outputs:
  - name: signals_updated
    type: integer
nodes:
  start:
    type: entry
    next: get_signals
  get_signals:
    type: action
    operation: traffic.get_signals
    params:
      zone: inputs.zone
    next: check_congestion
  check_congestion:
    type: action
    operation: traffic.get_congestion
    params:
      zone: inputs.zone
    next: evaluate
  evaluate:
    type: condition
    expression: "check_congestion.level > 0.7"
    on_true: optimize
    on_false: done
  optimize:
    type: action
    operation: traffic.set_timing
    params:
      zone: inputs.zone
      duration: inputs.duration_seconds
    next: done
  done:
    type: exit
    outputs:
      signals_updated: get_signals.signal_count
constraints:
  max_execution_time_ms: 5000
"#;

const PING_GRAPH_JSON: &str = r#"{
  "graph_id": "ping-001",
  "name": "ping",
  "version": "1.0.0",
  "domain": "telecom",
  "nodes": {
    "start": {"type": "entry", "next": "echo"},
    "echo": {"type": "action", "operation": "system.echo", "params": {"message": "pong"}, "next": "done"},
    "done": {"type": "exit", "outputs": {"reply": "echo.message"}}
  }
}"#;

#[test]
fn test_load_yaml_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("zone.yaml");
    fs::write(&path, ZONE_GRAPH_YAML).unwrap();

    let graph = load_graph_file(&path).unwrap();
    assert_eq!(graph.graph_id, "zone-optimization-001");
    assert_eq!(graph.constraints.max_execution_time_ms, Some(5000));
    assert_eq!(
        graph.operations(),
        vec![
            "traffic.get_congestion".to_string(),
            "traffic.get_signals".to_string(),
            "traffic.set_timing".to_string()
        ]
    );
}

#[test]
fn test_json_and_yaml_agree() {
    let from_json = parse_graph_json(PING_GRAPH_JSON).unwrap();
    let yaml = serde_yaml::to_string(&from_json).unwrap();
    let from_yaml = uasc_dsl::parse_graph_yaml(&yaml).unwrap();
    assert_eq!(from_json, from_yaml);
    assert_eq!(from_json.checksum(), from_yaml.checksum());
}

#[test]
fn test_load_dir_sorted_and_filtered() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("b_zone.yml"), ZONE_GRAPH_YAML).unwrap();
    fs::write(dir.path().join("a_ping.json"), PING_GRAPH_JSON).unwrap();
    fs::write(dir.path().join("README.md"), "# not a graph").unwrap();
    fs::create_dir(dir.path().join("nested.yaml")).unwrap();

    let graphs = load_graph_dir(dir.path()).unwrap();
    let ids: Vec<&str> = graphs.iter().map(|g| g.graph_id.as_str()).collect();
    assert_eq!(ids, vec!["ping-001", "zone-optimization-001"]);
}

#[test]
fn test_invalid_file_in_dir_fails_load() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("ok.json"), PING_GRAPH_JSON).unwrap();
    fs::write(
        dir.path().join("broken.yaml"),
        "graph_id: broken\nname: broken\nversion: \"1\"\ndomain: x\nnodes: {}\n",
    )
    .unwrap();

    let error = load_graph_dir(dir.path()).unwrap_err();
    assert!(matches!(error, DslError::MultipleValidationErrors(_)));
}

#[test]
fn test_unsupported_extension() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("graph.toml");
    fs::write(&path, "graph_id = 'x'").unwrap();

    let error = load_graph_file(&path).unwrap_err();
    assert_eq!(error.error_code(), "ERR_DSL_UNSUPPORTED_FORMAT");
}

#[test]
fn test_missing_file() {
    let error = load_graph_file("/definitely/not/here.yaml").unwrap_err();
    assert!(matches!(error, DslError::Io { .. }));
}
