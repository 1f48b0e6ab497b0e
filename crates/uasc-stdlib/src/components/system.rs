use anyhow::{anyhow, Result};
use serde_json::{json, Value};
use tracing::{debug, error, info, trace, warn};
use uasc_core::{ActionError, ActionRegistry, LogLevel, ParamMap};
use uuid::Uuid;

const LOG_TARGET: &str = "uasc::graph";

/// `system.log`: emit `message` as a tracing event at `level` (default info)
pub fn log(params: ParamMap) -> Result<Value> {
    let level = match params.get("level").and_then(Value::as_str) {
        Some(level) => level.parse::<LogLevel>().map_err(|e| anyhow!(e))?,
        None => LogLevel::Info,
    };
    let message = match params.get("message") {
        Some(Value::String(message)) => message.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };

    match level {
        LogLevel::Trace => trace!(target: LOG_TARGET, "{}", message),
        LogLevel::Debug => debug!(target: LOG_TARGET, "{}", message),
        LogLevel::Info => info!(target: LOG_TARGET, "{}", message),
        LogLevel::Warn => warn!(target: LOG_TARGET, "{}", message),
        LogLevel::Error => error!(target: LOG_TARGET, "{}", message),
    }

    Ok(json!({
        "logged": true,
        "level": level,
        "log_id": Uuid::new_v4().to_string(),
    }))
}

/// `system.echo`: return the resolved parameters unchanged
pub fn echo(params: ParamMap) -> Result<Value> {
    Ok(serde_json::to_value(params)?)
}

/// `system.uuid`: generate a v4 UUID; `format` is one of
/// `standard` (default), `simple`, `urn`
pub fn generate_uuid(params: ParamMap) -> Result<Value> {
    let id = Uuid::new_v4();
    let formatted = match params.get("format").and_then(Value::as_str).unwrap_or("standard") {
        "standard" | "hyphenated" => id.hyphenated().to_string(),
        "simple" => id.simple().to_string(),
        "urn" => id.urn().to_string(),
        other => return Err(anyhow!("Unsupported UUID format: {}", other)),
    };
    Ok(json!({ "uuid": formatted }))
}

/// Register the `system.*` operations
pub fn register_system_actions(registry: &mut ActionRegistry) -> Result<(), ActionError> {
    registry.register_fn("system.log", log)?;
    registry.register_fn("system.echo", echo)?;
    registry.register_fn("system.uuid", generate_uuid)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(value: Value) -> ParamMap {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_log_levels() {
        let result = log(params(json!({"level": "warning", "message": "corridor open"}))).unwrap();
        assert_eq!(result["logged"], true);
        assert_eq!(result["level"], "warn");

        let result = log(ParamMap::new()).unwrap();
        assert_eq!(result["level"], "info");

        assert!(log(params(json!({"level": "loud"}))).is_err());
    }

    #[test]
    fn test_echo_returns_params() {
        let input = params(json!({"message": "pong", "zone": 3}));
        let result = echo(input).unwrap();
        assert_eq!(result, json!({"message": "pong", "zone": 3}));
    }

    #[test]
    fn test_uuid_formats() {
        let standard = generate_uuid(ParamMap::new()).unwrap();
        assert_eq!(standard["uuid"].as_str().unwrap().len(), 36);

        let simple = generate_uuid(params(json!({"format": "simple"}))).unwrap();
        assert_eq!(simple["uuid"].as_str().unwrap().len(), 32);

        let urn = generate_uuid(params(json!({"format": "urn"}))).unwrap();
        assert!(urn["uuid"].as_str().unwrap().starts_with("urn:uuid:"));

        assert!(generate_uuid(params(json!({"format": "base64"}))).is_err());
    }
}
