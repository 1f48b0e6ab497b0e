//! Operation name → handler mapping supplied by the embedding application.

use crate::error::ActionError;
use crate::types::ParamMap;
use async_trait::async_trait;
use futures::FutureExt;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error};

lazy_static! {
    // Dotted lowercase segments, e.g. "traffic.emergency_corridor"
    static ref OPERATION_NAME_REGEX: Regex =
        Regex::new(r"^[a-z][a-z0-9_]*(\.[a-z][a-z0-9_]*)*$").unwrap();
}

/// Whether `operation` is a well-formed operation name
pub fn is_valid_operation_name(operation: &str) -> bool {
    OPERATION_NAME_REGEX.is_match(operation)
}

/// A system action invoked by `action` nodes
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// Run the action with resolved parameters
    async fn call(&self, params: ParamMap) -> anyhow::Result<Value>;
}

/// Adapter for synchronous closures
struct FnHandler<F>(F);

#[async_trait]
impl<F> ActionHandler for FnHandler<F>
where
    F: Fn(ParamMap) -> anyhow::Result<Value> + Send + Sync,
{
    async fn call(&self, params: ParamMap) -> anyhow::Result<Value> {
        (self.0)(params)
    }
}

/// Registry of action handlers
#[derive(Default, Clone)]
pub struct ActionRegistry {
    handlers: HashMap<String, Arc<dyn ActionHandler>>,
}

impl ActionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under `operation`
    pub fn register(
        &mut self,
        operation: &str,
        handler: Arc<dyn ActionHandler>,
    ) -> Result<(), ActionError> {
        if !is_valid_operation_name(operation) {
            return Err(ActionError::InvalidOperationName(operation.to_string()));
        }
        if self.handlers.contains_key(operation) {
            return Err(ActionError::DuplicateOperation(operation.to_string()));
        }

        debug!(operation = %operation, "Registered action handler");
        self.handlers.insert(operation.to_string(), handler);
        Ok(())
    }

    /// Register a synchronous closure under `operation`
    pub fn register_fn<F>(&mut self, operation: &str, handler: F) -> Result<(), ActionError>
    where
        F: Fn(ParamMap) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.register(operation, Arc::new(FnHandler(handler)))
    }

    /// Invoke the handler for `operation`.
    ///
    /// Handler errors and panics are returned as [`ActionError`]s.
    pub async fn execute(&self, operation: &str, params: ParamMap) -> Result<Value, ActionError> {
        let handler = self
            .handlers
            .get(operation)
            .cloned()
            .ok_or_else(|| ActionError::UnknownOperation(operation.to_string()))?;

        match AssertUnwindSafe(handler.call(params)).catch_unwind().await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => Err(ActionError::Handler {
                operation: operation.to_string(),
                source,
            }),
            Err(_) => {
                error!(operation = %operation, "Action handler panicked");
                Err(ActionError::Panicked(operation.to_string()))
            }
        }
    }

    /// Whether `operation` has a handler
    pub fn has_handler(&self, operation: &str) -> bool {
        self.handlers.contains_key(operation)
    }

    /// Registered operation names, sorted
    pub fn operations(&self) -> Vec<String> {
        let mut operations: Vec<String> = self.handlers.keys().cloned().collect();
        operations.sort();
        operations
    }

    /// Number of registered handlers
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handlers are registered
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;
    use mockall::predicate::*;
    use serde_json::json;

    mock! {
        Handler {}

        #[async_trait]
        impl ActionHandler for Handler {
            async fn call(&self, params: ParamMap) -> anyhow::Result<Value>;
        }
    }

    fn params(zone: i64) -> ParamMap {
        let mut params = ParamMap::new();
        params.insert("zone".to_string(), json!(zone));
        params
    }

    #[test]
    fn test_operation_names() {
        assert!(is_valid_operation_name("traffic.get_signals"));
        assert!(is_valid_operation_name("system.log"));
        assert!(is_valid_operation_name("ping"));
        assert!(!is_valid_operation_name(""));
        assert!(!is_valid_operation_name("traffic."));
        assert!(!is_valid_operation_name(".traffic"));
        assert!(!is_valid_operation_name("traffic..signals"));
        assert!(!is_valid_operation_name("Traffic.Signals"));
        assert!(!is_valid_operation_name("traffic signals"));
    }

    #[test]
    fn test_register_rejects_duplicates_and_bad_names() {
        let mut registry = ActionRegistry::new();
        registry.register_fn("system.echo", |p| Ok(json!(p))).unwrap();

        assert!(matches!(
            registry.register_fn("system.echo", |_| Ok(Value::Null)),
            Err(ActionError::DuplicateOperation(_))
        ));
        assert!(matches!(
            registry.register_fn("bad name", |_| Ok(Value::Null)),
            Err(ActionError::InvalidOperationName(_))
        ));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_execute_calls_handler_with_params() {
        let mut handler = MockHandler::new();
        handler
            .expect_call()
            .with(eq(params(3)))
            .times(1)
            .returning(|_| Ok(json!({"signal_count": 4})));

        let mut registry = ActionRegistry::new();
        registry
            .register("traffic.get_signals", Arc::new(handler))
            .unwrap();

        let result = registry.execute("traffic.get_signals", params(3)).await.unwrap();
        assert_eq!(result, json!({"signal_count": 4}));
    }

    #[tokio::test]
    async fn test_execute_unknown_operation() {
        let registry = ActionRegistry::new();
        let result = registry.execute("traffic.nope", ParamMap::new()).await;
        assert!(matches!(result, Err(ActionError::UnknownOperation(op)) if op == "traffic.nope"));
    }

    #[tokio::test]
    async fn test_handler_error_is_wrapped() {
        let mut handler = MockHandler::new();
        handler
            .expect_call()
            .returning(|_| Err(anyhow::anyhow!("zone offline")));

        let mut registry = ActionRegistry::new();
        registry.register("traffic.set_timing", Arc::new(handler)).unwrap();

        let error = registry
            .execute("traffic.set_timing", ParamMap::new())
            .await
            .unwrap_err();
        assert_eq!(error.to_string(), "Action 'traffic.set_timing' failed: zone offline");
    }

    #[tokio::test]
    async fn test_handler_panic_is_caught() {
        let mut registry = ActionRegistry::new();
        registry
            .register_fn("system.crash", |_| panic!("boom"))
            .unwrap();

        let result = registry.execute("system.crash", ParamMap::new()).await;
        assert!(matches!(result, Err(ActionError::Panicked(_))));
    }

    #[test]
    fn test_operations_sorted() {
        let mut registry = ActionRegistry::new();
        registry.register_fn("traffic.set_timing", |_| Ok(Value::Null)).unwrap();
        registry.register_fn("system.log", |_| Ok(Value::Null)).unwrap();
        registry.register_fn("traffic.get_signals", |_| Ok(Value::Null)).unwrap();

        assert_eq!(
            registry.operations(),
            vec!["system.log", "traffic.get_signals", "traffic.set_timing"]
        );
        assert!(registry.has_handler("system.log"));
        assert!(!registry.has_handler("system.echo"));
    }
}
