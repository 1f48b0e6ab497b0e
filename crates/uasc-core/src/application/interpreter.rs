//! Frame execution: trust, graph resolution and the graph walk.

use crate::application::actions::ActionRegistry;
use crate::application::context::ExecutionContext;
use crate::domain::condition::{ConditionEvaluator, ExpressionEvaluator};
use crate::domain::glyph::GlyphFrame;
use crate::domain::graph::{ExecutionGraph, Node, START_NODE};
use crate::domain::registry::Registry;
use crate::domain::trust::TrustVerifier;
use crate::error::ExecutionError;
use crate::types::ParamMap;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Default cap on node visits per execution
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Outcome class of an execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    /// Walk reached an exit node
    Success,
    /// Walk started but could not complete
    Failed,
    /// Request refused before the walk started
    Rejected,
}

impl ExecutionStatus {
    /// Lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Success => "success",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`Interpreter::execute`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Outcome
    pub status: ExecutionStatus,
    /// Resolved exit outputs; empty unless successful
    pub outputs: ParamMap,
    /// Wall time spent in `execute`
    pub execution_time_ms: u64,
    /// Visited node ids in order, including the failing node
    pub node_trace: Vec<String>,
    /// Reason for rejection or failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    /// Whether the execution succeeded
    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }

    fn rejected(reason: String, started: Instant) -> Self {
        Self {
            status: ExecutionStatus::Rejected,
            outputs: ParamMap::new(),
            execution_time_ms: elapsed_ms(started),
            node_trace: Vec::new(),
            error: Some(reason),
        }
    }
}

/// Summary of one execution, kept for auditing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
    /// Unique id of this execution
    pub execution_id: Uuid,
    /// When the execution finished
    pub timestamp: DateTime<Utc>,
    /// Symbolic token of the frame
    pub glyph: String,
    /// Opcode as `0xXXXX`
    pub glyph_code: String,
    /// Verified authority name; empty when trust was not established
    pub authority: String,
    /// Outcome
    pub status: ExecutionStatus,
    /// Wall time
    pub execution_time_ms: u64,
    /// Length of the node trace
    pub node_count: usize,
    /// Reason for rejection or failure
    pub error: Option<String>,
}

/// Executes glyph frames against a registry, trust store and action registry
pub struct Interpreter {
    registry: Arc<Registry>,
    trust: Arc<TrustVerifier>,
    actions: Arc<ActionRegistry>,
    conditions: Arc<dyn ConditionEvaluator>,
    max_iterations: usize,
    execution_log: Mutex<Vec<ExecutionLogEntry>>,
}

impl Interpreter {
    /// Create an interpreter with the default condition evaluator and cap
    pub fn new(
        registry: Arc<Registry>,
        trust: Arc<TrustVerifier>,
        actions: Arc<ActionRegistry>,
    ) -> Self {
        Self {
            registry,
            trust,
            actions,
            conditions: Arc::new(ExpressionEvaluator),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            execution_log: Mutex::new(Vec::new()),
        }
    }

    /// Override the node visit cap
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Override the condition evaluator
    pub fn with_condition_evaluator(mut self, evaluator: Arc<dyn ConditionEvaluator>) -> Self {
        self.conditions = evaluator;
        self
    }

    /// Node visit cap
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Execute a frame. Never fails; problems are reported in the result.
    pub async fn execute(&self, frame: &GlyphFrame) -> ExecutionResult {
        let span = info_span!(
            "execute",
            glyph = %frame.token(),
            address = %frame.full_address()
        );

        async move {
            let started = Instant::now();
            let (result, authority_name) = self.run(frame, started).await;

            match result.status {
                ExecutionStatus::Success => info!(
                    elapsed_ms = result.execution_time_ms,
                    nodes = result.node_trace.len(),
                    "Execution succeeded"
                ),
                status => warn!(
                    status = %status,
                    error = result.error.as_deref().unwrap_or(""),
                    "Execution did not succeed"
                ),
            }

            self.log_execution(frame, &result, authority_name);
            result
        }
        .instrument(span)
        .await
    }

    async fn run(&self, frame: &GlyphFrame, started: Instant) -> (ExecutionResult, String) {
        let binding = match self.registry.get_binding(frame.glyph_code) {
            Some(binding) => binding,
            None => {
                let reason = format!("No binding for glyph 0x{:04X}", frame.glyph_code);
                return (ExecutionResult::rejected(reason, started), String::new());
            }
        };

        let verification = self
            .trust
            .verify(frame.domain, frame.authority, &binding.signature);
        if !verification.valid {
            let reason = format!("Trust verification failed: {}", verification.reason);
            return (ExecutionResult::rejected(reason, started), String::new());
        }
        let authority_name = verification.authority_name;

        let graph = match self.registry.lookup(frame.glyph_code) {
            Some(graph) => graph,
            None => {
                let reason = "Execution graph not found, expired or revoked".to_string();
                return (ExecutionResult::rejected(reason, started), authority_name);
            }
        };

        let mut context = match ExecutionContext::build(frame, &graph) {
            Ok(context) => context,
            Err(e) => return (ExecutionResult::rejected(e.to_string(), started), authority_name),
        };

        let mut trace = Vec::new();
        let walked = self.walk(&graph, &mut context, &mut trace).await;
        let execution_time_ms = elapsed_ms(started);

        if let Some(budget) = graph.constraints.max_execution_time_ms {
            if execution_time_ms > budget {
                warn!(
                    graph_id = %graph.graph_id,
                    elapsed_ms = execution_time_ms,
                    budget_ms = budget,
                    "Execution exceeded max_execution_time_ms"
                );
            }
        }

        let result = match walked {
            Ok(outputs) => ExecutionResult {
                status: ExecutionStatus::Success,
                outputs,
                execution_time_ms,
                node_trace: trace,
                error: None,
            },
            Err(e) => ExecutionResult {
                status: ExecutionStatus::Failed,
                outputs: ParamMap::new(),
                execution_time_ms,
                node_trace: trace,
                error: Some(e.to_string()),
            },
        };
        (result, authority_name)
    }

    async fn walk(
        &self,
        graph: &ExecutionGraph,
        context: &mut ExecutionContext,
        trace: &mut Vec<String>,
    ) -> Result<ParamMap, ExecutionError> {
        let mut current = START_NODE.to_string();

        for _ in 0..self.max_iterations {
            let node = graph
                .node(&current)
                .ok_or_else(|| ExecutionError::UnknownNode(current.clone()))?;
            trace.push(current.clone());
            debug!(node = %current, kind = node.kind(), "Visiting node");

            current = match node {
                Node::Entry { next } => successor(&current, next)?,

                Node::Exit { outputs } => return Ok(context.resolve_params(outputs)),

                Node::Action {
                    operation,
                    params,
                    next,
                    on_error,
                } => {
                    let resolved = context.resolve_params(params);
                    match self.actions.execute(operation, resolved).await {
                        Ok(value) => {
                            context.record_result(&current, value);
                            successor(&current, next)?
                        }
                        Err(e) => match on_error {
                            Some(target) => {
                                warn!(node = %current, error = %e, on_error = %target, "Action failed, following on_error");
                                target.clone()
                            }
                            None => return Err(ExecutionError::Action(e.to_string())),
                        },
                    }
                }

                Node::Condition {
                    expression,
                    on_true,
                    on_false,
                } => {
                    let holds = self.conditions.evaluate(expression, &context.scope())?;
                    debug!(node = %current, expression = %expression, holds, "Evaluated condition");
                    if holds {
                        on_true.clone()
                    } else {
                        on_false.clone()
                    }
                }
            };
        }

        Err(ExecutionError::MaxIterationsExceeded(self.max_iterations))
    }

    fn log_execution(&self, frame: &GlyphFrame, result: &ExecutionResult, authority: String) {
        self.execution_log.lock().push(ExecutionLogEntry {
            execution_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            glyph: frame.token(),
            glyph_code: format!("0x{:04X}", frame.glyph_code),
            authority,
            status: result.status,
            execution_time_ms: result.execution_time_ms,
            node_count: result.node_trace.len(),
            error: result.error.clone(),
        });
    }

    /// Snapshot of the execution log
    pub fn execution_log(&self) -> Vec<ExecutionLogEntry> {
        self.execution_log.lock().clone()
    }

    /// Drop all execution log entries
    pub fn clear_execution_log(&self) {
        self.execution_log.lock().clear();
    }

    /// Operations referenced by `graph` that have no registered handler
    pub fn unbound_operations(&self, graph: &ExecutionGraph) -> Vec<String> {
        graph
            .operations()
            .into_iter()
            .filter(|operation| !self.actions.has_handler(operation))
            .collect()
    }
}

fn successor(node_id: &str, next: &Option<String>) -> Result<String, ExecutionError> {
    next.clone()
        .ok_or_else(|| ExecutionError::NoSuccessor(node_id.to_string()))
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
