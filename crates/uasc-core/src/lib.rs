//!
//! UASC Core - glyph protocol runtime
//!
//! This crate defines the glyph codec, execution graphs, the registry,
//! the trust verifier and the interpreter that walks a bound graph when a
//! frame arrives. It is the foundation for all other crates in the
//! workspace.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Domain layer - frames, graphs, registry and trust
pub mod domain;

/// Application layer - actions, execution context and interpreter
pub mod application;

/// Core types shared across layers
pub mod types;

/// Error types
pub mod error;

// Re-export key types
pub use error::{
    ActionError, CodecError, ConditionError, ExecutionError, GraphViolation, RegistryError,
};
pub use types::{is_truthy, LogLevel, ParamMap, ValueType};

// Re-export main API types for easy use
pub use application::actions::{ActionHandler, ActionRegistry};
pub use application::context::ExecutionContext;
pub use application::interpreter::{
    ExecutionLogEntry, ExecutionResult, ExecutionStatus, Interpreter, DEFAULT_MAX_ITERATIONS,
};
pub use domain::codec::GlyphCodec;
pub use domain::condition::{ConditionEvaluator, ConditionScope, ExpressionEvaluator};
pub use domain::glyph::{Domain, GlyphFrame};
pub use domain::graph::{ExecutionGraph, InputDecl, Node, OutputDecl};
pub use domain::registry::{GlyphBinding, Registry, RegistrySnapshot, DEFAULT_VALIDITY_DAYS};
pub use domain::trust::{Certificate, TrustFailure, TrustVerifier, VerificationResult};

#[cfg(feature = "testing")]
pub use domain::trust::mock_trust_chain;

