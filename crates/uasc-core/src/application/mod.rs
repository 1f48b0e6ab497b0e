/// Action handler registry
pub mod actions;

/// Per-execution state and reference resolution
pub mod context;

/// Frame execution engine
pub mod interpreter;
