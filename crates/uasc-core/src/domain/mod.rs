/// Glyph frames, domains and opcode tokens
pub mod glyph;

/// Binary and URI encodings of glyph frames
pub mod codec;

/// Condition expression grammar
pub mod condition;

/// Execution graphs and their validation
pub mod graph;

/// Graph store and glyph bindings
pub mod registry;

/// Certificate chain verification
pub mod trust;
