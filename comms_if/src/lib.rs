//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the software.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Operator packet definitions - the wire protocol between `op_exec` and `bot_exec`
pub mod op;

/// Command encodings for equipment (motor controllers)
pub mod eqpt;

/// Network module
pub mod net;
