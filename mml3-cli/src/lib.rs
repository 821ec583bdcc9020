// All transformation logic is in mml3-core
// This CLI acts as a thin wrapper around the core library

// CLI-specific modules
pub mod profiler;

// Re-export core types for convenience
pub use mml3_core::*;

// Re-export CLI utilities
pub use profiler::{Stage, StepProfiler};
