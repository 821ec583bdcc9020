// MML3 Core Library
//
// Rewrites MathML elementary-math markup (mstack, mlongdiv, carries, lines)
// and right-to-left expressions into the base presentation vocabulary.
// Main interface is Transformer::transform.

pub mod config;
pub mod error;
pub mod filters;
pub mod processor;
pub mod rules;
pub mod types;
pub mod xml;

// Re-export main types and functions for easy use
pub use config::TransformConfig;
pub use error::{Error, Result};
pub use filters::{register_transform, FilterChain, TreeFilter};
pub use processor::Transformer;
pub use rules::longdiv::LongDivStyle;
pub use types::*;
