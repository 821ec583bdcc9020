// Rule system - the engine plus the rule families registered on it:
// - engine.rs: Rule, RuleSet, Mode, Scope and the passthrough fallback
// - mirror.rs: right-to-left mirroring
// - stack.rs: digit stack column layout, carries and underlines
// - longdiv.rs: long division styles lowered onto digit stacks

pub mod engine;
pub mod longdiv;
pub mod mirror;
pub mod stack;

pub use engine::*;
