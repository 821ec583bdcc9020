// Host-side filter chain
//
// A host runs a list of tree filters before layout. The transform registers
// itself here as one filter, only when its capability flag is on, and a name
// can appear in a chain at most once.

use crate::config::TransformConfig;
use crate::error::{Error, Result};
use crate::processor::Transformer;
use crate::types::Node;

/// A whole-tree rewrite that runs before layout
pub trait TreeFilter: Send + Sync {
    /// Get filter name for registration and logging
    fn name(&self) -> &str;

    fn apply(&self, tree: &Node) -> Node;
}

impl TreeFilter for Transformer {
    fn name(&self) -> &str {
        "elementary-math"
    }

    fn apply(&self, tree: &Node) -> Node {
        self.transform(tree)
    }
}

#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Box<dyn TreeFilter>>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, filter: Box<dyn TreeFilter>) -> Result<()> {
        if self.is_registered(filter.name()) {
            return Err(Error::DuplicateFilter(filter.name().to_string()));
        }
        tracing::debug!(filter = filter.name(), "registered tree filter");
        self.filters.push(filter);
        Ok(())
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.filters.iter().any(|filter| filter.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.filters.iter().map(|filter| filter.name()).collect()
    }

    /// Run every filter in registration order
    pub fn run(&self, tree: &Node) -> Node {
        self.filters
            .iter()
            .fold(tree.clone(), |tree, filter| filter.apply(&tree))
    }
}

/// Add the transform to `chain` if the config enables it.
///
/// Returns whether a filter was added.
pub fn register_transform(chain: &mut FilterChain, config: &TransformConfig) -> Result<bool> {
    let transformer = Transformer::with_config(config.clone())?;
    if !transformer.is_enabled() {
        tracing::debug!("elementary math transform disabled, not registering");
        return Ok(false);
    }
    chain.register(Box::new(transformer))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Rename;

    impl TreeFilter for Rename {
        fn name(&self) -> &str {
            "rename"
        }

        fn apply(&self, tree: &Node) -> Node {
            Node::new("mrow", vec![tree.clone()])
        }
    }

    #[test]
    fn test_register_at_most_once() {
        let mut chain = FilterChain::new();
        let config = TransformConfig::default();
        assert!(register_transform(&mut chain, &config).unwrap());
        let err = register_transform(&mut chain, &config).unwrap_err();
        assert!(matches!(err, Error::DuplicateFilter(name) if name == "elementary-math"));
        assert_eq!(chain.names(), vec!["elementary-math"]);
    }

    #[test]
    fn test_disabled_transform_is_not_registered() {
        let mut chain = FilterChain::new();
        let config = TransformConfig {
            enabled: false,
            ..TransformConfig::default()
        };
        assert!(!register_transform(&mut chain, &config).unwrap());
        assert!(!chain.is_registered("elementary-math"));
    }

    #[test]
    fn test_filters_run_in_order() {
        let mut chain = FilterChain::new();
        register_transform(&mut chain, &TransformConfig::default()).unwrap();
        chain.register(Box::new(Rename)).unwrap();

        let tree = Node::new("mstack", vec![Node::leaf("mn", "7")]);
        let out = chain.run(&tree);
        assert!(out.is("mrow"));
        assert!(out.children()[0].is("mtable"));
    }
}
