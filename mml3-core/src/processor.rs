use crate::config::{families, TransformConfig};
use crate::error::Result;
use crate::rules::stack::{self, Cell, Row};
use crate::rules::{longdiv, mirror, passthrough_rule, Mode, RuleSet, Scope};
use crate::types::{wrap_single, Node};
use tracing::{debug, trace, warn};

/// Rewrites elementary-math and right-to-left markup into base MathML.
///
/// Built once from a config, then shared: `transform` takes `&self` and every
/// rule is a plain function, so one instance can serve concurrent callers.
pub struct Transformer {
    config: TransformConfig,
    tree_rules: RuleSet<Node>,
    row_rules: RuleSet<Row>,
}

impl Transformer {
    /// Transformer with every rule family registered
    pub fn new() -> Result<Self> {
        Self::with_config(TransformConfig::default())
    }

    /// Register the families the config enables, then validate both rule sets
    pub fn with_config(config: TransformConfig) -> Result<Self> {
        let mut tree_rules = RuleSet::new("tree", passthrough_rule());
        let mut row_rules = RuleSet::new("stack-offset", stack::cell_fallback_rule());

        for family in config.enabled_families() {
            match family {
                families::MIRROR => tree_rules.extend(mirror::rules()),
                families::ELEMENTARY_MATH => {
                    tree_rules.extend(stack::tree_rules());
                    tree_rules.extend(longdiv::rules());
                    row_rules.extend(stack::row_rules());
                }
                unknown => {
                    warn!(family = unknown, "unknown rule family in pipeline config, skipping");
                    continue;
                }
            }
            debug!(family, "registered rule family");
        }

        tree_rules.validate()?;
        row_rules.validate()?;
        trace!(set = tree_rules.name(), rules = ?tree_rules.rule_names(), "rule order");
        trace!(set = row_rules.name(), rules = ?row_rules.rule_names(), "rule order");
        debug!(
            tree_rules = tree_rules.len(),
            row_rules = row_rules.len(),
            "transformer ready"
        );

        Ok(Self {
            config,
            tree_rules,
            row_rules,
        })
    }

    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Rewrite a whole tree. Never fails; markup no rule recognizes is copied.
    pub fn transform(&self, tree: &Node) -> Node {
        if !self.config.enabled {
            return tree.clone();
        }
        let scope = Scope::root(&self.config);
        wrap_single(self.dispatch(tree, Mode::Default, &scope))
    }

    /// Run the winning rule for `node` in `mode`
    pub fn dispatch(&self, node: &Node, mode: Mode, scope: &Scope) -> Vec<Node> {
        if self.too_deep(node, scope) {
            return vec![node.clone()];
        }
        let rule = self.tree_rules.select(node, mode);
        trace!(rule = rule.name, ?mode, tag = node.tag().unwrap_or("#text"), "dispatch");
        (rule.apply)(self, node, mode, &scope.deeper())
    }

    /// Dispatch every child in document order and concatenate the results
    pub fn dispatch_children(&self, node: &Node, mode: Mode, scope: &Scope) -> Vec<Node> {
        node.children()
            .iter()
            .flat_map(|child| self.dispatch(child, mode, scope))
            .collect()
    }

    /// Lower one child of a digit stack to rows with anchor columns
    pub fn lower(&self, node: &Node, scope: &Scope) -> Vec<Row> {
        if self.too_deep(node, scope) {
            return vec![Row::Content {
                anchor: scope.offset,
                cells: vec![Cell::Content(vec![node.clone()])],
                numeral: false,
            }];
        }
        let rule = self.row_rules.select(node, Mode::StackOffset);
        trace!(rule = rule.name, tag = node.tag().unwrap_or("#text"), "lower");
        (rule.apply)(self, node, Mode::StackOffset, &scope.deeper())
    }

    fn too_deep(&self, node: &Node, scope: &Scope) -> bool {
        let too_deep = scope.depth() >= self.config.max_depth;
        if too_deep {
            warn!(
                depth = scope.depth(),
                tag = node.tag().unwrap_or("#text"),
                "dispatch depth limit reached, copying subtree unchanged"
            );
        }
        too_deep
    }
}
