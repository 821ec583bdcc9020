use crate::config::TransformConfig;
use crate::error::{Error, Result};
use crate::processor::Transformer;
use crate::types::{LineThickness, Node, StackAlign};
use std::collections::HashSet;

/// Which rule family is active while walking a subtree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Default,
    Mirror,
    StackOffset,
    StackEmit,
    CarryEmit,
}

pub type Predicate = fn(&Node, Mode) -> bool;
pub type Action<O> = fn(&Transformer, &Node, Mode, &Scope) -> Vec<O>;

/// A declarative rewrite rule. Rules are plain fn pointers so a rule set is
/// `Send + Sync` and can be shared by concurrent transforms.
pub struct Rule<O> {
    pub name: &'static str,
    pub priority: i32,
    pub matches: Predicate,
    pub apply: Action<O>,
}

impl<O> Clone for Rule<O> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            priority: self.priority,
            matches: self.matches,
            apply: self.apply,
        }
    }
}

impl<O> std::fmt::Debug for Rule<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .finish()
    }
}

/// Ordered rules plus the fallback that applies when none match.
///
/// Selection: highest priority wins, ties go to the rule declared last.
pub struct RuleSet<O> {
    name: &'static str,
    rules: Vec<Rule<O>>,
    fallback: Rule<O>,
}

impl<O> RuleSet<O> {
    pub fn new(name: &'static str, fallback: Rule<O>) -> Self {
        Self {
            name,
            rules: Vec::new(),
            fallback,
        }
    }

    pub fn add(&mut self, rule: Rule<O>) {
        self.rules.push(rule);
    }

    pub fn extend(&mut self, rules: impl IntoIterator<Item = Rule<O>>) {
        self.rules.extend(rules);
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name).collect()
    }

    pub fn select(&self, node: &Node, mode: Mode) -> &Rule<O> {
        self.rules
            .iter()
            .enumerate()
            .filter(|(_, rule)| (rule.matches)(node, mode))
            .max_by_key(|(index, rule)| (rule.priority, *index))
            .map(|(_, rule)| rule)
            .unwrap_or(&self.fallback)
    }

    /// Startup check. A set that fails here must never reach dispatch.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Error::InvalidRuleSet {
            set: self.name.to_string(),
            reason,
        };

        if self.fallback.priority != 0 {
            return Err(invalid(format!(
                "fallback '{}' must have priority 0, found {}",
                self.fallback.name, self.fallback.priority
            )));
        }

        let mut seen = HashSet::new();
        seen.insert(self.fallback.name);
        for rule in &self.rules {
            if rule.name.trim().is_empty() {
                return Err(invalid("rule with empty name".to_string()));
            }
            if rule.priority < 0 {
                return Err(invalid(format!(
                    "rule '{}' has negative priority {}",
                    rule.name, rule.priority
                )));
            }
            if !seen.insert(rule.name) {
                return Err(invalid(format!("duplicate rule name '{}'", rule.name)));
            }
        }
        Ok(())
    }
}

/// Settings of the innermost digit stack
#[derive(Debug, Clone, PartialEq)]
pub struct StackSettings {
    pub align: StackAlign,
    pub decimal_point: String,
    pub line_thickness: LineThickness,
}

/// Immutable traversal context. Each level clones and adjusts it, so sibling
/// subtrees never see each other's state.
#[derive(Debug, Clone)]
pub struct Scope {
    /// Inherited column offset while assigning stack columns
    pub offset: i64,
    /// Active stack settings; config defaults outside any stack
    pub stack: StackSettings,
    /// Config defaults, used to resolve a nested stack from scratch
    pub defaults: StackSettings,
    /// `decimalpoint` of the nearest ancestor that sets one
    pub decimal_point: Option<String>,
    /// `scriptsizemultiplier` of the enclosing mscarries
    pub carry_scale: Option<f64>,
    depth: usize,
}

impl Scope {
    pub fn root(config: &TransformConfig) -> Self {
        let defaults = StackSettings {
            align: config.stack.align,
            decimal_point: config.stack.decimal_point.clone(),
            line_thickness: config.stack.line_thickness.clone(),
        };
        Self {
            offset: 0,
            stack: defaults.clone(),
            defaults,
            decimal_point: None,
            carry_scale: None,
            depth: 0,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn deeper(&self) -> Self {
        Self {
            depth: self.depth + 1,
            ..self.clone()
        }
    }

    pub fn with_offset(&self, offset: i64) -> Self {
        Self {
            offset,
            ..self.clone()
        }
    }

    pub fn with_stack(&self, stack: StackSettings) -> Self {
        Self {
            stack,
            ..self.clone()
        }
    }

    pub fn with_decimal_point(&self, decimal_point: &str) -> Self {
        Self {
            decimal_point: Some(decimal_point.to_string()),
            ..self.clone()
        }
    }

    pub fn with_carry_scale(&self, carry_scale: Option<f64>) -> Self {
        Self {
            carry_scale,
            ..self.clone()
        }
    }
}

/// Identity copy: same tag and attributes, children dispatched in the same
/// mode and original order. Text is copied verbatim.
pub fn passthrough_rule() -> Rule<Node> {
    Rule {
        name: "passthrough",
        priority: 0,
        matches: |_, _| true,
        apply: passthrough,
    }
}

fn passthrough(t: &Transformer, node: &Node, mode: Mode, scope: &Scope) -> Vec<Node> {
    if node.is_text() {
        return vec![node.clone()];
    }
    let scope = match node.attr("decimalpoint") {
        Some(decimal_point) => scope.with_decimal_point(decimal_point),
        None => scope.clone(),
    };
    vec![node.shallow_copy(t.dispatch_children(node, mode, &scope))]
}
