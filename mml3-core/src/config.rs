use crate::types::{LineThickness, StackAlign};
use crate::error::Result;
use serde::{Deserialize, Serialize};

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_max_depth() -> usize {
    256 // realistic MathML nests well under 20; this only stops runaway rescans
}

fn default_decimal_point() -> String {
    ".".to_string()
}

/// Rule family names understood by the pipeline
pub mod families {
    pub const MIRROR: &str = "Mirror";
    pub const ELEMENTARY_MATH: &str = "ElementaryMath";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Capability flag: when false the transform hands trees back untouched
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Which rule families to register, in declaration order
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Fallbacks for stacks that leave attributes unset
    #[serde(default)]
    pub stack: StackConfig,
    /// Dispatch depth after which nodes are passed through verbatim
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// List of rule families to register in order
    pub rules: Vec<RuleConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Name of the rule family
    pub name: String,
    /// Whether this family is registered
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            rules: vec![
                RuleConfig {
                    name: families::MIRROR.to_string(),
                    enabled: true,
                },
                RuleConfig {
                    name: families::ELEMENTARY_MATH.to_string(),
                    enabled: true,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackConfig {
    /// Used when an mstack has no stackalign
    #[serde(default)]
    pub align: StackAlign,
    /// Used when neither the stack nor an ancestor sets decimalpoint
    #[serde(default = "default_decimal_point")]
    pub decimal_point: String,
    /// Used when an msline has no mslinethickness
    #[serde(default)]
    pub line_thickness: LineThickness,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            align: StackAlign::DecimalPoint,
            decimal_point: default_decimal_point(),
            line_thickness: LineThickness::Medium,
        }
    }
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            pipeline: PipelineConfig::default(),
            stack: StackConfig::default(),
            max_depth: default_max_depth(),
        }
    }
}

impl TransformConfig {
    /// Load config from file path
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: TransformConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Load config with fallback to default
    pub fn load_with_fallback(path: Option<&str>) -> Self {
        match path {
            Some(p) => Self::load_from_file(p).unwrap_or_else(|e| {
                tracing::warn!(path = p, error = %e, "failed to load config, using defaults");
                Self::default()
            }),
            None => Self::default(),
        }
    }

    /// Names of the families that will be registered
    pub fn enabled_families(&self) -> Vec<&str> {
        self.pipeline
            .rules
            .iter()
            .filter(|rule| rule.enabled)
            .map(|rule| rule.name.as_str())
            .collect()
    }
}
