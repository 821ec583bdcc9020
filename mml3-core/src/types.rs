use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

// ===== TREE MODEL =====
// Every rule reads and writes this shape. Attribute order carries no meaning,
// so attributes live in a BTreeMap and serialize deterministically.

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Element {
        tag: String,
        #[serde(default)]
        attributes: BTreeMap<String, String>,
        #[serde(default)]
        children: Vec<Node>,
    },
    Text {
        value: String,
    },
}

impl Node {
    /// Childless element with no attributes
    pub fn element(tag: impl Into<String>) -> Self {
        Node::Element {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Element with the given children
    pub fn new(tag: impl Into<String>, children: Vec<Node>) -> Self {
        Node::Element {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            children,
        }
    }

    /// Token element holding a single text child, e.g. `<mo>)</mo>`
    pub fn leaf(tag: impl Into<String>, value: impl Into<String>) -> Self {
        Node::new(tag, vec![Node::text(value)])
    }

    pub fn text(value: impl Into<String>) -> Self {
        Node::Text {
            value: value.into(),
        }
    }

    /// Builder-style attribute setter. No-op on text nodes.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_attributes(mut self, attrs: BTreeMap<String, String>) -> Self {
        if let Node::Element { attributes, .. } = &mut self {
            *attributes = attrs;
        }
        self
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        if let Node::Element { attributes, .. } = self {
            attributes.insert(name.into(), value.into());
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        match self {
            Node::Element { attributes, .. } => attributes.remove(name),
            Node::Text { .. } => None,
        }
    }

    pub fn push_child(&mut self, child: Node) {
        if let Node::Element { children, .. } = self {
            children.push(child);
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            Node::Element { tag, .. } => Some(tag),
            Node::Text { .. } => None,
        }
    }

    /// True when this is an element named `name`
    pub fn is(&self, name: &str) -> bool {
        self.tag() == Some(name)
    }

    pub fn is_element(&self) -> bool {
        matches!(self, Node::Element { .. })
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Node::Text { .. })
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Node::Text { value } => Some(value),
            Node::Element { .. } => None,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        match self {
            Node::Element { attributes, .. } => attributes.get(name).map(String::as_str),
            Node::Text { .. } => None,
        }
    }

    /// Integer attribute, 0 when absent or unparseable
    pub fn attr_i64(&self, name: &str) -> i64 {
        self.attr(name)
            .and_then(|value| value.trim().parse::<i64>().ok())
            .unwrap_or(0)
    }

    pub fn attributes(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Node::Element { attributes, .. } => Some(attributes),
            Node::Text { .. } => None,
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Element { children, .. } => children,
            Node::Text { .. } => &[],
        }
    }

    pub fn element_children(&self) -> impl Iterator<Item = &Node> {
        self.children().iter().filter(|child| child.is_element())
    }

    /// Concatenated text of all descendants
    pub fn text_content(&self) -> String {
        match self {
            Node::Text { value } => value.clone(),
            Node::Element { children, .. } => children.iter().map(Node::text_content).collect(),
        }
    }

    /// Copy of this element with the same tag and attributes but new children
    pub fn shallow_copy(&self, children: Vec<Node>) -> Node {
        match self {
            Node::Element {
                tag, attributes, ..
            } => Node::Element {
                tag: tag.clone(),
                attributes: attributes.clone(),
                children,
            },
            Node::Text { .. } => self.clone(),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::xml::to_string(self))
    }
}

/// Collapse runs of whitespace and trim, like XPath normalize-space()
pub fn normalize_space(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A single node stays as-is, several get grouped in an mrow
pub fn wrap_single(mut nodes: Vec<Node>) -> Node {
    if nodes.len() == 1 {
        nodes.remove(0)
    } else {
        Node::new("mrow", nodes)
    }
}

// ===== STACK ATTRIBUTE TYPES =====

/// `stackalign` on mstack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StackAlign {
    Left,
    Right,
    Center,
    #[default]
    DecimalPoint,
}

impl StackAlign {
    pub fn from_attr(value: &str) -> Option<Self> {
        match value.trim() {
            "left" => Some(StackAlign::Left),
            "right" => Some(StackAlign::Right),
            "center" => Some(StackAlign::Center),
            "decimalpoint" => Some(StackAlign::DecimalPoint),
            _ => None,
        }
    }
}

// Accepts the usual MathML length forms: "2px", ".15em", "0.3", "10%"
static LENGTH_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?(\d+\.?\d*|\.\d+)(em|ex|px|pt|pc|in|cm|mm|%)?$").unwrap()
});

/// `mslinethickness` on msline
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LineThickness {
    Thin,
    #[default]
    Medium,
    Thick,
    Literal(String),
}

impl LineThickness {
    /// Unknown keywords and malformed lengths fall back to medium
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "thin" => LineThickness::Thin,
            "medium" => LineThickness::Medium,
            "thick" => LineThickness::Thick,
            other if LENGTH_REGEX.is_match(other) => LineThickness::Literal(other.to_string()),
            other => {
                tracing::warn!(value = other, "unrecognized line thickness, using medium");
                LineThickness::Medium
            }
        }
    }

    pub fn to_length(&self) -> String {
        match self {
            LineThickness::Thin => "0.1em".to_string(),
            LineThickness::Medium => "0.15em".to_string(),
            LineThickness::Thick => "0.2em".to_string(),
            LineThickness::Literal(length) => length.clone(),
        }
    }
}

impl From<String> for LineThickness {
    fn from(value: String) -> Self {
        LineThickness::parse(&value)
    }
}

impl From<LineThickness> for String {
    fn from(value: LineThickness) -> Self {
        match value {
            LineThickness::Thin => "thin".to_string(),
            LineThickness::Medium => "medium".to_string(),
            LineThickness::Thick => "thick".to_string(),
            LineThickness::Literal(length) => length,
        }
    }
}

/// `location` on mscarry / mscarries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CarryLocation {
    #[default]
    N,
    Nw,
    Sw,
    S,
    Ne,
    Se,
    W,
    E,
}

impl CarryLocation {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "nw" => CarryLocation::Nw,
            "sw" => CarryLocation::Sw,
            "s" => CarryLocation::S,
            "ne" => CarryLocation::Ne,
            "se" => CarryLocation::Se,
            "w" => CarryLocation::W,
            "e" => CarryLocation::E,
            _ => CarryLocation::N,
        }
    }
}

/// One strike of a `crossout` list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossout {
    UpDiagonal,
    DownDiagonal,
    Vertical,
    Horizontal,
}

impl Crossout {
    /// Space separated list; "none" and unknown words are dropped
    pub fn parse_list(value: &str) -> Vec<Crossout> {
        value
            .split_whitespace()
            .filter_map(|word| match word {
                "updiagonalstrike" => Some(Crossout::UpDiagonal),
                "downdiagonalstrike" => Some(Crossout::DownDiagonal),
                "verticalstrike" => Some(Crossout::Vertical),
                "horizontalstrike" => Some(Crossout::Horizontal),
                _ => None,
            })
            .collect()
    }

    pub fn notation(self) -> &'static str {
        match self {
            Crossout::UpDiagonal => "updiagonalstrike",
            Crossout::DownDiagonal => "downdiagonalstrike",
            Crossout::Vertical => "verticalstrike",
            Crossout::Horizontal => "horizontalstrike",
        }
    }
}

/// Round `numerator / 2` with ties going to the even neighbour
pub fn half_even(numerator: i64) -> i64 {
    let quotient = numerator.div_euclid(2);
    if numerator.rem_euclid(2) == 1 && quotient.rem_euclid(2) == 1 {
        quotient + 1
    } else {
        quotient
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_even_rounding() {
        assert_eq!(half_even(4), 2);
        assert_eq!(half_even(5), 2); // 2.5 -> 2
        assert_eq!(half_even(7), 4); // 3.5 -> 4
        assert_eq!(half_even(-3), -2); // -1.5 -> -2
    }

    #[test]
    fn test_line_thickness_keywords_and_literals() {
        assert_eq!(LineThickness::parse("thin").to_length(), "0.1em");
        assert_eq!(LineThickness::parse("thick").to_length(), "0.2em");
        assert_eq!(LineThickness::parse("3px").to_length(), "3px");
        assert_eq!(LineThickness::parse("bogus"), LineThickness::Medium);
    }

    #[test]
    fn test_crossout_list_skips_none() {
        assert_eq!(
            Crossout::parse_list("none updiagonalstrike horizontalstrike"),
            vec![Crossout::UpDiagonal, Crossout::Horizontal]
        );
        assert!(Crossout::parse_list("none").is_empty());
    }

    #[test]
    fn test_text_content_and_element_children() {
        let node = Node::new("mrow", vec![Node::leaf("mn", "12"), Node::text(" "), Node::leaf("mo", "+")]);
        assert_eq!(node.text_content(), "12 +");
        assert_eq!(node.element_children().count(), 2);
    }
}
