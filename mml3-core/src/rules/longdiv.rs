// Long division
//
// mlongdiv children are positional: divisor, quotient, dividend, then any
// number of working rows. Each style builds an intermediate tree around a
// digit stack and hands it back to the dispatcher.

use super::engine::{Mode, Rule, Scope};
use crate::types::{normalize_space, Node, StackAlign};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LongDivStyle {
    LeftTop,
    StackedRightRight,
    MediumStackedRightRight,
    ShortStackedRightRight,
    RightTop,
    LeftSlashRight,
    LeftParenRight,
    ColonRightEqualsRight,
    StackedLeftLeft,
    StackedLeftLineTop,
}

/// Where divisor and quotient go relative to the dividend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrangement {
    /// Quotient above a rule over the dividend row
    QuotientOnTop,
    /// Everything on one row
    Inline,
    /// Divisor over quotient in a small table beside the dividend stack
    Stacked(Side),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Which operand opens the row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lead {
    Divisor,
    Dividend,
}

/// What an enclosure is drawn around
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enclosed {
    Divisor,
    Dividend,
    /// The divisor/quotient table of a stacked style
    Table,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleLayout {
    pub arrangement: Arrangement,
    pub lead: Lead,
    pub separators: &'static [&'static str],
    pub enclosure: Option<(Enclosed, &'static str)>,
}

impl LongDivStyle {
    pub const ALL: [LongDivStyle; 10] = [
        LongDivStyle::LeftTop,
        LongDivStyle::StackedRightRight,
        LongDivStyle::MediumStackedRightRight,
        LongDivStyle::ShortStackedRightRight,
        LongDivStyle::RightTop,
        LongDivStyle::LeftSlashRight,
        LongDivStyle::LeftParenRight,
        LongDivStyle::ColonRightEqualsRight,
        LongDivStyle::StackedLeftLeft,
        LongDivStyle::StackedLeftLineTop,
    ];

    /// Unknown or missing styles fall back to lefttop
    pub fn parse(value: Option<&str>) -> Self {
        let Some(value) = value.map(str::trim) else {
            return LongDivStyle::LeftTop;
        };
        Self::ALL
            .into_iter()
            .find(|style| style.name() == value)
            .unwrap_or_else(|| {
                tracing::debug!(style = value, "unknown longdivstyle, using lefttop");
                LongDivStyle::LeftTop
            })
    }

    pub fn name(self) -> &'static str {
        match self {
            LongDivStyle::LeftTop => "lefttop",
            LongDivStyle::StackedRightRight => "stackedrightright",
            LongDivStyle::MediumStackedRightRight => "mediumstackedrightright",
            LongDivStyle::ShortStackedRightRight => "shortstackedrightright",
            LongDivStyle::RightTop => "righttop",
            LongDivStyle::LeftSlashRight => "left/\\right",
            LongDivStyle::LeftParenRight => "left)(right",
            LongDivStyle::ColonRightEqualsRight => ":right=right",
            LongDivStyle::StackedLeftLeft => "stackedleftleft",
            LongDivStyle::StackedLeftLineTop => "stackedleftlinetop",
        }
    }

    pub fn layout(self) -> StyleLayout {
        use Arrangement::*;
        fn layout(
            arrangement: Arrangement,
            lead: Lead,
            separators: &'static [&'static str],
            enclosure: Option<(Enclosed, &'static str)>,
        ) -> StyleLayout {
            StyleLayout {
                arrangement,
                lead,
                separators,
                enclosure,
            }
        }

        match self {
            LongDivStyle::LeftTop => layout(QuotientOnTop, Lead::Divisor, &[")"], None),
            LongDivStyle::RightTop => layout(
                QuotientOnTop,
                Lead::Dividend,
                &[],
                Some((Enclosed::Divisor, "top left bottom")),
            ),
            LongDivStyle::StackedLeftLineTop => layout(
                QuotientOnTop,
                Lead::Divisor,
                &[],
                Some((Enclosed::Divisor, "bottom right")),
            ),
            LongDivStyle::LeftSlashRight => layout(Inline, Lead::Divisor, &["/", "\\"], None),
            LongDivStyle::LeftParenRight => layout(Inline, Lead::Divisor, &[")", "("], None),
            LongDivStyle::ColonRightEqualsRight => layout(Inline, Lead::Dividend, &[":", "="], None),
            LongDivStyle::StackedRightRight => layout(
                Stacked(Side::Right),
                Lead::Dividend,
                &[],
                Some((Enclosed::Dividend, "right")),
            ),
            LongDivStyle::MediumStackedRightRight => layout(
                Stacked(Side::Right),
                Lead::Dividend,
                &[],
                Some((Enclosed::Table, "left")),
            ),
            LongDivStyle::ShortStackedRightRight => layout(
                Stacked(Side::Right),
                Lead::Dividend,
                &[],
                Some((Enclosed::Divisor, "left bottom")),
            ),
            LongDivStyle::StackedLeftLeft => layout(
                Stacked(Side::Left),
                Lead::Divisor,
                &[],
                Some((Enclosed::Dividend, "left")),
            ),
        }
    }
}

pub fn rules() -> Vec<Rule<Node>> {
    vec![Rule {
        name: "mlongdiv",
        priority: 1,
        matches: |node, mode| mode == Mode::Default && node.is("mlongdiv"),
        apply: |t, node, _, scope| {
            let intermediate = build(node, scope);
            t.dispatch(&intermediate, Mode::Default, scope)
        },
    }]
}

/// The positional parts of an mlongdiv
struct Parts {
    divisor: Node,
    quotient: Node,
    dividend: Node,
    working: Vec<Node>,
}

impl Parts {
    fn of(node: &Node) -> Self {
        let mut children = node.element_children().cloned();
        let mut next = || children.next().unwrap_or_else(|| Node::element("mrow"));
        let divisor = next();
        let quotient = next();
        let dividend = next();
        Parts {
            divisor,
            quotient,
            dividend,
            working: children.collect(),
        }
    }
}

fn enclose(node: Node, notation: &str) -> Node {
    Node::new("menclose", vec![node]).with_attr("notation", notation)
}

/// Intermediate tree for one mlongdiv, still containing mstack markup
pub fn build(node: &Node, scope: &Scope) -> Node {
    let style = LongDivStyle::parse(node.attr("longdivstyle"));
    let layout = style.layout();
    let parts = Parts::of(node);

    let declared_point = node
        .attr("decimalpoint")
        .map(str::to_string)
        .or_else(|| scope.decimal_point.clone());

    let mut stack = Node::element("mstack");
    if let Some(decimal_point) = &declared_point {
        stack.set_attr("decimalpoint", decimal_point.as_str());
    }
    if let Some(align) = node.attr("align") {
        stack.set_attr("align", align);
    }

    let enclosed = |target: Enclosed, node: Node| match layout.enclosure {
        Some((which, notation)) if which == target => enclose(node, notation),
        _ => node,
    };

    match layout.arrangement {
        Arrangement::QuotientOnTop => {
            let dividend = normalize_space(&parts.dividend.text_content());
            let digits = dividend.chars().count();
            let separator = declared_point
                .as_deref()
                .unwrap_or(scope.defaults.decimal_point.as_str());
            let rule = Node::element("msline").with_attr("length", digits.to_string());
            // Under decimal alignment the rule must end over the dividend's last digit
            let rule = match rule_shift(&dividend, separator, scope.defaults.align) {
                0 => rule,
                shift => rule.with_attr("position", shift.to_string()),
            };
            // The divisor is wrapped so it is never taken as the row's numeral
            let divisor = match layout.enclosure {
                Some((Enclosed::Divisor, notation)) => enclose(parts.divisor, notation),
                _ => Node::new("mrow", vec![parts.divisor]),
            };
            let mut row = Vec::new();
            match layout.lead {
                Lead::Divisor => {
                    row.push(divisor);
                    row.extend(layout.separators.iter().map(|glyph| Node::leaf("mo", *glyph)));
                    row.push(parts.dividend);
                }
                Lead::Dividend => {
                    row.push(parts.dividend);
                    row.extend(layout.separators.iter().map(|glyph| Node::leaf("mo", *glyph)));
                    row.push(divisor);
                }
            }
            stack.push_child(parts.quotient);
            stack.push_child(rule);
            stack.push_child(Node::new("msrow", row));
            for working in parts.working {
                stack.push_child(working);
            }
            stack
        }
        Arrangement::Inline => {
            let (first, second) = match layout.lead {
                Lead::Divisor => (parts.divisor, parts.dividend),
                Lead::Dividend => (parts.dividend, parts.divisor),
            };
            let mut glyphs = layout.separators.iter().map(|glyph| Node::leaf("mo", *glyph));
            let mut row = vec![first];
            row.extend(glyphs.next());
            row.push(second);
            row.extend(glyphs.next());
            row.push(parts.quotient);

            if parts.working.is_empty() {
                return Node::new("mrow", row);
            }
            stack.push_child(Node::new("msrow", row));
            for working in parts.working {
                stack.push_child(working);
            }
            stack
        }
        Arrangement::Stacked(side) => {
            stack.set_attr("align", "top");
            stack.push_child(parts.dividend);
            for working in parts.working {
                stack.push_child(working);
            }
            let stack = enclosed(Enclosed::Dividend, stack);

            let divisor = match layout.enclosure {
                Some((Enclosed::Divisor, notation)) => enclose(parts.divisor, notation),
                _ => enclose(parts.divisor, "bottom"),
            };
            let table = Node::new(
                "mtable",
                vec![
                    Node::new("mtr", vec![Node::new("mtd", vec![divisor])]),
                    Node::new("mtr", vec![Node::new("mtd", vec![parts.quotient])]),
                ],
            )
            .with_attr("align", "top");
            let table = enclosed(Enclosed::Table, table);

            match side {
                Side::Right => Node::new("mrow", vec![stack, table]),
                Side::Left => Node::new("mrow", vec![table, stack]),
            }
        }
    }
}

/// `position` for the rule under the quotient: minus the characters from the
/// separator to the end of the dividend, or 0 when the row is not split
fn rule_shift(dividend: &str, separator: &str, align: StackAlign) -> i64 {
    if align != StackAlign::DecimalPoint || separator.is_empty() {
        return 0;
    }
    dividend
        .find(separator)
        .map_or(0, |byte| -(dividend[byte..].chars().count() as i64))
}
