// Right-to-left mirroring
//
// An element with dir="rtl" switches its subtree into Mirror mode. Everything
// below is rebuilt from left-to-right constructs that read in reverse.

use super::engine::{Mode, Rule, Scope};
use crate::processor::Transformer;
use crate::types::{wrap_single, Node};
use std::collections::BTreeMap;

pub fn rules() -> Vec<Rule<Node>> {
    vec![
        Rule {
            name: "rtl-root",
            priority: 10,
            matches: |node, mode| mode == Mode::Default && node.attr("dir") == Some("rtl"),
            apply: |t, node, _, scope| t.dispatch(node, Mode::Mirror, scope),
        },
        Rule {
            name: "mirror-element",
            priority: 0,
            matches: |node, mode| mode == Mode::Mirror && node.is_element(),
            apply: mirror_element,
        },
        Rule {
            name: "mirror-text",
            priority: 0,
            matches: |node, mode| mode == Mode::Mirror && node.is_text(),
            apply: |_, node, _, _| vec![node.clone()],
        },
        Rule {
            name: "mirror-text-swap",
            priority: 1,
            matches: |node, mode| {
                mode == Mode::Mirror && node.as_text().and_then(mirror_text).is_some()
            },
            apply: |_, node, _, _| {
                let value = node.as_text().and_then(mirror_text).unwrap_or_default();
                vec![Node::text(value)]
            },
        },
        Rule {
            name: "mirror-mfrac",
            priority: 1,
            matches: |node, mode| mode == Mode::Mirror && node.is("mfrac"),
            apply: mirror_in_place,
        },
        Rule {
            name: "mirror-mfrac-bevelled",
            priority: 2,
            matches: |node, mode| {
                mode == Mode::Mirror && node.is("mfrac") && node.attr("bevelled") == Some("true")
            },
            apply: mirror_bevelled,
        },
        Rule {
            name: "mirror-mroot",
            priority: 1,
            matches: |node, mode| mode == Mode::Mirror && node.is("mroot"),
            apply: mirror_root,
        },
        Rule {
            name: "mirror-msqrt",
            priority: 1,
            matches: |node, mode| mode == Mode::Mirror && node.is("msqrt"),
            apply: mirror_sqrt,
        },
        Rule {
            name: "mirror-container",
            priority: 2,
            matches: |node, mode| {
                mode == Mode::Mirror
                    && matches!(node.tag(), Some("mtable" | "munder" | "mover" | "munderover"))
            },
            apply: mirror_in_place,
        },
        Rule {
            name: "mirror-msup",
            priority: 2,
            matches: |node, mode| mode == Mode::Mirror && node.is("msup"),
            apply: |t, node, _, scope| {
                let none = Node::element("none");
                let sup = mirrored_child(t, node, 1, scope);
                mirror_scripts(t, node, scope, none, sup)
            },
        },
        Rule {
            name: "mirror-msub",
            priority: 2,
            matches: |node, mode| mode == Mode::Mirror && node.is("msub"),
            apply: |t, node, _, scope| {
                let sub = mirrored_child(t, node, 1, scope);
                mirror_scripts(t, node, scope, sub, Node::element("none"))
            },
        },
        Rule {
            name: "mirror-msubsup",
            priority: 2,
            matches: |node, mode| mode == Mode::Mirror && node.is("msubsup"),
            apply: |t, node, _, scope| {
                let sub = mirrored_child(t, node, 1, scope);
                let sup = mirrored_child(t, node, 2, scope);
                mirror_scripts(t, node, scope, sub, sup)
            },
        },
        Rule {
            name: "mirror-mmultiscripts",
            priority: 2,
            matches: |node, mode| mode == Mode::Mirror && node.is("mmultiscripts"),
            apply: mirror_multiscripts,
        },
        Rule {
            name: "mirror-mmultiscripts-postscripts",
            priority: 3,
            matches: |node, mode| {
                mode == Mode::Mirror
                    && node.is("mmultiscripts")
                    && !node.children().iter().any(|child| child.is("mprescripts"))
            },
            apply: mirror_postscripts_only,
        },
        Rule {
            name: "mirror-elementary",
            priority: 3,
            matches: |node, mode| {
                mode == Mode::Mirror && matches!(node.tag(), Some("mstack" | "mlongdiv"))
            },
            apply: |t, node, _, scope| {
                let mut ltr = node.clone();
                ltr.remove_attr("dir");
                let laid_out = t.dispatch(&ltr, Mode::Default, scope);
                vec![Node::new("mrow", laid_out).with_attr("dir", "ltr")]
            },
        },
    ]
}

/// Swap a bracket for its counterpart; any other fence is returned unchanged
pub fn mirror_fence(value: &str) -> String {
    match value {
        "(" => ")",
        ")" => "(",
        "[" => "]",
        "]" => "[",
        "{" => "}",
        "}" => "{",
        other => other,
    }
    .to_string()
}

fn mirror_text(value: &str) -> Option<&'static str> {
    match value.trim() {
        "(" => Some(")"),
        ")" => Some("("),
        "{" => Some("}"),
        "}" => Some("{"),
        "<" => Some(">"),
        ">" => Some("<"),
        "\u{2208}" => Some("\u{220B}"),
        "\u{220B}" => Some("\u{2208}"),
        _ => None,
    }
}

/// Attributes of a mirrored element. Fence roles swap, radicals become
/// top-right enclosures and the result is pinned to left-to-right.
pub fn mirror_attributes(node: &Node) -> BTreeMap<String, String> {
    let mut mirrored = BTreeMap::new();
    for (name, value) in node.attributes().into_iter().flatten() {
        match name.as_str() {
            "open" => mirrored.insert("close".to_string(), mirror_fence(value)),
            "close" => mirrored.insert("open".to_string(), mirror_fence(value)),
            "notation" if value.trim() == "radical" => {
                mirrored.insert(name.clone(), "top right".to_string())
            }
            _ => mirrored.insert(name.clone(), value.clone()),
        };
    }
    mirrored.insert("dir".to_string(), "ltr".to_string());
    mirrored
}

fn mirrored_children(t: &Transformer, node: &Node, scope: &Scope) -> Vec<Node> {
    node.children()
        .iter()
        .rev()
        .flat_map(|child| t.dispatch(child, Mode::Mirror, scope))
        .collect()
}

/// Mirror of the `index`th child, or an empty mrow when the child is missing
fn mirrored_child(t: &Transformer, node: &Node, index: usize, scope: &Scope) -> Node {
    match node.children().get(index) {
        Some(child) => wrap_single(t.dispatch(child, Mode::Mirror, scope)),
        None => Node::element("mrow"),
    }
}

fn mirror_element(t: &Transformer, node: &Node, _: Mode, scope: &Scope) -> Vec<Node> {
    let children = mirrored_children(t, node, scope);
    vec![node
        .shallow_copy(children)
        .with_attributes(mirror_attributes(node))]
}

fn mirror_in_place(t: &Transformer, node: &Node, _: Mode, scope: &Scope) -> Vec<Node> {
    let children = t.dispatch_children(node, Mode::Mirror, scope);
    vec![node
        .shallow_copy(children)
        .with_attributes(mirror_attributes(node))]
}

/// Attributes that only mean something on mfrac
const FRACTION_ATTRIBUTES: [&str; 4] = ["bevelled", "linethickness", "numalign", "denomalign"];

fn mirror_bevelled(t: &Transformer, node: &Node, _: Mode, scope: &Scope) -> Vec<Node> {
    let numerator = mirrored_child(t, node, 0, scope);
    let denominator = mirrored_child(t, node, 1, scope);
    let mut attributes = mirror_attributes(node);
    attributes.retain(|name, _| !FRACTION_ATTRIBUTES.contains(&name.as_str()));
    vec![Node::new(
        "mrow",
        vec![
            Node::new("msub", vec![Node::element("mi"), denominator]),
            Node::leaf("mo", "\\"),
            Node::new("msup", vec![Node::element("mi"), numerator]),
        ],
    )
    .with_attributes(attributes)]
}

fn mirror_root(t: &Transformer, node: &Node, _: Mode, scope: &Scope) -> Vec<Node> {
    let radicand = node
        .children()
        .first()
        .map(|child| t.dispatch(child, Mode::Mirror, scope))
        .unwrap_or_default();
    let index = mirrored_child(t, node, 1, scope);
    let enclosure = Node::new("menclose", radicand)
        .with_attributes(mirror_attributes(node))
        .with_attr("notation", "top right");
    vec![Node::new("msup", vec![enclosure, index])]
}

fn mirror_sqrt(t: &Transformer, node: &Node, _: Mode, scope: &Scope) -> Vec<Node> {
    vec![Node::new("menclose", mirrored_children(t, node, scope))
        .with_attributes(mirror_attributes(node))
        .with_attr("notation", "top right")]
}

/// Single sub/superscript pair moved in front of the base
fn mirror_scripts(t: &Transformer, node: &Node, scope: &Scope, sub: Node, sup: Node) -> Vec<Node> {
    let base = mirrored_child(t, node, 0, scope);
    vec![Node::new(
        "mmultiscripts",
        vec![base, Node::element("mprescripts"), sub, sup],
    )
    .with_attributes(mirror_attributes(node))]
}

type ScriptPair = (Node, Node);

/// Split the script list after the base into pairs, padding a lone trailing
/// script with `none`
fn script_pairs(t: &Transformer, scripts: &[Node], scope: &Scope) -> Vec<ScriptPair> {
    scripts
        .chunks(2)
        .map(|pair| {
            let sub = wrap_single(t.dispatch(&pair[0], Mode::Mirror, scope));
            let sup = match pair.get(1) {
                Some(sup) => wrap_single(t.dispatch(sup, Mode::Mirror, scope)),
                None => Node::element("none"),
            };
            (sub, sup)
        })
        .collect()
}

fn flatten_pairs(pairs: Vec<ScriptPair>) -> impl Iterator<Item = Node> {
    pairs.into_iter().rev().flat_map(|(sub, sup)| [sub, sup])
}

fn mirror_multiscripts(t: &Transformer, node: &Node, _: Mode, scope: &Scope) -> Vec<Node> {
    let children: Vec<Node> = node.element_children().cloned().collect();
    let Some((base, scripts)) = children.split_first() else {
        return mirror_in_place(t, node, Mode::Mirror, scope);
    };
    let split = scripts.iter().position(|child| child.is("mprescripts"));
    let (post, pre) = match split {
        Some(at) => (&scripts[..at], &scripts[at + 1..]),
        None => (scripts, &[][..]),
    };

    let mut mirrored = vec![wrap_single(t.dispatch(base, Mode::Mirror, scope))];
    mirrored.extend(flatten_pairs(script_pairs(t, pre, scope)));
    mirrored.push(Node::element("mprescripts"));
    mirrored.extend(flatten_pairs(script_pairs(t, post, scope)));

    vec![Node::new("mmultiscripts", mirrored).with_attributes(mirror_attributes(node))]
}

fn mirror_postscripts_only(t: &Transformer, node: &Node, _: Mode, scope: &Scope) -> Vec<Node> {
    let children: Vec<Node> = node.element_children().cloned().collect();
    let Some((base, post)) = children.split_first() else {
        return mirror_in_place(t, node, Mode::Mirror, scope);
    };

    let mut mirrored = vec![
        wrap_single(t.dispatch(base, Mode::Mirror, scope)),
        Node::element("mprescripts"),
    ];
    mirrored.extend(flatten_pairs(script_pairs(t, post, scope)));

    vec![Node::new("mmultiscripts", mirrored).with_attributes(mirror_attributes(node))]
}
