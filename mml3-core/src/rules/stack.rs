// Digit stacks
//
// An mstack is laid out in three steps. Its children are lowered to typed
// rows with anchor columns (StackOffset), those rows are padded into an
// mtable whose alignment columns line up, and that table is re-scanned in
// StackEmit mode to turn line rows into underlines.

use super::engine::{Mode, Rule, Scope, StackSettings};
use crate::processor::Transformer;
use crate::types::{
    half_even, normalize_space, wrap_single, CarryLocation, Crossout, LineThickness, Node,
    StackAlign,
};

// ===== ROW MODEL =====

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Column(i64),
    /// Line without a length, stretched over the whole stack
    Fill,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Content(Vec<Node>),
    /// A rule segment contributed by an msline nested in an msrow
    Line(LineThickness),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CarryEntry {
    pub content: Vec<Node>,
    pub location: CarryLocation,
    pub crossout: Vec<Crossout>,
}

impl CarryEntry {
    pub fn decorates(&self) -> bool {
        !self.content.is_empty() || !self.crossout.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    Content {
        anchor: i64,
        cells: Vec<Cell>,
        /// Whether the row came from (or contains) an mn
        numeral: bool,
    },
    Line {
        anchor: Anchor,
        length: usize,
        thickness: LineThickness,
    },
    Carries {
        anchor: i64,
        entries: Vec<CarryEntry>,
    },
}

impl Row {
    /// Anchor column, if the row takes part in width resolution
    pub fn column(&self) -> Option<i64> {
        match self {
            Row::Content { anchor, .. } | Row::Carries { anchor, .. } => Some(*anchor),
            Row::Line {
                anchor: Anchor::Column(column),
                ..
            } => Some(*column),
            Row::Line {
                anchor: Anchor::Fill,
                ..
            } => None,
        }
    }
}

// ===== RULES =====

/// Default-mode entry point plus the emit and carry rules
pub fn tree_rules() -> Vec<Rule<Node>> {
    vec![
        Rule {
            name: "mstack",
            priority: 1,
            matches: |node, mode| mode == Mode::Default && node.is("mstack"),
            apply: layout_stack,
        },
        Rule {
            name: "stack-emit-table",
            priority: 1,
            matches: |node, mode| mode == Mode::StackEmit && node.is("mtable"),
            apply: emit_table,
        },
        Rule {
            name: "carry-bare",
            priority: 0,
            matches: |node, mode| mode == Mode::CarryEmit && node.is_element(),
            apply: |t, node, _, scope| scaled(t.dispatch(node, Mode::Default, scope), scope),
        },
        Rule {
            name: "carry-entry",
            priority: 1,
            matches: |node, mode| mode == Mode::CarryEmit && node.is("mscarry"),
            apply: carry_entry,
        },
        Rule {
            name: "carry-none",
            priority: 2,
            matches: |node, mode| mode == Mode::CarryEmit && node.is("none"),
            apply: |_, _, _, _| Vec::new(),
        },
    ]
}

/// Any child of a stack that is not a stack row becomes one cell
pub fn cell_fallback_rule() -> Rule<Row> {
    Rule {
        name: "stack-cell",
        priority: 0,
        matches: |_, _| true,
        apply: |t, node, _, scope| {
            let anchor = match scope.stack.align {
                StackAlign::Left => scope.offset,
                _ => scope.offset + 1,
            };
            vec![Row::Content {
                anchor,
                cells: vec![Cell::Content(t.dispatch(node, Mode::Default, scope))],
                numeral: false,
            }]
        },
    }
}

pub fn row_rules() -> Vec<Rule<Row>> {
    vec![
        Rule {
            name: "stack-mn",
            priority: 1,
            matches: |node, mode| mode == Mode::StackOffset && node.is("mn"),
            apply: lower_number,
        },
        Rule {
            name: "stack-msrow",
            priority: 1,
            matches: |node, mode| mode == Mode::StackOffset && node.is("msrow"),
            apply: lower_composite,
        },
        Rule {
            name: "stack-msgroup",
            priority: 1,
            matches: |node, mode| mode == Mode::StackOffset && node.is("msgroup"),
            apply: lower_group,
        },
        Rule {
            name: "stack-msline",
            priority: 1,
            matches: |node, mode| mode == Mode::StackOffset && node.is("msline"),
            apply: lower_line,
        },
        Rule {
            name: "stack-mscarries",
            priority: 1,
            matches: |node, mode| mode == Mode::StackOffset && node.is("mscarries"),
            apply: lower_carries,
        },
        Rule {
            name: "stack-whitespace",
            priority: 1,
            matches: |node, mode| {
                mode == Mode::StackOffset && node.as_text().is_some_and(|v| v.trim().is_empty())
            },
            apply: |_, _, _, _| Vec::new(),
        },
    ]
}

// ===== COLUMN ASSIGNMENT =====

fn position(node: &Node) -> i64 {
    node.attr_i64("position")
}

fn lower_number(_: &Transformer, node: &Node, _: Mode, scope: &Scope) -> Vec<Row> {
    let digits = normalize_space(&node.text_content());
    let separator = scope.stack.decimal_point.as_str();
    let attributes = node.attributes().cloned().unwrap_or_default();

    let cells: Vec<Cell> = digits
        .chars()
        .map(|c| {
            let glyph = c.to_string();
            let is_separator = glyph == separator || c == '.' || c == ',';
            let mn = Node::leaf("mn", glyph).with_attributes(attributes.clone());
            if is_separator {
                Cell::Content(vec![Node::element("mspace").with_attr("width", ".15em"), mn])
            } else {
                Cell::Content(vec![mn])
            }
        })
        .collect();

    let p = scope.offset;
    let length = cells.len() as i64;
    let separator_at = if separator.is_empty() {
        None
    } else {
        digits
            .find(separator)
            .map(|byte| digits[..byte].chars().count() as i64)
    };
    let anchor = match scope.stack.align {
        StackAlign::Right => p + length,
        StackAlign::DecimalPoint => p + separator_at.unwrap_or(length),
        StackAlign::Center => half_even(p + length),
        StackAlign::Left => p,
    };

    vec![Row::Content {
        anchor,
        cells,
        numeral: true,
    }]
}

fn lower_composite(t: &Transformer, node: &Node, _: Mode, scope: &Scope) -> Vec<Row> {
    let inner = scope.with_offset(0);
    let mut cells: Vec<Cell> = Vec::new();
    let mut numeral_anchor: Option<i64> = None;

    for child in node.children() {
        for row in t.lower(child, &inner) {
            match row {
                Row::Content {
                    anchor,
                    cells: row_cells,
                    numeral,
                } => {
                    if numeral && numeral_anchor.is_none() {
                        numeral_anchor = Some(anchor + cells.len() as i64);
                    }
                    cells.extend(row_cells);
                }
                Row::Line {
                    anchor,
                    length,
                    thickness,
                } => {
                    let count = match anchor {
                        Anchor::Fill => 1,
                        Anchor::Column(_) => length,
                    };
                    cells.extend(std::iter::repeat(Cell::Line(thickness)).take(count));
                }
                Row::Carries { .. } => {
                    tracing::warn!("mscarries inside msrow has no row to attach to, skipping");
                }
            }
        }
    }

    let total = cells.len() as i64;
    let base = match (scope.stack.align, numeral_anchor) {
        (StackAlign::DecimalPoint, Some(anchor)) => anchor,
        (StackAlign::DecimalPoint | StackAlign::Right, _) => total,
        (StackAlign::Left | StackAlign::Center, _) => 0,
    };

    vec![Row::Content {
        anchor: base + position(node) + scope.offset,
        cells,
        numeral: numeral_anchor.is_some(),
    }]
}

fn lower_group(t: &Transformer, node: &Node, _: Mode, scope: &Scope) -> Vec<Row> {
    let start = scope.offset + position(node);
    let shift = node.attr_i64("shift");
    node.element_children()
        .enumerate()
        .flat_map(|(i, child)| t.lower(child, &scope.with_offset(start + i as i64 * shift)))
        .collect()
}

fn lower_line(_: &Transformer, node: &Node, _: Mode, scope: &Scope) -> Vec<Row> {
    let length = node
        .attr("length")
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    let thickness = node
        .attr("mslinethickness")
        .map(LineThickness::parse)
        .unwrap_or_else(|| scope.stack.line_thickness.clone());

    let p = scope.offset + position(node);
    let anchor = if length == 0 {
        Anchor::Fill
    } else {
        let end = p + length as i64;
        Anchor::Column(match scope.stack.align {
            StackAlign::Right | StackAlign::DecimalPoint => end,
            StackAlign::Left => p,
            StackAlign::Center => half_even(end),
        })
    };

    vec![Row::Line {
        anchor,
        length,
        thickness,
    }]
}

fn lower_carries(t: &Transformer, node: &Node, _: Mode, scope: &Scope) -> Vec<Row> {
    let carry_scale = node
        .attr("scriptsizemultiplier")
        .and_then(|value| value.trim().parse::<f64>().ok());
    let carry_scope = scope.with_carry_scale(carry_scale);

    let default_location = node.attr("location").map(CarryLocation::parse).unwrap_or_default();
    let default_crossout = node.attr("crossout").map(Crossout::parse_list).unwrap_or_default();

    let entries: Vec<CarryEntry> = node
        .element_children()
        .map(|child| {
            let (location, crossout) = if child.is("mscarry") {
                (
                    child.attr("location").map(CarryLocation::parse).unwrap_or(default_location),
                    child
                        .attr("crossout")
                        .map(Crossout::parse_list)
                        .unwrap_or_else(|| default_crossout.clone()),
                )
            } else {
                (default_location, default_crossout.clone())
            };
            CarryEntry {
                content: t.dispatch(child, Mode::CarryEmit, &carry_scope),
                location,
                crossout,
            }
        })
        .collect();

    let extent = match scope.stack.align {
        StackAlign::Left => 0,
        _ => entries.len() as i64,
    };

    vec![Row::Carries {
        anchor: scope.offset + position(node) + extent,
        entries,
    }]
}

// ===== CARRY CONTENT =====

fn carry_entry(t: &Transformer, node: &Node, _: Mode, scope: &Scope) -> Vec<Node> {
    let children: Vec<&Node> = node.element_children().collect();
    if children.iter().all(|child| child.is("none")) {
        return Vec::new();
    }
    scaled(t.dispatch_children(node, Mode::Default, scope), scope)
}

/// Apply the enclosing mscarries size multiplier, if any
fn scaled(content: Vec<Node>, scope: &Scope) -> Vec<Node> {
    match scope.carry_scale {
        Some(multiplier) if !content.is_empty() => {
            let percent = (multiplier / 0.007).round_ties_even() as i64;
            vec![Node::new("mstyle", content).with_attr("mathsize", format!("{percent}%"))]
        }
        _ => content,
    }
}

/// Overlay a carry on the digit it belongs to
fn decorate(base: Node, entry: &CarryEntry) -> Vec<Node> {
    let base = if entry.crossout.is_empty() {
        base
    } else {
        let notation: Vec<&str> = entry.crossout.iter().map(|c| c.notation()).collect();
        Node::new("menclose", vec![base]).with_attr("notation", notation.join(" "))
    };
    if entry.content.is_empty() {
        return vec![base];
    }

    let carry = wrap_single(entry.content.clone());
    let zero_width = |lspace: Option<&str>| {
        let padded = Node::new("mpadded", vec![carry.clone()]).with_attr("width", "0em");
        match lspace {
            Some(lspace) => padded.with_attr("lspace", lspace),
            None => padded,
        }
    };
    let prescripts = Node::element("mprescripts");

    match entry.location {
        CarryLocation::N => vec![Node::new("mover", vec![base, zero_width(Some("-0.5width"))])],
        CarryLocation::S => vec![Node::new("munder", vec![base, zero_width(Some("-0.5width"))])],
        CarryLocation::Nw => vec![Node::new(
            "mmultiscripts",
            vec![base, prescripts, Node::element("none"), zero_width(Some("-1width"))],
        )],
        CarryLocation::Sw => vec![Node::new(
            "mmultiscripts",
            vec![base, prescripts, zero_width(Some("-1width")), Node::element("none")],
        )],
        CarryLocation::Ne => vec![Node::new("msup", vec![base, zero_width(None)])],
        CarryLocation::Se => vec![Node::new("msub", vec![base, zero_width(None)])],
        CarryLocation::W => vec![
            Node::new("msup", vec![Node::element("mrow"), zero_width(Some("-1width"))]),
            base,
        ],
        CarryLocation::E => vec![
            base,
            Node::new("msup", vec![Node::element("mrow"), zero_width(None)]),
        ],
    }
}

// ===== TABLE MATERIALIZATION =====

fn resolve_settings(node: &Node, scope: &Scope) -> StackSettings {
    let align = node
        .attr("stackalign")
        .and_then(StackAlign::from_attr)
        .unwrap_or(scope.defaults.align);
    let decimal_point = node
        .attr("decimalpoint")
        .map(str::to_string)
        .or_else(|| scope.decimal_point.clone())
        .unwrap_or_else(|| scope.defaults.decimal_point.clone());
    StackSettings {
        align,
        decimal_point,
        line_thickness: scope.defaults.line_thickness.clone(),
    }
}

fn layout_stack(t: &Transformer, node: &Node, _: Mode, scope: &Scope) -> Vec<Node> {
    let settings = resolve_settings(node, scope);
    let inner = scope.with_stack(settings).with_offset(0);
    let rows: Vec<Row> = node
        .children()
        .iter()
        .flat_map(|child| t.lower(child, &inner))
        .collect();

    let table = materialize(node, &rows);
    t.dispatch(&table, Mode::StackEmit, scope)
}

fn empty_cell() -> Node {
    Node::element("mtd")
}

fn padding(count: i64) -> impl Iterator<Item = Node> {
    (0..count.max(0)).map(|_| empty_cell())
}

/// A short horizontal rule filling one column
fn line_glyph(thickness: &LineThickness) -> Node {
    let rule = Node::new(
        "mfrac",
        vec![
            Node::element("mspace").with_attr("width", ".5em"),
            Node::element("mrow"),
        ],
    )
    .with_attr("linethickness", thickness.to_length());
    Node::new("mpadded", vec![rule])
        .with_attr("lspace", "-0.2em")
        .with_attr("width", "0em")
        .with_attr("height", "0em")
}

fn cell_nodes(cell: &Cell) -> Vec<Node> {
    match cell {
        Cell::Content(nodes) => nodes.clone(),
        Cell::Line(thickness) => vec![line_glyph(thickness)],
    }
}

/// Padded rows of the stack, before underlines are applied
pub fn materialize(stack: &Node, rows: &[Row]) -> Node {
    let width = rows.iter().filter_map(Row::column).max().unwrap_or(0);
    let mut table = Node::element("mtable").with_attr("columnspacing", "0em");
    if let Some(align) = stack.attr("align") {
        table.set_attr("align", align);
    }

    let mut pending: Option<(i64, &[CarryEntry])> = None;
    for (i, row) in rows.iter().enumerate() {
        match row {
            Row::Carries { anchor, entries } => {
                if matches!(rows.get(i + 1), Some(Row::Content { .. })) {
                    pending = Some((*anchor, entries.as_slice()));
                } else {
                    table.push_child(carry_row(width, *anchor, entries));
                }
            }
            Row::Content { anchor, cells, .. } => {
                table.push_child(content_row(width, *anchor, cells, pending.take()));
            }
            Row::Line {
                anchor,
                length,
                thickness,
            } => table.push_child(line_row(width, *anchor, *length, thickness)),
        }
    }
    table
}

fn content_row(width: i64, anchor: i64, cells: &[Cell], carries: Option<(i64, &[CarryEntry])>) -> Node {
    let pad = (width - anchor).max(0);
    let carry_at = |column: i64| {
        let (carry_anchor, entries) = carries?;
        let index = column - (width - carry_anchor);
        usize::try_from(index).ok().and_then(|index| entries.get(index))
    };

    let mut mtr = Node::element("mtr");
    for column in 0..pad {
        let cell = match carry_at(column) {
            Some(entry) if entry.decorates() => {
                let phantom = Node::new("mphantom", vec![Node::leaf("mn", "0")]);
                Node::new("mtd", decorate(phantom, entry))
            }
            _ => empty_cell(),
        };
        mtr.push_child(cell);
    }
    for (i, cell) in cells.iter().enumerate() {
        let nodes = cell_nodes(cell);
        let cell = match carry_at(pad + i as i64) {
            Some(entry) if entry.decorates() => Node::new("mtd", decorate(wrap_single(nodes), entry)),
            _ => Node::new("mtd", nodes),
        };
        mtr.push_child(cell);
    }
    mtr
}

fn carry_row(width: i64, anchor: i64, entries: &[CarryEntry]) -> Node {
    let mut mtr = Node::new("mtr", padding(width - anchor).collect());
    for entry in entries {
        mtr.push_child(Node::new("mtd", entry.content.clone()));
    }
    mtr
}

fn line_row(width: i64, anchor: Anchor, length: usize, thickness: &LineThickness) -> Node {
    let (pad, count) = match anchor {
        Anchor::Fill => (0, width.max(0) as usize),
        Anchor::Column(column) => (width - column, length),
    };
    let mut mtr = Node::new("mtr", padding(pad).collect())
        .with_attr("class", "msline")
        .with_attr("linethickness", thickness.to_length());
    for _ in 0..count {
        mtr.push_child(Node::new("mtd", vec![line_glyph(thickness)]));
    }
    mtr
}

// ===== EMISSION =====

fn is_line_row(row: &Node) -> bool {
    row.attr("class") == Some("msline")
}

fn strip_markers(row: &Node) -> Node {
    let mut row = row.clone();
    row.remove_attr("class");
    row.remove_attr("linethickness");
    row
}

/// Underline every cell of `row` that sits above a rule segment of `line`
fn underline(row: Node, line: &Node) -> Node {
    let thickness = line.attr("linethickness").unwrap_or("0.15em").to_string();
    let covered: Vec<bool> = line
        .children()
        .iter()
        .map(|cell| !cell.children().is_empty())
        .collect();
    let cells = row.children();
    let count = cells
        .len()
        .max(covered.iter().rposition(|c| *c).map_or(0, |last| last + 1));

    let underlined = (0..count)
        .map(|j| {
            let cell = cells.get(j).cloned().unwrap_or_else(empty_cell);
            if !covered.get(j).copied().unwrap_or(false) {
                return cell;
            }
            let padded = Node::new("mpadded", cell.children().to_vec())
                .with_attr("depth", ".1em")
                .with_attr("height", "1em")
                .with_attr("width", ".5em");
            let enclosure = Node::new("menclose", vec![padded])
                .with_attr("notation", "bottom")
                .with_attr("linethickness", thickness.as_str());
            cell.shallow_copy(vec![enclosure])
        })
        .collect();
    row.shallow_copy(underlined)
}

fn emit_table(_: &Transformer, node: &Node, _: Mode, _: &Scope) -> Vec<Node> {
    let rows: Vec<&Node> = node.element_children().collect();
    let mut emitted = Vec::with_capacity(rows.len());

    for (i, row) in rows.iter().enumerate() {
        let line = is_line_row(row);
        if line && i > 0 {
            continue;
        }
        let mut out = strip_markers(row);
        if !line {
            if let Some(next) = rows.get(i + 1).filter(|next| is_line_row(next)) {
                out = underline(out, next);
            }
        }
        emitted.push(out);
    }

    vec![node.shallow_copy(emitted)]
}
