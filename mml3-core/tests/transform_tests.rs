//! End-to-end transform tests.
//!
//! Trees are built from MathML text through the XML codec, transformed with
//! the default config, and inspected directly. Larger inputs live in
//! `test_fixtures/`.

use mml3_core::rules::{Mode, Scope};
use mml3_core::{xml, LongDivStyle, Node, TransformConfig, Transformer};
use std::collections::HashSet;
use std::path::PathBuf;

// ============================================================================
// Helpers
// ============================================================================

fn transform(source: &str) -> Node {
    let transformer = Transformer::new().expect("default rule sets are valid");
    transformer.transform(&xml::parse(source).expect("test input is well-formed"))
}

fn load_fixture(name: &str) -> Node {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("test_fixtures")
        .join(name);
    let contents = std::fs::read_to_string(&path)
        .unwrap_or_else(|_| panic!("Missing fixture: {}", path.display()));
    xml::parse(&contents).expect("fixture is well-formed")
}

/// Every element named `tag`, in document order
fn find_all<'a>(node: &'a Node, tag: &str, found: &mut Vec<&'a Node>) {
    if node.is(tag) {
        found.push(node);
    }
    for child in node.children() {
        find_all(child, tag, found);
    }
}

fn count(node: &Node, tag: &str) -> usize {
    let mut found = Vec::new();
    find_all(node, tag, &mut found);
    found.len()
}

/// Non-empty cells of a table row as `(column, text)`
fn filled_cells(row: &Node) -> Vec<(usize, String)> {
    row.children()
        .iter()
        .enumerate()
        .map(|(column, cell)| (column, cell.text_content()))
        .filter(|(_, text)| !text.is_empty())
        .collect()
}

/// Columns of a table row drawn with an underline
fn underlined_columns(row: &Node) -> Vec<usize> {
    row.children()
        .iter()
        .enumerate()
        .filter(|(_, cell)| count(cell, "menclose") > 0)
        .map(|(column, _)| column)
        .collect()
}

fn cells(entries: &[(usize, &str)]) -> Vec<(usize, String)> {
    entries
        .iter()
        .map(|(column, text)| (*column, text.to_string()))
        .collect()
}

fn strip_dir(node: &Node) -> Node {
    let mut copy = node.shallow_copy(node.children().iter().map(strip_dir).collect());
    copy.remove_attr("dir");
    copy
}

const ELEMENTARY_TAGS: [&str; 7] = [
    "mstack", "msrow", "msgroup", "msline", "mscarries", "mscarry", "mlongdiv",
];

fn assert_base_vocabulary(node: &Node) {
    for tag in ELEMENTARY_TAGS {
        assert_eq!(count(node, tag), 0, "{tag} left in output: {node}");
    }
}

// ============================================================================
// Mirroring
// ============================================================================

mod mirror {
    use super::*;

    fn mirror_once(transformer: &Transformer, node: &Node) -> Node {
        let scope = Scope::root(transformer.config());
        let mut out = transformer.dispatch(node, Mode::Mirror, &scope);
        assert_eq!(out.len(), 1);
        out.remove(0)
    }

    #[test]
    fn fences_and_text_mirror_back_to_the_original() {
        let transformer = Transformer::new().unwrap();
        let tree = xml::parse(
            "<mrow><mo>(</mo><mi>x</mi><mo>\u{2208}</mo>\
             <mfenced open=\"[\" close=\"}\"><mi>a</mi><mi>b</mi></mfenced>\
             <mo>&lt;</mo><mo>{</mo></mrow>",
        )
        .unwrap();

        let once = mirror_once(&transformer, &tree);
        assert_ne!(strip_dir(&once), tree);
        let twice = mirror_once(&transformer, &once);
        assert_eq!(strip_dir(&twice), tree);
    }

    #[test]
    fn multiscripts_with_prescripts_mirror_back_exactly() {
        let transformer = Transformer::new().unwrap();
        let tree = xml::parse(
            "<mmultiscripts><mi>x</mi><mi>a</mi><mi>b</mi><mi>c</mi><mi>d</mi>\
             <mprescripts/><mi>e</mi><mi>f</mi></mmultiscripts>",
        )
        .unwrap();

        let once = mirror_once(&transformer, &tree);
        assert_ne!(strip_dir(&once), tree);
        let twice = mirror_once(&transformer, &once);
        assert_eq!(strip_dir(&twice), tree);
    }

    #[test]
    fn single_scripts_mirror_back_to_postscript_multiscripts() {
        let transformer = Transformer::new().unwrap();
        let cases = [
            (
                "<msup><mi>x</mi><mn>2</mn></msup>",
                "<mmultiscripts><mi>x</mi><none/><mn>2</mn><mprescripts/></mmultiscripts>",
            ),
            (
                "<msub><mi>x</mi><mn>2</mn></msub>",
                "<mmultiscripts><mi>x</mi><mn>2</mn><none/><mprescripts/></mmultiscripts>",
            ),
            (
                "<msubsup><mi>x</mi><mi>i</mi><mn>2</mn></msubsup>",
                "<mmultiscripts><mi>x</mi><mi>i</mi><mn>2</mn><mprescripts/></mmultiscripts>",
            ),
        ];

        for (source, expected) in cases {
            let tree = xml::parse(source).unwrap();
            let once = mirror_once(&transformer, &tree);
            assert!(once.is("mmultiscripts"), "{source} mirrored to {once}");
            let twice = mirror_once(&transformer, &once);
            assert_eq!(strip_dir(&twice), xml::parse(expected).unwrap(), "{source}");
        }
    }

    #[test]
    fn rtl_fixture_uses_ltr_constructs_only() {
        let transformer = Transformer::new().unwrap();
        let out = transformer.transform(&load_fixture("rtl_expression.xml"));

        assert_base_vocabulary(&out);
        assert_eq!(count(&out, "msup"), 0);
        assert_eq!(count(&out, "msqrt"), 0);
        assert_eq!(count(&out, "mmultiscripts"), 1);
        let rendered = out.to_string();
        assert!(!rendered.contains("dir=\"rtl\""));
        assert!(rendered.contains(r#"close=")""#));
        assert!(rendered.contains(r#"open="[""#));
    }
}

// ============================================================================
// Digit stacks
// ============================================================================

mod stack {
    use super::*;

    /// Column of the first cell in `row` whose text is `glyph`
    fn column_of(row: &Node, glyph: &str) -> Option<usize> {
        row.children()
            .iter()
            .position(|cell| cell.text_content() == glyph)
    }

    #[test]
    fn decimal_points_share_a_column() {
        let table = transform("<mstack><mn>123.45</mn><mn>6.7</mn></mstack>");
        assert!(table.is("mtable"));
        let rows = table.children();
        assert_eq!(rows.len(), 2);

        let first = column_of(&rows[0], ".").unwrap();
        let second = column_of(&rows[1], ".").unwrap();
        assert_eq!(first, second);
        assert_eq!(first, 3);
    }

    #[test]
    fn configured_separator_is_used_for_alignment() {
        let config = TransformConfig::from_yaml_str("stack:\n  decimal_point: \",\"\n").unwrap();
        let transformer = Transformer::with_config(config).unwrap();
        let table = transformer
            .transform(&xml::parse("<mstack><mn>1,5</mn><mn>10,25</mn></mstack>").unwrap());
        let rows = table.children();
        assert_eq!(column_of(&rows[0], ","), column_of(&rows[1], ","));
    }

    #[test]
    fn one_north_carry_decorates_one_cell() {
        let table = transform(
            "<mstack><mscarries><none/><mscarry location=\"n\"><mn>1</mn></mscarry><none/></mscarries>\
             <mn>123</mn><msline/><mn>45</mn></mstack>",
        );
        assert_eq!(table.children().len(), 2);

        let mut overs = Vec::new();
        find_all(&table, "mover", &mut overs);
        assert_eq!(overs.len(), 1);
        assert_eq!(overs[0].children()[0].text_content(), "2");

        let decorated = table.children()[0]
            .children()
            .iter()
            .filter(|cell| count(cell, "mover") > 0)
            .count();
        assert_eq!(decorated, 1);
    }

    #[test]
    fn borrows_fixture_lowers_completely() {
        let out = transform(&load_fixture("subtraction_with_borrows.xml").to_string());
        assert_base_vocabulary(&out);

        let rendered = out.to_string();
        assert!(rendered.contains(r#"mathsize="86%""#));
        assert!(rendered.contains(r#"notation="updiagonalstrike""#));
        assert_eq!(count(&out, "mmultiscripts"), 1);
        assert!(rendered.contains(r#"<mspace width=".15em"/><mn>,</mn>"#));
    }

    #[test]
    fn nested_stack_is_laid_out_inside_a_cell() {
        let table = transform(
            "<mstack><mn>1</mn><mrow><mstack stackalign=\"left\"><mn>22</mn></mstack></mrow></mstack>",
        );
        assert_eq!(count(&table, "mtable"), 2);
        assert_base_vocabulary(&table);
    }
}

// ============================================================================
// Long division
// ============================================================================

mod long_division {
    use super::*;

    fn marker(style: LongDivStyle) -> &'static [&'static str] {
        match style {
            LongDivStyle::LeftTop => &["<mo>)</mo>"],
            LongDivStyle::StackedRightRight => &[r#"notation="right""#],
            LongDivStyle::MediumStackedRightRight => &[r#"notation="left""#],
            LongDivStyle::ShortStackedRightRight => &[r#"notation="left bottom""#],
            LongDivStyle::RightTop => &[r#"notation="top left bottom""#],
            LongDivStyle::LeftSlashRight => &["<mo>/</mo>", "<mo>\\</mo>"],
            LongDivStyle::LeftParenRight => &["<mo>)</mo>", "<mo>(</mo>"],
            LongDivStyle::ColonRightEqualsRight => &["<mo>:</mo>", "<mo>=</mo>"],
            LongDivStyle::StackedLeftLeft => &[r#"notation="left""#],
            LongDivStyle::StackedLeftLineTop => &[r#"notation="bottom right""#],
        }
    }

    fn divide(style: LongDivStyle) -> Node {
        let source = format!(
            "<mlongdiv longdivstyle=\"{}\"><mn>3</mn><mn>4</mn><mn>12</mn><mn>12</mn></mlongdiv>",
            style.name()
        );
        transform(&source)
    }

    #[test]
    fn every_style_shows_its_glyphs() {
        for style in LongDivStyle::ALL {
            let out = divide(style);
            let rendered = out.to_string();
            for glyph in marker(style) {
                assert!(
                    rendered.contains(glyph),
                    "{} output lacks {glyph}: {rendered}",
                    style.name()
                );
            }
            assert_base_vocabulary(&out);
        }
    }

    #[test]
    fn no_two_styles_render_alike() {
        let outputs: HashSet<String> = LongDivStyle::ALL
            .iter()
            .map(|style| divide(*style).to_string())
            .collect();
        assert_eq!(outputs.len(), LongDivStyle::ALL.len());
    }

    #[test]
    fn colon_style_is_a_single_row() {
        let out = transform(
            "<mlongdiv longdivstyle=\":right=right\"><mn>3</mn><mn>12</mn><mn>36</mn></mlongdiv>",
        );
        assert_eq!(
            out.to_string(),
            "<mrow><mn>36</mn><mo>:</mo><mn>3</mn><mo>=</mo><mn>12</mn></mrow>"
        );
        assert_eq!(count(&out, "mtable"), 0);
    }

    #[test]
    fn unknown_style_renders_as_lefttop() {
        let unknown = transform(
            "<mlongdiv longdivstyle=\"diagonal\"><mn>3</mn><mn>4</mn><mn>12</mn></mlongdiv>",
        );
        let lefttop = transform("<mlongdiv><mn>3</mn><mn>4</mn><mn>12</mn></mlongdiv>");
        assert_eq!(unknown, lefttop);
    }

    #[test]
    fn worked_fixture_lowers_completely() {
        let out = transform(&load_fixture("long_division.xml").to_string());
        assert!(out.is("math"));
        assert_base_vocabulary(&out);
        assert!(out.to_string().contains("<mo>)</mo>"));
    }

    #[test]
    fn worked_fixture_staggers_rows_and_confines_rules() {
        let out = transform(&load_fixture("long_division.xml").to_string());
        let table = &out.children()[0];
        assert!(table.is("mtable"));
        let rows = table.children();
        assert_eq!(rows.len(), 8);

        let expected: [(&[(usize, &str)], &[usize]); 8] = [
            (&[(3, "4"), (4, "3"), (5, "5")], &[2, 3, 4, 5]),
            (
                &[(0, "3"), (1, ")"), (2, "1"), (3, "3"), (4, "0"), (5, "6")],
                &[],
            ),
            (&[(2, "1"), (3, "2")], &[2, 3]),
            (&[(3, "1"), (4, "0")], &[]),
            (&[(4, "9")], &[3, 4]),
            (&[(4, "1"), (5, "6")], &[]),
            (&[(4, "1"), (5, "5")], &[4, 5]),
            (&[(5, "1")], &[]),
        ];
        for (i, (row, (filled, underlined))) in rows.iter().zip(expected).enumerate() {
            assert_eq!(filled_cells(row), cells(filled), "row {i}");
            assert_eq!(underlined_columns(row), underlined.to_vec(), "row {i}");
        }
    }

    #[test]
    fn decimal_dividend_rule_spans_the_dividend() {
        let table = transform("<mlongdiv><mn>3</mn><mn>1.2</mn><mn>3.6</mn></mlongdiv>");
        let rows = table.children();
        assert_eq!(rows.len(), 2);

        assert_eq!(
            filled_cells(&rows[0]),
            cells(&[(2, "1"), (3, "."), (4, "2")])
        );
        assert_eq!(underlined_columns(&rows[0]), vec![2, 3, 4]);
        assert_eq!(
            filled_cells(&rows[1]),
            cells(&[(0, "3"), (1, ")"), (2, "3"), (3, "."), (4, "6")])
        );
    }
}

// ============================================================================
// Passthrough and serialization
// ============================================================================

mod passthrough {
    use super::*;

    #[test]
    fn unknown_markup_is_copied_in_order() {
        let source = r#"<math display="block"><mfrac><mi>a</mi><mrow><mi>b</mi><mo>+</mo><mn>1</mn></mrow></mfrac></math>"#;
        assert_eq!(transform(source).to_string(), source);
    }

    #[test]
    fn children_of_unknown_elements_are_still_transformed() {
        let out = transform(
            r#"<semantics id="s1"><mstack><mn>1</mn></mstack><annotation>x</annotation></semantics>"#,
        );
        assert!(out.is("semantics"));
        assert_eq!(out.attr("id"), Some("s1"));
        assert!(out.children()[0].is("mtable"));
        assert!(out.children()[1].is("annotation"));
    }

    #[test]
    fn trees_serialize_to_tagged_json() {
        let out = transform("<mrow><mi>x</mi></mrow>");
        let value = serde_json::to_value(&out).unwrap();
        assert_eq!(value["kind"], "element");
        assert_eq!(value["tag"], "mrow");
        assert_eq!(value["children"][0]["children"][0]["kind"], "text");

        let back: Node = serde_json::from_value(value).unwrap();
        assert_eq!(back, out);
    }
}
