//! MathML XML codec
//!
//! Reads MathML text into the `Node` tree and writes trees back out. Element
//! and attribute names are kept by local name, so `m:mstack` and `mstack`
//! read the same. Namespace declarations are dropped; the writer emits bare
//! MathML without them.

use crate::error::{Error, Result};
use crate::types::Node;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::BTreeMap;

/// Parse a MathML document with exactly one root element
pub fn parse(input: &str) -> Result<Node> {
    let mut reader = Reader::from_str(input);
    reader.trim_text(true);

    let mut open: Vec<Node> = Vec::new();
    let mut root: Option<Node> = None;

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(start) => open.push(read_element(&start)?),
            Event::Empty(start) => {
                let node = read_element(&start)?;
                attach(&mut open, &mut root, node)?;
            }
            Event::End(_) => {
                let node = open
                    .pop()
                    .ok_or_else(|| Error::Xml("closing tag without opening tag".to_string()))?;
                attach(&mut open, &mut root, node)?;
            }
            Event::Text(text) => {
                let value = text.unescape().map_err(xml_error)?;
                push_text(&mut open, &value)?;
            }
            Event::CData(data) => {
                let value = String::from_utf8_lossy(&data.into_inner()).into_owned();
                push_text(&mut open, &value)?;
            }
            Event::Eof => break,
            // declarations, comments, processing instructions, doctype
            _ => {}
        }
    }

    if let Some(unclosed) = open.last() {
        return Err(Error::Xml(format!(
            "unclosed element <{}>",
            unclosed.tag().unwrap_or_default()
        )));
    }
    root.ok_or_else(|| Error::Xml("document has no root element".to_string()))
}

fn xml_error(err: impl std::fmt::Display) -> Error {
    Error::Xml(err.to_string())
}

fn read_element(start: &BytesStart) -> Result<Node> {
    let tag = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let mut attributes = BTreeMap::new();

    for attr in start.attributes() {
        let attr = attr.map_err(xml_error)?;
        let key = attr.key.as_ref();
        if key == b"xmlns" || key.starts_with(b"xmlns:") {
            continue;
        }
        let name = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr.unescape_value().map_err(xml_error)?.into_owned();
        attributes.insert(name, value);
    }

    Ok(Node::element(tag).with_attributes(attributes))
}

fn attach(open: &mut [Node], root: &mut Option<Node>, node: Node) -> Result<()> {
    match open.last_mut() {
        Some(parent) => parent.push_child(node),
        None if root.is_none() => *root = Some(node),
        None => return Err(Error::Xml("more than one root element".to_string())),
    }
    Ok(())
}

fn push_text(open: &mut [Node], value: &str) -> Result<()> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(());
    }
    match open.last_mut() {
        Some(parent) => {
            parent.push_child(Node::text(value));
            Ok(())
        }
        None => Err(Error::Xml(format!("text outside the root element: {value:?}"))),
    }
}

/// Compact serialization: attributes sorted, childless elements self-closed
pub fn to_string(node: &Node) -> String {
    let mut out = String::new();
    write_node(node, &mut out);
    out
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Text { value } => out.push_str(&escape(value.as_str())),
        Node::Element {
            tag,
            attributes,
            children,
        } => {
            out.push('<');
            out.push_str(tag);
            for (name, value) in attributes {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&escape(value.as_str()));
                out.push('"');
            }
            if children.is_empty() {
                out.push_str("/>");
                return;
            }
            out.push('>');
            for child in children {
                write_node(child, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_drops_namespace_and_whitespace() {
        let node = parse(
            r#"<m:math xmlns:m="http://www.w3.org/1998/Math/MathML">
                 <m:mn> 12 </m:mn>
                 <m:mo stretchy="false">&lt;</m:mo>
               </m:math>"#,
        )
        .unwrap();

        assert!(node.is("math"));
        assert!(node.attributes().unwrap().is_empty());
        assert_eq!(node.children().len(), 2);
        assert_eq!(node.children()[0].text_content(), "12");
        assert_eq!(node.children()[1].attr("stretchy"), Some("false"));
        assert_eq!(node.children()[1].text_content(), "<");
    }

    #[test]
    fn test_write_sorts_attributes_and_escapes() {
        let node = Node::leaf("mo", "<")
            .with_attr("stretchy", "false")
            .with_attr("form", "infix");
        assert_eq!(
            to_string(&node),
            r#"<mo form="infix" stretchy="false">&lt;</mo>"#
        );
        assert_eq!(to_string(&Node::element("none")), "<none/>");
    }

    #[test]
    fn test_parse_rejects_malformed_documents() {
        assert!(matches!(parse("<mrow><mi>x</mi>"), Err(Error::Xml(_))));
        assert!(matches!(parse("<mi>x</mi><mi>y</mi>"), Err(Error::Xml(_))));
        assert!(matches!(parse("   "), Err(Error::Xml(_))));
        assert!(parse("<mrow><mi>x</mo></mrow>").is_err());
    }

    #[test]
    fn test_write_then_read_keeps_tree() {
        let source = r#"<mstack stackalign="right"><mn>123</mn><msline/><mn>45</mn></mstack>"#;
        let node = parse(source).unwrap();
        assert_eq!(to_string(&node), source);
    }
}
