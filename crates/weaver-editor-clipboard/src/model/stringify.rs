//! Compact markup rendering of model trees for logs and tests.
//!
//! Elements render as `<name attr="value">…</name>`; text with attributes
//! renders as `<$text attr="value">…</$text>`.

use std::fmt::Write;

use crate::model::document::Document;
use crate::model::node::{Attributes, Element, Node};
use crate::model::position::{Position, Range};

/// Render the root content of a document.
pub fn stringify(doc: &Document) -> String {
    stringify_nodes(&doc.root().children)
}

/// Render a list of nodes.
pub fn stringify_nodes(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(&mut out, node);
    }
    out
}

/// Render the root content with the selection drawn in: `[` and `]` for
/// its boundaries, `[]` when collapsed.
pub fn stringify_with_selection(doc: &Document) -> String {
    let mut out = String::new();
    write_children(&mut out, doc.root(), &mut Vec::new(), doc.selection());
    out
}

fn write_attributes(out: &mut String, attributes: &Attributes) {
    for (key, value) in attributes.iter() {
        let _ = write!(out, " {key}=\"{value}\"");
    }
}

fn write_node(out: &mut String, node: &Node) {
    match node {
        Node::Text(text) if text.attributes.is_empty() => out.push_str(&text.data),
        Node::Text(text) => {
            out.push_str("<$text");
            write_attributes(out, &text.attributes);
            out.push('>');
            out.push_str(&text.data);
            out.push_str("</$text>");
        }
        Node::Element(element) => {
            open_tag(out, element);
            for child in &element.children {
                write_node(out, child);
            }
            close_tag(out, element);
        }
    }
}

fn open_tag(out: &mut String, element: &Element) {
    out.push('<');
    out.push_str(&element.name);
    write_attributes(out, &element.attributes);
    out.push('>');
}

fn close_tag(out: &mut String, element: &Element) {
    let _ = write!(out, "</{}>", element.name);
}

fn boundary(out: &mut String, at: &Position, selection: &Range) {
    if selection.is_collapsed() {
        if *at == selection.start {
            out.push_str("[]");
        }
    } else if *at == selection.start {
        out.push('[');
    } else if *at == selection.end {
        out.push(']');
    }
}

fn write_children(out: &mut String, element: &Element, path: &mut Vec<usize>, selection: &Range) {
    let mut offset = 0;
    for child in &element.children {
        boundary(out, &Position::at(path, offset), selection);
        match child {
            Node::Text(text) => {
                let styled = !text.attributes.is_empty();
                if styled {
                    out.push_str("<$text");
                    write_attributes(out, &text.attributes);
                    out.push('>');
                }
                for (i, ch) in text.data.chars().enumerate() {
                    if i > 0 {
                        boundary(out, &Position::at(path, offset + i), selection);
                    }
                    out.push(ch);
                }
                if styled {
                    out.push_str("</$text>");
                }
            }
            Node::Element(inner) => {
                open_tag(out, inner);
                path.push(offset);
                write_children(out, inner, path, selection);
                path.pop();
                close_tag(out, inner);
            }
        }
        offset += child.size();
    }
    boundary(out, &Position::at(path, offset), selection);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::node::Text;

    #[test]
    fn test_stringify_formats_text_attributes() {
        let nodes = vec![
            Element::new("paragraph")
                .with_children([
                    Node::text("foo"),
                    Text::new("x").with_attribute("bold", true).into(),
                ])
                .into(),
        ];
        assert_eq!(
            stringify_nodes(&nodes),
            "<paragraph>foo<$text bold=\"true\">x</$text></paragraph>"
        );
    }

    #[test]
    fn test_stringify_draws_selection() {
        let mut doc = Document::with_children(vec![
            Element::new("paragraph").with_text("abc").into(),
            Element::new("paragraph").into(),
        ]);
        assert_eq!(
            stringify_with_selection(&doc),
            "<paragraph>[]abc</paragraph><paragraph></paragraph>"
        );
        doc.change(|doc| {
            doc.set_selection(Range::new(Position::new(vec![0, 1]), Position::new(vec![1, 0])))
        })
        .unwrap();
        assert_eq!(
            stringify_with_selection(&doc),
            "<paragraph>a[bc</paragraph><paragraph>]</paragraph>"
        );
    }
}
