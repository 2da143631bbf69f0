//! Markup and plain text output for content fragments.

use crate::content::{ContentFragment, ContentNode, is_block_name, is_void_name};

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
}

fn escape_attribute(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
}

fn write_nodes(nodes: &[ContentNode], out: &mut String) {
    for node in nodes {
        match node {
            ContentNode::Text(text) => escape_text(text, out),
            ContentNode::Element(element) => {
                out.push('<');
                out.push_str(&element.name);
                for (key, value) in &element.attributes {
                    out.push(' ');
                    out.push_str(key);
                    out.push_str("=\"");
                    escape_attribute(value, out);
                    out.push('"');
                }
                out.push('>');
                if is_void_name(&element.name) {
                    continue;
                }
                write_nodes(&element.children, out);
                out.push_str("</");
                out.push_str(&element.name);
                out.push('>');
            }
        }
    }
}

/// Serialize a fragment to HTML.
pub fn to_data(fragment: &ContentFragment) -> String {
    let mut out = String::new();
    write_nodes(&fragment.children, &mut out);
    out
}

/// Plain text writer: one line per block, `br` as a line break, images
/// and rules skipped.
struct PlainText {
    out: String,
    started: bool,
    pending_break: bool,
}

impl PlainText {
    fn begin_line_content(&mut self) {
        if self.pending_break && self.started {
            self.out.push('\n');
        }
        self.pending_break = false;
        self.started = true;
    }

    fn write(&mut self, nodes: &[ContentNode]) {
        for node in nodes {
            match node {
                ContentNode::Text(text) => {
                    self.begin_line_content();
                    self.out.extend(text.chars().map(|c| if c == '\u{a0}' { ' ' } else { c }));
                }
                ContentNode::Element(element) => match element.name.as_str() {
                    "br" => {
                        self.begin_line_content();
                        self.out.push('\n');
                    }
                    "img" | "hr" => {}
                    name if is_block_name(name) => {
                        self.pending_break = true;
                        let before = self.out.len();
                        let was_started = self.started;
                        self.write(&element.children);
                        let empty = self.out.len() == before && self.started == was_started;
                        if empty && !matches!(name, "ul" | "ol" | "blockquote" | "div") {
                            // An empty text block still takes a line.
                            self.begin_line_content();
                        }
                        self.pending_break = true;
                    }
                    _ => self.write(&element.children),
                },
            }
        }
    }
}

/// Linearize a fragment to plain text.
pub fn to_plain_text(fragment: &ContentFragment) -> String {
    let mut writer = PlainText {
        out: String::new(),
        started: false,
        pending_break: false,
    };
    writer.write(&fragment.children);
    writer.out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentElement;

    fn p(text: &str) -> ContentNode {
        ContentElement::new("p").with_text(text).into()
    }

    #[test]
    fn test_to_data_escapes() {
        let fragment = ContentFragment::new(vec![
            ContentElement::new("a")
                .with_attribute("href", "a?b=1&c=\"2\"")
                .with_text("x < y & z")
                .into(),
            ContentElement::new("br").into(),
        ]);
        assert_eq!(
            to_data(&fragment),
            "<a href=\"a?b=1&amp;c=&quot;2&quot;\">x &lt; y &amp; z</a><br>"
        );
    }

    #[test]
    fn test_plain_text_lines() {
        let fragment = ContentFragment::new(vec![
            p("one"),
            ContentElement::new("p").into(),
            ContentElement::new("img").into(),
            ContentElement::new("ul")
                .with_children([
                    ContentElement::new("li").with_text("a").into(),
                    ContentElement::new("li").with_text("b").into(),
                ])
                .into(),
            ContentElement::new("p")
                .with_children([
                    ContentNode::text("x"),
                    ContentElement::new("br").into(),
                    ContentNode::text("y\u{a0}z"),
                ])
                .into(),
        ]);
        assert_eq!(to_plain_text(&fragment), "one\n\na\nb\nx\ny z");
    }

    #[test]
    fn test_plain_text_inline_only() {
        let fragment = ContentFragment::new(vec![
            ContentNode::text("Hello "),
            ContentElement::new("b").with_text("World").into(),
        ]);
        assert_eq!(to_plain_text(&fragment), "Hello World");
    }
}
