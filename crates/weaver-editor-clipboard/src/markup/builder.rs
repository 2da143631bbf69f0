//! Tree building, sanitizing, and whitespace handling for tokenized markup.

use smol_str::SmolStr;

use crate::content::{ContentElement, ContentFragment, ContentNode, is_block_name};
use crate::markup::tokenizer::Token;

/// Elements dropped together with their content.
fn is_dropped(name: &str) -> bool {
    matches!(
        name,
        "script"
            | "style"
            | "head"
            | "title"
            | "meta"
            | "link"
            | "template"
            | "iframe"
            | "object"
            | "embed"
            | "noscript"
            | "svg"
            | "math"
    )
}

/// Generic containers treated as `div`.
fn is_div_like(name: &str) -> bool {
    matches!(
        name,
        "section"
            | "article"
            | "header"
            | "footer"
            | "main"
            | "nav"
            | "aside"
            | "address"
            | "figure"
            | "figcaption"
            | "dl"
            | "dt"
            | "dd"
            | "table"
            | "thead"
            | "tbody"
            | "tfoot"
            | "tr"
            | "td"
            | "th"
            | "caption"
    )
}

/// Elements kept in the content tree. Everything else is unwrapped.
fn is_kept(name: &str) -> bool {
    is_block_name(name)
        || matches!(
            name,
            "br" | "img"
                | "a"
                | "b"
                | "strong"
                | "i"
                | "em"
                | "u"
                | "s"
                | "strike"
                | "del"
                | "code"
                | "span"
                | "sub"
                | "sup"
                | "mark"
        )
}

fn is_url_attribute(name: &str) -> bool {
    matches!(name, "href" | "src" | "action" | "formaction" | "xlink:href")
}

/// Whether a URL would run script when followed.
fn is_script_url(value: &str) -> bool {
    let compact: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .take(11)
        .collect();
    compact
        .get(..11)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("javascript:"))
}

fn sanitize_attributes(attributes: Vec<(SmolStr, String)>) -> std::collections::BTreeMap<SmolStr, String> {
    attributes
        .into_iter()
        .filter(|(name, value)| {
            if name.starts_with("on") {
                return false;
            }
            !(is_url_attribute(name) && is_script_url(value))
        })
        .collect()
}

struct TreeBuilder {
    root: Vec<ContentNode>,
    stack: Vec<ContentElement>,
    /// Name and nesting depth of a dropped element being skipped.
    skipping: Option<(SmolStr, usize)>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            root: Vec::new(),
            stack: Vec::new(),
            skipping: None,
        }
    }

    fn append(&mut self, node: ContentNode) {
        match self.stack.last_mut() {
            Some(open) => open.children.push(node),
            None => self.root.push(node),
        }
    }

    fn append_text(&mut self, text: String) {
        if text.is_empty() {
            return;
        }
        let children = match self.stack.last_mut() {
            Some(open) => &mut open.children,
            None => &mut self.root,
        };
        if let Some(ContentNode::Text(last)) = children.last_mut() {
            last.push_str(&text);
        } else {
            children.push(ContentNode::Text(text));
        }
    }

    fn pop(&mut self) {
        if let Some(open) = self.stack.pop() {
            self.append(ContentNode::Element(open));
        }
    }

    /// Close open elements down to and including the nearest `name`.
    fn close(&mut self, name: &str) -> bool {
        let Some(index) = self.stack.iter().rposition(|open| open.name == name) else {
            return false;
        };
        while self.stack.len() > index {
            self.pop();
        }
        true
    }

    fn is_open(&self, name: &str) -> bool {
        self.stack.iter().any(|open| open.name == name)
    }

    fn start_tag(&mut self, name: SmolStr, attributes: Vec<(SmolStr, String)>, self_closing: bool) {
        if let Some((skipped, depth)) = &mut self.skipping {
            if *skipped == name && !self_closing {
                *depth += 1;
            }
            return;
        }
        if is_dropped(&name) {
            if !self_closing {
                self.skipping = Some((name, 1));
            }
            return;
        }
        let name = if is_div_like(&name) {
            SmolStr::new_static("div")
        } else {
            name
        };
        if !is_kept(&name) {
            return;
        }
        if is_block_name(&name) && self.is_open("p") {
            self.close("p");
        }
        if name == "li" {
            self.close_open_list_item();
        }
        let element = ContentElement {
            name,
            attributes: sanitize_attributes(attributes),
            children: Vec::new(),
        };
        if self_closing {
            self.append(ContentNode::Element(element));
        } else {
            self.stack.push(element);
        }
    }

    /// An `li` start closes the previous item of the same list.
    fn close_open_list_item(&mut self) {
        let nearest = self
            .stack
            .iter()
            .rev()
            .map(|open| open.name.as_str())
            .find(|name| matches!(*name, "li" | "ul" | "ol"));
        if nearest == Some("li") {
            self.close("li");
        }
    }

    fn end_tag(&mut self, name: SmolStr) {
        if let Some((skipped, depth)) = &mut self.skipping {
            if *skipped == name {
                *depth -= 1;
                if *depth == 0 {
                    self.skipping = None;
                }
            }
            return;
        }
        let name = if is_div_like(&name) {
            SmolStr::new_static("div")
        } else {
            name
        };
        if name == "br" {
            // `</br>` is a line break in every browser.
            self.append(ContentElement::new("br").into());
            return;
        }
        if !self.close(&name) && name == "p" {
            // A stray `</p>` stands for an empty paragraph.
            self.append(ContentElement::new("p").into());
        }
    }

    fn finish(mut self) -> Vec<ContentNode> {
        while !self.stack.is_empty() {
            self.pop();
        }
        self.root
    }
}

/// Build a sanitized content tree from tokens.
pub(crate) fn build(tokens: Vec<Token>) -> ContentFragment {
    let mut builder = TreeBuilder::new();
    for token in tokens {
        match token {
            Token::Text(text) => {
                if builder.skipping.is_none() {
                    builder.append_text(text);
                }
            }
            Token::StartTag {
                name,
                attributes,
                self_closing,
            } => builder.start_tag(name, attributes, self_closing),
            Token::EndTag(name) => builder.end_tag(name),
            Token::Comment(_) | Token::Doctype(_) => {}
        }
    }
    let mut children = builder.finish();
    collapse_whitespace(&mut children, &mut true, false);
    trim_block_ends(&mut children);
    ContentFragment::new(children)
}

fn is_html_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\u{c}')
}

/// Collapse whitespace runs outside `pre` and drop leading whitespace at
/// line starts. `line_start` is shared across inline boundaries.
fn collapse_whitespace(nodes: &mut Vec<ContentNode>, line_start: &mut bool, in_pre: bool) {
    for node in nodes.iter_mut() {
        match node {
            ContentNode::Text(text) if in_pre => {
                *line_start = text.ends_with('\n');
            }
            ContentNode::Text(text) => {
                let mut out = String::with_capacity(text.len());
                let mut pending_space = false;
                for c in text.chars() {
                    if is_html_space(c) {
                        pending_space = true;
                        continue;
                    }
                    if pending_space && !(*line_start && out.is_empty()) {
                        out.push(' ');
                    }
                    pending_space = false;
                    out.push(c);
                }
                if pending_space && !(*line_start && out.is_empty()) {
                    out.push(' ');
                }
                if !out.is_empty() {
                    *line_start = out.ends_with(' ');
                }
                *text = out;
            }
            ContentNode::Element(element) => {
                let name = element.name.as_str();
                if name == "br" {
                    *line_start = true;
                } else if name == "img" {
                    *line_start = false;
                } else if is_block_name(name) {
                    *line_start = true;
                    collapse_whitespace(&mut element.children, line_start, in_pre || name == "pre");
                    *line_start = true;
                } else {
                    collapse_whitespace(&mut element.children, line_start, in_pre);
                }
            }
        }
    }
    nodes.retain(|node| !matches!(node, ContentNode::Text(text) if text.is_empty()));
}

/// Trim trailing whitespace before every block boundary and line break.
fn trim_block_ends(nodes: &mut Vec<ContentNode>) {
    let mut run_start = 0;
    for index in 0..nodes.len() {
        let boundary = match &nodes[index] {
            ContentNode::Element(e) => e.name == "br" || is_block_name(&e.name),
            ContentNode::Text(_) => false,
        };
        if boundary {
            trim_trailing(&mut nodes[run_start..index]);
            run_start = index + 1;
        }
    }
    let len = nodes.len();
    trim_trailing(&mut nodes[run_start..len]);
    for node in nodes.iter_mut() {
        if let ContentNode::Element(element) = node {
            if element.name != "pre" {
                trim_block_ends(&mut element.children);
            }
        }
    }
    nodes.retain(|node| !matches!(node, ContentNode::Text(text) if text.is_empty()));
}

/// Trim whitespace off the end of an inline run. Returns true once
/// non-whitespace content was reached.
fn trim_trailing(nodes: &mut [ContentNode]) -> bool {
    for node in nodes.iter_mut().rev() {
        match node {
            ContentNode::Text(text) => {
                let trimmed = text.trim_end_matches(' ').len();
                text.truncate(trimmed);
                if !text.is_empty() {
                    return true;
                }
            }
            ContentNode::Element(element) if element.name == "img" => return true,
            ContentNode::Element(element) => {
                if trim_trailing(&mut element.children) {
                    return true;
                }
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::tokenizer::tokenize;
    use crate::markup::writer::to_data;

    fn roundtrip(html: &str) -> String {
        to_data(&build(tokenize(html)))
    }

    #[test]
    fn test_drops_unsafe_content() {
        assert_eq!(
            roundtrip("<p onclick=\"x()\">a<script>evil()</script>b</p><style>p{}</style>"),
            "<p>ab</p>"
        );
        assert_eq!(
            roundtrip("<a href=\" JavaScript:alert(1)\" title=\"t\">x</a>"),
            "<a title=\"t\">x</a>"
        );
    }

    #[test]
    fn test_unwraps_document_and_unknown_elements() {
        assert_eq!(
            roundtrip("<html><head><title>T</title></head><body><font>hi</font></body></html>"),
            "hi"
        );
        assert_eq!(roundtrip("<section>a</section>"), "<div>a</div>");
    }

    #[test]
    fn test_recovers_from_bad_nesting() {
        assert_eq!(roundtrip("<p>one<p>two"), "<p>one</p><p>two</p>");
        assert_eq!(roundtrip("<b>x</i>y</b>"), "<b>xy</b>");
        assert_eq!(roundtrip("<ul><li>a<li>b</ul>"), "<ul><li>a</li><li>b</li></ul>");
        assert_eq!(roundtrip("<p>open <b>bold"), "<p>open <b>bold</b></p>");
    }

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(
            roundtrip("\n<p>  Hello \n  <b> World </b>  </p>\n<p>x</p>"),
            "<p>Hello <b>World</b></p><p>x</p>"
        );
        assert_eq!(roundtrip("<p>a <br> b</p>"), "<p>a<br>b</p>");
    }

    #[test]
    fn test_preserves_pre() {
        assert_eq!(roundtrip("<pre>a  b\n  c</pre>"), "<pre>a  b\n  c</pre>");
    }
}
