//! Conversion between content trees and model fragments.
//!
//! Upcasting maps HTML tag hints onto schema elements and text attributes.
//! Blocks found where only inline content fits split the surrounding text
//! block, so the result never nests a block inside a text block.
//! Downcasting renders model content back into tags for the clipboard.

use smol_str::SmolStr;

use crate::content::{ContentElement, ContentFragment, ContentNode};
use crate::model::{Attributes, ChildKind, Element, Fragment, Node, Schema, Text};

pub const LIST_TYPE: &str = "listType";
pub const LIST_INDENT: &str = "listIndent";
pub const BULLETED: &str = "bulleted";
pub const NUMBERED: &str = "numbered";
const LIST_ITEM: &str = "listItem";
const BLOCK_QUOTE: &str = "blockQuote";

/// Convert a content fragment into a model fragment for `context`.
pub fn to_model(content: &ContentFragment, schema: &Schema, context: &str) -> Fragment {
    Upcast::new(schema).to_model(content, context)
}

/// Content to model conversion against a schema.
#[derive(Clone, Copy, Debug)]
pub struct Upcast<'a> {
    schema: &'a Schema,
    paragraph: &'a str,
}

/// List nesting the converter is inside.
#[derive(Clone, Copy)]
struct ListContext {
    numbered: bool,
    indent: i64,
}

/// Output of one block-level container during upcasting.
struct Sink {
    nodes: Vec<Node>,
    /// Text block receiving inline content.
    open: Option<Element>,
    /// Loose inline content gets wrapped in a paragraph.
    wrap: bool,
    container: SmolStr,
}

impl Sink {
    fn new(container: &str, wrap: bool) -> Self {
        Self {
            nodes: Vec::new(),
            open: None,
            wrap,
            container: SmolStr::new(container),
        }
    }

    /// Finish the open text block, dropping it if it stayed empty.
    fn close(&mut self) {
        if let Some(mut block) = self.open.take() {
            if !block.is_empty() {
                block.normalize();
                self.nodes.push(block.into());
            }
        }
    }

    fn push_block(&mut self, block: Element) {
        self.close();
        self.nodes.push(block.into());
    }

    fn finish(mut self) -> Vec<Node> {
        self.close();
        let mut holder = Element::new(self.container).with_children(self.nodes);
        holder.normalize();
        holder.children
    }
}

impl<'a> Upcast<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self {
            schema,
            paragraph: "paragraph",
        }
    }

    /// Element wrapping loose inline content and generic blocks.
    pub fn with_paragraph(mut self, paragraph: &'a str) -> Self {
        self.paragraph = paragraph;
        self
    }

    pub fn to_model(&self, content: &ContentFragment, context: &str) -> Fragment {
        let wrap = !self.schema.allows_child(context, ChildKind::Text);
        let mut sink = Sink::new(context, wrap);
        for node in &content.children {
            self.convert(node, &mut sink, &Attributes::new(), None);
        }
        Fragment::new(sink.finish())
    }

    fn push_inline(&self, sink: &mut Sink, node: Node) {
        if sink.open.is_none() {
            if !sink.wrap {
                sink.nodes.push(node);
                return;
            }
            sink.open = Some(Element::new(self.paragraph));
        }
        if let Some(open) = sink.open.as_mut() {
            open.children.push(node);
        }
    }

    fn push_text(&self, sink: &mut Sink, text: &str, attributes: &Attributes) {
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 && self.schema.is_registered("softBreak") {
                self.push_inline(sink, Element::new("softBreak").into());
            }
            if !line.is_empty() {
                self.push_inline(
                    sink,
                    Text {
                        data: line.to_string(),
                        attributes: attributes.clone(),
                    }
                    .into(),
                );
            }
        }
    }

    fn convert(&self, node: &ContentNode, sink: &mut Sink, attributes: &Attributes, list: Option<ListContext>) {
        let element = match node {
            ContentNode::Text(text) => return self.push_text(sink, text, attributes),
            ContentNode::Element(element) => element,
        };
        match element.name.as_str() {
            "p" | "div" | "pre" => {
                self.text_block(sink, Element::new(self.paragraph), &element.children, attributes, list)
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let name = heading_name(&element.name);
                let template = if self.schema.is_registered(name) {
                    Element::new(name)
                } else {
                    Element::new(self.paragraph)
                };
                self.text_block(sink, template, &element.children, attributes, list)
            }
            "blockquote" => self.block_quote(sink, element, attributes),
            "ul" | "ol" => {
                let indent = list.map_or(0, |l| l.indent + 1);
                let context = ListContext {
                    numbered: element.name == "ol",
                    indent,
                };
                for child in &element.children {
                    if child.is_element("li") {
                        self.convert(child, sink, attributes, Some(context));
                    } else if let ContentNode::Text(text) = child {
                        // Whitespace between items.
                        if !text.trim().is_empty() {
                            self.list_item(sink, std::slice::from_ref(child), attributes, context);
                        }
                    } else {
                        self.convert(child, sink, attributes, Some(context));
                    }
                }
            }
            "li" => {
                let context = list.unwrap_or(ListContext {
                    numbered: false,
                    indent: 0,
                });
                self.list_item(sink, &element.children, attributes, context);
            }
            "img" => {
                if let Some(image) = self.image(element) {
                    sink.push_block(image);
                }
            }
            "hr" => {
                if self.schema.is_registered("horizontalLine") {
                    sink.push_block(Element::new("horizontalLine"));
                }
            }
            "br" => {
                if self.schema.is_registered("softBreak") {
                    self.push_inline(sink, Element::new("softBreak").into());
                }
            }
            _ => {
                let attributes = inline_attributes(element, attributes);
                for child in &element.children {
                    self.convert(child, sink, &attributes, list);
                }
            }
        }
    }

    /// Convert a text block. A block child closes it and the remaining
    /// inline content continues in a fresh paragraph.
    fn text_block(
        &self,
        sink: &mut Sink,
        template: Element,
        children: &[ContentNode],
        attributes: &Attributes,
        list: Option<ListContext>,
    ) {
        if let Some(open) = sink.open.as_mut().filter(|open| open.is_empty()) {
            // Nothing written yet: the inner block takes over, except that
            // list items keep their identity.
            if open.name != LIST_ITEM {
                *open = template;
            }
            for child in children {
                self.convert(child, sink, attributes, list);
            }
            return;
        }
        self.fill_block(sink, template, children, attributes, list);
    }

    /// Open `template` and convert `children` into it. Inline content
    /// left over after a nested block continues in a paragraph.
    fn fill_block(
        &self,
        sink: &mut Sink,
        template: Element,
        children: &[ContentNode],
        attributes: &Attributes,
        list: Option<ListContext>,
    ) {
        sink.close();
        let emitted = sink.nodes.len();
        let wrap = std::mem::replace(&mut sink.wrap, true);
        sink.open = Some(template);
        for child in children {
            self.convert(child, sink, attributes, list);
        }
        sink.wrap = wrap;
        let produced = sink.nodes.len() > emitted;
        if let Some(mut block) = sink.open.take() {
            if !block.is_empty() || !produced {
                block.normalize();
                sink.nodes.push(block.into());
            }
        }
    }

    fn list_item(&self, sink: &mut Sink, children: &[ContentNode], attributes: &Attributes, list: ListContext) {
        if !self.schema.is_registered(LIST_ITEM) {
            return self.text_block(sink, Element::new(self.paragraph), children, attributes, Some(list));
        }
        let kind = if list.numbered { NUMBERED } else { BULLETED };
        let template = Element::new(LIST_ITEM)
            .with_attribute(LIST_TYPE, kind)
            .with_attribute(LIST_INDENT, list.indent);
        self.fill_block(sink, template, children, attributes, Some(list));
    }

    fn block_quote(&self, sink: &mut Sink, element: &ContentElement, attributes: &Attributes) {
        if !self.schema.is_registered(BLOCK_QUOTE) || sink.container == BLOCK_QUOTE {
            // Quotes do not nest; the content joins the outer container.
            sink.close();
            for child in &element.children {
                self.convert(child, sink, attributes, None);
            }
            sink.close();
            return;
        }
        let mut inner = Sink::new(BLOCK_QUOTE, true);
        for child in &element.children {
            self.convert(child, &mut inner, attributes, None);
        }
        let quote = Element::new(BLOCK_QUOTE).with_children(inner.finish());
        sink.push_block(quote);
    }

    fn image(&self, element: &ContentElement) -> Option<Element> {
        if !self.schema.is_registered("image") {
            return None;
        }
        let src = element.attribute("src").filter(|src| !src.is_empty())?;
        let mut image = Element::new("image").with_attribute("src", src);
        if let Some(alt) = element.attribute("alt") {
            image = image.with_attribute("alt", alt);
        }
        Some(image)
    }
}

fn heading_name(tag: &str) -> &'static str {
    match tag {
        "h1" => "heading1",
        "h2" => "heading2",
        _ => "heading3",
    }
}

/// Text attributes contributed by an inline element on top of the
/// inherited ones.
fn inline_attributes(element: &ContentElement, inherited: &Attributes) -> Attributes {
    let mut attributes = inherited.clone();
    match element.name.as_str() {
        // Docs editors wrap whole documents in `<b style="font-weight:normal">`.
        "b" | "strong" if !element.style("font-weight").is_some_and(is_normal_weight) => {
            attributes.set("bold", true);
        }
        "i" | "em" => attributes.set("italic", true),
        "u" => attributes.set("underline", true),
        "s" | "strike" | "del" => attributes.set("strikethrough", true),
        "code" => attributes.set("code", true),
        "a" => {
            if let Some(href) = element.attribute("href").filter(|href| !href.is_empty()) {
                attributes.set("linkHref", href);
            }
        }
        _ => {}
    }
    if element.name == "span" {
        if element.style("font-weight").is_some_and(is_bold_weight) {
            attributes.set("bold", true);
        }
        if element
            .style("font-style")
            .is_some_and(|style| matches!(style, "italic" | "oblique"))
        {
            attributes.set("italic", true);
        }
        if let Some(decoration) = element.style("text-decoration") {
            if decoration.contains("underline") {
                attributes.set("underline", true);
            }
            if decoration.contains("line-through") {
                attributes.set("strikethrough", true);
            }
        }
    }
    attributes
}

fn is_bold_weight(weight: &str) -> bool {
    matches!(weight, "bold" | "bolder") || weight.parse::<u32>().is_ok_and(|w| w >= 600)
}

fn is_normal_weight(weight: &str) -> bool {
    matches!(weight, "normal" | "lighter") || weight.parse::<u32>().is_ok_and(|w| w < 600)
}

// === Downcast ===

/// Text attributes rendered as inline elements, outermost first.
const INLINE_TAGS: &[(&str, &str)] = &[
    ("bold", "strong"),
    ("italic", "i"),
    ("underline", "u"),
    ("strikethrough", "s"),
    ("code", "code"),
];

/// Render a model fragment as a content fragment.
pub fn to_view(fragment: &Fragment) -> ContentFragment {
    ContentFragment::new(nodes_to_view(fragment.children()))
}

fn nodes_to_view(nodes: &[Node]) -> Vec<ContentNode> {
    let mut out = Vec::new();
    let mut items: Vec<&Element> = Vec::new();
    for node in nodes {
        if let Node::Element(element) = node {
            if element.name == LIST_ITEM {
                items.push(element);
                continue;
            }
        }
        if !items.is_empty() {
            out.extend(build_lists(&items));
            items.clear();
        }
        match node {
            Node::Text(text) => out.push(text_to_view(text)),
            Node::Element(element) => out.extend(element_to_view(element)),
        }
    }
    if !items.is_empty() {
        out.extend(build_lists(&items));
    }
    out
}

fn element_to_view(element: &Element) -> Option<ContentNode> {
    let tag = match element.name.as_str() {
        "paragraph" => "p",
        "heading1" => "h1",
        "heading2" => "h2",
        "heading3" => "h3",
        "blockQuote" => "blockquote",
        "softBreak" => return Some(ContentElement::new("br").into()),
        "horizontalLine" => return Some(ContentElement::new("hr").into()),
        "image" => {
            let mut img = ContentElement::new("img");
            for key in ["src", "alt"] {
                if let Some(value) = element.attributes.get(key) {
                    img = img.with_attribute(key, value.to_string());
                }
            }
            return Some(img.into());
        }
        _ => "div",
    };
    Some(
        ContentElement::new(tag)
            .with_children(nodes_to_view(&element.children))
            .into(),
    )
}

fn text_to_view(text: &Text) -> ContentNode {
    let mut node = ContentNode::text(text.data.clone());
    for (key, tag) in INLINE_TAGS.iter().rev() {
        if text.attributes.contains(key) {
            node = ContentElement::new(*tag).with_children([node]).into();
        }
    }
    if let Some(href) = text.attributes.get("linkHref") {
        node = ContentElement::new("a")
            .with_attribute("href", href.to_string())
            .with_children([node])
            .into();
    }
    node
}

fn list_indent(item: &Element) -> i64 {
    match item.attributes.get(LIST_INDENT) {
        Some(crate::model::AttributeValue::Int(indent)) => (*indent).max(0),
        _ => 0,
    }
}

fn list_tag(item: &Element) -> &'static str {
    match item.attributes.get(LIST_TYPE) {
        Some(value) if value.to_string() == NUMBERED => "ol",
        _ => "ul",
    }
}

/// Group consecutive list items into nested `ul`/`ol` elements by indent.
fn build_lists(items: &[&Element]) -> Vec<ContentNode> {
    let mut out = Vec::new();
    let mut stack: Vec<(ContentElement, i64)> = Vec::new();
    for item in items {
        let indent = list_indent(item);
        let tag = list_tag(item);
        while stack.last().is_some_and(|(_, level)| *level > indent) {
            pop_list(&mut stack, &mut out);
        }
        if stack
            .last()
            .is_some_and(|(list, level)| *level == indent && list.name != tag)
        {
            pop_list(&mut stack, &mut out);
        }
        if stack.last().is_none_or(|(_, level)| *level < indent) {
            stack.push((ContentElement::new(tag), indent));
        }
        if let Some((list, _)) = stack.last_mut() {
            list.children.push(
                ContentElement::new("li")
                    .with_children(nodes_to_view(&item.children))
                    .into(),
            );
        }
    }
    while !stack.is_empty() {
        pop_list(&mut stack, &mut out);
    }
    out
}

/// Close the innermost list, nesting it in the last item of its parent.
fn pop_list(stack: &mut Vec<(ContentElement, i64)>, out: &mut Vec<ContentNode>) {
    let Some((list, _)) = stack.pop() else {
        return;
    };
    match stack.last_mut() {
        Some((parent, _)) => match parent.children.last_mut() {
            Some(ContentNode::Element(item)) => item.children.push(list.into()),
            _ => parent.children.push(list.into()),
        },
        None => out.push(list.into()),
    }
}
