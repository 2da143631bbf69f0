//! Raw clipboard payload to content tree.

use std::borrow::Cow;

use crate::content::{ContentElement, ContentFragment, ContentNode};
use crate::markup;
use crate::transfer::ClipboardPayload;

const START_FRAGMENT: &str = "<!--StartFragment-->";
const END_FRAGMENT: &str = "<!--EndFragment-->";
const CONVERTED_SPACE_OPEN: &str = "<span class=\"Apple-converted-space\">";
const SPAN_CLOSE: &str = "</span>";

/// Turn a payload into a content fragment.
///
/// Markup wins over plain text. Plain text becomes one `p` per line.
/// Neither present gives an empty fragment. Never fails.
pub fn normalize(payload: &ClipboardPayload) -> ContentFragment {
    if let Some(html) = payload.html.as_deref() {
        let cleaned = normalize_clipboard_html(html);
        let fragment = markup::parse(&cleaned);
        tracing::trace!(nodes = fragment.children.len(), "normalized markup payload");
        return fragment;
    }
    if let Some(text) = payload.plain_text.as_deref() {
        return plain_text_to_content(text);
    }
    ContentFragment::default()
}

/// One paragraph per line. Blank lines stay as empty paragraphs.
pub fn plain_text_to_content(text: &str) -> ContentFragment {
    if text.is_empty() {
        return ContentFragment::default();
    }
    text.lines()
        .map(|line| {
            let paragraph = ContentElement::new("p");
            if line.is_empty() {
                paragraph.into()
            } else {
                ContentNode::from(paragraph.with_text(line.replace('\t', "    ")))
            }
        })
        .collect()
}

/// Strip what native clipboards wrap around copied markup.
///
/// Only the `StartFragment`/`EndFragment` slice is kept when both
/// comments are present. Converted-space spans become plain spaces.
pub fn normalize_clipboard_html(html: &str) -> Cow<'_, str> {
    let sliced = fragment_slice(html);
    if !sliced.contains(CONVERTED_SPACE_OPEN) {
        return Cow::Borrowed(sliced);
    }
    Cow::Owned(replace_converted_spaces(sliced))
}

fn fragment_slice(html: &str) -> &str {
    let Some(start) = html.find(START_FRAGMENT) else {
        return html;
    };
    let body = &html[start + START_FRAGMENT.len()..];
    match body.find(END_FRAGMENT) {
        Some(end) => &body[..end],
        None => html,
    }
}

fn replace_converted_spaces(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(open) = rest.find(CONVERTED_SPACE_OPEN) {
        out.push_str(&rest[..open]);
        let inner_start = open + CONVERTED_SPACE_OPEN.len();
        let after_open = &rest[inner_start..];
        let Some(close) = after_open.find(SPAN_CLOSE) else {
            out.push_str(&rest[open..]);
            return out;
        };
        let inner = &after_open[..close];
        match count_spaces(inner) {
            Some(count) => out.push_str(&converted_spaces(count)),
            None => out.push_str(&rest[open..inner_start + close + SPAN_CLOSE.len()]),
        }
        rest = &after_open[close + SPAN_CLOSE.len()..];
    }
    out.push_str(rest);
    out
}

/// Number of spaces in a span made only of whitespace and `&nbsp;`.
fn count_spaces(inner: &str) -> Option<usize> {
    let mut count = 0;
    let mut rest = inner;
    while !rest.is_empty() {
        if let Some(tail) = rest.strip_prefix("&nbsp;") {
            rest = tail;
        } else {
            let c = rest.chars().next()?;
            if !c.is_whitespace() {
                return None;
            }
            rest = &rest[c.len_utf8()..];
        }
        count += 1;
    }
    (count > 0).then_some(count)
}

/// A single space, or alternating no-break and plain spaces so the run
/// survives whitespace collapsing.
fn converted_spaces(count: usize) -> String {
    if count == 1 {
        return " ".to_string();
    }
    (0..count)
        .map(|i| if i % 2 == 0 { '\u{a0}' } else { ' ' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(html: Option<&str>, text: Option<&str>) -> ClipboardPayload {
        ClipboardPayload {
            html: html.map(str::to_string),
            plain_text: text.map(str::to_string),
        }
    }

    #[test]
    fn test_markup_preferred_over_text() {
        let fragment = normalize(&payload(Some("<p>a<b>b</b></p>"), Some("ignored")));
        assert_eq!(markup::to_data(&fragment), "<p>a<b>b</b></p>");
    }

    #[test]
    fn test_plain_text_lines() {
        let fragment = normalize(&payload(None, Some("one\r\n\ntwo")));
        assert_eq!(markup::to_data(&fragment), "<p>one</p><p></p><p>two</p>");
    }

    #[test]
    fn test_empty_payload() {
        assert!(normalize(&payload(None, None)).is_empty());
        assert!(normalize(&payload(None, Some(""))).is_empty());
    }

    #[test]
    fn test_fragment_markers_slice() {
        let html = "<html><body><meta charset=\"utf-8\">junk<!--StartFragment--><b>x</b><!--EndFragment-->tail</body></html>";
        assert_eq!(normalize_clipboard_html(html), "<b>x</b>");
    }

    #[test]
    fn test_converted_spaces() {
        let html = "a<span class=\"Apple-converted-space\">&nbsp;</span>b<span class=\"Apple-converted-space\">\u{a0} \u{a0}</span>c";
        assert_eq!(normalize_clipboard_html(html), "a b\u{a0} \u{a0}c");
        let untouched = "<span class=\"Apple-converted-space\">x</span>";
        assert_eq!(normalize_clipboard_html(untouched), untouched);
    }
}
