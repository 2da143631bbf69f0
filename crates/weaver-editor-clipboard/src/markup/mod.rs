//! HTML interop at the clipboard boundary.
//!
//! Parsing never fails. Malformed markup degrades to the best structure
//! the tree builder can recover; unsafe elements and attributes are
//! dropped on the way in.

mod builder;
mod entities;
mod tokenizer;
mod writer;

pub use writer::{to_data, to_plain_text};

use crate::content::ContentFragment;

/// Parse and sanitize an HTML string.
pub fn parse(html: &str) -> ContentFragment {
    let tokens = tokenizer::tokenize(html);
    tracing::trace!(tokens = tokens.len(), "tokenized clipboard markup");
    builder::build(tokens)
}

/// Conversion between a data format and content fragments.
pub trait DataProcessor {
    fn to_view(&self, data: &str) -> ContentFragment;

    fn to_data(&self, fragment: &ContentFragment) -> String;
}

/// HTML data processor.
#[derive(Clone, Copy, Debug, Default)]
pub struct HtmlDataProcessor;

impl DataProcessor for HtmlDataProcessor {
    fn to_view(&self, data: &str) -> ContentFragment {
        parse(data)
    }

    fn to_data(&self, fragment: &ContentFragment) -> String {
        to_data(fragment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processor_round_trip() {
        let processor = HtmlDataProcessor;
        let fragment = processor.to_view("<p>Hello <b>World</b></p>");
        assert_eq!(processor.to_data(&fragment), "<p>Hello <b>World</b></p>");
        assert_eq!(to_plain_text(&fragment), "Hello World");
    }

    #[test]
    fn test_parse_never_fails_on_garbage() {
        let fragment = parse("<<>></p><div <b =>x</");
        insta::assert_snapshot!(to_data(&fragment), @r#"&lt;&lt;&gt;&gt;<p></p><div b="">x</div>"#);
    }
}
