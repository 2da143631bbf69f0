//! Model range to clipboard payload.

use crate::content::ContentFragment;
use crate::convert;
use crate::markup::{self, DataProcessor, HtmlDataProcessor};
use crate::model::{EditingModel, Range};
use crate::transfer::{DataTransfer, TEXT_HTML, TEXT_PLAIN};

/// Serialized clipboard flavors.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClipboardData {
    pub markup: String,
    pub plain_text: String,
}

impl ClipboardData {
    pub fn from_content(content: &ContentFragment) -> Self {
        Self {
            markup: HtmlDataProcessor.to_data(content),
            plain_text: markup::to_plain_text(content),
        }
    }

    /// Write both flavors into a transfer.
    pub fn write_to(&self, transfer: &mut DataTransfer) {
        transfer.set_data(TEXT_HTML, self.markup.clone());
        transfer.set_data(TEXT_PLAIN, self.plain_text.clone());
    }
}

/// Detached view of the content of `range`. Later edits to the model do
/// not reach it.
pub fn selected_content<M: EditingModel>(model: &M, range: &Range) -> ContentFragment {
    convert::to_view(&model.get_selected_content(range))
}

/// Serialize the content of `range`.
pub fn serialize<M: EditingModel>(model: &M, range: &Range) -> ClipboardData {
    ClipboardData::from_content(&selected_content(model, range))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Document, Element, Node, Position, Text};

    fn pos(path: &[usize]) -> Position {
        Position::new(path.to_vec())
    }

    fn doc() -> Document {
        Document::with_children(vec![
            Element::new("paragraph")
                .with_children([
                    Node::text("Hello "),
                    Text::new("World").with_attribute("bold", true).into(),
                ])
                .into(),
            Element::new("image").with_attribute("src", "a.png").into(),
            Element::new("heading1").with_text("Title").into(),
        ])
    }

    #[test]
    fn test_serialize_blocks() {
        let doc = doc();
        let data = serialize(&doc, &Range::new(pos(&[0, 0]), pos(&[2, 3])));
        insta::assert_snapshot!(
            data.markup,
            @r#"<p>Hello <strong>World</strong></p><img src="a.png"><h1>Tit</h1>"#
        );
        assert_eq!(data.plain_text, "Hello World\nTit");
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut doc = doc();
        let range = Range::new(pos(&[0, 6]), pos(&[0, 11]));
        let content = selected_content(&doc, &range);
        doc.change(|doc| doc.delete_content(&range, Default::default()).map(|_| ()))
            .unwrap();
        assert_eq!(content.text_content(), "World");
        assert_eq!(ClipboardData::from_content(&content).markup, "<strong>World</strong>");
    }

    #[test]
    fn test_write_to_transfer() {
        let mut transfer = DataTransfer::new();
        ClipboardData {
            markup: "<p>x</p>".into(),
            plain_text: "x".into(),
        }
        .write_to(&mut transfer);
        assert_eq!(transfer.get_data(TEXT_HTML), Some("<p>x</p>"));
        assert_eq!(transfer.get_data(TEXT_PLAIN), Some("x"));
    }
}
