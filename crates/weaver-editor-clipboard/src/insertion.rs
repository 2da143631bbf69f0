//! Content fragment to model insertion.
//!
//! Conversion happens against the `$clipboardHolder` context, which takes
//! anything, because the final insertion point is only known once the
//! change block runs. Fitting the content to the real parent is left to
//! [`EditingModel::insert_content`].

use crate::content::ContentFragment;
use crate::convert::Upcast;
use crate::error::ModelError;
use crate::model::{Attributes, CLIPBOARD_HOLDER, DeleteOptions, EditingModel, Fragment, Range, Schema};

/// Convert normalized content into a model fragment.
pub fn to_model_fragment(content: &ContentFragment, schema: &Schema, paragraph: &str) -> Fragment {
    Upcast::new(schema)
        .with_paragraph(paragraph)
        .to_model(content, CLIPBOARD_HOLDER)
}

/// A fragment that behaves like plain text: one child that is not an
/// object and carries no attributes of its own.
pub fn is_plain_text_fragment(fragment: &Fragment, schema: &Schema) -> bool {
    match fragment.children() {
        [only] => !schema.is_object_node(only) && only.attributes().is_empty(),
        _ => false,
    }
}

/// The formatting subset of an attribute set.
fn formatting_attributes(attributes: &Attributes, schema: &Schema) -> Attributes {
    let mut formatting = attributes.clone();
    formatting.retain(|key, _| schema.attribute_properties(key).is_formatting);
    formatting
}

/// Insert `fragment` at the selection as one change block.
///
/// Returns `Ok(None)` without opening a change block when the fragment is
/// empty. Plain-text content (flagged by the caller or detected) takes the
/// formatting attributes the selection had before its content was removed,
/// plus whatever attributes survive at the collapsed position, written over
/// each text node's own attributes key by key. `before_insert` runs inside
/// the block right before the model insertion and may rewrite the fragment;
/// a fragment it empties inserts nothing and also returns `Ok(None)`.
pub fn insert_fragment<M: EditingModel>(
    model: &mut M,
    fragment: Fragment,
    plain_text: bool,
    before_insert: impl FnOnce(&mut M, &mut Fragment),
) -> Result<Option<Range>, ModelError> {
    if fragment.is_empty() {
        tracing::debug!("nothing to insert");
        return Ok(None);
    }
    let plain_text = plain_text || is_plain_text_fragment(&fragment, model.schema());

    model
        .change(|model| {
            let mut fragment = fragment;
            if plain_text {
                let mut attributes = formatting_attributes(&model.selection_attributes(), model.schema());
                let selection = model.selection().clone();
                if !selection.is_collapsed() {
                    model.delete_content(
                        &selection,
                        DeleteOptions {
                            do_not_autoparagraph: true,
                        },
                    )?;
                }
                attributes.merge(&model.selection_attributes());
                tracing::trace!(attributes = attributes.len(), "applying selection attributes to plain text");
                fragment.for_each_text_mut(|text| text.attributes.merge(&attributes));
            }
            before_insert(model, &mut fragment);
            if fragment.is_empty() {
                tracing::debug!("content insertion emptied the fragment");
                return Ok(None);
            }
            model.insert_content(fragment).map(Some)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Document, Element, Node, Position, Text, stringify, stringify_with_selection};

    fn pos(path: &[usize]) -> Position {
        Position::new(path.to_vec())
    }

    #[test]
    fn test_plain_text_classification() {
        let schema = Schema::rich_text();
        let single = Fragment::new(vec![Element::new("paragraph").with_text("x").into()]);
        assert!(is_plain_text_fragment(&single, &schema));
        let object = Fragment::new(vec![Element::new("image").into()]);
        assert!(!is_plain_text_fragment(&object, &schema));
        let bold = Fragment::new(vec![Text::new("x").with_attribute("bold", true).into()]);
        assert!(!is_plain_text_fragment(&bold, &schema));
        let two = Fragment::new(vec![Node::text("a"), Element::new("softBreak").into()]);
        assert!(!is_plain_text_fragment(&two, &schema));
    }

    #[test]
    fn test_empty_fragment_opens_no_change() {
        let mut doc = Document::with_children(vec![Element::new("paragraph").with_text("foo").into()]);
        let result = insert_fragment(&mut doc, Fragment::default(), true, |_, _| {});
        assert_eq!(result, Ok(None));
        assert_eq!(doc.change_count(), 0);
    }

    #[test]
    fn test_plain_text_inherits_attribute_union() {
        let mut doc = Document::with_children(vec![
            Element::new("paragraph")
                .with_children([
                    Text::new("ab")
                        .with_attribute("bold", true)
                        .with_attribute("linkHref", "X")
                        .into(),
                    Node::text("cd"),
                ])
                .into(),
        ]);
        doc.change(|doc| doc.set_selection(Range::new(pos(&[0, 1]), pos(&[0, 3]))))
            .unwrap();
        let fragment = Fragment::new(vec![Node::text("Z")]);
        insert_fragment(&mut doc, fragment, false, |_, _| {}).unwrap();
        insta::assert_snapshot!(
            stringify_with_selection(&doc),
            @r#"<paragraph><$text bold="true" linkHref="X">aZ</$text>[]d</paragraph>"#
        );
        assert_eq!(doc.change_count(), 2);
    }

    #[test]
    fn test_plain_text_keeps_own_formatting() {
        let mut doc = Document::with_children(vec![
            Element::new("paragraph")
                .with_children([Text::new("ab").with_attribute("italic", true).into()])
                .into(),
        ]);
        doc.change(|doc| doc.set_selection(Range::collapsed(pos(&[0, 1]))))
            .unwrap();
        let fragment = Fragment::new(vec![
            Node::text("x"),
            Text::new("y").with_attribute("bold", true).into(),
        ]);
        insert_fragment(&mut doc, fragment, true, |_, _| {}).unwrap();
        insta::assert_snapshot!(
            stringify(&doc),
            @r#"<paragraph><$text italic="true">ax</$text><$text bold="true" italic="true">y</$text><$text italic="true">b</$text></paragraph>"#
        );
    }

    #[test]
    fn test_hook_emptying_fragment_inserts_nothing() {
        let mut doc = Document::with_children(vec![Element::new("paragraph").with_text("foo").into()]);
        let result = insert_fragment(&mut doc, Fragment::new(vec![Node::text("a")]), false, |_, fragment| {
            *fragment = Fragment::default();
        });
        assert_eq!(result, Ok(None));
        assert_eq!(stringify(&doc), "<paragraph>foo</paragraph>");
    }

    #[test]
    fn test_rich_fragment_keeps_its_attributes() {
        let mut doc = Document::with_children(vec![
            Element::new("paragraph")
                .with_children([Text::new("ab").with_attribute("bold", true).into()])
                .into(),
        ]);
        doc.change(|doc| doc.set_selection(Range::collapsed(pos(&[0, 1]))))
            .unwrap();
        let fragment = Fragment::new(vec![
            Node::text("x"),
            Text::new("y").with_attribute("italic", true).into(),
        ]);
        insert_fragment(&mut doc, fragment, false, |_, _| {}).unwrap();
        assert_eq!(
            stringify(&doc),
            "<paragraph><$text bold=\"true\">a</$text>x<$text italic=\"true\">y</$text><$text bold=\"true\">b</$text></paragraph>"
        );
    }

    #[test]
    fn test_hook_rewrites_fragment_inside_change() {
        let mut doc = Document::with_children(vec![Element::new("paragraph").into()]);
        let mut in_change = false;
        insert_fragment(&mut doc, Fragment::new(vec![Node::text("a")]), true, |doc, fragment| {
            in_change = doc.is_in_change();
            *fragment = Fragment::new(vec![Node::text("b")]);
        })
        .unwrap();
        assert!(in_change);
        assert_eq!(stringify(&doc), "<paragraph>b</paragraph>");
    }
}
