// Integration tests for the clipboard pipeline
//
// Each test drives the public handlers end to end against the headless
// Document and MappedView:
// 1. Build a document and render it into a view
// 2. Feed native-looking clipboard and drag events to a Clipboard
// 3. Check the document tree, markers, live ranges and transfer afterwards

use std::time::Duration;

use web_time::Instant;
use weaver_editor_clipboard::model::{Element, Node, Operation, Text, stringify};
use weaver_editor_clipboard::transfer::{TEXT_HTML, TEXT_PLAIN};
use weaver_editor_clipboard::{
    BlinkQuirks, Clipboard, ClipboardConfig, ClipboardEvent, ClipboardHooks, ClipboardMethod,
    DataTransfer, Document, DragEvent, DropEffect, DropTarget, Fragment, InputOutcome, MappedView,
    POSITION_MARKER, Position, RANGE_MARKER, Range, ViewPosition,
};

const MS: Duration = Duration::from_millis(1);

fn pos(path: &[usize]) -> Position {
    Position::new(path.to_vec())
}

fn select(doc: &mut Document, range: Range) {
    doc.change(|doc| doc.set_selection(range)).unwrap();
}

fn blink() -> Clipboard<BlinkQuirks> {
    Clipboard::new(ClipboardConfig::default(), BlinkQuirks)
}

fn at(view: &MappedView, path: &[usize], offset: usize) -> DragEvent {
    let parent = view.node_for(path).unwrap();
    DragEvent::new(DataTransfer::new()).at_position(parent, ViewPosition { parent, offset })
}

fn with_transfer(mut event: DragEvent, transfer: &DataTransfer) -> DragEvent {
    event.data_transfer = transfer.clone();
    event
}

#[test]
fn test_finalize_twice_is_harmless() {
    let mut doc = Document::with_children(vec![Element::new("paragraph").with_text("foobar").into()]);
    select(&mut doc, Range::new(pos(&[0, 1]), pos(&[0, 3])));
    let mut view = MappedView::from_document(&doc);
    let paragraph = view.node_for(&[0]).unwrap();
    let mut clipboard = blink();

    let mut start = DragEvent::new(DataTransfer::new()).at(paragraph);
    clipboard.handle_drag_start(&mut doc, &mut view, &mut start);
    assert!(clipboard.drag().source().is_some());

    let mut end = DragEvent::new(start.data_transfer.clone());
    end.data_transfer.drop_effect = DropEffect::Move;
    clipboard.handle_drag_end(&mut doc, &mut view, &end);
    let batches = doc.batches().len();
    clipboard.handle_drag_end(&mut doc, &mut view, &end);
    clipboard.destroy(&mut doc, &mut view);

    assert_eq!(stringify(&doc), "<paragraph>fbar</paragraph>");
    assert_eq!(doc.batches().len(), batches);
    assert_eq!(doc.live_range_count(), 0);
    assert!(clipboard.drag().session().is_idle());
}

#[test]
fn test_empty_content_opens_no_change() {
    let mut doc = Document::with_children(vec![Element::new("paragraph").with_text("foo").into()]);
    let mut clipboard = blink();
    let transfer = DataTransfer::new().with_data(TEXT_HTML, "<!--StartFragment--><!--EndFragment-->");
    let outcome = clipboard.handle_paste(&mut doc, &mut ClipboardEvent::new(transfer));
    assert_eq!(outcome, InputOutcome::Empty);
    let transfer = DataTransfer::new().with_data(TEXT_HTML, "<script>alert(1)</script>");
    let outcome = clipboard.handle_paste(&mut doc, &mut ClipboardEvent::new(transfer));
    assert_eq!(outcome, InputOutcome::Empty);
    assert_eq!(doc.change_count(), 0);
}

#[test]
fn test_plain_text_paste_takes_attribute_union() {
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
    select(&mut doc, Range::new(pos(&[0, 1]), pos(&[0, 3])));
    let mut clipboard = blink();
    let mut paste = ClipboardEvent::new(DataTransfer::new().with_data(TEXT_PLAIN, "Z"));
    clipboard.handle_paste(&mut doc, &mut paste);
    insta::assert_snapshot!(
        stringify(&doc),
        @r#"<paragraph><$text bold="true" linkHref="X">aZ</$text>d</paragraph>"#
    );
}

#[test]
fn test_move_onto_own_source_is_ignored() {
    let mut doc = Document::with_children(vec![Element::new("paragraph").with_text("foobar").into()]);
    select(&mut doc, Range::new(pos(&[0, 1]), pos(&[0, 5])));
    let mut view = MappedView::from_document(&doc);
    let paragraph = view.node_for(&[0]).unwrap();
    let mut clipboard = blink();
    let before = stringify(&doc);

    let mut start = DragEvent::new(DataTransfer::new()).at(paragraph);
    clipboard.handle_drag_start(&mut doc, &mut view, &mut start);
    let transfer = start.data_transfer;

    clipboard.handle_drag_enter(&with_transfer(at(&view, &[0], 3), &transfer));
    let mut over = with_transfer(at(&view, &[0], 3), &transfer);
    clipboard.handle_drag_over(&mut doc, &view, &mut over, Instant::now());
    assert!(doc.has_marker(POSITION_MARKER));

    let mut drop = with_transfer(at(&view, &[0], 3), &transfer);
    let outcome = clipboard.handle_drop(&mut doc, &mut view, &mut drop);

    assert_eq!(outcome, InputOutcome::SelfOverlap);
    assert_eq!(drop.data_transfer.drop_effect, DropEffect::None);
    assert_eq!(stringify(&doc), before);
    assert!(!doc.has_marker(POSITION_MARKER));
    assert_eq!(doc.live_range_count(), 0);
}

#[test]
fn test_move_to_another_block() {
    let mut doc = Document::with_children(vec![
        Element::new("paragraph").with_text("foo").into(),
        Element::new("paragraph").with_text("bar").into(),
    ]);
    select(&mut doc, Range::new(pos(&[0, 0]), pos(&[0, 2])));
    let mut view = MappedView::from_document(&doc);
    let mut clipboard = blink();

    let mut start = DragEvent::new(DataTransfer::new()).at(view.node_for(&[0]).unwrap());
    clipboard.handle_drag_start(&mut doc, &mut view, &mut start);
    let batches = doc.batches().len();

    let mut drop = with_transfer(at(&view, &[1], 3), &start.data_transfer);
    let outcome = clipboard.handle_drop(&mut doc, &mut view, &mut drop);
    assert!(matches!(outcome, InputOutcome::Inserted(_)));
    assert_eq!(stringify(&doc), "<paragraph>o</paragraph><paragraph>barfo</paragraph>");
    // Insertion and source deletion land in one change.
    assert_eq!(doc.batches().len(), batches + 1);
    assert_eq!(doc.live_range_count(), 0);
}

struct DropNothing;

impl ClipboardHooks for DropNothing {
    fn content_insertion(&mut self, fragment: &mut Fragment, _method: ClipboardMethod) {
        *fragment = Fragment::default();
    }
}

#[test]
fn test_emptied_move_keeps_source() {
    let mut doc = Document::with_children(vec![
        Element::new("paragraph").with_text("foo").into(),
        Element::new("paragraph").with_text("bar").into(),
    ]);
    select(&mut doc, Range::new(pos(&[0, 0]), pos(&[0, 2])));
    let mut view = MappedView::from_document(&doc);
    let mut clipboard = blink().with_hooks(DropNothing);

    let mut start = DragEvent::new(DataTransfer::new()).at(view.node_for(&[0]).unwrap());
    clipboard.handle_drag_start(&mut doc, &mut view, &mut start);
    let mut drop = with_transfer(at(&view, &[1], 3), &start.data_transfer);
    let outcome = clipboard.handle_drop(&mut doc, &mut view, &mut drop);
    assert_eq!(outcome, InputOutcome::Empty);
    assert_eq!(drop.data_transfer.drop_effect, DropEffect::None);

    let mut end = DragEvent::new(drop.data_transfer.clone());
    end.data_transfer.drop_effect = DropEffect::Move;
    clipboard.handle_drag_end(&mut doc, &mut view, &end);
    assert_eq!(stringify(&doc), "<paragraph>foo</paragraph><paragraph>bar</paragraph>");
    assert_eq!(doc.live_range_count(), 0);
}

#[test]
fn test_copy_then_paste_round_trips() {
    let mut doc = Document::with_children(vec![
        Element::new("paragraph")
            .with_children([
                Node::text("Hello "),
                Text::new("World").with_attribute("bold", true).into(),
            ])
            .into(),
        Element::new("paragraph").into(),
    ]);
    select(&mut doc, Range::new(pos(&[0, 0]), pos(&[0, 11])));
    let mut clipboard = blink();

    let mut copy = ClipboardEvent::empty();
    clipboard.handle_copy(&doc, &mut copy);
    assert_eq!(copy.data_transfer.get_data(TEXT_PLAIN), Some("Hello World"));

    select(&mut doc, Range::collapsed(pos(&[1, 0])));
    let mut paste = ClipboardEvent::new(copy.data_transfer);
    clipboard.handle_paste(&mut doc, &mut paste);

    let source = doc.element(&[0]).unwrap().clone();
    let pasted = doc.element(&[1]).unwrap();
    assert_eq!(pasted.children, source.children);
}

#[test]
fn test_whole_paragraph_copy_round_trips() {
    let mut source = Document::with_children(vec![
        Element::new("paragraph")
            .with_children([
                Node::text("Hello "),
                Text::new("World").with_attribute("bold", true).into(),
            ])
            .into(),
    ]);
    select(&mut source, Range::new(pos(&[0]), pos(&[1])));
    let mut clipboard = blink();
    let mut copy = ClipboardEvent::empty();
    clipboard.handle_copy(&source, &mut copy);

    let mut target = Document::with_children(vec![Element::new("paragraph").into()]);
    let mut paste = ClipboardEvent::new(copy.data_transfer);
    clipboard.handle_paste(&mut target, &mut paste);

    let expected = source.element(&[0]).unwrap();
    assert_eq!(target.element(&[0]).unwrap().children, expected.children);
}

#[test]
fn test_single_paragraph_paste_keeps_formatting() {
    for html in ["<p>Hello <b>World</b></p>", "<p class=MsoNormal>Hello <b>World</b></p>"] {
        let mut doc = Document::with_children(vec![Element::new("paragraph").into()]);
        let mut clipboard = blink();
        let mut paste = ClipboardEvent::new(DataTransfer::new().with_data(TEXT_HTML, html));
        clipboard.handle_paste(&mut doc, &mut paste);
        assert_eq!(
            stringify(&doc),
            r#"<paragraph>Hello <$text bold="true">World</$text></paragraph>"#,
            "{html}"
        );
    }
}

#[test]
fn test_drop_on_widget_inserts_after_it() {
    let mut doc = Document::with_children(vec![
        Element::new("paragraph").with_text("foo").into(),
        Element::new("image").with_attribute("src", "a.png").into(),
        Element::new("paragraph").with_text("bar").into(),
    ]);
    let mut view = MappedView::from_document(&doc);
    let image = view.node_for(&[1]).unwrap();
    let mut clipboard = blink();
    let transfer = DataTransfer::new().with_data(TEXT_HTML, "<p>X</p>");

    let mut over = DragEvent::new(transfer.clone()).at(image);
    let target = clipboard.handle_drag_over(&mut doc, &view, &mut over, Instant::now());
    assert_eq!(target, Some(DropTarget::Element(Range::on(&[1]))));
    assert_eq!(doc.marker(RANGE_MARKER), Some(&Range::on(&[1])));

    let mut drop = DragEvent::new(transfer).at(image);
    let outcome = clipboard.handle_drop(&mut doc, &mut view, &mut drop);
    assert!(matches!(outcome, InputOutcome::Inserted(_)));
    insta::assert_snapshot!(
        stringify(&doc),
        @r#"<paragraph>foo</paragraph><image src="a.png"></image><paragraph>X</paragraph><paragraph>bar</paragraph>"#
    );
    assert!(!doc.has_marker(RANGE_MARKER));
}

#[test]
fn test_markers_never_coexist() {
    let mut doc = Document::with_children(vec![
        Element::new("paragraph").with_text("foo").into(),
        Element::new("image").with_attribute("src", "a.png").into(),
    ]);
    let view = MappedView::from_document(&doc);
    let image = view.node_for(&[1]).unwrap();
    let mut clipboard = blink();
    let t0 = Instant::now();

    let hops = [
        at(&view, &[0], 1),
        DragEvent::new(DataTransfer::new()).at(image),
        at(&view, &[0], 2),
    ];
    for (i, mut over) in hops.into_iter().enumerate() {
        clipboard.handle_drag_over(&mut doc, &view, &mut over, t0 + 100 * i as u32 * MS);
        assert!(!(doc.has_marker(POSITION_MARKER) && doc.has_marker(RANGE_MARKER)));
    }
    assert_eq!(doc.marker(POSITION_MARKER), Some(&Range::collapsed(pos(&[0, 2]))));
    assert!(!doc.has_marker(RANGE_MARKER));
}

#[test]
fn test_drop_applies_last_marker_update() {
    let mut doc = Document::with_children(vec![Element::new("paragraph").with_text("foobar").into()]);
    let mut view = MappedView::from_document(&doc);
    let mut clipboard = blink();
    let transfer = DataTransfer::new().with_data(TEXT_PLAIN, "x");
    let t0 = Instant::now();

    for (i, offset) in [1, 2, 3].into_iter().enumerate() {
        let mut over = with_transfer(at(&view, &[0], offset), &transfer);
        clipboard.handle_drag_over(&mut doc, &view, &mut over, t0 + i as u32 * MS);
    }
    assert_eq!(doc.marker(POSITION_MARKER), Some(&Range::collapsed(pos(&[0, 1]))));
    assert!(clipboard.drag().has_pending_marker_update());

    let mut drop = with_transfer(at(&view, &[0], 3), &transfer);
    clipboard.handle_drop(&mut doc, &mut view, &mut drop);
    clipboard.tick(&mut doc, t0 + 500 * MS);

    let applied: Vec<_> = doc
        .batches()
        .iter()
        .flat_map(|batch| batch.marker_operations(POSITION_MARKER))
        .filter_map(|op| match op {
            Operation::Marker { new_range, .. } => new_range.clone(),
            _ => None,
        })
        .collect();
    assert_eq!(
        applied,
        vec![
            Range::collapsed(pos(&[0, 1])),
            Range::collapsed(pos(&[0, 3])),
        ]
    );
    assert_eq!(doc.marker_names().count(), 0);
    assert_eq!(stringify(&doc), "<paragraph>fooxbar</paragraph>");
}
