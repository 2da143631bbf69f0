//! Gesture handlers tying the clipboard pipeline together.
//!
//! [`Clipboard`] receives native clipboard and drag events and drives the
//! normalizer, the drop target resolver, the drag tracker and the
//! insertion pipeline against an [`EditingModel`] and an [`EditingView`].
//! Handlers never fail: every problem ends the gesture with an outcome
//! value and leaves the document untouched.

use std::ops::ControlFlow;

use web_time::Instant;

use crate::config::ClipboardConfig;
use crate::content::ContentFragment;
use crate::drag::DragTracker;
use crate::drop_target::{self, DropTarget};
use crate::error::{ClipboardError, ModelError};
use crate::insertion::{insert_fragment, to_model_fragment};
use crate::model::{DeleteOptions, EditingModel, Fragment, Range, Schema};
use crate::normalize::normalize;
use crate::output::{self, ClipboardData};
use crate::quirks::{Engine, InputQuirksPolicy, OverlapCheck};
use crate::transfer::{
    ClipboardEvent, ClipboardMethod, ClipboardPayload, DataTransfer, DragEvent, DropEffect,
    EffectAllowed,
};
use crate::view::{EditingView, ViewNodeId};

/// Normalized input handed to [`ClipboardHooks::input_transformation`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputTransformation {
    pub content: ContentFragment,
    /// Insert as plain text, taking the attributes at the selection.
    pub plain_text: bool,
    pub method: ClipboardMethod,
}

/// Serialized output handed to [`ClipboardHooks::clipboard_output`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClipboardOutput {
    pub content: ContentFragment,
    pub method: ClipboardMethod,
}

/// Extension points of the pipeline. Every method defaults to a no-op.
pub trait ClipboardHooks {
    /// Runs after the payload is normalized. Returning `Break` vetoes the
    /// input; nothing is inserted.
    fn input_transformation(
        &mut self,
        input: &mut InputTransformation,
        transfer: &DataTransfer,
    ) -> ControlFlow<()> {
        let _ = (input, transfer);
        ControlFlow::Continue(())
    }

    /// Runs inside the change block right before the model insertion.
    fn content_insertion(&mut self, fragment: &mut Fragment, method: ClipboardMethod) {
        let _ = (fragment, method);
    }

    /// Runs after serialization, before the data reaches the transfer.
    fn clipboard_output(&mut self, output: &mut ClipboardOutput, transfer: &mut DataTransfer) {
        let _ = (output, transfer);
    }
}

impl ClipboardHooks for () {}

/// How an input gesture ended.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum InputOutcome {
    /// Content was inserted; the range covers it.
    Inserted(Range),
    ReadOnly,
    /// A hook vetoed the input.
    Vetoed,
    /// Nothing convertible was left.
    Empty,
    /// Nothing under the pointer accepts a drop.
    NoTarget,
    /// A move onto its own source.
    SelfOverlap,
    /// The model rejected the change. The document was rolled back.
    Failed(ModelError),
}

/// How an output gesture ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputOutcome {
    Written(ClipboardData),
    /// Nothing to write.
    Empty,
}

/// Stages every input gesture runs, in order, before its insertion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputStage {
    ReadOnlyGuard,
    Normalize,
    InputTransformation,
    Convert,
}

impl InputStage {
    pub const ALL: [InputStage; 4] = [
        InputStage::ReadOnlyGuard,
        InputStage::Normalize,
        InputStage::InputTransformation,
        InputStage::Convert,
    ];
}

/// Input moving through the stages.
struct PendingInput {
    payload: ClipboardPayload,
    transformation: InputTransformation,
    fragment: Fragment,
}

/// Converted input ready for insertion.
struct PreparedInput {
    fragment: Fragment,
    plain_text: bool,
}

/// Clipboard and drag-and-drop handling for one editor.
pub struct Clipboard<Q = Box<dyn InputQuirksPolicy>, H = ()> {
    config: ClipboardConfig,
    quirks: Q,
    hooks: H,
    drag: DragTracker,
    read_only: bool,
}

impl Clipboard {
    /// Pick the quirks policy from a user agent string.
    pub fn for_user_agent(config: ClipboardConfig, user_agent: &str) -> Self {
        let engine = Engine::from_user_agent(user_agent);
        tracing::debug!(?engine, "clipboard quirks selected");
        Self::new(config, engine.quirks())
    }
}

impl<Q: InputQuirksPolicy> Clipboard<Q, ()> {
    pub fn new(config: ClipboardConfig, quirks: Q) -> Self {
        let drag = DragTracker::new(config.marker_throttle());
        Self {
            config,
            quirks,
            hooks: (),
            drag,
            read_only: false,
        }
    }
}

impl<Q: InputQuirksPolicy, H: ClipboardHooks> Clipboard<Q, H> {
    pub fn with_hooks<H2: ClipboardHooks>(self, hooks: H2) -> Clipboard<Q, H2> {
        Clipboard {
            config: self.config,
            quirks: self.quirks,
            hooks,
            drag: self.drag,
            read_only: self.read_only,
        }
    }

    pub fn config(&self) -> &ClipboardConfig {
        &self.config
    }

    pub fn quirks(&self) -> &Q {
        &self.quirks
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    pub fn drag(&self) -> &DragTracker {
        &self.drag
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    // === Input ===

    fn run_stage(
        &mut self,
        stage: InputStage,
        schema: &Schema,
        input: &mut PendingInput,
        transfer: &DataTransfer,
    ) -> ControlFlow<InputOutcome> {
        match stage {
            InputStage::ReadOnlyGuard => {
                if self.read_only {
                    tracing::debug!(method = input.transformation.method.as_str(), "input suppressed, read-only");
                    return ControlFlow::Break(InputOutcome::ReadOnly);
                }
            }
            InputStage::Normalize => {
                input.transformation.content = normalize(&input.payload);
            }
            InputStage::InputTransformation => {
                if self
                    .hooks
                    .input_transformation(&mut input.transformation, transfer)
                    .is_break()
                {
                    tracing::debug!(method = input.transformation.method.as_str(), "input vetoed");
                    return ControlFlow::Break(InputOutcome::Vetoed);
                }
            }
            InputStage::Convert => {
                input.fragment =
                    to_model_fragment(&input.transformation.content, schema, &self.config.paragraph_element);
                if input.fragment.is_empty() {
                    tracing::debug!(method = input.transformation.method.as_str(), "input converted to nothing");
                    return ControlFlow::Break(InputOutcome::Empty);
                }
            }
        }
        ControlFlow::Continue(())
    }

    fn prepare(
        &mut self,
        schema: &Schema,
        transfer: &DataTransfer,
        method: ClipboardMethod,
        plain_text: bool,
    ) -> ControlFlow<InputOutcome, PreparedInput> {
        let mut input = PendingInput {
            payload: ClipboardPayload::from_transfer(transfer, plain_text),
            transformation: InputTransformation {
                content: ContentFragment::default(),
                plain_text,
                method,
            },
            fragment: Fragment::default(),
        };
        for stage in InputStage::ALL {
            self.run_stage(stage, schema, &mut input, transfer)?;
        }
        ControlFlow::Continue(PreparedInput {
            fragment: input.fragment,
            plain_text: input.transformation.plain_text,
        })
    }

    /// Paste the event's payload at the selection.
    pub fn handle_paste<M: EditingModel>(&mut self, model: &mut M, event: &mut ClipboardEvent) -> InputOutcome {
        event.prevent_default();
        let prepared = match self.prepare(
            model.schema(),
            &event.data_transfer,
            ClipboardMethod::Paste,
            event.as_plain_text,
        ) {
            ControlFlow::Continue(prepared) => prepared,
            ControlFlow::Break(outcome) => return outcome,
        };

        let hooks = &mut self.hooks;
        let result = insert_fragment(model, prepared.fragment, prepared.plain_text, |_, fragment| {
            hooks.content_insertion(fragment, ClipboardMethod::Paste)
        });
        match result {
            Ok(Some(range)) => {
                tracing::debug!(plain_text = prepared.plain_text, "paste inserted");
                InputOutcome::Inserted(range)
            }
            Ok(None) => InputOutcome::Empty,
            Err(err) => {
                tracing::warn!(error = %err, "paste failed");
                InputOutcome::Failed(err)
            }
        }
    }

    /// Insert already normalized content at the selection the way a paste
    /// would, skipping the transfer and the input hooks.
    pub fn insert_content<M: EditingModel>(
        &mut self,
        model: &mut M,
        content: &ContentFragment,
        plain_text: bool,
    ) -> Result<Option<Range>, ClipboardError> {
        if self.read_only {
            return Err(ClipboardError::ReadOnly);
        }
        let fragment = to_model_fragment(content, model.schema(), &self.config.paragraph_element);
        let hooks = &mut self.hooks;
        let inserted = insert_fragment(model, fragment, plain_text, |_, fragment| {
            hooks.content_insertion(fragment, ClipboardMethod::Paste)
        })?;
        Ok(inserted)
    }

    // === Output ===

    fn write_output<M: EditingModel>(
        &mut self,
        model: &M,
        event: &mut ClipboardEvent,
        method: ClipboardMethod,
    ) -> OutputOutcome {
        event.prevent_default();
        let range = model.selection().clone();
        let mut output = ClipboardOutput {
            content: output::selected_content(model, &range),
            method,
        };
        self.hooks.clipboard_output(&mut output, &mut event.data_transfer);
        if output.content.is_empty() {
            return OutputOutcome::Empty;
        }
        let data = ClipboardData::from_content(&output.content);
        data.write_to(&mut event.data_transfer);
        tracing::debug!(method = method.as_str(), bytes = data.markup.len(), "clipboard written");
        OutputOutcome::Written(data)
    }

    pub fn handle_copy<M: EditingModel>(&mut self, model: &M, event: &mut ClipboardEvent) -> OutputOutcome {
        self.write_output(model, event, ClipboardMethod::Copy)
    }

    /// Copy the selection, then delete it once something was written.
    /// Read-only editors only copy.
    pub fn handle_cut<M: EditingModel>(&mut self, model: &mut M, event: &mut ClipboardEvent) -> OutputOutcome {
        if self.read_only {
            return self.write_output(model, event, ClipboardMethod::Copy);
        }
        let outcome = self.write_output(model, event, ClipboardMethod::Cut);
        let selection = model.selection().clone();
        if selection.is_collapsed() || !matches!(outcome, OutputOutcome::Written(_)) {
            return outcome;
        }
        let deleted = model.change(|model| {
            model
                .delete_content(&selection, DeleteOptions::default())
                .map(|_| ())
        });
        match deleted {
            Ok(()) => tracing::debug!("cut deleted selection"),
            Err(err) => tracing::warn!(error = %err, "cut deletion failed"),
        }
        outcome
    }

    // === Dragging ===

    /// Mark the widget under the pointer draggable.
    pub fn handle_pointer_down<M, V>(&mut self, model: &M, view: &mut V, target: ViewNodeId)
    where
        M: EditingModel,
        V: EditingView,
    {
        let widget = view
            .nearest_mapped_ancestor(target)
            .filter(|(_, path)| model.is_object_at(path))
            .map(|(node, _)| node);
        if let Some(node) = widget {
            self.drag.set_draggable(view, node);
            return;
        }
        if !self.quirks.drags_selection_via_editable() || self.read_only {
            return;
        }
        let selection = model.selection();
        let selects_object = selection
            .element_path()
            .is_some_and(|path| model.is_object_at(&path));
        if selection.is_collapsed() || selects_object {
            return;
        }
        if let Some(root) = editable_root(view, target) {
            self.drag.set_draggable(view, root);
        }
    }

    pub fn handle_pointer_up<V: EditingView>(&mut self, view: &mut V) {
        self.drag.clear_draggable(view);
    }

    /// Start dragging the widget under the pointer or the selection.
    pub fn handle_drag_start<M, V>(&mut self, model: &mut M, view: &mut V, event: &mut DragEvent) -> OutputOutcome
    where
        M: EditingModel,
        V: EditingView,
    {
        let Some(target) = event.target else {
            event.prevent_default();
            return OutputOutcome::Empty;
        };
        if view.is_root(target) {
            tracing::debug!("drag of the editable itself rejected");
            event.prevent_default();
            return OutputOutcome::Empty;
        }
        let Some(range) = drag_range(model, view, target) else {
            event.prevent_default();
            return OutputOutcome::Empty;
        };

        let uid = self.drag.next_uid();
        let transfer = &mut event.data_transfer;
        transfer.effect_allowed = if self.read_only {
            EffectAllowed::Copy
        } else {
            EffectAllowed::CopyMove
        };
        transfer.set_data(&self.config.dragging_uid_type, uid.as_str());

        let mut output = ClipboardOutput {
            content: output::selected_content(model, &range),
            method: ClipboardMethod::DragStart,
        };
        self.hooks.clipboard_output(&mut output, transfer);
        let data = ClipboardData::from_content(&output.content);
        data.write_to(transfer);

        if !self.read_only {
            self.drag.begin(model, range, uid);
        }
        OutputOutcome::Written(data)
    }

    pub fn handle_drag_enter(&mut self, event: &DragEvent) {
        if self.read_only {
            return;
        }
        tracing::trace!(target = ?event.target, "drag entered");
        self.drag.enter();
    }

    /// Preview the drop target under the pointer. Returns the resolved
    /// target, if any. Without one the drop is refused and the marker
    /// cleared.
    pub fn handle_drag_over<M, V>(
        &mut self,
        model: &mut M,
        view: &V,
        event: &mut DragEvent,
        now: Instant,
    ) -> Option<DropTarget>
    where
        M: EditingModel,
        V: EditingView,
    {
        if self.read_only {
            event.data_transfer.drop_effect = DropEffect::None;
            return None;
        }
        self.drag.enter();

        let target = match event.target {
            Some(node) => drop_target::resolve(
                &*model,
                view,
                node,
                event.target_position.as_ref(),
                self.quirks.target_search_direction(),
            ),
            None => None,
        };
        let Some(target) = target else {
            tracing::trace!("no drop target under the pointer");
            event.data_transfer.drop_effect = DropEffect::None;
            if let Err(err) = self.drag.clear_markers(model) {
                tracing::warn!(error = %err, "removing drop markers failed");
            }
            return None;
        };

        let transfer = &mut event.data_transfer;
        if self.drag.source().is_none() {
            transfer.drop_effect = DropEffect::Copy;
        }
        if self.quirks.sets_drop_effect_on_dragover() {
            match transfer.effect_allowed {
                EffectAllowed::Copy => transfer.drop_effect = DropEffect::Copy,
                EffectAllowed::All | EffectAllowed::CopyMove => transfer.drop_effect = DropEffect::Move,
                _ => {}
            }
        }
        event.prevent_default();

        if let Err(err) = self.drag.update_marker(model, target.clone(), now) {
            tracing::warn!(error = %err, "drop marker update failed");
        }
        Some(target)
    }

    /// Apply a coalesced marker update that came due.
    pub fn tick<M: EditingModel>(&mut self, model: &mut M, now: Instant) {
        if let Err(err) = self.drag.tick(model, now) {
            tracing::warn!(error = %err, "drop marker update failed");
        }
    }

    pub fn handle_drag_leave<M, V>(&mut self, model: &mut M, view: &V, event: &DragEvent)
    where
        M: EditingModel,
        V: EditingView,
    {
        if event.related_target.is_some_and(|node| view.is_in_editable(node)) {
            return;
        }
        tracing::trace!("drag left the editable");
        if let Err(err) = self.drag.clear_markers(model) {
            tracing::warn!(error = %err, "removing drop markers failed");
        }
    }

    /// Insert the dropped payload at the target under the pointer. A move
    /// from this editor deletes the source in the same change.
    pub fn handle_drop<M, V>(&mut self, model: &mut M, view: &mut V, event: &mut DragEvent) -> InputOutcome
    where
        M: EditingModel,
        V: EditingView,
    {
        event.prevent_default();
        if self.read_only {
            event.data_transfer.drop_effect = DropEffect::None;
            self.finalize_drag(model, view, false);
            return InputOutcome::ReadOnly;
        }
        if let Err(err) = self.drag.flush_marker_update(model) {
            tracing::warn!(error = %err, "drop marker update failed");
        }

        let target = match event.target {
            Some(node) => drop_target::resolve(
                &*model,
                &*view,
                node,
                event.target_position.as_ref(),
                self.quirks.target_search_direction(),
            ),
            None => None,
        };
        let Some(target) = target else {
            tracing::debug!("drop without a target");
            event.data_transfer.drop_effect = DropEffect::None;
            self.finalize_drag(model, view, false);
            return InputOutcome::NoTarget;
        };

        let uid = event.data_transfer.get_data(&self.config.dragging_uid_type);
        self.drag.release_stale(model, uid);
        let is_move = self.drag.source().is_some()
            && self.quirks.final_drop_effect(&event.data_transfer) == DropEffect::Move;
        let overlap_check = self.quirks.overlap_check();

        if is_move
            && overlap_check == OverlapCheck::BeforeSelection
            && overlaps_source(&self.drag, model, &target.range())
        {
            return self.reject_overlap(model, view, event);
        }

        let prepared = match self.prepare(model.schema(), &event.data_transfer, ClipboardMethod::Drop, false) {
            ControlFlow::Continue(prepared) => prepared,
            ControlFlow::Break(outcome) => {
                self.finalize_drag(model, view, false);
                return outcome;
            }
        };

        let Self { hooks, drag, .. } = &mut *self;
        let result = model.change(|model| {
            let previous = model.selection().clone();
            model.set_selection(target.range())?;
            if is_move
                && overlap_check == OverlapCheck::AfterSelection
                && overlaps_source(drag, model, model.selection())
            {
                model.set_selection(previous)?;
                return Ok(None);
            }
            if let DropTarget::Element(_) = &target {
                model.set_selection(Range::collapsed(target.insertion_position()))?;
            }
            let inserted = insert_fragment(model, prepared.fragment, prepared.plain_text, |_, fragment| {
                hooks.content_insertion(fragment, ClipboardMethod::Drop)
            })?;
            if inserted.is_some() {
                drag.finalize(model, view, is_move)?;
            }
            Ok(Some(inserted))
        });

        match result {
            Ok(Some(Some(range))) => {
                tracing::debug!(is_move, "drop inserted");
                InputOutcome::Inserted(range)
            }
            Ok(Some(None)) => {
                tracing::debug!("dropped content was empty");
                event.data_transfer.drop_effect = DropEffect::None;
                self.finalize_drag(model, view, false);
                InputOutcome::Empty
            }
            Ok(None) => self.reject_overlap(model, view, event),
            Err(err) => {
                tracing::warn!(error = %err, "drop failed");
                self.finalize_drag(model, view, false);
                InputOutcome::Failed(err)
            }
        }
    }

    fn reject_overlap<M, V>(&mut self, model: &mut M, view: &mut V, event: &mut DragEvent) -> InputOutcome
    where
        M: EditingModel,
        V: EditingView,
    {
        tracing::debug!("drop onto its own source ignored");
        event.data_transfer.drop_effect = DropEffect::None;
        self.finalize_drag(model, view, false);
        InputOutcome::SelfOverlap
    }

    /// The drag ended at the source. A completed move to another target
    /// deletes the dragged content.
    pub fn handle_drag_end<M, V>(&mut self, model: &mut M, view: &mut V, event: &DragEvent)
    where
        M: EditingModel,
        V: EditingView,
    {
        let transfer = &event.data_transfer;
        let moved = !transfer.is_canceled() && transfer.drop_effect == DropEffect::Move;
        self.finalize_drag(model, view, moved);
    }

    fn finalize_drag<M, V>(&mut self, model: &mut M, view: &mut V, moved: bool)
    where
        M: EditingModel,
        V: EditingView,
    {
        let moved = moved && !self.read_only;
        if let Err(err) = self.drag.finalize(model, view, moved) {
            tracing::warn!(error = %err, "finalizing drag session failed");
        }
    }

    /// Release everything a drag in flight holds.
    pub fn destroy<M, V>(&mut self, model: &mut M, view: &mut V)
    where
        M: EditingModel,
        V: EditingView,
    {
        self.finalize_drag(model, view, false);
    }
}

fn overlaps_source<M: EditingModel>(drag: &DragTracker, model: &M, target: &Range) -> bool {
    drag.source_range(model)
        .is_some_and(|source| source.contains_range(target, true))
}

fn editable_root<V: EditingView>(view: &V, node: ViewNodeId) -> Option<ViewNodeId> {
    let mut current = node;
    while !view.is_root(current) {
        current = view.parent(current)?;
    }
    Some(current)
}

/// What a drag starting at `target` carries: the whole widget under the
/// pointer, or a selection that is not just one widget.
fn drag_range<M, V>(model: &M, view: &V, target: ViewNodeId) -> Option<Range>
where
    M: EditingModel,
    V: EditingView,
{
    if let Some((_, path)) = view.nearest_mapped_ancestor(target) {
        if model.is_object_at(&path) {
            return Some(Range::on(&path));
        }
    }
    let selection = model.selection();
    if selection.is_collapsed() {
        return None;
    }
    let selects_object = selection
        .element_path()
        .is_some_and(|path| model.is_object_at(&path));
    (!selects_object).then(|| selection.clone())
}
