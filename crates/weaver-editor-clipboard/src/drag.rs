//! Drag session tracking.
//!
//! A [`DragTracker`] owns everything a drag leaves behind in the model and
//! the view between drag-start and drop: the live source range, the drop
//! target markers and the draggable flag. The session is a [`DragSession`]
//! value that is replaced on every transition.

use std::time::Duration;

use smol_str::SmolStr;
use web_time::Instant;

use crate::drop_target::{DropTarget, POSITION_MARKER, RANGE_MARKER};
use crate::error::ModelError;
use crate::model::{DeleteOptions, EditingModel, LiveRangeId, Range};
use crate::throttle::Throttled;
use crate::view::{EditingView, ViewNodeId};

/// Content being dragged out of this editor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DragSource {
    /// Live range following edits made while the drag is in flight.
    pub range: LiveRangeId,
    /// Id written to the transfer so the drop can recognize the session.
    pub uid: SmolStr,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum DragSession {
    #[default]
    Idle,
    /// Drag-start captured a source; the pointer has not entered a target.
    Started { source: DragSource },
    /// The pointer is over the editor. Drags from elsewhere have no source.
    Dragging { source: Option<DragSource> },
    /// Teardown of the session is running.
    Finalizing,
}

impl DragSession {
    pub fn source(&self) -> Option<&DragSource> {
        match self {
            DragSession::Started { source } => Some(source),
            DragSession::Dragging { source } => source.as_ref(),
            DragSession::Idle | DragSession::Finalizing => None,
        }
    }

    fn into_source(self) -> Option<DragSource> {
        match self {
            DragSession::Started { source } => Some(source),
            DragSession::Dragging { source } => source,
            DragSession::Idle | DragSession::Finalizing => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, DragSession::Idle)
    }
}

#[derive(Debug)]
pub struct DragTracker {
    session: DragSession,
    draggable: Option<ViewNodeId>,
    marker_updates: Throttled<DropTarget>,
    next_uid: u64,
}

impl DragTracker {
    pub fn new(marker_throttle: Duration) -> Self {
        Self {
            session: DragSession::Idle,
            draggable: None,
            marker_updates: Throttled::new(marker_throttle),
            next_uid: 0,
        }
    }

    pub fn session(&self) -> &DragSession {
        &self.session
    }

    pub fn source(&self) -> Option<&DragSource> {
        self.session.source()
    }

    /// Current extent of the dragged content.
    pub fn source_range<M: EditingModel>(&self, model: &M) -> Option<Range> {
        let source = self.source()?;
        model.live_range(source.range).cloned()
    }

    pub fn draggable(&self) -> Option<ViewNodeId> {
        self.draggable
    }

    pub fn has_pending_marker_update(&self) -> bool {
        self.marker_updates.is_pending()
    }

    /// Next session id.
    pub fn next_uid(&mut self) -> SmolStr {
        self.next_uid += 1;
        smol_str::format_smolstr!("{:x}", self.next_uid)
    }

    /// Start a session dragging `range`. A session still holding a source
    /// range releases it first.
    pub fn begin<M: EditingModel>(&mut self, model: &mut M, range: Range, uid: SmolStr) {
        if let Some(stale) = std::mem::take(&mut self.session).into_source() {
            model.detach_live_range(stale.range);
        }
        let live = model.create_live_range(range);
        tracing::debug!(%uid, "drag session started");
        self.session = DragSession::Started {
            source: DragSource { range: live, uid },
        };
    }

    /// The pointer entered the editor. Without a local session this is a
    /// drag from outside.
    pub fn enter(&mut self) {
        self.session = match std::mem::take(&mut self.session) {
            DragSession::Started { source } => DragSession::Dragging {
                source: Some(source),
            },
            DragSession::Idle => DragSession::Dragging { source: None },
            other => other,
        };
    }

    /// Drop a source whose id does not match the one on the transfer. The
    /// session carries on as a drag from outside.
    pub fn release_stale<M: EditingModel>(&mut self, model: &mut M, uid: Option<&str>) {
        let Some(source) = self.source() else {
            return;
        };
        if uid == Some(source.uid.as_str()) {
            return;
        }
        tracing::debug!(session = %source.uid, ?uid, "releasing stale drag source");
        if let Some(stale) = std::mem::take(&mut self.session).into_source() {
            model.detach_live_range(stale.range);
        }
        self.session = DragSession::Dragging { source: None };
    }

    /// Mark `node` draggable, clearing the previous one.
    pub fn set_draggable<V: EditingView>(&mut self, view: &mut V, node: ViewNodeId) {
        if self.draggable == Some(node) {
            return;
        }
        self.clear_draggable(view);
        view.set_draggable(node, true);
        self.draggable = Some(node);
    }

    pub fn clear_draggable<V: EditingView>(&mut self, view: &mut V) {
        if let Some(node) = self.draggable.take() {
            view.set_draggable(node, false);
        }
    }

    /// Offer a new drop target for the markers. Applied at once or
    /// coalesced with later targets.
    pub fn update_marker<M: EditingModel>(
        &mut self,
        model: &mut M,
        target: DropTarget,
        now: Instant,
    ) -> Result<(), ModelError> {
        match self.marker_updates.call(target, now) {
            Some(target) => apply_marker(model, &target),
            None => Ok(()),
        }
    }

    /// Apply a coalesced target whose interval has passed.
    pub fn tick<M: EditingModel>(&mut self, model: &mut M, now: Instant) -> Result<(), ModelError> {
        match self.marker_updates.poll(now) {
            Some(target) => apply_marker(model, &target),
            None => Ok(()),
        }
    }

    /// Apply the latest coalesced target now.
    pub fn flush_marker_update<M: EditingModel>(&mut self, model: &mut M) -> Result<(), ModelError> {
        match self.marker_updates.flush() {
            Some(target) => apply_marker(model, &target),
            None => Ok(()),
        }
    }

    /// Cancel pending updates and remove both markers.
    pub fn clear_markers<M: EditingModel>(&mut self, model: &mut M) -> Result<(), ModelError> {
        self.marker_updates.cancel();
        if !model.has_marker(POSITION_MARKER) && !model.has_marker(RANGE_MARKER) {
            return Ok(());
        }
        model.change(|model| {
            for name in [POSITION_MARKER, RANGE_MARKER] {
                if model.has_marker(name) {
                    model.remove_marker(name)?;
                }
            }
            Ok(())
        })
    }

    /// End the session.
    ///
    /// Pending marker updates are cancelled and the markers removed, the
    /// draggable flag is cleared and the source range released. With
    /// `moved` the dragged content is deleted first. Calling this on an
    /// idle tracker only repeats the cleanup.
    pub fn finalize<M, V>(&mut self, model: &mut M, view: &mut V, moved: bool) -> Result<(), ModelError>
    where
        M: EditingModel,
        V: EditingView,
    {
        if matches!(self.session, DragSession::Finalizing) {
            return Ok(());
        }
        let previous = std::mem::replace(&mut self.session, DragSession::Finalizing);
        let source = previous.into_source();
        tracing::debug!(moved, local = source.is_some(), "finalizing drag session");

        let mut result = self.clear_markers(model);
        self.clear_draggable(view);

        if let Some(source) = source {
            if moved {
                if let Some(range) = model.live_range(source.range).cloned() {
                    let deleted = delete_source(model, &range);
                    result = result.and(deleted);
                }
            }
            model.detach_live_range(source.range);
        }
        self.session = DragSession::Idle;
        result
    }
}

fn delete_source<M: EditingModel>(model: &mut M, range: &Range) -> Result<(), ModelError> {
    if range.is_collapsed() {
        return Ok(());
    }
    tracing::debug!(?range, "deleting moved content");
    model.change(|model| {
        model
            .delete_content(
                range,
                DeleteOptions {
                    do_not_autoparagraph: true,
                },
            )
            .map(|_| ())
    })
}

/// Show `target` with its marker, removing the marker of the other kind.
fn apply_marker<M: EditingModel>(model: &mut M, target: &DropTarget) -> Result<(), ModelError> {
    let name = target.marker_name();
    let stale = if name == POSITION_MARKER {
        RANGE_MARKER
    } else {
        POSITION_MARKER
    };
    let range = target.range();
    if model.marker(name) == Some(&range) && !model.has_marker(stale) {
        return Ok(());
    }
    tracing::trace!(marker = name, ?range, "updating drop marker");
    model.change(|model| {
        if model.has_marker(stale) {
            model.remove_marker(stale)?;
        }
        model.set_marker(name, range)
    })
}
