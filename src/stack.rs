use core::fmt;
use std::cell::Cell;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::geometry::{Extent, GeometryType, Polyline};
use crate::geometry_overlay::GeometryOverlay;
use crate::grid::GridOverlay;
use crate::map_view::{MapView, ViewChange};
use crate::projection::{ProjectionContext, ProjectionError, ViewStateProvider};
use crate::rubberband::RubberbandOverlay;
use crate::signal::ConnectionId;
use crate::vertices::{LineVertex, push_line_list};

/// Unique identifier for an overlay in an [`OverlayStack`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverlayId(u64);

impl OverlayId {
    fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static NEXT_ID: AtomicU64 = AtomicU64::new(0);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for OverlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Overlay({})", self.0)
    }
}

/// Any overlay the stack can hold.
#[derive(Debug, Clone)]
pub enum Overlay {
    Grid(GridOverlay),
    Geometry(GeometryOverlay),
    Rubberband(RubberbandOverlay),
}

impl Overlay {
    fn recompute(
        &mut self,
        context: &ProjectionContext,
        extent: &Extent,
        context_moved: bool,
    ) -> bool {
        match self {
            Self::Grid(grid) if context_moved || grid.is_dirty() => grid.recompute(context, extent),
            Self::Grid(_) => false,
            Self::Geometry(overlay) => overlay.recompute(context),
            Self::Rubberband(overlay) => overlay.recompute(context),
        }
    }

    /// Whether the overlay's own inputs changed since its last recompute.
    pub fn is_dirty(&self) -> bool {
        match self {
            Self::Grid(grid) => grid.is_dirty(),
            Self::Geometry(overlay) => overlay.is_dirty(),
            Self::Rubberband(overlay) => overlay.is_dirty(),
        }
    }

    fn clear(&mut self) -> bool {
        match self {
            Self::Grid(grid) => grid.clear(),
            Self::Geometry(overlay) => overlay.clear(),
            Self::Rubberband(overlay) => overlay.clear(),
        }
    }

    /// Bumped whenever the overlay's output changes.
    pub fn version(&self) -> u64 {
        match self {
            Self::Grid(grid) => grid.version(),
            Self::Geometry(overlay) => overlay.version(),
            Self::Rubberband(overlay) => overlay.version(),
        }
    }

    /// The overlay's main polylines.
    pub fn polylines(&self) -> &[Polyline] {
        match self {
            Self::Grid(grid) => grid.lines(),
            Self::Geometry(overlay) => overlay.polylines(),
            Self::Rubberband(overlay) => overlay.polylines(),
        }
    }

    pub fn polylines_type(&self) -> GeometryType {
        match self {
            Self::Grid(grid) if grid.lines().is_empty() => GeometryType::Null,
            Self::Grid(_) => GeometryType::Line,
            Self::Geometry(overlay) => overlay.polylines_type(),
            Self::Rubberband(overlay) => overlay.polylines_type(),
        }
    }

    /// Append this overlay's strokes as line-list vertices.
    pub fn push_line_vertices(&self, out: &mut Vec<LineVertex>) -> usize {
        let closed = self.polylines_type().closes_rings();
        match self {
            Self::Grid(grid) => push_line_list(out, grid.lines(), false, grid.style().line_color),
            Self::Geometry(overlay) => {
                push_line_list(out, overlay.polylines(), closed, overlay.style().color)
            }
            Self::Rubberband(overlay) => {
                let style = overlay.style();
                let guide = [overlay.current_segment().to_vec()];
                push_line_list(out, overlay.polylines(), closed, style.color)
                    + push_line_list(out, &guide, false, style.current_color)
            }
        }
    }
}

impl From<GridOverlay> for Overlay {
    fn from(grid: GridOverlay) -> Self {
        Self::Grid(grid)
    }
}

impl From<GeometryOverlay> for Overlay {
    fn from(overlay: GeometryOverlay) -> Self {
        Self::Geometry(overlay)
    }
}

impl From<RubberbandOverlay> for Overlay {
    fn from(overlay: RubberbandOverlay) -> Self {
        Self::Rubberband(overlay)
    }
}

/// An ordered set of overlays drawn over one map view.
///
/// [`sync`](Self::sync) snapshots the view once and hands the same
/// [`ProjectionContext`] to every overlay, so grid, geometries and rubber
/// bands stay aligned. Overlays are drawn in insertion order.
#[derive(Debug, Default)]
pub struct OverlayStack {
    overlays: IndexMap<OverlayId, Overlay>,
    context: Option<ProjectionContext>,
    last_error: Option<ProjectionError>,
    /// View changes reported since the last sync.
    pending: Rc<Cell<ViewChange>>,
}

impl OverlayStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an overlay on top of the others.
    pub fn add(&mut self, overlay: impl Into<Overlay>) -> OverlayId {
        let id = OverlayId::new();
        self.overlays.insert(id, overlay.into());
        self.pending.set(self.pending.get() | ViewChange::ALL);
        id
    }

    pub fn remove(&mut self, id: OverlayId) -> Option<Overlay> {
        self.overlays.shift_remove(&id)
    }

    /// Move an overlay above all others.
    pub fn raise(&mut self, id: OverlayId) {
        if let Some(index) = self.overlays.get_index_of(&id) {
            let last = self.overlays.len() - 1;
            self.overlays.move_index(index, last);
        }
    }

    pub fn get(&self, id: OverlayId) -> Option<&Overlay> {
        self.overlays.get(&id)
    }

    pub fn get_mut(&mut self, id: OverlayId) -> Option<&mut Overlay> {
        self.overlays.get_mut(&id)
    }

    pub fn grid_mut(&mut self, id: OverlayId) -> Option<&mut GridOverlay> {
        match self.overlays.get_mut(&id)? {
            Overlay::Grid(grid) => Some(grid),
            _ => None,
        }
    }

    pub fn geometry_mut(&mut self, id: OverlayId) -> Option<&mut GeometryOverlay> {
        match self.overlays.get_mut(&id)? {
            Overlay::Geometry(overlay) => Some(overlay),
            _ => None,
        }
    }

    pub fn rubberband_mut(&mut self, id: OverlayId) -> Option<&mut RubberbandOverlay> {
        match self.overlays.get_mut(&id)? {
            Overlay::Rubberband(overlay) => Some(overlay),
            _ => None,
        }
    }

    /// Overlays in draw order.
    pub fn iter(&self) -> impl Iterator<Item = (OverlayId, &Overlay)> {
        self.overlays.iter().map(|(id, overlay)| (*id, overlay))
    }

    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    /// The snapshot used by the last successful sync.
    pub fn context(&self) -> Option<&ProjectionContext> {
        self.context.as_ref()
    }

    /// Why the last sync rendered nothing, if it failed.
    pub fn last_error(&self) -> Option<ProjectionError> {
        self.last_error
    }

    /// Record a view change; the next [`sync_if_needed`](Self::sync_if_needed) will run.
    pub fn notify(&self, change: ViewChange) {
        self.pending.set(self.pending.get() | change);
    }

    /// Subscribe to a map view's change notifications.
    pub fn watch(&self, view: &mut MapView) -> ConnectionId {
        let pending = Rc::clone(&self.pending);
        view.changes()
            .connect(move |change: &ViewChange| pending.set(pending.get() | *change))
    }

    /// Whether a view change was reported or an overlay's inputs changed
    /// since the last sync.
    pub fn has_pending_changes(&self) -> bool {
        !self.pending.get().is_empty() || self.overlays.values().any(Overlay::is_dirty)
    }

    /// Sync only when [`has_pending_changes`](Self::has_pending_changes).
    pub fn sync_if_needed(&mut self, view: &impl ViewStateProvider) -> Vec<OverlayId> {
        if self.has_pending_changes() {
            self.sync(view)
        } else {
            Vec::new()
        }
    }

    /// Snapshot `view` and bring every overlay up to date with it.
    ///
    /// Returns the overlays whose output changed. An unusable view clears
    /// every overlay.
    pub fn sync(&mut self, view: &impl ViewStateProvider) -> Vec<OverlayId> {
        self.pending.set(ViewChange::NONE);
        let context = match ProjectionContext::refresh(view) {
            Ok(context) => context,
            Err(error) => {
                if self.last_error != Some(error) {
                    warn!(%error, "view state unusable, clearing overlays");
                }
                self.last_error = Some(error);
                self.context = None;
                return self
                    .overlays
                    .iter_mut()
                    .filter_map(|(id, overlay)| overlay.clear().then_some(*id))
                    .collect();
            }
        };

        let extent = view.visible_extent();
        let context_moved = self.context != Some(context);
        self.context = Some(context);
        self.last_error = None;

        let changed: Vec<OverlayId> = self
            .overlays
            .iter_mut()
            .filter_map(|(id, overlay)| {
                overlay
                    .recompute(&context, &extent, context_moved)
                    .then_some(*id)
            })
            .collect();
        debug!(
            overlays = self.overlays.len(),
            changed = changed.len(),
            scale = context.scale(),
            rotation = context.rotation(),
            "overlay stack synced"
        );
        changed
    }

    /// Line-list vertices for every overlay, in draw order.
    pub fn line_vertices(&self) -> Vec<LineVertex> {
        let mut out = Vec::new();
        for overlay in self.overlays.values() {
            overlay.push_line_vertices(&mut out);
        }
        out
    }
}
