//! Rubber band overlay: a vertex chain still being edited.
//!
//! Committed vertices form the primary polylines. The vertex under edit is
//! kept out of them and published on its own, together with a guide segment
//! joining it to its committed neighbours, so the renderer can emphasise it.

use tracing::debug;

use crate::cache::ScreenPolylineCache;
use crate::geometry::{Geometry, GeometryType, Polyline, ScreenPoint, WorldPoint};
use crate::geometry_overlay::project_parts;
use crate::projection::ProjectionContext;
use crate::style::RubberbandStyle;
use crate::vertex_model::{VertexChain, VertexModel};

/// How the cached polylines are split between committed output and the guide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Layout {
    /// Number of leading cached polylines that hold committed vertices.
    committed: usize,
    /// Position of the current vertex inside the guide polyline, which
    /// follows the committed ones.
    current: Option<usize>,
    polylines_type: GeometryType,
}

#[derive(Debug, Clone, Default)]
pub struct RubberbandOverlay {
    model: Option<VertexModel>,
    /// Model version the cache was last built from.
    model_version: Option<u64>,
    geometry: Option<Geometry>,
    /// Explicit type; [`GeometryType::Null`] means "use the active source's type".
    geometry_type: GeometryType,
    style: RubberbandStyle,
    cache: ScreenPolylineCache,
    layout: Layout,
    /// Style changed since the last recompute.
    restyled: bool,
    version: u64,
}

impl RubberbandOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Follow a vertex chain. Takes precedence over a finished geometry.
    pub fn with_model(mut self, model: VertexModel) -> Self {
        self.set_model(Some(model));
        self
    }

    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.set_geometry(Some(geometry));
        self
    }

    pub fn with_style(mut self, style: RubberbandStyle) -> Self {
        self.style = style;
        self
    }

    pub fn set_model(&mut self, model: Option<VertexModel>) {
        self.model = model;
        self.model_version = None;
        self.cache.invalidate();
    }

    pub fn set_geometry(&mut self, geometry: Option<Geometry>) {
        self.geometry = geometry;
        self.cache.invalidate();
    }

    /// Force a geometry type; pass [`GeometryType::Null`] to infer it from the source.
    pub fn set_geometry_type(&mut self, geometry_type: GeometryType) {
        if self.geometry_type != geometry_type {
            self.geometry_type = geometry_type;
            self.cache.invalidate();
        }
    }

    /// Restyle the rubber band; the next recompute reports it as changed.
    pub fn set_style(&mut self, style: RubberbandStyle) {
        if self.style != style {
            self.style = style;
            self.restyled = true;
            self.version = self.version.wrapping_add(1);
        }
    }

    pub fn style(&self) -> &RubberbandStyle {
        &self.style
    }

    pub fn model(&self) -> Option<&VertexModel> {
        self.model.as_ref()
    }

    /// Reproject from source on the next recompute.
    pub fn mark_dirty(&mut self) {
        self.cache.invalidate();
    }

    /// Whether the source data changed since the last recompute.
    pub fn is_dirty(&self) -> bool {
        let model_changed = self
            .model
            .as_ref()
            .is_some_and(|m| self.model_version != Some(m.version()));
        model_changed || self.restyled || self.cache.anchor().is_none()
    }

    /// Bring the output up to date with `context` and the source data.
    ///
    /// Returns whether anything changed.
    pub fn recompute(&mut self, context: &ProjectionContext) -> bool {
        if let Some(model) = &self.model {
            let version = model.version();
            if self.model_version != Some(version) {
                self.model_version = Some(version);
                self.cache.invalidate();
            }
        }

        let model = self.model.as_ref();
        let geometry = self.geometry.as_ref();
        let explicit_type = self.geometry_type;
        let mut layout = None;
        let changed = self.cache.update(context, |ctx| {
            let (polylines, l) = if let Some(model) = model {
                let chain = model.snapshot();
                let ty = resolve_type(explicit_type, chain.geometry_type);
                project_chain(ctx, &chain, ty)
            } else if let Some(geometry) = geometry {
                let ty = resolve_type(explicit_type, geometry.geometry_type());
                let polylines = project_parts(ctx, geometry.parts(), ty);
                let committed = polylines.len();
                let layout = Layout {
                    committed,
                    current: None,
                    polylines_type: if committed == 0 { GeometryType::Null } else { ty },
                };
                (polylines, layout)
            } else {
                (Vec::new(), Layout::default())
            };
            layout = Some(l);
            polylines
        });
        if let Some(layout) = layout {
            self.layout = layout;
        }

        if changed {
            self.version = self.version.wrapping_add(1);
            debug!(
                polylines = self.layout.committed,
                current = self.layout.current.is_some(),
                "rubberband updated"
            );
        }
        changed | std::mem::take(&mut self.restyled)
    }

    /// Drop projected output, e.g. when the view became unusable.
    pub fn clear(&mut self) -> bool {
        let had_output = !self.cache.polylines().is_empty();
        self.cache.clear();
        self.layout = Layout::default();
        self.model_version = None;
        if had_output {
            self.version = self.version.wrapping_add(1);
        }
        had_output
    }

    /// Polylines of committed vertices; never contains the current vertex.
    pub fn polylines(&self) -> &[Polyline] {
        let cached = self.cache.polylines();
        &cached[..self.layout.committed.min(cached.len())]
    }

    /// Screen position of the vertex under edit.
    pub fn current_point(&self) -> Option<ScreenPoint> {
        let index = self.layout.current?;
        self.guide()?.get(index).copied()
    }

    /// The current vertex joined to its committed neighbours.
    pub fn current_segment(&self) -> &[ScreenPoint] {
        self.guide().unwrap_or(&[])
    }

    fn guide(&self) -> Option<&[ScreenPoint]> {
        self.layout.current?;
        self.cache
            .polylines()
            .get(self.layout.committed)
            .map(Vec::as_slice)
    }

    pub fn polylines_type(&self) -> GeometryType {
        self.layout.polylines_type
    }

    /// Bumped every time the output changes.
    pub fn version(&self) -> u64 {
        self.version
    }
}

fn resolve_type(explicit: GeometryType, source: GeometryType) -> GeometryType {
    if explicit == GeometryType::Null {
        source
    } else {
        explicit
    }
}

fn project_chain(
    context: &ProjectionContext,
    chain: &VertexChain,
    geometry_type: GeometryType,
) -> (Vec<Polyline>, Layout) {
    let committed_vertices: Vec<WorldPoint> = chain.committed().collect();
    let mut polylines = project_parts(context, &[committed_vertices], geometry_type);
    let committed = polylines.len();

    let mut current = None;
    if geometry_type != GeometryType::Null
        && let Some(index) = chain.current_index
        && index < chain.vertices.len()
    {
        let (guide, position) = guide_vertices(chain, index, geometry_type);
        polylines.push(guide.into_iter().map(|p| context.project(p)).collect());
        current = Some(position);
    }

    let polylines_type = if polylines.is_empty() {
        GeometryType::Null
    } else {
        geometry_type
    };
    let layout = Layout {
        committed,
        current,
        polylines_type,
    };
    (polylines, layout)
}

/// The vertex at `index` with its neighbours along the chain, plus its
/// position in the returned list. Polygons wrap around once they have three
/// vertices.
fn guide_vertices(
    chain: &VertexChain,
    index: usize,
    geometry_type: GeometryType,
) -> (Vec<WorldPoint>, usize) {
    let v = &chain.vertices;
    let n = v.len();
    let wraps = geometry_type == GeometryType::Polygon && n >= 3;
    let connected = matches!(geometry_type, GeometryType::Line | GeometryType::Polygon);

    let prev = match index {
        _ if !connected => None,
        0 if wraps => v.last().copied(),
        0 => None,
        i => Some(v[i - 1]),
    };
    let next = match v.get(index + 1) {
        _ if !connected => None,
        Some(&p) => Some(p),
        None if wraps => v.first().copied(),
        None => None,
    };

    let mut guide = Vec::with_capacity(3);
    guide.extend(prev);
    let position = guide.len();
    guide.push(v[index]);
    guide.extend(next);
    (guide, position)
}

#[cfg(test)]
mod tests {
    use glam::DVec2;

    use super::*;

    fn context(corner: DVec2, scale: f64, rotation: f64) -> ProjectionContext {
        ProjectionContext::new(corner, scale, rotation, DVec2::new(200.0, 200.0)).unwrap()
    }

    fn drawing(geometry_type: GeometryType) -> VertexModel {
        let model = VertexModel::new(geometry_type);
        model.push(DVec2::new(0.0, 0.0));
        model.push(DVec2::new(10.0, 0.0));
        model.push(DVec2::new(10.0, 10.0));
        model.set_current_coordinate(DVec2::new(3.0, 7.0));
        model
    }

    #[test]
    fn current_vertex_is_kept_out_of_committed_polylines() {
        let ctx = context(DVec2::new(-20.0, 40.0), 0.5, 0.3);
        let mut overlay = RubberbandOverlay::new().with_model(drawing(GeometryType::Line));
        assert!(overlay.recompute(&ctx));

        let current = overlay.current_point().unwrap();
        assert_eq!(current, ctx.project(DVec2::new(3.0, 7.0)));
        assert_eq!(overlay.polylines().len(), 1);
        assert_eq!(overlay.polylines()[0].len(), 3);
        assert!(overlay.polylines().iter().flatten().all(|p| *p != current));
        assert_eq!(
            overlay.current_segment(),
            &[ctx.project(DVec2::new(10.0, 10.0)), current]
        );
        assert_eq!(overlay.polylines_type(), GeometryType::Line);
    }

    #[test]
    fn polygon_rubberband_closes_and_guides_back_to_start() {
        let ctx = context(DVec2::new(0.0, 20.0), 1.0, 0.0);
        let mut overlay = RubberbandOverlay::new().with_model(drawing(GeometryType::Polygon));
        overlay.recompute(&ctx);

        let ring = &overlay.polylines()[0];
        assert_eq!(ring.len(), 4);
        assert_eq!(ring.first(), ring.last());
        assert_eq!(
            overlay.current_segment(),
            &[
                ctx.project(DVec2::new(10.0, 10.0)),
                ctx.project(DVec2::new(3.0, 7.0)),
                ctx.project(DVec2::new(0.0, 0.0)),
            ]
        );
        assert_eq!(overlay.current_point(), Some(ctx.project(DVec2::new(3.0, 7.0))));
    }

    #[test]
    fn model_mutation_triggers_reprojection() {
        let ctx = context(DVec2::ZERO, 1.0, 0.0);
        let model = drawing(GeometryType::Line);
        let mut overlay = RubberbandOverlay::new().with_model(model.clone());
        overlay.recompute(&ctx);
        assert!(!overlay.recompute(&ctx));

        model.set_current_coordinate(DVec2::new(4.0, -4.0));
        assert!(overlay.is_dirty());
        assert!(overlay.recompute(&ctx));
        assert!(!overlay.is_dirty());
        assert_eq!(overlay.current_point(), Some(DVec2::new(4.0, 4.0)));

        model.commit_current();
        assert!(overlay.recompute(&ctx));
        assert_eq!(overlay.current_point(), None);
        assert!(overlay.current_segment().is_empty());
        assert_eq!(overlay.polylines()[0].len(), 4);
    }

    #[test]
    fn rotation_change_reprojects_even_without_edits() {
        let model = drawing(GeometryType::Line);
        let mut overlay = RubberbandOverlay::new().with_model(model);
        overlay.recompute(&context(DVec2::ZERO, 1.0, 0.0));
        let before = overlay.polylines().to_vec();

        let turned = context(DVec2::ZERO, 1.0, 0.5);
        assert!(overlay.recompute(&turned));
        assert_ne!(overlay.polylines(), before.as_slice());
        assert_eq!(overlay.polylines()[0][1], turned.project(DVec2::new(10.0, 0.0)));
    }

    #[test]
    fn vertex_model_takes_precedence_over_geometry() {
        let ctx = context(DVec2::ZERO, 1.0, 0.0);
        let geometry = Geometry::polygon([vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(1.0, 0.0),
            DVec2::new(1.0, 1.0),
        ]]);
        let mut overlay = RubberbandOverlay::new()
            .with_geometry(geometry)
            .with_model(drawing(GeometryType::Line));
        overlay.recompute(&ctx);
        assert_eq!(overlay.polylines_type(), GeometryType::Line);

        overlay.set_model(None);
        assert!(overlay.recompute(&ctx));
        assert_eq!(overlay.polylines_type(), GeometryType::Polygon);
        assert_eq!(overlay.polylines()[0].len(), 4);
        assert_eq!(overlay.current_point(), None);
    }

    #[test]
    fn explicit_type_wins_over_source_type() {
        let ctx = context(DVec2::ZERO, 1.0, 0.0);
        let mut overlay = RubberbandOverlay::new().with_model(drawing(GeometryType::Line));
        overlay.set_geometry_type(GeometryType::Point);
        overlay.recompute(&ctx);

        assert_eq!(overlay.polylines_type(), GeometryType::Point);
        assert_eq!(overlay.polylines().len(), 3);
        assert_eq!(overlay.current_segment().len(), 1);
    }

    #[test]
    fn explicit_type_decides_ring_closure_for_geometry_sources() {
        let ctx = context(DVec2::ZERO, 1.0, 0.0);
        let triangle = vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(4.0, 0.0),
            DVec2::new(4.0, -4.0),
        ];

        let mut overlay = RubberbandOverlay::new().with_geometry(Geometry::line(triangle.clone()));
        overlay.set_geometry_type(GeometryType::Polygon);
        overlay.recompute(&ctx);
        let ring = &overlay.polylines()[0];
        assert_eq!(overlay.polylines_type(), GeometryType::Polygon);
        assert_eq!(ring.len(), 4);
        assert_eq!(ring.first(), ring.last());

        let mut overlay = RubberbandOverlay::new().with_geometry(Geometry::polygon([triangle]));
        overlay.set_geometry_type(GeometryType::Line);
        overlay.recompute(&ctx);
        assert_eq!(overlay.polylines_type(), GeometryType::Line);
        assert_eq!(overlay.polylines()[0].len(), 3);

        overlay.set_geometry_type(GeometryType::Point);
        overlay.recompute(&ctx);
        assert_eq!(overlay.polylines_type(), GeometryType::Point);
        assert_eq!(
            overlay.polylines(),
            &[
                vec![DVec2::new(0.0, 0.0)],
                vec![DVec2::new(4.0, 0.0)],
                vec![DVec2::new(4.0, 4.0)],
            ]
        );
    }

    #[test]
    fn restyling_marks_the_overlay_dirty() {
        let ctx = context(DVec2::ZERO, 1.0, 0.0);
        let mut overlay = RubberbandOverlay::new().with_model(drawing(GeometryType::Line));
        overlay.recompute(&ctx);
        assert!(!overlay.is_dirty());

        overlay.set_style(RubberbandStyle::default().with_current_width(4.0));
        assert!(overlay.is_dirty());
        assert!(overlay.recompute(&ctx));
        assert!(!overlay.is_dirty());
        assert!(!overlay.recompute(&ctx));
    }

    #[test]
    fn empty_sources_render_nothing() {
        let ctx = context(DVec2::ZERO, 1.0, 0.0);
        let mut overlay = RubberbandOverlay::new().with_model(VertexModel::default());
        overlay.recompute(&ctx);
        assert!(overlay.polylines().is_empty());
        assert_eq!(overlay.polylines_type(), GeometryType::Null);

        let mut unset = RubberbandOverlay::new();
        unset.recompute(&ctx);
        assert!(unset.polylines().is_empty());
        assert_eq!(unset.current_point(), None);
    }
}
