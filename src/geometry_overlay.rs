use tracing::debug;

use crate::cache::ScreenPolylineCache;
use crate::geometry::{Geometry, GeometryType, Polyline, WorldPoint, close_ring};
use crate::projection::ProjectionContext;
use crate::style::OverlayStyle;

/// Projects a finished geometry into screen polylines.
#[derive(Debug, Clone, Default)]
pub struct GeometryOverlay {
    geometry: Geometry,
    style: OverlayStyle,
    cache: ScreenPolylineCache,
    /// Style changed since the last recompute.
    restyled: bool,
    version: u64,
}

impl GeometryOverlay {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            ..Self::default()
        }
    }

    /// Set the stroke style.
    pub fn with_style(mut self, style: OverlayStyle) -> Self {
        self.style = style;
        self
    }

    /// Replace the geometry; the next recompute reprojects it.
    pub fn set_geometry(&mut self, geometry: Geometry) {
        self.geometry = geometry;
        self.cache.invalidate();
    }

    pub fn clear_geometry(&mut self) {
        self.set_geometry(Geometry::empty());
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Restyle the overlay; the next recompute reports it as changed.
    pub fn set_style(&mut self, style: OverlayStyle) {
        if self.style != style {
            self.style = style;
            self.restyled = true;
            self.version = self.version.wrapping_add(1);
        }
    }

    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    /// Whether the geometry or style changed since the last recompute.
    pub fn is_dirty(&self) -> bool {
        self.restyled || self.cache.anchor().is_none()
    }

    /// Bring the polylines up to date with `context`. Returns whether they changed.
    pub fn recompute(&mut self, context: &ProjectionContext) -> bool {
        let geometry = &self.geometry;
        let changed = self
            .cache
            .update(context, |ctx| {
                project_parts(ctx, geometry.parts(), geometry.geometry_type())
            });
        if changed {
            self.version = self.version.wrapping_add(1);
            debug!(
                geometry_type = ?self.geometry.geometry_type(),
                polylines = self.cache.polylines().len(),
                "geometry overlay updated"
            );
        }
        changed | std::mem::take(&mut self.restyled)
    }

    /// Drop projected output, e.g. when the view became unusable.
    pub fn clear(&mut self) -> bool {
        let had_output = !self.cache.polylines().is_empty();
        self.cache.clear();
        if had_output {
            self.version = self.version.wrapping_add(1);
        }
        had_output
    }

    pub fn polylines(&self) -> &[Polyline] {
        self.cache.polylines()
    }

    /// Type of the projected polylines; [`GeometryType::Null`] when there are none.
    pub fn polylines_type(&self) -> GeometryType {
        if self.cache.polylines().is_empty() {
            GeometryType::Null
        } else {
            self.geometry.geometry_type()
        }
    }

    /// Bumped every time the polylines change.
    pub fn version(&self) -> u64 {
        self.version
    }
}

/// Project vertex parts as geometries of `geometry_type`.
///
/// Points become one single-vertex polyline each. Line and polygon parts keep
/// their vertex order; polygon rings with at least three vertices are closed.
/// Empty parts are skipped.
pub(crate) fn project_parts(
    context: &ProjectionContext,
    parts: &[Vec<WorldPoint>],
    geometry_type: GeometryType,
) -> Vec<Polyline> {
    match geometry_type {
        GeometryType::Null => Vec::new(),
        GeometryType::Point => parts
            .iter()
            .flatten()
            .map(|&p| vec![context.project(p)])
            .collect(),
        GeometryType::Line | GeometryType::Polygon => parts
            .iter()
            .filter(|part| !part.is_empty())
            .map(|part| {
                let mut polyline: Polyline = part.iter().map(|&p| context.project(p)).collect();
                if geometry_type.closes_rings() && polyline.len() >= geometry_type.min_part_len() {
                    close_ring(&mut polyline);
                }
                polyline
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use glam::DVec2;

    use super::*;

    fn context(corner: DVec2, scale: f64, rotation: f64) -> ProjectionContext {
        ProjectionContext::new(corner, scale, rotation, DVec2::new(320.0, 240.0)).unwrap()
    }

    fn square() -> Vec<DVec2> {
        vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(10.0, 0.0),
            DVec2::new(10.0, 10.0),
            DVec2::new(0.0, 10.0),
        ]
    }

    #[test]
    fn polygon_rings_are_closed() {
        let mut overlay = GeometryOverlay::new(Geometry::polygon([square()]));
        assert!(overlay.recompute(&context(DVec2::new(-5.0, 20.0), 0.5, 0.25)));

        let ring = &overlay.polylines()[0];
        assert_eq!(ring.len(), 5);
        assert_eq!(ring.first(), ring.last());
        assert_eq!(overlay.polylines_type(), GeometryType::Polygon);
    }

    #[test]
    fn lines_stay_open() {
        let mut overlay = GeometryOverlay::new(Geometry::line(square()));
        overlay.recompute(&context(DVec2::ZERO, 1.0, 0.0));
        assert_eq!(overlay.polylines()[0].len(), 4);
        assert_eq!(overlay.polylines_type(), GeometryType::Line);
    }

    #[test]
    fn each_point_becomes_a_single_point_polyline() {
        let mut overlay =
            GeometryOverlay::new(Geometry::multi_point([DVec2::ZERO, DVec2::new(4.0, -4.0)]));
        overlay.recompute(&context(DVec2::new(0.0, 0.0), 2.0, 0.0));
        assert_eq!(
            overlay.polylines(),
            &[vec![DVec2::ZERO], vec![DVec2::new(2.0, 2.0)]]
        );
    }

    #[test]
    fn empty_geometry_yields_null_type() {
        let mut overlay = GeometryOverlay::new(Geometry::empty());
        assert!(overlay.recompute(&context(DVec2::ZERO, 1.0, 0.0)));
        assert!(overlay.polylines().is_empty());
        assert_eq!(overlay.polylines_type(), GeometryType::Null);
        assert!(!overlay.recompute(&context(DVec2::ZERO, 1.0, 0.0)));
    }

    #[test]
    fn set_geometry_reprojects_on_next_recompute() {
        let ctx = context(DVec2::ZERO, 1.0, 0.0);
        let mut overlay = GeometryOverlay::new(Geometry::line(square()));
        overlay.recompute(&ctx);
        let version = overlay.version();

        overlay.set_geometry(Geometry::point(DVec2::new(3.0, -3.0)));
        assert!(overlay.recompute(&ctx));
        assert_eq!(overlay.polylines(), &[vec![DVec2::new(3.0, 3.0)]]);
        assert_eq!(overlay.version(), version + 1);

        overlay.clear_geometry();
        assert!(overlay.recompute(&ctx));
        assert_eq!(overlay.polylines_type(), GeometryType::Null);
    }

    #[test]
    fn restyling_is_reported_once() {
        let ctx = context(DVec2::ZERO, 1.0, 0.0);
        let mut overlay = GeometryOverlay::new(Geometry::line(square()));
        overlay.recompute(&ctx);
        let version = overlay.version();

        overlay.set_style(*overlay.style());
        assert!(!overlay.is_dirty());

        overlay.set_style(OverlayStyle::default().with_width(5.0));
        assert!(overlay.is_dirty());
        assert_eq!(overlay.version(), version + 1);
        assert!(overlay.recompute(&ctx));
        assert!(!overlay.recompute(&ctx));
    }

    #[test]
    fn pan_keeps_rings_closed() {
        let mut overlay = GeometryOverlay::new(Geometry::polygon([square()]));
        overlay.recompute(&context(DVec2::new(-5.0, 20.0), 0.5, 0.0));
        overlay.recompute(&context(DVec2::new(-9.0, 27.0), 0.5, 0.0));
        let ring = &overlay.polylines()[0];
        assert_eq!(ring.first(), ring.last());
        assert_eq!(ring[0], DVec2::new(18.0, 54.0));
    }
}
