//! World to screen projection shared by every overlay of a frame.

use glam::DVec2;

use crate::geometry::{Extent, ScreenPoint, WorldPoint};

/// Read access to the state of a map view.
///
/// This is everything the overlays need from whatever owns the map: the
/// [`ProjectionContext`] is derived from it once per update cycle.
pub trait ViewStateProvider {
    /// Axis-aligned world extent covered by the viewport (bounding box of the
    /// rotated view when rotation is non-zero).
    fn visible_extent(&self) -> Extent;
    /// World units per screen pixel.
    fn scale(&self) -> f64;
    /// Clockwise on-screen rotation in radians.
    fn rotation(&self) -> f64;
    /// Viewport size in pixels (width, height).
    fn viewport_size(&self) -> DVec2;
}

/// Reasons a view state cannot be turned into a usable projection.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum ProjectionError {
    #[error("map scale must be positive and finite, got {0}")]
    NonPositiveScale(f64),
    #[error("viewport of {width}x{height} pixels has no area")]
    DegenerateViewport { width: f64, height: f64 },
    #[error("view state contains non-finite coordinates")]
    NonFinite,
}

/// Immutable snapshot of how world coordinates map to screen coordinates.
///
/// Projection translates by the world corner, divides by the scale (flipping
/// y so that world north points up the screen) and finally rotates about the
/// viewport center. All overlays of a frame share one context, which keeps
/// their output aligned to the bit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionContext {
    world_corner: WorldPoint,
    scale: f64,
    rotation: f64,
    viewport_size: DVec2,
    /// (cos, sin) of `rotation`, computed once per snapshot.
    rotation_vec: DVec2,
}

impl ProjectionContext {
    /// Build a context from its parts.
    ///
    /// `world_corner` is the world position shown at the top-left pixel of
    /// the unrotated viewport.
    pub fn new(
        world_corner: WorldPoint,
        scale: f64,
        rotation: f64,
        viewport_size: DVec2,
    ) -> Result<Self, ProjectionError> {
        if !world_corner.is_finite() || !rotation.is_finite() || !viewport_size.is_finite() {
            return Err(ProjectionError::NonFinite);
        }
        if !scale.is_finite() || scale <= 0.0 {
            return Err(ProjectionError::NonPositiveScale(scale));
        }
        if viewport_size.x <= 0.0 || viewport_size.y <= 0.0 {
            return Err(ProjectionError::DegenerateViewport {
                width: viewport_size.x,
                height: viewport_size.y,
            });
        }
        Ok(Self {
            world_corner,
            scale,
            rotation,
            viewport_size,
            rotation_vec: DVec2::from_angle(rotation),
        })
    }

    /// Snapshot the current state of a view.
    pub fn refresh(view: &impl ViewStateProvider) -> Result<Self, ProjectionError> {
        let extent = view.visible_extent();
        if !extent.is_finite() {
            return Err(ProjectionError::NonFinite);
        }
        let scale = view.scale();
        let size = view.viewport_size();
        // The bounding box of a rotated view shares its center with the view.
        let half_span = DVec2::new(-size.x, size.y) * 0.5 * scale;
        Self::new(extent.center() + half_span, scale, view.rotation(), size)
    }

    pub fn world_corner(&self) -> WorldPoint {
        self.world_corner
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn viewport_size(&self) -> DVec2 {
        self.viewport_size
    }

    /// Project a world position into screen space.
    pub fn project(&self, world: WorldPoint) -> ScreenPoint {
        let d = world - self.world_corner;
        let unrotated = DVec2::new(d.x / self.scale, -d.y / self.scale);
        if self.rotation == 0.0 {
            return unrotated;
        }
        let center = self.viewport_size * 0.5;
        center + self.rotation_vec.rotate(unrotated - center)
    }

    /// Inverse of [`project`](Self::project).
    pub fn unproject(&self, screen: ScreenPoint) -> WorldPoint {
        let unrotated = if self.rotation == 0.0 {
            screen
        } else {
            let center = self.viewport_size * 0.5;
            let inverse = DVec2::new(self.rotation_vec.x, -self.rotation_vec.y);
            center + inverse.rotate(screen - center)
        };
        self.world_corner + DVec2::new(unrotated.x * self.scale, -unrotated.y * self.scale)
    }

    /// World bounding box of the viewport.
    pub fn visible_extent(&self) -> Extent {
        let DVec2 { x: w, y: h } = self.viewport_size;
        let corners = [
            DVec2::ZERO,
            DVec2::new(w, 0.0),
            DVec2::new(0.0, h),
            DVec2::new(w, h),
        ];
        let first = self.unproject(corners[0]);
        corners[1..]
            .iter()
            .map(|&c| self.unproject(c))
            .fold(Extent::new(first.x, first.y, first.x, first.y), |e, p| {
                Extent::new(e.x_min.min(p.x), e.y_min.min(p.y), e.x_max.max(p.x), e.y_max.max(p.y))
            })
    }

    /// Whether `other` maps world deltas to screen deltas exactly like `self`,
    /// so the two projections differ only by a screen-space translation.
    pub fn is_translation_of(&self, other: &ProjectionContext) -> bool {
        self.scale == other.scale && self.rotation == other.rotation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedView {
        extent: Extent,
        scale: f64,
        rotation: f64,
        size: DVec2,
    }

    impl ViewStateProvider for FixedView {
        fn visible_extent(&self) -> Extent {
            self.extent
        }
        fn scale(&self) -> f64 {
            self.scale
        }
        fn rotation(&self) -> f64 {
            self.rotation
        }
        fn viewport_size(&self) -> DVec2 {
            self.size
        }
    }

    fn view(scale: f64, size: DVec2) -> FixedView {
        FixedView {
            extent: Extent::new(0.0, 0.0, size.x * scale, size.y * scale),
            scale,
            rotation: 0.0,
            size,
        }
    }

    #[test]
    fn refresh_places_extent_corner_at_origin() {
        let ctx = ProjectionContext::refresh(&view(2.0, DVec2::new(50.0, 50.0))).unwrap();
        assert_eq!(ctx.world_corner(), DVec2::new(0.0, 100.0));
        assert_eq!(ctx.project(DVec2::new(0.0, 100.0)), DVec2::ZERO);
        assert_eq!(ctx.project(DVec2::new(100.0, 0.0)), DVec2::new(50.0, 50.0));
    }

    #[test]
    fn refresh_rejects_degenerate_views() {
        assert_eq!(
            ProjectionContext::refresh(&view(0.0, DVec2::new(10.0, 10.0))),
            Err(ProjectionError::NonPositiveScale(0.0))
        );
        assert!(matches!(
            ProjectionContext::refresh(&view(1.0, DVec2::new(10.0, 0.0))),
            Err(ProjectionError::DegenerateViewport { .. })
        ));
        let mut v = view(1.0, DVec2::new(10.0, 10.0));
        v.extent.x_max = f64::NAN;
        assert_eq!(
            ProjectionContext::refresh(&v),
            Err(ProjectionError::NonFinite)
        );
    }

    #[test]
    fn rotation_turns_about_viewport_center() {
        let ctx = ProjectionContext::new(
            DVec2::new(0.0, 100.0),
            1.0,
            std::f64::consts::FRAC_PI_2,
            DVec2::new(100.0, 100.0),
        )
        .unwrap();
        let center_world = DVec2::new(50.0, 50.0);
        assert!(ctx.project(center_world).distance(DVec2::new(50.0, 50.0)) < 1e-9);
        // A quarter turn clockwise moves the top-left corner to the top-right.
        assert!(ctx.project(DVec2::new(0.0, 100.0)).distance(DVec2::new(100.0, 0.0)) < 1e-9);
    }

    #[test]
    fn unproject_inverts_project() {
        let ctx = ProjectionContext::new(
            DVec2::new(2_600_000.0, 1_200_000.0),
            0.37,
            0.7,
            DVec2::new(640.0, 480.0),
        )
        .unwrap();
        for p in [
            DVec2::new(2_600_010.0, 1_199_990.0),
            DVec2::new(2_600_200.5, 1_199_900.25),
        ] {
            assert!(ctx.unproject(ctx.project(p)).distance(p) < 1e-6);
        }
    }

    #[test]
    fn visible_extent_grows_under_rotation() {
        let size = DVec2::new(100.0, 50.0);
        let flat = ProjectionContext::new(DVec2::new(0.0, 50.0), 1.0, 0.0, size).unwrap();
        let turned = ProjectionContext::new(DVec2::new(0.0, 50.0), 1.0, 0.3, size).unwrap();
        assert_eq!(flat.visible_extent(), Extent::new(0.0, 0.0, 100.0, 50.0));
        let e = turned.visible_extent();
        assert!(e.width() > 100.0 && e.height() > 50.0);
        assert!(e.center().distance(flat.visible_extent().center()) < 1e-9);
    }
}
