use std::ops::{BitOr, BitOrAssign};

use glam::DVec2;
use tracing::trace;

use crate::geometry::{Extent, WorldPoint};
use crate::projection::ViewStateProvider;
use crate::signal::Signal;

/// What changed in a map view since the last notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewChange {
    /// The visible extent moved or changed size.
    pub extent: bool,
    /// World units per pixel changed.
    pub scale: bool,
    /// Rotation changed.
    pub rotation: bool,
    /// Viewport pixel size changed.
    pub viewport: bool,
}

impl ViewChange {
    pub const NONE: Self = Self {
        extent: false,
        scale: false,
        rotation: false,
        viewport: false,
    };
    pub const ALL: Self = Self {
        extent: true,
        scale: true,
        rotation: true,
        viewport: true,
    };
    pub const PAN: Self = Self {
        extent: true,
        ..Self::NONE
    };

    pub fn is_empty(self) -> bool {
        self == Self::NONE
    }
}

impl BitOr for ViewChange {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self {
            extent: self.extent || rhs.extent,
            scale: self.scale || rhs.scale,
            rotation: self.rotation || rhs.rotation,
            viewport: self.viewport || rhs.viewport,
        }
    }
}

impl BitOrAssign for ViewChange {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = *self | rhs;
    }
}

/// A minimal map view: a center, a scale, a rotation and a viewport size.
///
/// Every mutation that actually changes the view emits a [`ViewChange`] on
/// [`changes`](Self::changes).
#[derive(Debug)]
pub struct MapView {
    center: WorldPoint,
    scale: f64,
    rotation: f64,
    viewport_size: DVec2,
    changes: Signal<ViewChange>,
}

impl MapView {
    pub fn new(center: WorldPoint, scale: f64, viewport_size: DVec2) -> Self {
        Self {
            center,
            scale,
            rotation: 0.0,
            viewport_size,
            changes: Signal::new(),
        }
    }

    /// A view centered on `extent` whose unrotated viewport covers all of it.
    ///
    /// The scale is the larger of the width and height ratios, so the extent
    /// fills the viewport along one axis and fits inside along the other.
    pub fn fitting(extent: Extent, viewport_size: DVec2) -> Self {
        let scale = (extent.width() / viewport_size.x).max(extent.height() / viewport_size.y);
        Self::new(extent.center(), scale, viewport_size)
    }

    pub fn center(&self) -> WorldPoint {
        self.center
    }

    /// Change notifications for this view.
    pub fn changes(&mut self) -> &mut Signal<ViewChange> {
        &mut self.changes
    }

    pub fn set_center(&mut self, center: WorldPoint) {
        if center == self.center {
            return;
        }
        self.center = center;
        self.notify(ViewChange::PAN);
    }

    /// Move the map content by a screen-space delta, as a drag would.
    pub fn pan_pixels(&mut self, delta: DVec2) {
        let (sin, cos) = self.rotation.sin_cos();
        // Undo the on-screen rotation before converting pixels to world units.
        let unrotated = DVec2::new(delta.x * cos + delta.y * sin, -delta.x * sin + delta.y * cos);
        let world_delta = DVec2::new(unrotated.x, -unrotated.y) * self.scale;
        self.set_center(self.center - world_delta);
    }

    pub fn set_scale(&mut self, scale: f64) {
        if scale == self.scale {
            return;
        }
        self.scale = scale;
        self.notify(ViewChange {
            extent: true,
            scale: true,
            ..ViewChange::NONE
        });
    }

    /// Zoom about the view center; factors above one zoom in.
    pub fn zoom_by(&mut self, factor: f64) {
        if factor > 0.0 && factor.is_finite() {
            self.set_scale(self.scale / factor);
        }
    }

    pub fn set_rotation(&mut self, radians: f64) {
        if radians == self.rotation {
            return;
        }
        self.rotation = radians;
        self.notify(ViewChange {
            extent: true,
            rotation: true,
            ..ViewChange::NONE
        });
    }

    pub fn resize(&mut self, viewport_size: DVec2) {
        if viewport_size == self.viewport_size {
            return;
        }
        self.viewport_size = viewport_size;
        self.notify(ViewChange {
            extent: true,
            viewport: true,
            ..ViewChange::NONE
        });
    }

    fn notify(&mut self, change: ViewChange) {
        trace!(?change, center = ?self.center, scale = self.scale, "map view changed");
        self.changes.emit(&change);
    }
}

impl ViewStateProvider for MapView {
    fn visible_extent(&self) -> Extent {
        let half = self.viewport_size * 0.5 * self.scale;
        let (sin, cos) = self.rotation.sin_cos();
        let (sin, cos) = (sin.abs(), cos.abs());
        let half = DVec2::new(half.x * cos + half.y * sin, half.x * sin + half.y * cos);
        Extent::new(
            self.center.x - half.x,
            self.center.y - half.y,
            self.center.x + half.x,
            self.center.y + half.y,
        )
    }

    fn scale(&self) -> f64 {
        self.scale
    }

    fn rotation(&self) -> f64 {
        self.rotation
    }

    fn viewport_size(&self) -> DVec2 {
        self.viewport_size
    }
}
