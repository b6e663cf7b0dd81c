use std::fmt;
use std::sync::Arc;

use glam::DVec2;
use tracing::{debug, warn};

use crate::geometry::{Extent, Polyline, ScreenPoint};
use crate::labels::{LabelFormatter, default_formatter};
use crate::projection::ProjectionContext;
use crate::style::GridStyle;

/// Grid lines closer than this many pixels are not drawn at all.
const GRID_MIN_SPACING_PX: f64 = 3.0;
/// Upper bound on lines per axis, whatever the extent.
const GRID_MAX_LINES: usize = 10_000;
/// Tolerance on segment parameters when testing border intersections.
const GRID_EPSILON: f64 = 1e-6;

/// Viewport border an annotation is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    Top,
    Bottom,
    Left,
    Right,
}

/// A coordinate label where a grid line crosses a viewport border.
#[derive(Debug, Clone, PartialEq)]
pub struct GridAnnotation {
    pub edge: Edge,
    /// Screen position of the crossing.
    pub anchor: ScreenPoint,
    pub label: String,
    /// World coordinate of the grid line (x for top/bottom, y for left/right).
    pub value: f64,
}

/// Invalid grid parameters.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum GridError {
    #[error("grid intervals must be positive and finite, got ({x}, {y})")]
    InvalidInterval { x: f64, y: f64 },
    #[error("grid offsets must be finite, got ({x}, {y})")]
    NonFiniteOffset { x: f64, y: f64 },
}

/// Builder for a [`GridOverlay`].
///
/// # Example
///
/// ```ignore
/// let grid = GridConfig::new(100.0, 100.0)
///     .with_offsets(50.0, 0.0)
///     .with_formatter(grouped_formatter('\''))
///     .build()?;
/// ```
#[derive(Clone)]
pub struct GridConfig {
    x_interval: f64,
    y_interval: f64,
    x_offset: f64,
    y_offset: f64,
    style: GridStyle,
    formatter: Option<LabelFormatter>,
}

impl GridConfig {
    /// Grid lines every `x_interval` / `y_interval` world units.
    pub fn new(x_interval: f64, y_interval: f64) -> Self {
        Self {
            x_interval,
            y_interval,
            x_offset: 0.0,
            y_offset: 0.0,
            style: GridStyle::default(),
            formatter: None,
        }
    }

    /// Shift the grid by the given world distances.
    pub fn with_offsets(mut self, x_offset: f64, y_offset: f64) -> Self {
        self.x_offset = x_offset;
        self.y_offset = y_offset;
        self
    }

    pub fn with_style(mut self, style: GridStyle) -> Self {
        self.style = style;
        self
    }

    /// Provide a custom annotation label formatter.
    pub fn with_formatter(mut self, formatter: LabelFormatter) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// Build the overlay; fails on non-positive intervals or non-finite offsets.
    pub fn build(self) -> Result<GridOverlay, GridError> {
        validate_intervals(self.x_interval, self.y_interval)?;
        validate_offsets(self.x_offset, self.y_offset)?;
        Ok(GridOverlay {
            x_interval: self.x_interval,
            y_interval: self.y_interval,
            x_offset: self.x_offset,
            y_offset: self.y_offset,
            style: self.style,
            formatter: self.formatter.unwrap_or_else(|| Arc::new(default_formatter)),
            invalid: None,
            dirty: true,
            unreported_clear: false,
            lines: Vec::new(),
            annotations: Vec::new(),
            version: 0,
        })
    }
}

/// A coordinate grid clipped to the visible extent, with annotations where
/// grid lines cross the viewport borders.
///
/// The grid is fully regenerated on every [`recompute`](Self::recompute):
/// annotation placement needs fresh border intersections even after a pure
/// pan, so it does not go through a polyline cache.
#[derive(Clone)]
pub struct GridOverlay {
    x_interval: f64,
    y_interval: f64,
    x_offset: f64,
    y_offset: f64,
    style: GridStyle,
    formatter: LabelFormatter,
    /// Set while the last parameter change was rejected.
    invalid: Option<GridError>,
    /// Parameters changed since the last recompute.
    dirty: bool,
    /// Output was dropped outside of `recompute` and nobody was told yet.
    unreported_clear: bool,
    lines: Vec<Polyline>,
    annotations: Vec<GridAnnotation>,
    version: u64,
}

impl GridOverlay {
    pub fn set_intervals(&mut self, x_interval: f64, y_interval: f64) -> Result<(), GridError> {
        if let Err(e) = validate_intervals(x_interval, y_interval) {
            return Err(self.reject(e));
        }
        if matches!(self.invalid, Some(GridError::InvalidInterval { .. })) {
            self.invalid = None;
        }
        self.x_interval = x_interval;
        self.y_interval = y_interval;
        self.dirty = true;
        Ok(())
    }

    pub fn set_offsets(&mut self, x_offset: f64, y_offset: f64) -> Result<(), GridError> {
        if let Err(e) = validate_offsets(x_offset, y_offset) {
            return Err(self.reject(e));
        }
        if matches!(self.invalid, Some(GridError::NonFiniteOffset { .. })) {
            self.invalid = None;
        }
        self.x_offset = x_offset;
        self.y_offset = y_offset;
        self.dirty = true;
        Ok(())
    }

    fn reject(&mut self, error: GridError) -> GridError {
        warn!(%error, "rejected grid parameters");
        self.invalid = Some(error);
        self.unreported_clear |= self.clear();
        self.dirty = true;
        error
    }

    /// Restyle the grid; marks it dirty so the next sync reports it.
    pub fn set_style(&mut self, style: GridStyle) {
        if self.style != style {
            self.style = style;
            self.dirty = true;
        }
    }

    pub fn set_formatter(&mut self, formatter: LabelFormatter) {
        self.formatter = formatter;
        self.dirty = true;
    }

    /// Whether parameters changed since the last [`recompute`](Self::recompute).
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Regenerate lines and annotations for `extent` as seen through `context`.
    ///
    /// Returns whether consumers should redraw: always once the density guard
    /// is passed, otherwise only if previous output was cleared.
    pub fn recompute(&mut self, context: &ProjectionContext, extent: &Extent) -> bool {
        self.dirty = false;
        let unreported = std::mem::take(&mut self.unreported_clear);
        if self.invalid.is_some() || !extent.is_finite() {
            return self.clear() || unreported;
        }

        let scale = context.scale();
        if self.x_interval / scale < GRID_MIN_SPACING_PX
            || self.y_interval / scale < GRID_MIN_SPACING_PX
        {
            debug!(
                x_interval = self.x_interval,
                y_interval = self.y_interval,
                scale,
                "grid too dense, hiding"
            );
            return self.clear() || unreported;
        }

        let DVec2 { x: w, y: h } = context.viewport_size();
        let top = (DVec2::ZERO, DVec2::new(w, 0.0));
        let bottom = (DVec2::new(0.0, h), DVec2::new(w, h));
        let left = (DVec2::ZERO, DVec2::new(0.0, h));
        let right = (DVec2::new(w, 0.0), DVec2::new(w, h));

        let mut lines = Vec::new();
        let mut annotations = Vec::new();

        for x in grid_positions(extent.x_min, extent.x_max, self.x_interval, self.x_offset) {
            let p1 = context.project(DVec2::new(x, extent.y_min));
            let p2 = context.project(DVec2::new(x, extent.y_max));
            for (edge, border) in [(Edge::Top, top), (Edge::Bottom, bottom)] {
                if let Some(anchor) = segment_intersection((p1, p2), border) {
                    annotations.push(self.annotation(edge, anchor, x));
                }
            }
            lines.push(vec![p1, p2]);
        }

        for y in grid_positions(extent.y_min, extent.y_max, self.y_interval, self.y_offset) {
            let p1 = context.project(DVec2::new(extent.x_min, y));
            let p2 = context.project(DVec2::new(extent.x_max, y));
            for (edge, border) in [(Edge::Left, left), (Edge::Right, right)] {
                if let Some(anchor) = segment_intersection((p1, p2), border) {
                    annotations.push(self.annotation(edge, anchor, y));
                }
            }
            lines.push(vec![p1, p2]);
        }

        debug!(
            lines = lines.len(),
            annotations = annotations.len(),
            "grid recomputed"
        );
        self.lines = lines;
        self.annotations = annotations;
        self.version = self.version.wrapping_add(1);
        true
    }

    fn annotation(&self, edge: Edge, anchor: ScreenPoint, value: f64) -> GridAnnotation {
        GridAnnotation {
            edge,
            anchor,
            label: (self.formatter)(value),
            value,
        }
    }

    /// Drop all lines and annotations. Returns whether there was anything to drop.
    pub fn clear(&mut self) -> bool {
        let had_output = !self.lines.is_empty() || !self.annotations.is_empty();
        self.lines.clear();
        self.annotations.clear();
        if had_output {
            self.version = self.version.wrapping_add(1);
        }
        had_output
    }

    pub fn lines(&self) -> &[Polyline] {
        &self.lines
    }

    pub fn annotations(&self) -> &[GridAnnotation] {
        &self.annotations
    }

    pub fn intervals(&self) -> (f64, f64) {
        (self.x_interval, self.y_interval)
    }

    pub fn offsets(&self) -> (f64, f64) {
        (self.x_offset, self.y_offset)
    }

    pub fn style(&self) -> &GridStyle {
        &self.style
    }

    /// Bumped every time lines or annotations are replaced.
    pub fn version(&self) -> u64 {
        self.version
    }
}

impl fmt::Debug for GridOverlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridOverlay")
            .field("x_interval", &self.x_interval)
            .field("y_interval", &self.y_interval)
            .field("x_offset", &self.x_offset)
            .field("y_offset", &self.y_offset)
            .field("invalid", &self.invalid)
            .field("dirty", &self.dirty)
            .field("unreported_clear", &self.unreported_clear)
            .field("lines", &self.lines.len())
            .field("annotations", &self.annotations.len())
            .field("version", &self.version)
            .finish()
    }
}

fn validate_intervals(x: f64, y: f64) -> Result<(), GridError> {
    if x.is_finite() && y.is_finite() && x > 0.0 && y > 0.0 {
        Ok(())
    } else {
        Err(GridError::InvalidInterval { x, y })
    }
}

fn validate_offsets(x: f64, y: f64) -> Result<(), GridError> {
    if x.is_finite() && y.is_finite() {
        Ok(())
    } else {
        Err(GridError::NonFiniteOffset { x, y })
    }
}

/// World positions of grid lines between `min` and `max`.
///
/// The first line sits at `min - (min mod interval) + offset`, where `mod`
/// keeps the sign of `min`.
fn grid_positions(min: f64, max: f64, interval: f64, offset: f64) -> impl Iterator<Item = f64> {
    let start = min - min % interval + offset;
    (0..GRID_MAX_LINES)
        .map(move |i| start + i as f64 * interval)
        .take_while(move |&v| v <= max)
}

/// Intersection point of two bounded segments, if any.
fn segment_intersection(a: (DVec2, DVec2), b: (DVec2, DVec2)) -> Option<DVec2> {
    let r = a.1 - a.0;
    let s = b.1 - b.0;
    let denom = r.perp_dot(s);
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }
    let d = b.0 - a.0;
    let t = d.perp_dot(s) / denom;
    let u = d.perp_dot(r) / denom;
    let range = -GRID_EPSILON..=1.0 + GRID_EPSILON;
    (range.contains(&t) && range.contains(&u)).then(|| a.0 + r * t)
}
