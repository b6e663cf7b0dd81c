use glam::DVec2;

/// A position in the map's working coordinate reference system.
pub type WorldPoint = DVec2;

/// A pixel position relative to the viewport's top-left corner (y grows downward).
pub type ScreenPoint = DVec2;

/// An ordered sequence of screen points.
///
/// Whether a polyline is open or an implicitly closed ring depends on the
/// [`GeometryType`] of the overlay that produced it.
pub type Polyline = Vec<ScreenPoint>;

/// Geometry type tag carried by overlay output.
///
/// Determines ring closing and fill-vs-stroke semantics for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum GeometryType {
    /// Nothing to render.
    #[default]
    Null,
    /// One or more isolated points.
    Point,
    /// One or more open vertex paths.
    Line,
    /// One or more closed rings.
    Polygon,
}

impl GeometryType {
    /// Whether polylines of this type are closed rings.
    pub fn closes_rings(self) -> bool {
        matches!(self, Self::Polygon)
    }

    /// Minimum vertex count for a part of this type to be drawable.
    pub(crate) fn min_part_len(self) -> usize {
        match self {
            Self::Null => usize::MAX,
            Self::Point => 1,
            Self::Line => 2,
            Self::Polygon => 3,
        }
    }
}

/// An axis-aligned rectangle in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl Extent {
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Smallest extent containing every point, or `None` for an empty iterator.
    pub fn from_points(points: impl IntoIterator<Item = WorldPoint>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let (min, max) = points.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Self::new(min.x, min.y, max.x, max.y))
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    pub fn center(&self) -> WorldPoint {
        DVec2::new(
            (self.x_min + self.x_max) * 0.5,
            (self.y_min + self.y_max) * 0.5,
        )
    }

    pub fn contains(&self, p: WorldPoint) -> bool {
        p.x >= self.x_min && p.x <= self.x_max && p.y >= self.y_min && p.y <= self.y_max
    }

    pub fn union(&self, other: &Extent) -> Extent {
        Extent::new(
            self.x_min.min(other.x_min),
            self.y_min.min(other.y_min),
            self.x_max.max(other.x_max),
            self.y_max.max(other.y_max),
        )
    }

    pub fn is_finite(&self) -> bool {
        self.x_min.is_finite()
            && self.y_min.is_finite()
            && self.x_max.is_finite()
            && self.y_max.is_finite()
    }
}

/// A static vector geometry made of zero or more parts.
///
/// For [`GeometryType::Point`] each part holds a single point, for
/// [`GeometryType::Line`] each part is a vertex path and for
/// [`GeometryType::Polygon`] each part is a ring (exterior rings and holes
/// alike, in the order they were added).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Geometry {
    geometry_type: GeometryType,
    parts: Vec<Vec<WorldPoint>>,
}

impl Geometry {
    /// An empty geometry with a [`GeometryType::Null`] tag.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn point(p: WorldPoint) -> Self {
        Self::multi_point([p])
    }

    pub fn multi_point(points: impl IntoIterator<Item = WorldPoint>) -> Self {
        Self::from_parts(GeometryType::Point, points.into_iter().map(|p| vec![p]))
    }

    pub fn line(vertices: Vec<WorldPoint>) -> Self {
        Self::from_parts(GeometryType::Line, [vertices])
    }

    pub fn multi_line(lines: impl IntoIterator<Item = Vec<WorldPoint>>) -> Self {
        Self::from_parts(GeometryType::Line, lines)
    }

    /// A polygon from its exterior ring followed by any interior rings.
    pub fn polygon(rings: impl IntoIterator<Item = Vec<WorldPoint>>) -> Self {
        Self::from_parts(GeometryType::Polygon, rings)
    }

    /// Build a geometry of the given type. Empty parts are dropped, and a
    /// geometry left without parts is tagged [`GeometryType::Null`].
    pub fn from_parts(
        geometry_type: GeometryType,
        parts: impl IntoIterator<Item = Vec<WorldPoint>>,
    ) -> Self {
        let parts: Vec<_> = if geometry_type == GeometryType::Null {
            Vec::new()
        } else {
            parts.into_iter().filter(|p| !p.is_empty()).collect()
        };
        let geometry_type = if parts.is_empty() {
            GeometryType::Null
        } else {
            geometry_type
        };
        Self {
            geometry_type,
            parts,
        }
    }

    pub fn geometry_type(&self) -> GeometryType {
        self.geometry_type
    }

    pub fn parts(&self) -> &[Vec<WorldPoint>] {
        &self.parts
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.parts.iter().map(Vec::len).sum()
    }

    pub fn extent(&self) -> Option<Extent> {
        Extent::from_points(self.parts.iter().flatten().copied())
    }
}

/// Close a ring by repeating its first point if the last one differs.
pub(crate) fn close_ring<T: Copy + PartialEq>(ring: &mut Vec<T>) {
    if let (Some(&first), Some(&last)) = (ring.first(), ring.last())
        && first != last
    {
        ring.push(first);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_without_parts_is_null() {
        let g = Geometry::polygon(Vec::<Vec<WorldPoint>>::new());
        assert_eq!(g.geometry_type(), GeometryType::Null);
        assert!(g.is_empty());

        let g = Geometry::line(Vec::new());
        assert_eq!(g.geometry_type(), GeometryType::Null);
    }

    #[test]
    fn close_ring_repeats_first_vertex_once() {
        let mut ring = vec![DVec2::ZERO, DVec2::X, DVec2::ONE];
        close_ring(&mut ring);
        assert_eq!(ring.len(), 4);
        assert_eq!(ring.first(), ring.last());

        close_ring(&mut ring);
        assert_eq!(ring.len(), 4);
    }

    #[test]
    fn extent_covers_every_part() {
        let g = Geometry::multi_line([
            vec![DVec2::new(-1.0, 2.0), DVec2::new(3.0, 4.0)],
            vec![DVec2::new(10.0, -5.0)],
        ]);
        assert_eq!(g.extent(), Some(Extent::new(-1.0, -5.0, 10.0, 4.0)));
        assert_eq!(g.vertex_count(), 3);
    }
}
