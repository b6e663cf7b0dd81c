use crate::Color;

/// Stroke styling for a geometry overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayStyle {
    /// Stroke color, also used (with its alpha) to fill polygons.
    pub color: Color,
    /// Stroke width in pixels.
    pub width: f32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            color: Color::from_rgb8(192, 57, 43),
            width: 2.0,
        }
    }
}

impl OverlayStyle {
    /// Set the stroke color.
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Set the stroke width in pixels.
    pub fn with_width(mut self, width: f32) -> Self {
        self.width = width.max(0.5);
        self
    }
}

/// Styling for a rubber band: the committed chain plus the vertex being edited.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RubberbandStyle {
    /// Color of the committed chain.
    pub color: Color,
    /// Color of the halo drawn beneath the committed chain.
    pub outline_color: Color,
    /// Line width of the committed chain in pixels.
    pub width: f32,
    /// Color of the current vertex and its guide segments.
    pub current_color: Color,
    /// Line width of the guide segments in pixels.
    pub current_width: f32,
}

impl Default for RubberbandStyle {
    fn default() -> Self {
        Self {
            color: Color::from_rgba8(192, 57, 43, 150.0 / 255.0),
            outline_color: Color::from_rgba8(255, 255, 255, 100.0 / 255.0),
            width: 2.0,
            current_color: Color::from_rgba8(192, 57, 43, 150.0 / 255.0),
            current_width: 2.0,
        }
    }
}

impl RubberbandStyle {
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_outline_color(mut self, color: Color) -> Self {
        self.outline_color = color;
        self
    }

    pub fn with_width(mut self, width: f32) -> Self {
        self.width = width.max(0.5);
        self
    }

    pub fn with_current_color(mut self, color: Color) -> Self {
        self.current_color = color;
        self
    }

    pub fn with_current_width(mut self, width: f32) -> Self {
        self.current_width = width.max(0.5);
        self
    }
}

/// Styling for grid lines and their annotations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridStyle {
    pub line_color: Color,
    /// Line width in pixels.
    pub line_width: f32,
    pub annotation_color: Color,
    /// Annotation text size in pixels.
    pub annotation_size: f32,
}

impl Default for GridStyle {
    fn default() -> Self {
        Self {
            line_color: Color::from_rgba(0.0, 0.0, 0.0, 0.45),
            line_width: 1.0,
            annotation_color: Color::BLACK,
            annotation_size: 12.0,
        }
    }
}

impl GridStyle {
    pub fn with_line_color(mut self, color: Color) -> Self {
        self.line_color = color;
        self
    }

    pub fn with_line_width(mut self, width: f32) -> Self {
        self.line_width = width.max(0.5);
        self
    }

    pub fn with_annotation_color(mut self, color: Color) -> Self {
        self.annotation_color = color;
        self
    }

    pub fn with_annotation_size(mut self, size: f32) -> Self {
        self.annotation_size = size.max(1.0);
        self
    }
}
