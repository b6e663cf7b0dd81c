//! Overlay output as a flat list of drawing primitives.
//!
//! This is what the canvas renderer replays, in order. It is kept free of
//! any renderer so draw order and styling can be checked without a GPU.

use glam::DVec2;

use crate::Color;
use crate::geometry::{GeometryType, Polyline, ScreenPoint};
use crate::geometry_overlay::GeometryOverlay;
use crate::grid::{Edge, GridOverlay};
use crate::rubberband::RubberbandOverlay;
use crate::stack::{Overlay, OverlayStack};

/// Radius of point markers and of the current-vertex marker, in pixels.
pub const MARKER_RADIUS: f32 = 3.0;
/// Alpha factor applied to the stroke color when filling polygons.
pub const FILL_ALPHA: f32 = 0.25;
/// Gap between a grid annotation and the viewport border.
const ANNOTATION_MARGIN: f64 = 2.0;
/// Rough glyph advance relative to the text size, for right-aligned labels.
const GLYPH_ADVANCE: f64 = 0.6;

#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    /// An open polyline.
    Stroke {
        points: Polyline,
        color: Color,
        width: f32,
    },
    /// Closed rings filled with the even-odd rule, so inner rings cut holes.
    Fill { rings: Vec<Polyline>, color: Color },
    /// A filled disc, optionally outlined.
    Marker {
        center: ScreenPoint,
        radius: f32,
        color: Color,
        outline: Option<Color>,
    },
    /// Text whose top-left corner sits at `position`.
    Label {
        text: String,
        position: ScreenPoint,
        color: Color,
        size: f32,
    },
}

fn faded(color: Color) -> Color {
    Color {
        a: color.a * FILL_ALPHA,
        ..color
    }
}

/// Primitives for polylines of one geometry type.
fn polyline_primitives(
    polylines: &[Polyline],
    geometry_type: GeometryType,
    color: Color,
    width: f32,
    out: &mut Vec<Primitive>,
) {
    match geometry_type {
        GeometryType::Null => {}
        GeometryType::Point => {
            out.extend(polylines.iter().filter_map(|l| l.first()).map(|&center| {
                Primitive::Marker {
                    center,
                    radius: MARKER_RADIUS,
                    color,
                    outline: None,
                }
            }));
        }
        GeometryType::Line | GeometryType::Polygon => {
            if geometry_type == GeometryType::Polygon {
                let rings: Vec<Polyline> =
                    polylines.iter().filter(|r| r.len() >= 3).cloned().collect();
                if !rings.is_empty() {
                    out.push(Primitive::Fill {
                        rings,
                        color: faded(color),
                    });
                }
            }
            out.extend(polylines.iter().map(|points| Primitive::Stroke {
                points: points.clone(),
                color,
                width,
            }));
        }
    }
}

/// Grid lines, then one label per border crossing, kept inside `viewport`.
pub fn grid_primitives(grid: &GridOverlay, viewport: DVec2, out: &mut Vec<Primitive>) {
    let style = grid.style();
    out.extend(grid.lines().iter().map(|line| Primitive::Stroke {
        points: line.clone(),
        color: style.line_color,
        width: style.line_width,
    }));

    let size = f64::from(style.annotation_size);
    for annotation in grid.annotations() {
        let mut position = annotation.anchor;
        match annotation.edge {
            Edge::Top => position.y += ANNOTATION_MARGIN,
            Edge::Bottom => position.y -= size + ANNOTATION_MARGIN,
            Edge::Left => position.x += ANNOTATION_MARGIN,
            Edge::Right => {
                let width = annotation.label.chars().count() as f64 * size * GLYPH_ADVANCE;
                position.x -= width + ANNOTATION_MARGIN;
            }
        }
        out.push(Primitive::Label {
            text: annotation.label.clone(),
            position: position.clamp(DVec2::ZERO, viewport.max(DVec2::ZERO)),
            color: style.annotation_color,
            size: style.annotation_size,
        });
    }
}

pub fn geometry_primitives(overlay: &GeometryOverlay, out: &mut Vec<Primitive>) {
    let style = overlay.style();
    polyline_primitives(
        overlay.polylines(),
        overlay.polylines_type(),
        style.color,
        style.width,
        out,
    );
}

/// A halo under the committed chain, the chain itself, then the guide
/// segment and a marker on the vertex being edited.
pub fn rubberband_primitives(overlay: &RubberbandOverlay, out: &mut Vec<Primitive>) {
    let style = overlay.style();
    let polylines_type = overlay.polylines_type();

    if matches!(polylines_type, GeometryType::Line | GeometryType::Polygon) {
        out.extend(overlay.polylines().iter().map(|points| Primitive::Stroke {
            points: points.clone(),
            color: style.outline_color,
            width: style.width + 2.0,
        }));
    }
    polyline_primitives(
        overlay.polylines(),
        polylines_type,
        style.color,
        style.width,
        out,
    );

    let guide = overlay.current_segment();
    if guide.len() >= 2 {
        out.push(Primitive::Stroke {
            points: guide.to_vec(),
            color: style.current_color,
            width: style.current_width,
        });
    }
    if let Some(center) = overlay.current_point() {
        out.push(Primitive::Marker {
            center,
            radius: MARKER_RADIUS,
            color: style.current_color,
            outline: Some(style.outline_color),
        });
    }
}

/// Primitives for every overlay of the stack in draw order.
///
/// Empty until the stack has synced against a usable view.
pub fn build_scene(stack: &OverlayStack) -> Vec<Primitive> {
    let Some(context) = stack.context() else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for (_, overlay) in stack.iter() {
        match overlay {
            Overlay::Grid(grid) => grid_primitives(grid, context.viewport_size(), &mut out),
            Overlay::Geometry(geometry) => geometry_primitives(geometry, &mut out),
            Overlay::Rubberband(rubberband) => rubberband_primitives(rubberband, &mut out),
        }
    }
    out
}
