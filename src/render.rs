//! Drawing overlay output into an iced canvas frame.
//!
//! Call [`draw_stack`] from a `canvas::Program::draw` after
//! [`OverlayStack::sync`](crate::OverlayStack::sync). Each overlay is turned
//! into [`Primitive`]s first and those are replayed onto the frame.

use glam::DVec2;
use iced::widget::canvas::{self, Frame, Path, Stroke};
use iced::{Pixels, Point};

use crate::geometry::ScreenPoint;
use crate::geometry_overlay::GeometryOverlay;
use crate::grid::GridOverlay;
use crate::rubberband::RubberbandOverlay;
use crate::scene::{self, Primitive};
use crate::stack::OverlayStack;

fn to_point(p: ScreenPoint) -> Point {
    Point::new(p.x as f32, p.y as f32)
}

fn polyline_path(points: &[ScreenPoint]) -> Path {
    Path::new(|builder| {
        let mut points = points.iter().copied().map(to_point);
        if let Some(first) = points.next() {
            builder.move_to(first);
            for p in points {
                builder.line_to(p);
            }
        }
    })
}

fn rings_path(rings: &[Vec<ScreenPoint>]) -> Path {
    Path::new(|builder| {
        for ring in rings {
            let mut points = ring.iter().copied().map(to_point);
            if let Some(first) = points.next() {
                builder.move_to(first);
                for p in points {
                    builder.line_to(p);
                }
                builder.close();
            }
        }
    })
}

fn fill_style(color: iced::Color) -> canvas::Fill {
    canvas::Fill {
        style: canvas::Style::Solid(color),
        rule: canvas::fill::Rule::EvenOdd,
    }
}

fn label_text(text: &str, position: ScreenPoint, color: iced::Color, size: f32) -> canvas::Text {
    canvas::Text {
        content: text.to_owned(),
        position: to_point(position),
        color,
        size: Pixels(size),
        ..canvas::Text::default()
    }
}

/// Replay one primitive onto `frame`.
pub fn draw_primitive(frame: &mut Frame, primitive: &Primitive) {
    match primitive {
        Primitive::Stroke {
            points,
            color,
            width,
        } => {
            frame.stroke(
                &polyline_path(points),
                Stroke::default().with_color(*color).with_width(*width),
            );
        }
        Primitive::Fill { rings, color } => frame.fill(&rings_path(rings), fill_style(*color)),
        Primitive::Marker {
            center,
            radius,
            color,
            outline,
        } => {
            let marker = Path::circle(to_point(*center), *radius);
            frame.fill(&marker, *color);
            if let Some(outline) = outline {
                frame.stroke(
                    &marker,
                    Stroke::default().with_color(*outline).with_width(1.0),
                );
            }
        }
        Primitive::Label {
            text,
            position,
            color,
            size,
        } => frame.fill_text(label_text(text, *position, *color, *size)),
    }
}

fn replay(frame: &mut Frame, primitives: &[Primitive]) {
    for primitive in primitives {
        draw_primitive(frame, primitive);
    }
}

pub fn draw_grid(frame: &mut Frame, grid: &GridOverlay) {
    let size = frame.size();
    let mut out = Vec::new();
    scene::grid_primitives(
        grid,
        DVec2::new(f64::from(size.width), f64::from(size.height)),
        &mut out,
    );
    replay(frame, &out);
}

pub fn draw_geometry(frame: &mut Frame, overlay: &GeometryOverlay) {
    let mut out = Vec::new();
    scene::geometry_primitives(overlay, &mut out);
    replay(frame, &out);
}

pub fn draw_rubberband(frame: &mut Frame, overlay: &RubberbandOverlay) {
    let mut out = Vec::new();
    scene::rubberband_primitives(overlay, &mut out);
    replay(frame, &out);
}

/// Draw every overlay of the stack in draw order.
pub fn draw_stack(frame: &mut Frame, stack: &OverlayStack) {
    replay(frame, &scene::build_scene(stack));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Color;

    #[test]
    fn labels_keep_text_position_and_size() {
        let text = label_text("2'600'000", DVec2::new(12.5, 3.0), Color::BLACK, 12.0);
        assert_eq!(text.content, "2'600'000");
        assert_eq!(text.position, Point::new(12.5, 3.0));
        assert_eq!(text.size, Pixels(12.0));
        assert_eq!(text.color, Color::BLACK);
    }

    #[test]
    fn fills_use_even_odd_rule() {
        let fill = fill_style(Color::WHITE);
        assert!(matches!(fill.rule, canvas::fill::Rule::EvenOdd));
        assert!(matches!(fill.style, canvas::Style::Solid(c) if c == Color::WHITE));
    }

    #[test]
    fn paths_build_from_degenerate_input() {
        let _ = polyline_path(&[]);
        let _ = polyline_path(&[DVec2::ONE]);
        let _ = rings_path(&[Vec::new(), vec![DVec2::ZERO, DVec2::X, DVec2::ONE]]);
    }
}
