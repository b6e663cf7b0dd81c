//! Map-synchronized vector overlays for Iced.
//!
//! - Projects world-coordinate geometry into screen polylines for a panning,
//!   zooming, rotating map view
//! - Shifts cached polylines by one screen delta while only panning
//! - Coordinate grid with edge annotations, finished geometries and live
//!   "rubber band" vertex chains, all aligned on one per-frame snapshot
//!
//! Quick start:
//!
//! ```no_run
//! use glam::DVec2;
//! use iced_map_overlay::{Extent, Geometry, GeometryOverlay, GridConfig, MapView, OverlayStack};
//!
//! let mut view = MapView::fitting(Extent::new(0.0, 0.0, 1000.0, 800.0), DVec2::new(640.0, 480.0));
//! let mut stack = OverlayStack::new();
//! stack.watch(&mut view);
//! stack.add(GridConfig::new(100.0, 100.0).build().unwrap());
//! stack.add(GeometryOverlay::new(Geometry::line(vec![
//!     DVec2::new(100.0, 100.0),
//!     DVec2::new(400.0, 300.0),
//! ])));
//!
//! view.pan_pixels(DVec2::new(12.0, -4.0));
//! for id in stack.sync_if_needed(&view) {
//!     println!("{id} needs a redraw");
//! }
//! ```
pub mod cache;
pub mod geometry;
pub mod geometry_overlay;
pub mod grid;
pub mod labels;
pub mod map_view;
pub mod projection;
#[cfg(feature = "canvas")]
pub mod render;
pub mod rubberband;
pub mod scene;
pub mod signal;
pub mod stack;
pub mod style;
pub mod vertex_model;
pub mod vertices;

// Iced re-exports.
pub use iced::Color;

// Re-exports of public types.
pub use cache::{CacheAnchor, ScreenPolylineCache};
pub use geometry::{Extent, Geometry, GeometryType, Polyline, ScreenPoint, WorldPoint};
pub use geometry_overlay::GeometryOverlay;
pub use grid::{Edge, GridAnnotation, GridConfig, GridError, GridOverlay};
pub use labels::{LabelFormatter, default_formatter, grouped_formatter};
pub use map_view::{MapView, ViewChange};
pub use projection::{ProjectionContext, ProjectionError, ViewStateProvider};
pub use rubberband::RubberbandOverlay;
pub use scene::{Primitive, build_scene};
pub use signal::{ConnectionId, Signal};
pub use stack::{Overlay, OverlayId, OverlayStack};
pub use style::{GridStyle, OverlayStyle, RubberbandStyle};
pub use vertex_model::{VertexChain, VertexModel, VertexModelError};
pub use vertices::LineVertex;
