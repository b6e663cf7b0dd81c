//! Line-list vertex packing for GPU upload.

use crate::Color;
use crate::geometry::Polyline;

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
/// One end of a line segment in screen pixels.
pub struct LineVertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

/// Append one vertex pair per polyline segment to `out`.
///
/// With `closed`, rings that do not already end on their first point get a
/// closing segment. Single-point polylines produce nothing. Returns the
/// number of vertices appended.
pub fn push_line_list(
    out: &mut Vec<LineVertex>,
    polylines: &[Polyline],
    closed: bool,
    color: Color,
) -> usize {
    let color = [color.r, color.g, color.b, color.a];
    let start = out.len();
    for polyline in polylines {
        let vertex = |i: usize| LineVertex {
            position: [polyline[i].x as f32, polyline[i].y as f32],
            color,
        };
        for i in 1..polyline.len() {
            out.extend_from_slice(&[vertex(i - 1), vertex(i)]);
        }
        if closed && polyline.len() >= 3 && polyline.first() != polyline.last() {
            out.extend_from_slice(&[vertex(polyline.len() - 1), vertex(0)]);
        }
    }
    out.len() - start
}

/// Raw bytes of a vertex slice, ready for a vertex buffer.
pub fn as_bytes(vertices: &[LineVertex]) -> &[u8] {
    bytemuck::cast_slice(vertices)
}
