//! Stretched blits and rectangle strokes onto the output surface.

use rayon::prelude::*;
use reelsync_core::frame::BYTES_PER_PIXEL;
use reelsync_core::{FrameBuffer, Rect, Rgba};

/// Source-over blend of one pixel onto another.
#[inline]
fn blend_over(dst: &mut [u8], src: &[u8]) {
    let a = src[3] as u32;
    match a {
        255 => dst.copy_from_slice(src),
        0 => {}
        _ => {
            let inv = 255 - a;
            for c in 0..3 {
                dst[c] = ((src[c] as u32 * a + dst[c] as u32 * inv + 127) / 255) as u8;
            }
            dst[3] = (a + (dst[3] as u32 * inv + 127) / 255).min(255) as u8;
        }
    }
}

/// Pixel span `[start, end)` covered by `[lo, hi)` on an axis of `len` pixels.
fn span(lo: f32, hi: f32, len: u32) -> (usize, usize) {
    let start = lo.max(0.0).round() as usize;
    let end = (hi.min(len as f32).round().max(0.0) as usize).min(len as usize);
    (start.min(end), end)
}

/// Draw the `src_rect` region of `src` stretched to fill `dst_rect` of `dst`.
///
/// Nearest-neighbour sampling at pixel centres; source coordinates are
/// clamped to both `src_rect` and the source frame. Pixels outside `dst`
/// are skipped.
#[allow(clippy::needless_range_loop)]
pub fn draw_stretched(dst: &mut FrameBuffer, dst_rect: Rect, src: &FrameBuffer, src_rect: Rect) {
    if src.width == 0 || src.height == 0 || !dst_rect.is_finite() || !src_rect.is_finite() {
        return;
    }
    if dst_rect.width <= 0.0 || dst_rect.height <= 0.0 {
        return;
    }
    let (x0, x1) = span(dst_rect.x, dst_rect.right(), dst.width);
    let (y0, y1) = span(dst_rect.y, dst_rect.bottom(), dst.height);
    if x0 == x1 || y0 == y1 {
        return;
    }

    let sx_scale = src_rect.width / dst_rect.width;
    let sy_scale = src_rect.height / dst_rect.height;
    let max_sx = (src_rect.right().min(src.width as f32) - 1.0).max(0.0);
    let max_sy = (src_rect.bottom().min(src.height as f32) - 1.0).max(0.0);
    let min_sx = src_rect.x.max(0.0).min(max_sx);
    let min_sy = src_rect.y.max(0.0).min(max_sy);

    // Source column per destination column, computed once.
    let columns: Vec<usize> = (x0..x1)
        .map(|x| {
            let u = src_rect.x + (x as f32 + 0.5 - dst_rect.x) * sx_scale;
            u.floor().clamp(min_sx, max_sx) as usize
        })
        .collect();

    let stride = dst.stride();
    let src_stride = src.stride();
    let src_bytes = src.as_bytes();
    dst.as_bytes_mut()
        .par_chunks_mut(stride)
        .enumerate()
        .skip(y0)
        .take(y1 - y0)
        .for_each(|(y, row)| {
            let v = src_rect.y + (y as f32 + 0.5 - dst_rect.y) * sy_scale;
            let sy = v.floor().clamp(min_sy, max_sy) as usize;
            let src_row = &src_bytes[sy * src_stride..(sy + 1) * src_stride];
            for (i, sx) in columns.iter().enumerate() {
                let d = (x0 + i) * BYTES_PER_PIXEL;
                let s = sx * BYTES_PER_PIXEL;
                blend_over(
                    &mut row[d..d + BYTES_PER_PIXEL],
                    &src_row[s..s + BYTES_PER_PIXEL],
                );
            }
        });
}

/// Stroke the outline of `rect` with a line `line_width` pixels wide,
/// centred on the rectangle's edge.
pub fn stroke_rect(dst: &mut FrameBuffer, rect: Rect, line_width: f32, color: Rgba) {
    if !rect.is_finite() || line_width <= 0.0 {
        return;
    }
    let half = line_width / 2.0;
    let (ox0, ox1) = span(rect.x - half, rect.right() + half, dst.width);
    let (oy0, oy1) = span(rect.y - half, rect.bottom() + half, dst.height);
    let inner_x = (rect.x + half, rect.right() - half);
    let inner_y = (rect.y + half, rect.bottom() - half);

    for y in oy0..oy1 {
        let cy = y as f32 + 0.5;
        let inside_y = cy > inner_y.0 && cy < inner_y.1;
        for x in ox0..ox1 {
            let cx = x as f32 + 0.5;
            if inside_y && cx > inner_x.0 && cx < inner_x.1 {
                continue;
            }
            dst.set_pixel(x as u32, y as u32, color);
        }
    }
}
