use crate::gl::GlContext;
use crate::types::PixelRegion;

/// Reads `region` from the current framebuffer as RGBA8 pixels, bottom row
/// first (GL window coordinates).
pub fn read_region<G: GlContext>(gl: &G, region: PixelRegion) -> Vec<[u8; 4]> {
    let mut buffer = vec![0u8; region.pixel_count() * 4];
    if buffer.is_empty() {
        return Vec::new();
    }
    gl.read_pixels_rgba(region.x, region.y, region.width, region.height, &mut buffer);
    buffer
        .chunks_exact(4)
        .map(|px| [px[0], px[1], px[2], px[3]])
        .collect()
}

/// `"r, g, b, a"` per pixel, pixels separated by `" | "`; `none` when empty.
pub fn format_pixels(pixels: &[[u8; 4]]) -> String {
    if pixels.is_empty() {
        return "none".to_string();
    }
    pixels
        .iter()
        .map(|[r, g, b, a]| format!("{r}, {g}, {b}, {a}"))
        .collect::<Vec<_>>()
        .join(" | ")
}

/// [`read_region`] and log the result.
pub fn log_region<G: GlContext>(gl: &G, region: PixelRegion) -> Vec<[u8; 4]> {
    let pixels = read_region(gl, region);
    tracing::info!(
        x = region.x,
        y = region.y,
        width = region.width,
        height = region.height,
        pixels = %format_pixels(&pixels),
        "pixel readback"
    );
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::{GlCall, HeadlessContext};
    use crate::types::GlApiVersion;

    #[test]
    fn single_pixel_is_one_tuple() {
        let gl = HeadlessContext::new(GlApiVersion::Gles3);
        gl.viewport(0, 0, 4, 4);
        gl.paint(2, 3, [255, 128, 0, 255]);
        let pixels = read_region(&gl, PixelRegion::point(2, 3));
        assert_eq!(pixels, vec![[255, 128, 0, 255]]);
        assert_eq!(format_pixels(&pixels), "255, 128, 0, 255");
    }

    #[test]
    fn region_reads_rows_in_order() {
        let gl = HeadlessContext::new(GlApiVersion::Gles3);
        gl.viewport(0, 0, 4, 4);
        gl.paint(0, 0, [1, 1, 1, 1]);
        gl.paint(1, 0, [2, 2, 2, 2]);
        gl.paint(0, 1, [3, 3, 3, 3]);
        gl.paint(1, 1, [4, 4, 4, 4]);
        let pixels = log_region(&gl, PixelRegion::point(0, 0).with_size(2, 2));
        assert_eq!(pixels, vec![[1; 4], [2; 4], [3; 4], [4; 4]]);
        assert_eq!(
            format_pixels(&pixels),
            "1, 1, 1, 1 | 2, 2, 2, 2 | 3, 3, 3, 3 | 4, 4, 4, 4"
        );
    }

    #[test]
    fn empty_region_reads_nothing() {
        let gl = HeadlessContext::new(GlApiVersion::Gles3);
        let pixels = read_region(&gl, PixelRegion::point(0, 0).with_size(0, 3));
        assert!(pixels.is_empty());
        assert_eq!(format_pixels(&pixels), "none");
        assert!(!gl
            .calls()
            .iter()
            .any(|call| matches!(call, GlCall::ReadPixels { .. })));
    }

    #[test]
    fn unrendered_framebuffer_reads_transparent_black() {
        let gl = HeadlessContext::new(GlApiVersion::Gles2);
        gl.viewport(0, 0, 2, 2);
        assert_eq!(read_region(&gl, PixelRegion::point(1, 1)), vec![[0, 0, 0, 0]]);
    }
}
