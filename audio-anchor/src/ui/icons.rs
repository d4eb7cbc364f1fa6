//! Icon generation for the status item.
//!
//! Draws a simple anchor glyph as RGBA pixels so no image assets ship with
//! the binary.

/// Icon size in pixels.
pub const ICON_SIZE: u32 = 32;

/// Generate the anchor icon. `dimmed` draws it at reduced opacity.
pub fn generate_anchor_icon(dimmed: bool) -> Vec<u8> {
    let size = ICON_SIZE as usize;
    let mut rgba = vec![0u8; size * size * 4];
    let alpha = if dimmed { 96u8 } else { 255u8 };

    let center = size as f32 / 2.0;

    let mut plot = |x: usize, y: usize, coverage: f32| {
        if x >= size || y >= size {
            return;
        }
        let idx = (y * size + x) * 4;
        let a = (coverage.clamp(0.0, 1.0) * alpha as f32) as u8;
        if a > rgba[idx + 3] {
            rgba[idx] = 0;
            rgba[idx + 1] = 0;
            rgba[idx + 2] = 0;
            rgba[idx + 3] = a;
        }
    };

    for y in 0..size {
        for x in 0..size {
            let fx = x as f32 + 0.5;
            let fy = y as f32 + 0.5;

            // Ring at the top
            let dx = fx - center;
            let dy = fy - 6.0;
            let ring = ((dx * dx + dy * dy).sqrt() - 3.5).abs();
            if ring < 1.5 {
                plot(x, y, 1.5 - ring);
            }

            // Shank
            if (fx - center).abs() < 1.5 && fy > 9.0 && fy < 27.0 {
                plot(x, y, 1.0);
            }

            // Stock
            if (fy - 13.0).abs() < 1.2 && (fx - center).abs() < 7.0 {
                plot(x, y, 1.0);
            }

            // Arms: lower half of a circle around the shank
            let dy = fy - 17.0;
            if dy > 0.0 {
                let arc = ((dx * dx + dy * dy).sqrt() - 10.0).abs();
                if arc < 1.5 {
                    plot(x, y, 1.5 - arc);
                }
            }
        }
    }

    rgba
}

#[cfg(test)]
mod tests {
    use super::*;

    fn max_alpha(rgba: &[u8]) -> u8 {
        rgba.chunks(4).map(|px| px[3]).max().unwrap_or(0)
    }

    #[test]
    fn test_icon_dimensions() {
        let rgba = generate_anchor_icon(false);
        assert_eq!(rgba.len(), (ICON_SIZE * ICON_SIZE * 4) as usize);
        assert_eq!(max_alpha(&rgba), 255);
    }

    #[test]
    fn test_dimmed_icon_is_translucent() {
        let rgba = generate_anchor_icon(true);
        assert_eq!(max_alpha(&rgba), 96);
    }
}
