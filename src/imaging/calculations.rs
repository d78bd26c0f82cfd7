//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Calculate the size of an image shrunk to fit inside a bounding box.
///
/// This is the "thumbnail" contract: aspect ratio is preserved, the result
/// never exceeds `bound` in either dimension, and the image is never enlarged.
/// If the source already fits, its own dimensions come back unchanged.
/// Neither output dimension drops below 1.
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `bound` - Maximum allowed dimensions (width, height)
///
/// # Examples
/// ```
/// # use drawpro_server::imaging::calculate_fit_dimensions;
/// // 800x600 into 400x400 → width-limited, 400x300
/// assert_eq!(calculate_fit_dimensions((800, 600), (400, 400)), (400, 300));
///
/// // Already small enough → untouched
/// assert_eq!(calculate_fit_dimensions((100, 50), (400, 400)), (100, 50));
/// ```
pub fn calculate_fit_dimensions(source: (u32, u32), bound: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (max_w, max_h) = bound;

    if src_w == 0 || src_h == 0 || (src_w <= max_w && src_h <= max_h) {
        return source;
    }

    let src_aspect = src_w as f64 / src_h as f64;
    let box_aspect = max_w as f64 / max_h as f64;

    let (w, h) = if box_aspect >= src_aspect {
        // Box is relatively wider: height is the limiting edge
        let w = (max_h as f64 * src_aspect).round() as u32;
        (w, max_h)
    } else {
        // Box is relatively taller: width is the limiting edge
        let h = (max_w as f64 / src_aspect).round() as u32;
        (max_w, h)
    };

    (w.clamp(1, max_w.max(1)), h.clamp(1, max_h.max(1)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_landscape_into_square() {
        assert_eq!(calculate_fit_dimensions((800, 600), (400, 400)), (400, 300));
    }

    #[test]
    fn fit_portrait_into_square() {
        assert_eq!(calculate_fit_dimensions((600, 800), (400, 400)), (300, 400));
    }

    #[test]
    fn fit_limited_by_height() {
        // 100x50 (2:1) into 200x20 → height-limited: 40x20
        assert_eq!(calculate_fit_dimensions((100, 50), (200, 20)), (40, 20));
    }

    #[test]
    fn fit_limited_by_width() {
        // 100x50 (2:1) into 80x200 → width-limited: 80x40
        assert_eq!(calculate_fit_dimensions((100, 50), (80, 200)), (80, 40));
    }

    #[test]
    fn fit_never_enlarges() {
        assert_eq!(calculate_fit_dimensions((100, 50), (1000, 1000)), (100, 50));
        assert_eq!(calculate_fit_dimensions((100, 50), (100, 50)), (100, 50));
    }

    #[test]
    fn fit_one_dimension_already_within_bound() {
        // Height fits, width doesn't: 300x100 into 150x400 → 150x50
        assert_eq!(calculate_fit_dimensions((300, 100), (150, 400)), (150, 50));
    }

    #[test]
    fn fit_extreme_aspect_keeps_at_least_one_pixel() {
        assert_eq!(calculate_fit_dimensions((1000, 1), (10, 10)), (10, 1));
        assert_eq!(calculate_fit_dimensions((1, 1000), (10, 10)), (1, 10));
    }

    #[test]
    fn fit_always_within_bound() {
        let sources = [(1, 1), (7, 3), (640, 480), (1920, 1080), (33, 999), (4000, 4001)];
        let bounds = [(1, 1), (5, 9), (100, 100), (300, 20), (17, 640)];
        for &src in &sources {
            for &bound in &bounds {
                let (w, h) = calculate_fit_dimensions(src, bound);
                assert!(w <= bound.0 && h <= bound.1, "{src:?} in {bound:?} → {w}x{h}");
                assert!(w <= src.0 && h <= src.1, "{src:?} enlarged to {w}x{h}");
                assert!(w >= 1 && h >= 1);
            }
        }
    }
}
