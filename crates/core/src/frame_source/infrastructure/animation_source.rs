use crate::frame_source::domain::draw_surface::{DrawSurface, Rect};
use crate::frame_source::domain::frame_source::{FrameObserver, SurfaceSource};
use crate::shared::color_space::Color;

const BACKGROUND: Color = Color::rgb(0.0, 0.0, 1.0);
const ELLIPSE: Color = Color::rgba(1.0, 0.0, 0.0, 0.5);

/// Fraction of the frame height above the ellipse.
const ELLIPSE_TOP: f64 = 0.28;

/// Demo producer: a translucent red ellipse growing over a blue background.
///
/// Frame `n` (counting from 1) draws the ellipse in an `n x n` square whose
/// left edge sits `n` pixels in, so it drifts right as it grows.
pub struct AnimationSource {
    frames: u64,
    drawn: u64,
}

impl AnimationSource {
    pub fn new(frames: u64) -> Self {
        Self { frames, drawn: 0 }
    }

    pub fn frames_drawn(&self) -> u64 {
        self.drawn
    }
}

impl SurfaceSource for AnimationSource {
    fn fill_surface(&mut self, surface: &mut DrawSurface) -> bool {
        if self.drawn >= self.frames {
            return false;
        }
        self.drawn += 1;

        let step = self.drawn as f64;
        let top = surface.size().height as f64 * ELLIPSE_TOP;

        surface.clear(BACKGROUND);
        surface.set_fill_color(ELLIPSE);
        surface.fill_ellipse_in_rect(Rect::new(step, top, step, step));
        true
    }
}

impl FrameObserver for AnimationSource {
    fn on_failure(&mut self, reason: &str) {
        log::error!("Animation encode failed after {} frames: {reason}", self.drawn);
    }

    fn on_frames_exhausted(&mut self) {
        log::info!("All {} animation frames added", self.drawn);
    }

    fn on_encoding_finished(&mut self) {
        log::info!("Animation written to disk");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::color_space::ColorSpace;
    use crate::shared::frame_size::FrameSize;
    use std::sync::Arc;

    fn surface() -> DrawSurface {
        DrawSurface::new(FrameSize::new(64, 64), Arc::new(ColorSpace::device_rgb()))
    }

    #[test]
    fn test_draws_exactly_n_frames() {
        let mut source = AnimationSource::new(3);
        let mut s = surface();

        assert!(source.fill_surface(&mut s));
        assert!(source.fill_surface(&mut s));
        assert!(source.fill_surface(&mut s));
        assert!(!source.fill_surface(&mut s));
        assert!(!source.fill_surface(&mut s));
        assert_eq!(source.frames_drawn(), 3);
    }

    #[test]
    fn test_zero_frames_draws_nothing() {
        let mut source = AnimationSource::new(0);
        let mut s = surface();

        assert!(!source.fill_surface(&mut s));
        assert_eq!(s.pixel_buffer().pixel(0, 0), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_background_is_opaque_blue() {
        let mut source = AnimationSource::new(1);
        let mut s = surface();
        source.fill_surface(&mut s);

        assert_eq!(s.pixel_buffer().pixel(63, 63), Some([255, 0, 0, 255]));
    }

    #[test]
    fn test_ellipse_blends_over_background() {
        let mut source = AnimationSource::new(30);
        let mut s = surface();
        for _ in 0..21 {
            source.fill_surface(&mut s);
        }

        // Frame 21: ellipse inside the square at (21, 17.92) with side 21.
        let [b, g, r, a] = s.pixel_buffer().pixel(31, 28).unwrap();
        assert_eq!(a, 255);
        assert_eq!(g, 0);
        assert!((120..=135).contains(&b), "blue {b}");
        assert!((120..=135).contains(&r), "red {r}");
    }

    #[test]
    fn test_ellipse_grows_each_frame() {
        let mut source = AnimationSource::new(40);
        let mut s = surface();
        let mut previous = 0;
        for _ in 0..20 {
            source.fill_surface(&mut s);
            let tinted = s
                .pixel_buffer()
                .data()
                .chunks_exact(4)
                .filter(|p| p[2] != 0)
                .count();
            assert!(tinted >= previous);
            previous = tinted;
        }
        assert!(previous > 200);
    }
}
