use std::fmt;

/// Pixel dimensions of every frame in a stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// True when both dimensions are no larger than `limit`'s.
    pub fn fits_within(&self, limit: FrameSize) -> bool {
        self.width <= limit.width && self.height <= limit.height
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::zero_width(FrameSize::new(0, 720), true)]
    #[case::zero_height(FrameSize::new(1280, 0), true)]
    #[case::regular(FrameSize::new(1280, 720), false)]
    fn test_is_empty(#[case] size: FrameSize, #[case] expected: bool) {
        assert_eq!(size.is_empty(), expected);
    }

    #[test]
    fn test_pixel_count() {
        assert_eq!(FrameSize::new(4, 3).pixel_count(), 12);
    }

    #[rstest]
    #[case::smaller(FrameSize::new(1280, 720), true)]
    #[case::equal(FrameSize::new(1920, 1080), true)]
    #[case::too_wide(FrameSize::new(1922, 1080), false)]
    #[case::too_tall(FrameSize::new(1920, 1082), false)]
    fn test_fits_within(#[case] size: FrameSize, #[case] expected: bool) {
        assert_eq!(size.fits_within(FrameSize::new(1920, 1080)), expected);
    }

    #[test]
    fn test_display() {
        assert_eq!(FrameSize::new(1280, 720).to_string(), "1280x720");
    }
}
