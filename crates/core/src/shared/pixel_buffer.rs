use ndarray::{ArrayView3, ArrayViewMut3, Axis};

use super::frame_size::FrameSize;

/// Index into an RGBA pixel for each BGRA channel.
const RGBA_CHANNEL_FOR_BGRA: [usize; 4] = [2, 1, 0, 3];

/// Byte layout of a [`PixelBuffer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8-bit blue, green, red, alpha. The only layout the encoder accepts;
    /// feeding it RGBA costs a CPU-side swizzle per frame.
    Bgra8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Bgra8 => 4,
        }
    }
}

/// A reusable block of frame memory in BGRA order, row-major, no padding.
///
/// The sequencer allocates one per stream and hands it to the frame source
/// for every request, so sources should overwrite every pixel they care
/// about rather than assume a cleared buffer.
#[derive(Clone, Debug)]
pub struct PixelBuffer {
    data: Vec<u8>,
    size: FrameSize,
}

impl PixelBuffer {
    pub fn new(size: FrameSize) -> Self {
        Self {
            data: vec![0u8; size.pixel_count() * PixelFormat::Bgra8.bytes_per_pixel()],
            size,
        }
    }

    pub fn from_data(data: Vec<u8>, size: FrameSize) -> Self {
        debug_assert_eq!(
            data.len(),
            size.pixel_count() * PixelFormat::Bgra8.bytes_per_pixel(),
            "data length must equal width * height * 4"
        );
        Self { data, size }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn size(&self) -> FrameSize {
        self.size
    }

    pub fn width(&self) -> u32 {
        self.size.width
    }

    pub fn height(&self) -> u32 {
        self.size.height
    }

    pub fn pixel_format(&self) -> PixelFormat {
        PixelFormat::Bgra8
    }

    pub fn bytes_per_row(&self) -> usize {
        self.size.width as usize * PixelFormat::Bgra8.bytes_per_pixel()
    }

    /// Sets every pixel to `bgra`.
    pub fn fill(&mut self, bgra: [u8; 4]) {
        for pixel in self.data.chunks_exact_mut(4) {
            pixel.copy_from_slice(&bgra);
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let offset = self.offset(x, y)?;
        let mut bgra = [0u8; 4];
        bgra.copy_from_slice(&self.data[offset..offset + 4]);
        Some(bgra)
    }

    /// Writes one pixel. Out-of-bounds coordinates are ignored.
    pub fn put_pixel(&mut self, x: u32, y: u32, bgra: [u8; 4]) {
        if let Some(offset) = self.offset(x, y) {
            self.data[offset..offset + 4].copy_from_slice(&bgra);
        }
    }

    /// Copies an RGBA image of the same dimensions, swapping red and blue.
    pub fn fill_from_rgba(&mut self, image: &image::RgbaImage) -> Result<(), Box<dyn std::error::Error>> {
        if image.width() != self.size.width || image.height() != self.size.height {
            return Err(format!(
                "image is {}x{}, buffer is {}",
                image.width(),
                image.height(),
                self.size
            )
            .into());
        }

        let src = ArrayView3::from_shape(self.shape(), &image.as_raw()[..])?;
        let mut dst = self.as_ndarray_mut();
        for (bgra, rgba) in RGBA_CHANNEL_FOR_BGRA.into_iter().enumerate() {
            dst.index_axis_mut(Axis(2), bgra)
                .assign(&src.index_axis(Axis(2), rgba));
        }
        Ok(())
    }

    /// Views the buffer as `(height, width, 4)` with channels in BGRA order.
    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("PixelBuffer data length must match dimensions")
    }

    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        ArrayViewMut3::from_shape(self.shape(), &mut self.data)
            .expect("PixelBuffer data length must match dimensions")
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.size.height as usize,
            self.size.width as usize,
            PixelFormat::Bgra8.bytes_per_pixel(),
        )
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        Some(y as usize * self.bytes_per_row() + x as usize * 4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_zeroed_bgra() {
        let buffer = PixelBuffer::new(FrameSize::new(3, 2));
        assert_eq!(buffer.data().len(), 24);
        assert!(buffer.data().iter().all(|&b| b == 0));
        assert_eq!(buffer.pixel_format(), PixelFormat::Bgra8);
        assert_eq!(buffer.bytes_per_row(), 12);
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * 4")]
    fn test_mismatched_data_length_panics_in_debug() {
        PixelBuffer::from_data(vec![0u8; 10], FrameSize::new(2, 2));
    }

    #[test]
    fn test_fill_sets_every_pixel() {
        let mut buffer = PixelBuffer::new(FrameSize::new(2, 2));
        buffer.fill([1, 2, 3, 4]);
        assert_eq!(buffer.data(), &[1, 2, 3, 4, 1, 2, 3, 4, 1, 2, 3, 4, 1, 2, 3, 4]);
    }

    #[test]
    fn test_put_pixel_and_read_back() {
        let mut buffer = PixelBuffer::new(FrameSize::new(4, 3));
        buffer.put_pixel(3, 2, [9, 8, 7, 255]);
        assert_eq!(buffer.pixel(3, 2), Some([9, 8, 7, 255]));
        assert_eq!(buffer.pixel(0, 0), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_out_of_bounds_is_ignored() {
        let mut buffer = PixelBuffer::new(FrameSize::new(2, 2));
        buffer.put_pixel(2, 0, [255; 4]);
        assert!(buffer.data().iter().all(|&b| b == 0));
        assert_eq!(buffer.pixel(0, 2), None);
    }

    #[test]
    fn test_fill_from_rgba_swaps_red_and_blue() {
        let image = image::RgbaImage::from_pixel(2, 1, image::Rgba([10, 20, 30, 40]));
        let mut buffer = PixelBuffer::new(FrameSize::new(2, 1));
        buffer.fill_from_rgba(&image).unwrap();
        assert_eq!(buffer.pixel(1, 0), Some([30, 20, 10, 40]));
    }

    #[test]
    fn test_fill_from_rgba_keeps_pixel_positions() {
        let image = image::RgbaImage::from_fn(3, 2, |x, y| image::Rgba([x as u8, y as u8, 100 + x as u8, 255]));
        let mut buffer = PixelBuffer::new(FrameSize::new(3, 2));
        buffer.fill_from_rgba(&image).unwrap();

        assert_eq!(buffer.pixel(0, 0), Some([100, 0, 0, 255]));
        assert_eq!(buffer.pixel(2, 1), Some([102, 1, 2, 255]));
        assert_eq!(buffer.as_ndarray()[[1, 1, 2]], 1);
    }

    #[test]
    fn test_fill_from_rgba_rejects_other_sizes() {
        let image = image::RgbaImage::new(3, 1);
        let mut buffer = PixelBuffer::new(FrameSize::new(2, 1));
        assert!(buffer.fill_from_rgba(&image).is_err());
    }

    #[test]
    fn test_as_ndarray_shape_and_access() {
        let mut buffer = PixelBuffer::new(FrameSize::new(4, 2));
        {
            let mut arr = buffer.as_ndarray_mut();
            arr[[1, 3, 2]] = 200; // row=1, col=3, R
        }
        let arr = buffer.as_ndarray();
        assert_eq!(arr.shape(), &[2, 4, 4]);
        assert_eq!(buffer.pixel(3, 1), Some([0, 0, 200, 0]));
    }
}
