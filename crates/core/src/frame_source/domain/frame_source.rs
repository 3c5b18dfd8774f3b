use std::fmt;

use crate::shared::error::EncoderError;
use crate::shared::pixel_buffer::PixelBuffer;

use super::draw_surface::DrawSurface;

/// Lifecycle notifications every frame source receives.
///
/// Called from the encoding worker thread, each at most once:
/// `on_failure` or `on_frames_exhausted` first, then `on_encoding_finished`
/// unless the stream failed.
pub trait FrameObserver: Send {
    /// The stream is unusable; any partial output should be treated as corrupt.
    fn on_failure(&mut self, reason: &str);

    /// All frames were handed over; compression is being finalized.
    fn on_frames_exhausted(&mut self);

    /// The output file is complete and closed.
    fn on_encoding_finished(&mut self);
}

/// Produces frames by writing BGRA pixels into a reusable buffer.
pub trait PixelBufferSource: FrameObserver {
    /// Fill `buffer` with the next frame and return `true`, or return
    /// `false` (leaving the buffer alone) when there are no more frames.
    fn fill_pixel_buffer(&mut self, buffer: &mut PixelBuffer) -> bool;
}

/// Produces frames by drawing into a reusable surface.
pub trait SurfaceSource: FrameObserver {
    /// Same contract as [`PixelBufferSource::fill_pixel_buffer`].
    fn fill_surface(&mut self, surface: &mut DrawSurface) -> bool;
}

/// Which payload the frame loop hands to the source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncoderMode {
    PixelBuffer,
    DrawSurface,
}

/// A frame source, tagged by the single capability it implements.
pub enum FrameSource {
    PixelBuffer(Box<dyn PixelBufferSource>),
    Surface(Box<dyn SurfaceSource>),
}

impl FrameSource {
    pub fn pixel_buffer(source: impl PixelBufferSource + 'static) -> Self {
        FrameSource::PixelBuffer(Box::new(source))
    }

    pub fn surface(source: impl SurfaceSource + 'static) -> Self {
        FrameSource::Surface(Box::new(source))
    }

    /// Builds a source from optionally-present capabilities, for callers
    /// that only learn at runtime what a producer offers.
    ///
    /// Exactly one capability must be present; zero or both is rejected
    /// before any frame is requested.
    pub fn from_capabilities(
        pixel_buffer: Option<Box<dyn PixelBufferSource>>,
        surface: Option<Box<dyn SurfaceSource>>,
    ) -> Result<Self, EncoderError> {
        match (pixel_buffer, surface) {
            (Some(source), None) => Ok(FrameSource::PixelBuffer(source)),
            (None, Some(source)) => Ok(FrameSource::Surface(source)),
            (None, None) => Err(EncoderError::UnsupportedConfiguration(
                "frame source implements neither pixel-buffer nor surface filling".into(),
            )),
            (Some(_), Some(_)) => Err(EncoderError::UnsupportedConfiguration(
                "frame source implements both pixel-buffer and surface filling".into(),
            )),
        }
    }

    pub fn mode(&self) -> EncoderMode {
        match self {
            FrameSource::PixelBuffer(_) => EncoderMode::PixelBuffer,
            FrameSource::Surface(_) => EncoderMode::DrawSurface,
        }
    }

    pub(crate) fn notify_failure(&mut self, reason: &str) {
        match self {
            FrameSource::PixelBuffer(s) => s.on_failure(reason),
            FrameSource::Surface(s) => s.on_failure(reason),
        }
    }

    pub(crate) fn notify_frames_exhausted(&mut self) {
        match self {
            FrameSource::PixelBuffer(s) => s.on_frames_exhausted(),
            FrameSource::Surface(s) => s.on_frames_exhausted(),
        }
    }

    pub(crate) fn notify_encoding_finished(&mut self) {
        match self {
            FrameSource::PixelBuffer(s) => s.on_encoding_finished(),
            FrameSource::Surface(s) => s.on_encoding_finished(),
        }
    }
}

impl fmt::Debug for FrameSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FrameSource").field(&self.mode()).finish()
    }
}
