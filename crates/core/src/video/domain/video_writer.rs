use crate::shared::frame_duration::PresentationTime;
use crate::shared::pixel_buffer::PixelBuffer;
use crate::shared::stream_config::StreamConfig;

/// Abstracts video encoding so the frame loop can write output without
/// depending on a specific codec library.
///
/// Call order: `open` once, then any number of readiness checks and
/// `append`s with strictly increasing timestamps, then `finish` once.
pub trait VideoWriter: Send {
    /// Binds the writer to the output file. Fails if the configuration
    /// cannot be encoded.
    fn open(&mut self, config: &StreamConfig) -> Result<(), Box<dyn std::error::Error>>;

    /// Whether `append` can accept a frame without blocking. Writers that
    /// never buffer are always ready.
    fn is_ready_for_more_data(&mut self) -> Result<bool, Box<dyn std::error::Error>> {
        Ok(true)
    }

    /// Encodes one frame. The buffer is only borrowed for the duration of
    /// the call; writers that need it longer must copy.
    fn append(
        &mut self,
        buffer: &PixelBuffer,
        pts: PresentationTime,
    ) -> Result<(), Box<dyn std::error::Error>>;

    /// Blocks until every appended frame has reached the encoder, returning
    /// any error raised while doing so. Unbuffered writers have nothing to
    /// wait for.
    fn flush(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        Ok(())
    }

    /// Marks the input finished, flushes the compressor and closes the
    /// container.
    fn finish(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}
