use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;

use crate::frame_source::domain::draw_surface::DrawSurface;
use crate::frame_source::domain::frame_source::FrameSource;
use crate::shared::color_space::{ColorModel, ColorSpace};
use crate::shared::constants::DEFAULT_READY_POLL_INTERVAL;
use crate::shared::error::EncoderError;
use crate::shared::frame_duration::FrameDuration;
use crate::shared::frame_size::FrameSize;
use crate::shared::pixel_buffer::PixelBuffer;
use crate::video::domain::video_writer::VideoWriter;

use super::encode_logger::EncodeLogger;
use super::encoder_event::EncoderEvent;
use super::stream_state::{StateCell, StreamState};

/// Runtime tuning for the frame loop.
#[derive(Clone, Debug)]
pub struct SequencerOptions {
    /// Sleep between readiness checks while the writer is applying
    /// back-pressure.
    pub ready_poll_interval: Duration,
    /// Colour model of the surface handed to surface sources.
    pub color_model: ColorModel,
}

impl Default for SequencerOptions {
    fn default() -> Self {
        Self {
            ready_poll_interval: DEFAULT_READY_POLL_INTERVAL,
            color_model: ColorModel::DeviceRgb,
        }
    }
}

/// The reusable frame payload, allocated once per stream.
enum Payload {
    Buffer(PixelBuffer),
    Surface(DrawSurface),
}

impl Payload {
    fn for_source(source: &FrameSource, size: FrameSize, color_model: ColorModel) -> Self {
        match source {
            FrameSource::PixelBuffer(_) => Payload::Buffer(PixelBuffer::new(size)),
            FrameSource::Surface(_) => {
                Payload::Surface(DrawSurface::new(size, Arc::new(ColorSpace::new(color_model))))
            }
        }
    }

    /// Asks the source for the next frame. `false` means no more frames.
    fn request(&mut self, source: &mut FrameSource) -> bool {
        match (self, source) {
            (Payload::Buffer(buffer), FrameSource::PixelBuffer(s)) => s.fill_pixel_buffer(buffer),
            (Payload::Surface(surface), FrameSource::Surface(s)) => s.fill_surface(surface),
            _ => unreachable!("payload was built for a different source mode"),
        }
    }

    /// Sources may swap in a payload of their own, so the size and byte
    /// count are checked against the stream after every fill.
    fn check_size(&self, expected: FrameSize) -> Result<(), String> {
        let pixels = self.pixels();
        let expected_len = expected.pixel_count() * pixels.pixel_format().bytes_per_pixel();
        if pixels.size() != expected {
            return Err(format!("frame is {}, stream is {expected}", pixels.size()));
        }
        if pixels.data().len() != expected_len {
            return Err(format!(
                "frame holds {} bytes, {expected} needs {expected_len}",
                pixels.data().len()
            ));
        }
        Ok(())
    }

    fn pixels(&self) -> &PixelBuffer {
        match self {
            Payload::Buffer(buffer) => buffer,
            Payload::Surface(surface) => surface.pixel_buffer(),
        }
    }
}

/// One run of the request → wait → append loop for a single stream.
///
/// Owns the writer; the state cell and event channel are shared with the
/// encoder and its handle.
pub(crate) struct FrameLoop {
    pub writer: Box<dyn VideoWriter>,
    pub frame_size: FrameSize,
    pub frame_duration: FrameDuration,
    pub options: SequencerOptions,
    pub state: StateCell,
    pub events: Option<Sender<EncoderEvent>>,
    pub logger: Box<dyn EncodeLogger>,
}

impl FrameLoop {
    /// Drives `source` until it runs dry or the writer fails, then
    /// finalizes. Expects the state to already be `RequestingFrames`.
    pub fn run(mut self, source: &mut FrameSource) -> StreamState {
        let mut payload = Payload::for_source(source, self.frame_size, self.options.color_model);
        self.logger.info(&format!(
            "Requesting {} frames in {:?} mode",
            self.frame_size,
            source.mode()
        ));

        let mut frame_index: u64 = 0;
        loop {
            // A buffered writer may have failed on an earlier frame.
            if let Err(e) = self.writer.is_ready_for_more_data() {
                return self.fail(
                    source,
                    EncoderError::WriterFailure(format!("failed before frame {frame_index}: {e}")),
                );
            }

            let started = Instant::now();
            let more = payload.request(source);
            self.logger.timing("request", elapsed_ms(started));
            if !more {
                break;
            }

            if let Err(reason) = payload.check_size(self.frame_size) {
                return self.fail(
                    source,
                    EncoderError::UnsupportedConfiguration(format!("frame {frame_index}: {reason}")),
                );
            }

            let Some(pts) = self.frame_duration.presentation_time(frame_index) else {
                return self.fail(
                    source,
                    EncoderError::UnsupportedConfiguration(format!(
                        "presentation timestamp of frame {frame_index} overflows"
                    )),
                );
            };

            let started = Instant::now();
            if let Err(e) = self.wait_until_ready() {
                return self.fail(
                    source,
                    EncoderError::WriterFailure(format!("not ready for frame {frame_index}: {e}")),
                );
            }
            self.logger.timing("wait", elapsed_ms(started));

            let started = Instant::now();
            if let Err(e) = self.writer.append(payload.pixels(), pts) {
                return self.fail(
                    source,
                    EncoderError::WriterFailure(format!("append frame {frame_index}: {e}")),
                );
            }
            self.logger.timing("append", elapsed_ms(started));

            log::debug!("Appended frame {frame_index} at {}s", pts.as_secs_f64());
            self.logger.frame_appended(frame_index, pts);
            frame_index += 1;
        }

        self.finish(source, frame_index)
    }

    fn wait_until_ready(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        while !self.writer.is_ready_for_more_data()? {
            std::thread::sleep(self.options.ready_poll_interval);
        }
        Ok(())
    }

    fn finish(mut self, source: &mut FrameSource, frames: u64) -> StreamState {
        if let Err(e) = self.writer.flush() {
            return self.fail(
                source,
                EncoderError::WriterFailure(format!("draining queued frames: {e}")),
            );
        }
        if self.state.transition(StreamState::Finishing).is_err() {
            return self.state.get();
        }
        source.notify_frames_exhausted();
        self.post(EncoderEvent::FramesExhausted);
        self.logger
            .info(&format!("All {frames} frames added, finalizing compression"));

        if let Err(e) = self.writer.finish() {
            return self.fail(
                source,
                EncoderError::WriterFailure(format!("finalize output: {e}")),
            );
        }

        if self.state.transition(StreamState::Finished).is_ok() {
            source.notify_encoding_finished();
            self.post(EncoderEvent::Finished);
            self.logger.summary();
        }
        self.state.get()
    }

    fn fail(self, source: &mut FrameSource, error: EncoderError) -> StreamState {
        if self.state.transition(StreamState::Failed).is_ok() {
            let reason = error.to_string();
            log::warn!("Encoding failed: {reason}");
            source.notify_failure(&reason);
            self.post(EncoderEvent::Failed(reason));
        }
        self.state.get()
    }

    fn post(&self, event: EncoderEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
