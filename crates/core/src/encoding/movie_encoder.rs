use std::path::{Path, PathBuf};
use std::thread::JoinHandle;

use crossbeam_channel::Receiver;

use crate::frame_source::domain::frame_source::{EncoderMode, FrameSource};
use crate::shared::error::EncoderError;
use crate::shared::frame_duration::FrameDuration;
use crate::shared::frame_size::FrameSize;
use crate::shared::stream_config::StreamConfig;
use crate::video::domain::video_writer::VideoWriter;
use crate::video::infrastructure::ffmpeg_writer::FfmpegWriter;
use crate::video::infrastructure::h264_capabilities;
use crate::video::infrastructure::threaded_video_writer::ThreadedVideoWriter;

use super::encode_logger::{EncodeLogger, NullEncodeLogger};
use super::encoder_event::EncoderEvent;
use super::frame_loop::{FrameLoop, SequencerOptions};
use super::stream_state::{StateCell, StreamState};

/// Builds a movie from still frames pulled one at a time from a
/// [`FrameSource`].
///
/// An encoder is single-use: it is bound to one output file at creation,
/// started once, and ends `Finished` or `Failed`. Mid-stream failures are
/// reported to the frame source (and the event channel), never returned
/// from `start`.
pub struct MovieEncoder {
    config: StreamConfig,
    writer: Option<Box<dyn VideoWriter>>,
    state: StateCell,
    mode: Option<EncoderMode>,
    options: SequencerOptions,
    logger: Option<Box<dyn EncodeLogger>>,
}

impl MovieEncoder {
    /// Binds an H.264 writer to `output_path`.
    ///
    /// Fails with `OutputAlreadyExists` if the file is already there, or
    /// `UnsupportedConfiguration` if the size, duration or platform cannot
    /// be encoded.
    pub fn create(
        output_path: impl AsRef<Path>,
        frame_size: FrameSize,
        frame_duration: FrameDuration,
    ) -> Result<Self, EncoderError> {
        validate(output_path.as_ref(), frame_size, frame_duration)?;

        if !Self::device_supports_encoding() {
            return Err(EncoderError::UnsupportedConfiguration(
                "no H.264 encoder is available".into(),
            ));
        }
        let max = Self::maximum_frame_size();
        if !frame_size.fits_within(max) {
            return Err(EncoderError::UnsupportedConfiguration(format!(
                "frame size {frame_size} exceeds the maximum of {max}"
            )));
        }

        let writer = ThreadedVideoWriter::new(Box::new(FfmpegWriter::new()));
        Self::with_writer(output_path, frame_size, frame_duration, Box::new(writer))
    }

    /// Like [`MovieEncoder::create`] but with a caller-supplied writer.
    pub fn with_writer(
        output_path: impl AsRef<Path>,
        frame_size: FrameSize,
        frame_duration: FrameDuration,
        mut writer: Box<dyn VideoWriter>,
    ) -> Result<Self, EncoderError> {
        let output_path = output_path.as_ref();
        validate(output_path, frame_size, frame_duration)?;

        let config = StreamConfig {
            output_path: output_path.to_path_buf(),
            frame_size,
            frame_duration,
        };
        writer
            .open(&config)
            .map_err(|e| EncoderError::UnsupportedConfiguration(e.to_string()))?;

        Ok(Self {
            config,
            writer: Some(writer),
            state: StateCell::new(),
            mode: None,
            options: SequencerOptions::default(),
            logger: None,
        })
    }

    pub fn with_options(mut self, options: SequencerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_logger(mut self, logger: Box<dyn EncodeLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn frame_size(&self) -> FrameSize {
        self.config.frame_size
    }

    pub fn frame_duration(&self) -> FrameDuration {
        self.config.frame_duration
    }

    pub fn output_path(&self) -> &Path {
        &self.config.output_path
    }

    pub fn state(&self) -> StreamState {
        self.state.get()
    }

    /// `None` until a source has been accepted by `start`/`run`.
    pub fn mode(&self) -> Option<EncoderMode> {
        self.mode
    }

    /// Whether this machine can encode H.264 at all.
    pub fn device_supports_encoding() -> bool {
        h264_capabilities::device_supports_encoding()
    }

    /// Largest frame size `create` accepts on this machine.
    pub fn maximum_frame_size() -> FrameSize {
        h264_capabilities::maximum_frame_size()
    }

    /// Starts pulling frames on a dedicated worker thread.
    ///
    /// Returns `AlreadyStarted` (and leaves `source` untouched) if the
    /// encoder is no longer idle.
    pub fn start(&mut self, source: FrameSource) -> Result<EncodingHandle, EncoderError> {
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        let mut frame_loop = self.begin(&source)?;
        frame_loop.events = Some(events_tx);

        let worker = std::thread::spawn(move || {
            let mut source = source;
            frame_loop.run(&mut source);
            source
        });

        Ok(EncodingHandle {
            events: events_rx,
            worker,
            state: self.state.clone(),
            output_path: self.config.output_path.clone(),
        })
    }

    /// Runs the whole stream on the calling thread and returns the
    /// terminal state.
    pub fn run(&mut self, source: &mut FrameSource) -> Result<StreamState, EncoderError> {
        let frame_loop = self.begin(source)?;
        Ok(frame_loop.run(source))
    }

    fn begin(&mut self, source: &FrameSource) -> Result<FrameLoop, EncoderError> {
        if self.state.get() != StreamState::Idle {
            return Err(EncoderError::AlreadyStarted);
        }
        let writer = self.writer.take().ok_or(EncoderError::AlreadyStarted)?;
        self.state
            .transition(StreamState::RequestingFrames)
            .map_err(|_| EncoderError::AlreadyStarted)?;
        self.mode = Some(source.mode());

        log::info!(
            "Starting {} encode to {} ({}s per frame)",
            self.config.frame_size,
            self.config.output_path.display(),
            self.config.frame_duration
        );

        Ok(FrameLoop {
            writer,
            frame_size: self.config.frame_size,
            frame_duration: self.config.frame_duration,
            options: self.options.clone(),
            state: self.state.clone(),
            events: None,
            logger: self
                .logger
                .take()
                .unwrap_or_else(|| Box::new(NullEncodeLogger)),
        })
    }
}

/// A stream being encoded in the background.
pub struct EncodingHandle {
    events: Receiver<EncoderEvent>,
    worker: JoinHandle<FrameSource>,
    state: StateCell,
    output_path: PathBuf,
}

impl EncodingHandle {
    /// Lifecycle events, in the order the frame source saw them.
    pub fn events(&self) -> &Receiver<EncoderEvent> {
        &self.events
    }

    pub fn state(&self) -> StreamState {
        self.state.get()
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Waits for the worker and hands back the frame source.
    pub fn join(self) -> Result<FrameSource, EncoderError> {
        match self.worker.join() {
            Ok(source) => Ok(source),
            Err(_) => {
                let _ = self.state.transition(StreamState::Failed);
                Err(EncoderError::WorkerPanicked)
            }
        }
    }
}

fn validate(
    output_path: &Path,
    frame_size: FrameSize,
    frame_duration: FrameDuration,
) -> Result<(), EncoderError> {
    if output_path.exists() {
        return Err(EncoderError::OutputAlreadyExists(output_path.to_path_buf()));
    }
    if frame_size.is_empty() {
        return Err(EncoderError::UnsupportedConfiguration(format!(
            "frame size must be non-zero, got {frame_size}"
        )));
    }
    if !frame_duration.is_valid() {
        return Err(EncoderError::UnsupportedConfiguration(format!(
            "frame duration must be positive, got {frame_duration}"
        )));
    }
    Ok(())
}
