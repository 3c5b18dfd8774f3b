use crate::shared::constants::{DEFAULT_CRF, DEFAULT_PRESET};
use crate::shared::frame_duration::PresentationTime;
use crate::shared::frame_size::FrameSize;
use crate::shared::pixel_buffer::PixelBuffer;
use crate::shared::stream_config::StreamConfig;
use crate::video::domain::video_writer::VideoWriter;

use super::h264_capabilities::{encoder_candidates, is_hw_encoder, preferred_pixel_format};

/// Encodes BGRA frames to H.264 via ffmpeg-next.
///
/// Tries hardware encoders first and falls back to software when one
/// fails to open. The container is chosen from the output extension.
pub struct FfmpegWriter {
    octx: Option<ffmpeg_next::format::context::Output>,
    encoder: Option<ffmpeg_next::codec::encoder::video::Encoder>,
    scaler: Option<ffmpeg_next::software::scaling::Context>,
    encoder_name: Option<String>,
    frame_size: FrameSize,
    time_base: ffmpeg_next::Rational,
    video_stream_index: usize,
    crf: u32,
    preset: String,
    frames_written: u64,
}

// Safety: FfmpegWriter is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegWriter {}

impl FfmpegWriter {
    pub fn new() -> Self {
        Self {
            octx: None,
            encoder: None,
            scaler: None,
            encoder_name: None,
            frame_size: FrameSize::new(0, 0),
            time_base: ffmpeg_next::Rational(1, 1),
            video_stream_index: 0,
            crf: DEFAULT_CRF,
            preset: DEFAULT_PRESET.to_string(),
            frames_written: 0,
        }
    }

    /// Constant rate factor for software encoders (0=lossless, 51=worst).
    pub fn with_crf(mut self, crf: u32) -> Self {
        self.crf = crf.min(51);
        self
    }

    pub fn with_preset(mut self, preset: impl Into<String>) -> Self {
        self.preset = preset.into();
        self
    }

    /// Name of the encoder that opened, once `open` succeeded.
    pub fn encoder_name(&self) -> Option<&str> {
        self.encoder_name.as_deref()
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    fn open_encoder(
        &self,
        codec: ffmpeg_next::Codec,
        pixel: ffmpeg_next::format::Pixel,
        frame_rate: ffmpeg_next::Rational,
        global_header: bool,
    ) -> Result<ffmpeg_next::codec::encoder::video::Encoder, ffmpeg_next::Error> {
        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;

        encoder_ctx.set_width(self.frame_size.width);
        encoder_ctx.set_height(self.frame_size.height);
        encoder_ctx.set_format(pixel);
        encoder_ctx.set_time_base(self.time_base);
        encoder_ctx.set_frame_rate(Some(frame_rate));

        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let mut options = ffmpeg_next::Dictionary::new();
        if !is_hw_encoder(codec.name()) {
            options.set("crf", &self.crf.to_string());
            options.set("preset", &self.preset);
        }

        encoder_ctx.open_with(options)
    }

    /// Drains every packet the encoder has ready into the container.
    fn write_pending_packets(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let (Some(encoder), Some(octx)) = (self.encoder.as_mut(), self.octx.as_mut()) else {
            return Err("FfmpegWriter: not opened".into());
        };
        let ost_time_base = octx
            .stream(self.video_stream_index)
            .ok_or("FfmpegWriter: output stream missing")?
            .time_base();

        let mut encoded = ffmpeg_next::Packet::empty();
        while encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(self.video_stream_index);
            encoded.rescale_ts(self.time_base, ost_time_base);
            encoded.write_interleaved(octx)?;
        }
        Ok(())
    }
}

impl Default for FfmpegWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoWriter for FfmpegWriter {
    fn open(&mut self, config: &StreamConfig) -> Result<(), Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let size = config.frame_size;
        if size.width % 2 != 0 || size.height % 2 != 0 {
            return Err(format!("H.264 4:2:0 output needs even dimensions, got {size}").into());
        }

        let duration = config.frame_duration;
        let frame_value = i32::try_from(duration.value())
            .map_err(|_| format!("frame duration {duration} does not fit the encoder"))?;

        self.frame_size = size;
        self.time_base = ffmpeg_next::Rational(1, duration.timescale());
        let frame_rate = ffmpeg_next::Rational(duration.timescale(), frame_value);

        let mut octx = ffmpeg_next::format::output(&config.output_path)?;
        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let mut opened = None;
        for codec in encoder_candidates() {
            let pixel = preferred_pixel_format(codec);
            match self.open_encoder(codec, pixel, frame_rate, global_header) {
                Ok(encoder) => {
                    opened = Some((codec, encoder, pixel));
                    break;
                }
                Err(e) => log::debug!("H.264 encoder {} unavailable: {e}", codec.name()),
            }
        }
        let (codec, encoder, pixel) = opened.ok_or("no usable H.264 encoder")?;
        log::info!(
            "Encoding {size} H.264 with {} ({pixel:?}) to {}",
            codec.name(),
            config.output_path.display()
        );

        let mut ost = octx.add_stream(Some(codec))?;
        ost.set_parameters(&encoder);
        ost.set_time_base(self.time_base);
        self.video_stream_index = ost.index();

        octx.write_header()?;

        let scaler = ffmpeg_next::software::scaling::Context::get(
            ffmpeg_next::format::Pixel::BGRA,
            size.width,
            size.height,
            pixel,
            size.width,
            size.height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        self.encoder_name = Some(codec.name().to_string());
        self.octx = Some(octx);
        self.encoder = Some(encoder);
        self.scaler = Some(scaler);
        self.frames_written = 0;

        Ok(())
    }

    fn append(
        &mut self,
        buffer: &PixelBuffer,
        pts: PresentationTime,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if buffer.size() != self.frame_size {
            return Err(format!(
                "frame is {}, stream is {}",
                buffer.size(),
                self.frame_size
            )
            .into());
        }
        let row_bytes = buffer.bytes_per_row();
        if buffer.data().len() != row_bytes * self.frame_size.height as usize {
            return Err(format!(
                "frame holds {} bytes, {} needs {}",
                buffer.data().len(),
                self.frame_size,
                row_bytes * self.frame_size.height as usize
            )
            .into());
        }
        let (Some(encoder), Some(scaler)) = (self.encoder.as_mut(), self.scaler.as_mut()) else {
            return Err("FfmpegWriter: not opened".into());
        };

        let width = self.frame_size.width;
        let height = self.frame_size.height;
        let mut bgra_frame =
            ffmpeg_next::util::frame::video::Video::new(ffmpeg_next::format::Pixel::BGRA, width, height);

        let stride = bgra_frame.stride(0);
        let data = bgra_frame.data_mut(0);
        let src = buffer.data();

        // Copy pixel data, respecting stride
        for row in 0..height as usize {
            let src_start = row * row_bytes;
            let dst_start = row * stride;
            data[dst_start..dst_start + row_bytes]
                .copy_from_slice(&src[src_start..src_start + row_bytes]);
        }

        let mut yuv_frame = ffmpeg_next::util::frame::video::Video::empty();
        scaler.run(&bgra_frame, &mut yuv_frame)?;
        yuv_frame.set_pts(Some(pts.value));

        encoder.send_frame(&yuv_frame)?;
        self.write_pending_packets()?;

        self.frames_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(ref mut encoder) = self.encoder {
            encoder.send_eof()?;
            self.write_pending_packets()?;
            if let Some(ref mut octx) = self.octx {
                octx.write_trailer()?;
            }
            log::debug!("Finalized H.264 stream after {} frames", self.frames_written);
        }

        self.octx = None;
        self.encoder = None;
        self.scaler = None;

        Ok(())
    }
}
