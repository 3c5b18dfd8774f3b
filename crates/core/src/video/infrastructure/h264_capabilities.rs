//! H.264 encoder discovery against the linked FFmpeg build and the host.
//!
//! An encoder compiled into FFmpeg is only usable if it also opens on this
//! machine (a GPU encoder without the GPU does not), so the capability
//! queries open a small test context for each candidate once per process.

use std::sync::OnceLock;

use crate::shared::constants::{
    HW_H264_ENCODERS, HW_MAX_FRAME_SIZE, SW_H264_ENCODERS, SW_MAX_FRAME_SIZE, TRIAL_FRAME_SIZE,
};
use crate::shared::frame_size::FrameSize;

static USABLE_ENCODERS: OnceLock<Vec<String>> = OnceLock::new();

/// Every H.264 encoder worth trying, hardware first, without duplicates.
pub fn encoder_candidates() -> Vec<ffmpeg_next::Codec> {
    if ffmpeg_next::init().is_err() {
        return Vec::new();
    }

    let mut candidates: Vec<ffmpeg_next::Codec> = Vec::new();
    let named = HW_H264_ENCODERS
        .iter()
        .chain(SW_H264_ENCODERS)
        .filter_map(|name| ffmpeg_next::encoder::find_by_name(name));
    let default = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::H264);

    for codec in named.chain(default) {
        if !candidates.iter().any(|c| c.name() == codec.name()) {
            log::debug!("found H.264 encoder: {}", codec.name());
            candidates.push(codec);
        }
    }
    candidates
}

/// Names of the candidates that open on this host, in preference order.
/// Each candidate is opened once and the result cached.
pub fn usable_encoders() -> &'static [String] {
    USABLE_ENCODERS.get_or_init(|| {
        let usable: Vec<String> = encoder_candidates()
            .into_iter()
            .filter(|codec| match try_open_encoder(*codec) {
                Ok(()) => true,
                Err(e) => {
                    log::debug!("H.264 encoder {} does not open here: {e}", codec.name());
                    false
                }
            })
            .map(|codec| codec.name().to_string())
            .collect();
        log::info!("Usable H.264 encoders: {usable:?}");
        usable
    })
}

/// Whether any H.264 encoder opens on this host.
pub fn device_supports_encoding() -> bool {
    !usable_encoders().is_empty()
}

/// Largest frame the preferred usable encoder accepts; empty when nothing
/// can encode.
pub fn maximum_frame_size() -> FrameSize {
    maximum_frame_size_for(usable_encoders().first().map(String::as_str))
}

fn maximum_frame_size_for(preferred: Option<&str>) -> FrameSize {
    match preferred {
        Some(name) if is_hw_encoder(name) => HW_MAX_FRAME_SIZE,
        Some(_) => SW_MAX_FRAME_SIZE,
        None => FrameSize::new(0, 0),
    }
}

/// YUV420P when the encoder takes it, otherwise NV12, otherwise whatever
/// it lists first.
pub fn preferred_pixel_format(codec: ffmpeg_next::Codec) -> ffmpeg_next::format::Pixel {
    use ffmpeg_next::format::Pixel;

    let supported: Vec<Pixel> = codec
        .video()
        .ok()
        .and_then(|video| video.formats().map(|formats| formats.collect()))
        .unwrap_or_default();

    if supported.is_empty() || supported.contains(&Pixel::YUV420P) {
        Pixel::YUV420P
    } else if supported.contains(&Pixel::NV12) {
        Pixel::NV12
    } else {
        supported[0]
    }
}

/// Opens (and drops) an encoder context the way `FfmpegWriter` would.
fn try_open_encoder(codec: ffmpeg_next::Codec) -> Result<(), ffmpeg_next::Error> {
    let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
        .encoder()
        .video()?;
    encoder_ctx.set_width(TRIAL_FRAME_SIZE.width);
    encoder_ctx.set_height(TRIAL_FRAME_SIZE.height);
    encoder_ctx.set_format(preferred_pixel_format(codec));
    encoder_ctx.set_time_base(ffmpeg_next::Rational(1, 25));
    encoder_ctx.set_frame_rate(Some(ffmpeg_next::Rational(25, 1)));
    encoder_ctx.open().map(|_| ())
}

pub fn is_hw_encoder(name: &str) -> bool {
    HW_H264_ENCODERS.contains(&name)
}
