use std::time::Duration;

use super::frame_size::FrameSize;

/// Frames buffered between the sequencer and the encode thread.
pub const DEFAULT_QUEUE_CAPACITY: usize = 8;

/// How long the sequencer sleeps between writer readiness checks.
pub const DEFAULT_READY_POLL_INTERVAL: Duration = Duration::from_millis(2);

/// H.264 CRF quality (0=lossless, 51=worst).
pub const DEFAULT_CRF: u32 = 18;
pub const DEFAULT_PRESET: &str = "medium";

/// Tried in order; the first one that opens wins.
pub const HW_H264_ENCODERS: &[&str] = &[
    "h264_videotoolbox",
    "h264_nvenc",
    "h264_qsv",
    "h264_vaapi",
    "h264_v4l2m2m",
];
pub const SW_H264_ENCODERS: &[&str] = &["libx264", "libopenh264"];

/// Level 5.1 limit (36864 macroblocks), what fixed-function encoders accept.
pub const HW_MAX_FRAME_SIZE: FrameSize = FrameSize::new(4096, 2304);
/// Level 6.2 limit (139264 macroblocks).
pub const SW_MAX_FRAME_SIZE: FrameSize = FrameSize::new(8192, 4320);

/// Size of the context opened for each encoder when checking what the host can use.
pub const TRIAL_FRAME_SIZE: FrameSize = FrameSize::new(256, 256);

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

/// Progress is logged every N frames.
pub const PROGRESS_THROTTLE_FRAMES: usize = 25;
