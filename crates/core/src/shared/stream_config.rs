use std::path::PathBuf;

use super::frame_duration::FrameDuration;
use super::frame_size::FrameSize;

/// Immutable parameters of one output stream, bound at creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamConfig {
    pub output_path: PathBuf,
    pub frame_size: FrameSize,
    pub frame_duration: FrameDuration,
}
