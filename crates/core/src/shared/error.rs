use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by [`crate::encoding::movie_encoder::MovieEncoder`].
///
/// Configuration problems come back from `create`/`start`. A writer failure
/// in the middle of a stream is only reported to the frame source, never
/// returned from `start`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncoderError {
    #[error("output file already exists: {}", .0.display())]
    OutputAlreadyExists(PathBuf),
    #[error("unsupported configuration: {0}")]
    UnsupportedConfiguration(String),
    #[error("video writer failed: {0}")]
    WriterFailure(String),
    #[error("encoder has already been started")]
    AlreadyStarted,
    #[error("encoding worker panicked")]
    WorkerPanicked,
}
