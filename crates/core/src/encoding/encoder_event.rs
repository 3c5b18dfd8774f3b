/// Lifecycle notifications posted by the frame loop, mirroring the calls
/// made on the frame source.
///
/// Ordering: `FramesExhausted` or `Failed` first, then `Finished` unless
/// the stream failed. A finalize failure yields `FramesExhausted` then
/// `Failed`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EncoderEvent {
    Failed(String),
    FramesExhausted,
    Finished,
}
