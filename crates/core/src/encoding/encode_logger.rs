use std::collections::HashMap;
use std::time::Instant;

use crate::shared::frame_duration::PresentationTime;

/// Observer for per-frame encoding events.
///
/// Keeps the frame loop free of output concerns: the CLI wants throttled
/// progress and a timing report, tests and library callers usually want
/// nothing.
pub trait EncodeLogger: Send {
    /// Called after frame `index` was accepted by the writer.
    fn frame_appended(&mut self, index: u64, pts: PresentationTime);

    /// Record how long a named loop stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-stream summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards all events.
pub struct NullEncodeLogger;

impl EncodeLogger for NullEncodeLogger {
    fn frame_appended(&mut self, _index: u64, _pts: PresentationTime) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Tracks per-stage timing and reports a summary through `log` when the
/// stream completes.
///
/// Progress goes out every `throttle_frames` frames.
pub struct SummaryEncodeLogger {
    throttle_frames: u64,
    timings: HashMap<String, Vec<f64>>,
    start_time: Instant,
    frames: u64,
    media_secs: f64,
}

impl SummaryEncodeLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1) as u64,
            timings: HashMap::new(),
            start_time: Instant::now(),
            frames: 0,
            media_secs: 0.0,
        }
    }

    /// Returns the formatted summary, or `None` if no frame was appended.
    pub fn summary_string(&self) -> Option<String> {
        if self.frames == 0 {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let mut lines = vec![format!(
            "Encode summary ({} frames, {:.2}s of video, {:.1}s wall):",
            self.frames,
            self.media_secs,
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = total_ms / durations.len().max(1) as f64;
            lines.push(format!("  {stage:8}: avg {avg_ms:6.2}ms  total {total_ms:7.0}ms"));
        }

        if elapsed_ms > 0.0 {
            let fps = self.frames as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Default for SummaryEncodeLogger {
    fn default() -> Self {
        Self::new(crate::shared::constants::PROGRESS_THROTTLE_FRAMES)
    }
}

impl EncodeLogger for SummaryEncodeLogger {
    fn frame_appended(&mut self, index: u64, pts: PresentationTime) {
        self.frames = index + 1;
        self.media_secs = pts.as_secs_f64();
        if self.frames % self.throttle_frames == 0 {
            log::info!("Encoded {} frames ({:.2}s)", self.frames, self.media_secs);
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(value: i64) -> PresentationTime {
        PresentationTime {
            value,
            timescale: 25,
        }
    }

    #[test]
    fn test_null_logger_all_methods_are_noop() {
        let mut logger = NullEncodeLogger;
        logger.frame_appended(0, pts(0));
        logger.timing("append", 1.0);
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_timing_records_values_per_stage() {
        let mut logger = SummaryEncodeLogger::new(10);
        logger.timing("request", 2.0);
        logger.timing("request", 4.0);
        logger.timing("append", 1.5);

        assert_eq!(logger.timings_for("request").unwrap(), &[2.0, 4.0]);
        assert_eq!(logger.timings_for("append").unwrap(), &[1.5]);
        assert!(logger.timings_for("wait").is_none());
    }

    #[test]
    fn test_frame_appended_tracks_count() {
        let mut logger = SummaryEncodeLogger::new(10);
        for i in 0..12 {
            logger.frame_appended(i, pts(i as i64));
        }
        assert_eq!(logger.frames(), 12);
    }

    #[test]
    fn test_summary_mentions_stages_and_frames() {
        let mut logger = SummaryEncodeLogger::new(10);
        logger.frame_appended(0, pts(0));
        logger.frame_appended(1, pts(1));
        logger.timing("append", 3.0);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("Encode summary (2 frames"));
        assert!(summary.contains("append"));
    }

    #[test]
    fn test_empty_summary_returns_none() {
        let logger = SummaryEncodeLogger::default();
        assert!(logger.summary_string().is_none());
    }
}
