use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Presentation duration of a single frame: `value / timescale` seconds.
///
/// `FrameDuration::new(1, 25)` is one PAL frame (1/25th of a second).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameDuration {
    value: i64,
    timescale: i32,
}

impl FrameDuration {
    pub const fn new(value: i64, timescale: i32) -> Self {
        Self { value, timescale }
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn timescale(&self) -> i32 {
        self.timescale
    }

    /// A usable duration has a positive numerator and timescale.
    pub fn is_valid(&self) -> bool {
        self.value > 0 && self.timescale > 0
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.value as f64 / self.timescale as f64
    }

    pub fn frames_per_second(&self) -> f64 {
        self.timescale as f64 / self.value as f64
    }

    /// Timestamp of frame `frame_index`, or `None` if it overflows `i64`.
    pub fn presentation_time(&self, frame_index: u64) -> Option<PresentationTime> {
        let index = i64::try_from(frame_index).ok()?;
        let value = self.value.checked_mul(index)?;
        Some(PresentationTime {
            value,
            timescale: self.timescale,
        })
    }
}

impl fmt::Display for FrameDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.value, self.timescale)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseFrameDurationError {
    #[error("expected VALUE/TIMESCALE, got {0:?}")]
    Format(String),
    #[error("invalid number in {0:?}")]
    Number(String),
    #[error("duration {0:?} must be positive")]
    NotPositive(String),
}

impl FromStr for FrameDuration {
    type Err = ParseFrameDurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (value, timescale) = s
            .split_once('/')
            .ok_or_else(|| ParseFrameDurationError::Format(s.to_string()))?;
        let value: i64 = value
            .trim()
            .parse()
            .map_err(|_| ParseFrameDurationError::Number(s.to_string()))?;
        let timescale: i32 = timescale
            .trim()
            .parse()
            .map_err(|_| ParseFrameDurationError::Number(s.to_string()))?;

        let duration = FrameDuration::new(value, timescale);
        if !duration.is_valid() {
            return Err(ParseFrameDurationError::NotPositive(s.to_string()));
        }
        Ok(duration)
    }
}

/// Offset at which a frame appears in the output, in `timescale` units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PresentationTime {
    pub value: i64,
    pub timescale: i32,
}

impl PresentationTime {
    pub fn as_secs_f64(&self) -> f64 {
        self.value as f64 / self.timescale as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_presentation_time_is_index_times_duration() {
        let duration = FrameDuration::new(2, 50);
        let pts = duration.presentation_time(7).unwrap();
        assert_eq!(pts.value, 14);
        assert_eq!(pts.timescale, 50);
        assert_relative_eq!(pts.as_secs_f64(), 0.28);
    }

    #[test]
    fn test_first_frame_starts_at_zero() {
        let pts = FrameDuration::new(1, 30).presentation_time(0).unwrap();
        assert_eq!(pts.value, 0);
    }

    #[test]
    fn test_presentation_time_overflow_returns_none() {
        let duration = FrameDuration::new(i64::MAX / 2, 1);
        assert!(duration.presentation_time(3).is_none());
    }

    #[test]
    fn test_frames_per_second() {
        assert_relative_eq!(FrameDuration::new(1001, 30000).frames_per_second(), 29.97, epsilon = 1e-3);
        assert_relative_eq!(FrameDuration::new(1, 25).as_secs_f64(), 0.04);
    }

    #[rstest]
    #[case::zero_value(FrameDuration::new(0, 25), false)]
    #[case::negative_value(FrameDuration::new(-1, 25), false)]
    #[case::zero_timescale(FrameDuration::new(1, 0), false)]
    #[case::pal(FrameDuration::new(1, 25), true)]
    fn test_is_valid(#[case] duration: FrameDuration, #[case] expected: bool) {
        assert_eq!(duration.is_valid(), expected);
    }

    #[test]
    fn test_parse() {
        assert_eq!("1/25".parse::<FrameDuration>().unwrap(), FrameDuration::new(1, 25));
        assert_eq!(" 1001 / 30000 ".parse::<FrameDuration>().unwrap(), FrameDuration::new(1001, 30000));
    }

    #[rstest]
    #[case::no_slash("25")]
    #[case::not_a_number("a/25")]
    #[case::zero_timescale("1/0")]
    #[case::negative("-1/25")]
    fn test_parse_rejects(#[case] input: &str) {
        assert!(input.parse::<FrameDuration>().is_err());
    }

    #[test]
    fn test_display_matches_parse_format() {
        assert_eq!(FrameDuration::new(1, 25).to_string(), "1/25");
    }
}
