//! Time primitives for sampled motion
//!
//! Motion is sampled on a uniform grid. Frame `i` sits at `i / rate`
//! seconds and consecutive frames are `dt = 1 / rate` apart.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{MotionError, MotionResult};

/// Uniform sample rate in frames per second
#[derive(Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct SampleRate(f64);

impl SampleRate {
    /// Create a sample rate, rejecting non-finite or non-positive values
    pub fn new(hz: f64) -> MotionResult<Self> {
        if hz.is_finite() && hz > 0.0 {
            Ok(SampleRate(hz))
        } else {
            Err(MotionError::InvalidSampleRate(hz))
        }
    }

    #[inline]
    pub fn hz(self) -> f64 {
        self.0
    }

    /// Sample interval in seconds
    #[inline]
    pub fn dt(self) -> f64 {
        1.0 / self.0
    }

    /// Timestamp of a frame in seconds
    #[inline]
    pub fn frame_time(self, frame: usize) -> f64 {
        frame as f64 * self.dt()
    }

    /// Wall duration covered by `frames` samples (first to last)
    pub fn span(self, frames: usize) -> Duration {
        if frames < 2 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frame_time(frames - 1))
    }
}

impl TryFrom<f64> for SampleRate {
    type Error = MotionError;

    fn try_from(hz: f64) -> Result<Self, Self::Error> {
        SampleRate::new(hz)
    }
}

impl From<SampleRate> for f64 {
    fn from(rate: SampleRate) -> f64 {
        rate.0
    }
}

impl std::fmt::Debug for SampleRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}Hz", self.0)
    }
}

impl std::fmt::Display for SampleRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} FPS", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_interval() {
        let rate = SampleRate::new(10.0).unwrap();
        assert!((rate.dt() - 0.1).abs() < 1e-12);
        assert!((rate.frame_time(5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_rates() {
        assert!(SampleRate::new(0.0).is_err());
        assert!(SampleRate::new(-30.0).is_err());
        assert!(SampleRate::new(f64::NAN).is_err());
        assert!(SampleRate::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_span() {
        let rate = SampleRate::new(50.0).unwrap();
        assert_eq!(rate.span(1), Duration::ZERO);
        assert!((rate.span(51).as_secs_f64() - 1.0).abs() < 1e-9);
    }
}
