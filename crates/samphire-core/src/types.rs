//! Core types for timed interrupt emission
//!
//! This module defines the time-value forms a trigger request may carry,
//! the request and notification payloads exchanged with the host runtime,
//! and the crate error type.
//!
//! A target time can be named three ways: as an absolute sample index into
//! the stream, as a single wall-clock seconds value, or as a split
//! whole/fractional seconds pair. The split form preserves full
//! integer-second precision for large epoch timestamps, where a single
//! `f64` has already lost sub-microsecond resolution.

use serde::{Deserialize, Serialize};

/// Result type for emitter operations
pub type EmitterResult<T> = Result<T, EmitterError>;

/// Errors that can occur configuring or driving the emitter
#[derive(Debug, Clone, thiserror::Error)]
pub enum EmitterError {
    #[error("Invalid sample rate: {0} Hz. Must be positive and finite")]
    InvalidRate(f64),

    #[error("Invalid loop gain: {0}. Must be in (0, 1]")]
    InvalidLoopGain(f64),
}

/// A point in time, in one of the forms a trigger request may use.
///
/// Wall-clock forms are seconds on the host's absolute epoch (the same
/// epoch the host uses for its reference time tags, typically Unix time).
/// The combined and split forms denote the same quantity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeValue {
    /// Absolute sample index.
    Sample(u64),
    /// Absolute wall-clock time as a single seconds value.
    Seconds(f64),
    /// Absolute wall-clock time as whole seconds plus a fraction in [0, 1).
    SplitSeconds {
        /// Whole seconds.
        secs: u64,
        /// Fractional seconds.
        frac: f64,
    },
}

impl TimeValue {
    /// Wall-clock seconds, if this is one of the wall-clock forms.
    pub fn as_seconds(&self) -> Option<f64> {
        match *self {
            TimeValue::Sample(_) => None,
            TimeValue::Seconds(secs) => Some(secs),
            TimeValue::SplitSeconds { secs, frac } => Some(secs as f64 + frac),
        }
    }

    /// Check whether this is the sample-index form.
    pub fn is_sample(&self) -> bool {
        matches!(self, TimeValue::Sample(_))
    }
}

/// A request to emit one notification at a target time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriggerRequest {
    /// Target time of the requested notification.
    pub target: TimeValue,
    /// Per-request override of the configured late-drop policy.
    #[serde(default)]
    pub drop_if_late: Option<bool>,
}

impl TriggerRequest {
    /// Request a trigger at an absolute sample index.
    pub fn at_sample(sample_index: u64) -> Self {
        Self {
            target: TimeValue::Sample(sample_index),
            drop_if_late: None,
        }
    }

    /// Request a trigger at a wall-clock time in seconds.
    pub fn at_seconds(secs: f64) -> Self {
        Self {
            target: TimeValue::Seconds(secs),
            drop_if_late: None,
        }
    }

    /// Request a trigger at a split whole/fractional wall-clock time.
    pub fn at_split_seconds(secs: u64, frac: f64) -> Self {
        Self {
            target: TimeValue::SplitSeconds { secs, frac },
            drop_if_late: None,
        }
    }

    /// Override the configured late-drop policy for this request.
    pub fn drop_if_late(mut self, drop: bool) -> Self {
        self.drop_if_late = Some(drop);
        self
    }
}

/// Notification emitted when a trigger resolves.
///
/// Produced exactly once per resolved, non-dropped trigger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// The requested target time, echoed in its original form.
    pub trigger_time: TimeValue,
    /// Sample index at or after which the firing occurred.
    pub trigger_sample: u64,
    /// Actual firing time minus requested time, in seconds. Positive when
    /// the trigger fired late, negative when it fired early (anticipated).
    pub late_delta: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_value_as_seconds() {
        assert_eq!(TimeValue::Sample(42).as_seconds(), None);
        assert_eq!(TimeValue::Seconds(1.5).as_seconds(), Some(1.5));
        let split = TimeValue::SplitSeconds {
            secs: 100,
            frac: 0.25,
        };
        assert_eq!(split.as_seconds(), Some(100.25));
    }

    #[test]
    fn test_split_seconds_preserves_large_epochs() {
        // A 2030-era Unix timestamp with a 1 us fraction survives the split
        // representation even though secs + frac rounds in f64.
        let split = TimeValue::SplitSeconds {
            secs: 1_900_000_000,
            frac: 1e-6,
        };
        let combined = split.as_seconds().unwrap();
        assert!((combined - 1_900_000_000.0).abs() < 1e-3);
    }

    #[test]
    fn test_request_builders() {
        let req = TriggerRequest::at_sample(500);
        assert_eq!(req.target, TimeValue::Sample(500));
        assert_eq!(req.drop_if_late, None);

        let req = TriggerRequest::at_seconds(2.5).drop_if_late(true);
        assert_eq!(req.drop_if_late, Some(true));
        assert!(!req.target.is_sample());
    }

    #[test]
    fn test_request_serde_roundtrip() {
        let req = TriggerRequest::at_split_seconds(1000, 0.5).drop_if_late(false);
        let yaml = serde_yaml::to_string(&req).unwrap();
        let parsed: TriggerRequest = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, req);
    }

    #[test]
    fn test_error_display() {
        let err = EmitterError::InvalidRate(-1.0);
        assert!(err.to_string().contains("-1"));
        let err = EmitterError::InvalidLoopGain(0.0);
        assert!(err.to_string().contains("(0, 1]"));
    }
}
