//! Drift-Corrected Time Base
//!
//! Maintains the current best mapping between absolute sample index and
//! wall-clock time for a streaming source. The source's nominal sample rate
//! and the host clock are never perfectly synchronized, and the host's
//! timestamps carry scheduling jitter, so the mapping is estimated: each
//! reference observation pairs a sample index with a wall-clock time, and a
//! first-order tracking loop blends the rate implied by successive
//! observations into a unitless correction factor applied to the nominal
//! rate.
//!
//! The loop gain trades convergence speed against noise rejection. With `m`
//! the maximum expected fractional clock-rate drift and `c` the maximal
//! noisy fractional error per observation, the gain should satisfy
//! `gain >= m / (m + c)`.
//!
//! ## Example
//!
//! ```rust
//! use samphire_core::timebase::TimeBase;
//!
//! let mut tb = TimeBase::new(1000.0).unwrap();
//! tb.observe(0, 100.0, false);
//! assert_eq!(tb.time_at(500), 100.5);
//! assert_eq!(tb.sample_at(100.25), 250);
//! ```

use crate::types::{EmitterError, EmitterResult};
use serde::{Deserialize, Serialize};

/// Default drift-tracking loop gain.
pub const DEFAULT_LOOP_GAIN: f64 = 1e-4;

/// A host-supplied pairing of a sample index with the wall-clock time of
/// that sample.
///
/// Treated as ground truth at the instant it arrives; superseded by the
/// next observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeReference {
    /// Sample index the observation refers to.
    pub sample_index: u64,
    /// Wall-clock time of that sample, in seconds.
    pub wall_clock: f64,
}

/// Drift-corrected sample/wall-clock mapping.
///
/// `time_at` and `sample_at` are pure functions of the current state and
/// can be called at any time, including between observations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeBase {
    /// Most recent reference observation.
    reference: Option<TimeReference>,
    /// Configured sample rate in Hz, without drift correction.
    nominal_rate: f64,
    /// Unitless multiplier on the nominal rate, updated only by the
    /// tracking loop and reset to 1.0 on discontinuities.
    rate_correction: f64,
    /// Tracking loop gain in (0, 1].
    loop_gain: f64,
}

impl TimeBase {
    /// Create a time base for the given nominal sample rate.
    pub fn new(nominal_rate: f64) -> EmitterResult<Self> {
        Self::with_loop_gain(nominal_rate, DEFAULT_LOOP_GAIN)
    }

    /// Create a time base with an explicit loop gain.
    pub fn with_loop_gain(nominal_rate: f64, loop_gain: f64) -> EmitterResult<Self> {
        validate_rate(nominal_rate)?;
        validate_gain(loop_gain)?;
        Ok(Self {
            reference: None,
            nominal_rate,
            rate_correction: 1.0,
            loop_gain,
        })
    }

    /// Set the nominal sample rate.
    ///
    /// A rate change without an accompanying reference is assumed to be a
    /// source reconfiguration, not a stream discontinuity: the accumulated
    /// correction is preserved as the best current estimate. The correction
    /// is reset only when no reference has been received yet.
    pub fn set_rate(&mut self, nominal_rate: f64) -> EmitterResult<()> {
        validate_rate(nominal_rate)?;
        self.nominal_rate = nominal_rate;
        if self.reference.is_none() {
            self.rate_correction = 1.0;
        }
        Ok(())
    }

    /// Set the tracking loop gain.
    pub fn set_loop_gain(&mut self, loop_gain: f64) -> EmitterResult<()> {
        validate_gain(loop_gain)?;
        self.loop_gain = loop_gain;
        Ok(())
    }

    /// Ingest one reference observation.
    ///
    /// The first observation, an observation flagged as discontinuous
    /// (stream restart, timestamp overflow correction), or one inconsistent
    /// with continuous playback replaces the reference outright and resets
    /// the rate correction. Any other observation updates the tracking loop
    /// with the instantaneous rate implied by the delta to the previous
    /// reference, then becomes the new reference, so error accumulates from
    /// a moving baseline.
    pub fn observe(&mut self, sample_index: u64, wall_clock: f64, discontinuity: bool) {
        let prev = match self.reference {
            Some(prev) if !discontinuity => prev,
            _ => {
                self.reset_to(sample_index, wall_clock);
                return;
            }
        };

        let delta_samples = sample_index as f64 - prev.sample_index as f64;
        let delta_time = wall_clock - prev.wall_clock;
        if delta_samples <= 0.0 || delta_time <= 0.0 {
            // Non-advancing sample index or wall clock cannot come from
            // continuous playback. Hard reset, no blending.
            self.reset_to(sample_index, wall_clock);
            return;
        }

        let instantaneous_ratio = (delta_samples / delta_time) / self.nominal_rate;
        self.rate_correction = blend(self.rate_correction, instantaneous_ratio, self.loop_gain);
        self.reference = Some(TimeReference {
            sample_index,
            wall_clock,
        });
    }

    /// Wall-clock time of the given sample index, in seconds.
    ///
    /// Before any observation, the stream origin (sample 0 at time 0.0) is
    /// assumed.
    pub fn time_at(&self, sample_index: u64) -> f64 {
        let r = self.origin();
        r.wall_clock + (sample_index as f64 - r.sample_index as f64) / self.effective_rate()
    }

    /// Earliest sample index at or after the given wall-clock time.
    ///
    /// Saturates at sample 0 for times before the extrapolated stream
    /// origin.
    pub fn sample_at(&self, wall_clock: f64) -> u64 {
        let r = self.origin();
        let offset = ((wall_clock - r.wall_clock) * self.effective_rate()).ceil();
        let sample = r.sample_index as f64 + offset;
        if sample <= 0.0 {
            0
        } else {
            sample as u64
        }
    }

    /// Drift-corrected sample rate in Hz.
    #[inline]
    pub fn effective_rate(&self) -> f64 {
        self.nominal_rate * self.rate_correction
    }

    /// Configured nominal sample rate in Hz.
    #[inline]
    pub fn nominal_rate(&self) -> f64 {
        self.nominal_rate
    }

    /// Current rate-correction multiplier.
    #[inline]
    pub fn rate_correction(&self) -> f64 {
        self.rate_correction
    }

    /// Current loop gain.
    #[inline]
    pub fn loop_gain(&self) -> f64 {
        self.loop_gain
    }

    /// Most recent reference observation, if any.
    #[inline]
    pub fn reference(&self) -> Option<TimeReference> {
        self.reference
    }

    fn origin(&self) -> TimeReference {
        self.reference.unwrap_or(TimeReference {
            sample_index: 0,
            wall_clock: 0.0,
        })
    }

    fn reset_to(&mut self, sample_index: u64, wall_clock: f64) {
        self.reference = Some(TimeReference {
            sample_index,
            wall_clock,
        });
        self.rate_correction = 1.0;
    }
}

/// First-order IIR blend of a new estimate into the running state.
///
/// Kept as a free function so the loop update is testable in isolation.
#[inline]
pub fn blend(state: f64, estimate: f64, gain: f64) -> f64 {
    state + gain * (estimate - state)
}

fn validate_rate(rate: f64) -> EmitterResult<()> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(EmitterError::InvalidRate(rate));
    }
    Ok(())
}

fn validate_gain(gain: f64) -> EmitterResult<()> {
    if !gain.is_finite() || gain <= 0.0 || gain > 1.0 {
        return Err(EmitterError::InvalidLoopGain(gain));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_rate() {
        assert!(TimeBase::new(0.0).is_err());
        assert!(TimeBase::new(-48000.0).is_err());
        assert!(TimeBase::new(f64::NAN).is_err());
        assert!(TimeBase::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_rejects_invalid_gain() {
        assert!(TimeBase::with_loop_gain(1000.0, 0.0).is_err());
        assert!(TimeBase::with_loop_gain(1000.0, -0.1).is_err());
        assert!(TimeBase::with_loop_gain(1000.0, 1.5).is_err());
        assert!(TimeBase::with_loop_gain(1000.0, 1.0).is_ok());
    }

    #[test]
    fn test_first_observation_sets_reference() {
        let mut tb = TimeBase::new(1000.0).unwrap();
        assert_eq!(tb.reference(), None);
        tb.observe(500, 10.0, false);
        let r = tb.reference().unwrap();
        assert_eq!(r.sample_index, 500);
        assert_eq!(r.wall_clock, 10.0);
        assert_eq!(tb.rate_correction(), 1.0);
    }

    #[test]
    fn test_time_at_before_any_observation() {
        let tb = TimeBase::new(1000.0).unwrap();
        assert_eq!(tb.time_at(1000), 1.0);
        assert_eq!(tb.sample_at(0.5), 500);
    }

    #[test]
    fn test_time_at_and_sample_at_inverse() {
        let mut tb = TimeBase::new(1000.0).unwrap();
        tb.observe(2000, 100.0, false);
        let t = tb.time_at(2500);
        assert!((t - 100.5).abs() < 1e-12);
        assert_eq!(tb.sample_at(t), 2500);
    }

    #[test]
    fn test_sample_at_rounds_up_to_next_sample() {
        let mut tb = TimeBase::new(1000.0).unwrap();
        tb.observe(0, 0.0, false);
        // 0.2501 s falls between samples 250 and 251; the earliest sample
        // at or after that time is 251.
        assert_eq!(tb.sample_at(0.2501), 251);
        assert_eq!(tb.sample_at(0.25), 250);
    }

    #[test]
    fn test_sample_at_saturates_before_origin() {
        let mut tb = TimeBase::new(1000.0).unwrap();
        tb.observe(100, 10.0, false);
        assert_eq!(tb.sample_at(0.0), 0);
    }

    #[test]
    fn test_time_at_is_monotonic() {
        let mut tb = TimeBase::with_loop_gain(1000.0, 0.1).unwrap();
        tb.observe(0, 0.0, false);
        tb.observe(1001, 1.0, false);
        tb.observe(2004, 2.0, false);
        let mut prev = f64::NEG_INFINITY;
        for n in (0..10_000).step_by(97) {
            let t = tb.time_at(n);
            assert!(t >= prev, "time_at must be non-decreasing in n");
            prev = t;
        }
    }

    #[test]
    fn test_drift_convergence_without_noise() {
        // Source actually runs at 1001 Hz against a 1000 Hz nominal rate.
        // With noiseless observations the gain contract allows gain up to
        // 1.0; at 0.05 the correction converges geometrically.
        let mut tb = TimeBase::with_loop_gain(1000.0, 0.05).unwrap();
        for k in 0..400u64 {
            tb.observe(1001 * k, k as f64, false);
        }
        assert!(
            (tb.rate_correction() - 1.001).abs() < 1e-6,
            "correction {} did not converge to 1.001",
            tb.rate_correction()
        );
        assert!((tb.effective_rate() - 1001.0).abs() < 1e-3);
    }

    #[test]
    fn test_single_noisy_observation_is_damped() {
        let mut tb = TimeBase::with_loop_gain(1000.0, 0.01).unwrap();
        tb.observe(0, 0.0, false);
        // A 10% instantaneous rate error moves the correction by at most
        // gain * error.
        tb.observe(1100, 1.0, false);
        assert!((tb.rate_correction() - 1.001).abs() < 1e-9);
    }

    #[test]
    fn test_drift_tracked_through_jitter() {
        // 1000.01 Hz true rate (1e-5 drift) observed through +/- 1 ms of
        // deterministic timestamp jitter at one observation per second.
        let jitter = [0.3, -0.7, 0.9, -0.2, 0.5, -0.9, 0.1, 0.8, -0.4, -0.6];
        let mut tb = TimeBase::with_loop_gain(1000.0, 0.01).unwrap();
        for k in 0..2000u64 {
            let samples = (1000.01 * k as f64).round() as u64;
            let t = k as f64 + 1e-3 * jitter[(k % 10) as usize];
            tb.observe(samples, t, false);
        }
        let err = (tb.rate_correction() - 1.00001).abs();
        assert!(err < 5e-4, "correction error {} too large", err);
    }

    #[test]
    fn test_discontinuity_resets_correction() {
        let mut tb = TimeBase::with_loop_gain(1000.0, 0.5).unwrap();
        tb.observe(0, 0.0, false);
        tb.observe(1100, 1.0, false);
        assert!(tb.rate_correction() > 1.0);

        tb.observe(0, 50.0, true);
        assert_eq!(tb.rate_correction(), 1.0);
        let r = tb.reference().unwrap();
        assert_eq!(r.sample_index, 0);
        assert_eq!(r.wall_clock, 50.0);
    }

    #[test]
    fn test_non_monotonic_observation_resets() {
        let mut tb = TimeBase::with_loop_gain(1000.0, 0.5).unwrap();
        tb.observe(1000, 1.0, false);
        tb.observe(2100, 2.0, false);
        assert!(tb.rate_correction() != 1.0);

        // Wall clock went backwards without a discontinuity flag.
        tb.observe(3000, 1.5, false);
        assert_eq!(tb.rate_correction(), 1.0);
    }

    #[test]
    fn test_set_rate_preserves_correction_with_reference() {
        let mut tb = TimeBase::with_loop_gain(1000.0, 0.5).unwrap();
        tb.observe(0, 0.0, false);
        tb.observe(1100, 1.0, false);
        let correction = tb.rate_correction();
        assert!(correction != 1.0);

        tb.set_rate(2000.0).unwrap();
        assert_eq!(tb.rate_correction(), correction);
        assert_eq!(tb.nominal_rate(), 2000.0);
    }

    #[test]
    fn test_set_rate_resets_correction_without_reference() {
        let mut tb = TimeBase::new(1000.0).unwrap();
        tb.set_rate(48000.0).unwrap();
        assert_eq!(tb.rate_correction(), 1.0);
        assert!(tb.set_rate(-1.0).is_err());
    }

    #[test]
    fn test_blend_is_convex() {
        assert_eq!(blend(1.0, 2.0, 1.0), 2.0);
        assert_eq!(blend(1.0, 2.0, 0.5), 1.5);
        assert!((blend(1.0, 1.0 + 1e-3, 1e-4) - 1.0 - 1e-7).abs() < 1e-15);
    }
}
