//! Interrupt Emitter — timed notification against a sample stream
//!
//! Emits a single notification at a requested time, named either as an
//! absolute sample index or as an absolute wall-clock time. For
//! applications needing an interrupt-like event to wake or trigger
//! functionality, waiting for the target sample to be processed quantizes
//! the firing instant to the host's batch cadence; using the system time as
//! a reference point, the emitter can fire more accurately without actually
//! processing the sample nearest in time to the request.
//! GNU Radio equivalent: `interrupt_emitter` (gr-timing-utils).
//!
//! Each processing pass updates the drift-corrected [`TimeBase`] (from a
//! host reference tag when one is present, otherwise from the system
//! timestamp associated with the pass), absorbs at most one trigger request
//! from the mailbox, and evaluates the pending trigger against the range of
//! samples just processed. A pending trigger resolves one of three ways:
//!
//! - **late**: the target fell before this pass — fire immediately on the
//!   first processed sample (positive `late_delta`), or drop silently when
//!   the late-drop policy applies;
//! - **on time**: the target falls inside the pass — fire on the target
//!   sample;
//! - **anticipated**: the target lies beyond the pass but its wall-clock
//!   time is expected before the host's next invocation — fire now on the
//!   last processed sample (negative `late_delta`) instead of waiting a
//!   whole batch.
//!
//! ## Example
//!
//! ```rust
//! use samphire_core::interrupt_emitter::{InterruptEmitter, TimeTag};
//! use samphire_core::types::TriggerRequest;
//!
//! let mut emitter = InterruptEmitter::new(1000.0, false, 1e-4).unwrap();
//! emitter.request(TriggerRequest::at_sample(500));
//!
//! // Host processes samples [0, 999]; sample 0 carries a reference tag.
//! let tag = TimeTag::new(0, 100, 0.0);
//! let fired = emitter.work(0, 1000, Some(&tag), 101.0).unwrap();
//! assert_eq!(fired.trigger_sample, 500);
//! assert_eq!(fired.late_delta, 0.0);
//! ```

use crate::mailbox::TriggerMailbox;
use crate::timebase::TimeBase;
use crate::types::{EmitterResult, Notification, TimeValue, TriggerRequest};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Reference time tag attached by the host to a specific sample.
///
/// Carries the split whole/fractional seconds form used by stream tags.
/// `discontinuity` marks stream restarts and timestamp overflow
/// corrections; the time base resets rather than smooths across them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeTag {
    /// Absolute index of the tagged sample.
    pub offset: u64,
    /// Whole seconds of the tagged sample's wall-clock time.
    pub secs: u64,
    /// Fractional seconds in [0, 1).
    pub frac: f64,
    /// Whether this tag follows a stream restart or overflow correction.
    pub discontinuity: bool,
}

impl TimeTag {
    /// Tag for a continuous stream.
    pub fn new(offset: u64, secs: u64, frac: f64) -> Self {
        Self {
            offset,
            secs,
            frac,
            discontinuity: false,
        }
    }

    /// Tag following a stream restart or overflow correction.
    pub fn discontinuous(offset: u64, secs: u64, frac: f64) -> Self {
        Self {
            offset,
            secs,
            frac,
            discontinuity: true,
        }
    }

    /// Wall-clock seconds of the tagged sample.
    pub fn seconds(&self) -> f64 {
        self.secs as f64 + self.frac
    }
}

/// A trigger request converted into the sample domain and awaiting
/// resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingTrigger {
    /// Target sample index the trigger resolves against.
    pub target_sample_index: u64,
    /// The request's target in its original form, echoed on firing.
    pub original_request: TimeValue,
    /// Resolved late-drop policy for this trigger.
    pub drop_if_late: bool,
}

/// Single-slot trigger scheduling against a [`TimeBase`].
///
/// Holds at most one pending trigger; submitting while one is pending
/// replaces it. Decoupled from the block plumbing so the resolution policy
/// is directly unit-testable.
#[derive(Debug, Clone)]
pub struct TriggerScheduler {
    pending: Option<PendingTrigger>,
    default_drop_late: bool,
}

impl TriggerScheduler {
    /// Create a scheduler with the given default late-drop policy.
    pub fn new(default_drop_late: bool) -> Self {
        Self {
            pending: None,
            default_drop_late,
        }
    }

    /// Convert a request into the sample domain with the current time base
    /// and store it as the sole pending trigger.
    ///
    /// Wall-clock targets are converted once, at submission; the literal
    /// index is used for sample-form targets. Returns the displaced
    /// request when one was already pending. A target already in the past
    /// is not rejected here; it resolves through [`evaluate`] as late or
    /// dropped, since the time base may itself still be settling.
    ///
    /// [`evaluate`]: TriggerScheduler::evaluate
    pub fn submit(
        &mut self,
        request: TriggerRequest,
        timebase: &TimeBase,
    ) -> Option<TriggerRequest> {
        let target_sample_index = match request.target {
            TimeValue::Sample(n) => n,
            TimeValue::Seconds(secs) => timebase.sample_at(secs),
            TimeValue::SplitSeconds { secs, frac } => timebase.sample_at(secs as f64 + frac),
        };
        let displaced = self.pending.replace(PendingTrigger {
            target_sample_index,
            original_request: request.target,
            drop_if_late: request.drop_if_late.unwrap_or(self.default_drop_late),
        });
        displaced.map(|p| TriggerRequest {
            target: p.original_request,
            drop_if_late: Some(p.drop_if_late),
        })
    }

    /// Currently pending trigger, if any.
    pub fn pending(&self) -> Option<&PendingTrigger> {
        self.pending.as_ref()
    }

    /// Default late-drop policy applied to requests without an override.
    pub fn default_drop_late(&self) -> bool {
        self.default_drop_late
    }

    /// Resolve the pending trigger against one processed batch.
    ///
    /// `first` and `last` bound the sample range just processed and `now`
    /// is the wall-clock estimate associated with this pass. Called once
    /// per batch, after the time base has absorbed any reference update.
    /// Returns at most one notification.
    pub fn evaluate(
        &mut self,
        first: u64,
        last: u64,
        now: f64,
        timebase: &TimeBase,
    ) -> Option<Notification> {
        if last < first {
            return None;
        }
        let trigger = *self.pending.as_ref()?;
        let target = trigger.target_sample_index;

        if target < first {
            // Fully in the past relative to this batch.
            self.pending = None;
            if trigger.drop_if_late {
                tracing::debug!(target_sample = target, first, "late trigger dropped");
                return None;
            }
            return Some(Notification {
                trigger_time: trigger.original_request,
                trigger_sample: first,
                late_delta: timebase.time_at(first) - timebase.time_at(target),
            });
        }

        if target <= last {
            self.pending = None;
            let late_delta = match trigger.original_request.as_seconds() {
                // Residual from rounding the wall-clock target up to a
                // whole sample.
                Some(requested) => timebase.time_at(target) - requested,
                None => 0.0,
            };
            return Some(Notification {
                trigger_time: trigger.original_request,
                trigger_sample: target,
                late_delta,
            });
        }

        // Target beyond this batch. If its wall-clock time is expected
        // before the host's next invocation, fire now from the time-base
        // estimate rather than waiting a whole batch period.
        let batch_duration = (last - first + 1) as f64 / timebase.effective_rate();
        let next_invocation = now + batch_duration;
        if timebase.time_at(target) < next_invocation {
            self.pending = None;
            return Some(Notification {
                trigger_time: trigger.original_request,
                trigger_sample: last,
                late_delta: timebase.time_at(last) - timebase.time_at(target),
            });
        }

        None
    }
}

/// Interrupt emitter block: drift-corrected time base plus single-slot
/// trigger scheduling over a processed sample stream.
///
/// The host drives [`work`] once per batch of processed samples; trigger
/// requests arrive through [`request`] (or a shared [`mailbox`] handle)
/// from any thread and are absorbed at the next pass boundary.
///
/// [`work`]: InterruptEmitter::work
/// [`request`]: InterruptEmitter::request
/// [`mailbox`]: InterruptEmitter::mailbox
#[derive(Debug)]
pub struct InterruptEmitter {
    timebase: TimeBase,
    scheduler: TriggerScheduler,
    mailbox: Arc<TriggerMailbox>,
    debug: bool,
}

impl InterruptEmitter {
    /// Create an emitter.
    ///
    /// - `rate`: nominal sample rate in Hz
    /// - `drop_late`: default policy for requests already in the past
    /// - `loop_gain`: clock drift tracking loop gain, in (0, 1]
    pub fn new(rate: f64, drop_late: bool, loop_gain: f64) -> EmitterResult<Self> {
        Ok(Self {
            timebase: TimeBase::with_loop_gain(rate, loop_gain)?,
            scheduler: TriggerScheduler::new(drop_late),
            mailbox: Arc::new(TriggerMailbox::new()),
            debug: false,
        })
    }

    /// Create an emitter from a configuration.
    pub fn from_config(config: &crate::config::EmitterConfig) -> EmitterResult<Self> {
        let mut emitter = Self::new(config.rate, config.drop_late, config.loop_gain)?;
        emitter.set_debug(config.debug);
        Ok(emitter)
    }

    /// Set the stream's nominal sample rate.
    pub fn set_rate(&mut self, rate: f64) -> EmitterResult<()> {
        self.timebase.set_rate(rate)
    }

    /// Set the drift tracking loop gain.
    pub fn set_loop_gain(&mut self, loop_gain: f64) -> EmitterResult<()> {
        self.timebase.set_loop_gain(loop_gain)
    }

    /// Enable verbose per-pass diagnostics.
    pub fn set_debug(&mut self, value: bool) {
        self.debug = value;
    }

    /// Post a trigger request for absorption at the next pass boundary.
    ///
    /// Returns the previously posted request when it had not been absorbed
    /// yet.
    pub fn request(&self, request: TriggerRequest) -> Option<TriggerRequest> {
        let displaced = self.mailbox.post(request);
        if let Some(ref old) = displaced {
            tracing::warn!(displaced = ?old.target, "unabsorbed trigger request replaced");
        }
        displaced
    }

    /// Shared handle for posting requests from other threads.
    pub fn mailbox(&self) -> Arc<TriggerMailbox> {
        Arc::clone(&self.mailbox)
    }

    /// Current time base estimate.
    pub fn timebase(&self) -> &TimeBase {
        &self.timebase
    }

    /// Whether a trigger is pending resolution.
    pub fn has_pending(&self) -> bool {
        self.scheduler.pending().is_some()
    }

    /// Process one batch of `n_samples` samples starting at `first_sample`.
    ///
    /// `tag` is the host's reference time tag for this batch, when one
    /// arrived with it; `now` is the system timestamp observed for this
    /// pass. A pass carrying a tag uses the tag as its time-base
    /// observation (continuous or discontinuous per its flag); a tagless
    /// pass feeds the drift loop with `now` paired against the last sample
    /// of the batch. Returns at most one notification.
    pub fn work(
        &mut self,
        first_sample: u64,
        n_samples: usize,
        tag: Option<&TimeTag>,
        now: f64,
    ) -> Option<Notification> {
        if n_samples == 0 {
            return None;
        }
        let last = first_sample + n_samples as u64 - 1;

        match tag {
            Some(tag) => self.timebase.observe(tag.offset, tag.seconds(), tag.discontinuity),
            None => self.timebase.observe(last, now, false),
        }

        if let Some(request) = self.mailbox.take() {
            if let Some(displaced) = self.scheduler.submit(request, &self.timebase) {
                tracing::warn!(displaced = ?displaced.target, "pending trigger replaced before firing");
            }
        }

        let fired = self.scheduler.evaluate(first_sample, last, now, &self.timebase);
        if self.debug {
            tracing::debug!(
                first = first_sample,
                last,
                rate_correction = self.timebase.rate_correction(),
                pending = self.scheduler.pending().is_some(),
                fired = fired.is_some(),
                "pass evaluated"
            );
        }
        fired
    }
}
