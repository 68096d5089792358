//! # Samphire Core
//!
//! Drift-corrected sample-stream timing and interrupt emission.
//!
//! ## Overview
//!
//! A streaming source delivers samples in batches, and the only wall-clock
//! truth a consumer ever sees is sporadic and approximate: a reference tag
//! pairing one sample with a timestamp now and then, plus the jittery
//! system time at which each batch happens to be processed. The source's
//! sample clock and the host clock also drift apart. This crate keeps a
//! continuously corrected estimate of the mapping between sample index and
//! wall-clock time, and uses it to fire a notification at a requested
//! instant with less error than "whenever the nearest sample gets
//! processed":
//!
//! - **[`timebase`]**: the sample/wall-clock mapping with a first-order
//!   drift tracking loop that filters scheduling noise while following
//!   real clock-rate mismatch.
//! - **[`interrupt_emitter`]**: single-slot trigger scheduling — late,
//!   on-time, and anticipated (early, wall-clock-estimated) firing.
//! - **[`mailbox`]**: atomic hand-off of trigger requests from the host's
//!   message transport into the processing pass.
//! - **[`config`]** / **[`observe`]**: YAML configuration and structured
//!   logging.
//!
//! ## Control Flow
//!
//! ```text
//! host pass: [samples first..=last] (+ optional reference tag, system time)
//!        │
//!        ▼
//! TimeBase::observe ──► TriggerMailbox::take ──► TriggerScheduler::evaluate
//!   (drift loop)           (absorb request)        (late / on-time /
//!                                                   anticipated / keep)
//!                                                         │
//!                                                         ▼
//!                                                 Option<Notification>
//! ```
//!
//! ## Example
//!
//! ```rust
//! use samphire_core::prelude::*;
//!
//! let mut emitter = InterruptEmitter::new(48_000.0, false, 0.01).unwrap();
//!
//! // First pass carries the host's reference tag: sample 0 at t = 10.0 s.
//! let tag = TimeTag::new(0, 10, 0.0);
//! assert!(emitter.work(0, 4800, Some(&tag), 10.1).is_none());
//!
//! // Ask for an interrupt at sample 12000 (t = 10.25 s).
//! emitter.request(TriggerRequest::at_sample(12_000));
//!
//! // The target arrives before the next pass would (~10.3 s), so the
//! // emitter fires early instead of waiting for sample 12000 to be
//! // processed.
//! let fired = emitter.work(4800, 4800, None, 10.2).unwrap();
//! assert_eq!(fired.trigger_sample, 9599);
//! assert!(fired.late_delta < 0.0);
//! ```

pub mod config;
pub mod interrupt_emitter;
pub mod mailbox;
pub mod observe;
pub mod timebase;
pub mod types;

// Re-export main types
pub use config::{ConfigError, EmitterConfig};
pub use interrupt_emitter::{InterruptEmitter, PendingTrigger, TimeTag, TriggerScheduler};
pub use mailbox::TriggerMailbox;
pub use timebase::{TimeBase, TimeReference, DEFAULT_LOOP_GAIN};
pub use types::{EmitterError, EmitterResult, Notification, TimeValue, TriggerRequest};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::EmitterConfig;
    pub use crate::interrupt_emitter::{InterruptEmitter, TimeTag};
    pub use crate::timebase::TimeBase;
    pub use crate::types::{Notification, TimeValue, TriggerRequest};
}
