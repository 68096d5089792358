//! Single-Slot Trigger Mailbox
//!
//! Carries at most one trigger request across the boundary between the
//! host's message transport and the processing pass. Requests may be
//! posted from any thread; the emitter absorbs the slot atomically at pass
//! boundaries, so a request is never observed partially applied and at
//! most one trigger is ever pending per evaluation. Posting while a
//! request is waiting replaces it; the displaced request is handed back to
//! the caller.
//!
//! ## Example
//!
//! ```rust
//! use samphire_core::mailbox::TriggerMailbox;
//! use samphire_core::types::TriggerRequest;
//!
//! let mailbox = TriggerMailbox::new();
//! assert!(mailbox.post(TriggerRequest::at_sample(100)).is_none());
//! let displaced = mailbox.post(TriggerRequest::at_sample(200));
//! assert!(displaced.is_some());
//! assert_eq!(mailbox.take().unwrap().target, samphire_core::types::TimeValue::Sample(200));
//! assert!(mailbox.take().is_none());
//! ```

use crate::types::TriggerRequest;
use std::sync::Mutex;

/// Thread-safe single-slot mailbox for trigger requests.
#[derive(Debug, Default)]
pub struct TriggerMailbox {
    slot: Mutex<Option<TriggerRequest>>,
}

impl TriggerMailbox {
    /// Create an empty mailbox.
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Post a request, replacing any unabsorbed one.
    ///
    /// Returns the displaced request, if any.
    pub fn post(&self, request: TriggerRequest) -> Option<TriggerRequest> {
        self.slot.lock().unwrap().replace(request)
    }

    /// Take the waiting request, leaving the slot empty.
    pub fn take(&self) -> Option<TriggerRequest> {
        self.slot.lock().unwrap().take()
    }

    /// Check whether a request is waiting.
    pub fn is_empty(&self) -> bool {
        self.slot.lock().unwrap().is_none()
    }
}
