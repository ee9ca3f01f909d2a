//! # Subscriber trait
//!
//! [`Subscribe`] is how code outside the runtime observes alarms: created,
//! replaced, displayed and cancelled requests, plus worker and shutdown
//! progress. Each subscriber gets its own bounded queue and task inside the
//! [`SubscriberSet`](crate::subscribers::SubscriberSet), so a slow one never
//! delays the dispatcher or the display workers.
//!
//! A subscriber only receives the kinds it [`accepts`](Subscribe::accepts);
//! filtered events never occupy its queue. When the queue is full the event is
//! dropped for that subscriber and counted.
//!
//! ## Example
//! ```rust
//! use alarmvisor::{Event, EventKind, Subscribe};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! #[derive(Default)]
//! struct DisplayCounter(AtomicUsize);
//!
//! #[async_trait::async_trait]
//! impl Subscribe for DisplayCounter {
//!     async fn on_event(&self, _ev: &Event) {
//!         self.0.fetch_add(1, Ordering::Relaxed);
//!     }
//!     fn accepts(&self, kind: EventKind) -> bool {
//!         kind == EventKind::AlarmDisplayed
//!     }
//!     fn name(&self) -> &'static str { "display-counter" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};

/// Observer of alarm runtime events.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one accepted event.
    async fn on_event(&self, event: &Event);

    /// Whether events of `kind` are queued for this subscriber at all.
    fn accepts(&self, _kind: EventKind) -> bool {
        true
    }

    /// Name used in logs and for [`SubscriberSet::dropped`](crate::SubscriberSet::dropped).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn queue_capacity(&self) -> usize {
        1024
    }
}
