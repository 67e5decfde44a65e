//! In-process broadcast event bus for live run/approval notifications.
//!
//! Distinct from the durable `Event` audit row persisted by `courier-storage`:
//! this bus exists only to fan live notifications out to in-process
//! listeners such as the HTTP admin surface, and carries no history once a
//! subscriber lags past the channel capacity.
//!
//! # Example
//!
//! ```rust
//! use courier_events::{EventBus, CourierEvent, EventMetadata};
//! use chrono::Utc;
//!
//! # async fn example() {
//! let bus = EventBus::new();
//! let mut receiver = bus.subscribe();
//!
//! bus.publish(CourierEvent::ScheduledActionFired {
//!     metadata: EventMetadata::new("scheduler", Utc::now()),
//!     action_id: "abc123".to_string(),
//! });
//!
//! let event = receiver.recv().await.unwrap();
//! assert_eq!(event.event_type(), "scheduled_action_fired");
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod bus;
mod event;

pub use bus::{EventBus, EventReceiver, DEFAULT_CHANNEL_CAPACITY};
pub use event::{CourierEvent, EventMetadata};
