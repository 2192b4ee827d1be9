//! Time sources for the driver loop.
//!
//! Times handed around the runtime are [`Duration`] offsets from the clock's origin,
//! so a wake time is simply `clock.now() + delay`.
//!
//! - [`SystemClock`] follows the monotonic system clock and blocks the thread while idle.
//! - [`VirtualClock`] jumps straight to the next wake time, which makes schedules
//!   deterministic and instant to run.
//!
//! # Example
//!
//! ```ignore
//! use cadence::{RuntimeBuilder, sleep, time::VirtualClock};
//! use std::time::Duration;
//!
//! let clock = VirtualClock::new();
//! let mut rt = RuntimeBuilder::new().clock(clock.clone()).build();
//! rt.block_on(async { sleep(Duration::from_secs(60)).await }).unwrap();
//! assert_eq!(clock.now(), Duration::from_secs(60));
//! ```

mod clock;

pub use clock::{Clock, SystemClock, VirtualClock};
