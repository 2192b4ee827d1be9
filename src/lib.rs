//! Minimal cooperative task runtime with eager tasks and a timer-driven driver loop.
//!
//! A [`Task`] starts running the moment it is created and keeps going until it
//! suspends, either on a time delay ([`sleep`]) or on another task ([`Task::wait`]).
//! The [`Runtime`] then resumes timer waits in wake-time order; a task that completes
//! resumes its waiter on the spot.
//!
//! # Architecture
//!
//! - **Runtime**: Owns the timer queue and frame registry, runs the driver loop
//! - **RuntimeBuilder**: Fluent builder, selects the clock
//! - **Task**: Owning handle to one computation frame and its promise
//! - **TimerQueue**: Pending wake-ups ordered by wake time, FIFO among equals
//! - **Clock**: Time source; [`time::SystemClock`] or [`time::VirtualClock`]
//!
//! Everything runs on one thread. There is no preemption, no I/O and no
//! cancellation: a suspended wait always resumes unless its task is dropped.

mod builder;
mod error;
mod runtime;
mod task;
pub mod time;
mod timer;
mod utils;

pub use builder::RuntimeBuilder;
pub use error::TaskError;
pub use runtime::Runtime;
pub use task::{Task, TaskState, Wait};
pub use timer::{Sleep, TimerQueue, sleep};
