//! Runtime subsystem modules.

pub(crate) mod context;
mod core;
pub(crate) mod waker;

pub use self::core::Runtime;
pub(crate) use waker::make_waker;
