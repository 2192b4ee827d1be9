#![allow(dead_code)]

use cadence::time::VirtualClock;
use cadence::{Runtime, RuntimeBuilder};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

/// Runtime on a virtual clock, plus a handle to that clock.
pub fn virtual_runtime() -> (Runtime, VirtualClock) {
    init_logging();

    let clock = VirtualClock::new();
    let rt = RuntimeBuilder::new().clock(clock.clone()).build();

    (rt, clock)
}

/// Shared, append-only record of side effects.
#[derive(Clone, Default)]
pub struct Log(Rc<RefCell<Vec<String>>>);

impl Log {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.borrow_mut().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }
}
