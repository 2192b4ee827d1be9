//! Fluent builder for Runtime construction.

use crate::runtime::Runtime;
use crate::time::{Clock, SystemClock};

/// Builder for [`Runtime`] instances.
///
/// # Example
/// ```ignore
/// use cadence::{RuntimeBuilder, time::VirtualClock};
///
/// let clock = VirtualClock::new();
/// let rt = RuntimeBuilder::new().clock(clock.clone()).build();
/// ```
pub struct RuntimeBuilder {
    clock: Box<dyn Clock>,
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeBuilder {
    /// Creates a builder using the system clock.
    pub fn new() -> Self {
        Self {
            clock: Box::new(SystemClock::new()),
        }
    }

    /// Replaces the time source used for wake times and idling.
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Builds the runtime. Its timer queue starts empty.
    pub fn build(self) -> Runtime {
        Runtime::with_clock(self.clock)
    }
}
