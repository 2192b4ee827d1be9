//! Runtime that owns the timer queue and drives suspended tasks to quiescence.

use crate::error::TaskError;
use crate::runtime::context::{Shared, enter_context};
use crate::task::Task;
use crate::time::{Clock, SystemClock};

use log::{debug, trace};
use std::future::Future;
use std::rc::Rc;

/// Single-threaded, timer-driven task runtime.
///
/// Tasks are started with [`Runtime::start`] and run eagerly until their first
/// suspension point. [`Runtime::run`] then resumes timer waits in wake-time order until
/// nothing is left pending.
///
/// Dropping the runtime discards any timer entries that never fired.
///
/// # Example
/// ```ignore
/// use cadence::{Runtime, sleep};
/// use std::time::Duration;
///
/// let mut rt = Runtime::new();
/// let mut task = rt.start(async {
///     sleep(Duration::from_millis(10)).await;
///     42
/// });
/// rt.run();
/// assert_eq!(task.get(), Ok(42));
/// ```
pub struct Runtime {
    shared: Rc<Shared>,
}

impl Runtime {
    /// Creates a runtime on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Box::new(SystemClock::new()))
    }

    pub(crate) fn with_clock(clock: Box<dyn Clock>) -> Self {
        Self {
            shared: Rc::new(Shared::new(clock)),
        }
    }

    /// Starts `body` on this runtime and returns its handle.
    ///
    /// The body runs synchronously until it first suspends or completes, before this
    /// method returns.
    pub fn start<F>(&self, body: F) -> Task<F::Output>
    where
        F: Future + 'static,
        F::Output: 'static,
    {
        enter_context(self.shared.clone(), || Task::start_in(&self.shared, body))
    }

    /// Resumes pending timer waits until the timer queue is empty.
    ///
    /// When the earliest entry is not due yet the thread idles on the clock until it is.
    /// A resumed task may complete dependent tasks inline and queue new timers before
    /// control comes back here.
    pub fn run(&mut self) {
        let shared = self.shared.clone();

        enter_context(shared.clone(), || {
            loop {
                let now = shared.clock.now();
                let due = shared.timers.borrow_mut().extract_if_due(now);

                if let Some(waker) = due {
                    trace!("timer due at {:?}", now);
                    waker.wake();
                    continue;
                }

                let next = shared.timers.borrow().peek_earliest().map(|(at, _)| at);
                match next {
                    Some(wake_time) => {
                        debug!("idle until {:?}", wake_time);
                        shared.clock.sleep_until(wake_time);
                    }
                    None => break,
                }
            }
        });

        debug!(
            "timer queue drained, {} frame(s) still alive",
            self.shared.frames.borrow().len()
        );
    }

    /// Starts `body`, drives the runtime to quiescence and returns the body's value.
    ///
    /// Fails with [`TaskError::UnsetValueRead`] if the body is still suspended when the
    /// timer queue runs dry, e.g. waiting on a task that was destroyed.
    pub fn block_on<F>(&mut self, body: F) -> Result<F::Output, TaskError>
    where
        F: Future + 'static,
        F::Output: 'static,
    {
        let mut task = self.start(body);
        self.run();
        task.get()
    }

    /// Number of timer entries waiting to fire.
    pub fn pending_timers(&self) -> usize {
        self.shared.timers.borrow().len()
    }

    /// Current time on this runtime's clock.
    pub fn now(&self) -> std::time::Duration {
        self.shared.clock.now()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}
