//! Thread-local runtime context.
//!
//! The runtime's state is owned by a [`Runtime`](crate::Runtime) instance. While the
//! runtime starts a task or drives its timers, it installs that state here so that
//! suspension points ([`sleep`](crate::sleep), [`Task::wait`](crate::Task::wait)) and
//! nested [`Task::start`](crate::Task::start) calls can reach it without an explicit
//! handle. The previous context is restored on exit, so runtimes can nest.

use crate::task::{Resume, TaskState};
use crate::time::Clock;
use crate::timer::TimerQueue;
use crate::utils::slab::{Key, Slab};

use log::trace;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::task::Waker;

/// State shared by a runtime and every frame started on it.
pub(crate) struct Shared {
    pub(crate) timers: RefCell<TimerQueue<Waker>>,
    pub(crate) frames: RefCell<Slab<Weak<dyn Resume>>>,
    pub(crate) clock: Box<dyn Clock>,

    /// How the frame currently being polled suspended, set by the suspension point
    /// right before it returns `Pending`.
    suspension: Cell<Option<TaskState>>,
}

impl Shared {
    pub(crate) fn new(clock: Box<dyn Clock>) -> Self {
        Self {
            timers: RefCell::new(TimerQueue::new()),
            frames: RefCell::new(Slab::new()),
            clock,
            suspension: Cell::new(None),
        }
    }

    pub(crate) fn note_suspension(&self, state: TaskState) {
        self.suspension.set(Some(state));
    }

    pub(crate) fn take_suspension(&self) -> Option<TaskState> {
        self.suspension.take()
    }

    /// Puts back a marker saved by [`take_suspension`](Self::take_suspension).
    pub(crate) fn restore_suspension(&self, marker: Option<TaskState>) {
        self.suspension.set(marker);
    }
}

thread_local! {
    /// Runtime state installed by [`enter_context`].
    static CURRENT: RefCell<Option<Rc<Shared>>> = const { RefCell::new(None) };
}

/// Runs `function` with `shared` installed as the current runtime context.
pub(crate) fn enter_context<F, R>(shared: Rc<Shared>, function: F) -> R
where
    F: FnOnce() -> R,
{
    let previous = CURRENT.with(|current| current.borrow_mut().replace(shared));

    let result = function();

    CURRENT.with(|current| *current.borrow_mut() = previous);

    result
}

/// Returns the current runtime state, if inside a runtime context.
pub(crate) fn current() -> Option<Rc<Shared>> {
    CURRENT.with(|current| current.borrow().clone())
}

/// Resumes the frame registered under `key` in the current context.
///
/// Does nothing if there is no context or the frame has been destroyed.
pub(crate) fn resume_frame(key: Key) {
    // Release every borrow before resuming: the frame may start tasks, insert timers
    // or complete and resume its own waiter.
    let frame = current()
        .and_then(|shared| shared.frames.borrow().get(key).cloned())
        .and_then(|weak| weak.upgrade());

    match frame {
        Some(frame) => frame.resume(),
        None => trace!("frame {} is gone, wake ignored", key),
    }
}
