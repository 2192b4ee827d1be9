//! Eagerly started tasks and the wait-on-task suspension point.
//!
//! A [`Task`] owns one computation frame: the boxed body, its state tag and the
//! promise that receives the body's value. Starting a task polls the body right away,
//! so everything up to its first suspension point happens before the handle is
//! returned.
//!
//! # Suspension
//!
//! A body suspends in exactly two ways:
//!
//! - [`sleep`](crate::sleep) registers the frame with the runtime's timer queue.
//! - [`Task::wait`] registers the frame as the other task's single waiter, unless that
//!   task already has a value, in which case the value is returned without suspending.
//!
//! # Completion
//!
//! When a body returns, its value is stored and the registered waiter, if any, is
//! resumed immediately on the same stack. A chain of dependent tasks therefore
//! unwinds depth-first before control returns to the driver loop.
//!
//! ```ignore
//! use cadence::{Runtime, Task, TaskError, sleep};
//! use std::time::Duration;
//!
//! let mut rt = Runtime::new();
//! let mut sum = rt.start(async {
//!     let a = Task::start(async { sleep(Duration::from_millis(20)).await; 1 });
//!     let b = Task::start(async { sleep(Duration::from_millis(10)).await; 2 });
//!     Ok::<_, TaskError>(a.wait()?.await + b.wait()?.await)
//! });
//! rt.run();
//! assert_eq!(sum.get(), Ok(Ok(3)));
//! ```
//!
//! # Ownership
//!
//! Exactly one handle owns a frame. Dropping it destroys the frame and any stored
//! value, even if the body never finished; pending timer entries and waiter
//! registrations for it then resume nothing.
//!
//! # Panics
//!
//! A panic inside a body is not recoverable: it is logged and the process aborts.

use crate::error::TaskError;
use crate::runtime::context::{self, Shared};
use crate::runtime::make_waker;
use crate::utils::slab::Key;

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use log::{error, trace, warn};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::process;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll, Waker};

/// Where a task's computation currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Created, body not polled yet.
    NotStarted,
    /// Body is being polled.
    Running,
    /// Suspended on [`sleep`](crate::sleep).
    SuspendedOnTimer,
    /// Suspended on another task's completion.
    SuspendedOnTask,
    /// Body returned; the value is (or was) in the promise.
    Completed,
}

/// Resumption entry point of a type-erased frame.
pub(crate) trait Resume {
    fn resume(self: Rc<Self>);
}

enum Slot<T> {
    Empty,
    Ready(T),
    Taken,
}

enum Waiter {
    Vacant,
    /// A [`Wait`] was handed out but has not suspended yet.
    Claimed,
    Registered(Waker),
}

/// Result slot and waiter registration of one frame.
struct Promise<T> {
    slot: Slot<T>,
    waiter: Waiter,
}

impl<T> Promise<T> {
    fn new() -> Self {
        Self {
            slot: Slot::Empty,
            waiter: Waiter::Vacant,
        }
    }

    fn is_set(&self) -> bool {
        !matches!(self.slot, Slot::Empty)
    }

    /// Stores the value and returns the waiter to resume, if one is registered.
    fn complete(&mut self, value: T) -> Option<Waker> {
        self.slot = Slot::Ready(value);

        match &self.waiter {
            Waiter::Registered(waker) => Some(waker.clone()),
            _ => None,
        }
    }

    fn claim(&mut self) -> Result<(), TaskError> {
        match self.waiter {
            Waiter::Vacant => {
                self.waiter = Waiter::Claimed;
                Ok(())
            }
            _ => Err(TaskError::AlreadyAwaited),
        }
    }

    fn register(&mut self, waker: &Waker) {
        self.waiter = Waiter::Registered(waker.clone());
    }

    /// Moves the value out for the claimed waiter.
    fn take_for_waiter(&mut self) -> Option<T> {
        match mem::replace(&mut self.slot, Slot::Taken) {
            Slot::Ready(value) => Some(value),
            Slot::Empty => {
                self.slot = Slot::Empty;
                None
            }
            Slot::Taken => unreachable!("value of an awaited task was consumed elsewhere"),
        }
    }

    /// Moves the value out for [`Task::get`].
    fn take_for_get(&mut self) -> Result<T, TaskError> {
        match self.slot {
            Slot::Empty => return Err(TaskError::UnsetValueRead),
            Slot::Taken => return Err(TaskError::ValueTaken),
            Slot::Ready(_) => {}
        }

        if !matches!(self.waiter, Waiter::Vacant) {
            return Err(TaskError::AlreadyAwaited);
        }

        match mem::replace(&mut self.slot, Slot::Taken) {
            Slot::Ready(value) => Ok(value),
            _ => unreachable!("slot checked as ready above"),
        }
    }
}

pub(crate) struct Frame<T> {
    key: Key,
    shared: Weak<Shared>,
    state: Cell<TaskState>,
    /// Set when the body wakes its own frame while being polled.
    woken: Cell<bool>,
    /// `None` while the body is being polled and after it completed.
    body: RefCell<Option<LocalBoxFuture<'static, T>>>,
    promise: RefCell<Promise<T>>,
}

impl<T: 'static> Resume for Frame<T> {
    fn resume(self: Rc<Self>) {
        let Some(shared) = self.shared.upgrade() else {
            trace!("frame {} outlived its runtime, resume ignored", self.key);
            return;
        };

        let Some(mut body) = self.body.borrow_mut().take() else {
            if self.state.get() == TaskState::Running {
                trace!("frame {} woken while running, polling again", self.key);
                self.woken.set(true);
            } else {
                trace!("frame {} is not suspended, resume ignored", self.key);
            }
            return;
        };

        trace!("resuming frame {}", self.key);
        self.state.set(TaskState::Running);

        // The marker may belong to a frame whose poll started this one.
        let outer = shared.take_suspension();

        let waker = make_waker(self.key);
        let mut cx = Context::from_waker(&waker);

        let polled = loop {
            self.woken.set(false);
            let polled = panic::catch_unwind(AssertUnwindSafe(|| body.as_mut().poll(&mut cx)));

            match polled {
                Ok(Poll::Pending) if self.woken.get() => {
                    shared.take_suspension();
                }
                polled => break polled,
            }
        };

        match polled {
            Err(_) => {
                error!("task body in frame {} panicked, aborting", self.key);
                process::abort();
            }
            Ok(Poll::Pending) => {
                let state = shared.take_suspension().unwrap_or_else(|| {
                    warn!(
                        "frame {} suspended on a foreign future, it resumes only if that future wakes it",
                        self.key
                    );
                    TaskState::SuspendedOnTask
                });
                shared.restore_suspension(outer);

                trace!("frame {} suspended: {:?}", self.key, state);
                self.state.set(state);
                *self.body.borrow_mut() = Some(body);
            }
            Ok(Poll::Ready(value)) => {
                shared.restore_suspension(outer);
                drop(body);
                self.state.set(TaskState::Completed);

                let waiter = self.promise.borrow_mut().complete(value);
                trace!("frame {} completed", self.key);

                if let Some(waiter) = waiter {
                    waiter.wake();
                }
            }
        }
    }
}

impl<T> Drop for Frame<T> {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.frames.borrow_mut().remove(self.key);
        }

        trace!("frame {} destroyed", self.key);
    }
}

/// Owning handle to one eagerly started computation and its eventual value.
///
/// See the [module documentation](self) for the suspension and completion rules.
#[must_use = "dropping a task destroys its computation"]
pub struct Task<T> {
    frame: Option<Rc<Frame<T>>>,
}

impl<T: 'static> Task<T> {
    /// Starts `body` on the runtime whose context is current.
    ///
    /// Meant for task bodies that start further tasks; from outside a body use
    /// [`Runtime::start`](crate::Runtime::start).
    ///
    /// # Panics
    /// Panics if called outside of a runtime context.
    pub fn start<F>(body: F) -> Self
    where
        F: Future<Output = T> + 'static,
    {
        let shared = context::current().expect("Task::start() called outside of a runtime context");

        Self::start_in(&shared, body)
    }

    pub(crate) fn start_in<F>(shared: &Rc<Shared>, body: F) -> Self
    where
        F: Future<Output = T> + 'static,
    {
        let frame = Rc::new_cyclic(|this: &Weak<Frame<T>>| {
            let this: Weak<dyn Resume> = this.clone();
            let key = shared.frames.borrow_mut().insert(this);

            Frame {
                key,
                shared: Rc::downgrade(shared),
                state: Cell::new(TaskState::NotStarted),
                woken: Cell::new(false),
                body: RefCell::new(Some(body.boxed_local())),
                promise: RefCell::new(Promise::new()),
            }
        });

        trace!("frame {} started", frame.key);
        Rc::clone(&frame).resume();

        Self { frame: Some(frame) }
    }
}

impl<T> Task<T> {
    /// Returns an empty handle, bound to no computation.
    pub fn empty() -> Self {
        Self { frame: None }
    }

    /// Whether this handle owns a computation. `false` for [`Task::empty`] and after
    /// [`Task::take`].
    pub fn is_bound(&self) -> bool {
        self.frame.is_some()
    }

    /// Whether the computation has produced its value. Stays `true` after the value
    /// has been moved out.
    pub fn is_ready(&self) -> bool {
        self.frame
            .as_ref()
            .is_some_and(|frame| frame.promise.borrow().is_set())
    }

    /// State of the computation, `None` for an empty handle.
    pub fn state(&self) -> Option<TaskState> {
        self.frame.as_ref().map(|frame| frame.state.get())
    }

    /// Moves the value out.
    ///
    /// # Errors
    /// - [`TaskError::NotBound`] for an empty handle.
    /// - [`TaskError::UnsetValueRead`] if the computation has not completed.
    /// - [`TaskError::ValueTaken`] if the value was already moved out.
    /// - [`TaskError::AlreadyAwaited`] if the value belongs to a waiter.
    pub fn get(&mut self) -> Result<T, TaskError> {
        let frame = self.frame.as_ref().ok_or(TaskError::NotBound)?;

        frame.promise.borrow_mut().take_for_get()
    }

    /// Claims this task's single waiter slot and returns the future yielding its value.
    ///
    /// The claim is made here, not when the future is first polled: a second `wait`
    /// on the same task fails even if the first one never suspended.
    ///
    /// # Errors
    /// - [`TaskError::InvalidAwait`] for an empty handle.
    /// - [`TaskError::AlreadyAwaited`] if the task was already waited on.
    pub fn wait(&self) -> Result<Wait<'_, T>, TaskError> {
        let frame = self.frame.as_deref().ok_or(TaskError::InvalidAwait)?;
        frame.promise.borrow_mut().claim()?;

        Ok(Wait { frame })
    }

    /// Moves the computation into a new handle, leaving this one empty.
    pub fn take(&mut self) -> Self {
        mem::take(self)
    }
}

impl<T> Default for Task<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("key", &self.frame.as_ref().map(|frame| frame.key))
            .field("state", &self.state())
            .finish()
    }
}

/// Future returned by [`Task::wait`], resolving to the awaited task's value.
#[must_use = "a claimed wait does nothing unless awaited"]
pub struct Wait<'a, T> {
    frame: &'a Frame<T>,
}

impl<T> Future for Wait<'_, T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut promise = self.frame.promise.borrow_mut();

        if let Some(value) = promise.take_for_waiter() {
            return Poll::Ready(value);
        }

        promise.register(cx.waker());
        if let Some(shared) = context::current() {
            shared.note_suspension(TaskState::SuspendedOnTask);
        }

        trace!("waiting on frame {}", self.frame.key);
        Poll::Pending
    }
}
