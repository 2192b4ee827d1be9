//! Errors reported at the call site of task operations.
//!
//! Failures raised *inside* a task body are not represented here: a panicking body
//! aborts the process (see [`Task`](crate::Task)).

use thiserror::Error;

/// Misuse of a [`Task`](crate::Task) handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TaskError {
    /// Waited on an empty handle.
    #[error("cannot wait on a task handle that is not bound to a computation")]
    InvalidAwait,

    /// The task already has a registered waiter.
    #[error("task is already awaited by another computation")]
    AlreadyAwaited,

    /// Read the result of an empty handle.
    #[error("task handle is not bound to a computation")]
    NotBound,

    /// Read the result before the computation completed.
    #[error("task has not produced a value yet")]
    UnsetValueRead,

    /// The result was already moved out by an earlier `get`.
    #[error("task value was already taken")]
    ValueTaken,
}
