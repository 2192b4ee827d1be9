//! Waker that resumes a frame in place.
//!
//! Unlike a queue-based executor, waking here does not schedule anything: the frame
//! is looked up in the current runtime context and resumed on the caller's stack.
//! This is what makes a completing task resume its waiter depth-first.

use crate::runtime::context;
use crate::utils::slab::Key;

use futures::task::{self, ArcWake};
use std::sync::Arc;
use std::task::Waker;

/// Resumption handle for one frame.
///
/// Only carries the frame's arena key, so it is freely `Send + Sync`; a wake outside
/// the owning runtime's context, or after the frame is destroyed, is a no-op.
pub(crate) struct FrameWaker {
    key: Key,
}

impl ArcWake for FrameWaker {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        context::resume_frame(arc_self.key);
    }
}

pub(crate) fn make_waker(key: Key) -> Waker {
    task::waker(Arc::new(FrameWaker { key }))
}
