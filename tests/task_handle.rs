mod common;

use cadence::{Task, TaskError, TaskState, sleep};
use common::{Log, secs, virtual_runtime};
use futures::future::join;
use std::cell::Cell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};
use std::time::Duration;

struct DropCounter(Rc<Cell<u32>>);

impl Drop for DropCounter {
    fn drop(&mut self) {
        self.0.set(self.0.get() + 1);
    }
}

#[test]
fn body_runs_before_start_returns() {
    let (mut rt, _clock) = virtual_runtime();
    let log = Log::default();

    let task = rt.start({
        let log = log.clone();
        async move {
            log.push("first step");
            sleep(secs(1)).await;
            log.push("second step");
        }
    });

    assert_eq!(log.entries(), ["first step"]);
    assert_eq!(task.state(), Some(TaskState::SuspendedOnTimer));

    rt.run();

    assert_eq!(log.entries(), ["first step", "second step"]);
}

#[test]
fn value_is_read_exactly_once() {
    let (mut rt, _clock) = virtual_runtime();

    let mut task = rt.start(async {
        sleep(secs(1)).await;
        String::from("value")
    });

    assert_eq!(task.get(), Err(TaskError::UnsetValueRead));

    rt.run();

    assert_eq!(task.get(), Ok(String::from("value")));
    assert_eq!(task.get(), Err(TaskError::ValueTaken));
}

#[test]
fn is_ready_never_changes_state() {
    let (mut rt, _clock) = virtual_runtime();

    let mut task = rt.start(async {
        sleep(secs(1)).await;
        9
    });

    for _ in 0..3 {
        assert!(!task.is_ready());
    }
    assert_eq!(task.state(), Some(TaskState::SuspendedOnTimer));

    rt.run();

    for _ in 0..3 {
        assert!(task.is_ready());
    }
    assert_eq!(task.get(), Ok(9));
    assert!(task.is_ready());
    assert!(task.is_ready());
}

#[test]
fn take_leaves_an_empty_handle() {
    let (rt, _clock) = virtual_runtime();

    let mut original = rt.start(async { 3 });
    let mut moved = original.take();

    assert!(!original.is_bound());
    assert!(!original.is_ready());
    assert_eq!(original.state(), None);
    assert_eq!(original.get(), Err(TaskError::NotBound));
    assert_eq!(moved.get(), Ok(3));
}

#[test]
fn dropping_suspended_task_discards_its_computation() {
    let (mut rt, _clock) = virtual_runtime();
    let resumed = Rc::new(Cell::new(false));
    let drops = Rc::new(Cell::new(0));

    let task = rt.start({
        let resumed = Rc::clone(&resumed);
        let guard = DropCounter(Rc::clone(&drops));
        async move {
            sleep(secs(1)).await;
            resumed.set(true);
            drop(guard);
        }
    });

    drop(task);
    assert_eq!(drops.get(), 1, "body state is destroyed with the handle");
    assert_eq!(rt.pending_timers(), 1);

    rt.run();

    assert!(!resumed.get());
    assert_eq!(rt.pending_timers(), 0);
}

#[test]
fn dropping_handle_destroys_unread_value() {
    let (rt, _clock) = virtual_runtime();
    let drops = Rc::new(Cell::new(0));

    let task = rt.start({
        let drops = Rc::clone(&drops);
        async move { DropCounter(drops) }
    });
    assert!(task.is_ready());
    assert_eq!(drops.get(), 0);

    drop(task);

    assert_eq!(drops.get(), 1);
}

#[test]
fn reassigning_handle_destroys_previous_computation() {
    let (mut rt, _clock) = virtual_runtime();
    let resumed = Rc::new(Cell::new(false));

    let mut slot = rt.start({
        let resumed = Rc::clone(&resumed);
        async move {
            sleep(secs(1)).await;
            resumed.set(true);
            1
        }
    });
    assert!(!slot.is_ready());
    slot = rt.start(async { 2 });

    rt.run();

    assert!(!resumed.get());
    assert_eq!(slot.get(), Ok(2));
}

#[test]
fn block_on_reports_body_that_never_finished() {
    let (mut rt, _clock) = virtual_runtime();

    let result = rt.block_on(async {
        sleep(secs(1)).await;
        std::future::pending::<()>().await;
    });

    assert_eq!(result, Err(TaskError::UnsetValueRead));
}

#[test]
fn huge_delay_saturates_instead_of_overflowing() {
    let (mut rt, clock) = virtual_runtime();
    clock.advance(secs(2));

    let mut task = rt.start(async {
        sleep(Duration::MAX).await;
        "woke"
    });

    assert_eq!(task.state(), Some(TaskState::SuspendedOnTimer));
    assert_eq!(rt.pending_timers(), 1);

    rt.run();

    assert_eq!(task.get(), Ok("woke"));
    assert_eq!(clock.now(), Duration::MAX);
}

#[test]
fn child_started_mid_poll_keeps_parent_timer_state() {
    let (mut rt, _clock) = virtual_runtime();

    let mut task = rt.start(join(sleep(secs(1)), async {
        let child = Task::start(async { 1 });
        child.wait()?.await;
        Ok::<_, TaskError>(())
    }));

    assert_eq!(task.state(), Some(TaskState::SuspendedOnTimer));
    assert_eq!(rt.pending_timers(), 1);

    rt.run();

    assert_eq!(task.get(), Ok(((), Ok(()))));
}

/// Wakes its own task once, then completes on the next poll.
struct YieldOnce(bool);

impl Future for YieldOnce {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if !self.0 {
            self.0 = true;
            cx.waker().wake_by_ref();
            return Poll::Pending;
        }
        Poll::Ready(())
    }
}

#[test]
fn self_wake_during_poll_is_not_lost() {
    let (rt, _clock) = virtual_runtime();
    let log = Log::default();

    let mut task = rt.start({
        let log = log.clone();
        async move {
            log.push("before yield");
            YieldOnce(false).await;
            log.push("after yield");
            5
        }
    });

    assert_eq!(log.entries(), ["before yield", "after yield"]);
    assert_eq!(task.state(), Some(TaskState::Completed));
    assert_eq!(rt.pending_timers(), 0);
    assert_eq!(task.get(), Ok(5));
}

#[test]
#[should_panic(expected = "outside of a runtime context")]
fn start_outside_runtime_panics() {
    let _task = Task::start(async { 1 });
}
