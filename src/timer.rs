//! Cancellable scheduled tasks.
//!
//! The record never owns the execution of a timeout task, it can only
//! ask for it to not run. [`Timer`] is a minimal thread based scheduler
//! that honors that contract.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::util::lock;

/// A task scheduled to run later, which can be prevented from running.
pub trait ScheduledTask: Send + Sync {
    /// Prevent the task from running. Calling this more than once has no effect.
    fn cancel(&self);

    fn is_cancelled(&self) -> bool;
}

/// Handle to a task scheduled by [`Timer`].
#[derive(Clone, Default)]
pub struct TimerTask {
    state: Arc<TaskState>,
}

#[derive(Default)]
struct TaskState {
    cancelled: Mutex<bool>,
    wake: Condvar,
}

impl TimerTask {
    pub fn new() -> Self {
        TimerTask::default()
    }

    /// Block until `deadline` or until cancelled. Returns `true` if the deadline was reached.
    fn wait_until(&self, deadline: Instant) -> bool {
        let mut cancelled = lock(&self.state.cancelled);

        loop {
            if *cancelled {
                return false;
            }

            let now = Instant::now();
            if now >= deadline {
                return true;
            }

            cancelled = match self.state.wake.wait_timeout(cancelled, deadline - now) {
                Ok((guard, _)) => guard,
                Err(e) => e.into_inner().0,
            };
        }
    }
}

impl ScheduledTask for TimerTask {
    fn cancel(&self) {
        let mut cancelled = lock(&self.state.cancelled);

        if !*cancelled {
            *cancelled = true;
            trace!("Timer task cancelled");
            // Release the waiting worker right away.
            self.state.wake.notify_all();
        }
    }

    fn is_cancelled(&self) -> bool {
        *lock(&self.state.cancelled)
    }
}

impl fmt::Debug for TimerTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerTask")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Runs closures after a delay unless cancelled first.
///
/// Each scheduled task has a worker thread. Cancelling the task ends that
/// thread without waiting out the delay.
#[derive(Debug, Clone, Copy, Default)]
pub struct Timer;

impl Timer {
    pub fn new() -> Self {
        Timer
    }

    /// Schedule `f` to run once `delay` has passed.
    ///
    /// The returned task can be cancelled up until the moment `f` starts.
    pub fn schedule<F>(&self, delay: Duration, f: F) -> TimerTask
    where
        F: FnOnce() + Send + 'static,
    {
        let task = TimerTask::new();
        let handle = task.clone();
        let deadline = Instant::now() + delay;

        debug!("Schedule timer task in {:?}", delay);

        thread::spawn(move || {
            if handle.wait_until(deadline) {
                f();
            }
        });

        task
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn cancel_is_idempotent() {
        let task = TimerTask::new();
        assert!(!task.is_cancelled());
        task.cancel();
        task.cancel();
        assert!(task.is_cancelled());
    }

    #[test]
    fn clones_share_state() {
        let task = TimerTask::new();
        let other = task.clone();
        other.cancel();
        assert!(task.is_cancelled());
    }

    #[test]
    fn scheduled_task_runs() {
        let (tx, rx) = mpsc::channel();
        let _task = Timer::new().schedule(Duration::from_millis(1), move || {
            tx.send(()).unwrap();
        });

        rx.recv_timeout(Duration::from_secs(5)).unwrap();
    }

    #[test]
    fn cancelled_task_does_not_run() {
        let (tx, rx) = mpsc::channel::<()>();
        let task = Timer::new().schedule(Duration::from_secs(30), move || {
            tx.send(()).unwrap();
        });
        task.cancel();

        // The worker drops the closure, and with it the sender, without
        // sleeping out the 30s.
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(5)),
            Err(mpsc::RecvTimeoutError::Disconnected)
        );
    }

    #[test]
    fn cancel_releases_workers() {
        let timer = Timer::new();
        let start = Instant::now();

        let (tasks, receivers): (Vec<_>, Vec<_>) = (0..50)
            .map(|_| {
                let (tx, rx) = mpsc::channel::<()>();
                let task = timer.schedule(Duration::from_secs(30), move || {
                    tx.send(()).unwrap();
                });
                (task, rx)
            })
            .unzip();

        for task in &tasks {
            task.cancel();
        }

        for rx in receivers {
            assert_eq!(
                rx.recv_timeout(Duration::from_secs(5)),
                Err(mpsc::RecvTimeoutError::Disconnected)
            );
        }

        assert!(start.elapsed() < Duration::from_secs(10));
    }
}
