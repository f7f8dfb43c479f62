use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

use http::Request;

use super::scenario::{Callback, CountingTask, Handle, Record, Scenario};
use crate::timer::{ScheduledTask, Timer, TimerTask};
use crate::{RequestRecord, Url};

#[test]
fn cancel_timer_without_timer() {
    let record = Scenario::builder().build().to_record();

    assert!(!record.has_timer());

    record.cancel_timer();
    record.cancel_timer();

    assert!(!record.has_timer());
}

#[test]
fn cancel_timer_once() {
    let record = Scenario::builder().build().to_record();
    let task = CountingTask::default();

    record.set_timer(task.clone());
    assert!(record.has_timer());
    assert_eq!(task.cancels(), 0);

    record.cancel_timer();
    assert_eq!(task.cancels(), 1);
}

#[test]
fn cancel_timer_many_times() {
    let record = Scenario::builder().build().to_record();
    let task = TimerTask::new();

    record.set_timer(task.clone());

    for _ in 0..5 {
        record.cancel_timer();
        assert!(task.is_cancelled());
    }

    // The handle stays attached after cancelling.
    assert!(record.has_timer());
}

#[test]
fn timer_from_builder() {
    let task = CountingTask::default();

    let url = Url::parse("http://a.test/").unwrap();
    let request = Request::get("http://a.test/").body(()).unwrap();
    let record = RequestRecord::builder(url, request, Handle(1), Callback("cb"))
        .timer(task.clone())
        .build();

    assert!(record.has_timer());
    record.cancel_timer();
    assert_eq!(task.cancels(), 1);
}

#[test]
fn replacing_timer_cancels_previous() {
    let record = Scenario::builder().build().to_record();
    let first = CountingTask::default();
    let second = CountingTask::default();

    record.set_timer(first.clone());
    record.set_timer(second.clone());

    assert_eq!(first.cancels(), 1);
    assert_eq!(second.cancels(), 0);

    record.cancel_timer();

    assert_eq!(first.cancels(), 1);
    assert_eq!(second.cancels(), 1);
}

#[test]
fn timeout_task_cancels_request() {
    let url = Url::parse("http://a.test/").unwrap();
    let request = Request::get("http://a.test/").body(()).unwrap();
    let record = Arc::new(
        RequestRecord::builder(url, request, Handle(1), Callback("cb"))
            .timeout(Duration::from_millis(10))
            .build(),
    );

    let (tx, rx) = mpsc::channel();
    let on_timeout = record.clone();

    let task = Timer::new().schedule(Duration::from_millis(20), move || {
        tx.send(on_timeout.cancel()).unwrap();
    });
    record.set_timer(task);

    let first = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(first);
    assert!(record.is_cancelled());
    assert!(record.is_expired());

    // Cancelling a timer that already fired is harmless.
    record.cancel_timer();
    record.cancel_timer();
}

#[test]
fn cancelled_timeout_task_never_fires() {
    let record = Arc::new(
        Scenario::builder()
            .timeout(Duration::from_millis(200))
            .build()
            .to_record(),
    );

    let (tx, rx) = mpsc::channel::<()>();
    let on_timeout = record.clone();

    let task = Timer::new().schedule(Duration::from_millis(200), move || {
        on_timeout.cancel();
        tx.send(()).unwrap();
    });
    record.set_timer(task);

    // Response arrived before the timeout.
    record.cancel_timer();

    let res = rx.recv_timeout(Duration::from_secs(5));
    assert_eq!(res, Err(mpsc::RecvTimeoutError::Disconnected));
    assert!(!record.is_cancelled());
}

/// A task that looks at the record it belongs to when cancelled.
struct ReentrantTask {
    record: Weak<Record>,
    saw_timer: Arc<AtomicBool>,
}

impl ScheduledTask for ReentrantTask {
    fn cancel(&self) {
        if let Some(record) = self.record.upgrade() {
            self.saw_timer.store(record.has_timer(), Ordering::SeqCst);
        }
    }

    fn is_cancelled(&self) -> bool {
        self.saw_timer.load(Ordering::SeqCst)
    }
}

#[test]
fn cancel_may_call_back_into_record() {
    let record = Arc::new(Scenario::builder().build().to_record());
    let saw_timer = Arc::new(AtomicBool::new(false));

    record.set_timer(ReentrantTask {
        record: Arc::downgrade(&record),
        saw_timer: saw_timer.clone(),
    });

    let (tx, rx) = mpsc::channel();
    let canceller = record.clone();
    thread::spawn(move || {
        canceller.cancel_timer();
        tx.send(()).unwrap();
    });

    // Would never arrive if the timer lock was held during cancel.
    rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(saw_timer.load(Ordering::SeqCst));
}
