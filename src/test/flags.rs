use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use http::Request;

use super::scenario::{Callback, Handle, Scenario};
use crate::{RequestRecord, Url};

#[test]
fn cancel_is_never_unset() {
    let record = Scenario::builder().build().to_record();

    assert!(!record.is_cancelled());
    assert!(record.cancel());
    assert!(record.is_cancelled());

    assert!(!record.cancel());
    assert!(record.is_cancelled());
}

#[test]
fn shared_cancel_flag() {
    let flag = Arc::new(AtomicBool::new(false));

    let url = Url::parse("http://a.test/").unwrap();
    let request = Request::get("http://a.test/").body(()).unwrap();
    let record = RequestRecord::builder(url, request, Handle(1), Callback("cb"))
        .cancelled(flag.clone())
        .build();

    assert!(!record.is_cancelled());

    // Cancelled by another owner.
    flag.store(true, Ordering::SeqCst);
    assert!(record.is_cancelled());
    assert!(!record.cancel());

    assert!(Arc::ptr_eq(&flag, &record.cancelled_flag()));
}

#[test]
fn cancel_race_has_one_winner() {
    let record = Arc::new(Scenario::builder().build().to_record());
    let barrier = Arc::new(Barrier::new(16));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let record = record.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                record.cancel()
            })
        })
        .collect();

    let winners = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|w| *w)
        .count();

    assert_eq!(winners, 1);
    assert!(record.is_cancelled());
}

#[test]
fn redirect_count_from_many_threads() {
    let record = Arc::new(Scenario::builder().build().to_record());

    assert_eq!(record.redirect_count(), 0);

    let handles: Vec<_> = (0..100)
        .map(|_| {
            let record = record.clone();
            thread::spawn(move || record.record_redirect())
        })
        .collect();

    let mut seen: Vec<u32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    seen.sort_unstable();

    assert_eq!(record.redirect_count(), 100);
    // Every increment observed a distinct count.
    assert_eq!(seen, (1..=100).collect::<Vec<_>>());
}

#[test]
fn listener_added_once() {
    let record = Scenario::builder().build().to_record();

    assert!(!record.is_listener_added());
    assert!(record.try_mark_listener_added());
    assert!(record.is_listener_added());
    assert!(!record.try_mark_listener_added());
    assert!(record.is_listener_added());
}

#[test]
fn listener_race_has_one_winner() {
    let record = Arc::new(Scenario::builder().build().to_record());
    let barrier = Arc::new(Barrier::new(32));

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let record = record.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                record.try_mark_listener_added()
            })
        })
        .collect();

    let winners = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|w| *w)
        .count();

    assert_eq!(winners, 1);
}

#[test]
fn accessors() {
    let record = Scenario::builder()
        .get("http://a.test/path?q=1")
        .timeout(Duration::from_secs(2))
        .no_aggregate()
        .build()
        .to_record();

    assert_eq!(record.url().as_str(), "http://a.test/path?q=1");
    assert_eq!(record.request().uri(), "http://a.test/path?q=1");
    assert_eq!(record.handle(), &Handle(1));
    assert_eq!(record.callback(), &Callback("cb"));
    assert!(record.no_aggregate());
}

#[test]
fn display() {
    let record = Scenario::builder()
        .get("http://a.test/")
        .timeout(Duration::from_secs(2))
        .build()
        .to_record();

    let s = record.to_string();
    assert!(s.starts_with("RequestRecord{"));
    assert!(s.contains("url=http://a.test/"));
    assert!(s.contains("req=GET http://a.test/"));
    assert!(s.contains("cancelled=false"));
    assert!(s.contains("handle=Handle(1)"));
    assert!(s.contains("callback=Callback(\"cb\")"));
    assert!(s.contains("timeout=Some(2s)"));

    record.cancel();
    assert!(record.to_string().contains("cancelled=true"));
}
