//! Per-request lifecycle bookkeeping for http and websocket clients.
//!
//! inflight is Sans-IO. It never touches a socket or an event loop, it holds
//! the state an asynchronous client needs for each request while that request
//! is in flight:
//!
//! * **Time** - when the request started, how old it is, how much of the
//!   timeout is left and whether it has expired.
//! * **Timer** - the scheduled task enforcing the timeout, cancellable any
//!   number of times.
//! * **Flags** - cancellation, the redirect count and whether a completion
//!   listener has been added. All safe to update from several threads.
//! * **Websocket** - a lazily built [`Handshaker`][websocket::Handshaker]
//!   targeting the `ws`/`wss` version of the request url.
//!
//! The record is shared between the network callback path and a timer thread,
//! hence every operation takes `&self`.
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use inflight::clock::ManualClock;
//! use inflight::http::Request;
//! use inflight::timer::{ScheduledTask, TimerTask};
//! use inflight::{Remaining, RequestRecord, Url};
//!
//! let clock = Arc::new(ManualClock::new());
//!
//! let url = Url::parse("http://example.test/feed").unwrap();
//! let request = Request::get("http://example.test/feed").body(()).unwrap();
//!
//! let record = RequestRecord::builder(url, request, (), ())
//!     .timeout(Duration::from_secs(2))
//!     .clock(clock.clone())
//!     .build();
//!
//! // The client schedules a timeout task and hands it to the record.
//! let task = TimerTask::new();
//! record.set_timer(task.clone());
//!
//! assert!(!record.is_expired());
//! assert_eq!(record.remaining(), Some(Remaining::Left(Duration::from_secs(2))));
//!
//! clock.advance(Duration::from_millis(2500));
//!
//! assert!(record.is_expired());
//! assert_eq!(record.remaining(), Some(Remaining::Overdue(Duration::from_millis(500))));
//!
//! // Response arrived (or the request was given up), stop the timer.
//! record.cancel_timer();
//! assert!(task.is_cancelled());
//! ```

#[macro_use]
extern crate log;

// Re-export the basis for this library.
pub use http;

mod error;
pub use error::Error;

mod ext;
mod parser;
mod util;

mod url;
pub use url::{Protocol, Url, UrlError};

pub mod body;
pub mod clock;
pub mod timer;
pub mod websocket;

mod record;
pub use record::{RecordBuilder, Remaining, RequestRecord};

#[cfg(test)]
mod test;

/// Max number of headers to parse from a websocket handshake response
pub const MAX_RESPONSE_HEADERS: usize = 128;
