//! Bookkeeping for one in-flight request.
//!
//! A [`RequestRecord`] is created when a client dispatches a request and
//! dropped once the exchange is over, whether it succeeded, failed, was
//! cancelled or timed out. It is typically shared in an `Arc` between the
//! I/O callback path and a timer thread. Nothing here blocks.
//!
//! The record holds:
//!
//! * The target [`Url`] and the outgoing `http::Request<()>`.
//! * A cancellation flag, possibly shared with other owners. Once set it is never unset.
//! * An opaque result handle `F` and response callback `C`, both completed and invoked
//!   by the owning client, never by the record.
//! * A redirect counter and a "listener added" flag, both safe to update from any thread.
//! * An optional timeout measured from the start time, and the timer task enforcing it.
//! * Whether the response body should be streamed rather than aggregated.
//! * An optional chunked upload body.
//! * A lazily built websocket [`Handshaker`].
//!
//! ```
//! use std::time::Duration;
//! use inflight::{RequestRecord, Url};
//! use inflight::http::Request;
//!
//! let url = Url::parse("https://example.test/chat").unwrap();
//! let request = Request::get("https://example.test/chat").body(()).unwrap();
//!
//! let record = RequestRecord::builder(url, request, "handle", "callback")
//!     .timeout(Duration::from_secs(30))
//!     .build();
//!
//! assert!(!record.is_expired());
//! assert!(!record.has_handshaker());
//!
//! let handshaker = record.handshaker().unwrap();
//! assert_eq!(handshaker.uri().to_string(), "wss://example.test/chat");
//! assert!(record.has_handshaker());
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use http::Request;

use crate::body::{ChunkedBody, ChunkedContent};
use crate::clock::{Clock, SystemClock};
use crate::timer::ScheduledTask;
use crate::url::Url;
use crate::util::lock;
use crate::websocket::{new_handshaker, HandshakeConfig, Handshaker, WebSocketVersion};
use crate::Error;

/// Time left until a timeout, or how far past it we are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remaining {
    /// Not yet expired. `Left(Duration::ZERO)` is exactly at the deadline.
    Left(Duration),
    /// Past the deadline by this much.
    Overdue(Duration),
}

impl Remaining {
    fn between(timeout: Duration, age: Duration) -> Self {
        if age <= timeout {
            Remaining::Left(timeout - age)
        } else {
            Remaining::Overdue(age - timeout)
        }
    }

    /// Whether the deadline has passed.
    pub fn is_overdue(&self) -> bool {
        matches!(self, Remaining::Overdue(_))
    }

    /// Signed seconds, negative when overdue.
    pub fn as_secs_f64(&self) -> f64 {
        match self {
            Remaining::Left(d) => d.as_secs_f64(),
            Remaining::Overdue(d) => -d.as_secs_f64(),
        }
    }
}

/// State of one in-flight request.
pub struct RequestRecord<F, C> {
    url: Url,
    request: Request<()>,
    cancelled: Arc<AtomicBool>,
    handle: F,
    callback: C,
    redirect_count: AtomicU32,
    timeout: Option<Duration>,
    start: Instant,
    listener_added: AtomicBool,
    timer: Mutex<Option<Arc<dyn ScheduledTask>>>,
    no_aggregate: bool,
    chunked_body: Option<Mutex<ChunkedBody>>,
    handshaker: Mutex<Option<Arc<Handshaker>>>,
    websocket_version: WebSocketVersion,
    clock: Arc<dyn Clock>,
}

impl<F, C> RequestRecord<F, C> {
    /// Start building a record.
    pub fn builder(
        url: Url,
        request: Request<()>,
        handle: F,
        callback: C,
    ) -> RecordBuilder<F, C> {
        RecordBuilder {
            url,
            request,
            handle,
            callback,
            cancelled: None,
            timeout: None,
            start: None,
            timer: None,
            no_aggregate: false,
            chunked_body: None,
            websocket_version: WebSocketVersion::default(),
            clock: None,
        }
    }

    /// Record with no timeout, started now.
    pub fn new(url: Url, request: Request<()>, handle: F, callback: C) -> Self {
        Self::builder(url, request, handle, callback).build()
    }

    /// The request target.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The outgoing request, as handed to the record.
    pub fn request(&self) -> &Request<()> {
        &self.request
    }

    /// Result handle, completed by the owning client.
    pub fn handle(&self) -> &F {
        &self.handle
    }

    /// Response callback, invoked by the owning client.
    pub fn callback(&self) -> &C {
        &self.callback
    }

    /// Timeout measured from [`start()`][Self::start], if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// When the request started.
    pub fn start(&self) -> Instant {
        self.start
    }

    /// Deliver the response body in parts instead of aggregating it.
    pub fn no_aggregate(&self) -> bool {
        self.no_aggregate
    }

    /// Protocol version used when building the handshaker.
    pub fn websocket_version(&self) -> WebSocketVersion {
        self.websocket_version
    }

    // ///////////////////////////////////////////////////////////////////// TIME

    /// Time since the request started.
    ///
    /// Never negative. A start time in the future gives zero.
    pub fn age(&self) -> Duration {
        self.clock.now().saturating_duration_since(self.start)
    }

    /// Time left before the timeout, `None` if there is no timeout.
    pub fn remaining(&self) -> Option<Remaining> {
        let timeout = self.timeout?;
        Some(Remaining::between(timeout, self.age()))
    }

    /// Whether the current time is strictly after start + timeout.
    pub fn is_expired(&self) -> bool {
        match self.timeout {
            Some(timeout) => self.age() > timeout,
            None => false,
        }
    }

    // ///////////////////////////////////////////////////////////////////// TIMER

    /// Attach the task enforcing the timeout.
    ///
    /// A previously attached task is cancelled.
    pub fn set_timer(&self, task: impl ScheduledTask + 'static) {
        let previous = lock(&self.timer).replace(Arc::new(task));

        if let Some(previous) = previous {
            debug!("Replace timer for {}", self.url);
            previous.cancel();
        }
    }

    pub fn has_timer(&self) -> bool {
        lock(&self.timer).is_some()
    }

    /// Cancel the timer task, if any. Safe to call any number of times.
    ///
    /// The task is cancelled outside the record's lock, so it may call back
    /// into the record.
    pub fn cancel_timer(&self) {
        let task = lock(&self.timer).clone();

        if let Some(task) = task {
            trace!("Cancel timer for {}", self.url);
            task.cancel();
        }
    }

    // ///////////////////////////////////////////////////////////////////// FLAGS

    /// Flag the request as cancelled.
    ///
    /// Returns `true` if this call is the one that set the flag. This does not stop
    /// any I/O, the owning client checks the flag.
    pub fn cancel(&self) -> bool {
        let first = !self.cancelled.swap(true, Ordering::AcqRel);
        if first {
            debug!("Cancel request to {}", self.url);
        }
        first
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// The cancellation flag, to share with whatever else may cancel the request.
    pub fn cancelled_flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    pub fn redirect_count(&self) -> u32 {
        self.redirect_count.load(Ordering::Acquire)
    }

    /// Count one followed redirect. Returns the new count.
    pub fn record_redirect(&self) -> u32 {
        let count = self.redirect_count.fetch_add(1, Ordering::AcqRel) + 1;
        trace!("Redirect {} for {}", count, self.url);
        count
    }

    /// Mark the completion listener as added.
    ///
    /// Only the first caller gets `true`, every later or racing caller gets `false`.
    pub fn try_mark_listener_added(&self) -> bool {
        self.listener_added
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_listener_added(&self) -> bool {
        self.listener_added.load(Ordering::Acquire)
    }

    // ///////////////////////////////////////////////////////////////////// BODY

    /// Whether the request body is streamed in chunks.
    pub fn is_chunked(&self) -> bool {
        self.chunked_body.is_some()
    }

    /// Next unframed piece of the chunked body. `None` when ended or not chunked.
    pub fn next_chunk(&self) -> Option<Vec<u8>> {
        let body = self.chunked_body.as_ref()?;
        lock(body).next_chunk()
    }

    /// Write the next transfer-encoding framed chunk to `output`.
    ///
    /// `Ok(0)` once the whole body, including the end marker, has been written.
    pub fn write_next_chunk(&self, output: &mut [u8]) -> Result<usize, Error> {
        match &self.chunked_body {
            Some(body) => lock(body).write_next(output),
            None => Ok(0),
        }
    }

    // ///////////////////////////////////////////////////////////////////// WEBSOCKET

    /// The target url with the scheme swapped for `wss` (secure) or `ws`.
    pub fn websocket_url(&self) -> Url {
        self.url.with_protocol(self.url.protocol().websocket())
    }

    /// The websocket handshaker for this request.
    ///
    /// Built on first use and then reused, concurrent callers all get the same
    /// instance. A url that can't be made into a websocket uri is an error for
    /// this request. Nothing is cached in that case.
    pub fn handshaker(&self) -> Result<Arc<Handshaker>, Error> {
        let mut slot = lock(&self.handshaker);

        if let Some(h) = &*slot {
            return Ok(h.clone());
        }

        let uri = self.websocket_url().to_uri()?;

        let config = HandshakeConfig {
            version: self.websocket_version,
            subprotocol: None,
            allow_extensions: true,
            headers: Default::default(),
        };

        let handshaker = Arc::new(new_handshaker(uri, config)?);
        *slot = Some(handshaker.clone());

        Ok(handshaker)
    }

    /// Whether [`handshaker()`][Self::handshaker] has built the handshaker yet.
    pub fn has_handshaker(&self) -> bool {
        lock(&self.handshaker).is_some()
    }
}

/// Builder for [`RequestRecord`].
pub struct RecordBuilder<F, C> {
    url: Url,
    request: Request<()>,
    handle: F,
    callback: C,
    cancelled: Option<Arc<AtomicBool>>,
    timeout: Option<Duration>,
    start: Option<Instant>,
    timer: Option<Arc<dyn ScheduledTask>>,
    no_aggregate: bool,
    chunked_body: Option<ChunkedBody>,
    websocket_version: WebSocketVersion,
    clock: Option<Arc<dyn Clock>>,
}

impl<F, C> RecordBuilder<F, C> {
    /// Use an existing cancellation flag. Defaults to a new unset flag.
    pub fn cancelled(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancelled = Some(flag);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Explicit start time. Defaults to the clock reading at `build()`.
    pub fn started_at(mut self, start: Instant) -> Self {
        self.start = Some(start);
        self
    }

    pub fn timer(mut self, task: impl ScheduledTask + 'static) -> Self {
        self.timer = Some(Arc::new(task));
        self
    }

    pub fn no_aggregate(mut self, enabled: bool) -> Self {
        self.no_aggregate = enabled;
        self
    }

    pub fn chunked_body(mut self, content: impl ChunkedContent + 'static) -> Self {
        self.chunked_body = Some(ChunkedBody::new(content));
        self
    }

    pub fn websocket_version(mut self, version: WebSocketVersion) -> Self {
        self.websocket_version = version;
        self
    }

    /// Time source. Defaults to [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> RequestRecord<F, C> {
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);
        let start = self.start.unwrap_or_else(|| clock.now());

        let record = RequestRecord {
            url: self.url,
            request: self.request,
            cancelled: self.cancelled.unwrap_or_default(),
            handle: self.handle,
            callback: self.callback,
            redirect_count: AtomicU32::new(0),
            timeout: self.timeout,
            start,
            listener_added: AtomicBool::new(false),
            timer: Mutex::new(self.timer),
            no_aggregate: self.no_aggregate,
            chunked_body: self.chunked_body.map(Mutex::new),
            handshaker: Mutex::new(None),
            websocket_version: self.websocket_version,
            clock,
        };

        debug!("New request record: {}", record.url);

        record
    }
}

impl<F: fmt::Debug, C: fmt::Debug> fmt::Display for RequestRecord<F, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RequestRecord{{url={}, req={} {}, cancelled={}, handle={:?}, callback={:?}, timeout={:?}}}",
            self.url,
            self.request.method(),
            self.request.uri(),
            self.is_cancelled(),
            self.handle,
            self.callback,
            self.timeout,
        )
    }
}

impl<F: fmt::Debug, C: fmt::Debug> fmt::Debug for RequestRecord<F, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestRecord")
            .field("url", &self.url)
            .field("method", self.request.method())
            .field("cancelled", &self.is_cancelled())
            .field("handle", &self.handle)
            .field("callback", &self.callback)
            .field("redirect_count", &self.redirect_count())
            .field("timeout", &self.timeout)
            .field("no_aggregate", &self.no_aggregate)
            .field("chunked", &self.is_chunked())
            .finish()
    }
}
