//! Outstanding requests, keyed by sequence number.
//!
//! Every entry holds the one-shot response handler and, for operations that
//! stream results, a result sink. Lookups hand back owned handlers or
//! shared sinks so callers can invoke them after the table lock is released.

use crate::error::ClientError;
use crate::message::{ListEvent, Message, Response};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Called once with the outcome of a request.
pub type ResponseHandler = Box<dyn FnOnce(Result<Response, ClientError>) + Send + 'static>;

/// Called for each message of a subscription, query or make-* request.
pub type MessageHandler = Box<dyn FnMut(Result<Message, ClientError>) + Send + 'static>;

/// Called for each event of a list request.
pub type ListHandler = Box<dyn FnMut(Result<ListEvent, ClientError>) + Send + 'static>;

/// Where the `rslt` frames of an operation are delivered.
#[derive(Clone)]
pub(crate) enum ResultSink {
    Messages(Arc<Mutex<MessageHandler>>),
    Children(Arc<Mutex<ListHandler>>),
}

impl ResultSink {
    pub(crate) fn messages(handler: MessageHandler) -> Self {
        ResultSink::Messages(Arc::new(Mutex::new(handler)))
    }

    pub(crate) fn children(handler: ListHandler) -> Self {
        ResultSink::Children(Arc::new(Mutex::new(handler)))
    }

    pub(crate) fn fail(&self, make_err: impl Fn() -> ClientError) {
        match self {
            ResultSink::Messages(h) => (*h.lock())(Err(make_err())),
            ResultSink::Children(h) => (*h.lock())(Err(make_err())),
        }
    }
}

/// A request awaiting its response and, possibly, further results.
pub(crate) struct PendingOperation {
    pub(crate) response: Option<ResponseHandler>,
    pub(crate) results: Option<ResultSink>,
}

impl PendingOperation {
    pub(crate) fn new(response: ResponseHandler, results: Option<ResultSink>) -> Self {
        Self {
            response: Some(response),
            results,
        }
    }

    /// Notifies every handler still held by this operation.
    pub(crate) fn fail(self, make_err: impl Fn() -> ClientError) {
        if let Some(response) = self.response {
            response(Err(make_err()));
        }
        if let Some(results) = self.results {
            results.fail(make_err);
        }
    }
}

struct Inner {
    ops: HashMap<u32, PendingOperation>,
    closed: bool,
}

/// The correlation table shared by request senders and the read loop.
pub(crate) struct PendingTable {
    inner: Mutex<Inner>,
}

impl PendingTable {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                ops: HashMap::new(),
                closed: false,
            }),
        }
    }

    /// Registers an operation. Once the table has been drained the
    /// operation is rejected and handed back.
    pub(crate) fn insert(&self, seq_no: u32, op: PendingOperation) -> Result<(), PendingOperation> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(op);
        }
        if inner.ops.insert(seq_no, op).is_some() {
            tracing::warn!(seq_no, "sequence number reused while still pending");
        }
        Ok(())
    }

    /// Removes an operation without notifying it.
    pub(crate) fn remove(&self, seq_no: u32) -> Option<PendingOperation> {
        self.inner.lock().ops.remove(&seq_no)
    }

    /// Takes the response handler for `seq_no`.
    ///
    /// The entry is dropped entirely when the response failed or when the
    /// operation has no result sink; a failed operation's sink is discarded
    /// without being called.
    pub(crate) fn take_response(&self, seq_no: u32, failed: bool) -> Option<ResponseHandler> {
        let mut inner = self.inner.lock();
        let op = inner.ops.get_mut(&seq_no)?;
        let handler = op.response.take();

        if failed || op.results.is_none() {
            inner.ops.remove(&seq_no);
        }
        handler
    }

    /// Returns the result sink for `seq_no`. When `finished` is set the sink
    /// is detached, and the entry is dropped unless its response is still
    /// outstanding.
    pub(crate) fn result_sink(&self, seq_no: u32, finished: bool) -> Option<ResultSink> {
        let mut inner = self.inner.lock();
        let op = inner.ops.get_mut(&seq_no)?;

        if !finished {
            return op.results.clone();
        }

        let sink = op.results.take();
        if op.response.is_none() {
            inner.ops.remove(&seq_no);
        }
        sink
    }

    /// Removes every entry and refuses further inserts until [`reopen`](Self::reopen).
    pub(crate) fn drain(&self) -> Vec<PendingOperation> {
        let mut inner = self.inner.lock();
        inner.closed = true;
        inner.ops.drain().map(|(_, op)| op).collect()
    }

    pub(crate) fn reopen(&self) {
        self.inner.lock().closed = false;
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.lock().ops.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_response(counter: &Arc<AtomicUsize>) -> ResponseHandler {
        let counter = counter.clone();
        Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn counting_sink(counter: &Arc<AtomicUsize>) -> ResultSink {
        let counter = counter.clone();
        ResultSink::messages(Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }))
    }

    #[test]
    fn test_response_only_entry_is_removed() {
        let table = PendingTable::new();
        let calls = Arc::new(AtomicUsize::new(0));
        table
            .insert(1, PendingOperation::new(counting_response(&calls), None))
            .ok()
            .unwrap();

        assert!(table.take_response(1, false).is_some());
        assert_eq!(table.len(), 0);
        assert!(table.take_response(1, false).is_none());
    }

    #[test]
    fn test_successful_response_keeps_sink() {
        let table = PendingTable::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let op = PendingOperation::new(counting_response(&calls), Some(counting_sink(&calls)));
        table.insert(1, op).ok().unwrap();

        table.take_response(1, false).unwrap()(Ok(Response::okay()));
        assert_eq!(table.len(), 1);
        assert!(table.take_response(1, false).is_none());
        assert!(table.result_sink(1, false).is_some());
        assert_eq!(table.len(), 1);

        assert!(table.result_sink(1, true).is_some());
        assert_eq!(table.len(), 0);
        assert!(table.result_sink(1, false).is_none());
    }

    #[test]
    fn test_failed_response_drops_sink_silently() {
        let table = PendingTable::new();
        let sink_calls = Arc::new(AtomicUsize::new(0));
        let response_calls = Arc::new(AtomicUsize::new(0));
        let op = PendingOperation::new(
            counting_response(&response_calls),
            Some(counting_sink(&sink_calls)),
        );
        table.insert(1, op).ok().unwrap();

        assert!(table.take_response(1, true).is_some());
        assert_eq!(table.len(), 0);
        assert!(table.result_sink(1, false).is_none());
        assert_eq!(sink_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_finished_before_response_keeps_entry() {
        let table = PendingTable::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let op = PendingOperation::new(counting_response(&calls), Some(counting_sink(&calls)));
        table.insert(1, op).ok().unwrap();

        assert!(table.result_sink(1, true).is_some());
        assert_eq!(table.len(), 1);
        assert!(table.take_response(1, false).is_some());
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_drain_fails_everything_once() {
        let table = PendingTable::new();
        let calls = Arc::new(AtomicUsize::new(0));
        table
            .insert(1, PendingOperation::new(counting_response(&calls), None))
            .ok()
            .unwrap();
        table
            .insert(
                2,
                PendingOperation::new(counting_response(&calls), Some(counting_sink(&calls))),
            )
            .ok()
            .unwrap();

        for op in table.drain() {
            op.fail(|| ClientError::ConnectionClosed);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(table.len(), 0);
        assert!(table.drain().is_empty());
    }

    #[test]
    fn test_insert_after_drain_is_refused() {
        let table = PendingTable::new();
        let calls = Arc::new(AtomicUsize::new(0));
        table.drain();

        let rejected = table
            .insert(1, PendingOperation::new(counting_response(&calls), None))
            .err()
            .unwrap();
        rejected.fail(|| ClientError::ConnectionClosed);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        table.reopen();
        assert!(table
            .insert(1, PendingOperation::new(counting_response(&calls), None))
            .is_ok());
    }
}
