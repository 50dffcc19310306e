//! Router connection and request dispatch.
//!
//! A [`Connection`] owns one TCP stream to the local router. After the
//! `helo` handshake a background task reads frames and routes `resp` and
//! `rslt` frames to the callbacks registered under their sequence number.
//! Requests can be sent concurrently from any task; frame writes are
//! serialized so frames never interleave on the wire.

use crate::entity::load_entity_file;
use crate::error::ClientError;
use crate::message::{parse_bool, ListEvent, Message, Response};
use crate::pending::{PendingOperation, PendingTable, ResultSink};
use crate::request::{
    set_entity_frame, ListRequest, MakeChainRequest, MakeDotRequest, MakeEntityRequest,
    PublishRequest, QueryRequest, SubscribeRequest,
};
use bosswave_protocol::{
    read_frame, skip_to_terminator, write_frame, Command, Frame, ProtocolError, RandomSequence,
    SequenceSource, DEFAULT_PORT,
};
use bytes::Bytes;
use parking_lot::Mutex;
use std::fmt;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Default read buffer size (8 KiB).
pub const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;

/// Minimum read buffer size (1 KiB).
pub const MIN_READ_BUFFER_SIZE: usize = 1024;

/// Maximum read buffer size (1 MiB).
pub const MAX_READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Pause after a transient read error before reading again.
const READ_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Router address.
    pub addr: SocketAddr,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// How long to wait for the router's `helo` frame.
    pub handshake_timeout: Duration,
    /// Timeout used by the high-level client while awaiting replies.
    pub request_timeout: Duration,
    /// Read buffer size for socket reads.
    pub read_buffer_size: usize,
    /// Entity key file sent with `sete` after connecting (high-level client only).
    pub entity_file: Option<PathBuf>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)))
    }
}

impl ConnectionConfig {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            connect_timeout: Duration::from_secs(10),
            handshake_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            entity_file: None,
        }
    }

    /// Default configuration with `BW2_AGENT` and `BW2_DEFAULT_ENTITY` applied.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides looked up through `var`. Unparsable values are ignored.
    pub fn with_env_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(agent) = var("BW2_AGENT") {
            match agent.parse() {
                Ok(addr) => self.addr = addr,
                Err(_) => tracing::warn!(value = %agent, "ignoring unparsable BW2_AGENT"),
            }
        }

        if let Some(path) = var("BW2_DEFAULT_ENTITY") {
            if !path.is_empty() {
                self.entity_file = Some(PathBuf::from(path));
            }
        }
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.clamp(MIN_READ_BUFFER_SIZE, MAX_READ_BUFFER_SIZE);
        self
    }

    pub fn with_entity_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.entity_file = Some(path.into());
        self
    }
}

/// Lifecycle of a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Ready,
    Closing,
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Ready => "ready",
            ConnectionState::Closing => "closing",
            ConnectionState::Closed => "closed",
        };
        f.write_str(s)
    }
}

fn client_error(err: ProtocolError) -> ClientError {
    match err {
        ProtocolError::Io(e) => ClientError::Io(e),
        other => ClientError::Protocol(other),
    }
}

fn is_disconnect(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::NotConnected
    )
}

/// State shared between the connection handle and its read loop.
struct Shared {
    state: Mutex<ConnectionState>,
    writer: tokio::sync::Mutex<Option<OwnedWriteHalf>>,
    pending: PendingTable,
}

impl Shared {
    fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.lock() = state;
    }

    /// Fails every pending operation with `ConnectionClosed`.
    fn fail_pending(&self) {
        let ops = self.pending.drain();
        if !ops.is_empty() {
            tracing::debug!("Failing {} pending requests", ops.len());
        }
        for op in ops {
            op.fail(|| ClientError::ConnectionClosed);
        }
    }

    /// Cleanup after the router went away without `close()` being called.
    async fn connection_lost(&self) {
        {
            let mut state = self.state.lock();
            if *state != ConnectionState::Closing {
                *state = ConnectionState::Closed;
            }
        }
        drop(self.writer.lock().await.take());
        self.fail_pending();
    }

    fn dispatch(&self, frame: Frame) {
        match frame.command() {
            Command::Response => self.dispatch_response(&frame),
            Command::Result => self.dispatch_result(&frame),
            other => {
                tracing::debug!(command = %other, seq_no = frame.seq_no(), "ignoring frame");
            }
        }
    }

    fn dispatch_response(&self, frame: &Frame) {
        let seq_no = frame.seq_no();
        let response = match Response::from_frame(frame) {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(seq_no, error = %err, "discarding malformed response");
                return;
            }
        };

        tracing::trace!(seq_no, status = %response.status, "response");
        match self.pending.take_response(seq_no, !response.is_ok()) {
            Some(handler) => handler(Ok(response)),
            None => tracing::debug!(seq_no, "no pending request for response"),
        }
    }

    fn dispatch_result(&self, frame: &Frame) {
        let seq_no = frame.seq_no();
        let finished = frame
            .first_value_str("finished")
            .map(|v| parse_bool(&v))
            .unwrap_or(false);

        let Some(sink) = self.pending.result_sink(seq_no, finished) else {
            tracing::debug!(seq_no, "no pending request for result");
            return;
        };

        match sink {
            ResultSink::Messages(handler) => {
                let message = Message::from_frame(frame, finished);
                (*handler.lock())(Ok(message));
            }
            ResultSink::Children(handler) => {
                let event = if finished {
                    ListEvent::Finished
                } else {
                    match frame.first_value_str("child") {
                        Some(child) => ListEvent::Child(child.into_owned()),
                        None => {
                            tracing::warn!(seq_no, "list result without child");
                            return;
                        }
                    }
                };
                (*handler.lock())(Ok(event));
            }
        }
    }
}

async fn read_loop(
    shared: Arc<Shared>,
    mut reader: BufReader<OwnedReadHalf>,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::debug!("read_loop started");

    loop {
        let result = tokio::select! {
            _ = shutdown.changed() => {
                tracing::debug!("read_loop: shutdown requested");
                return;
            }
            result = read_frame(&mut reader) => result,
        };

        let err = match result {
            Ok(frame) => {
                shared.dispatch(frame);
                continue;
            }
            Err(err) => err,
        };

        let err = if err.is_invalid_frame() {
            tracing::warn!(error = %err, "read_loop: discarding invalid frame");
            let resync = tokio::select! {
                _ = shutdown.changed() => return,
                resync = skip_to_terminator(&mut reader) => resync,
            };
            match resync {
                Ok(_) => continue,
                Err(err) => err,
            }
        } else {
            err
        };

        if err.io_kind().is_some_and(is_disconnect) {
            tracing::debug!(error = %err, "read_loop: connection lost");
            break;
        }

        tracing::warn!(error = %err, "read_loop: read error");
        tokio::time::sleep(READ_ERROR_BACKOFF).await;
    }

    shared.connection_lost().await;
}

/// A connection to a Bosswave router.
pub struct Connection {
    config: ConnectionConfig,
    sequence: Arc<dyn SequenceSource>,
    shared: Arc<Shared>,
    shutdown: Mutex<Option<watch::Sender<bool>>>,
    reader_task: Mutex<Option<JoinHandle<()>>>,
}

impl Connection {
    /// Creates a new connection (not yet connected) using random sequence numbers.
    pub fn new(config: ConnectionConfig) -> Self {
        Self::with_sequence(config, Arc::new(RandomSequence))
    }

    /// Creates a new connection drawing sequence numbers from `sequence`.
    pub fn with_sequence(config: ConnectionConfig, sequence: Arc<dyn SequenceSource>) -> Self {
        Self {
            config,
            sequence,
            shared: Arc::new(Shared {
                state: Mutex::new(ConnectionState::Closed),
                writer: tokio::sync::Mutex::new(None),
                pending: PendingTable::new(),
            }),
            shutdown: Mutex::new(None),
            reader_task: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Connects to the router and waits for its `helo` frame.
    ///
    /// On success the read loop is running and the connection is
    /// [`Ready`](ConnectionState::Ready). On failure the socket is closed.
    pub async fn connect(&self) -> Result<(), ClientError> {
        {
            let mut state = self.shared.state.lock();
            if *state != ConnectionState::Closed {
                return Err(ClientError::AlreadyConnected);
            }
            *state = ConnectionState::Connecting;
        }

        let (reader, writer) = match self.establish().await {
            Ok(halves) => halves,
            Err(err) => {
                self.shared.set_state(ConnectionState::Closed);
                return Err(err);
            }
        };

        {
            let mut state = self.shared.state.lock();
            if *state != ConnectionState::Connecting {
                tracing::debug!("Connection closed during handshake");
                return Err(ClientError::ConnectionClosed);
            }
            *state = ConnectionState::Ready;
        }

        *self.shared.writer.lock().await = Some(writer);
        self.shared.pending.reopen();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        *self.shutdown.lock() = Some(shutdown_tx);
        let task = tokio::spawn(read_loop(self.shared.clone(), reader, shutdown_rx));
        *self.reader_task.lock() = Some(task);

        Ok(())
    }

    async fn establish(&self) -> Result<(BufReader<OwnedReadHalf>, OwnedWriteHalf), ClientError> {
        tracing::debug!("Connecting to {}...", self.config.addr);

        let stream = tokio::time::timeout(
            self.config.connect_timeout,
            TcpStream::connect(self.config.addr),
        )
        .await
        .map_err(|_| {
            tracing::debug!("Connection timeout");
            ClientError::Timeout
        })?
        .map_err(|e| {
            tracing::debug!("Connection failed: {}", e);
            ClientError::Io(e)
        })?;

        stream.set_nodelay(true).ok();

        let (read_half, write_half) = stream.into_split();
        let mut reader = BufReader::with_capacity(self.config.read_buffer_size, read_half);

        tracing::debug!("TCP connected, waiting for helo...");
        let hello = tokio::time::timeout(self.config.handshake_timeout, read_frame(&mut reader))
            .await
            .map_err(|_| {
                tracing::debug!("Handshake timeout");
                ClientError::Timeout
            })?
            .map_err(client_error)?;

        if hello.command() != Command::Hello {
            tracing::debug!(command = %hello.command(), "Router did not greet with helo");
            return Err(ClientError::ProtocolViolation {
                command: hello.command(),
            });
        }

        tracing::debug!("Handshake complete");
        Ok((reader, write_half))
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Returns whether the connection is ready for requests.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Ready
    }

    /// Returns the number of requests still awaiting a response or results.
    pub fn pending_count(&self) -> usize {
        self.shared.pending.len()
    }

    /// Drops the callbacks of an outstanding request without invoking them.
    /// Returns whether the request was still pending.
    pub fn forget(&self, seq_no: u32) -> bool {
        self.shared.pending.remove(seq_no).is_some()
    }

    /// Registers `op` under the frame's sequence number and writes the frame.
    ///
    /// Every outcome is reported exactly once. If the write fails the
    /// registration is undone and the error is returned without invoking
    /// `op`. If the connection was lost while the frame waited for the
    /// writer, `op` has already been failed with `ConnectionClosed` and
    /// `Ok` is returned.
    async fn send(&self, frame: Frame, op: PendingOperation) -> Result<u32, ClientError> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }

        let seq_no = frame.seq_no();
        if self.shared.pending.insert(seq_no, op).is_err() {
            return Err(ClientError::NotConnected);
        }

        let written = {
            let mut writer_guard = self.shared.writer.lock().await;
            match writer_guard.as_mut() {
                Some(writer) => write_frame(&frame, writer).await.map_err(client_error),
                None => Err(ClientError::NotConnected),
            }
        };

        if let Err(err) = written {
            tracing::debug!(seq_no, error = %err, "Failed to send {}", frame.command());
            if self.shared.pending.remove(seq_no).is_none() {
                // Drained by connection loss; callbacks already notified.
                return Ok(seq_no);
            }
            return Err(err);
        }

        tracing::debug!(seq_no, "Sent {}", frame.command());
        Ok(seq_no)
    }

    /// Publishes (or persists) a message. Returns the request's sequence number.
    pub async fn publish<F>(&self, request: &PublishRequest, on_response: F) -> Result<u32, ClientError>
    where
        F: FnOnce(Result<Response, ClientError>) + Send + 'static,
    {
        let frame = request.to_frame(self.sequence.next_seq());
        self.send(frame, PendingOperation::new(Box::new(on_response), None))
            .await
    }

    /// Subscribes to a URI. `on_message` receives every matching message
    /// until the subscription ends or the connection closes.
    pub async fn subscribe<F, M>(
        &self,
        request: &SubscribeRequest,
        on_response: F,
        on_message: M,
    ) -> Result<u32, ClientError>
    where
        F: FnOnce(Result<Response, ClientError>) + Send + 'static,
        M: FnMut(Result<Message, ClientError>) + Send + 'static,
    {
        let frame = request.to_frame(self.sequence.next_seq());
        let op = PendingOperation::new(
            Box::new(on_response),
            Some(ResultSink::messages(Box::new(on_message))),
        );
        self.send(frame, op).await
    }

    /// Queries persisted messages. The last message has `finished` set.
    pub async fn query<F, M>(
        &self,
        request: &QueryRequest,
        on_response: F,
        on_message: M,
    ) -> Result<u32, ClientError>
    where
        F: FnOnce(Result<Response, ClientError>) + Send + 'static,
        M: FnMut(Result<Message, ClientError>) + Send + 'static,
    {
        let frame = request.to_frame(self.sequence.next_seq());
        let op = PendingOperation::new(
            Box::new(on_response),
            Some(ResultSink::messages(Box::new(on_message))),
        );
        self.send(frame, op).await
    }

    /// Lists the children of a URI, ending with [`ListEvent::Finished`].
    pub async fn list<F, L>(
        &self,
        request: &ListRequest,
        on_response: F,
        on_event: L,
    ) -> Result<u32, ClientError>
    where
        F: FnOnce(Result<Response, ClientError>) + Send + 'static,
        L: FnMut(Result<ListEvent, ClientError>) + Send + 'static,
    {
        let frame = request.to_frame(self.sequence.next_seq());
        let op = PendingOperation::new(
            Box::new(on_response),
            Some(ResultSink::children(Box::new(on_event))),
        );
        self.send(frame, op).await
    }

    /// Creates an entity. The new entity arrives as a result message.
    pub async fn make_entity<F, M>(
        &self,
        request: &MakeEntityRequest,
        on_response: F,
        on_message: M,
    ) -> Result<u32, ClientError>
    where
        F: FnOnce(Result<Response, ClientError>) + Send + 'static,
        M: FnMut(Result<Message, ClientError>) + Send + 'static,
    {
        self.send_with_result(request.to_frame(self.sequence.next_seq()), on_response, on_message)
            .await
    }

    /// Creates a DOT. The new DOT arrives as a result message.
    pub async fn make_dot<F, M>(
        &self,
        request: &MakeDotRequest,
        on_response: F,
        on_message: M,
    ) -> Result<u32, ClientError>
    where
        F: FnOnce(Result<Response, ClientError>) + Send + 'static,
        M: FnMut(Result<Message, ClientError>) + Send + 'static,
    {
        self.send_with_result(request.to_frame(self.sequence.next_seq()), on_response, on_message)
            .await
    }

    /// Creates a DOT chain. The new chain arrives as a result message.
    pub async fn make_chain<F, M>(
        &self,
        request: &MakeChainRequest,
        on_response: F,
        on_message: M,
    ) -> Result<u32, ClientError>
    where
        F: FnOnce(Result<Response, ClientError>) + Send + 'static,
        M: FnMut(Result<Message, ClientError>) + Send + 'static,
    {
        self.send_with_result(request.to_frame(self.sequence.next_seq()), on_response, on_message)
            .await
    }

    async fn send_with_result<F, M>(
        &self,
        frame: Frame,
        on_response: F,
        on_message: M,
    ) -> Result<u32, ClientError>
    where
        F: FnOnce(Result<Response, ClientError>) + Send + 'static,
        M: FnMut(Result<Message, ClientError>) + Send + 'static,
    {
        let op = PendingOperation::new(
            Box::new(on_response),
            Some(ResultSink::messages(Box::new(on_message))),
        );
        self.send(frame, op).await
    }

    /// Sets the entity this connection acts as.
    pub async fn set_entity<F>(&self, key: impl Into<Bytes>, on_response: F) -> Result<u32, ClientError>
    where
        F: FnOnce(Result<Response, ClientError>) + Send + 'static,
    {
        let frame = set_entity_frame(key.into(), self.sequence.next_seq());
        self.send(frame, PendingOperation::new(Box::new(on_response), None))
            .await
    }

    /// Loads an entity file and sets it as this connection's entity.
    pub async fn set_entity_file<F>(
        &self,
        path: impl AsRef<Path>,
        on_response: F,
    ) -> Result<u32, ClientError>
    where
        F: FnOnce(Result<Response, ClientError>) + Send + 'static,
    {
        let key = load_entity_file(path).await?;
        self.set_entity(key, on_response).await
    }

    /// Closes the connection.
    ///
    /// Stops the read loop, closes the socket and fails every pending
    /// callback with [`ClientError::ConnectionClosed`]. Closing an already
    /// closed connection does nothing.
    pub async fn close(&self) -> Result<(), ClientError> {
        {
            let mut state = self.shared.state.lock();
            if *state == ConnectionState::Closed {
                return Ok(());
            }
            *state = ConnectionState::Closing;
        }
        tracing::debug!("Closing connection...");

        if let Some(shutdown) = self.shutdown.lock().take() {
            let _ = shutdown.send(true);
        }

        if let Some(mut writer) = self.shared.writer.lock().await.take() {
            tracing::debug!("Shutting down writer");
            let _ = writer.shutdown().await;
        }

        let task = self.reader_task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::warn!("read_loop task failed: {}", e);
            }
        }

        self.shared.fail_pending();
        self.shared.set_state(ConnectionState::Closed);
        tracing::debug!("Connection closed");
        Ok(())
    }
}
