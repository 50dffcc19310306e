//! High-level client API.
//!
//! [`Client`] wraps a [`Connection`] and turns its callbacks into async
//! calls: every method waits for the router's response and reports a
//! non-`okay` status as [`ClientError::Server`].

use crate::connection::{Connection, ConnectionConfig};
use crate::error::ClientError;
use crate::message::{ListEvent, Message, Response};
use crate::request::{
    ListRequest, MakeChainRequest, MakeDotRequest, MakeEntityRequest, PublishRequest,
    QueryRequest, SubscribeRequest,
};
use bosswave_protocol::SequenceSource;
use bytes::Bytes;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

type ResponseReceiver = oneshot::Receiver<Result<Response, ClientError>>;
type ResultReceiver<T> = mpsc::UnboundedReceiver<Result<T, ClientError>>;

fn response_channel() -> (
    impl FnOnce(Result<Response, ClientError>) + Send + 'static,
    ResponseReceiver,
) {
    let (tx, rx) = oneshot::channel();
    (
        move |response| {
            let _ = tx.send(response);
        },
        rx,
    )
}

fn result_channel<T: Send + 'static>() -> (
    impl FnMut(Result<T, ClientError>) + Send + 'static,
    ResultReceiver<T>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        move |result| {
            let _ = tx.send(result);
        },
        rx,
    )
}

/// Messages delivered by an active subscription.
///
/// Dropping the subscription removes it from the connection's pending
/// table; later results for it are ignored.
pub struct Subscription {
    seq_no: u32,
    rx: ResultReceiver<Message>,
    conn: Arc<Connection>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.conn.forget(self.seq_no) {
            tracing::debug!("Dropped subscription seq_no={}", self.seq_no);
        }
    }
}

impl Subscription {
    /// Sequence number of the `subs` request.
    pub fn seq_no(&self) -> u32 {
        self.seq_no
    }

    /// Waits for the next message. Returns `None` once the subscription
    /// has ended and every message has been received.
    pub async fn next(&mut self) -> Option<Result<Message, ClientError>> {
        self.rx.recv().await
    }
}

/// High-level client for a Bosswave router.
pub struct Client {
    conn: Arc<Connection>,
}

impl Client {
    /// Creates a new client with the given configuration.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            conn: Arc::new(Connection::new(config)),
        }
    }

    /// Creates a new client drawing sequence numbers from `sequence`.
    pub fn with_sequence(config: ConnectionConfig, sequence: Arc<dyn SequenceSource>) -> Self {
        Self {
            conn: Arc::new(Connection::with_sequence(config, sequence)),
        }
    }

    /// Connects to the router. If the configuration names an entity file it
    /// is installed before returning.
    pub async fn connect(&self) -> Result<(), ClientError> {
        self.conn.connect().await?;

        if let Some(path) = self.conn.config().entity_file.clone() {
            tracing::debug!("Setting entity from {}", path.display());
            if let Err(e) = self.set_entity_file(&path).await {
                let _ = self.conn.close().await;
                return Err(e);
            }
        }
        Ok(())
    }

    /// Returns whether the client is connected.
    pub fn is_connected(&self) -> bool {
        self.conn.is_connected()
    }

    /// Closes the connection.
    pub async fn close(&self) -> Result<(), ClientError> {
        self.conn.close().await
    }

    /// Returns the underlying connection.
    pub fn connection(&self) -> Arc<Connection> {
        self.conn.clone()
    }

    fn timeout(&self) -> Duration {
        self.conn.config().request_timeout
    }

    // =========================================================================
    // Helper methods
    // =========================================================================

    async fn await_response(&self, seq_no: u32, rx: ResponseReceiver) -> Result<(), ClientError> {
        let response = tokio::time::timeout(self.timeout(), rx)
            .await
            .map_err(|_| {
                tracing::debug!("Request seq_no={} timed out", seq_no);
                self.conn.forget(seq_no);
                ClientError::Timeout
            })?
            .map_err(|_| ClientError::ConnectionClosed)??;

        response.into_result()
    }

    async fn next_result<T>(&self, seq_no: u32, rx: &mut ResultReceiver<T>) -> Result<T, ClientError> {
        match tokio::time::timeout(self.timeout(), rx.recv()).await {
            Ok(Some(result)) => result,
            Ok(None) => Err(ClientError::ConnectionClosed),
            Err(_) => {
                tracing::debug!("Results for seq_no={} timed out", seq_no);
                self.conn.forget(seq_no);
                Err(ClientError::Timeout)
            }
        }
    }

    async fn first_message(
        &self,
        seq_no: u32,
        response: ResponseReceiver,
        mut results: ResultReceiver<Message>,
    ) -> Result<Message, ClientError> {
        self.await_response(seq_no, response).await?;
        let message = self.next_result(seq_no, &mut results).await?;
        if !message.finished {
            self.conn.forget(seq_no);
        }
        Ok(message)
    }

    // =========================================================================
    // Messaging
    // =========================================================================

    /// Publishes (or persists) a message.
    pub async fn publish(&self, request: &PublishRequest) -> Result<(), ClientError> {
        let (on_response, rx) = response_channel();
        let seq_no = self.conn.publish(request, on_response).await?;
        self.await_response(seq_no, rx).await
    }

    /// Subscribes to a URI pattern.
    pub async fn subscribe(&self, request: &SubscribeRequest) -> Result<Subscription, ClientError> {
        let (on_response, response) = response_channel();
        let (on_message, rx) = result_channel::<Message>();
        let seq_no = self.conn.subscribe(request, on_response, on_message).await?;
        self.await_response(seq_no, response).await?;
        Ok(Subscription {
            seq_no,
            rx,
            conn: self.conn.clone(),
        })
    }

    /// Queries persisted messages and collects them.
    ///
    /// The closing `finished` result is included only if it carries a URI
    /// or payload objects.
    pub async fn query(&self, request: &QueryRequest) -> Result<Vec<Message>, ClientError> {
        let (on_response, response) = response_channel();
        let (on_message, mut rx) = result_channel::<Message>();
        let seq_no = self.conn.query(request, on_response, on_message).await?;
        self.await_response(seq_no, response).await?;

        let mut messages = Vec::new();
        loop {
            let message = self.next_result(seq_no, &mut rx).await?;
            if !message.finished {
                messages.push(message);
                continue;
            }
            if !message.uri.is_empty() || !message.payload_objects.is_empty() {
                messages.push(message);
            }
            return Ok(messages);
        }
    }

    /// Lists the children of a URI.
    pub async fn list(&self, request: &ListRequest) -> Result<Vec<String>, ClientError> {
        let (on_response, response) = response_channel();
        let (on_event, mut rx) = result_channel::<ListEvent>();
        let seq_no = self.conn.list(request, on_response, on_event).await?;
        self.await_response(seq_no, response).await?;

        let mut children = Vec::new();
        loop {
            match self.next_result(seq_no, &mut rx).await? {
                ListEvent::Child(child) => children.push(child),
                ListEvent::Finished => return Ok(children),
            }
        }
    }

    // =========================================================================
    // Entities, DOTs and chains
    // =========================================================================

    /// Creates an entity and returns the result describing it.
    pub async fn make_entity(&self, request: &MakeEntityRequest) -> Result<Message, ClientError> {
        let (on_response, response) = response_channel();
        let (on_message, rx) = result_channel::<Message>();
        let seq_no = self.conn.make_entity(request, on_response, on_message).await?;
        self.first_message(seq_no, response, rx).await
    }

    /// Creates a DOT and returns the result describing it.
    pub async fn make_dot(&self, request: &MakeDotRequest) -> Result<Message, ClientError> {
        let (on_response, response) = response_channel();
        let (on_message, rx) = result_channel::<Message>();
        let seq_no = self.conn.make_dot(request, on_response, on_message).await?;
        self.first_message(seq_no, response, rx).await
    }

    /// Creates a DOT chain and returns the result describing it.
    pub async fn make_chain(&self, request: &MakeChainRequest) -> Result<Message, ClientError> {
        let (on_response, response) = response_channel();
        let (on_message, rx) = result_channel::<Message>();
        let seq_no = self.conn.make_chain(request, on_response, on_message).await?;
        self.first_message(seq_no, response, rx).await
    }

    /// Sets the entity this client acts as.
    pub async fn set_entity(&self, key: impl Into<Bytes>) -> Result<(), ClientError> {
        let (on_response, rx) = response_channel();
        let seq_no = self.conn.set_entity(key, on_response).await?;
        self.await_response(seq_no, rx).await
    }

    /// Loads an entity file and sets it as this client's entity.
    pub async fn set_entity_file(&self, path: impl AsRef<Path>) -> Result<(), ClientError> {
        let (on_response, rx) = response_channel();
        let seq_no = self.conn.set_entity_file(path, on_response).await?;
        self.await_response(seq_no, rx).await
    }
}
