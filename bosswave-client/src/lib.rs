//! # bosswave-client
//!
//! Client library for the Bosswave router.
//!
//! This crate provides:
//! - A router [`Connection`] with a background read loop that dispatches
//!   responses and results to per-request callbacks
//! - Typed request parameters for every client operation
//! - A high-level async [`Client`] built on top of the connection

pub mod client;
pub mod connection;
pub mod entity;
pub mod error;
pub mod message;
mod pending;
pub mod request;

pub use client::{Client, Subscription};
pub use connection::{Connection, ConnectionConfig, ConnectionState};
pub use error::ClientError;
pub use message::{ListEvent, Message, Response};
pub use pending::{ListHandler, MessageHandler, ResponseHandler};
pub use request::{
    ChainElaborationLevel, ListRequest, MakeChainRequest, MakeDotRequest, MakeEntityRequest,
    PublishRequest, QueryRequest, SubscribeRequest,
};

#[cfg(test)]
pub(crate) mod test_support {
    //! An in-process stand-in for the router.

    use crate::connection::{Connection, ConnectionConfig};
    use crate::error::ClientError;
    use crate::message::{ListEvent, Message, Response};
    use crate::request::PublishRequest;
    use bosswave_protocol::{read_frame, write_frame, Command, CounterSequence, Frame};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
    use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    const WAIT: Duration = Duration::from_secs(5);

    pub(crate) type Rx<T> = mpsc::UnboundedReceiver<Result<T, ClientError>>;

    fn collector<T: Send + 'static>() -> (impl FnMut(Result<T, ClientError>) + Send + 'static, Rx<T>)
    {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            move |v| {
                let _ = tx.send(v);
            },
            rx,
        )
    }

    pub(crate) fn responses() -> (
        impl FnOnce(Result<Response, ClientError>) + Send + 'static,
        Rx<Response>,
    ) {
        collector::<Response>()
    }

    pub(crate) fn messages() -> (
        impl FnMut(Result<Message, ClientError>) + Send + 'static,
        Rx<Message>,
    ) {
        collector::<Message>()
    }

    pub(crate) fn list_events() -> (
        impl FnMut(Result<ListEvent, ClientError>) + Send + 'static,
        Rx<ListEvent>,
    ) {
        collector::<ListEvent>()
    }

    pub(crate) async fn recv_within<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
        tokio::time::timeout(WAIT, rx.recv())
            .await
            .expect("timed out waiting for callback")
            .expect("callback channel closed")
    }

    pub(crate) fn assert_quiet<T: std::fmt::Debug>(rx: &mut mpsc::UnboundedReceiver<T>) {
        if let Ok(unexpected) = rx.try_recv() {
            panic!("unexpected callback: {:?}", unexpected);
        }
    }

    pub(crate) fn hello_frame() -> Frame {
        Frame::builder(Command::Hello, 0).build()
    }

    pub(crate) struct FakeRouter {
        reader: BufReader<OwnedReadHalf>,
        writer: OwnedWriteHalf,
    }

    impl FakeRouter {
        /// Accepts one client and writes `greeting` to it.
        pub(crate) async fn accept(listener: TcpListener, greeting: Vec<u8>) -> Self {
            let (stream, _) = listener.accept().await.unwrap();
            let (read_half, mut writer) = stream.into_split();
            writer.write_all(&greeting).await.unwrap();
            Self {
                reader: BufReader::new(read_half),
                writer,
            }
        }

        pub(crate) async fn recv(&mut self) -> Frame {
            tokio::time::timeout(WAIT, read_frame(&mut self.reader))
                .await
                .expect("timed out waiting for frame")
                .unwrap()
        }

        pub(crate) async fn send(&mut self, frame: Frame) {
            write_frame(&frame, &mut self.writer).await.unwrap();
        }

        pub(crate) async fn send_raw(&mut self, bytes: &[u8]) {
            self.writer.write_all(bytes).await.unwrap();
        }

        pub(crate) async fn respond(&mut self, seq_no: u32, status: &str, reason: Option<&str>) {
            let mut builder = Frame::builder(Command::Response, seq_no).kv("status", status.to_string());
            if let Some(reason) = reason {
                builder = builder.kv("reason", reason.to_string());
            }
            self.send(builder.build()).await;
        }

        /// Round-trips one request so that every frame sent before it has
        /// been dispatched.
        pub(crate) async fn sync(&mut self, conn: &Connection) {
            let (on_response, mut rx) = responses();
            let seq_no = conn
                .publish(&PublishRequest::new("sync"), on_response)
                .await
                .unwrap();
            let frame = self.recv().await;
            assert_eq!(frame.seq_no(), seq_no);
            self.respond(seq_no, "okay", None).await;
            assert!(recv_within(&mut rx).await.unwrap().is_ok());
        }

        /// Waits for the client to close its end of the socket.
        pub(crate) async fn assert_closed(&mut self) {
            let mut rest = Vec::new();
            tokio::time::timeout(WAIT, self.reader.read_to_end(&mut rest))
                .await
                .expect("timed out waiting for close")
                .unwrap();
        }
    }

    /// A connected client and the router end of its socket. Sequence
    /// numbers start at 100.
    pub(crate) async fn connected_pair() -> (Connection, FakeRouter) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = tokio::spawn(FakeRouter::accept(listener, hello_frame().encode().to_vec()));

        let conn = Connection::with_sequence(
            ConnectionConfig::new(addr),
            Arc::new(CounterSequence::new(100)),
        );
        conn.connect().await.unwrap();
        (conn, router.await.unwrap())
    }
}
