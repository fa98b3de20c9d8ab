//! Axum `WebSocket` adapter.
//!
//! Splits an upgraded socket into an outbound [`Transport`] and an inbound
//! frame stream, so the lifecycle manager never touches Axum types.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use bankadmin_core::{Frame, Transport, TransportError};
use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, Stream, StreamExt,
};

/// Outbound half of an upgraded `WebSocket`.
pub struct WsTransport {
    sink: SplitSink<WebSocket, Message>,
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        self.sink.send(to_message(frame)).await.map_err(io_error)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        // Sends the close frame, then shuts the sink.
        self.sink.close().await.map_err(io_error)
    }
}

/// Split `socket` into its outbound transport and inbound frame stream.
pub fn split(
    socket: WebSocket,
) -> (
    WsTransport,
    impl Stream<Item = Result<Frame, TransportError>> + Send + Unpin + 'static,
) {
    let (sink, stream) = socket.split();
    (WsTransport { sink }, inbound(stream))
}

fn inbound(
    stream: SplitStream<WebSocket>,
) -> impl Stream<Item = Result<Frame, TransportError>> + Send + Unpin + 'static {
    stream.map(|message| message.map(from_message).map_err(io_error))
}

fn to_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text),
        Frame::Binary(bytes) => Message::Binary(bytes),
        Frame::Ping(payload) => Message::Ping(payload),
        Frame::Pong(payload) => Message::Pong(payload),
        Frame::Close => Message::Close(None),
    }
}

fn from_message(message: Message) -> Frame {
    match message {
        Message::Text(text) => Frame::Text(text),
        Message::Binary(bytes) => Frame::Binary(bytes),
        Message::Ping(payload) => Frame::Ping(payload),
        Message::Pong(payload) => Frame::Pong(payload),
        Message::Close(_) => Frame::Close,
    }
}

#[allow(clippy::needless_pass_by_value)]
fn io_error(error: axum::Error) -> TransportError {
    TransportError::Io(error.to_string())
}
