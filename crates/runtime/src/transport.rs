//! Transport seam: sender/receiver traits and the WebSocket implementation.
//!
//! The supervisor never names a concrete socket type; it works against
//! [`Transport`] (outbound frames), [`TransportReceiver`] (the read loop),
//! and [`Connector`] (a factory producing a fresh pair per connection
//! attempt). [`WebSocketConnector`] is the production implementation;
//! [`crate::fake`] provides the in-memory one.

use std::future::Future;
use std::pin::Pin;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use roomchat_protocol::{ClientFrame, ServerFrame};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::error::{Result, TransportError};

/// Outbound half of a live connection.
pub trait Transport: Send {
	fn send(&mut self, frame: ClientFrame) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Inbound half of a live connection; drives the read loop to completion.
pub trait TransportReceiver: Send {
	fn run(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>>;
}

/// Everything needed to operate one connection.
pub struct TransportParts {
	pub sender: Box<dyn Transport>,
	pub receiver: Box<dyn TransportReceiver>,
	/// Single consumer channel carrying parsed inbound frames in arrival
	/// order.
	pub frame_rx: mpsc::UnboundedReceiver<ServerFrame>,
}

/// Factory producing fresh [`TransportParts`] per connection attempt.
pub trait Connector: Send + Sync {
	fn connect(&self, url: &str) -> Pin<Box<dyn Future<Output = Result<TransportParts>> + Send + '_>>;
}

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// WebSocket transport carrying JSON-encoded frames as text messages.
pub struct WebSocketTransport {
	sender: WebSocketSender,
	receiver: WebSocketReceiver,
}

impl WebSocketTransport {
	/// Opens a WebSocket connection to `url` and returns the transport
	/// plus the inbound frame channel.
	pub async fn connect(url: &str) -> Result<(Self, mpsc::UnboundedReceiver<ServerFrame>)> {
		let (stream, _) = connect_async(url)
			.await
			.map_err(|err| TransportError::Connect(err.to_string()))?;
		let (ws_tx, ws_rx) = stream.split();
		let (frame_tx, frame_rx) = mpsc::unbounded_channel();

		let transport = Self {
			sender: WebSocketSender { ws_tx },
			receiver: WebSocketReceiver { ws_rx, frame_tx },
		};
		Ok((transport, frame_rx))
	}

	/// Splits into boxed parts for the supervisor.
	pub fn into_transport_parts(self, frame_rx: mpsc::UnboundedReceiver<ServerFrame>) -> TransportParts {
		TransportParts {
			sender: Box::new(self.sender),
			receiver: Box::new(self.receiver),
			frame_rx,
		}
	}
}

struct WebSocketSender {
	ws_tx: WsSink,
}

impl Transport for WebSocketSender {
	fn send(&mut self, frame: ClientFrame) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
		Box::pin(async move {
			let text = serde_json::to_string(&frame)?;
			self.ws_tx
				.send(Message::Text(text.into()))
				.await
				.map_err(|_| TransportError::Closed)
		})
	}
}

struct WebSocketReceiver {
	ws_rx: WsStream,
	frame_tx: mpsc::UnboundedSender<ServerFrame>,
}

impl TransportReceiver for WebSocketReceiver {
	fn run(mut self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
		Box::pin(async move {
			while let Some(item) = self.ws_rx.next().await {
				match item {
					Ok(Message::Text(text)) => match serde_json::from_str::<ServerFrame>(&text) {
						Ok(frame) => {
							if self.frame_tx.send(frame).is_err() {
								break;
							}
						}
						Err(err) => {
							tracing::warn!(target: "chat.transport", error = %err, "skipping unparseable frame");
						}
					},
					Ok(Message::Close(_)) => break,
					Ok(_) => {}
					Err(err) => {
						tracing::debug!(target: "chat.transport", error = %err, "websocket read failed");
						return Err(TransportError::Closed);
					}
				}
			}
			Ok(())
		})
	}
}

/// Production [`Connector`] dialing a WebSocket endpoint.
pub struct WebSocketConnector;

impl Connector for WebSocketConnector {
	fn connect(&self, url: &str) -> Pin<Box<dyn Future<Output = Result<TransportParts>> + Send + '_>> {
		let url = url.to_string();
		Box::pin(async move {
			let (transport, frame_rx) = WebSocketTransport::connect(&url).await?;
			Ok(transport.into_transport_parts(frame_rx))
		})
	}
}
