//! Transport seam: how a connection is opened.

use crate::error::ClientError;
use async_trait::async_trait;
use futures_util::{future, Sink, SinkExt, Stream, StreamExt};
use std::pin::Pin;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

pub type FrameSink = Pin<Box<dyn Sink<String, Error = ClientError> + Send>>;
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String, ClientError>> + Send>>;

/// An open connection: outbound text frames in, inbound text frames out.
///
/// The stream ends when the peer closes. A policy-violation close surfaces
/// as [`ClientError::Rejected`] before the end; a refused handshake never
/// produces a `Connection` at all.
pub struct Connection {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Connection, ClientError>;
}

/// A refused handshake carries the hub's reason in the response body.
fn connect_error(error: WsError) -> ClientError {
    match error {
        WsError::Http(response) if response.status() == StatusCode::UNAUTHORIZED => {
            let reason = response
                .body()
                .as_deref()
                .map(|body| String::from_utf8_lossy(body).into_owned())
                .filter(|body| !body.is_empty())
                .unwrap_or_else(|| response.status().to_string());
            ClientError::Rejected(reason)
        }
        other => ClientError::Connect(other.to_string()),
    }
}

/// WebSocket connector backed by tokio-tungstenite.
#[derive(Debug, Default, Clone, Copy)]
pub struct TungsteniteConnector;

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self, url: &str) -> Result<Connection, ClientError> {
        let (ws_stream, _) = connect_async(url).await.map_err(connect_error)?;
        let (write, read) = ws_stream.split();

        let sink = write
            .sink_map_err(|e| ClientError::Transport(e.to_string()))
            .with(|text: String| future::ok::<_, ClientError>(Message::Text(text.into())));

        let stream = read.filter_map(|msg| {
            future::ready(match msg {
                Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
                Ok(Message::Close(Some(frame))) if frame.code == CloseCode::Policy => {
                    Some(Err(ClientError::Rejected(frame.reason.as_str().to_owned())))
                }
                Ok(_) => None,
                Err(e) => Some(Err(ClientError::Transport(e.to_string()))),
            })
        });

        Ok(Connection {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        })
    }
}
