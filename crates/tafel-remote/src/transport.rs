//! Connection configuration and the transport seam.
//!
//! The dispatcher owns exactly one transport per session. The transport
//! is polled, never blocked on: `poll` returns whatever frame the server
//! has delivered, or `None` when nothing is pending.

use std::net::TcpStream;

use smol_str::SmolStr;
use tracing::debug;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

use crate::error::RemoteError;

/// Explicit connection configuration, constructed at session start and
/// injected into the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectConfig {
    /// Websocket endpoint, `ws://` or `wss://`.
    pub url: String,
    /// Auth token presented to the server on connect.
    pub auth_token: SmolStr,
}

impl ConnectConfig {
    #[allow(missing_docs)]
    #[must_use]
    pub fn new(url: impl Into<String>, auth_token: impl Into<SmolStr>) -> Self {
        Self {
            url: url.into(),
            auth_token: auth_token.into(),
        }
    }

    /// Endpoint with the auth token applied as a query parameter.
    pub fn request_url(&self) -> Result<String, RemoteError> {
        if !self.url.starts_with("ws://") && !self.url.starts_with("wss://") {
            return Err(RemoteError::InvalidEndpoint(SmolStr::new(&self.url)));
        }
        if self.auth_token.is_empty() {
            return Ok(self.url.clone());
        }
        let separator = if self.url.contains('?') { '&' } else { '?' };
        Ok(format!("{}{}token={}", self.url, separator, self.auth_token))
    }
}

/// One bidirectional frame pipe to the server.
pub trait Transport: Send {
    /// Transmit one text frame.
    fn send(&mut self, frame: &str) -> Result<(), RemoteError>;

    /// Return the next delivered text frame, if any. Must not block.
    fn poll(&mut self) -> Result<Option<String>, RemoteError>;

    /// Close the connection (best-effort).
    fn close(&mut self);
}

/// Websocket transport over a non-blocking TCP stream.
pub struct WebSocketTransport {
    socket: WebSocket<MaybeTlsStream<TcpStream>>,
}

impl WebSocketTransport {
    /// Open a connection to the configured endpoint.
    pub fn connect(config: &ConnectConfig) -> Result<Self, RemoteError> {
        let url = config.request_url()?;
        let (socket, _response) = tungstenite::connect(url.as_str())
            .map_err(|err| RemoteError::Transport(SmolStr::new(err.to_string())))?;
        if let MaybeTlsStream::Plain(stream) = socket.get_ref() {
            stream
                .set_nonblocking(true)
                .map_err(|err| RemoteError::Transport(SmolStr::new(err.to_string())))?;
        }
        debug!("websocket connected to {url}");
        Ok(Self { socket })
    }
}

impl std::fmt::Debug for WebSocketTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketTransport").finish()
    }
}

fn is_would_block(err: &tungstenite::Error) -> bool {
    matches!(err, tungstenite::Error::Io(io) if io.kind() == std::io::ErrorKind::WouldBlock)
}

impl Transport for WebSocketTransport {
    fn send(&mut self, frame: &str) -> Result<(), RemoteError> {
        match self.socket.send(Message::text(frame)) {
            Ok(()) => Ok(()),
            // The frame is queued; flushing continues on the next call.
            Err(err) if is_would_block(&err) => Ok(()),
            Err(err) => Err(RemoteError::Transport(SmolStr::new(err.to_string()))),
        }
    }

    fn poll(&mut self) -> Result<Option<String>, RemoteError> {
        loop {
            match self.socket.read() {
                Ok(Message::Text(text)) => return Ok(Some(text.to_string())),
                // Control frames are handled by tungstenite itself.
                Ok(_) => {}
                Err(err) if is_would_block(&err) => return Ok(None),
                Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                    return Err(RemoteError::NotConnected);
                }
                Err(err) => return Err(RemoteError::Transport(SmolStr::new(err.to_string()))),
            }
        }
    }

    fn close(&mut self) {
        let _ = self.socket.close(None);
        let _ = self.socket.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_url_appends_token() {
        let config = ConnectConfig::new("ws://localhost:9000/events", "jwt-abc");
        assert_eq!(
            config.request_url().unwrap(),
            "ws://localhost:9000/events?token=jwt-abc"
        );
    }

    #[test]
    fn request_url_rejects_non_websocket_schemes() {
        let config = ConnectConfig::new("http://localhost:9000", "jwt");
        assert!(matches!(
            config.request_url(),
            Err(RemoteError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn request_url_without_token_is_untouched() {
        let config = ConnectConfig::new("wss://tafel.example/events", "");
        assert_eq!(config.request_url().unwrap(), "wss://tafel.example/events");
    }
}
