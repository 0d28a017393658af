//! WebSocket transport for the event stream.

use std::time::{Duration, Instant};

use futures::{FutureExt, SinkExt, StreamExt};
use ss3link_types::{SharedClock, SharedCredentialSource};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    Connector, MaybeTlsStream, WebSocketStream, connect_async_tls_with_config,
    tungstenite::Message,
};

use crate::error::{Result, StreamError};
use crate::session::{Action, Session, StreamState};

/// Vendor event-stream endpoint.
pub const DEFAULT_STREAM_URL: &str = "wss://socketlink.prd.aser.simplisafe.com";

/// Default `source` attribute on outbound messages.
const DEFAULT_SOURCE: &str = "ss3link";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Callbacks for stream activity.
///
/// Called from inside [`EventStreamClient::poll`]. Implementations must not
/// block: no network calls from a callback.
pub trait EventHandler: Send {
    /// An event arrived on a subscribed stream.
    fn on_event(&mut self, code: i64, subject: &str);

    /// The handshake completed.
    fn on_connect(&mut self);

    /// A connection that had been opened is gone.
    fn on_disconnect(&mut self);
}

/// Where and how to connect.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub url: String,
    /// PEM anchor; when set, only chains leading to it are accepted on `wss`.
    pub ca_pem: Option<String>,
    pub source: String,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_STREAM_URL.to_string(),
            ca_pem: None,
            source: DEFAULT_SOURCE.to_string(),
        }
    }
}

impl StreamConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_ca_pem(mut self, pem: impl Into<String>) -> Self {
        self.ca_pem = Some(pem.into());
        self
    }
}

/// Event-stream client driven by the host's loop.
pub struct EventStreamClient<H: EventHandler> {
    config: StreamConfig,
    credentials: SharedCredentialSource,
    clock: SharedClock,
    handler: H,
    session: Session,
    socket: Option<WsStream>,
    connected_at: Option<Instant>,
}

impl<H: EventHandler> std::fmt::Debug for EventStreamClient<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStreamClient")
            .field("url", &self.config.url)
            .field("state", &self.session.state())
            .finish_non_exhaustive()
    }
}

impl<H: EventHandler> EventStreamClient<H> {
    pub fn new(
        config: StreamConfig,
        credentials: SharedCredentialSource,
        clock: SharedClock,
        handler: H,
    ) -> Self {
        let session = Session::new(config.source.clone());
        Self {
            config,
            credentials,
            clock,
            handler,
            session,
            socket: None,
            connected_at: None,
        }
    }

    pub fn state(&self) -> StreamState {
        self.session.state()
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Open the socket for `user_id`. Any previous connection is dropped first.
    pub async fn connect(&mut self, user_id: &str) -> Result<()> {
        if self.socket.is_some() {
            self.lost("reconnecting");
        }

        let connector = self.connector()?;
        tracing::info!(url = %self.config.url, "Connecting to event stream");
        let (socket, _) = connect_async_tls_with_config(self.config.url.as_str(), None, false, connector)
            .await
            .map_err(|e| {
                tracing::warn!(url = %self.config.url, error = %e, "Event stream connection failed");
                StreamError::Connect(e.to_string())
            })?;

        self.socket = Some(socket);
        self.connected_at = Some(self.clock.now());
        self.session.open(user_id);
        tracing::debug!("Event stream socket open, waiting for hello");
        Ok(())
    }

    /// Process frames that are already buffered. Never waits for new data.
    ///
    /// A send failure is returned after the connection has been torn down.
    pub async fn poll(&mut self) -> Result<()> {
        loop {
            let Some(socket) = self.socket.as_mut() else {
                return Ok(());
            };

            let Some(next) = socket.next().now_or_never() else {
                return Ok(());
            };

            match next {
                Some(Ok(Message::Text(text))) => {
                    let action =
                        self.session
                            .handle_text(&text, self.credentials.as_ref(), self.clock.as_ref());
                    if let Some(action) = action {
                        self.dispatch(action).await?;
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!(frame = ?frame, "Event stream closed by server");
                    self.lost("closed by server");
                    return Ok(());
                }
                Some(Ok(Message::Binary(_) | Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "Event stream error");
                    self.lost("socket error");
                    return Ok(());
                }
                None => {
                    self.lost("end of stream");
                    return Ok(());
                }
            }
        }
    }

    /// Close the socket. Fires `on_disconnect` if a connection was open.
    pub async fn disconnect(&mut self) {
        self.connected_at = None;
        if let Some(mut socket) = self.socket.take()
            && let Err(e) = socket.close(None).await
        {
            tracing::debug!(error = %e, "Error while closing event stream");
        }
        if self.session.close() {
            tracing::info!("Event stream disconnected");
            self.handler.on_disconnect();
        }
    }

    async fn dispatch(&mut self, action: Action) -> Result<()> {
        match action {
            Action::Reply(envelope) => {
                let json = envelope
                    .to_json()
                    .map_err(|e| StreamError::Send(e.to_string()))?;
                let socket = self.socket.as_mut().ok_or(StreamError::NotConnected)?;
                if let Err(e) = socket.send(Message::Text(json.into())).await {
                    tracing::warn!(error = %e, "Failed to send on event stream");
                    self.lost("send failed");
                    return Err(StreamError::Send(e.to_string()));
                }
            }
            Action::Connected => self.handler.on_connect(),
            Action::Event(event) => self.handler.on_event(event.code, &event.subject),
        }
        Ok(())
    }

    /// Close a connection that has not reached `Subscribed` within `timeout`
    /// of opening. Returns whether it was closed.
    ///
    /// A server that never says hello, or a hello that arrived while no token
    /// was held, otherwise leaves the session half-open for good.
    pub async fn abandon_stalled_handshake(&mut self, timeout: Duration) -> bool {
        let Some(connected_at) = self.connected_at else {
            return false;
        };
        if self.session.state() == StreamState::Subscribed {
            return false;
        }
        let waited = self.clock.now().saturating_duration_since(connected_at);
        if waited < timeout {
            return false;
        }

        tracing::warn!(
            state = %self.session.state(),
            waited_ms = waited.as_millis() as u64,
            "Event stream handshake stalled, closing"
        );
        self.disconnect().await;
        true
    }

    fn lost(&mut self, reason: &str) {
        self.socket = None;
        self.connected_at = None;
        if self.session.close() {
            tracing::warn!(reason, "Event stream lost");
            self.handler.on_disconnect();
        }
    }

    fn connector(&self) -> Result<Option<Connector>> {
        let Some(pem) = &self.config.ca_pem else {
            return Ok(None);
        };
        let cert = native_tls::Certificate::from_pem(pem.as_bytes())
            .map_err(|e| StreamError::Tls(e.to_string()))?;
        let tls = native_tls::TlsConnector::builder()
            .disable_built_in_roots(true)
            .add_root_certificate(cert)
            .build()
            .map_err(|e| StreamError::Tls(e.to_string()))?;
        Ok(Some(Connector::NativeTls(tls)))
    }
}
