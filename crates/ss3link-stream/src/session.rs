//! Handshake state machine.
//!
//! Pure: consumes decoded text frames and returns what the transport should
//! do next. Frames that do not fit the current state are dropped, including a
//! `subscribed` that was not preceded by `registered`.

use ss3link_types::{Clock, CredentialSource};

use crate::protocol::{Envelope, MessageKind, StreamEvent};

/// Connection lifecycle, linear per connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StreamState {
    Disconnected,
    Connected,
    Identified,
    Subscribed,
}

impl std::fmt::Display for StreamState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connected => write!(f, "connected"),
            Self::Identified => write!(f, "identified"),
            Self::Subscribed => write!(f, "subscribed"),
        }
    }
}

/// What the transport must do after a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Write this message back immediately.
    Reply(Envelope),
    /// The stream is live; fire `on_connect`.
    Connected,
    /// Deliver an event.
    Event(StreamEvent),
}

/// Per-connection protocol state.
#[derive(Debug, Clone)]
pub struct Session {
    state: StreamState,
    user_id: String,
    source: String,
    registered: bool,
    last_message_ms: u64,
}

impl Session {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            state: StreamState::Disconnected,
            user_id: String::new(),
            source: source.into(),
            registered: false,
            last_message_ms: 0,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The socket is open; wait for hello.
    pub fn open(&mut self, user_id: impl Into<String>) {
        self.user_id = user_id.into();
        self.registered = false;
        self.state = StreamState::Connected;
    }

    /// Back to `Disconnected`. Returns whether the session was live in any
    /// state, i.e. whether a disconnect should be reported.
    pub fn close(&mut self) -> bool {
        let was_open = self.state != StreamState::Disconnected;
        self.state = StreamState::Disconnected;
        was_open
    }

    /// Process one text frame.
    pub fn handle_text(
        &mut self,
        text: &str,
        credentials: &dyn CredentialSource,
        clock: &dyn Clock,
    ) -> Option<Action> {
        let envelope = match Envelope::parse(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring malformed stream frame");
                return None;
            }
        };

        let kind = envelope.message_kind();
        match (self.state, kind) {
            (StreamState::Connected, MessageKind::Hello) => self.identify(credentials, clock),
            (StreamState::Identified, MessageKind::Registered) => {
                self.registered = true;
                tracing::debug!("Stream registration acknowledged");
                None
            }
            (StreamState::Identified, MessageKind::Subscribed) if self.registered => {
                self.state = StreamState::Subscribed;
                tracing::info!(user_id = %self.user_id, "Event stream subscribed");
                Some(Action::Connected)
            }
            (StreamState::Subscribed, MessageKind::Event) => match envelope.event() {
                Some(event) => {
                    tracing::debug!(code = event.code, subject = %event.subject, "Stream event");
                    Some(Action::Event(event))
                }
                None => {
                    tracing::debug!("Ignoring event without eventCid");
                    None
                }
            },
            (state, kind) => {
                tracing::debug!(state = %state, kind = %kind, message_type = %envelope.kind, "Ignoring out-of-order stream message");
                None
            }
        }
    }

    fn identify(&mut self, credentials: &dyn CredentialSource, clock: &dyn Clock) -> Option<Action> {
        let Some(token) = credentials.access_token() else {
            tracing::warn!("Stream hello received but no access token is held, staying connected");
            return None;
        };

        let id = self.next_message_id(clock.millis_since_epoch());
        let envelope = Envelope::identify(&self.user_id, &token, clock.system_time(), id, &self.source);
        self.state = StreamState::Identified;
        tracing::debug!(user_id = %self.user_id, "Identifying on event stream");
        Some(Action::Reply(envelope))
    }

    /// `ts:<millis>`, strictly increasing even if the clock stalls or steps back.
    fn next_message_id(&mut self, now_ms: u64) -> String {
        let ms = now_ms.max(self.last_message_ms + 1);
        self.last_message_ms = ms;
        format!("ts:{}", ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ss3link_types::{MockClock, StaticCredential};
    use std::time::{Duration, UNIX_EPOCH};

    const HELLO: &str = r#"{"type":"com.simplisafe.service.hello","data":{}}"#;
    const REGISTERED: &str = r#"{"type":"com.simplisafe.service.registered","data":{}}"#;
    const SUBSCRIBED: &str = r#"{"type":"com.simplisafe.namespace.subscribed","data":{}}"#;

    fn event(code: i64) -> String {
        format!(
            r#"{{"type":"com.simplisafe.event.standard","data":{{"eventCid":{},"messageSubject":"subject {}"}}}}"#,
            code, code
        )
    }

    fn run(session: &mut Session, frames: &[&str]) -> Vec<Action> {
        let credentials = StaticCredential::bearer("tok");
        let clock = MockClock::new();
        frames
            .iter()
            .filter_map(|frame| session.handle_text(frame, &credentials, &clock))
            .collect()
    }

    #[test]
    fn test_full_handshake_then_event() {
        let mut session = Session::new("test");
        session.open("42");
        let e = event(1401);

        let actions = run(&mut session, &[HELLO, REGISTERED, SUBSCRIBED, &e]);

        assert_eq!(actions.len(), 3);
        assert!(matches!(actions[0], Action::Reply(_)));
        assert_eq!(actions[1], Action::Connected);
        assert_eq!(
            actions[2],
            Action::Event(StreamEvent {
                code: 1401,
                subject: "subject 1401".to_string()
            })
        );
        assert_eq!(session.state(), StreamState::Subscribed);
    }

    #[test]
    fn test_messages_before_hello_are_dropped() {
        let mut session = Session::new("test");
        session.open("42");
        let e = event(1401);

        let actions = run(&mut session, &[REGISTERED, &e]);
        assert!(actions.is_empty());
        assert_eq!(session.state(), StreamState::Connected);
    }

    #[test]
    fn test_event_before_subscribed_is_dropped() {
        let mut session = Session::new("test");
        session.open("42");
        let e = event(1401);

        let actions = run(&mut session, &[HELLO, &e, REGISTERED]);
        assert_eq!(actions.len(), 1);
        assert_eq!(session.state(), StreamState::Identified);
    }

    #[test]
    fn test_connect_fires_once() {
        let mut session = Session::new("test");
        session.open("42");

        let actions = run(&mut session, &[HELLO, REGISTERED, SUBSCRIBED, SUBSCRIBED, HELLO]);
        let connects = actions.iter().filter(|a| **a == Action::Connected).count();
        assert_eq!(connects, 1);
        assert_eq!(actions.len(), 2);
    }

    #[test]
    fn test_subscribed_requires_registered() {
        let mut session = Session::new("test");
        session.open("42");

        let actions = run(&mut session, &[HELLO, SUBSCRIBED]);
        assert_eq!(actions.len(), 1);
        assert_eq!(session.state(), StreamState::Identified);

        let actions = run(&mut session, &[REGISTERED, SUBSCRIBED]);
        assert_eq!(actions, vec![Action::Connected]);
        assert_eq!(session.state(), StreamState::Subscribed);
    }

    #[test]
    fn test_registration_does_not_survive_reconnect() {
        let mut session = Session::new("test");
        session.open("42");
        run(&mut session, &[HELLO, REGISTERED]);
        session.close();

        session.open("42");
        let actions = run(&mut session, &[HELLO, SUBSCRIBED]);
        assert_eq!(actions.len(), 1);
        assert_eq!(session.state(), StreamState::Identified);
    }

    #[test]
    fn test_disconnected_session_ignores_everything() {
        let mut session = Session::new("test");
        let e = event(1);
        assert!(run(&mut session, &[HELLO, SUBSCRIBED, &e]).is_empty());
        assert_eq!(session.state(), StreamState::Disconnected);
    }

    #[test]
    fn test_malformed_and_unknown_frames() {
        let mut session = Session::new("test");
        session.open("42");
        let actions = run(
            &mut session,
            &["not json", r#"{"data":{}}"#, r#"{"type":"com.simplisafe.unknown"}"#],
        );
        assert!(actions.is_empty());
        assert_eq!(session.state(), StreamState::Connected);
    }

    #[test]
    fn test_hello_without_token_stays_connected() {
        let mut session = Session::new("test");
        session.open("42");
        let clock = MockClock::new();

        let action = session.handle_text(HELLO, &StaticCredential::empty(), &clock);
        assert!(action.is_none());
        assert_eq!(session.state(), StreamState::Connected);

        // a later hello with a token completes the step
        let action = session.handle_text(HELLO, &StaticCredential::bearer("tok"), &clock);
        assert!(matches!(action, Some(Action::Reply(_))));
        assert_eq!(session.state(), StreamState::Identified);
    }

    #[test]
    fn test_identify_contents() {
        let mut session = Session::new("ss3link");
        session.open("777");
        let clock = MockClock::with_system_time(UNIX_EPOCH + Duration::from_secs(1_700_000_000));

        let Some(Action::Reply(envelope)) =
            session.handle_text(HELLO, &StaticCredential::bearer("fresh-token"), &clock)
        else {
            panic!("expected identify");
        };

        assert_eq!(envelope.time.as_deref(), Some("2023-11-14T22:13:20Z"));
        assert_eq!(envelope.id.as_deref(), Some("ts:1700000000000"));
        assert_eq!(envelope.data["auth"]["token"], "fresh-token");
        assert_eq!(envelope.data["join"][0], "uid:777");
    }

    #[test]
    fn test_message_ids_strictly_increase() {
        let mut session = Session::new("test");
        assert_eq!(session.next_message_id(1000), "ts:1000");
        assert_eq!(session.next_message_id(1000), "ts:1001");
        assert_eq!(session.next_message_id(900), "ts:1002");
        assert_eq!(session.next_message_id(5000), "ts:5000");
    }

    #[test]
    fn test_close_reports_only_live_sessions() {
        let mut session = Session::new("test");
        assert!(!session.close());
        session.open("42");
        assert!(session.close());
        assert!(!session.close());
    }
}
