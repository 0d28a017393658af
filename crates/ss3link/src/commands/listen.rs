//! Listen command - follow the event stream.
//!
//! Everything runs on this one task: a short tick drains the socket, a slower
//! tick keeps the token fresh, and a dropped stream is reconnected with
//! exponential backoff. A connection that does not reach `Subscribed` within
//! the handshake timeout is dropped and goes through the same backoff.

use std::time::Duration;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use ss3link_client::EventKind;
use ss3link_stream::{EventHandler, EventStreamClient, StreamState};
use ss3link_types::SharedCredentialSource;
use tokio::time::{Instant, MissedTickBehavior};

use super::Context;
use crate::prompt::StdinPrompt;

/// First reconnect delay.
const BASE_BACKOFF: Duration = Duration::from_millis(100);

/// Arguments for the listen command.
#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Exit after this many events
    #[arg(long)]
    pub count: Option<u64>,
}

/// Prints events as they arrive.
#[derive(Debug)]
struct ConsoleHandler {
    json: bool,
    events: u64,
}

#[derive(Debug, Serialize)]
struct EventOutput<'a> {
    code: i64,
    kind: String,
    subject: &'a str,
}

impl EventHandler for ConsoleHandler {
    fn on_event(&mut self, code: i64, subject: &str) {
        self.events += 1;
        let kind = EventKind::from_code(code);
        if self.json {
            let output = EventOutput {
                code,
                kind: kind.to_string(),
                subject,
            };
            match serde_json::to_string(&output) {
                Ok(line) => println!("{}", line),
                Err(e) => tracing::warn!(error = %e, "Failed to encode event"),
            }
        } else if subject.is_empty() {
            println!("[{}] {}", code, kind);
        } else {
            println!("[{}] {}: {}", code, kind, subject);
        }
    }

    fn on_connect(&mut self) {
        if !self.json {
            println!("-- listening for events --");
        }
    }

    fn on_disconnect(&mut self) {
        if !self.json {
            println!("-- stream disconnected --");
        }
    }
}

/// Delay before reconnect attempt `attempt` (0-based): 100 ms doubling, capped.
pub fn reconnect_delay(attempt: u32, max: Duration) -> Duration {
    let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
    BASE_BACKOFF.saturating_mul(factor).min(max)
}

/// Run the listen command.
pub async fn run(args: ListenArgs, ctx: &Context) -> Result<()> {
    let services = ctx.services().await?;
    services.ensure_authorized().await?;
    let user_id = services.client.user_id().await?;

    let stream_section = ctx.config().stream();
    let max_backoff = stream_section.max_backoff();
    let handshake_timeout = stream_section.handshake_timeout();
    let credentials: SharedCredentialSource = services.tokens.clone();
    let handler = ConsoleHandler {
        json: ctx.json_output,
        events: 0,
    };
    let mut stream = EventStreamClient::new(
        ctx.stream_config()?,
        credentials,
        services.clock.clone(),
        handler,
    );

    let mut poll_tick = tokio::time::interval(stream_section.poll_interval());
    poll_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut auth_tick = tokio::time::interval(ctx.config().auth().check_interval());
    auth_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let prompt = StdinPrompt::new();
    let mut attempt: u32 = 0;
    let mut next_connect = Instant::now();

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Interrupted, closing event stream");
                stream.disconnect().await;
                break;
            }
            _ = auth_tick.tick() => {
                if !services.tokens.is_authorized()
                    && let Err(e) = services.tokens.authorize(&prompt).await
                {
                    tracing::warn!(error = %e, "Token renewal failed");
                }
            }
            _ = poll_tick.tick() => {
                match stream.state() {
                    StreamState::Disconnected => {
                        if Instant::now() < next_connect || !services.tokens.is_authorized() {
                            continue;
                        }
                        let delay = reconnect_delay(attempt, max_backoff);
                        attempt = attempt.saturating_add(1);
                        next_connect = Instant::now() + delay;
                        if let Err(e) = stream.connect(&user_id).await {
                            tracing::warn!(error = %e, retry_in_ms = delay.as_millis() as u64, "Event stream connect failed");
                        }
                    }
                    _ => {
                        if let Err(e) = stream.poll().await {
                            tracing::warn!(error = %e, "Event stream poll failed");
                        }
                        if stream.state() == StreamState::Subscribed {
                            attempt = 0;
                        } else {
                            stream.abandon_stalled_handshake(handshake_timeout).await;
                        }
                    }
                }

                if let Some(limit) = args.count
                    && stream.handler().events >= limit
                {
                    stream.disconnect().await;
                    break;
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconnect_delay_doubles_and_caps() {
        let max = Duration::from_secs(30);
        assert_eq!(reconnect_delay(0, max), Duration::from_millis(100));
        assert_eq!(reconnect_delay(1, max), Duration::from_millis(200));
        assert_eq!(reconnect_delay(4, max), Duration::from_millis(1600));
        assert_eq!(reconnect_delay(9, max), Duration::from_secs(30));
        assert_eq!(reconnect_delay(200, max), Duration::from_secs(30));
    }

    #[test]
    fn test_handler_counts_events() {
        let mut handler = ConsoleHandler {
            json: true,
            events: 0,
        };
        handler.on_connect();
        handler.on_event(1401, "Disarmed by keypad");
        handler.on_event(9701, "");
        handler.on_disconnect();
        assert_eq!(handler.events, 2);
    }
}
