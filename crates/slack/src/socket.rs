use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::client::SlackApi;
use crate::events::{
    EventContext, EventDispatcher, HandlerResult, Reply, SlackEnvelope, SlackEvent,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport ack failed: {0}")]
    Acknowledge(String),
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

#[async_trait]
pub trait SocketTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError>;
    async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

#[derive(Default)]
pub struct NoopSocketTransport;

#[async_trait]
impl SocketTransport for NoopSocketTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError> {
        Ok(None)
    }

    async fn acknowledge(&self, _envelope_id: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Pumps envelopes from the transport into the dispatcher and delivers
/// handler replies through the Web API. Every envelope is acknowledged on
/// receipt, before any handler work, so Slack never redelivers an event
/// the bot has already started processing.
pub struct SocketModeRunner {
    transport: Arc<dyn SocketTransport>,
    dispatcher: EventDispatcher,
    publisher: Arc<dyn SlackApi>,
    reconnect_policy: ReconnectPolicy,
}

impl SocketModeRunner {
    pub fn new(
        transport: Arc<dyn SocketTransport>,
        dispatcher: EventDispatcher,
        publisher: Arc<dyn SlackApi>,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, dispatcher, publisher, reconnect_policy }
    }

    pub async fn start(&self) -> Result<()> {
        let mut attempt = 0_u32;
        loop {
            match self.connect_and_pump(attempt).await {
                Ok(()) => return Ok(()),
                Err(failure) => {
                    warn!(
                        attempt,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %failure.error,
                        "socket mode transport failed"
                    );

                    // A session that actually delivered traffic resets the
                    // consecutive-failure count, so routine hourly
                    // disconnects never exhaust the retry budget.
                    if failure.made_progress {
                        attempt = 0;
                    }

                    if attempt >= self.reconnect_policy.max_retries {
                        warn!(
                            max_retries = self.reconnect_policy.max_retries,
                            "socket mode retries exhausted; continuing process without crash"
                        );
                        return Ok(());
                    }

                    let delay = self.reconnect_policy.backoff(attempt);
                    attempt += 1;
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }

    async fn connect_and_pump(&self, attempt: u32) -> Result<(), SessionFailure> {
        info!(attempt, "opening socket mode transport connection");
        self.transport.connect().await.map_err(SessionFailure::fresh)?;
        info!(attempt, "socket mode transport connected");

        let mut made_progress = false;
        loop {
            let envelope = self
                .transport
                .next_envelope()
                .await
                .map_err(|error| SessionFailure { error, made_progress })?;
            let Some(envelope) = envelope else {
                info!(attempt, "socket mode transport stream closed");
                self.transport
                    .disconnect()
                    .await
                    .map_err(|error| SessionFailure { error, made_progress })?;
                return Ok(());
            };
            made_progress = true;
            let (user_id, channel_id) = routing_fields(&envelope);

            info!(
                event_name = "ingress.slack.envelope_received",
                envelope_id = %envelope.envelope_id,
                event_type = ?envelope.event.event_type(),
                correlation_id = %envelope.envelope_id,
                user_id = user_id.as_deref().unwrap_or("unknown"),
                channel_id = channel_id.as_deref().unwrap_or("unknown"),
                "received slack envelope"
            );

            if let Err(error) = self.transport.acknowledge(&envelope.envelope_id).await {
                warn!(
                    event_name = "ingress.slack.ack_sent",
                    envelope_id = %envelope.envelope_id,
                    correlation_id = %envelope.envelope_id,
                    error = %error,
                    "failed to acknowledge slack envelope"
                );
            } else {
                debug!(
                    event_name = "ingress.slack.ack_sent",
                    envelope_id = %envelope.envelope_id,
                    correlation_id = %envelope.envelope_id,
                    "acknowledged slack envelope"
                );
            }

            let context = EventContext { correlation_id: envelope.envelope_id.clone() };
            match self.dispatcher.dispatch(&envelope, &context).await {
                Ok(HandlerResult::Responded(reply)) => self.deliver_reply(&envelope, reply).await,
                Ok(HandlerResult::Processed | HandlerResult::Ignored) => {}
                Err(error) => {
                    // The user gets no error message; the failure lives in
                    // the logs only.
                    warn!(
                        envelope_id = %envelope.envelope_id,
                        correlation_id = %envelope.envelope_id,
                        user_id = user_id.as_deref().unwrap_or("unknown"),
                        channel_id = channel_id.as_deref().unwrap_or("unknown"),
                        error = %error,
                        "event dispatch failed; continuing socket loop"
                    );
                }
            }
        }
    }

    async fn deliver_reply(&self, envelope: &SlackEnvelope, reply: Reply) {
        let delivery = match reply.response_url.as_deref() {
            Some(response_url) => {
                self.publisher.respond(response_url, &reply.template, reply.replace_original).await
            }
            None => {
                if reply.replace_original {
                    debug!(
                        event_name = "egress.slack.replace_downgraded",
                        envelope_id = %envelope.envelope_id,
                        channel_id = %reply.channel_id,
                        "reply wanted to replace the original message but carried no \
                         response url; posting a new message instead"
                    );
                }
                self.publisher.post_message(&reply.channel_id, &reply.template).await
            }
        };

        match delivery {
            Ok(()) => debug!(
                event_name = "egress.slack.reply_sent",
                envelope_id = %envelope.envelope_id,
                channel_id = %reply.channel_id,
                replaced_original = reply.replace_original,
                "delivered reply"
            ),
            Err(error) => warn!(
                event_name = "egress.slack.reply_failed",
                envelope_id = %envelope.envelope_id,
                channel_id = %reply.channel_id,
                error = %error,
                "reply delivery failed; continuing socket loop"
            ),
        }
    }
}

struct SessionFailure {
    error: TransportError,
    made_progress: bool,
}

impl SessionFailure {
    fn fresh(error: TransportError) -> Self {
        Self { error, made_progress: false }
    }
}

fn routing_fields(envelope: &SlackEnvelope) -> (Option<String>, Option<String>) {
    match &envelope.event {
        SlackEvent::Message(event) => {
            (Some(event.user_id.clone()), Some(event.channel_id.clone()))
        }
        SlackEvent::BlockAction(event) => {
            (Some(event.user_id.clone()), Some(event.channel_id.clone()))
        }
        SlackEvent::Unsupported { .. } => (None, None),
    }
}
