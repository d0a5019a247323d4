//! WebSocket transport for Slack Socket Mode.
//!
//! `apps.connections.open` hands out a short-lived wss:// URL; the frames
//! on that socket are JSON envelopes which get decoded into the event
//! types the dispatcher understands.

use futures::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::{
    connect_async, tungstenite::Message as WsMessage, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, warn};

use async_trait::async_trait;

use crate::events::{BlockActionEvent, MessageEvent, SlackEnvelope, SlackEvent};
use crate::socket::{SocketTransport, TransportError};

const CONNECTIONS_OPEN_URL: &str = "https://slack.com/api/apps.connections.open";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TungsteniteTransport {
    http: reqwest::Client,
    app_token: SecretString,
    socket: Mutex<Option<WsStream>>,
}

impl TungsteniteTransport {
    pub fn new(app_token: SecretString) -> Self {
        Self { http: reqwest::Client::new(), app_token, socket: Mutex::new(None) }
    }

    async fn open_socket_url(&self) -> Result<String, TransportError> {
        let response = self
            .http
            .post(CONNECTIONS_OPEN_URL)
            .bearer_auth(self.app_token.expose_secret())
            .send()
            .await
            .map_err(|source| TransportError::Connect(source.to_string()))?;

        let body: ConnectionsOpenResponse = response
            .json()
            .await
            .map_err(|source| TransportError::Connect(source.to_string()))?;

        if !body.ok {
            let detail = body.error.unwrap_or_else(|| "unknown".to_owned());
            return Err(TransportError::Connect(format!("apps.connections.open failed: {detail}")));
        }

        body.url.ok_or_else(|| {
            TransportError::Connect("apps.connections.open returned no url".to_owned())
        })
    }

    async fn send_frame(&self, frame: WsMessage) -> Result<(), TransportError> {
        let mut guard = self.socket.lock().await;
        let socket = guard
            .as_mut()
            .ok_or_else(|| TransportError::Acknowledge("socket not connected".to_owned()))?;
        socket.send(frame).await.map_err(|source| TransportError::Acknowledge(source.to_string()))
    }
}

#[async_trait]
impl SocketTransport for TungsteniteTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        let url = self.open_socket_url().await?;
        let (stream, _response) = connect_async(&url)
            .await
            .map_err(|source| TransportError::Connect(source.to_string()))?;
        *self.socket.lock().await = Some(stream);
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError> {
        loop {
            let frame = {
                let mut guard = self.socket.lock().await;
                let Some(socket) = guard.as_mut() else {
                    return Ok(None);
                };
                socket.next().await
            };

            match frame {
                Some(Ok(WsMessage::Text(text))) => match decode_frame(&text) {
                    Ok(Frame::Envelope(envelope)) => return Ok(Some(envelope)),
                    Ok(Frame::Hello) => {
                        debug!("socket mode hello received");
                    }
                    Ok(Frame::Disconnect { reason }) => {
                        // Slack refreshes sockets roughly hourly; reopen a
                        // fresh connection and keep pumping.
                        debug!(reason = %reason, "socket mode disconnect requested; reconnecting");
                        self.socket.lock().await.take();
                        self.connect().await?;
                    }
                    Err(detail) => {
                        warn!(detail = %detail, "skipping undecodable socket frame");
                    }
                },
                Some(Ok(WsMessage::Ping(payload))) => {
                    self.send_frame(WsMessage::Pong(payload)).await?;
                }
                Some(Ok(WsMessage::Close(_))) | None => {
                    self.socket.lock().await.take();
                    return Ok(None);
                }
                Some(Ok(_)) => {}
                Some(Err(source)) => {
                    self.socket.lock().await.take();
                    return Err(TransportError::Receive(source.to_string()));
                }
            }
        }
    }

    async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError> {
        let ack = serde_json::json!({ "envelope_id": envelope_id });
        self.send_frame(WsMessage::Text(ack.to_string())).await
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        let mut guard = self.socket.lock().await;
        if let Some(mut socket) = guard.take() {
            socket
                .close(None)
                .await
                .map_err(|source| TransportError::Disconnect(source.to_string()))?;
        }
        Ok(())
    }
}

enum Frame {
    Hello,
    Disconnect { reason: String },
    Envelope(SlackEnvelope),
}

fn decode_frame(text: &str) -> Result<Frame, String> {
    let raw: RawEnvelope = serde_json::from_str(text).map_err(|source| source.to_string())?;

    match raw.kind.as_str() {
        "hello" => Ok(Frame::Hello),
        "disconnect" => {
            Ok(Frame::Disconnect { reason: raw.reason.unwrap_or_else(|| "unknown".to_owned()) })
        }
        "events_api" => {
            let envelope_id = raw.envelope_id.ok_or("events_api frame without envelope_id")?;
            let event = raw
                .payload
                .and_then(|payload| payload.event)
                .map(message_event_from_raw)
                .unwrap_or(SlackEvent::Unsupported { event_type: "events_api".to_owned() });
            Ok(Frame::Envelope(SlackEnvelope { envelope_id, event }))
        }
        "interactive" => {
            let envelope_id = raw.envelope_id.ok_or("interactive frame without envelope_id")?;
            let event = raw
                .payload
                .map(block_action_from_raw)
                .unwrap_or(SlackEvent::Unsupported { event_type: "interactive".to_owned() });
            Ok(Frame::Envelope(SlackEnvelope { envelope_id, event }))
        }
        other => {
            let envelope_id = raw.envelope_id.ok_or_else(|| format!("unknown frame `{other}`"))?;
            Ok(Frame::Envelope(SlackEnvelope {
                envelope_id,
                event: SlackEvent::Unsupported { event_type: other.to_owned() },
            }))
        }
    }
}

fn message_event_from_raw(raw: RawInnerEvent) -> SlackEvent {
    if raw.kind != "message" {
        return SlackEvent::Unsupported { event_type: raw.kind };
    }
    // Messages the bot itself (or any app) posts come back over the same
    // socket; reacting to them would loop forever.
    if raw.bot_id.is_some() || raw.subtype.is_some() {
        return SlackEvent::Unsupported { event_type: "bot_message".to_owned() };
    }

    match (raw.channel, raw.user) {
        (Some(channel_id), Some(user_id)) => SlackEvent::Message(MessageEvent {
            channel_id,
            user_id,
            text: raw.text.unwrap_or_default(),
            ts: raw.ts.unwrap_or_default(),
        }),
        _ => SlackEvent::Unsupported { event_type: "message".to_owned() },
    }
}

fn block_action_from_raw(raw: RawPayload) -> SlackEvent {
    if raw.kind.as_deref() != Some("block_actions") {
        return SlackEvent::Unsupported {
            event_type: raw.kind.unwrap_or_else(|| "interactive".to_owned()),
        };
    }

    let Some(action) = raw.actions.into_iter().next() else {
        return SlackEvent::Unsupported { event_type: "block_actions".to_owned() };
    };
    let (Some(user), Some(channel)) = (raw.user, raw.channel) else {
        return SlackEvent::Unsupported { event_type: "block_actions".to_owned() };
    };

    // Buttons carry `value`; static selects carry `selected_option.value`.
    let value = action.value.or_else(|| action.selected_option.map(|option| option.value));

    SlackEvent::BlockAction(BlockActionEvent {
        channel_id: channel.id,
        message_ts: raw.container.and_then(|container| container.message_ts).unwrap_or_default(),
        user_id: user.id,
        action_id: action.action_id,
        value,
        response_url: raw.response_url,
    })
}

#[derive(Debug, Deserialize)]
struct ConnectionsOpenResponse {
    ok: bool,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    envelope_id: Option<String>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    payload: Option<RawPayload>,
}

#[derive(Debug, Deserialize)]
struct RawPayload {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    event: Option<RawInnerEvent>,
    #[serde(default)]
    user: Option<RawUser>,
    #[serde(default)]
    channel: Option<RawChannel>,
    #[serde(default)]
    container: Option<RawContainer>,
    #[serde(default)]
    actions: Vec<RawAction>,
    #[serde(default)]
    response_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawInnerEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    ts: Option<String>,
    #[serde(default)]
    bot_id: Option<String>,
    #[serde(default)]
    subtype: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RawChannel {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RawContainer {
    #[serde(default)]
    message_ts: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawAction {
    action_id: String,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    selected_option: Option<RawSelectedOption>,
}

#[derive(Debug, Deserialize)]
struct RawSelectedOption {
    value: String,
}
