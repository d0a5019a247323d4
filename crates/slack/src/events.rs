use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use rollcall_core::{record_sign_in, AttendanceRecord, AttendanceStore, SignInOutcome, StoreError, WorkLocation};

use crate::{
    blocks::{
        already_signed_in_message, location_prompt_message, sign_in_prompt_message,
        signed_in_message, MessageTemplate, LOCATION_SELECT_ACTION_ID, SIGN_IN_ACTION_ID,
    },
    client::{ChatApiError, SlackApi},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlackEnvelope {
    pub envelope_id: String,
    pub event: SlackEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlackEvent {
    Message(MessageEvent),
    BlockAction(BlockActionEvent),
    Unsupported { event_type: String },
}

impl SlackEvent {
    pub fn event_type(&self) -> SlackEventType {
        match self {
            Self::Message(_) => SlackEventType::Message,
            Self::BlockAction(_) => SlackEventType::BlockAction,
            Self::Unsupported { .. } => SlackEventType::Unsupported,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SlackEventType {
    Message,
    BlockAction,
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEvent {
    pub channel_id: String,
    pub user_id: String,
    pub text: String,
    pub ts: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockActionEvent {
    pub channel_id: String,
    pub message_ts: String,
    pub user_id: String,
    pub action_id: String,
    pub value: Option<String>,
    pub response_url: Option<String>,
}

/// Ephemeral per-event data; discarded once the outbound message is sent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

/// An outbound message plus where to deliver it: either posted into the
/// originating channel or sent through the interaction's response URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    pub channel_id: String,
    pub response_url: Option<String>,
    pub replace_original: bool,
    pub template: MessageTemplate,
}

impl Reply {
    pub fn to_channel(channel_id: impl Into<String>, template: MessageTemplate) -> Self {
        Self { channel_id: channel_id.into(), response_url: None, replace_original: false, template }
    }

    pub fn replacing(
        channel_id: impl Into<String>,
        response_url: Option<String>,
        template: MessageTemplate,
    ) -> Self {
        Self { channel_id: channel_id.into(), response_url, replace_original: true, template }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Responded(Reply),
    Processed,
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error(transparent)]
    Chat(#[from] ChatApiError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("block action carried an invalid payload: {0}")]
    InvalidActionPayload(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> SlackEventType;
    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<SlackEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Wires the two workflow handlers against the given adapters.
pub fn attendance_dispatcher(
    slack: Arc<dyn SlackApi>,
    store: Arc<dyn AttendanceStore>,
) -> EventDispatcher {
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(MessageTriggerHandler);
    dispatcher.register(BlockActionHandler::new(slack, store));
    dispatcher
}

/// Trigger inherited from the previous bot: any text containing `in`
/// (which `signin` also matches), case-insensitively. Deliberately loose.
pub fn is_sign_in_trigger(text: &str) -> bool {
    text.to_ascii_lowercase().contains("in")
}

/// Responds to trigger messages with the greeting and location picker.
pub struct MessageTriggerHandler;

#[async_trait]
impl EventHandler for MessageTriggerHandler {
    fn event_type(&self) -> SlackEventType {
        SlackEventType::Message
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::Message(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        if !is_sign_in_trigger(&event.text) {
            return Ok(HandlerResult::Processed);
        }

        let reply =
            Reply::to_channel(event.channel_id.clone(), location_prompt_message(&event.user_id));
        Ok(HandlerResult::Responded(reply))
    }
}

/// Handles both interactive steps: the location selection and the final
/// sign-in confirmation.
pub struct BlockActionHandler {
    slack: Arc<dyn SlackApi>,
    store: Arc<dyn AttendanceStore>,
}

impl BlockActionHandler {
    pub fn new(slack: Arc<dyn SlackApi>, store: Arc<dyn AttendanceStore>) -> Self {
        Self { slack, store }
    }

    fn selected_location(event: &BlockActionEvent) -> Result<WorkLocation, EventHandlerError> {
        let value = event.value.as_deref().ok_or_else(|| {
            EventHandlerError::InvalidActionPayload(format!(
                "action `{}` carried no value",
                event.action_id
            ))
        })?;
        WorkLocation::from_label(value).ok_or_else(|| {
            EventHandlerError::InvalidActionPayload(format!("unknown work location `{value}`"))
        })
    }

    fn handle_location_select(
        &self,
        event: &BlockActionEvent,
    ) -> Result<HandlerResult, EventHandlerError> {
        let location = Self::selected_location(event)?;
        let reply = Reply::replacing(
            event.channel_id.clone(),
            event.response_url.clone(),
            sign_in_prompt_message(location),
        );
        Ok(HandlerResult::Responded(reply))
    }

    async fn handle_sign_in(
        &self,
        event: &BlockActionEvent,
    ) -> Result<HandlerResult, EventHandlerError> {
        let location = Self::selected_location(event)?;

        // The resolved profile stays local to this invocation. Concurrent
        // sign-ins therefore cannot see each other's emails.
        let profile = self.slack.resolve_user_profile(&event.user_id).await?;
        let record = AttendanceRecord::for_today(&profile, location);

        let outcome = record_sign_in(self.store.as_ref(), record).await?;
        let template = match outcome {
            SignInOutcome::AlreadySignedIn => already_signed_in_message(),
            SignInOutcome::Recorded(_) => signed_in_message(&event.user_id),
        };

        Ok(HandlerResult::Responded(Reply::to_channel(event.channel_id.clone(), template)))
    }
}

#[async_trait]
impl EventHandler for BlockActionHandler {
    fn event_type(&self) -> SlackEventType {
        SlackEventType::BlockAction
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::BlockAction(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        match event.action_id.as_str() {
            LOCATION_SELECT_ACTION_ID => self.handle_location_select(event),
            SIGN_IN_ACTION_ID => self.handle_sign_in(event).await,
            other => {
                warn!(
                    action_id = other,
                    correlation_id = %ctx.correlation_id,
                    "ignoring unrecognized block action"
                );
                Ok(HandlerResult::Processed)
            }
        }
    }
}
