//! Slack integration - Socket Mode bot interface
//!
//! This crate provides the Slack side of rollcall:
//! - **Socket Mode** (`socket`, `transport`) - WebSocket connection to Slack
//!   (no public URL needed)
//! - **Events** (`events`) - channel messages and block actions, routed to
//!   the sign-in workflow handlers
//! - **Block Kit** (`blocks`) - the location prompt, confirmation button,
//!   and result messages
//! - **Web API** (`client`) - `users.info`, `chat.postMessage`, response-URL
//!   delivery
//!
//! # Getting Started
//!
//! 1. Create a Slack app at https://api.slack.com/apps
//! 2. Enable Socket Mode and subscribe to `message.channels`
//! 3. Set env vars: `ROLLCALL_SLACK_APP_TOKEN`, `ROLLCALL_SLACK_BOT_TOKEN`
//!
//! # Architecture
//!
//! ```text
//! Slack Envelopes → SocketModeRunner → EventDispatcher → Handlers
//!                         ↓                                  ↓
//!                   ack (always)                 Reply → SlackApi delivery
//! ```

pub mod blocks;
pub mod client;
pub mod events;
pub mod socket;
pub mod transport;
