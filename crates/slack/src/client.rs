use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::error;

use rollcall_core::UserProfile;

use crate::blocks::MessageTemplate;

const SLACK_API_BASE_URL: &str = "https://slack.com/api";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ChatApiError {
    #[error("chat platform request failed: {0}")]
    Http(String),
    #[error("chat platform returned an error: {0}")]
    Api(String),
    #[error("chat platform response could not be decoded: {0}")]
    Decode(String),
    #[error("no email on the profile of user {0}")]
    MissingEmail(String),
}

/// The Web API surface the workflow uses. A trait so handlers and the
/// runner can be exercised against scripted clients.
#[async_trait]
pub trait SlackApi: Send + Sync {
    /// `users.info` - resolves a user id into profile attributes. Fetched
    /// fresh per interaction; failures propagate with no retry.
    async fn resolve_user_profile(&self, user_id: &str) -> Result<UserProfile, ChatApiError>;

    /// `chat.postMessage` into a channel.
    async fn post_message(
        &self,
        channel_id: &str,
        message: &MessageTemplate,
    ) -> Result<(), ChatApiError>;

    /// Delivery through an interaction's response URL, optionally replacing
    /// the original message.
    async fn respond(
        &self,
        response_url: &str,
        message: &MessageTemplate,
        replace_original: bool,
    ) -> Result<(), ChatApiError>;
}

pub struct SlackWebClient {
    http: reqwest::Client,
    bot_token: SecretString,
}

impl SlackWebClient {
    pub fn new(bot_token: SecretString) -> Self {
        Self { http: reqwest::Client::new(), bot_token }
    }
}

#[async_trait]
impl SlackApi for SlackWebClient {
    async fn resolve_user_profile(&self, user_id: &str) -> Result<UserProfile, ChatApiError> {
        let response = self
            .http
            .get(format!("{SLACK_API_BASE_URL}/users.info"))
            .bearer_auth(self.bot_token.expose_secret())
            .query(&[("user", user_id)])
            .send()
            .await
            .map_err(|source| http_error("users.info", source))?;

        let body: UsersInfoResponse =
            response.json().await.map_err(|source| ChatApiError::Decode(source.to_string()))?;

        if !body.ok {
            let detail = body.error.unwrap_or_else(|| "unknown".to_owned());
            error!(user_id, error = %detail, "users.info failed");
            return Err(ChatApiError::Api(format!("users.info failed: {detail}")));
        }

        let user = body
            .user
            .ok_or_else(|| ChatApiError::Decode("users.info returned no user".to_owned()))?;
        profile_from_user(user_id, user)
    }

    async fn post_message(
        &self,
        channel_id: &str,
        message: &MessageTemplate,
    ) -> Result<(), ChatApiError> {
        let payload = serde_json::json!({
            "channel": channel_id,
            "text": message.fallback_text,
            "blocks": message.blocks,
        });

        let response = self
            .http
            .post(format!("{SLACK_API_BASE_URL}/chat.postMessage"))
            .bearer_auth(self.bot_token.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|source| http_error("chat.postMessage", source))?;

        let body: ApiResponse =
            response.json().await.map_err(|source| ChatApiError::Decode(source.to_string()))?;
        if !body.ok {
            let detail = body.error.unwrap_or_else(|| "unknown".to_owned());
            error!(channel_id, error = %detail, "chat.postMessage failed");
            return Err(ChatApiError::Api(format!("chat.postMessage failed: {detail}")));
        }

        Ok(())
    }

    async fn respond(
        &self,
        response_url: &str,
        message: &MessageTemplate,
        replace_original: bool,
    ) -> Result<(), ChatApiError> {
        let payload = serde_json::json!({
            "replace_original": replace_original,
            "text": message.fallback_text,
            "blocks": message.blocks,
        });

        let response = self
            .http
            .post(response_url)
            .json(&payload)
            .send()
            .await
            .map_err(|source| http_error("response_url", source))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(%status, "response_url delivery failed");
            return Err(ChatApiError::Api(format!(
                "response_url delivery failed ({status}): {body}"
            )));
        }

        Ok(())
    }
}

fn http_error(method: &str, source: reqwest::Error) -> ChatApiError {
    error!(method, error = %source, "slack web api request failed");
    ChatApiError::Http(format!("{method}: {source}"))
}

fn profile_from_user(user_id: &str, user: SlackUser) -> Result<UserProfile, ChatApiError> {
    let profile = user.profile.unwrap_or_default();
    let email = profile
        .email
        .clone()
        .filter(|email| !email.trim().is_empty())
        .ok_or_else(|| ChatApiError::MissingEmail(user_id.to_owned()))?;

    Ok(UserProfile {
        id: user.id.unwrap_or_else(|| user_id.to_owned()),
        display_name: pick_display_name(&profile, user.name.as_deref()),
        email,
    })
}

/// Slack profiles routinely leave `display_name` blank; fall back through
/// `real_name` to the account name.
fn pick_display_name(profile: &SlackProfile, account_name: Option<&str>) -> String {
    [profile.display_name.as_deref(), profile.real_name.as_deref(), account_name]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|candidate| !candidate.is_empty())
        .unwrap_or("unknown")
        .to_owned()
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsersInfoResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    user: Option<SlackUser>,
}

#[derive(Debug, Default, Deserialize)]
struct SlackUser {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    profile: Option<SlackProfile>,
}

#[derive(Debug, Default, Deserialize)]
struct SlackProfile {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    real_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

/// Client that accepts every call without talking to Slack. Used for
/// wiring defaults and dispatcher tests.
#[derive(Default)]
pub struct NoopSlackClient;

#[async_trait]
impl SlackApi for NoopSlackClient {
    async fn resolve_user_profile(&self, user_id: &str) -> Result<UserProfile, ChatApiError> {
        Ok(UserProfile {
            id: user_id.to_owned(),
            display_name: user_id.to_owned(),
            email: format!("{user_id}@example.invalid"),
        })
    }

    async fn post_message(
        &self,
        _channel_id: &str,
        _message: &MessageTemplate,
    ) -> Result<(), ChatApiError> {
        Ok(())
    }

    async fn respond(
        &self,
        _response_url: &str,
        _message: &MessageTemplate,
        _replace_original: bool,
    ) -> Result<(), ChatApiError> {
        Ok(())
    }
}
