//! HTTP client for the chat backend
//!
//! The client is stateless: every call maps one request to one typed result.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ServerConfig;
use crate::model::{Message, User};

const SEND_FALLBACK: &str = "the server could not store the message";

/// Error type for conversation client operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Credentials were refused; carries the server's explanation
    #[error("Login rejected: {0}")]
    AuthRejected(String),

    /// History could not be loaded
    #[error("Failed to load messages: {0}")]
    FetchFailed(String),

    /// The server declined a message
    #[error("Send rejected: {0}")]
    SendRejected(String),

    /// The backend could not be reached
    #[error("Server unreachable: {0}")]
    Network(String),

    /// The backend answered with something we cannot read
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ClientError::InvalidResponse(e.to_string())
        } else {
            ClientError::Network(e.to_string())
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// The authenticated user and their fixed counterpart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginResponse {
    pub user: User,
    pub recipient: User,
}

/// Operations the view controller needs from the backend
#[async_trait]
pub trait ConversationApi: Send + Sync {
    /// Authenticate; the username is lowercased before sending
    async fn login(&self, username: &str, password: &str) -> ClientResult<LoginResponse>;

    /// All messages between the two users, oldest first
    async fn fetch_history(&self, user_id: &str, recipient_id: &str) -> ClientResult<Vec<Message>>;

    /// Send a draft and return the server-confirmed copy
    async fn send(&self, draft: &Message) -> ClientResult<Message>;
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: String,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginReply {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    user: Option<User>,
    #[serde(default)]
    opponent: Option<User>,
    #[serde(default)]
    message: Option<String>,
}

/// Entries stay raw so one unreadable record does not sink the rest
#[derive(Debug, Deserialize)]
struct HistoryReply {
    #[serde(default)]
    messages: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    error: Option<String>,
}

/// `message` is the stored message on success and an explanation on failure
#[derive(Debug, Deserialize)]
struct SendReply {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

/// reqwest-backed [`ConversationApi`]
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: Client,
    base_url: String,
}

impl ChatClient {
    /// Create a client for the backend at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::builder()
                .user_agent(concat!("duet/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.base_url.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

/// Read the body and try to decode it, keeping the status either way
async fn read_reply<T: DeserializeOwned>(
    response: Response,
) -> ClientResult<(StatusCode, Result<T, serde_json::Error>)> {
    let status = response.status();
    let text = response.text().await?;
    Ok((status, serde_json::from_str(&text)))
}

#[async_trait]
impl ConversationApi for ChatClient {
    async fn login(&self, username: &str, password: &str) -> ClientResult<LoginResponse> {
        let username = username.to_lowercase();
        debug!(%username, "Logging in");
        let response = self
            .client
            .post(self.endpoint("login"))
            .json(&LoginRequest { username, password })
            .send()
            .await?;

        let (status, reply) = read_reply::<LoginReply>(response).await?;
        match reply {
            Ok(reply) if status.is_success() && reply.success => match (reply.user, reply.opponent) {
                (Some(user), Some(recipient)) => Ok(LoginResponse { user, recipient }),
                _ => Err(ClientError::InvalidResponse(
                    "login succeeded without user and opponent".to_string(),
                )),
            },
            Ok(reply) => {
                let message = reply
                    .message
                    .unwrap_or_else(|| format!("server returned {}", status));
                warn!(%status, "Login rejected: {}", message);
                Err(ClientError::AuthRejected(message))
            }
            Err(_) if !status.is_success() => {
                Err(ClientError::AuthRejected(format!("server returned {}", status)))
            }
            Err(e) => Err(ClientError::InvalidResponse(e.to_string())),
        }
    }

    async fn fetch_history(&self, user_id: &str, recipient_id: &str) -> ClientResult<Vec<Message>> {
        let response = self
            .client
            .get(self.endpoint("messages"))
            .query(&[("myId", user_id), ("recipientId", recipient_id)])
            .send()
            .await?;

        let (status, reply) = read_reply::<HistoryReply>(response).await?;
        if !status.is_success() {
            let reason = reply
                .ok()
                .and_then(|r| r.error)
                .unwrap_or_else(|| format!("server returned {}", status));
            warn!(%status, "History request failed: {}", reason);
            return Err(ClientError::FetchFailed(reason));
        }

        let entries = reply
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?
            .messages
            .ok_or_else(|| ClientError::InvalidResponse("missing messages".to_string()))?;
        let total = entries.len();
        let messages: Vec<Message> = entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value(entry) {
                Ok(message) => Some(message),
                Err(e) => {
                    warn!("Skipping unreadable history entry: {}", e);
                    None
                }
            })
            .collect();
        debug!(count = messages.len(), skipped = total - messages.len(), "Loaded history");
        Ok(messages)
    }

    async fn send(&self, draft: &Message) -> ClientResult<Message> {
        debug!(kind = %draft.kind, bytes = draft.content.len(), "Sending message");
        let response = self
            .client
            .post(self.endpoint("send"))
            .json(draft)
            .send()
            .await?;

        let (status, reply) = read_reply::<SendReply>(response).await?;
        let reply = match reply {
            Ok(reply) => reply,
            Err(_) if !status.is_success() => {
                return Err(ClientError::SendRejected(SEND_FALLBACK.to_string()));
            }
            Err(e) => return Err(ClientError::InvalidResponse(e.to_string())),
        };

        if status.is_success() && reply.success {
            let value = reply
                .message
                .ok_or_else(|| ClientError::InvalidResponse("missing message".to_string()))?;
            return serde_json::from_value(value)
                .map_err(|e| ClientError::InvalidResponse(e.to_string()));
        }

        let reason = match reply.message {
            Some(serde_json::Value::String(text)) => Some(text),
            _ => reply.error,
        }
        .unwrap_or_else(|| SEND_FALLBACK.to_string());
        warn!(%status, "Send rejected: {}", reason);
        Err(ClientError::SendRejected(reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = ChatClient::new("http://127.0.0.1:5000/");
        assert_eq!(client.base_url(), "http://127.0.0.1:5000");
        assert_eq!(client.endpoint("login"), "http://127.0.0.1:5000/login");
    }

    #[test]
    fn test_send_reply_accepts_both_message_shapes() {
        let ok: SendReply = serde_json::from_str(
            r#"{"success":true,"message":{"senderId":"u1","recipientId":"u2","content":"hi","type":"text","timestamp":"2024-01-01T10:00:00Z"}}"#,
        )
        .unwrap();
        assert!(ok.message.unwrap().is_object());

        let failed: SendReply =
            serde_json::from_str(r#"{"success":false,"message":"too long"}"#).unwrap();
        assert_eq!(failed.message, Some(serde_json::Value::String("too long".into())));
    }
}
