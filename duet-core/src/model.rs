//! Users, messages and the authenticated session

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Content sent by the like action
pub const LIKE_CONTENT: &str = "❤️";

/// A participant as returned by the backend on login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Opaque stable identifier
    #[serde(rename = "uid", alias = "id")]
    pub id: String,
    /// Name shown in headers and the conversation list
    #[serde(rename = "fullName", alias = "displayName", default)]
    pub display_name: String,
    /// Profile picture location
    #[serde(rename = "photoURL", alias = "avatarUrl", default)]
    pub avatar_url: String,
    /// Short profile description
    #[serde(default)]
    pub description: String,
    /// Login name, when the backend includes it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// What a message carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    #[serde(rename = "text")]
    Text,
    /// Content is a `data:` URI
    #[serde(rename = "image_base64")]
    Image,
    #[serde(rename = "like")]
    Like,
}

impl MessageKind {
    /// Wire tag used by the backend
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Image => "image_base64",
            MessageKind::Like => "like",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message between the two participants
///
/// Drafts have no timestamp; the copy echoed by the server carries the
/// authoritative one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub sender_id: String,
    pub recipient_id: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Message {
    /// Create a draft message
    pub fn draft(
        sender_id: impl Into<String>,
        recipient_id: impl Into<String>,
        content: impl Into<String>,
        kind: MessageKind,
    ) -> Self {
        Self {
            sender_id: sender_id.into(),
            recipient_id: recipient_id.into(),
            content: content.into(),
            kind,
            timestamp: None,
        }
    }

    /// Whether the server has confirmed this message
    pub fn is_draft(&self) -> bool {
        self.timestamp.is_none()
    }

    /// Parse the server timestamp.
    ///
    /// Accepts RFC 3339 and the offset-less ISO-8601 form; the latter is read
    /// as UTC.
    pub fn sent_at(&self) -> Option<DateTime<FixedOffset>> {
        let raw = self.timestamp.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed);
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc().fixed_offset())
    }
}

/// The authenticated user and their fixed counterpart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: User,
    pub recipient: User,
}

impl Session {
    pub fn new(user: User, recipient: User) -> Self {
        Self { user, recipient }
    }

    /// Build a draft from the current user to the recipient
    pub fn draft(&self, content: impl Into<String>, kind: MessageKind) -> Message {
        Message::draft(&self.user.id, &self.recipient.id, content, kind)
    }

    /// Whether `message` was sent by the current user
    pub fn is_own(&self, message: &Message) -> bool {
        message.sender_id == self.user.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_wire_names() {
        let user: User = serde_json::from_str(
            r#"{"uid":"ali_123","username":"ali","fullName":"Ali","password":"secret",
                "description":"first","photoURL":"/static/default.png"}"#,
        )
        .unwrap();
        assert_eq!(user.id, "ali_123");
        assert_eq!(user.display_name, "Ali");
        assert_eq!(user.avatar_url, "/static/default.png");
        assert_eq!(user.username.as_deref(), Some("ali"));

        let encoded = serde_json::to_string(&user).unwrap();
        assert!(!encoded.contains("password"));
        assert!(encoded.contains("\"fullName\":\"Ali\""));
    }

    #[test]
    fn test_user_accepts_plain_id() {
        let user: User = serde_json::from_str(r#"{"id":"u1","fullName":"Alice"}"#).unwrap();
        assert_eq!(user.id, "u1");
        assert!(user.description.is_empty());
    }

    #[test]
    fn test_message_kind_tags() {
        let msg: Message = serde_json::from_str(
            r#"{"senderId":"a","recipientId":"b","content":"data:image/png;base64,AA==","type":"image_base64"}"#,
        )
        .unwrap();
        assert_eq!(msg.kind, MessageKind::Image);
        assert!(msg.is_draft());

        let unknown = serde_json::from_str::<Message>(
            r#"{"senderId":"a","recipientId":"b","content":"x","type":"video"}"#,
        );
        assert!(unknown.is_err());
    }

    #[test]
    fn test_sent_at_accepts_both_forms() {
        let mut msg = Message::draft("a", "b", "hi", MessageKind::Text);
        assert!(msg.sent_at().is_none());

        msg.timestamp = Some("2024-01-01T10:00:00Z".to_string());
        assert_eq!(msg.sent_at().unwrap().to_rfc3339(), "2024-01-01T10:00:00+00:00");

        msg.timestamp = Some("2024-03-05T08:15:42.123456".to_string());
        let parsed = msg.sent_at().unwrap();
        assert_eq!(parsed.format("%H:%M").to_string(), "08:15");

        msg.timestamp = Some("yesterday".to_string());
        assert!(msg.sent_at().is_none());
    }

    #[test]
    fn test_session_draft_and_ownership() {
        let user = User {
            id: "u1".to_string(),
            display_name: "Alice".to_string(),
            avatar_url: String::new(),
            description: String::new(),
            username: None,
        };
        let recipient = User {
            id: "u2".to_string(),
            ..user.clone()
        };
        let session = Session::new(user, recipient);
        let draft = session.draft("hi", MessageKind::Text);
        assert_eq!(draft.sender_id, "u1");
        assert_eq!(draft.recipient_id, "u2");
        assert!(session.is_own(&draft));
    }
}
