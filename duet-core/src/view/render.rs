//! Message rendering contract

use crate::model::{Message, MessageKind};

/// Horizontal placement of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    /// Sent by the other participant
    Left,
    /// Sent by the current user
    Right,
}

/// What goes inside the rendered message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body<'a> {
    /// Plain text inside a bubble
    Text(&'a str),
    /// Drawn without a bubble background
    Image { data_uri: &'a str },
    /// Distinguished marker
    Like(&'a str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage<'a> {
    pub alignment: Alignment,
    pub body: Body<'a>,
    /// `HH:MM`, absent for drafts or unparsable timestamps
    pub time: Option<String>,
}

impl RenderedMessage<'_> {
    pub fn has_bubble(&self) -> bool {
        !matches!(self.body, Body::Image { .. })
    }
}

pub fn render_message<'a>(message: &'a Message, current_user_id: &str) -> RenderedMessage<'a> {
    let alignment = if message.sender_id == current_user_id {
        Alignment::Right
    } else {
        Alignment::Left
    };
    let body = match message.kind {
        MessageKind::Text => Body::Text(&message.content),
        MessageKind::Image => Body::Image {
            data_uri: &message.content,
        },
        MessageKind::Like => Body::Like(&message.content),
    };
    RenderedMessage {
        alignment,
        body,
        time: format_time(message),
    }
}

/// Render a whole conversation in order
pub fn render_conversation<'a>(
    messages: &'a [Message],
    current_user_id: &str,
) -> Vec<RenderedMessage<'a>> {
    messages
        .iter()
        .map(|m| render_message(m, current_user_id))
        .collect()
}

pub fn format_time(message: &Message) -> Option<String> {
    message
        .sent_at()
        .map(|at| at.format("%H:%M").to_string())
}

/// Short textual stand-in for an image, e.g. `image/png, 1.2 KB`
pub fn describe_image(data_uri: &str) -> String {
    let Some(rest) = data_uri.strip_prefix("data:") else {
        return "image".to_string();
    };
    let (header, payload) = rest.split_once(',').unwrap_or((rest, ""));
    let mime = header.split(';').next().filter(|m| !m.is_empty()).unwrap_or("image");
    // base64 carries 3 bytes per 4 characters
    let approx_bytes = payload.trim_end_matches('=').len() * 3 / 4;
    format!("{}, {}", mime, human_size(approx_bytes))
}

fn human_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(sender: &str, kind: MessageKind, content: &str, ts: Option<&str>) -> Message {
        Message {
            sender_id: sender.to_string(),
            recipient_id: "other".to_string(),
            content: content.to_string(),
            kind,
            timestamp: ts.map(str::to_string),
        }
    }

    #[test]
    fn test_alignment_follows_sender() {
        let own = message("u1", MessageKind::Text, "hi", None);
        let theirs = message("u2", MessageKind::Text, "hey", None);
        assert_eq!(render_message(&own, "u1").alignment, Alignment::Right);
        assert_eq!(render_message(&theirs, "u1").alignment, Alignment::Left);
    }

    #[test]
    fn test_body_per_kind() {
        let text = message("u1", MessageKind::Text, "hi", None);
        let image = message("u1", MessageKind::Image, "data:image/png;base64,AA==", None);
        let like = message("u2", MessageKind::Like, "❤️", None);

        let rendered = render_message(&text, "u1");
        assert_eq!(rendered.body, Body::Text("hi"));
        assert!(rendered.has_bubble());

        let rendered = render_message(&image, "u1");
        assert!(matches!(rendered.body, Body::Image { .. }));
        assert!(!rendered.has_bubble());

        assert_eq!(render_message(&like, "u1").body, Body::Like("❤️"));
    }

    #[test]
    fn test_time_only_with_timestamp() {
        let draft = message("u1", MessageKind::Text, "hi", None);
        assert_eq!(render_message(&draft, "u1").time, None);

        let confirmed = message("u1", MessageKind::Text, "hi", Some("2024-01-01T10:00:00Z"));
        assert_eq!(render_message(&confirmed, "u1").time.as_deref(), Some("10:00"));
    }

    #[test]
    fn test_render_conversation_keeps_order() {
        let messages = vec![
            message("u2", MessageKind::Text, "first", None),
            message("u1", MessageKind::Text, "second", None),
        ];
        let rendered = render_conversation(&messages, "u1");
        assert_eq!(rendered[0].body, Body::Text("first"));
        assert_eq!(rendered[1].body, Body::Text("second"));
    }

    #[test]
    fn test_describe_image() {
        assert_eq!(describe_image("data:image/png;base64,aGk="), "image/png, 2 B");
        assert_eq!(describe_image("not a uri"), "image");
    }
}
