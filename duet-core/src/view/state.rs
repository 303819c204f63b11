//! Everything the front end draws

use std::collections::VecDeque;
use std::path::PathBuf;

use crate::model::{Message, Session};

/// Authentication super-state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// Startup splash, before the stored session has been resolved
    Loading,
    Unauthenticated,
    Authenticated(Session),
}

/// Which panel is shown on narrow viewports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    List,
    Chat,
}

/// Progress of the history load for the open conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryState {
    Idle,
    Loading,
    Ready,
    /// Shown inline in the conversation pane
    Failed(String),
}

/// Category of a user-facing alert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    AuthRejected,
    NetworkUnreachable,
    /// The backend answered with something unreadable
    UnexpectedReply,
    SendRejected,
    AttachmentTooLarge,
    AttachmentReadFailure,
}

/// A blocking alert the front end must show
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Transient view state owned by the controller
#[derive(Debug, Clone)]
pub struct ViewState {
    pub auth: AuthState,
    pub panel: Panel,
    pub viewport_width: u32,
    pub narrow_breakpoint: u32,
    pub messages: Vec<Message>,
    pub history: HistoryState,
    pub input: String,
    pub input_enabled: bool,
    /// Attachment picked but not yet processed
    pub attachment: Option<PathBuf>,
    /// Set whenever the view should scroll to the newest message
    pub follow_tail: bool,
    notices: VecDeque<Notice>,
}

impl ViewState {
    pub fn new(narrow_breakpoint: u32) -> Self {
        Self {
            auth: AuthState::Loading,
            panel: Panel::List,
            viewport_width: u32::MAX,
            narrow_breakpoint,
            messages: Vec::new(),
            history: HistoryState::Idle,
            input: String::new(),
            input_enabled: false,
            attachment: None,
            follow_tail: false,
            notices: VecDeque::new(),
        }
    }

    pub fn session(&self) -> Option<&Session> {
        match &self.auth {
            AuthState::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().is_some()
    }

    pub fn is_narrow(&self) -> bool {
        self.viewport_width <= self.narrow_breakpoint
    }

    /// Panels to draw, left to right
    pub fn visible_panels(&self) -> Vec<Panel> {
        if self.is_narrow() {
            vec![self.panel]
        } else {
            vec![Panel::List, Panel::Chat]
        }
    }

    /// Whether the conversation pane shows the empty-state placeholder
    pub fn show_placeholder(&self) -> bool {
        match self.history {
            HistoryState::Loading => true,
            HistoryState::Ready => self.messages.is_empty(),
            HistoryState::Idle | HistoryState::Failed(_) => false,
        }
    }

    pub fn push_notice(&mut self, notice: Notice) {
        self.notices.push_back(notice);
    }

    /// The oldest alert not yet dismissed
    pub fn current_notice(&self) -> Option<&Notice> {
        self.notices.front()
    }

    pub fn dismiss_notice(&mut self) -> Option<Notice> {
        self.notices.pop_front()
    }

    /// Drain alerts in the order they were raised
    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_panels_by_width() {
        let mut state = ViewState::new(768);
        state.viewport_width = 1024;
        assert_eq!(state.visible_panels(), vec![Panel::List, Panel::Chat]);

        state.viewport_width = 768;
        state.panel = Panel::Chat;
        assert_eq!(state.visible_panels(), vec![Panel::Chat]);
    }

    #[test]
    fn test_placeholder_rules() {
        let mut state = ViewState::new(768);
        assert!(!state.show_placeholder());
        state.history = HistoryState::Loading;
        assert!(state.show_placeholder());
        state.history = HistoryState::Ready;
        assert!(state.show_placeholder());
        state.history = HistoryState::Failed("down".to_string());
        assert!(!state.show_placeholder());
    }

    #[test]
    fn test_notices_drain_in_order() {
        let mut state = ViewState::new(768);
        state.push_notice(Notice::new(NoticeKind::SendRejected, "first"));
        state.push_notice(Notice::new(NoticeKind::NetworkUnreachable, "second"));
        assert_eq!(state.current_notice().unwrap().message, "first");
        assert_eq!(state.dismiss_notice().unwrap().message, "first");

        state.push_notice(Notice::new(NoticeKind::AuthRejected, "third"));
        let drained = state.take_notices();
        assert_eq!(drained[0].message, "second");
        assert_eq!(drained[1].message, "third");
        assert!(state.take_notices().is_empty());
    }
}
