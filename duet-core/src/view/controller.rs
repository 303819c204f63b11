//! Session and message state machine
//!
//! [`ViewController::handle`] is the single dispatch point: user actions and
//! client completions come in as [`Event`]s, state is updated in place and
//! follow-up work goes out as [`Command`]s. Login and logout are the only
//! transitions that change the session.

use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::event::{Action, Command, Event};
use super::state::{AuthState, HistoryState, Notice, NoticeKind, Panel, ViewState};
use crate::attachment::{AttachmentError, MAX_ATTACHMENT_BYTES};
use crate::client::{ClientError, ClientResult, LoginResponse};
use crate::config::UiConfig;
use crate::model::{Message, MessageKind, Session, LIKE_CONTENT};
use crate::session::{KeyValueStore, SessionStore};

const UNREACHABLE_LOGIN: &str = "Could not reach the server. Make sure the backend is running.";
const UNREACHABLE_SEND: &str = "Failed to send the message. Check your connection.";
const HISTORY_FAILED: &str = "Failed to load messages.";
const HISTORY_UNREACHABLE: &str = "Cannot reach the server.";
const ATTACHMENT_FAILED: &str = "Failed to send the file.";
const UNEXPECTED_REPLY: &str = "The server sent a reply that could not be understood.";

/// Tunables taken from [`UiConfig`]
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub startup_delay: Duration,
    pub narrow_breakpoint: u32,
    pub max_attachment_bytes: u64,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            startup_delay: Duration::from_millis(500),
            narrow_breakpoint: 768,
            max_attachment_bytes: MAX_ATTACHMENT_BYTES,
        }
    }
}

impl From<&UiConfig> for ControllerSettings {
    fn from(ui: &UiConfig) -> Self {
        Self {
            startup_delay: Duration::from_millis(ui.startup_delay_ms),
            narrow_breakpoint: ui.narrow_breakpoint,
            max_attachment_bytes: ui.max_attachment_bytes,
        }
    }
}

pub struct ViewController<S> {
    state: ViewState,
    store: SessionStore<S>,
    settings: ControllerSettings,
}

impl<S: KeyValueStore> ViewController<S> {
    pub fn new(store: SessionStore<S>, settings: ControllerSettings) -> Self {
        Self {
            state: ViewState::new(settings.narrow_breakpoint),
            store,
            settings,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn store(&self) -> &SessionStore<S> {
        &self.store
    }

    /// Drain alerts raised since the last call
    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.state.take_notices()
    }

    pub fn dismiss_notice(&mut self) -> Option<Notice> {
        self.state.dismiss_notice()
    }

    /// Mark the newest message as shown so the view stops forcing a scroll
    pub fn acknowledge_scroll(&mut self) {
        self.state.follow_tail = false;
    }

    /// Resolve the initial state from the stored session.
    ///
    /// A stored session goes straight to the chat without a login call;
    /// otherwise the splash stays up for the startup delay.
    pub fn start(&mut self) -> Vec<Command> {
        match self.store.restore() {
            Some(session) => {
                info!(user = %session.user.id, "Resuming stored session");
                self.enter_chat(session)
            }
            None => {
                debug!("No stored session");
                self.state.auth = AuthState::Loading;
                vec![Command::StartupDelay(self.settings.startup_delay)]
            }
        }
    }

    pub fn handle(&mut self, event: Event) -> Vec<Command> {
        match event {
            Event::User(action) => self.on_action(action),
            Event::StartupElapsed => self.on_startup_elapsed(),
            Event::LoginCompleted(result) => self.on_login_completed(result),
            Event::HistoryLoaded {
                user_id,
                recipient_id,
                result,
            } => self.on_history_loaded(&user_id, &recipient_id, result),
            Event::MessageSent(result) => self.on_message_sent(result),
            Event::AttachmentEncoded(result) => self.on_attachment_encoded(result),
        }
    }

    fn on_action(&mut self, action: Action) -> Vec<Command> {
        match action {
            Action::SubmitLogin { username, password } => self.submit_login(username, password),
            Action::InputChanged(text) => {
                self.state.input = text;
                Vec::new()
            }
            Action::Send | Action::EnterPressed => self.submit_text(),
            Action::Like => self.send_like(),
            Action::AttachFile(path) => self.attach_file(path),
            Action::Logout => {
                self.logout();
                Vec::new()
            }
            Action::OpenChat => match self.state.session().cloned() {
                Some(session) => self.open_chat(&session),
                None => Vec::new(),
            },
            Action::Back => {
                self.state.panel = Panel::List;
                Vec::new()
            }
            Action::Resize { width } => {
                self.state.viewport_width = width;
                Vec::new()
            }
        }
    }

    fn submit_login(&mut self, username: String, password: String) -> Vec<Command> {
        if self.state.auth != AuthState::Unauthenticated {
            debug!("Ignoring login outside the login form");
            return Vec::new();
        }
        vec![Command::Login {
            username: username.to_lowercase(),
            password,
        }]
    }

    fn submit_text(&mut self) -> Vec<Command> {
        let Some(session) = self.state.session() else {
            return Vec::new();
        };
        let text = self.state.input.trim();
        if text.is_empty() {
            return Vec::new();
        }
        vec![Command::Send(session.draft(text, MessageKind::Text))]
    }

    fn send_like(&mut self) -> Vec<Command> {
        match self.state.session() {
            Some(session) => vec![Command::Send(session.draft(LIKE_CONTENT, MessageKind::Like))],
            None => Vec::new(),
        }
    }

    fn attach_file(&mut self, path: PathBuf) -> Vec<Command> {
        if !self.state.is_authenticated() {
            return Vec::new();
        }
        self.state.attachment = Some(path.clone());
        vec![Command::EncodeAttachment {
            path,
            limit: self.settings.max_attachment_bytes,
        }]
    }

    fn logout(&mut self) {
        if let Err(e) = self.store.clear() {
            warn!("Failed to clear stored session: {}", e);
        }
        if let Some(session) = self.state.session() {
            info!(user = %session.user.id, "Logged out");
        }
        self.state.auth = AuthState::Unauthenticated;
        self.state.panel = Panel::List;
        self.state.messages.clear();
        self.state.history = HistoryState::Idle;
        self.state.input.clear();
        self.state.input_enabled = false;
        self.state.attachment = None;
        self.state.follow_tail = false;
    }

    fn on_startup_elapsed(&mut self) -> Vec<Command> {
        if self.state.auth == AuthState::Loading {
            self.state.auth = AuthState::Unauthenticated;
        }
        Vec::new()
    }

    fn on_login_completed(&mut self, result: ClientResult<LoginResponse>) -> Vec<Command> {
        if self.state.auth != AuthState::Unauthenticated {
            debug!("Ignoring login completion outside the login form");
            return Vec::new();
        }
        match result {
            Ok(LoginResponse { user, recipient }) => {
                let session = Session::new(user, recipient);
                if let Err(e) = self.store.persist(&session) {
                    warn!("Failed to persist session: {}", e);
                }
                info!(user = %session.user.id, "Logged in");
                self.enter_chat(session)
            }
            Err(ClientError::AuthRejected(message)) => {
                self.state.push_notice(Notice::new(
                    NoticeKind::AuthRejected,
                    format!("Login failed: {}", message),
                ));
                Vec::new()
            }
            Err(e) => {
                warn!("Login error: {}", e);
                self.state.push_notice(failure_notice(&e, UNREACHABLE_LOGIN));
                Vec::new()
            }
        }
    }

    fn on_history_loaded(
        &mut self,
        user_id: &str,
        recipient_id: &str,
        result: ClientResult<Vec<Message>>,
    ) -> Vec<Command> {
        let current = self
            .state
            .session()
            .is_some_and(|s| s.user.id == user_id && s.recipient.id == recipient_id);
        if !current {
            debug!("Ignoring history for a conversation that is no longer open");
            return Vec::new();
        }
        match result {
            Ok(messages) => {
                self.state.messages = messages;
                self.state.history = HistoryState::Ready;
                self.state.follow_tail = true;
            }
            Err(e) => {
                warn!("History load failed: {}", e);
                let text = match e {
                    ClientError::Network(_) => HISTORY_UNREACHABLE,
                    _ => HISTORY_FAILED,
                };
                self.state.history = HistoryState::Failed(text.to_string());
            }
        }
        Vec::new()
    }

    fn on_message_sent(&mut self, result: ClientResult<Message>) -> Vec<Command> {
        let Some(session) = self.state.session() else {
            debug!("Ignoring send completion after logout");
            return Vec::new();
        };
        match result {
            Ok(message) => {
                if !session.is_own(&message) {
                    debug!("Ignoring confirmation for another session");
                    return Vec::new();
                }
                if message.kind == MessageKind::Text {
                    self.state.input.clear();
                }
                self.state.messages.push(message);
                // A failed load keeps its inline error; confirmations append below it
                if self.state.history == HistoryState::Loading {
                    self.state.history = HistoryState::Ready;
                }
                self.state.follow_tail = true;
            }
            Err(ClientError::SendRejected(message)) => {
                self.state.push_notice(Notice::new(
                    NoticeKind::SendRejected,
                    format!("Send failed: {}", message),
                ));
            }
            Err(e) => {
                warn!("Send error: {}", e);
                self.state.push_notice(failure_notice(&e, UNREACHABLE_SEND));
            }
        }
        Vec::new()
    }

    fn on_attachment_encoded(&mut self, result: Result<String, AttachmentError>) -> Vec<Command> {
        // Cleared on every outcome so the same file can be picked again
        self.state.attachment = None;
        let Some(session) = self.state.session() else {
            return Vec::new();
        };
        match result {
            Ok(data_uri) => vec![Command::Send(session.draft(data_uri, MessageKind::Image))],
            Err(AttachmentError::TooLarge { limit, .. }) => {
                self.state.push_notice(Notice::new(
                    NoticeKind::AttachmentTooLarge,
                    format!(
                        "This file cannot be sent. Choose an image smaller than {} KB.",
                        limit / 1000
                    ),
                ));
                Vec::new()
            }
            Err(e) => {
                warn!("Attachment error: {}", e);
                self.state
                    .push_notice(Notice::new(NoticeKind::AttachmentReadFailure, ATTACHMENT_FAILED));
                Vec::new()
            }
        }
    }

    fn enter_chat(&mut self, session: Session) -> Vec<Command> {
        self.state.auth = AuthState::Authenticated(session.clone());
        self.state.input_enabled = true;
        self.open_chat(&session)
    }

    /// Show the conversation with the fixed recipient and reload its history
    fn open_chat(&mut self, session: &Session) -> Vec<Command> {
        self.state.messages.clear();
        self.state.history = HistoryState::Loading;
        if self.state.is_narrow() {
            self.state.panel = Panel::Chat;
        }
        vec![Command::FetchHistory {
            user_id: session.user.id.clone(),
            recipient_id: session.recipient.id.clone(),
        }]
    }
}

/// Notice for a client failure other than an explicit rejection
fn failure_notice(error: &ClientError, unreachable: &str) -> Notice {
    match error {
        ClientError::InvalidResponse(_) => {
            Notice::new(NoticeKind::UnexpectedReply, UNEXPECTED_REPLY)
        }
        _ => Notice::new(NoticeKind::NetworkUnreachable, unreachable),
    }
}
