//! Inputs and outputs of the view controller

use std::path::PathBuf;
use std::time::Duration;

use crate::attachment::AttachmentError;
use crate::client::{ClientResult, LoginResponse};
use crate::model::Message;

/// Something the user did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SubmitLogin { username: String, password: String },
    InputChanged(String),
    /// The send control
    Send,
    /// Enter in the text input; same as [`Action::Send`]
    EnterPressed,
    Like,
    AttachFile(PathBuf),
    Logout,
    /// Activate the conversation list entry
    OpenChat,
    /// Return to the conversation list on narrow viewports
    Back,
    Resize { width: u32 },
}

/// Everything the controller reacts to
#[derive(Debug)]
pub enum Event {
    User(Action),
    StartupElapsed,
    LoginCompleted(ClientResult<LoginResponse>),
    HistoryLoaded {
        user_id: String,
        recipient_id: String,
        result: ClientResult<Vec<Message>>,
    },
    MessageSent(ClientResult<Message>),
    AttachmentEncoded(Result<String, AttachmentError>),
}

impl From<Action> for Event {
    fn from(action: Action) -> Self {
        Event::User(action)
    }
}

/// Work the controller asks the runtime to perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// One-time splash delay before showing the login form
    StartupDelay(Duration),
    Login { username: String, password: String },
    FetchHistory { user_id: String, recipient_id: String },
    Send(Message),
    EncodeAttachment { path: PathBuf, limit: u64 },
}
