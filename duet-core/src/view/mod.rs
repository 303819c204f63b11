//! Toolkit-independent view layer
//!
//! The controller owns the transient view state and the session store; the
//! runtime turns its commands into backend calls. Front ends only translate
//! input into [`Action`]s and draw [`ViewState`].

pub mod controller;
pub mod event;
pub mod render;
pub mod runtime;
pub mod state;

pub use controller::{ControllerSettings, ViewController};
pub use event::{Action, Command, Event};
pub use render::{render_conversation, render_message, Alignment, Body, RenderedMessage};
pub use runtime::{execute, run_until_idle};
pub use state::{AuthState, HistoryState, Notice, NoticeKind, Panel, ViewState};
