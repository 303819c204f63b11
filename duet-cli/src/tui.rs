//! Interactive terminal front end
//!
//! Keys become [`Action`]s for the shared controller. Every command it issues
//! runs on its own task and reports back over a channel, so drawing never
//! waits on the network.

use anyhow::Result;
use crossterm::event::{self, Event as CEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use duet_core::client::ChatClient;
use duet_core::config::Config;
use duet_core::model::Session;
use duet_core::session::{FileStore, KeyValueStore, SessionStore};
use duet_core::utils::expand_tilde;
use duet_core::view::render::describe_image;
use duet_core::view::{
    execute, render_conversation, Action, Alignment as Side, AuthState, Body, Command,
    ControllerSettings, Event, HistoryState, NoticeKind, Panel, ViewController, ViewState,
};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::{backend::CrosstermBackend, Frame, Terminal};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

const PLACEHOLDER: &str = "No messages yet. Say hello!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoginField {
    Username,
    Password,
}

/// Terminal-only state the controller does not track
struct TuiApp {
    cell_width_px: u32,
    username: String,
    password: String,
    login_focus: LoginField,
    /// Path being typed after Ctrl+O
    attach_path: Option<String>,
    scroll: u16,
    /// The last frame scrolled to the newest message
    tail_shown: bool,
    should_quit: bool,
}

impl TuiApp {
    fn new(cell_width_px: u32) -> Self {
        Self {
            cell_width_px,
            username: String::new(),
            password: String::new(),
            login_focus: LoginField::Username,
            attach_path: None,
            scroll: 0,
            tail_shown: false,
            should_quit: false,
        }
    }

    /// Terminal columns in logical pixels
    fn logical_width(&self, columns: u16) -> u32 {
        u32::from(columns).saturating_mul(self.cell_width_px)
    }

    fn focused_field(&mut self) -> &mut String {
        match self.login_focus {
            LoginField::Username => &mut self.username,
            LoginField::Password => &mut self.password,
        }
    }

    fn reset_chat(&mut self) {
        self.attach_path = None;
        self.scroll = 0;
        self.password.clear();
        self.login_focus = LoginField::Username;
    }
}

pub async fn run_tui(config: &Config) -> Result<()> {
    let api = Arc::new(ChatClient::from_config(&config.server));
    let store = SessionStore::new(FileStore::new(expand_tilde(&config.storage.dir)));
    let mut controller = ViewController::new(store, ControllerSettings::from(&config.ui));
    let mut app = TuiApp::new(config.ui.cell_width_px);
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    info!(server = %api.base_url(), "Starting TUI");

    let mut stdout = io::stdout();
    enable_raw_mode()?;
    stdout.execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let size = terminal.size()?;
    controller.handle(
        Action::Resize {
            width: app.logical_width(size.width),
        }
        .into(),
    );
    spawn_commands(&api, &event_tx, controller.start());

    let result = event_loop(
        &mut terminal,
        &mut controller,
        &mut app,
        &api,
        &event_tx,
        &mut event_rx,
    )
    .await;

    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    controller: &mut ViewController<FileStore>,
    app: &mut TuiApp,
    api: &Arc<ChatClient>,
    event_tx: &mpsc::UnboundedSender<Event>,
    event_rx: &mut mpsc::UnboundedReceiver<Event>,
) -> Result<()> {
    loop {
        while let Ok(evt) = event_rx.try_recv() {
            let commands = controller.handle(evt);
            spawn_commands(api, event_tx, commands);
        }

        terminal.draw(|frame| draw(frame, controller.state(), app))?;
        if app.tail_shown {
            controller.acknowledge_scroll();
            app.tail_shown = false;
        }

        if event::poll(Duration::from_millis(60))? {
            match event::read()? {
                CEvent::Key(key) if key.kind == KeyEventKind::Press => {
                    let commands = handle_key(key, app, controller);
                    spawn_commands(api, event_tx, commands);
                }
                CEvent::Resize(columns, _) => {
                    let width = app.logical_width(columns);
                    controller.handle(Action::Resize { width }.into());
                }
                _ => {}
            }
        }

        if app.should_quit {
            info!("Leaving TUI");
            return Ok(());
        }
    }
}

fn spawn_commands(
    api: &Arc<ChatClient>,
    event_tx: &mpsc::UnboundedSender<Event>,
    commands: Vec<Command>,
) {
    for command in commands {
        let api = Arc::clone(api);
        let event_tx = event_tx.clone();
        tokio::spawn(async move {
            let evt = execute(api.as_ref(), command).await;
            if event_tx.send(evt).is_err() {
                debug!("Dropping completion after the TUI closed");
            }
        });
    }
}

fn handle_key<S: KeyValueStore>(
    key: KeyEvent,
    app: &mut TuiApp,
    controller: &mut ViewController<S>,
) -> Vec<Command> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return Vec::new();
    }

    // Alerts block everything else until dismissed
    if controller.state().current_notice().is_some() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
            controller.dismiss_notice();
        }
        return Vec::new();
    }

    if controller.state().is_authenticated() {
        chat_key(key, app, controller)
    } else if controller.state().auth == AuthState::Unauthenticated {
        login_key(key, app, controller)
    } else {
        Vec::new()
    }
}

fn login_key<S: KeyValueStore>(
    key: KeyEvent,
    app: &mut TuiApp,
    controller: &mut ViewController<S>,
) -> Vec<Command> {
    match key.code {
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
            app.login_focus = match app.login_focus {
                LoginField::Username => LoginField::Password,
                LoginField::Password => LoginField::Username,
            };
            Vec::new()
        }
        KeyCode::Enter if app.login_focus == LoginField::Username && app.password.is_empty() => {
            app.login_focus = LoginField::Password;
            Vec::new()
        }
        KeyCode::Enter => {
            let action = Action::SubmitLogin {
                username: app.username.trim().to_string(),
                password: std::mem::take(&mut app.password),
            };
            controller.handle(action.into())
        }
        KeyCode::Backspace => {
            app.focused_field().pop();
            Vec::new()
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.focused_field().push(ch);
            Vec::new()
        }
        _ => Vec::new(),
    }
}

fn chat_key<S: KeyValueStore>(
    key: KeyEvent,
    app: &mut TuiApp,
    controller: &mut ViewController<S>,
) -> Vec<Command> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    if let Some(path) = app.attach_path.as_mut() {
        match key.code {
            KeyCode::Esc => app.attach_path = None,
            KeyCode::Enter => {
                let path = path.trim().to_string();
                app.attach_path = None;
                if !path.is_empty() {
                    return controller.handle(Action::AttachFile(expand_tilde(&path)).into());
                }
            }
            KeyCode::Backspace => {
                path.pop();
            }
            KeyCode::Char(ch) if !ctrl => path.push(ch),
            _ => {}
        }
        return Vec::new();
    }

    let on_list = {
        let state = controller.state();
        state.is_narrow() && state.panel == Panel::List
    };

    match key.code {
        KeyCode::Char('q') if ctrl => {
            app.reset_chat();
            controller.handle(Action::Logout.into())
        }
        KeyCode::Char('l') if ctrl => controller.handle(Action::Like.into()),
        KeyCode::Char('o') if ctrl => {
            app.attach_path = Some(String::new());
            Vec::new()
        }
        KeyCode::Tab => controller.handle(Action::OpenChat.into()),
        KeyCode::Enter if on_list => controller.handle(Action::OpenChat.into()),
        KeyCode::Esc => controller.handle(Action::Back.into()),
        KeyCode::Enter => controller.handle(Action::EnterPressed.into()),
        KeyCode::PageUp | KeyCode::Up => {
            app.scroll = app.scroll.saturating_sub(1);
            Vec::new()
        }
        KeyCode::PageDown | KeyCode::Down => {
            app.scroll = app.scroll.saturating_add(1);
            Vec::new()
        }
        KeyCode::Backspace if !on_list => {
            let mut input = controller.state().input.clone();
            input.pop();
            controller.handle(Action::InputChanged(input).into())
        }
        KeyCode::Char(ch) if !ctrl && !on_list && controller.state().input_enabled => {
            let mut input = controller.state().input.clone();
            input.push(ch);
            controller.handle(Action::InputChanged(input).into())
        }
        _ => Vec::new(),
    }
}

fn draw(frame: &mut Frame, state: &ViewState, app: &mut TuiApp) {
    match &state.auth {
        AuthState::Loading => draw_splash(frame),
        AuthState::Unauthenticated => draw_login(frame, app),
        AuthState::Authenticated(session) => draw_chat(frame, state, session, app),
    }
    if let Some(notice) = state.current_notice() {
        let title = match notice.kind {
            NoticeKind::AuthRejected => "login failed",
            NoticeKind::NetworkUnreachable => "connection problem",
            NoticeKind::UnexpectedReply => "unexpected reply",
            NoticeKind::SendRejected => "not sent",
            NoticeKind::AttachmentTooLarge => "file too large",
            NoticeKind::AttachmentReadFailure => "file error",
        };
        let area = centered(frame.area(), 60, 7);
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(vec![
                Line::from(notice.message.as_str()),
                Line::from(""),
                Line::from(Span::styled(
                    "Enter to dismiss",
                    Style::default().fg(Color::DarkGray),
                )),
            ])
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Red))
                    .title(title),
            )
            .wrap(Wrap { trim: true }),
            area,
        );
    }
}

fn draw_splash(frame: &mut Frame) {
    let area = centered(frame.area(), 30, 5);
    frame.render_widget(
        Paragraph::new(vec![
            Line::from(Span::styled(
                "duet",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("Loading..."),
        ])
        .alignment(Alignment::Center),
        area,
    );
}

fn draw_login(frame: &mut Frame, app: &TuiApp) {
    let area = centered(frame.area(), 50, 8);
    let marker = |field: LoginField| if app.login_focus == field { "> " } else { "  " };
    let masked = "*".repeat(app.password.chars().count());
    let lines = vec![
        Line::from(format!("{}Username: {}", marker(LoginField::Username), app.username)),
        Line::from(format!("{}Password: {}", marker(LoginField::Password), masked)),
        Line::from(""),
        Line::from(Span::styled(
            "Tab switch field | Enter sign in | Ctrl+C quit",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Sign in")),
        area,
    );

    let (row, text_len) = match app.login_focus {
        LoginField::Username => (0, app.username.chars().count()),
        LoginField::Password => (1, masked.chars().count()),
    };
    let prefix = "> Username: ".len() as u16;
    frame.set_cursor_position((
        area.x + 1 + prefix + text_len as u16,
        area.y + 1 + row,
    ));
}

fn draw_chat(frame: &mut Frame, state: &ViewState, session: &Session, app: &mut TuiApp) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let panels = state.visible_panels();
    let constraints: Vec<Constraint> = panels
        .iter()
        .map(|panel| match (panel, panels.len()) {
            (_, 1) => Constraint::Percentage(100),
            (Panel::List, _) => Constraint::Percentage(30),
            (Panel::Chat, _) => Constraint::Percentage(70),
        })
        .collect();
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(chunks[0]);

    for (panel, area) in panels.iter().zip(columns.iter()) {
        match panel {
            Panel::List => draw_list(frame, state, session, *area),
            Panel::Chat => draw_conversation(frame, state, session, app, *area),
        }
    }

    let (title, text) = match &app.attach_path {
        Some(path) => ("attach file (Enter attach, Esc cancel)", path.clone()),
        None => (
            "message (Enter send, Ctrl+L like, Ctrl+O attach)",
            state.input.clone(),
        ),
    };
    frame.render_widget(
        Paragraph::new(text.clone()).block(Block::default().borders(Borders::ALL).title(title)),
        chunks[1],
    );
    if state.input_enabled {
        frame.set_cursor_position((
            chunks[1].x + 1 + text.chars().count() as u16,
            chunks[1].y + 1,
        ));
    }

    let status = match &state.attachment {
        Some(path) => format!("sending {} ...", path.display()),
        None => format!(
            "signed in as {} | Tab open chat | Esc back | Ctrl+Q logout | Ctrl+C quit",
            session.user.display_name
        ),
    };
    frame.render_widget(
        Paragraph::new(status).style(Style::default().fg(Color::DarkGray)),
        chunks[2],
    );
}

fn draw_list(frame: &mut Frame, state: &ViewState, session: &Session, area: Rect) {
    let selected = state.is_narrow() && state.panel == Panel::List;
    let name_style = if selected {
        Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    };
    let lines = vec![
        Line::from(Span::styled(session.recipient.display_name.as_str(), name_style)),
        Line::from(Span::styled(
            session.recipient.description.as_str(),
            Style::default().fg(Color::DarkGray),
        )),
    ];
    frame.render_widget(
        Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("conversations"))
            .wrap(Wrap { trim: true }),
        area,
    );
}

fn draw_conversation(
    frame: &mut Frame,
    state: &ViewState,
    session: &Session,
    app: &mut TuiApp,
    area: Rect,
) {
    let title = if session.recipient.description.is_empty() {
        session.recipient.display_name.clone()
    } else {
        format!(
            "{} | {}",
            session.recipient.display_name, session.recipient.description
        )
    };
    let block = Block::default().borders(Borders::ALL).title(title);

    let lines = conversation_lines(state, &session.user.id);
    let inner_width = area.width.saturating_sub(2);
    let inner_height = area.height.saturating_sub(2);
    let max_scroll = wrapped_height(&lines, inner_width).saturating_sub(inner_height);
    if state.follow_tail {
        app.scroll = max_scroll;
        app.tail_shown = true;
    } else {
        app.scroll = app.scroll.min(max_scroll);
    }

    frame.render_widget(
        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((app.scroll, 0)),
        area,
    );
}

fn conversation_lines<'a>(state: &'a ViewState, user_id: &str) -> Vec<Line<'a>> {
    let muted = Style::default().fg(Color::DarkGray);
    if state.show_placeholder() {
        return vec![Line::from(Span::styled(PLACEHOLDER, muted)).alignment(Alignment::Center)];
    }

    let mut lines = Vec::new();
    // Messages sent after a failed load still show below the error
    if let HistoryState::Failed(reason) = &state.history {
        lines.push(Line::from(Span::styled(
            reason.as_str(),
            Style::default().fg(Color::Red),
        )));
    }
    for rendered in render_conversation(&state.messages, user_id) {
        let (alignment, bubble) = match rendered.alignment {
            Side::Right => (Alignment::Right, Style::default().bg(Color::Blue)),
            Side::Left => (Alignment::Left, Style::default().bg(Color::DarkGray)),
        };
        let body = match rendered.body {
            Body::Text(text) => Span::styled(format!(" {} ", text), bubble),
            Body::Image { data_uri } => Span::styled(
                format!("[image: {}]", describe_image(data_uri)),
                Style::default().add_modifier(Modifier::ITALIC),
            ),
            Body::Like(marker) => Span::styled(marker, Style::default().fg(Color::Red)),
        };
        let mut spans = vec![body];
        if let Some(time) = rendered.time {
            spans.push(Span::styled(format!(" {}", time), muted));
        }
        lines.push(Line::from(spans).alignment(alignment));
    }
    lines
}

/// Rows needed to show `lines` wrapped at `width`
fn wrapped_height(lines: &[Line], width: u16) -> u16 {
    if width == 0 {
        return 0;
    }
    let width = usize::from(width);
    let rows: usize = lines
        .iter()
        .map(|line| line.width().max(1).div_ceil(width))
        .sum();
    u16::try_from(rows).unwrap_or(u16::MAX)
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}
