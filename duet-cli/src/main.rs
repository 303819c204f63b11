//! CLI entry point for duet

mod tui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use dialoguer::{Input, Password};
use duet_core::client::ChatClient;
use duet_core::config::{Config, ConfigLoader};
use duet_core::logging::init_logging;
use duet_core::model::Session;
use duet_core::session::{FileStore, SessionStore};
use duet_core::utils::{expand_tilde, truncate};
use duet_core::view::render::describe_image;
use duet_core::view::{
    render_conversation, run_until_idle, Action, Alignment, Body, ControllerSettings,
    HistoryState, ViewController,
};
use std::path::PathBuf;
use std::time::Duration;

/// Longest text body printed by `duet history`
const MAX_PRINTED_TEXT: usize = 500;

#[derive(Parser)]
#[command(name = "duet")]
#[command(about = "A two-person chat client for the terminal")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,

    /// Also write logs to stderr (ignored by the TUI)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the interactive chat
    Tui,
    /// Sign in and remember the session
    Login {
        /// Username (prompted when omitted)
        #[arg(short, long)]
        username: Option<String>,
        /// Password (prompted when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show configuration and the stored session
    Status,
    /// Print the conversation with your recipient
    History,
    /// Send a text message
    Send {
        /// Message text
        text: String,
    },
    /// Send a like
    Like,
    /// Send an image file
    Attach {
        /// Path to the image
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loader = match &cli.config_dir {
        Some(dir) => ConfigLoader::with_dir(dir),
        None => ConfigLoader::new(),
    };
    let config = loader
        .load()
        .with_context(|| format!("failed to load {}", loader.config_path().display()))?;

    let interactive = matches!(cli.command, Commands::Tui);
    let _guard = init_logging(&config.logging, cli.verbose && !interactive);

    match cli.command {
        Commands::Tui => tui::run_tui(&config).await,
        Commands::Login { username, password } => run_login(&config, username, password).await,
        Commands::Logout => run_logout(&config),
        Commands::Status => run_status(&loader, &config),
        Commands::History => run_history(&config).await,
        Commands::Send { text } => run_send(&config, Action::InputChanged(text)).await,
        Commands::Like => run_send(&config, Action::Like).await,
        Commands::Attach { path } => run_send(&config, Action::AttachFile(path)).await,
    }
}

fn session_store(config: &Config) -> SessionStore<FileStore> {
    SessionStore::new(FileStore::new(expand_tilde(&config.storage.dir)))
}

/// Controller for one-shot commands, resolved from the stored session
async fn resume(config: &Config, api: &ChatClient) -> ViewController<FileStore> {
    let settings = ControllerSettings {
        startup_delay: Duration::ZERO,
        ..ControllerSettings::from(&config.ui)
    };
    let mut controller = ViewController::new(session_store(config), settings);
    let commands = controller.start();
    run_until_idle(&mut controller, api, commands).await;
    controller
}

fn require_session(controller: &ViewController<FileStore>) -> Result<Session> {
    controller
        .state()
        .session()
        .cloned()
        .context("Not logged in. Run `duet login` first.")
}

/// Turn alerts raised by the last operation into an error
fn check_notices(controller: &mut ViewController<FileStore>) -> Result<()> {
    let notices = controller.take_notices();
    if notices.is_empty() {
        return Ok(());
    }
    let messages: Vec<String> = notices.into_iter().map(|n| n.message).collect();
    anyhow::bail!("{}", messages.join("; "))
}

async fn run_login(
    config: &Config,
    username: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let api = ChatClient::from_config(&config.server);
    let mut controller = resume(config, &api).await;

    if let Some(session) = controller.state().session() {
        println!(
            "Already logged in as {}. Run `duet logout` first.",
            style(&session.user.display_name).bold()
        );
        return Ok(());
    }

    let username = match username {
        Some(username) => username,
        None => Input::<String>::new()
            .with_prompt("Username")
            .interact_text()?,
    };
    let password = match password {
        Some(password) => password,
        None => Password::new().with_prompt("Password").interact()?,
    };

    let commands = controller.handle(Action::SubmitLogin { username, password }.into());
    run_until_idle(&mut controller, &api, commands).await;
    check_notices(&mut controller)?;

    let session = require_session(&controller)?;
    println!(
        "{} Logged in as {}",
        style("✓").green(),
        style(&session.user.display_name).bold()
    );
    println!(
        "  Chatting with {} {}",
        style(&session.recipient.display_name).cyan(),
        style(&session.recipient.description).dim()
    );
    Ok(())
}

fn run_logout(config: &Config) -> Result<()> {
    let store = session_store(config);
    let who = store.restore().map(|s| s.user.display_name);
    store.clear()?;
    match who {
        Some(name) => println!("{} Logged out {}", style("✓").green(), name),
        None => println!("No stored session."),
    }
    Ok(())
}

fn run_status(loader: &ConfigLoader, config: &Config) -> Result<()> {
    println!("{}", style("duet status").bold().cyan());
    println!("Version: {}\n", env!("CARGO_PKG_VERSION"));

    println!("{}", style("Configuration:").bold());
    println!("  Config file: {}", loader.config_path().display());
    println!("  Server: {}", config.server.base_url);
    println!("  Storage: {}", expand_tilde(&config.storage.dir).display());
    println!("  Logs: {}", expand_tilde(&config.logging.dir).display());
    println!();

    println!("{}", style("Session:").bold());
    match session_store(config).restore() {
        Some(session) => {
            println!(
                "  User: {} ({})",
                session.user.display_name, session.user.id
            );
            println!(
                "  Recipient: {} ({})",
                session.recipient.display_name, session.recipient.id
            );
        }
        None => println!("  {}", style("not logged in").dim()),
    }
    Ok(())
}

async fn run_history(config: &Config) -> Result<()> {
    let api = ChatClient::from_config(&config.server);
    let controller = resume(config, &api).await;
    let session = require_session(&controller)?;

    let state = controller.state();
    if let HistoryState::Failed(reason) = &state.history {
        anyhow::bail!("{}", reason);
    }

    println!(
        "{} {}",
        style(&session.recipient.display_name).bold().cyan(),
        style(&session.recipient.description).dim()
    );
    if state.show_placeholder() {
        println!("{}", style("No messages yet. Say hello!").dim());
        return Ok(());
    }

    for rendered in render_conversation(&state.messages, &session.user.id) {
        let who = match rendered.alignment {
            Alignment::Right => style("you").green(),
            Alignment::Left => style(session.recipient.display_name.as_str()).cyan(),
        };
        let body = match rendered.body {
            Body::Text(text) => truncate(text, MAX_PRINTED_TEXT),
            Body::Image { data_uri } => format!("[image: {}]", describe_image(data_uri)),
            Body::Like(marker) => style(marker).red().to_string(),
        };
        let time = rendered.time.unwrap_or_else(|| "--:--".to_string());
        println!("{} {}: {}", style(time).dim(), who, body);
    }
    Ok(())
}

/// Run a single send-style action for the stored session
async fn run_send(config: &Config, action: Action) -> Result<()> {
    let api = ChatClient::from_config(&config.server);
    let mut controller = resume(config, &api).await;
    require_session(&controller)?;
    let before = controller.state().messages.len();

    let mut commands = controller.handle(action.clone().into());
    if matches!(action, Action::InputChanged(_)) {
        commands.extend(controller.handle(Action::Send.into()));
    }
    if commands.is_empty() {
        anyhow::bail!("Nothing to send.");
    }
    run_until_idle(&mut controller, &api, commands).await;
    check_notices(&mut controller)?;

    if controller.state().messages.len() > before {
        println!("{} Sent", style("✓").green());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_send() {
        let cli = Cli::try_parse_from(["duet", "send", "hello there"]).unwrap();
        assert!(matches!(cli.command, Commands::Send { text } if text == "hello there"));
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["duet", "history", "--config-dir", "/tmp/duet", "-v"])
            .unwrap();
        assert_eq!(cli.config_dir, Some(PathBuf::from("/tmp/duet")));
        assert!(cli.verbose);
    }

    #[test]
    fn test_parse_login_flags() {
        let cli = Cli::try_parse_from(["duet", "login", "-u", "ali", "-p", "aaaaaa"]).unwrap();
        match cli.command {
            Commands::Login { username, password } => {
                assert_eq!(username.as_deref(), Some("ali"));
                assert_eq!(password.as_deref(), Some("aaaaaa"));
            }
            _ => panic!("expected login"),
        }
    }

    #[test]
    fn test_send_requires_text() {
        assert!(Cli::try_parse_from(["duet", "send"]).is_err());
    }
}
