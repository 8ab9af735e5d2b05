use std::sync::Arc;
use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use colored::*;
use tracing::{info, warn};

use aprende_core::credentials::API_KEY_ENV;
use aprende_core::{
    ChatClient, ChatWidget, Config, ConfigCredentials, Content, CredentialStore, GeminiClient,
    LandingPage,
};

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;

#[derive(Parser)]
#[command(name = "aprende", version)]
#[command(about = "AI study assistant for the terminal, powered by Gemini")]
struct Cli {
    /// Gemini model to use (overrides the config file)
    #[arg(short, long, global = true, env = "APRENDE_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the formatted reply
    Ask {
        /// Your question
        prompt: String,
        /// Print the reply as an HTML fragment
        #[arg(long)]
        html: bool,
    },
    /// Manage the stored Gemini API key
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },
}

#[derive(Subcommand)]
enum KeyAction {
    /// Store a key in the config file
    Set { key: String },
    /// Remove the stored key
    Clear,
    /// Show the active key, masked
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging is best effort; the app still runs without a config directory
    let _guard = match logging::init() {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("{} {}", "warning: logging disabled:".yellow(), e);
            None
        }
    };

    let mut config = Config::load()?;
    if let Some(model) = cli.model {
        config.model = Some(model);
    }
    let credentials = Arc::new(ConfigCredentials::new()?);

    match cli.command {
        None => {
            let service = GeminiClient::from_config(&config);
            let model = service.model().to_string();
            let client = ChatClient::new(Arc::new(service), credentials.clone());
            run_tui(LandingPage::new(client), &model, credentials.get().is_some()).await?
        }
        Some(Commands::Ask { prompt, html }) => {
            let service = GeminiClient::from_config(&config);
            let client = ChatClient::new(Arc::new(service), credentials.clone());
            ask(client, &prompt, html).await?
        }
        Some(Commands::Key { action }) => manage_key(&credentials, action)?,
    }

    Ok(())
}

async fn run_tui(page: LandingPage, model: &str, key_configured: bool) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();
    let mut app = App::new(page, model, key_configured, events.sender());

    info!(model, key_configured, "starting TUI");
    let result = run_loop(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn run_loop(terminal: &mut tui::Tui, app: &mut App, events: &mut tui::EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event),
            None => break,
        }
    }
    Ok(())
}

async fn ask(client: ChatClient, prompt: &str, html: bool) -> Result<()> {
    let mut chat = ChatWidget::new(client);

    match chat.ask(prompt).await {
        Ok(()) => {
            if let Some(Content::Reply(reply)) = chat.messages().last().map(|m| &m.content) {
                if html {
                    println!("{}", reply.to_html());
                } else {
                    println!("{}", reply);
                }
            }
            Ok(())
        }
        Err(Some(notification)) => {
            eprintln!("{}", notification.title.red().bold());
            bail!("{}", notification.description)
        }
        Err(None) => bail!("Nothing to ask: the prompt is empty"),
    }
}

fn manage_key(credentials: &ConfigCredentials, action: KeyAction) -> Result<()> {
    match action {
        KeyAction::Set { key } => {
            if key.trim().is_empty() {
                bail!("The API key cannot be empty");
            }
            credentials.store(&key)?;
            println!("{} API key saved to {}", "✓".green(), Config::config_path()?.display());
            if std::env::var(API_KEY_ENV).is_ok() {
                println!("{} {} is set and takes precedence", "note:".yellow(), API_KEY_ENV);
            }
        }
        KeyAction::Clear => {
            credentials.clear()?;
            println!("{} Stored API key removed", "✓".green());
            if std::env::var(API_KEY_ENV).is_ok() {
                warn!("key cleared while {} is set", API_KEY_ENV);
                println!("{} {} is still set in the environment", "note:".yellow(), API_KEY_ENV);
            }
        }
        KeyAction::Show => match (credentials.get(), credentials.source()) {
            (Some(key), Some(source)) => {
                println!("{} {} ({})", "API key:".bold(), mask_key(&key), source.dimmed());
            }
            _ => println!(
                "{} set {} or run `aprende key set <KEY>`",
                "No API key configured:".yellow(),
                API_KEY_ENV
            ),
        },
    }
    Ok(())
}

/// Mask all but the last four characters of a key
fn mask_key(key: &str) -> String {
    let len = key.chars().count();
    if len <= 4 {
        "*".repeat(len)
    } else {
        let masked_len = len - 4;
        let last_four: String = key.chars().skip(masked_len).collect();
        format!("{}...{}", "*".repeat(masked_len.min(20)), last_four)
    }
}
