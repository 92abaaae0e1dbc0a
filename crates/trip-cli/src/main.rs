use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use trip_core::{Message, TurnEvent};
use trip_llm::{LlmProvider, OpenAiProvider};
use trip_loop::{run_turn, Capabilities, TurnConfig};
use trip_tools::{TicketmasterClient, WeatherApiClient};

const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Parser)]
#[command(name = "trip")]
#[command(about = "Activity suggestion assistant")]
#[command(version)]
struct Cli {
    /// Model override passed to the chat completions API
    #[arg(long)]
    model: Option<String>,

    /// Override the chat completions base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Enable debug mode
    #[arg(long, short, default_value = "false")]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start interactive chat
    Chat,
    /// Send a single message and print the answer
    Send {
        /// Message content
        message: String,
    },
}

struct App {
    llm: Arc<dyn LlmProvider>,
    capabilities: Arc<Capabilities>,
    config: TurnConfig,
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    if cli.debug {
        eprintln!("{}", "[DEBUG] Debug mode enabled".dimmed());
    }

    // Credentials are read once at startup; a missing key is fatal here
    // rather than mid-conversation.
    let api_key = std::env::var(OPENAI_API_KEY_ENV)
        .with_context(|| format!("{OPENAI_API_KEY_ENV} environment variable is required"))?;
    let weather = WeatherApiClient::from_env().context("weather provider setup failed")?;
    let events = TicketmasterClient::from_env().context("events provider setup failed")?;

    let mut provider = OpenAiProvider::new(api_key);
    if let Some(base_url) = cli.base_url.clone() {
        provider = provider.with_base_url(base_url);
    }

    let app = App {
        llm: Arc::new(provider),
        capabilities: Arc::new(Capabilities {
            weather: Arc::new(weather),
            events: Arc::new(events),
        }),
        config: TurnConfig {
            model: cli.model.clone(),
            ..TurnConfig::default()
        },
        debug: cli.debug,
    };

    match cli.command {
        Commands::Chat => run_interactive_chat(&app).await,
        Commands::Send { message } => {
            let mut history = Vec::new();
            run_one_turn(&app, &mut history, message).await
        }
    }
}

async fn run_interactive_chat(app: &App) -> anyhow::Result<()> {
    println!("{}", "🌍 Activity assistant ready. Type 'exit' to quit.".cyan());

    let mut history: Vec<Message> = Vec::new();
    let stdin = io::stdin();

    loop {
        print!("{}", "you> ".green());
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }

        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if message.eq_ignore_ascii_case("exit") || message.eq_ignore_ascii_case("quit") {
            break;
        }

        if let Err(error) = run_one_turn(app, &mut history, message.to_string()).await {
            println!("{}", format!("❌ {error:#}").red());
        }
    }

    println!("{}", "👋 Bye!".cyan());
    Ok(())
}

/// Run a turn and render its events: the answer prints incrementally by
/// diffing each full-text snapshot against what is already on screen.
async fn run_one_turn(
    app: &App,
    history: &mut Vec<Message>,
    message: String,
) -> anyhow::Result<()> {
    let (event_tx, mut event_rx) = mpsc::channel(64);
    let cancel_token = CancellationToken::new();

    let debug = app.debug;
    let printer = tokio::spawn(async move {
        let mut printed = 0usize;
        while let Some(event) = event_rx.recv().await {
            match event {
                TurnEvent::Snapshot { content } => {
                    if content.len() > printed {
                        print!("{}", &content[printed..]);
                        let _ = io::stdout().flush();
                        printed = content.len();
                    }
                }
                TurnEvent::ToolStart { tool_name, .. } => {
                    // The answer restarts from an empty buffer after the
                    // tool exchange.
                    if printed > 0 {
                        println!();
                    }
                    printed = 0;
                    println!("{}", format!("🔧 Looking up {tool_name}...").dimmed());
                }
                TurnEvent::ToolComplete { tool_call_id, content } => {
                    if debug {
                        eprintln!(
                            "{}",
                            format!("[DEBUG] {tool_call_id} returned: {content}").dimmed()
                        );
                    }
                }
                TurnEvent::Complete => {
                    println!();
                }
                TurnEvent::Error { message } => {
                    println!("{}", format!("\n❌ {message}").red());
                }
            }
        }
    });

    let result = run_turn(
        history,
        message,
        event_tx,
        app.llm.clone(),
        app.capabilities.clone(),
        cancel_token,
        &app.config,
    )
    .await;

    let _ = printer.await;
    result.context("turn failed")
}
