//! `sevasaathi chat` — Interactive or single-question mode.

use sevasaathi_agent::{AskResult, ChatOrchestrator};
use sevasaathi_config::{AppConfig, ConfigError};
use sevasaathi_core::message::ConversationHistory;
use sevasaathi_providers::ModelGateway;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

/// One line of interactive input, classified.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Empty,
    Exit,
    Clear,
    /// `None` clears the filter.
    Category(Option<String>),
    Unknown(String),
    Question(String),
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }

    match line.to_lowercase().as_str() {
        "exit" | "quit" | "/exit" | "/quit" => return Input::Exit,
        "/clear" => return Input::Clear,
        _ => {}
    }

    if let Some(rest) = line.strip_prefix("/category") {
        let arg = rest.trim();
        if arg.is_empty() || arg.eq_ignore_ascii_case("all") {
            return Input::Category(None);
        }
        return Input::Category(Some(arg.to_string()));
    }

    if line.starts_with('/') {
        return Input::Unknown(line.to_string());
    }

    Input::Question(line.to_string())
}

/// Answer text plus the cited schemes (or the failure kind).
fn render_result(result: &AskResult) -> String {
    let mut out = String::new();
    for line in result.answer.lines() {
        out.push_str("  SevaSaathi > ");
        out.push_str(line);
        out.push('\n');
    }

    match &result.failure {
        Some(failure) => {
            out.push_str(&format!("  [{failure}]\n"));
        }
        None if !result.cited_schemes.is_empty() => {
            let names: Vec<&str> = result.cited_schemes.iter().map(String::as_str).collect();
            out.push_str(&format!("  Schemes: {}\n", names.join(", ")));
        }
        None => {}
    }
    out
}

/// Ask one question; Ctrl+C abandons the model call.
async fn ask_interruptible(
    orchestrator: &ChatOrchestrator,
    text: &str,
    session: &mut ConversationHistory,
    category: Option<&str>,
) -> AskResult {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });

    let result = orchestrator
        .ask_cancellable(text, session, category, &cancel)
        .await;
    watcher.abort();
    result
}

fn build_orchestrator(config: &AppConfig) -> Result<ChatOrchestrator, Box<dyn std::error::Error>> {
    let provider = match sevasaathi_providers::build_from_config(config) {
        Ok(provider) => provider,
        Err(ConfigError::MissingSetting(setting)) => {
            eprintln!();
            eprintln!("  ERROR: No API key configured!");
            eprintln!();
            eprintln!("  Set one of these environment variables:");
            eprintln!("    GEMINI_API_KEY      (Google AI Studio key)");
            eprintln!("    SEVASAATHI_API_KEY  (overrides everything)");
            eprintln!();
            eprintln!("  Or add it to your config file:");
            eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
            eprintln!();
            return Err(format!("Missing required setting: {setting}").into());
        }
        Err(e) => return Err(e.into()),
    };

    let catalog = Arc::new(super::load_catalog(config)?);
    let gateway = ModelGateway::from_config(provider, config);
    Ok(ChatOrchestrator::from_config(catalog, gateway, config))
}

pub async fn run(
    config_path: Option<&Path>,
    message: Option<String>,
    category: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let orchestrator = build_orchestrator(&config)?;

    if let Some(msg) = message {
        let mut session = ConversationHistory::new();
        eprint!("  Thinking...");
        let result =
            ask_interruptible(&orchestrator, &msg, &mut session, category.as_deref()).await;
        eprint!("\r              \r");
        print!("{}", render_result(&result));
        return Ok(());
    }

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║       SevaSaathi — Government Scheme Help      ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Provider:  {}", orchestrator.gateway().provider_name());
    println!("  Model:     {}", orchestrator.gateway().model());
    println!(
        "  Catalog:   {} schemes in {} categories",
        orchestrator.catalog().len(),
        orchestrator.catalog().categories().len()
    );
    println!();
    println!("  Ask about schemes and press Enter.");
    println!("  /category <name>|all filters, /clear starts over, 'exit' quits.");
    println!();

    let mut session = ConversationHistory::new();
    let mut category = category;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        match &category {
            Some(c) => print!("  You [{c}] > "),
            None => print!("  You > "),
        }
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        match parse_input(&line) {
            Input::Empty => continue,
            Input::Exit => break,
            Input::Clear => {
                session = ConversationHistory::new();
                println!("  Started a new conversation.\n");
            }
            Input::Category(None) => {
                category = None;
                println!("  Showing schemes from all categories.\n");
            }
            Input::Category(Some(name)) => {
                let known = orchestrator.catalog().categories();
                match known.iter().find(|c| c.eq_ignore_ascii_case(&name)) {
                    Some(c) => {
                        println!("  Filtering to {c}.\n");
                        category = Some(c.clone());
                    }
                    None => println!("  Unknown category. Known: {}\n", known.join(", ")),
                }
            }
            Input::Unknown(cmd) => {
                println!("  Unknown command {cmd}. Try /category, /clear or exit.\n");
            }
            Input::Question(text) => {
                eprint!("  ...");
                let result =
                    ask_interruptible(&orchestrator, &text, &mut session, category.as_deref())
                        .await;
                eprint!("\r     \r");
                println!();
                print!("{}", render_result(&result));
                println!();
            }
        }
    }

    println!();
    println!("  Goodbye! 🙏");
    println!();
    Ok(())
}
