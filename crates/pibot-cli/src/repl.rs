//! Interactive REPL over the orchestrator.
//!
//! Uses `rustyline` for readline-style editing with persistent history.
//! Lines starting with `/` are admin commands, everything else is a prompt.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use rustyline::config::Configurer;
use rustyline::history::DefaultHistory;
use rustyline::{DefaultEditor, Editor};
use tracing::debug;

use pibot_agent::{build_registry, EmotionState, Orchestrator};
use pibot_core::config::load_config;
use pibot_core::utils::{get_history_path, truncate_string};

use crate::helpers;

/// Exit commands (case-insensitive match).
const EXIT_COMMANDS: &[&str] = &["exit", "quit", "/exit", "/quit", ":q"];

const HELP: &str = "/clear  reset the conversation\n\
                    /system <text>  replace the system instruction\n\
                    /history  show the conversation\n\
                    /quota  show request usage\n\
                    /reset  reset the request quota\n\
                    /reload  rebuild tools from the config file\n\
                    exit  leave";

/// A parsed REPL line.
#[derive(Debug, PartialEq)]
enum Input<'a> {
    Exit,
    Help,
    Clear,
    System(&'a str),
    History,
    Quota,
    Reset,
    Reload,
    Unknown(&'a str),
    Prompt(&'a str),
}

fn parse_input(line: &str) -> Input<'_> {
    let lower = line.to_lowercase();
    if EXIT_COMMANDS.contains(&lower.as_str()) {
        return Input::Exit;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Input::Prompt(line);
    };
    let (name, arg) = command.split_once(' ').unwrap_or((command, ""));
    match name {
        "help" => Input::Help,
        "clear" => Input::Clear,
        "system" if !arg.trim().is_empty() => Input::System(arg.trim()),
        "history" => Input::History,
        "quota" => Input::Quota,
        "reset" => Input::Reset,
        "reload" => Input::Reload,
        _ => Input::Unknown(line),
    }
}

/// Run the interactive REPL loop.
///
/// `config_path` is re-read by `/reload`; `emotions` is shared with the
/// emotion tool of every rebuilt registry.
pub async fn run(
    orchestrator: Arc<Orchestrator>,
    emotions: Arc<EmotionState>,
    config_path: PathBuf,
) -> Result<()> {
    helpers::print_banner();
    println!("{}", "Type a message, /help for commands, or \"exit\" to quit.".dimmed());
    println!();

    let mut editor = create_editor()?;

    loop {
        let line = match editor.readline("You: ") {
            Ok(line) => line,
            Err(rustyline::error::ReadlineError::Interrupted)
            | Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(&line);

        match parse_input(trimmed) {
            Input::Exit => {
                println!("\nGoodbye! 👋");
                break;
            }
            Input::Help => println!("{}\n", HELP.dimmed()),
            Input::Clear => {
                orchestrator.clear_history().await;
                println!("{}\n", "Conversation cleared.".dimmed());
            }
            Input::System(text) => {
                orchestrator.set_system_instruction(text).await;
                println!("{}\n", "System instruction replaced.".dimmed());
            }
            Input::History => {
                for turn in orchestrator.history().await {
                    let text = turn.text().unwrap_or("(tool calls)");
                    println!("  {:<10} {}", turn.role().to_string().bold(), truncate_string(text, 100));
                }
                println!();
            }
            Input::Quota => {
                let quota = orchestrator.quota().await;
                println!(
                    "  {} of {} requests used\n",
                    quota.request_count, quota.max_requests
                );
            }
            Input::Reset => {
                orchestrator.reset_quota().await;
                println!("{}\n", "Request quota reset.".dimmed());
            }
            Input::Reload => match reload_tools(&orchestrator, &emotions, &config_path).await {
                Ok(names) => println!("{}\n", format!("Tools reloaded: {}", names.join(", ")).dimmed()),
                Err(e) => eprintln!("\n❌ Error: {e:#}\n"),
            },
            Input::Unknown(cmd) => println!("{}\n", format!("Unknown command: {cmd}").yellow()),
            Input::Prompt(prompt) => {
                debug!(input = %truncate_string(prompt, 80), "processing input");
                helpers::print_thinking();
                let result = orchestrator.respond(prompt).await;
                helpers::clear_thinking();
                match result {
                    Ok(reply) => helpers::print_reply(&reply),
                    Err(e) => eprintln!("\n❌ Error: {e}\n"),
                }
            }
        }
    }

    save_history(&mut editor);
    Ok(())
}

/// Rebuild the tool registry from the config file and swap it in.
///
/// Returns the names of the tools now registered.
async fn reload_tools(
    orchestrator: &Orchestrator,
    emotions: &Arc<EmotionState>,
    config_path: &Path,
) -> Result<Vec<String>> {
    let config = load_config(Some(config_path));
    let registry = build_registry(
        &config.tools,
        config.agent.strict_tool_registration,
        emotions.clone(),
    )
    .context("invalid tool configuration")?;
    orchestrator.reload_tools(registry).await;
    Ok(orchestrator.tool_names().await)
}

/// Create a rustyline editor with history.
fn create_editor() -> Result<Editor<(), DefaultHistory>> {
    let mut editor = DefaultEditor::new()?;
    editor.set_max_history_size(1000)?;

    let history_path = get_history_path();
    if history_path.exists() {
        let _ = editor.load_history(&history_path);
        debug!("loaded REPL history from {}", history_path.display());
    }

    Ok(editor)
}

/// Save history to disk.
fn save_history(editor: &mut Editor<(), DefaultHistory>) {
    let path = get_history_path();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Err(e) = editor.save_history(&path) {
        debug!("failed to save history: {e}");
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
