//! Shared CLI helpers — path expansion, reply printing, version banner.

use std::path::PathBuf;

use colored::Colorize;

use pibot_agent::Reply;

/// Expand `~` at the start of a path to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_next::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs_next::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

/// Print an orchestrator reply, with any observed tool calls above it.
pub fn print_reply(reply: &Reply) {
    println!();
    for call in &reply.executed_tools {
        println!("{}", format!("  ⚙ {} {}", call.name, call.arguments).dimmed());
    }
    println!("{}", "🤖 PiBot".cyan().bold());
    if reply.text.is_empty() {
        println!("{}", "(no response)".dimmed());
    } else {
        println!("{}", reply.text);
    }
    println!();
}

/// Print the banner shown at REPL and server start.
pub fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!("{}  v{}", "🤖 PiBot".cyan().bold(), version.dimmed());
}

/// Print a "thinking" placeholder while the model works.
pub fn print_thinking() {
    eprint!("{}", "⠿ thinking...".dimmed());
}

/// Clear the "thinking" placeholder.
pub fn clear_thinking() {
    eprint!("\r{}\r", " ".repeat(40));
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
