//! `pibot status` — show configuration, gateway, and tool status.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use pibot_agent::tools::TOOL_GROUPS;
use pibot_core::config::load_config;
use pibot_core::utils::truncate_string;

fn key_status(key: &str) -> String {
    if key.is_empty() {
        format!("{}", "· not configured".dimmed())
    } else {
        format!("{} (key set)", "✓".green())
    }
}

/// Run the status command.
pub fn run(config_path: &Path) -> Result<()> {
    let config = load_config(Some(config_path));

    println!();
    println!("{}", "🤖 PiBot Status".cyan().bold());
    println!();

    println!(
        "  {:<18} {} {}",
        "Config:".bold(),
        config_path.display(),
        if config_path.exists() {
            "✓".green().to_string()
        } else {
            "(not found, using defaults)".red().to_string()
        }
    );

    // Gateway
    println!("  {:<18} {}", "Model:".bold(), config.provider.model);
    println!("  {:<18} {}", "API base:".bold(), config.provider.api_base);
    println!("  {:<18} {}", "API key:".bold(), key_status(&config.provider.api_key));
    println!(
        "  {:<18} {} | {}",
        "Parameters:".bold(),
        format!("temp: {}", config.provider.temperature).dimmed(),
        format!("max_tokens: {}", config.provider.max_tokens).dimmed(),
    );

    // Agent
    println!();
    println!(
        "  {:<18} {}",
        "System message:".bold(),
        truncate_string(&config.agent.system_message, 60)
    );
    println!(
        "  {:<18} {} turns/prompt | {} requests | {}s gateway timeout",
        "Limits:".bold(),
        config.agent.max_turns,
        config.agent.max_requests,
        config.agent.gateway_timeout_secs
    );

    // Tools
    println!();
    println!("  {}", "Tool groups:".bold());
    for group in TOOL_GROUPS {
        let enabled = config.tools.enabled.iter().any(|g| g == group);
        let mark = if enabled {
            "✓ enabled".green().to_string()
        } else {
            "· disabled".dimmed().to_string()
        };
        println!("    {:<16} {}", group, mark);
    }
    for unknown in config
        .tools
        .enabled
        .iter()
        .filter(|g| !TOOL_GROUPS.contains(&g.as_str()))
    {
        println!("    {:<16} {}", unknown, "✗ unknown group".red());
    }
    println!(
        "  {:<18} {}",
        "Web search:".bold(),
        key_status(&config.tools.web_search.api_key)
    );
    println!("  {:<18} {}", "Emotions:".bold(), config.tools.emotions.join(", "));
    println!("  {:<18} {}", "Timezone:".bold(), config.tools.default_timezone);

    // Server
    println!();
    println!(
        "  {:<18} http://{}:{}",
        "Server:".bold(),
        config.server.host,
        config.server.port
    );
    println!();

    Ok(())
}
