//! Time tools — current time and date in an IANA time zone.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde_json::{json, Value};
use tracing::debug;

use super::base::{optional_string, Tool};

fn timezone_schema(default_tz: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "timezone": {
                "type": "string",
                "description": format!("IANA time zone, e.g. 'Europe/Berlin'. Defaults to '{default_tz}'.")
            }
        },
        "required": []
    })
}

/// Resolve the `timezone` param (or the default) and return "now" in it.
fn now_in(params: &HashMap<String, Value>, default_tz: &str) -> anyhow::Result<(String, DateTime<Tz>)> {
    let name = optional_string(params, "timezone")
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default_tz.to_string());
    let tz: Tz = name
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Unknown time zone: {name}"))?;
    Ok((name, Utc::now().with_timezone(&tz)))
}

// ─────────────────────────────────────────────
// GetCurrentTimeTool
// ─────────────────────────────────────────────

/// Returns the wall-clock time (`HH:MM:SS`) in a time zone.
pub struct GetCurrentTimeTool {
    default_tz: String,
}

impl GetCurrentTimeTool {
    pub fn new(default_tz: impl Into<String>) -> Self {
        Self {
            default_tz: default_tz.into(),
        }
    }
}

#[async_trait]
impl Tool for GetCurrentTimeTool {
    fn name(&self) -> &str {
        "get_current_time"
    }

    fn description(&self) -> &str {
        "Returns the current time for the given time zone."
    }

    fn parameters(&self) -> Value {
        timezone_schema(&self.default_tz)
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
        let (tz, now) = now_in(&params, &self.default_tz)?;
        debug!(timezone = %tz, "get_current_time");
        Ok(format!("The current time in {tz} is {}.", now.format("%H:%M:%S")))
    }
}

// ─────────────────────────────────────────────
// GetCurrentDateTool
// ─────────────────────────────────────────────

/// Returns the date with weekday (`YYYY-MM-DD (Weekday)`) in a time zone.
pub struct GetCurrentDateTool {
    default_tz: String,
}

impl GetCurrentDateTool {
    pub fn new(default_tz: impl Into<String>) -> Self {
        Self {
            default_tz: default_tz.into(),
        }
    }
}

#[async_trait]
impl Tool for GetCurrentDateTool {
    fn name(&self) -> &str {
        "get_current_date"
    }

    fn description(&self) -> &str {
        "Returns the current date (year, month, day, weekday) for the given time zone."
    }

    fn parameters(&self) -> Value {
        timezone_schema(&self.default_tz)
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
        let (tz, now) = now_in(&params, &self.default_tz)?;
        debug!(timezone = %tz, "get_current_date");
        Ok(format!("The current date in {tz} is {}.", now.format("%Y-%m-%d (%A)")))
    }
}
