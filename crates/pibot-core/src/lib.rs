//! PiBot core — shared types, configuration, and utilities.
//!
//! - **types**: chat turns, tool calls, and tool definitions in OpenAI format
//! - **config**: JSON config schema, loader, and env overrides
//! - **utils**: data-dir paths and string helpers

pub mod config;
pub mod types;
pub mod utils;
