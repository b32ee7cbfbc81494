//! Model gateway layer for PiBot.
//!
//! # Architecture
//!
//! - [`traits::ModelGateway`] — trait every LLM backend implements
//! - [`error::GatewayError`] — transport/auth/rate-limit failure of one call
//! - [`http_provider::HttpGateway`] — OpenAI-compatible HTTP client

pub mod error;
pub mod http_provider;
pub mod traits;

pub use error::GatewayError;
pub use http_provider::HttpGateway;
pub use traits::{LlmRequestConfig, ModelGateway};
