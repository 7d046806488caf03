//! Environment-sourced settings, read once at startup.

use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct Settings {
    /// Base endpoint of the document-analysis service.
    pub docintel_endpoint: String,
    /// Subscription key for the document-analysis service.
    pub docintel_key: String,
    /// API key for the chat-completion service.
    pub openai_api_key: String,
    /// Address the server binds to.
    pub bind_addr: String,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            docintel_endpoint: env::var("AZURE_DOCINTEL_ENDPOINT")
                .context("AZURE_DOCINTEL_ENDPOINT environment variable not set")?,
            docintel_key: env::var("AZURE_DOCINTEL_KEY")
                .context("AZURE_DOCINTEL_KEY environment variable not set")?,
            openai_api_key: env::var("OPENAI_API_KEY")
                .context("OPENAI_API_KEY environment variable not set")?,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
        })
    }
}
