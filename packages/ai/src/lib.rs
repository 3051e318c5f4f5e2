#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! LLM collaborators for the building optimizer.
//!
//! Supports Google Gemini, Anthropic Claude and `OpenAI` through a single
//! [`providers::LlmProvider`] trait. Two tasks are built on top of it:
//!
//! * [`suggestion`] asks the model where to place a building given the
//!   city's district densities.
//! * [`school_info`] asks the model to enrich a school with details from an
//!   optional education registry file.
//!
//! Model replies are free text. [`extract::extract_json_block`] recovers the
//! JSON payload from fenced or bare replies, and every task substitutes a
//! fixed fallback payload when the provider or the parse fails, so callers
//! always get a well-formed answer.

pub mod extract;
pub mod providers;
pub mod school_info;
pub mod suggestion;

use thiserror::Error;

/// Errors that can occur during AI operations.
#[derive(Debug, Error)]
pub enum AiError {
    /// HTTP request to LLM provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Provider-specific error.
    #[error("Provider error: {message}")]
    Provider {
        /// Description of what went wrong.
        message: String,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },
}
