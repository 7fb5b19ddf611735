//! HTTP relay between the browser tutor client and the OpenAI chat completions API.

pub mod completions;
pub mod config;
pub mod error;
pub mod routes;
