// Library interface for newsdesk modules
// This allows tests and the binary to import modules

pub mod app;
pub mod error;
pub mod generator;
pub mod jobs;
pub mod llm;
pub mod models;
pub mod news;
pub mod output;
pub mod pipeline;
pub mod relevance;
pub mod server;

pub use error::{Error, Result};
