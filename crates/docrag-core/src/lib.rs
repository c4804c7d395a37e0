//! Core of the documentation assistant: errors, configuration, domain types,
//! and the text pipeline from source files to corpus records.
//!
//! Configuration merges `Settings::default()` + `docrag.toml` +
//! `docrag.<env>.toml` + `DOCRAG_*` env vars via Figment.

pub mod chunker;
pub mod config;
pub mod corpus;
pub mod error;
pub mod loader;
pub mod tokenizer;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
