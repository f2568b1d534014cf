//! Shared types, error model, and configuration for snipbook.
//!
//! This crate is the foundation depended on by all other snipbook crates.
//! It provides:
//! - [`SnipbookError`], the unified error type
//! - Domain types ([`SnippetRecord`], [`Chapter`], [`Book`], [`Diagnostic`])
//! - Configuration ([`AppConfig`], [`BuildConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BuildConfig, DEFAULT_SEPARATOR, DefaultsConfig, OutputFormat, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{Result, SnipbookError};
pub use types::{
    Book, Chapter, ChapterKey, CodeFragment, CodeKind, DedupPolicy, Diagnostic, Origin,
    SnippetRecord,
};
