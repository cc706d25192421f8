//! Shared types, error model, and configuration for chatmark.
//!
//! This crate is the foundation depended on by all other chatmark crates.
//! It provides:
//! - [`ChatmarkError`]: the unified error type
//! - Domain types ([`ProcessedMarkdown`], [`Citation`], [`Enrichment`], [`ProcessingWarning`])
//! - Configuration ([`AppConfig`], [`ProcessorConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CacheConfig, ProcessingConfig, ProcessorConfig, RenderConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{BoxedCause, ChatmarkError, Result};
pub use types::{
    Citation, CitationKind, Enrichment, EnrichmentBody, EnrichmentKind, EnrichmentPriority,
    ProcessedMarkdown, ProcessingWarning, WarningKind,
};
