//! Markdown-to-HTML pipeline for generated chat answers.
//!
//! [`MarkdownProcessor::process`] runs, in order:
//! 1. cache lookup by raw input
//! 2. truncation to the configured character limit
//! 3. pre-normalization ([`normalize`])
//! 4. enrichment extraction into placeholder tokens
//! 5. parse, bracket-citation cleanup, citation extraction, render
//! 6. placeholder reinsertion and DOM post-processing ([`post_process`])
//!
//! The cache is the only state shared between calls; everything else is
//! allocated per call.

mod cache;
mod citation;
mod cleanup;
mod engine;
mod enrichment;
pub mod fence;
mod html;
pub mod inline_list;
pub mod marker;
pub mod normalize;

use std::sync::Arc;
use std::time::Instant;

use comrak::Arena;
use tracing::{debug, error, instrument, warn};

use chatmark_shared::{ProcessedMarkdown, ProcessingWarning, ProcessorConfig, Result, WarningKind};

pub use cache::CacheStats;
pub use citation::extract_citations;
pub use html::post_process;
pub use inline_list::{Conversion, ListBlock, ListTag, try_convert};
pub use normalize::{Normalized, normalize, normalize_with_report};

use crate::cache::ProcessCache;
use crate::cleanup::strip_citation_brackets;
use crate::engine::MarkdownEngine;

// ---------------------------------------------------------------------------
// Observer
// ---------------------------------------------------------------------------

/// Hooks into pipeline events. Every method defaults to a no-op.
pub trait ProcessObserver: Send + Sync {
    /// Called each time the outer document is handed to the parser.
    fn document_parsed(&self) {}
}

/// Observer that ignores every event.
pub struct SilentObserver;

impl ProcessObserver for SilentObserver {}

// ---------------------------------------------------------------------------
// Processor
// ---------------------------------------------------------------------------

/// The pipeline facade. Safe to share across threads.
pub struct MarkdownProcessor {
    config: ProcessorConfig,
    engine: MarkdownEngine,
    cache: ProcessCache,
    observer: Arc<dyn ProcessObserver>,
}

impl MarkdownProcessor {
    /// Build a processor after validating `config`.
    pub fn new(config: ProcessorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            engine: MarkdownEngine::new(config.hard_breaks),
            cache: ProcessCache::new(config.cache_capacity, config.cache_ttl),
            observer: Arc::new(SilentObserver),
            config,
        })
    }

    /// Replace the observer.
    pub fn with_observer(mut self, observer: Arc<dyn ProcessObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Process one markdown answer.
    ///
    /// Identical inputs are served from the cache until the entry expires.
    /// A failure inside the parser or renderer is returned as a single
    /// [`ChatmarkError::Processing`](chatmark_shared::ChatmarkError::Processing).
    #[instrument(skip_all, fields(input_len = markdown.len()))]
    pub fn process(&self, markdown: &str) -> Result<Arc<ProcessedMarkdown>> {
        if markdown.is_empty() {
            return Ok(Arc::new(ProcessedMarkdown::default()));
        }

        if let Some(cached) = self.cache.get(markdown) {
            debug!("cache hit");
            return Ok(cached);
        }
        debug!("cache miss");

        let started = Instant::now();
        let processed = self
            .run(markdown, started)
            .inspect_err(|e| error!(error = %e, "markdown processing failed"))?;

        let processed = Arc::new(processed);
        self.cache.insert(markdown.to_string(), Arc::clone(&processed));
        Ok(processed)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        debug!("cache cleared");
    }

    fn run(&self, markdown: &str, started: Instant) -> Result<ProcessedMarkdown> {
        let input = truncate_chars(markdown, self.config.max_input_chars);
        if input.len() < markdown.len() {
            warn!(
                limit = self.config.max_input_chars,
                "input exceeds character limit, truncating"
            );
        }

        let mut warnings = Vec::new();
        let normalized = normalize_with_report(input);
        if normalized.closed_unterminated_fence {
            warnings.push(ProcessingWarning::new(
                "Unterminated code block closed at end of input",
                WarningKind::UnclosedCodeBlock,
                normalized.text.chars().count(),
            )?);
        }

        let extraction = enrichment::extract(&normalized.text, &self.engine)?;
        warnings.extend(extraction.warnings);

        let arena = Arena::new();
        let root = self.engine.parse(&arena, &extraction.text)?;
        self.observer.document_parsed();

        strip_citation_brackets(root);
        let citations = extract_citations(root);
        let rendered = self.engine.render(root)?;

        let html = post_process(&extraction.placeholders.reinsert(&rendered));
        let processing_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        debug!(
            citations = citations.len(),
            enrichments = extraction.enrichments.len(),
            warnings = warnings.len(),
            processing_time_ms,
            "markdown processed"
        );

        Ok(ProcessedMarkdown {
            html,
            citations,
            enrichments: extraction.enrichments,
            warnings,
            processing_time_ms,
        })
    }
}

/// The first `max_chars` characters of `text`.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => &text[..cut],
        None => text,
    }
}
