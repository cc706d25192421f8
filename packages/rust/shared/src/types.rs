//! Core domain types produced by the markdown pipeline.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ChatmarkError, Result};

// ---------------------------------------------------------------------------
// Citations
// ---------------------------------------------------------------------------

/// Classification of a cited link, derived purely from the URL's shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CitationKind {
    Pdf,
    ApiDoc,
    Repo,
    External,
    Local,
    Unknown,
}

impl CitationKind {
    /// Classify a URL by extension, scheme and well-known host fragments.
    pub fn from_url(url: &str) -> Self {
        let lower = url.trim().to_ascii_lowercase();
        if lower.is_empty() {
            return Self::Unknown;
        }

        if lower.ends_with(".pdf") {
            return Self::Pdf;
        }

        if lower.starts_with("http://") || lower.starts_with("https://") {
            const API_DOC_HINTS: [&str; 4] = ["docs.oracle.com", "javadoc", "/api/", "/docs/api/"];
            const REPO_HOSTS: [&str; 3] = ["github.com", "gitlab.com", "bitbucket.org"];

            if API_DOC_HINTS.iter().any(|hint| lower.contains(hint)) {
                return Self::ApiDoc;
            }
            if REPO_HOSTS.iter().any(|host| lower.contains(host)) {
                return Self::Repo;
            }
            return Self::External;
        }

        if lower.starts_with('/') {
            return Self::Local;
        }

        Self::Unknown
    }

    /// Stable identifier used by the citation UI.
    pub fn identifier(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::ApiDoc => "api-doc",
            Self::Repo => "repo",
            Self::External => "external",
            Self::Local => "local",
            Self::Unknown => "unknown",
        }
    }
}

/// A source link referenced in an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub url: String,
    pub title: String,
    /// Optional excerpt; empty when the source offered none.
    pub snippet: String,
    pub kind: CitationKind,
    /// Running character offset at which the link was visited.
    pub position: usize,
}

impl Citation {
    /// Build a citation, classifying the URL. Rejects blank URLs and titles.
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        snippet: impl Into<String>,
        position: usize,
    ) -> Result<Self> {
        let url = url.into();
        let title = title.into();
        if url.trim().is_empty() {
            return Err(ChatmarkError::validation("citation URL must not be blank"));
        }
        if title.trim().is_empty() {
            return Err(ChatmarkError::validation("citation title must not be blank"));
        }
        let kind = CitationKind::from_url(&url);
        Ok(Self {
            url,
            title,
            snippet: snippet.into(),
            kind,
            position,
        })
    }

    /// Whether a non-blank snippet is attached.
    pub fn has_snippet(&self) -> bool {
        !self.snippet.trim().is_empty()
    }

    /// Host of the URL for display, or `None` for relative/unparseable URLs.
    pub fn domain(&self) -> Option<String> {
        Url::parse(&self.url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
    }
}

// ---------------------------------------------------------------------------
// Enrichments
// ---------------------------------------------------------------------------

/// Rendering priority of an enrichment card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrichmentPriority {
    Low,
    Medium,
    High,
}

/// The five recognized `{{kind: ...}}` callout kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrichmentKind {
    Hint,
    Warning,
    Background,
    Example,
    Reminder,
}

impl EnrichmentKind {
    pub const ALL: [EnrichmentKind; 5] = [
        Self::Hint,
        Self::Warning,
        Self::Background,
        Self::Example,
        Self::Reminder,
    ];

    /// Marker token as written inside `{{token: ...}}`.
    pub fn token(self) -> &'static str {
        match self {
            Self::Hint => "hint",
            Self::Warning => "warning",
            Self::Background => "background",
            Self::Example => "example",
            Self::Reminder => "reminder",
        }
    }

    /// Case-insensitive lookup of a marker token (surrounding whitespace ignored).
    pub fn from_token(raw: &str) -> Option<Self> {
        let normalized = raw.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.token().eq_ignore_ascii_case(normalized))
    }

    pub fn default_priority(self) -> EnrichmentPriority {
        match self {
            Self::Warning | Self::Reminder => EnrichmentPriority::High,
            Self::Hint | Self::Example => EnrichmentPriority::Medium,
            Self::Background => EnrichmentPriority::Low,
        }
    }
}

/// Payload shared by every enrichment kind. Content is never blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichmentBody {
    content: String,
    priority: EnrichmentPriority,
    position: usize,
}

/// A typed callout extracted from `{{kind: content}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Enrichment {
    Hint(EnrichmentBody),
    Warning(EnrichmentBody),
    Background(EnrichmentBody),
    Example(EnrichmentBody),
    Reminder(EnrichmentBody),
}

impl Enrichment {
    /// Create an enrichment with the kind's default priority.
    pub fn new(kind: EnrichmentKind, content: impl Into<String>, position: usize) -> Result<Self> {
        Self::with_priority(kind, content, kind.default_priority(), position)
    }

    /// Create an enrichment with an explicit priority. Rejects blank content.
    pub fn with_priority(
        kind: EnrichmentKind,
        content: impl Into<String>,
        priority: EnrichmentPriority,
        position: usize,
    ) -> Result<Self> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(ChatmarkError::validation(format!(
                "{} content must not be blank",
                kind.token()
            )));
        }

        let body = EnrichmentBody {
            content,
            priority,
            position,
        };
        Ok(match kind {
            EnrichmentKind::Hint => Self::Hint(body),
            EnrichmentKind::Warning => Self::Warning(body),
            EnrichmentKind::Background => Self::Background(body),
            EnrichmentKind::Example => Self::Example(body),
            EnrichmentKind::Reminder => Self::Reminder(body),
        })
    }

    pub fn kind(&self) -> EnrichmentKind {
        match self {
            Self::Hint(_) => EnrichmentKind::Hint,
            Self::Warning(_) => EnrichmentKind::Warning,
            Self::Background(_) => EnrichmentKind::Background,
            Self::Example(_) => EnrichmentKind::Example,
            Self::Reminder(_) => EnrichmentKind::Reminder,
        }
    }

    fn body(&self) -> &EnrichmentBody {
        match self {
            Self::Hint(body)
            | Self::Warning(body)
            | Self::Background(body)
            | Self::Example(body)
            | Self::Reminder(body) => body,
        }
    }

    pub fn content(&self) -> &str {
        &self.body().content
    }

    pub fn priority(&self) -> EnrichmentPriority {
        self.body().priority
    }

    /// Character offset of the opening `{{` in the normalized input.
    pub fn position(&self) -> usize {
        self.body().position
    }
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Category of a non-fatal processing warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    MalformedEnrichment,
    UnknownEnrichmentType,
    UnclosedCodeBlock,
    InvalidCitation,
    NestedStructure,
    ParsingIssue,
}

/// A non-fatal issue noticed while processing. Collected, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingWarning {
    pub message: String,
    pub kind: WarningKind,
    pub position: usize,
}

impl ProcessingWarning {
    /// Rejects blank messages.
    pub fn new(message: impl Into<String>, kind: WarningKind, position: usize) -> Result<Self> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err(ChatmarkError::validation("warning message must not be blank"));
        }
        Ok(Self {
            message,
            kind,
            position,
        })
    }
}

// ---------------------------------------------------------------------------
// ProcessedMarkdown
// ---------------------------------------------------------------------------

/// The complete result of one pipeline run. This is the unit that gets cached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessedMarkdown {
    pub html: String,
    pub citations: Vec<Citation>,
    pub enrichments: Vec<Enrichment>,
    pub warnings: Vec<ProcessingWarning>,
    pub processing_time_ms: u64,
}

impl ProcessedMarkdown {
    /// True when processing produced no warnings.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Citations plus enrichments.
    pub fn structured_element_count(&self) -> usize {
        self.citations.len() + self.enrichments.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn citation_kind_from_url_shapes() {
        assert_eq!(CitationKind::from_url("https://example.com/spec.PDF"), CitationKind::Pdf);
        assert_eq!(
            CitationKind::from_url("https://docs.oracle.com/en/java/javase/25/"),
            CitationKind::ApiDoc
        );
        assert_eq!(
            CitationKind::from_url("https://example.com/docs/api/index.html"),
            CitationKind::ApiDoc
        );
        assert_eq!(CitationKind::from_url("https://github.com/openjdk/jdk"), CitationKind::Repo);
        assert_eq!(CitationKind::from_url("http://example.com"), CitationKind::External);
        assert_eq!(CitationKind::from_url("/pdfs/guide"), CitationKind::Local);
        assert_eq!(CitationKind::from_url("ftp://example.com"), CitationKind::Unknown);
        assert_eq!(CitationKind::from_url(""), CitationKind::Unknown);
    }

    #[test]
    fn citation_domain_and_snippet() {
        let citation = Citation::new("https://github.com/a/b", "Repo", "", 3).unwrap();
        assert_eq!(citation.kind, CitationKind::Repo);
        assert_eq!(citation.domain().as_deref(), Some("github.com"));
        assert!(!citation.has_snippet());

        let local = Citation::new("/guides/intro", "Intro", "  ", 0).unwrap();
        assert_eq!(local.domain(), None);
    }

    #[test]
    fn citation_rejects_blank_url() {
        assert!(Citation::new("  ", "Title", "", 0).is_err());
        assert!(Citation::new("https://a.example", " ", "", 0).is_err());
    }

    #[test]
    fn enrichment_kind_tokens_are_case_insensitive() {
        assert_eq!(EnrichmentKind::from_token("HINT"), Some(EnrichmentKind::Hint));
        assert_eq!(EnrichmentKind::from_token(" Reminder "), Some(EnrichmentKind::Reminder));
        assert_eq!(EnrichmentKind::from_token("tip"), None);
    }

    #[test]
    fn enrichment_rejects_blank_content() {
        let err = Enrichment::new(EnrichmentKind::Warning, "   \n", 0).unwrap_err();
        assert!(err.to_string().contains("warning content must not be blank"));
    }

    #[test]
    fn enrichment_default_priorities() {
        let hint = Enrichment::new(EnrichmentKind::Hint, "x", 0).unwrap();
        let warning = Enrichment::new(EnrichmentKind::Warning, "x", 0).unwrap();
        let background = Enrichment::new(EnrichmentKind::Background, "x", 0).unwrap();
        assert_eq!(hint.priority(), EnrichmentPriority::Medium);
        assert_eq!(warning.priority(), EnrichmentPriority::High);
        assert_eq!(background.priority(), EnrichmentPriority::Low);
        assert!(warning.priority() > hint.priority());
    }

    #[test]
    fn enrichment_serializes_with_type_tag() {
        let example = Enrichment::new(EnrichmentKind::Example, "int x = 1;", 7).unwrap();
        let json = serde_json::to_value(&example).unwrap();
        assert_eq!(json["type"], "example");
        assert_eq!(json["content"], "int x = 1;");
        assert_eq!(json["priority"], "medium");
        assert_eq!(json["position"], 7);
    }

    #[test]
    fn warning_rejects_blank_message() {
        assert!(ProcessingWarning::new("", WarningKind::ParsingIssue, 0).is_err());
        let warning =
            ProcessingWarning::new("Unknown enrichment type: tip", WarningKind::UnknownEnrichmentType, 4)
                .unwrap();
        assert_eq!(warning.position, 4);
    }

    #[test]
    fn processed_markdown_counts() {
        let processed = ProcessedMarkdown {
            citations: vec![Citation::new("https://a.example", "A", "", 0).unwrap()],
            enrichments: vec![Enrichment::new(EnrichmentKind::Hint, "h", 0).unwrap()],
            ..ProcessedMarkdown::default()
        };
        assert!(processed.is_clean());
        assert_eq!(processed.structured_element_count(), 2);
    }
}
