//! The canonical paper record every source is normalized into.
//!
//! Each resolver fills the subset of fields its source knows about:
//!
//! | field            | arXiv | Semantic Scholar | conference snapshot |
//! |------------------|-------|------------------|---------------------|
//! | `summary`        | yes   |                  |                     |
//! | `published_date` | yes   |                  |                     |
//! | `pdf_url`        | yes   |                  | yes                 |
//! | `year`           |       | yes              |                     |
//! | `venue`          |       | yes              | yes                 |
//! | `accept_type`    |       |                  | yes                 |
//! | `conference`     |       |                  | yes                 |
//! | `doi`            | yes   | yes              |                     |
//!
//! Records are built fresh per call and never persisted by this crate. Combining
//! records from several sources is left to the caller; [`Paper::source`] tells
//! which namespace [`Paper::id`] belongs to.

use super::*;

/// The source system a [`Paper`] record was produced from.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Source {
  /// The arXiv preprint server; ids look like `1706.03762v1`
  Arxiv,
  /// The Semantic Scholar citation graph; ids are 40 character hex strings
  SemanticScholar,
  /// A local conference snapshot; ids are whatever the snapshot stores
  Conference,
}

impl std::fmt::Display for Source {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Source::Arxiv => write!(f, "Arxiv"),
      Source::SemanticScholar => write!(f, "SemanticScholar"),
      Source::Conference => write!(f, "Conference"),
    }
  }
}

impl FromStr for Source {
  type Err = PapermashError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match &s.to_lowercase() as &str {
      "arxiv" => Ok(Source::Arxiv),
      "semanticscholar" | "semantic_scholar" | "s2" => Ok(Source::SemanticScholar),
      "conference" => Ok(Source::Conference),
      s => Err(PapermashError::InvalidSource(s.to_owned())),
    }
  }
}

/// A paper normalized from any supported source.
///
/// Only `id`, `title`, `authors` and `source` are always present. `authors` may be
/// empty when the source's author payload is absent or malformed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
  /// Source-specific identifier, unique within [`Paper::source`]
  pub id:             String,
  /// Title with line breaks collapsed and surrounding whitespace trimmed
  pub title:          String,
  /// Author display names in the order the source lists them
  pub authors:        Vec<String>,
  /// The abstract (arXiv only)
  pub summary:        Option<String>,
  /// Publication instant of the *first* version (arXiv only)
  pub published_date: Option<DateTime<Utc>>,
  /// Direct link to the PDF over https, where one can be derived
  pub pdf_url:        Option<String>,
  /// Publication venue
  pub venue:          Option<String>,
  /// Acceptance category such as "poster" or "oral" (snapshots only)
  pub accept_type:    Option<String>,
  /// Conference name in uppercase (snapshots only)
  pub conference:     Option<String>,
  /// Publication year (Semantic Scholar only)
  pub year:           Option<i32>,
  /// The paper's DOI, if the source reports one
  pub doi:            Option<String>,
  /// Which source produced this record
  pub source:         Source,
}

impl Paper {
  /// Creates a record carrying only the identity fields; everything optional is unset.
  pub fn new(source: Source, id: impl Into<String>, title: &str, authors: Vec<String>) -> Self {
    Self {
      id: id.into(),
      title: format::clean_text(title),
      authors,
      summary: None,
      published_date: None,
      pdf_url: None,
      venue: None,
      accept_type: None,
      conference: None,
      year: None,
      doi: None,
      source,
    }
  }

  /// Author names joined with `", "`, for display.
  pub fn author_list(&self) -> String { self.authors.join(", ") }
}
