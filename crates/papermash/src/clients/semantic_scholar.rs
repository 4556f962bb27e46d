//! Client for the Semantic Scholar academic graph API.
//!
//! Two independent operations are supported:
//!
//! - **Title search** ([`SemanticScholarClient::search_by_title`]): asks for a handful of
//!   candidates and picks one with [`best_match`].
//! - **Reference listing** ([`SemanticScholarClient::get_references`]): the papers a given
//!   paper cites, in the order the API returns them.
//!
//! Both are best effort and return `None` / an empty list on any failure. Their
//! `try_*` twins return the error instead.

use serde::{de::DeserializeOwned, Deserializer};
use serde_json::Value;

use super::*;

/// Default base URL of the graph API.
pub const BASE_URL: &str = "https://api.semanticscholar.org/graph/v1";

/// User agent sent to Semantic Scholar.
const USER_AGENT: &str = concat!("papermash/", env!("CARGO_PKG_VERSION"), " (research use)");

/// Fields requested for title search candidates.
const SEARCH_FIELDS: &str =
  "paperId,title,year,publicationDate,authors,externalIds,publicationTypes,venue";

/// Fields requested for each referenced paper.
const REFERENCE_FIELDS: &str = "paperId,title,year,publicationDate,authors,externalIds,venue";

/// Candidates requested per title search.
const SEARCH_LIMIT: usize = 5;

/// References requested per paper.
const REFERENCES_LIMIT: usize = 100;

/// How strongly a candidate's title matched the query, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchKind {
  /// Nothing matched; the API's top result was taken
  FirstResult,
  /// The query is contained in the candidate's title
  Partial,
  /// The titles are equal ignoring case and surrounding whitespace
  Exact,
}

/// Picks the candidate whose title best matches `query`.
///
/// Scanning in order, the first exact match (case-insensitive, trimmed) wins
/// immediately. Otherwise the first candidate whose title *contains* the query is
/// kept; a later exact match still overrides it. If neither occurs the first
/// candidate is used. Containment is only checked in that direction: a candidate
/// title that is a substring of the query does not count.
///
/// Returns the index of the chosen candidate, or `None` if there are none.
///
/// ```
/// use papermash::clients::semantic_scholar::{best_match, MatchKind};
///
/// let titles = ["Attention Is All You Need", "Attention is not all you need"];
/// assert_eq!(best_match("attention is all you need", &titles), Some((0, MatchKind::Exact)));
/// ```
pub fn best_match<S: AsRef<str>>(query: &str, titles: &[S]) -> Option<(usize, MatchKind)> {
  let query = format::match_key(query);
  let mut fallback = None;

  for (index, title) in titles.iter().enumerate() {
    let title = format::match_key(title.as_ref());
    if title == query {
      return Some((index, MatchKind::Exact));
    }
    if fallback.is_none() && title.contains(&query) {
      fallback = Some((index, MatchKind::Partial));
    }
  }

  fallback.or_else(|| (!titles.is_empty()).then_some((0, MatchKind::FirstResult)))
}

/// The `{"data": [...]}` envelope shared by search and reference responses.
#[derive(Debug, Deserialize)]
struct Envelope {
  /// Result entries; absent when nothing matched
  #[serde(default)]
  data: Option<Vec<Value>>,
}

/// A paper as returned by the graph API with our field projection.
///
/// Every field decodes leniently: a value of the wrong shape becomes `None` (or
/// an empty list) instead of rejecting the whole record.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct S2Paper {
  /// 40 character Semantic Scholar id
  #[serde(default, deserialize_with = "lenient")]
  paper_id:     Option<String>,
  /// Title, when known
  #[serde(default, deserialize_with = "lenient")]
  title:        Option<String>,
  /// Publication year
  #[serde(default, deserialize_with = "lenient")]
  year:         Option<i32>,
  /// Author names; malformed payloads decode as an empty list
  #[serde(default, deserialize_with = "lenient_authors")]
  authors:      Vec<String>,
  /// Identifiers in other systems
  #[serde(default, deserialize_with = "lenient")]
  external_ids: Option<ExternalIds>,
  /// Venue name; the API reports unknown venues as an empty string
  #[serde(default, deserialize_with = "lenient")]
  venue:        Option<String>,
}

/// The subset of `externalIds` we keep.
#[derive(Debug, Deserialize)]
struct ExternalIds {
  /// Digital Object Identifier
  #[serde(rename = "DOI", default, deserialize_with = "lenient")]
  doi: Option<String>,
}

/// Decodes an optional field, treating a value of the wrong shape as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
  D: Deserializer<'de>,
  T: DeserializeOwned, {
  let value = Value::deserialize(deserializer)?;
  Ok(serde_json::from_value(value).ok())
}

/// Decodes an author list without ever failing the surrounding record.
fn lenient_authors<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
  let value = Value::deserialize(deserializer)?;
  Ok(format::author_names(&value))
}

impl S2Paper {
  /// The id, if present and non-blank.
  fn id(&self) -> Option<&str> { self.paper_id.as_deref().filter(|id| !id.trim().is_empty()) }

  /// Converts the API record into a [`Paper`].
  fn into_paper(self) -> Paper {
    let id = self.id().unwrap_or_default().to_string();
    let mut paper =
      Paper::new(Source::SemanticScholar, id, self.title.as_deref().unwrap_or_default(), self.authors);
    paper.year = self.year;
    paper.venue = self.venue.filter(|venue| !venue.trim().is_empty());
    paper.doi = self.external_ids.and_then(|ids| ids.doi);
    paper
  }
}

/// Pulls the `data` array out of a response body.
fn decode_data(body: &str) -> Result<Vec<Value>, PapermashError> {
  let envelope: Envelope = serde_json::from_str(body)
    .map_err(|e| PapermashError::ApiError(format!("Failed to parse JSON: {}", e)))?;
  Ok(envelope.data.unwrap_or_default())
}

/// The title of a raw search candidate; missing or non-string titles count as empty.
fn raw_title(value: &Value) -> &str {
  value.get("title").and_then(Value::as_str).unwrap_or_default()
}

/// Decodes one entry, dropping it if it is not a paper object at all.
fn decode_paper(value: Value) -> Option<S2Paper> {
  match serde_json::from_value(value) {
    Ok(paper) => Some(paper),
    Err(e) => {
      debug!(source = "semantic_scholar", "Dropping undecodable entry: {e}");
      None
    },
  }
}

/// Shortens a title for log output.
fn preview(title: &str) -> String {
  if title.chars().count() > 60 {
    format!("{}...", title.chars().take(60).collect::<String>())
  } else {
    title.to_string()
  }
}

/// Client for title search and reference listing on Semantic Scholar.
#[derive(Debug, Clone)]
pub struct SemanticScholarClient {
  /// Retrying transport pointed at the graph API.
  transport: ResilientClient,
}

impl SemanticScholarClient {
  /// Creates an unauthenticated client for the public API with
  /// [`RetryPolicy::semantic_scholar`] pacing.
  pub fn new() -> Result<Self, PapermashError> {
    Ok(Self {
      transport: ResilientClient::new(
        "semantic_scholar",
        BASE_URL,
        USER_AGENT,
        RetryPolicy::semantic_scholar(),
      )?,
    })
  }

  /// Sends `api_key` as the `x-api-key` header for higher rate limits.
  pub fn with_api_key(mut self, api_key: &str) -> Result<Self, PapermashError> {
    self.transport = self.transport.with_header("x-api-key", api_key)?;
    Ok(self)
  }

  /// Points the client at another deployment of the graph API.
  pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
    self.transport = self.transport.with_base_url(base_url);
    self
  }

  /// Replaces the retry policy.
  pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
    self.transport = self.transport.with_policy(policy);
    self
  }

  /// Finds the paper that best matches `title`, or `None`.
  ///
  /// Blank titles, empty result sets and failures all give `None`; failures are logged.
  pub async fn search_by_title(&self, title: &str) -> Option<Paper> {
    match self.try_search_by_title(title).await {
      Ok(paper) => paper,
      Err(e) => {
        warn!(source = "semantic_scholar", "Error searching for '{}': {e}", preview(title));
        None
      },
    }
  }

  /// Like [`search_by_title`](Self::search_by_title) but surfaces failures.
  pub async fn try_search_by_title(&self, title: &str) -> Result<Option<Paper>, PapermashError> {
    let title = title.trim();
    if title.is_empty() {
      debug!(source = "semantic_scholar", "Empty title provided");
      return Ok(None);
    }
    debug!(source = "semantic_scholar", "Searching for paper: '{}'", preview(title));

    let params = [
      ("query", title.to_string()),
      ("limit", SEARCH_LIMIT.to_string()),
      ("fields", SEARCH_FIELDS.to_string()),
    ];
    let body = self.transport.call("paper/search", &params).await?;
    let mut candidates = decode_data(&body)?;

    let titles = candidates.iter().map(raw_title).collect::<Vec<_>>();
    let Some((index, kind)) = best_match(title, &titles) else {
      info!(source = "semantic_scholar", "No papers found for: '{}'", preview(title));
      return Ok(None);
    };

    let Some(paper) = decode_paper(candidates.swap_remove(index)).map(S2Paper::into_paper) else {
      warn!(source = "semantic_scholar", "Selected candidate {index} is not a paper record");
      return Ok(None);
    };
    debug!(source = "semantic_scholar", ?kind, paper_id = %paper.id, "Selected candidate {index}");
    info!(
      source = "semantic_scholar",
      paper_id = %paper.id,
      year = ?paper.year,
      "Selected: '{}'",
      preview(&paper.title)
    );
    Ok(Some(paper))
  }

  /// Lists the papers cited by `paper_id`, in source order.
  ///
  /// Entries whose cited paper is missing or has no id are skipped. Blank ids and
  /// failures give an empty list; failures are logged.
  pub async fn get_references(&self, paper_id: &str) -> Vec<Paper> {
    match self.try_get_references(paper_id).await {
      Ok(references) => references,
      Err(e) => {
        warn!(source = "semantic_scholar", "Error getting references for '{paper_id}': {e}");
        Vec::new()
      },
    }
  }

  /// Like [`get_references`](Self::get_references) but surfaces failures.
  pub async fn try_get_references(&self, paper_id: &str) -> Result<Vec<Paper>, PapermashError> {
    let paper_id = paper_id.trim();
    if paper_id.is_empty() {
      debug!(source = "semantic_scholar", "Empty paper_id provided");
      return Ok(Vec::new());
    }

    let params = [("fields", REFERENCE_FIELDS.to_string()), ("limit", REFERENCES_LIMIT.to_string())];
    let body = self.transport.call(&format!("paper/{paper_id}/references"), &params).await?;

    let references = decode_data(&body)?
      .into_iter()
      .filter_map(|mut entry| match entry.get_mut("citedPaper").map(Value::take) {
        Some(cited) if !cited.is_null() => decode_paper(cited),
        _ => None,
      })
      .filter(|cited| cited.id().is_some())
      .map(S2Paper::into_paper)
      .collect::<Vec<_>>();

    info!(
      source = "semantic_scholar",
      paper_id,
      count = references.len(),
      "Found {} references",
      references.len()
    );
    for (i, reference) in references.iter().take(3).enumerate() {
      debug!(
        source = "semantic_scholar",
        "  {}. '{}' ({:?})",
        i + 1,
        preview(&reference.title),
        reference.year
      );
    }
    Ok(references)
  }
}
