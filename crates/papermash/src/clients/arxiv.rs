//! Client for resolving papers on arXiv.org by title and authors.
//!
//! Queries go to arXiv's Atom feed API (http://export.arxiv.org/api/query). Results
//! are always requested sorted by submission date, *ascending*, so the first entry
//! is the earliest matching submission. Its `published` timestamp is the date of
//! version 1, not of the latest revision.
//!
//! # Examples
//!
//! ```no_run
//! use papermash::clients::ArxivClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ArxivClient::new()?;
//! if let Some(paper) = client.resolve("Attention Is All You Need", &["Ashish Vaswani"]).await {
//!   println!("{} ({:?})", paper.title, paper.published_date);
//!   println!("PDF: {:?}", paper.pdf_url);
//! }
//! # Ok(())
//! # }
//! ```

use url::Url;

use super::*;

/// Default endpoint of the arXiv query API.
pub const BASE_URL: &str = "http://export.arxiv.org/api/query";

/// User agent sent to arXiv.
const USER_AGENT: &str = concat!("papermash/", env!("CARGO_PKG_VERSION"), " (arxiv; research use)");

/// Internal representation of the arXiv API's Atom feed response.
#[derive(Debug, Deserialize)]
struct Feed {
  /// A `Feed` from arXiv may contain zero or more `Entry`s
  #[serde(rename = "entry", default)]
  entries: Vec<Entry>,
}

/// Internal representation of a paper entry from arXiv's API response.
#[derive(Debug, Deserialize)]
struct Entry {
  /// arXiv URL (e.g., "http://arxiv.org/abs/1706.03762v1")
  #[serde(rename = "id")]
  arxiv_url: String,
  /// Paper title, hard-wrapped by the API
  #[serde(default)]
  title:     String,
  /// Paper abstract, hard-wrapped by the API
  #[serde(default)]
  summary:   Option<String>,
  /// List of paper authors
  #[serde(rename = "author", default)]
  authors:   Vec<Author>,
  /// Submission date of the first version
  #[serde(default)]
  published: Option<String>,
  /// Landing page and PDF links
  #[serde(rename = "link", default)]
  links:     Vec<Link>,
  /// DOI of the published version, if the authors registered one
  #[serde(rename = "doi", alias = "arxiv:doi", default)]
  doi:       Option<String>,
}

/// Internal representation of an author from arXiv's API response.
#[derive(Debug, Deserialize)]
struct Author {
  /// Author's full name
  #[serde(default)]
  name: String,
}

/// An Atom `<link>` element.
#[derive(Debug, Deserialize)]
struct Link {
  /// Target of the link
  #[serde(rename = "@href")]
  href: String,
  /// Link relation; the landing page is `alternate`
  #[serde(rename = "@rel", default)]
  rel:  Option<String>,
}

impl Entry {
  /// The landing page link, as a feed reader would pick it.
  fn landing_page(&self) -> &str {
    self
      .links
      .iter()
      .find(|link| link.rel.as_deref() == Some("alternate"))
      .or_else(|| self.links.first())
      .map(|link| link.href.as_str())
      .unwrap_or(&self.arxiv_url)
  }

  /// Converts the entry into a [`Paper`].
  fn into_paper(self) -> Paper {
    let id = self.arxiv_url.trim_end_matches('/').rsplit('/').next().unwrap_or_default().to_string();
    let published_date = self.published.as_deref().and_then(parse_timestamp);
    let pdf_url = pdf_url(self.landing_page());
    let authors = self.authors.into_iter().map(|author| format::clean_text(&author.name)).collect();

    let mut paper = Paper::new(Source::Arxiv, id, &self.title, authors);
    paper.summary = self.summary.as_deref().map(format::clean_text);
    paper.published_date = published_date;
    paper.pdf_url = pdf_url;
    paper.doi = self.doi.map(|doi| doi.trim().to_string()).filter(|doi| !doi.is_empty());
    paper
  }
}

/// Parses an ISO-8601 timestamp such as `2017-06-12T17:57:34Z`.
///
/// Unparseable input yields `None` rather than an error.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
  match DateTime::parse_from_rfc3339(raw.trim()) {
    Ok(date) => Some(date.with_timezone(&Utc)),
    Err(e) => {
      debug!(source = "arxiv", "Ignoring unparseable publication date '{raw}': {e}");
      None
    },
  }
}

/// Rewrites an abstract page link (`http://arxiv.org/abs/<id>`) into a direct
/// https PDF link (`https://arxiv.org/pdf/<id>`).
pub fn pdf_url(landing_page: &str) -> Option<String> {
  let mut url = Url::parse(landing_page).ok()?;
  if url.scheme() == "http" {
    url.set_scheme("https").ok()?;
  }
  let path = url
    .path_segments()?
    .map(|segment| if segment == "abs" { "pdf" } else { segment })
    .collect::<Vec<_>>()
    .join("/");
  url.set_path(&path);
  Some(url.to_string())
}

/// Parses an arXiv Atom feed and returns its first entry, if any.
///
/// An empty feed is `Ok(None)`. Only a document that isn't a feed at all is an error.
pub fn parse_feed(xml: &str) -> Result<Option<Paper>, PapermashError> {
  let feed: Feed =
    from_str(xml).map_err(|e| PapermashError::ApiError(format!("Failed to parse XML: {}", e)))?;
  Ok(feed.entries.into_iter().next().map(Entry::into_paper))
}

/// An arXiv `search_query` expression built from a title and author names.
///
/// The title becomes an exact-phrase `ti:` clause and each author an `au:` clause.
/// Author clauses are AND-ed together inside parentheses, and that group is
/// AND-ed with the title clause:
///
/// ```
/// use papermash::clients::SearchQuery;
///
/// let query = SearchQuery::arxiv("Attention Is All You Need", &["Ashish Vaswani", "Noam Shazeer"]);
/// assert_eq!(
///   query.as_str(),
///   r#"ti:"Attention Is All You Need" AND (au:"Ashish Vaswani" AND au:"Noam Shazeer")"#
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchQuery(String);

impl SearchQuery {
  /// Builds the query. Blank titles and blank author names contribute no clause.
  pub fn arxiv<S: AsRef<str>>(title: &str, authors: &[S]) -> Self {
    let mut parts = Vec::new();

    let title = title.trim();
    if !title.is_empty() {
      parts.push(format!("ti:\"{title}\""));
    }

    let authors = authors
      .iter()
      .map(|author| author.as_ref().trim())
      .filter(|author| !author.is_empty())
      .map(|author| format!("au:\"{author}\""))
      .collect::<Vec<_>>();
    if !authors.is_empty() {
      parts.push(format!("({})", authors.join(" AND ")));
    }

    Self(parts.join(" AND "))
  }

  /// True when neither a title nor an author was given; such a query is never sent.
  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  /// The raw `search_query` value.
  pub fn as_str(&self) -> &str { &self.0 }
}

impl std::fmt::Display for SearchQuery {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(&self.0) }
}

/// Client for resolving papers against the arXiv API.
#[derive(Debug, Clone)]
pub struct ArxivClient {
  /// Retrying transport pointed at the query endpoint.
  transport:   ResilientClient,
  /// How many entries to request; only the first is used.
  max_results: usize,
}

impl ArxivClient {
  /// Creates a client for the public arXiv API with [`RetryPolicy::arxiv`] pacing.
  pub fn new() -> Result<Self, PapermashError> {
    Ok(Self {
      transport:   ResilientClient::new("arxiv", BASE_URL, USER_AGENT, RetryPolicy::arxiv())?,
      max_results: 1,
    })
  }

  /// Points the client at another query endpoint.
  pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
    self.transport = self.transport.with_base_url(base_url);
    self
  }

  /// Replaces the retry policy.
  pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
    self.transport = self.transport.with_policy(policy);
    self
  }

  /// Sets how many entries are requested per query (at least one).
  pub fn with_max_results(mut self, max_results: usize) -> Self {
    self.max_results = max_results.max(1);
    self
  }

  /// Looks up the earliest arXiv submission matching `title` and `authors`.
  ///
  /// This is best effort: an empty query, an empty feed, and any network or
  /// parsing failure all yield `None`. Failures are logged.
  pub async fn resolve<S: AsRef<str>>(&self, title: &str, authors: &[S]) -> Option<Paper> {
    let query = SearchQuery::arxiv(title, authors);
    match self.fetch(&query).await {
      Ok(paper) => paper,
      Err(e) => {
        warn!(source = "arxiv", %query, "An error occurred while fetching from arXiv: {e}");
        None
      },
    }
  }

  /// Runs `query` and parses the first entry of the response.
  ///
  /// An empty query returns `Ok(None)` without touching the network.
  pub async fn fetch(&self, query: &SearchQuery) -> Result<Option<Paper>, PapermashError> {
    if query.is_empty() {
      debug!(source = "arxiv", "Empty query, skipping request");
      return Ok(None);
    }

    let params = [
      ("search_query", query.to_string()),
      ("max_results", self.max_results.to_string()),
      ("sortBy", "submittedDate".to_string()),
      ("sortOrder", "ascending".to_string()),
    ];
    let response = self.transport.call("", &params).await?;

    let paper = parse_feed(&response)?;
    match &paper {
      Some(paper) => info!(source = "arxiv", paper_id = %paper.id, "Found paper: {}", paper.title),
      None => info!(source = "arxiv", %query, "No entries matched"),
    }
    Ok(paper)
  }
}
