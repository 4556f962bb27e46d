//! Read-only access to local conference snapshot databases.
//!
//! Each recognized conference has one SQLite file in the data directory containing
//! a `papers` table with at least the columns `id`, `title`, `raw_authors` (a JSON
//! array of `{"name": ...}` objects), `pdf_url`, `accept_type` and `status`.
//!
//! Every query opens its own read-only connection and closes it before returning,
//! whether the query succeeded or not. No handle outlives a call.
//!
//! Structural problems are errors: an unknown conference name is rejected with
//! [`PapermashError::InvalidConference`] and an absent file with
//! [`PapermashError::SnapshotNotFound`]. Per-row data problems are not: a row whose
//! author payload isn't valid JSON simply has no authors.
//!
//! # Examples
//!
//! ```no_run
//! use papermash::snapshot::SnapshotStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SnapshotStore::new("data");
//! for (status, count) in store.get_paper_stats("icml").await? {
//!   println!("{status}: {count}");
//! }
//! let papers = store.get_accepted_papers("ICLR", 10).await?;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;

use rusqlite::{types::ValueRef, OpenFlags};
use tokio_rusqlite::Connection;

use super::*;

/// Paper counts keyed by submission status.
pub type PaperStats = BTreeMap<String, u64>;

/// Key used in [`PaperStats`] for rows whose status is NULL.
pub const UNKNOWN_STATUS: &str = "unknown";

/// Selects accepted papers in storage order.
const ACCEPTED_QUERY: &str = "SELECT p.title, p.raw_authors, p.id, p.pdf_url, p.accept_type
     FROM papers p
     WHERE p.status = 'accepted'
     LIMIT ?1";

/// Counts every row by status.
const STATS_QUERY: &str = "SELECT status, COUNT(*) FROM papers GROUP BY status";

/// A conference with a known snapshot.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Conference {
  /// International Conference on Machine Learning
  Icml,
  /// International Conference on Learning Representations
  Iclr,
}

impl Conference {
  /// Every recognized conference, in aggregation order.
  pub const ALL: [Conference; 2] = [Conference::Icml, Conference::Iclr];

  /// File name of this conference's snapshot inside the data directory.
  pub fn snapshot_file_name(&self) -> &'static str {
    match self {
      Conference::Icml => "venues-icml-2025-v2.db",
      Conference::Iclr => "venues-iclr-2025-v3.db",
    }
  }

  /// Edition covered by the snapshot.
  pub fn year(&self) -> i32 { 2025 }

  /// Venue string recorded on papers from this snapshot, e.g. `"ICML 2025"`.
  pub fn venue(&self) -> String { format!("{} {}", self, self.year()) }
}

impl std::fmt::Display for Conference {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Conference::Icml => write!(f, "ICML"),
      Conference::Iclr => write!(f, "ICLR"),
    }
  }
}

impl FromStr for Conference {
  type Err = PapermashError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match &s.trim().to_lowercase() as &str {
      "icml" => Ok(Conference::Icml),
      "iclr" => Ok(Conference::Iclr),
      _ => Err(PapermashError::InvalidConference(s.to_owned())),
    }
  }
}

/// One `papers` row as read from the snapshot, before normalization.
#[derive(Debug)]
struct Row {
  /// `title` column
  title:       Option<String>,
  /// `raw_authors` column, JSON text
  raw_authors: Option<String>,
  /// `id` column rendered as text
  id:          Option<String>,
  /// `pdf_url` column
  pdf_url:     Option<String>,
  /// `accept_type` column
  accept_type: Option<String>,
}

/// Reads a column as text whatever its storage class; NULL is `None`.
fn text(value: ValueRef<'_>) -> Option<String> {
  match value {
    ValueRef::Null => None,
    ValueRef::Integer(i) => Some(i.to_string()),
    ValueRef::Real(f) => Some(f.to_string()),
    ValueRef::Text(bytes) | ValueRef::Blob(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
  }
}

/// Decodes the `raw_authors` payload; anything malformed yields no authors.
fn decode_authors(raw: Option<&str>) -> Vec<String> {
  let Some(raw) = raw.filter(|raw| !raw.trim().is_empty()) else {
    return Vec::new();
  };
  match serde_json::from_str::<serde_json::Value>(raw) {
    Ok(value) => format::author_names(&value),
    Err(e) => {
      debug!("Ignoring malformed author list: {e}");
      Vec::new()
    },
  }
}

impl Row {
  /// Normalizes the row into a [`Paper`] attributed to `conference`.
  fn into_paper(self, conference: Conference) -> Paper {
    let authors = decode_authors(self.raw_authors.as_deref());
    let mut paper = Paper::new(
      Source::Conference,
      self.id.unwrap_or_default(),
      self.title.as_deref().unwrap_or_default(),
      authors,
    );
    paper.pdf_url = self.pdf_url;
    paper.accept_type = self.accept_type;
    paper.conference = Some(conference.to_string());
    paper.venue = Some(conference.venue());
    paper
  }
}

/// Accessor for the per-conference snapshot files in a data directory.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
  /// Directory holding the snapshot files
  data_dir: PathBuf,
}

impl Default for SnapshotStore {
  fn default() -> Self { Self::new("data") }
}

impl SnapshotStore {
  /// Creates an accessor for snapshots stored in `data_dir`.
  pub fn new(data_dir: impl Into<PathBuf>) -> Self { Self { data_dir: data_dir.into() } }

  /// Default snapshot directory in the user's data directory.
  pub fn default_path() -> PathBuf {
    dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join("papermash").join("data")
  }

  /// The directory snapshots are read from.
  pub fn data_dir(&self) -> &Path { &self.data_dir }

  /// Full path of a conference's snapshot file.
  pub fn snapshot_path(&self, conference: Conference) -> PathBuf {
    self.data_dir.join(conference.snapshot_file_name())
  }

  /// Runs `query` against a fresh read-only connection to `conference`'s snapshot.
  ///
  /// The connection is closed before returning on every path.
  async fn with_snapshot<T, F>(&self, conference: Conference, query: F) -> Result<T, PapermashError>
  where
    F: FnOnce(&mut rusqlite::Connection) -> tokio_rusqlite::Result<T> + Send + 'static,
    T: Send + 'static, {
    let path = self.snapshot_path(conference);
    if !path.exists() {
      return Err(PapermashError::SnapshotNotFound(path));
    }

    trace!(%conference, "Opening snapshot at {}", path.display());
    let conn = Connection::open_with_flags(
      &path,
      OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .await?;

    let result = conn.call(query).await;

    if let Err(e) = conn.close().await {
      warn!(%conference, "Failed to close snapshot {}: {e}", path.display());
    }
    Ok(result?)
  }

  /// Accepted papers of `conference` (`"icml"` or `"iclr"`, any case), at most `limit`.
  pub async fn get_accepted_papers(
    &self,
    conference: &str,
    limit: usize,
  ) -> Result<Vec<Paper>, PapermashError> {
    self.accepted_papers(conference.parse()?, limit).await
  }

  /// Typed form of [`get_accepted_papers`](Self::get_accepted_papers).
  pub async fn accepted_papers(
    &self,
    conference: Conference,
    limit: usize,
  ) -> Result<Vec<Paper>, PapermashError> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let rows = self
      .with_snapshot(conference, move |conn| {
        let mut stmt = conn.prepare(ACCEPTED_QUERY)?;
        let rows = stmt
          .query_map([limit], |row| {
            Ok(Row {
              title:       text(row.get_ref(0)?),
              raw_authors: text(row.get_ref(1)?),
              id:          text(row.get_ref(2)?),
              pdf_url:     text(row.get_ref(3)?),
              accept_type: text(row.get_ref(4)?),
            })
          })?
          .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
      })
      .await?;

    let papers = rows.into_iter().map(|row| row.into_paper(conference)).collect::<Vec<_>>();
    debug!(%conference, count = papers.len(), "Read accepted papers");
    Ok(papers)
  }

  /// Number of papers per status in `conference`'s snapshot, over all rows.
  pub async fn get_paper_stats(&self, conference: &str) -> Result<PaperStats, PapermashError> {
    self.paper_stats(conference.parse()?).await
  }

  /// Typed form of [`get_paper_stats`](Self::get_paper_stats).
  pub async fn paper_stats(&self, conference: Conference) -> Result<PaperStats, PapermashError> {
    self
      .with_snapshot(conference, |conn| {
        let mut stmt = conn.prepare(STATS_QUERY)?;
        let mut stats = PaperStats::new();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
          let status = text(row.get_ref(0)?).unwrap_or_else(|| UNKNOWN_STATUS.to_string());
          let count: i64 = row.get(1)?;
          *stats.entry(status).or_insert(0) += u64::try_from(count).unwrap_or(0);
        }
        Ok(stats)
      })
      .await
  }

  /// Accepted papers from every recognized conference, concatenated.
  ///
  /// A conference whose snapshot is missing is skipped with a warning; any other
  /// failure for one conference is logged and skipped as well.
  pub async fn get_all_accepted_papers(&self, limit_per_conference: usize) -> Vec<Paper> {
    let mut all_papers = Vec::new();
    for conference in Conference::ALL {
      match self.accepted_papers(conference, limit_per_conference).await {
        Ok(papers) => {
          info!(%conference, count = papers.len(), "Retrieved {} accepted papers from {conference}", papers.len());
          all_papers.extend(papers);
        },
        Err(e) if e.is_missing_snapshot() => {
          warn!(%conference, "{conference} snapshot not found, skipping: {e}");
        },
        Err(e) => {
          error!(%conference, "Error retrieving papers from {conference}: {e}");
        },
      }
    }
    all_papers
  }
}

#[cfg(test)]
mod tests {
  use rusqlite::params;
  use tempfile::{tempdir, TempDir};

  use super::*;

  /// (id, title, raw_authors, status)
  type Fixture = (&'static str, &'static str, &'static str, &'static str);

  const ICML_ROWS: [Fixture; 8] = [
    ("icml-1", "Scaling Laws\nfor Everything", r#"[{"name": "Ada Lovelace"}, {"name": "Alan Turing"}]"#, "accepted"),
    ("icml-2", "A Rejected Idea", r#"[{"name": "Nobody"}]"#, "rejected"),
    ("icml-3", "Broken Authors", "{not json", "accepted"),
    ("icml-4", "Another Rejection", "[]", "rejected"),
    ("icml-5", "Diffusion Everywhere", r#"[{"name": "Grace Hopper"}, {"affiliation": "MIT"}]"#, "accepted"),
    ("icml-6", "Transformers Again", r#"[{"name": "Claude Shannon"}]"#, "accepted"),
    ("icml-7", "Third Rejection", "[]", "rejected"),
    ("icml-8", "Last Accepted", r#"[{"name": "John von Neumann"}]"#, "accepted"),
  ];

  /// Writes a snapshot with the given rows for `conference` into `dir`.
  fn write_snapshot(dir: &Path, conference: Conference, rows: &[Fixture]) {
    let conn = rusqlite::Connection::open(dir.join(conference.snapshot_file_name())).unwrap();
    conn
      .execute_batch(
        "CREATE TABLE papers (
           id TEXT PRIMARY KEY,
           title TEXT,
           raw_authors TEXT,
           pdf_url TEXT,
           accept_type TEXT,
           status TEXT
         );",
      )
      .unwrap();
    for (id, title, raw_authors, status) in rows {
      let accept_type = if *status == "accepted" { Some("poster") } else { None };
      conn
        .execute(
          "INSERT INTO papers (id, title, raw_authors, pdf_url, accept_type, status)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          params![id, title, raw_authors, format!("https://openreview.net/pdf?id={id}"), accept_type, status],
        )
        .unwrap();
    }
  }

  /// A data directory with only the ICML snapshot.
  fn setup_store() -> (SnapshotStore, TempDir) {
    let dir = tempdir().unwrap();
    write_snapshot(dir.path(), Conference::Icml, &ICML_ROWS);
    (SnapshotStore::new(dir.path()), dir)
  }

  #[test]
  fn test_conference_parsing() {
    assert_eq!("icml".parse::<Conference>().unwrap(), Conference::Icml);
    assert_eq!("ICLR".parse::<Conference>().unwrap(), Conference::Iclr);
    assert_eq!(" IcMl ".parse::<Conference>().unwrap(), Conference::Icml);
    assert!(matches!(
      "neurips".parse::<Conference>(),
      Err(PapermashError::InvalidConference(name)) if name == "neurips"
    ));
    assert_eq!(Conference::Iclr.venue(), "ICLR 2025");
  }

  #[test]
  fn test_snapshot_paths() {
    let store = SnapshotStore::default();
    assert_eq!(store.data_dir(), Path::new("data"));
    assert_eq!(store.snapshot_path(Conference::Icml), PathBuf::from("data/venues-icml-2025-v2.db"));
    assert_eq!(store.snapshot_path(Conference::Iclr), PathBuf::from("data/venues-iclr-2025-v3.db"));
    assert!(SnapshotStore::default_path().ends_with("papermash/data"));
  }

  #[tokio::test]
  async fn test_accepted_papers_respects_limit() -> Result<(), PapermashError> {
    let (store, _dir) = setup_store();

    let papers = store.get_accepted_papers("icml", 2).await?;
    assert_eq!(papers.len(), 2);
    assert_eq!(papers[0].id, "icml-1");
    assert_eq!(papers[1].id, "icml-3");
    assert!(papers.iter().all(|paper| paper.accept_type.as_deref() == Some("poster")));
    Ok(())
  }

  #[tokio::test]
  async fn test_accepted_papers_only_accepted() -> Result<(), PapermashError> {
    let (store, _dir) = setup_store();

    let papers = store.get_accepted_papers("ICML", 100).await?;
    let ids = papers.iter().map(|paper| paper.id.as_str()).collect::<Vec<_>>();
    assert_eq!(ids, vec!["icml-1", "icml-3", "icml-5", "icml-6", "icml-8"]);

    let first = &papers[0];
    assert_eq!(first.title, "Scaling Laws for Everything");
    assert_eq!(first.authors, vec!["Ada Lovelace", "Alan Turing"]);
    assert_eq!(first.pdf_url.as_deref(), Some("https://openreview.net/pdf?id=icml-1"));
    assert_eq!(first.conference.as_deref(), Some("ICML"));
    assert_eq!(first.venue.as_deref(), Some("ICML 2025"));
    assert_eq!(first.source, Source::Conference);
    assert!(first.year.is_none());
    assert!(first.published_date.is_none());
    Ok(())
  }

  #[tokio::test]
  async fn test_malformed_authors_do_not_abort_siblings() -> Result<(), PapermashError> {
    let (store, _dir) = setup_store();

    let papers = store.get_accepted_papers("icml", 100).await?;
    let broken = papers.iter().find(|paper| paper.id == "icml-3").unwrap();
    assert!(broken.authors.is_empty());

    let missing_name = papers.iter().find(|paper| paper.id == "icml-5").unwrap();
    assert_eq!(missing_name.authors, vec!["Grace Hopper", ""]);
    Ok(())
  }

  #[tokio::test]
  async fn test_zero_limit() -> Result<(), PapermashError> {
    let (store, _dir) = setup_store();
    assert!(store.get_accepted_papers("icml", 0).await?.is_empty());
    Ok(())
  }

  #[tokio::test]
  async fn test_integer_ids_and_nulls() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let conn = rusqlite::Connection::open(dir.path().join(Conference::Iclr.snapshot_file_name()))?;
    conn.execute_batch(
      "CREATE TABLE papers (id INTEGER, title TEXT, raw_authors TEXT, pdf_url TEXT, accept_type TEXT, status TEXT);
       INSERT INTO papers VALUES (42, NULL, NULL, NULL, 'oral', 'accepted');
       INSERT INTO papers VALUES (43, 'Withdrawn', '[]', NULL, NULL, NULL);",
    )?;
    drop(conn);

    let store = SnapshotStore::new(dir.path());
    let papers = store.get_accepted_papers("iclr", 10).await?;
    assert_eq!(papers.len(), 1);
    assert_eq!(papers[0].id, "42");
    assert_eq!(papers[0].title, "");
    assert!(papers[0].authors.is_empty());
    assert!(papers[0].pdf_url.is_none());
    assert_eq!(papers[0].accept_type.as_deref(), Some("oral"));

    let stats = store.get_paper_stats("iclr").await?;
    assert_eq!(stats.get("accepted"), Some(&1));
    assert_eq!(stats.get(UNKNOWN_STATUS), Some(&1));
    Ok(())
  }

  #[tokio::test]
  async fn test_paper_stats() -> Result<(), PapermashError> {
    let (store, _dir) = setup_store();

    let stats = store.get_paper_stats("icml").await?;
    assert_eq!(stats, PaperStats::from([("accepted".to_string(), 5), ("rejected".to_string(), 3)]));
    Ok(())
  }

  #[tokio::test]
  async fn test_missing_snapshot() {
    let (store, dir) = setup_store();

    let err = store.get_accepted_papers("iclr", 10).await.unwrap_err();
    assert!(err.is_missing_snapshot());
    // The read-only open must not have created the file
    assert!(!dir.path().join(Conference::Iclr.snapshot_file_name()).exists());

    assert!(store.get_paper_stats("iclr").await.unwrap_err().is_missing_snapshot());
  }

  #[tokio::test]
  async fn test_invalid_conference_is_rejected_before_io() {
    let store = SnapshotStore::new("/definitely/not/a/real/dir");
    assert!(matches!(
      store.get_accepted_papers("neurips", 10).await,
      Err(PapermashError::InvalidConference(_))
    ));
    assert!(matches!(
      store.get_paper_stats("").await,
      Err(PapermashError::InvalidConference(_))
    ));
  }

  #[tokio::test]
  async fn test_snapshot_is_not_modified() -> Result<(), PapermashError> {
    let (store, dir) = setup_store();
    let path = dir.path().join(Conference::Icml.snapshot_file_name());
    let before = std::fs::read(&path)?;

    store.get_accepted_papers("icml", 100).await?;
    store.get_paper_stats("icml").await?;

    assert_eq!(std::fs::read(&path)?, before);
    Ok(())
  }

  #[traced_test]
  #[tokio::test]
  async fn test_all_accepted_skips_missing_snapshot() {
    let (store, _dir) = setup_store();

    let papers = store.get_all_accepted_papers(3).await;
    assert_eq!(papers.len(), 3);
    assert!(papers.iter().all(|paper| paper.conference.as_deref() == Some("ICML")));
    assert!(logs_contain("Retrieved 3 accepted papers from ICML"));
    assert!(logs_contain("ICLR snapshot not found, skipping"));
  }

  #[traced_test]
  #[tokio::test]
  async fn test_all_accepted_tolerates_broken_snapshot() {
    let (store, dir) = setup_store();
    std::fs::write(dir.path().join(Conference::Iclr.snapshot_file_name()), b"not a database").unwrap();

    let papers = store.get_all_accepted_papers(50).await;
    assert_eq!(papers.len(), 5);
    assert!(logs_contain("Error retrieving papers from ICLR"));
  }

  #[traced_test]
  #[tokio::test]
  async fn test_all_accepted_concatenates_in_order() {
    let dir = tempdir().unwrap();
    write_snapshot(dir.path(), Conference::Icml, &ICML_ROWS);
    write_snapshot(dir.path(), Conference::Iclr, &[
      ("iclr-1", "Learning Representations", r#"[{"name": "Yoshua Bengio"}]"#, "accepted"),
      ("iclr-2", "Not This One", "[]", "rejected"),
    ]);
    let store = SnapshotStore::new(dir.path());

    let papers = store.get_all_accepted_papers(2).await;
    let ids = papers.iter().map(|paper| paper.id.as_str()).collect::<Vec<_>>();
    assert_eq!(ids, vec!["icml-1", "icml-3", "iclr-1"]);
    assert_eq!(papers[2].conference.as_deref(), Some("ICLR"));
  }
}
