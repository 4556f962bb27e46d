//! Error types for the papermash library.
//!
//! One error type covers every failure mode of the resolvers and the snapshot
//! store:
//! - Network and API errors (including exhausted retries)
//! - Unparseable payloads
//! - Snapshot store access
//! - Input validation
//!
//! The network resolvers only surface these through their fallible `try_*` /
//! [`fetch`](crate::clients::ArxivClient::fetch) entry points. Their best-effort
//! entry points log the error and return `None` or an empty list instead.
//!
//! # Examples
//!
//! ```no_run
//! use papermash::{errors::PapermashError, snapshot::SnapshotStore};
//!
//! # async fn example() -> Result<(), PapermashError> {
//! let store = SnapshotStore::new("data");
//! match store.get_accepted_papers("neurips", 10).await {
//!   Err(PapermashError::InvalidConference(name)) => println!("Unknown conference: {name}"),
//!   Err(e) if e.is_missing_snapshot() => println!("Snapshot not downloaded yet"),
//!   Err(e) => return Err(e),
//!   Ok(papers) => println!("{} accepted papers", papers.len()),
//! }
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

use thiserror::Error;

use crate::clients::Failure;

/// Errors that can occur when resolving papers.
#[derive(Error, Debug)]
pub enum PapermashError {
  /// The conference name is not one of the recognized snapshots.
  ///
  /// The string parameter holds the rejected input. This is raised before any
  /// file is touched and is never retried.
  #[error("Conference must be either 'icml' or 'iclr', got '{0}'")]
  InvalidConference(String),

  /// The provided source type string couldn't be parsed.
  #[error("Invalid source type '{0}', see `papermash::paper::Source`")]
  InvalidSource(String),

  /// A single network request failed.
  ///
  /// This covers timeouts, refused connections, TLS failures and non-success
  /// HTTP statuses other than a rate-limit signal.
  #[error(transparent)]
  Network(#[from] reqwest::Error),

  /// Every attempt of a resilient call failed.
  ///
  /// `last_error` describes the failure of the final attempt.
  #[error("Request to '{endpoint}' failed after {attempts} attempts: {last_error}")]
  RetriesExhausted {
    /// The endpoint the call was addressed to
    endpoint:     String,
    /// How many attempts were made
    attempts:     u32,
    /// How the final attempt failed
    last_failure: Failure,
    /// Description of the last underlying failure
    last_error:   String,
  },

  /// An API returned a payload that could not be decoded.
  #[error("API error: {0}")]
  ApiError(String),

  /// Failed to parse a URL.
  #[error(transparent)]
  InvalidUrl(#[from] url::ParseError),

  /// An async SQLite operation failed.
  #[error(transparent)]
  AsyncSqlite(#[from] tokio_rusqlite::Error),

  /// The snapshot file for a conference does not exist.
  #[error("Snapshot file not found: {}", .0.display())]
  SnapshotNotFound(PathBuf),

  /// A file system operation failed.
  #[error(transparent)]
  Path(#[from] std::io::Error),
}

impl PapermashError {
  /// Checks if this error signals an absent snapshot file.
  ///
  /// The multi-conference aggregation uses this to skip a conference whose
  /// snapshot has not been downloaded while still reporting other failures.
  pub fn is_missing_snapshot(&self) -> bool { matches!(self, PapermashError::SnapshotNotFound(_)) }

  /// Checks if this error is an exhausted call whose last attempt was rate limited.
  pub fn is_rate_limited(&self) -> bool {
    matches!(
      self,
      PapermashError::RetriesExhausted { last_failure: Failure::RateLimited, .. }
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_error_predicates() {
    let missing = PapermashError::SnapshotNotFound(PathBuf::from("data/venues-iclr-2025-v3.db"));
    assert!(missing.is_missing_snapshot());
    assert!(!missing.is_rate_limited());
    assert_eq!(missing.to_string(), "Snapshot file not found: data/venues-iclr-2025-v3.db");

    let limited = PapermashError::RetriesExhausted {
      endpoint:     "paper/search".to_string(),
      attempts:     3,
      last_failure: Failure::RateLimited,
      last_error:   "rate limited (HTTP 429)".to_string(),
    };
    assert!(limited.is_rate_limited());
    assert!(!limited.is_missing_snapshot());
    assert!(limited.to_string().contains("after 3 attempts"));

    let failed = PapermashError::RetriesExhausted {
      endpoint:     "paper/search".to_string(),
      attempts:     3,
      last_failure: Failure::Transport,
      last_error:   "HTTP status server error (503 Service Unavailable)".to_string(),
    };
    assert!(!failed.is_rate_limited());

    let invalid = PapermashError::InvalidConference("neurips".to_string());
    assert!(!invalid.is_missing_snapshot());
    assert!(invalid.to_string().contains("neurips"));
  }
}
