//! Error types for the papermash CLI application.
//!
//! The errors are transparent so the underlying library or IO message is what
//! the user sees.

use thiserror::Error;

/// Errors that can occur during CLI operations.
#[derive(Error, Debug)]
pub enum PapermashCliError {
  /// Errors from the underlying papermash library
  #[error(transparent)]
  Papermash(#[from] papermash::errors::PapermashError),

  /// Writing output failed
  #[error(transparent)]
  IO(#[from] std::io::Error),

  /// Serializing records as JSON failed
  #[error(transparent)]
  Json(#[from] serde_json::Error),
}
