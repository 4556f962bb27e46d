//! A library for resolving the bibliographic identity of academic papers across
//! three independent sources and normalizing them into a single [`Paper`] record:
//!
//! - the arXiv preprint search API ([`ArxivClient`])
//! - the Semantic Scholar citation graph ([`SemanticScholarClient`])
//! - local, read-only SQLite snapshots of conference submissions ([`SnapshotStore`])
//!
//! Network calls go through a shared [`ResilientClient`](clients::ResilientClient)
//! that retries transport failures, backs off on rate limits and paces successful
//! requests according to a [`RetryPolicy`].
//!
//! # Example
//! ```rust,no_run
//! use papermash::{ArxivClient, SemanticScholarClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!   // Earliest arXiv submission matching the title and author
//!   let arxiv = ArxivClient::new()?;
//!   if let Some(paper) = arxiv.resolve("Attention Is All You Need", &["Ashish Vaswani"]).await {
//!     println!("arXiv {} first published {:?}", paper.id, paper.published_date);
//!   }
//!
//!   // Best title match on Semantic Scholar and its outbound references
//!   let s2 = SemanticScholarClient::new()?;
//!   if let Some(paper) = s2.search_by_title("Attention Is All You Need").await {
//!     let references = s2.get_references(&paper.id).await;
//!     println!("{} cites {} papers", paper.title, references.len());
//!   }
//!
//!   Ok(())
//! }
//! ```

#![warn(missing_docs, clippy::missing_docs_in_private_items)]
use std::{
  path::{Path, PathBuf},
  str::FromStr,
  time::Duration,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace, warn};
#[cfg(test)] use tracing_test::traced_test;

pub mod clients;
pub mod errors;
pub mod format;
pub mod paper;
pub mod snapshot;

pub use clients::{ArxivClient, RetryPolicy, SemanticScholarClient};
use errors::PapermashError;
pub use paper::{Paper, Source};
pub use snapshot::{Conference, PaperStats, SnapshotStore};
