//! Clients for the two network sources.
//!
//! Both clients delegate the HTTP exchange to a [`ResilientClient`], which owns
//! retrying, rate-limit backoff and request pacing as described by a
//! [`RetryPolicy`]. The clients themselves only build queries and normalize
//! responses into [`Paper`] records.
//!
//! # Supported Sources
//!
//! - [`arxiv`] - title/author search against the arXiv Atom API
//! - [`semantic_scholar`] - title search and reference listing against the Semantic Scholar graph
//!
//! # Examples
//!
//! ```no_run
//! use papermash::clients::{ArxivClient, SemanticScholarClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let paper = ArxivClient::new()?.resolve("Attention Is All You Need", &["Ashish Vaswani"]).await;
//!
//! let s2 = SemanticScholarClient::new()?;
//! let references = s2.get_references("204e3073870fae3d05bcbc2f6a8e263d9b72e776").await;
//! # Ok(())
//! # }
//! ```

use quick_xml::de::from_str;

pub mod arxiv;
pub mod retry;
pub mod semantic_scholar;

pub use arxiv::{ArxivClient, SearchQuery};
pub use retry::{Failure, ResilientClient, RetryPolicy};
pub use semantic_scholar::SemanticScholarClient;

use super::*;
