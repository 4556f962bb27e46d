//! Retrying HTTP transport shared by the network clients.
//!
//! A logical call moves through a small state machine:
//!
//! ```text
//! Attempting(n) ─┬─ 2xx ──────────────► Success (after the politeness delay)
//!                ├─ 429 ──────────────► Attempting(n + 1) after base_delay * n
//!                └─ transport failure ► Attempting(n + 1) after base_delay
//!                                       or Exhausted once n == max_attempts
//! ```
//!
//! [`RetryPolicy`] holds the parameters and decides each transition;
//! [`ResilientClient`] drives it. Attempts never overlap: each one is awaited
//! to completion before the next is considered.

use reqwest::{
  header::{HeaderMap, HeaderName, HeaderValue},
  StatusCode,
};
use tokio::time::sleep;
use url::Url;

use super::*;

/// How a single attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
  /// The server answered HTTP 429
  RateLimited,
  /// Timeout, connection error, or any other non-success status
  Transport,
}

/// Retry, backoff and pacing parameters for a [`ResilientClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
  /// Attempts per logical call, including the first one
  pub max_attempts:     u32,
  /// Wait after a transport failure, and the unit of rate-limit backoff
  pub base_delay:       Duration,
  /// Pause after every successful call before returning to the caller
  pub politeness_delay: Duration,
  /// Upper bound on a single attempt
  pub timeout:          Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts:     3,
      base_delay:       Duration::from_secs(2),
      politeness_delay: Duration::from_millis(100),
      timeout:          Duration::from_secs(30),
    }
  }
}

impl RetryPolicy {
  /// Pacing for the arXiv API, which asks for no more than one request every three seconds.
  pub fn arxiv() -> Self {
    Self {
      base_delay: Duration::from_secs(3),
      politeness_delay: Duration::from_secs(3),
      ..Self::default()
    }
  }

  /// Pacing for the unauthenticated Semantic Scholar graph API.
  pub fn semantic_scholar() -> Self { Self::default() }

  /// Sets the number of attempts per call.
  pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
    self.max_attempts = max_attempts;
    self
  }

  /// Sets the base backoff delay.
  pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
    self.base_delay = base_delay;
    self
  }

  /// Sets the pause applied after each successful call.
  pub fn with_politeness_delay(mut self, politeness_delay: Duration) -> Self {
    self.politeness_delay = politeness_delay;
    self
  }

  /// Sets the per-attempt timeout.
  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  /// Effective attempt ceiling; a call is always tried at least once.
  pub fn attempts(&self) -> u32 { self.max_attempts.max(1) }

  /// Decides what follows a failed attempt.
  ///
  /// `attempt` is 1-based. Returns the delay to wait before the next attempt, or
  /// `None` once the ceiling is reached. Rate-limit waits grow linearly with the
  /// attempt number; transport failures always wait `base_delay`.
  pub fn backoff(&self, attempt: u32, failure: Failure) -> Option<Duration> {
    if attempt >= self.attempts() {
      return None;
    }
    match failure {
      Failure::RateLimited => Some(self.base_delay * attempt),
      Failure::Transport => Some(self.base_delay),
    }
  }
}

/// Result of one attempt.
enum Outcome {
  /// A 2xx response body
  Success(String),
  /// The attempt failed; the error is kept for the exhaustion report
  Failed(Failure, PapermashError),
}

/// An HTTP GET issuer that retries according to a [`RetryPolicy`].
///
/// The client does not interpret response bodies; it only distinguishes
/// success, rate limiting and transport failure.
#[derive(Debug, Clone)]
pub struct ResilientClient {
  /// Internal web client used to connect to the API.
  client:   reqwest::Client,
  /// Short name used in log events, e.g. `"arxiv"`.
  name:     &'static str,
  /// URL every endpoint is resolved against.
  base_url: String,
  /// Headers sent with every request.
  headers:  HeaderMap,
  /// Retry and pacing parameters.
  policy:   RetryPolicy,
}

impl ResilientClient {
  /// Creates a client that identifies itself with `user_agent`.
  pub fn new(
    name: &'static str,
    base_url: impl Into<String>,
    user_agent: &str,
    policy: RetryPolicy,
  ) -> Result<Self, PapermashError> {
    Ok(Self {
      client: reqwest::Client::builder().user_agent(user_agent).build()?,
      name,
      base_url: base_url.into(),
      headers: HeaderMap::new(),
      policy,
    })
  }

  /// Replaces the base URL endpoints are resolved against.
  pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
    self.base_url = base_url.into();
    self
  }

  /// Replaces the retry policy.
  pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
    self.policy = policy;
    self
  }

  /// Adds a header sent with every request, e.g. an API key.
  pub fn with_header(mut self, name: &'static str, value: &str) -> Result<Self, PapermashError> {
    let value = HeaderValue::from_str(value)
      .map_err(|e| PapermashError::ApiError(format!("Invalid value for header {name}: {e}")))?;
    self.headers.insert(HeaderName::from_static(name), value);
    Ok(self)
  }

  /// The policy in effect.
  pub fn policy(&self) -> &RetryPolicy { &self.policy }

  /// The base URL in effect.
  pub fn base_url(&self) -> &str { &self.base_url }

  /// Resolves `endpoint` against the base URL. An empty endpoint is the base URL itself.
  pub fn endpoint_url(&self, endpoint: &str) -> Result<Url, PapermashError> {
    let endpoint = endpoint.trim_matches('/');
    if endpoint.is_empty() {
      return Ok(Url::parse(&self.base_url)?);
    }
    Ok(Url::parse(&format!("{}/{}", self.base_url.trim_end_matches('/'), endpoint))?)
  }

  /// Issues a GET to `endpoint` with `params` as the query string and returns the body.
  ///
  /// Transport failures and rate-limit responses are retried as the policy dictates.
  /// After a success the politeness delay elapses before this returns. When every
  /// attempt fails the result is [`PapermashError::RetriesExhausted`] describing
  /// the last failure; partial results are never returned.
  pub async fn call(
    &self,
    endpoint: &str,
    params: &[(&str, String)],
  ) -> Result<String, PapermashError> {
    let url = self.endpoint_url(endpoint)?;
    let max_attempts = self.policy.attempts();
    debug!(source = self.name, endpoint, ?params, "Making request to {url}");

    let mut attempt = 1;
    loop {
      let (failure, error) = match self.attempt(&url, params).await {
        Outcome::Success(body) => {
          debug!(source = self.name, endpoint, attempt, bytes = body.len(), "Request succeeded");
          sleep(self.policy.politeness_delay).await;
          return Ok(body);
        },
        Outcome::Failed(failure, error) => (failure, error),
      };

      match self.policy.backoff(attempt, failure) {
        Some(delay) => {
          match failure {
            Failure::RateLimited => warn!(
              source = self.name,
              endpoint,
              attempt,
              max_attempts,
              delay_ms = delay.as_millis() as u64,
              "Rate limited, backing off"
            ),
            Failure::Transport => warn!(
              source = self.name,
              endpoint,
              attempt,
              max_attempts,
              delay_ms = delay.as_millis() as u64,
              "Attempt failed: {error}"
            ),
          }
          sleep(delay).await;
          attempt += 1;
        },
        None => {
          error!(
            source = self.name,
            endpoint,
            attempts = attempt,
            "Request failed after {attempt} attempts: {error}"
          );
          return Err(PapermashError::RetriesExhausted {
            endpoint:     endpoint.to_string(),
            attempts:     attempt,
            last_failure: failure,
            last_error:   error.to_string(),
          });
        },
      }
    }
  }

  /// Performs exactly one request and classifies its outcome.
  async fn attempt(&self, url: &Url, params: &[(&str, String)]) -> Outcome {
    let response = match self
      .client
      .get(url.clone())
      .headers(self.headers.clone())
      .timeout(self.policy.timeout)
      .query(params)
      .send()
      .await
    {
      Ok(response) => response,
      Err(e) => return Outcome::Failed(Failure::Transport, e.into()),
    };

    let status = response.status();
    debug!(source = self.name, status = status.as_u16(), "Response status");

    if status == StatusCode::TOO_MANY_REQUESTS {
      return Outcome::Failed(
        Failure::RateLimited,
        PapermashError::ApiError("rate limited (HTTP 429)".to_string()),
      );
    }

    let response = match response.error_for_status() {
      Ok(response) => response,
      Err(e) => return Outcome::Failed(Failure::Transport, e.into()),
    };

    match response.text().await {
      Ok(body) => {
        trace!(source = self.name, "Response body: {body}");
        Outcome::Success(body)
      },
      Err(e) => Outcome::Failed(Failure::Transport, e.into()),
    }
  }
}
