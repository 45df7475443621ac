//! Server readiness polling
//!
//! The UI under test is often started alongside the test run, so the first
//! navigation has to wait until something answers HTTP. Any response counts,
//! whatever its status code; connection failures are retried until the
//! deadline. Running out of time is reported as a value so the caller can
//! decide to carry on and let navigation fail on its own.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{UxError, UxResult};

/// Delay policy between readiness attempts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Backoff {
    /// Same delay after every attempt
    Fixed { interval_ms: u64 },

    /// `initial_ms * multiplier^(attempt - 1)`, capped at `max_ms`
    Exponential {
        initial_ms: u64,
        max_ms: u64,
        multiplier: u32,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::Fixed { interval_ms: 2_000 }
    }
}

impl Backoff {
    /// Delay to sleep after the given (1-based) attempt
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::Fixed { interval_ms } => Duration::from_millis(interval_ms),
            Backoff::Exponential {
                initial_ms,
                max_ms,
                multiplier,
            } => {
                let exponent = attempt.saturating_sub(1);
                let factor = u64::from(multiplier).saturating_pow(exponent);
                Duration::from_millis(initial_ms.saturating_mul(factor).min(max_ms))
            }
        }
    }
}

/// Readiness polling settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// Poll before navigating at all
    pub enabled: bool,

    /// Stop polling after this long (milliseconds)
    pub max_wait_ms: u64,

    /// Per-request timeout (milliseconds)
    pub request_timeout_ms: u64,

    pub backoff: Backoff,

    /// Ignore `HTTP_PROXY`-style variables and connect directly
    pub no_proxy: bool,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_wait_ms: 4 * 60 * 1000,
            request_timeout_ms: 5_000,
            backoff: Backoff::default(),
            no_proxy: false,
        }
    }
}

impl ReadinessConfig {
    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }

    pub fn validate(&self) -> UxResult<()> {
        if self.request_timeout_ms == 0 {
            return Err(UxError::InvalidConfig(
                "readiness.request_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if let Backoff::Exponential { multiplier: 0, .. } = self.backoff {
            return Err(UxError::InvalidConfig(
                "readiness.backoff.multiplier must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Outcome of a readiness poll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Readiness {
    /// The server answered; `status` is whatever it returned
    Ready {
        attempts: u32,
        status: u16,
        elapsed_ms: u64,
    },

    /// The deadline passed without any response
    TimedOut { attempts: u32, elapsed_ms: u64 },

    /// Polling was disabled for this run
    Skipped,
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready { .. })
    }
}

/// Polls a URL with `HEAD` requests until it answers or time runs out
pub struct ReadinessPoller {
    client: reqwest::Client,
    backoff: Backoff,
    max_wait: Duration,
}

impl ReadinessPoller {
    pub fn new(config: &ReadinessConfig) -> UxResult<Self> {
        config.validate()?;
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .redirect(reqwest::redirect::Policy::limited(10));
        if config.no_proxy {
            builder = builder.no_proxy();
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            backoff: config.backoff.clone(),
            max_wait: config.max_wait(),
        })
    }

    /// Poll `url` until it responds or the maximum wait elapses.
    ///
    /// Transport failures are retried, including peers that accept the
    /// connection and hang up before answering. Any other client
    /// error (a malformed URL, a redirect loop) is returned immediately.
    pub async fn wait_for(&self, url: &str) -> UxResult<Readiness> {
        let start = Instant::now();
        let mut attempts: u32 = 0;

        loop {
            attempts = attempts.saturating_add(1);

            match self.client.head(url).send().await {
                Ok(resp) => {
                    let elapsed = start.elapsed();
                    info!(
                        "{} responded with {} after {} attempt(s) ({} ms)",
                        url,
                        resp.status(),
                        attempts,
                        elapsed.as_millis()
                    );
                    return Ok(Readiness::Ready {
                        attempts,
                        status: resp.status().as_u16(),
                        elapsed_ms: elapsed.as_millis() as u64,
                    });
                }
                Err(e) if is_transport_error(&e) => {
                    if attempts == 1 {
                        info!("Waiting for {} to come up...", url);
                    }
                    debug!("Readiness attempt {} failed: {}", attempts, e);
                }
                Err(e) => return Err(e.into()),
            }

            let elapsed = start.elapsed();
            if elapsed >= self.max_wait {
                warn!(
                    "{} did not respond within {:?} ({} attempts); continuing anyway",
                    url, self.max_wait, attempts
                );
                return Ok(Readiness::TimedOut {
                    attempts,
                    elapsed_ms: elapsed.as_millis() as u64,
                });
            }

            let remaining = self.max_wait - elapsed;
            sleep(self.backoff.delay(attempts).min(remaining)).await;
        }
    }
}

/// Whether `e` came from the connection rather than from building the request
/// or following redirects
fn is_transport_error(e: &reqwest::Error) -> bool {
    if e.is_builder() || e.is_redirect() {
        return false;
    }
    e.is_connect() || e.is_timeout() || e.is_request()
}
