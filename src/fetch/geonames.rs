//! GeoNames country list fetcher
//!
//! One blocking GET per attempt with exponential backoff between attempts.
//! 401, 403 and 404 end the run at once; any other failure is retried
//! until the attempt budget is spent.

use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;

use crate::dataset::Record;
use crate::observability::{log_event_with_fields, Event, Logger};

use super::errors::{FetchError, FetchResult};
use super::table::parse_country_table;
use super::SourceFetcher;

pub const GEONAMES_URL: &str = "https://www.geonames.org/countries/";

const USER_AGENT: &str = concat!("georef/", env!("CARGO_PKG_VERSION"));
const MAX_BACKOFF: Duration = Duration::from_secs(300);

/// Attempt budget and spacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
        }
    }
}

/// Delay before retrying after failed attempt number `attempt` (1-based):
/// `base * 2^(attempt - 1)`, capped at five minutes.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    base.saturating_mul(factor).min(MAX_BACKOFF)
}

/// Whether a failed status is worth another attempt.
pub fn is_retryable_status(status: u16) -> bool {
    !matches!(status, 401 | 403 | 404)
}

enum AttemptError {
    Retry(String),
    GiveUp(u16),
}

/// Fetches and parses the GeoNames country table.
#[derive(Debug, Clone)]
pub struct GeoNamesFetcher {
    url: String,
    policy: RetryPolicy,
    timeout: Duration,
    logger: Logger,
}

impl GeoNamesFetcher {
    pub fn new(url: impl Into<String>, policy: RetryPolicy, timeout: Duration, logger: Logger) -> Self {
        Self {
            url: url.into(),
            policy,
            timeout,
            logger,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn client(&self) -> FetchResult<Client> {
        Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))
    }

    fn attempt(&self, client: &Client) -> Result<String, AttemptError> {
        let resp = client
            .get(&self.url)
            .header("Accept", "text/html,application/xhtml+xml,application/xml")
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .map_err(|e| AttemptError::Retry(format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(classify(status));
        }

        resp.text()
            .map_err(|e| AttemptError::Retry(format!("read body: {e}")))
    }
}

fn classify(status: StatusCode) -> AttemptError {
    if is_retryable_status(status.as_u16()) {
        AttemptError::Retry(format!("HTTP {}", status))
    } else {
        AttemptError::GiveUp(status.as_u16())
    }
}

impl SourceFetcher for GeoNamesFetcher {
    fn fetch(&self) -> FetchResult<Vec<Record>> {
        let client = self.client()?;
        let max_attempts = self.policy.max_attempts.max(1);
        let max_str = max_attempts.to_string();
        let mut last = String::new();

        for attempt in 1..=max_attempts {
            let attempt_str = attempt.to_string();
            log_event_with_fields(
                &self.logger,
                Event::FetchAttempt,
                &[
                    ("attempt", attempt_str.as_str()),
                    ("max_attempts", max_str.as_str()),
                    ("url", self.url.as_str()),
                ],
            );

            match self.attempt(&client) {
                Ok(body) => {
                    let records = parse_country_table(&body)?;
                    let count = records.len().to_string();
                    log_event_with_fields(
                        &self.logger,
                        Event::FetchComplete,
                        &[("records", count.as_str()), ("url", self.url.as_str())],
                    );
                    return Ok(records);
                }
                Err(AttemptError::GiveUp(status)) => {
                    let status_str = status.to_string();
                    log_event_with_fields(
                        &self.logger,
                        Event::FetchFailed,
                        &[("status", status_str.as_str()), ("url", self.url.as_str())],
                    );
                    return Err(FetchError::Status {
                        status,
                        url: self.url.clone(),
                    });
                }
                Err(AttemptError::Retry(reason)) => {
                    if attempt < max_attempts {
                        let delay = backoff_delay(self.policy.base_delay, attempt);
                        let delay_str = delay.as_millis().to_string();
                        self.logger.warn(
                            Event::FetchRetry.as_str(),
                            &[
                                ("attempt", attempt_str.as_str()),
                                ("delay_ms", delay_str.as_str()),
                                ("reason", reason.as_str()),
                            ],
                        );
                        thread::sleep(delay);
                    }
                    last = reason;
                }
            }
        }

        log_event_with_fields(
            &self.logger,
            Event::FetchFailed,
            &[("reason", last.as_str()), ("url", self.url.as_str())],
        );
        Err(FetchError::Exhausted {
            attempts: max_attempts,
            last,
        })
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}
