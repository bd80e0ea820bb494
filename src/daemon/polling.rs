use crate::core::failures::FailureTracker;
use crate::core::models::{CycleReport, PollOutcome};
use crate::http::{Headers, HttpClient};
use crate::oauth::AccessTokenProvider;
use futures::FutureExt;
use reqwest::StatusCode;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Refreshes the access token and polls every endpoint once per interval.
pub struct PollScheduler {
    tokens: Arc<dyn AccessTokenProvider>,
    http: HttpClient,
    endpoints: Vec<String>,
    interval: Duration,
    refresh_failures: FailureTracker,
}

impl PollScheduler {
    pub fn new(
        tokens: Arc<dyn AccessTokenProvider>,
        http: HttpClient,
        endpoints: Vec<String>,
        interval: Duration,
    ) -> Self {
        Self {
            tokens,
            http,
            endpoints,
            interval,
            refresh_failures: FailureTracker::new(),
        }
    }

    /// One refresh followed by a GET against each endpoint, in order.
    ///
    /// Every endpoint is attempted even when the refresh or an earlier
    /// endpoint fails.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let token = self.tokens.access_token().await;
        self.track_refresh(token.is_some());

        let mut headers = Headers::new();
        headers.insert(
            "Authorization".to_string(),
            format!("Bearer {}", token.as_deref().unwrap_or_default()),
        );

        let mut report = CycleReport::new(token.is_some());
        for url in &self.endpoints {
            let outcome = match self.http.get_status(url, &headers).await {
                Ok(status) => {
                    if status == StatusCode::OK {
                        tracing::info!(%url, status = status.as_u16(), "Endpoint call succeeded");
                    } else {
                        tracing::debug!(%url, status = status.as_u16(), "Endpoint returned non-OK status");
                    }
                    PollOutcome::from_status(url, status)
                }
                Err(e) => {
                    tracing::warn!(%url, error = %e, kind = %e.kind(), "Endpoint call failed");
                    PollOutcome::from_error(url, e.to_string())
                }
            };
            report.outcomes.push(outcome);
        }

        report
    }

    fn track_refresh(&mut self, acquired: bool) {
        if acquired {
            let previous = self.refresh_failures.record_success();
            if previous > 0 {
                tracing::info!(previous_failures = previous, "Token refresh recovered");
            }
        } else {
            let failures = self.refresh_failures.record_failure();
            tracing::warn!(
                consecutive_failures = failures,
                "No access token this cycle, calling endpoints with an empty bearer"
            );
        }
    }

    /// Runs cycles until `cancel` fires. A message on `wake` starts the next
    /// cycle without waiting out the interval.
    pub async fn run(
        mut self,
        cancel: CancellationToken,
        mut wake: Option<mpsc::UnboundedReceiver<()>>,
    ) {
        tracing::info!(
            endpoints = self.endpoints.len(),
            interval_ms = self.interval.as_millis() as u64,
            "Poll scheduler started"
        );

        while !cancel.is_cancelled() {
            match AssertUnwindSafe(self.run_cycle()).catch_unwind().await {
                Ok(report) => tracing::debug!(
                    token_acquired = report.token_acquired,
                    succeeded = report.succeeded(),
                    failed = report.failed(),
                    "Poll cycle finished"
                ),
                Err(panic) => tracing::error!(
                    panic = %panic_message(panic.as_ref()),
                    "Poll cycle panicked, continuing on schedule"
                ),
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
                received = next_wake(&mut wake) => {
                    if received.is_some() {
                        tracing::info!("Refresh token changed on disk, polling early");
                    } else {
                        tracing::debug!("Token watcher closed");
                        wake = None;
                    }
                }
            }
        }

        tracing::info!("Poll scheduler stopped");
    }
}

async fn next_wake(wake: &mut Option<mpsc::UnboundedReceiver<()>>) -> Option<()> {
    match wake {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
