//! Wait - Poll a remote object until an asynchronous operation settles
//!
//! Remote services often accept a create or update request and finish the
//! work in the background. [`wait_for`] fetches the object repeatedly until
//! its status leaves the in-progress states, reports a failure, disappears,
//! or the maximum wait elapses.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{Instant, sleep};

/// Default interval between two status requests
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default upper bound for a single wait
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(5 * 60);

/// Timing of a wait loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitConfig {
    pub poll_interval: Duration,
    pub max_wait: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_wait: DEFAULT_MAX_WAIT,
        }
    }
}

impl WaitConfig {
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// Classification of a fetched status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    /// The object is stable, stop waiting
    Ready,
    /// Still working; carries the observed status for logging
    Pending(String),
    /// The remote operation failed; carries the observed status
    Failed(String),
}

/// Terminal outcomes of a wait other than success
#[derive(Debug, Error)]
pub enum WaitError<E> {
    #[error("{target} does not exist")]
    NotFound { target: String },

    #[error("operation failed ({target}): {status}")]
    Failed { target: String, status: String },

    #[error("timeout while waiting for {target} after {waited:?}, last status: {status}")]
    TimedOut {
        target: String,
        waited: Duration,
        status: String,
    },

    #[error("status request failed ({target}): {source}")]
    Fetch {
        target: String,
        #[source]
        source: E,
    },
}

impl<E> WaitError<E> {
    pub fn is_not_found(&self) -> bool {
        matches!(self, WaitError::NotFound { .. })
    }
}

/// Wait until `classify` reports the fetched object as ready
///
/// `fetch` returns `Ok(None)` when the object does not exist. Only
/// [`Progress::Pending`] is retried; every other outcome ends the loop
/// immediately. Fetches are spaced by `config.poll_interval` and the loop
/// gives up once `config.max_wait` has elapsed.
pub async fn wait_for<T, E, F, Fut, C>(
    target: &str,
    config: &WaitConfig,
    mut fetch: F,
    classify: C,
) -> Result<T, WaitError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
    C: Fn(&T) -> Progress,
{
    let start = Instant::now();
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        let current = match fetch().await {
            Ok(Some(current)) => current,
            Ok(None) => {
                return Err(WaitError::NotFound {
                    target: target.to_string(),
                });
            }
            Err(source) => {
                return Err(WaitError::Fetch {
                    target: target.to_string(),
                    source,
                });
            }
        };

        let status = match classify(&current) {
            Progress::Ready => {
                log::debug!("{} is ready after {} attempt(s)", target, attempt);
                return Ok(current);
            }
            Progress::Failed(status) => {
                return Err(WaitError::Failed {
                    target: target.to_string(),
                    status,
                });
            }
            Progress::Pending(status) => status,
        };

        let waited = start.elapsed();
        if waited >= config.max_wait {
            return Err(WaitError::TimedOut {
                target: target.to_string(),
                waited,
                status,
            });
        }

        log::debug!(
            "{} still in progress (attempt {}, status {}), retrying in {:?}",
            target,
            attempt,
            status,
            config.poll_interval
        );
        sleep(config.poll_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    struct Object {
        status: &'static str,
    }

    #[derive(Debug, Error, PartialEq)]
    #[error("access denied")]
    struct AccessDenied;

    fn classify(object: &Object) -> Progress {
        match object.status {
            "CREATION_IN_PROGRESS" | "UPDATE_IN_PROGRESS" => {
                Progress::Pending(object.status.to_string())
            }
            "CREATION_FAILED" | "UPDATE_FAILED" => Progress::Failed(object.status.to_string()),
            _ => Progress::Ready,
        }
    }

    /// Replays a fixed sequence of fetch results, repeating the last one
    struct Script {
        steps: Mutex<VecDeque<Result<Option<Object>, AccessDenied>>>,
        calls: Cell<usize>,
    }

    impl Script {
        fn new(steps: Vec<Result<Option<Object>, AccessDenied>>) -> Self {
            Self {
                steps: Mutex::new(steps.into()),
                calls: Cell::new(0),
            }
        }

        async fn fetch(&self) -> Result<Option<Object>, AccessDenied> {
            self.calls.set(self.calls.get() + 1);
            let mut steps = self.steps.lock().unwrap();
            if steps.len() > 1 {
                steps.pop_front().unwrap()
            } else {
                steps.front().cloned().unwrap()
            }
        }
    }

    impl Clone for AccessDenied {
        fn clone(&self) -> Self {
            AccessDenied
        }
    }

    fn object(status: &'static str) -> Result<Option<Object>, AccessDenied> {
        Ok(Some(Object { status }))
    }

    #[tokio::test(start_paused = true)]
    async fn stable_status_needs_one_fetch() {
        let script = Script::new(vec![object("CREATION_SUCCESSFUL")]);
        let result = wait_for("ds", &WaitConfig::default(), || script.fetch(), classify).await;

        assert_eq!(result.unwrap().status, "CREATION_SUCCESSFUL");
        assert_eq!(script.calls.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_then_ready() {
        let config = WaitConfig::default();
        let script = Script::new(vec![
            object("CREATION_IN_PROGRESS"),
            object("UPDATE_IN_PROGRESS"),
            object("UPDATE_SUCCESSFUL"),
        ]);
        let start = Instant::now();
        let result = wait_for("ds", &config, || script.fetch(), classify).await;

        assert_eq!(result.unwrap().status, "UPDATE_SUCCESSFUL");
        assert_eq!(script.calls.get(), 3);
        assert_eq!(start.elapsed(), config.poll_interval * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_status_stops_immediately() {
        let script = Script::new(vec![
            object("CREATION_IN_PROGRESS"),
            object("CREATION_FAILED"),
            object("CREATION_SUCCESSFUL"),
        ]);
        let result = wait_for("ds", &WaitConfig::default(), || script.fetch(), classify).await;

        match result {
            Err(WaitError::Failed { target, status }) => {
                assert_eq!(target, "ds");
                assert_eq!(status, "CREATION_FAILED");
            }
            other => panic!("expected Failed, got {:?}", other),
        }
        assert_eq!(script.calls.get(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_after_pending() {
        let script = Script::new(vec![
            object("CREATION_IN_PROGRESS"),
            object("CREATION_IN_PROGRESS"),
            Ok(None),
        ]);
        let result = wait_for("ds", &WaitConfig::default(), || script.fetch(), classify).await;

        assert!(result.unwrap_err().is_not_found());
        assert_eq!(script.calls.get(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_error_is_not_retried() {
        let script = Script::new(vec![Err(AccessDenied), object("CREATION_SUCCESSFUL")]);
        let result = wait_for("ds", &WaitConfig::default(), || script.fetch(), classify).await;

        match result {
            Err(WaitError::Fetch { source, .. }) => assert_eq!(source, AccessDenied),
            other => panic!("expected Fetch, got {:?}", other),
        }
        assert_eq!(script.calls.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_within_one_interval() {
        let config = WaitConfig::default()
            .with_poll_interval(Duration::from_secs(10))
            .with_max_wait(Duration::from_secs(60));
        let script = Script::new(vec![object("CREATION_IN_PROGRESS")]);
        let start = Instant::now();
        let result = wait_for("ds", &config, || script.fetch(), classify).await;

        match result {
            Err(WaitError::TimedOut { waited, status, .. }) => {
                assert!(waited >= config.max_wait);
                assert!(waited < config.max_wait + config.poll_interval);
                assert_eq!(status, "CREATION_IN_PROGRESS");
            }
            other => panic!("expected TimedOut, got {:?}", other),
        }
        assert!(start.elapsed() < config.max_wait + config.poll_interval);
        // fetches at 0, 10, ..., 60 seconds
        assert_eq!(script.calls.get(), 7);
    }
}
