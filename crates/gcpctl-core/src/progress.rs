//! Operation polling for long-running compute operations
//!
//! Every mutating compute call returns an [`Operation`] that must be polled
//! until it reports `DONE`. [`poll_operation`] does that under a bounded
//! discipline: a fixed interval between polls, a mandatory wall-clock
//! timeout, and an optional cap on the number of polls. PENDING and RUNNING
//! are treated the same. The mutating call itself is never re-issued.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::compute::{ComputeClient, Operation, OperationHandle, OperationStatus};
use crate::error::{CoreError, Result};

/// Interval between polls when none is configured
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Progress events emitted while waiting on an operation
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Polling is about to start
    Started { operation: String },
    /// One status fetch came back non-terminal or terminal
    Polling {
        operation: String,
        status: OperationStatus,
        attempt: u32,
        elapsed: Duration,
    },
    /// Operation finished without error
    Completed {
        operation: String,
        target_id: Option<String>,
    },
    /// Operation finished with an error, or polling gave up
    Failed { operation: String, error: String },
}

/// Callback type for progress updates
///
/// The CLI uses this to drive its spinner.
pub type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send + Sync>;

/// Polling discipline for one operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Wall-clock budget, measured from the first poll
    pub timeout: Duration,
    pub interval: Duration,
    /// Optional cap on the number of status fetches
    pub max_attempts: Option<u32>,
}

impl PollConfig {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

/// Anything that can report the current state of an operation
#[async_trait]
pub trait OperationSource: Send + Sync {
    async fn fetch_operation(&self, handle: &OperationHandle) -> Result<Operation>;
}

#[async_trait]
impl OperationSource for ComputeClient {
    async fn fetch_operation(&self, handle: &OperationHandle) -> Result<Operation> {
        self.operations().get(handle).await
    }
}

/// Poll an operation until it is DONE
///
/// Returns the final operation on success. A DONE operation carrying an
/// error payload becomes [`CoreError::RemoteOperationFailed`] with the
/// payload verbatim. Running out of time or attempts becomes
/// [`CoreError::Timeout`]. Errors from the status fetch are returned
/// immediately.
///
/// # Example
///
/// ```rust,ignore
/// use gcpctl_core::{poll_operation, PollConfig, ProgressEvent};
/// use std::time::Duration;
///
/// let op = client.instances("us-central1-a").insert(&body).await?;
/// let done = poll_operation(
///     &client,
///     &op.handle(),
///     &PollConfig::new(Duration::from_secs(300)),
///     Some(&(Box::new(|event| {
///         if let ProgressEvent::Polling { status, elapsed, .. } = event {
///             println!("{} ({:.0}s)", status, elapsed.as_secs());
///         }
///     }) as _)),
/// )
/// .await?;
/// ```
pub async fn poll_operation<S>(
    source: &S,
    handle: &OperationHandle,
    config: &PollConfig,
    on_progress: Option<&ProgressCallback>,
) -> Result<Operation>
where
    S: OperationSource + ?Sized,
{
    let operation = handle.operation_id.clone();
    let start = Instant::now();
    let mut attempt: u32 = 0;

    debug!(
        "Waiting for operation {} (timeout {:?}, interval {:?})",
        handle, config.timeout, config.interval
    );
    emit(
        on_progress,
        ProgressEvent::Started {
            operation: operation.clone(),
        },
    );

    loop {
        attempt += 1;
        let result = match source.fetch_operation(handle).await {
            Ok(result) => result,
            Err(e) => {
                emit(
                    on_progress,
                    ProgressEvent::Failed {
                        operation: operation.clone(),
                        error: e.to_string(),
                    },
                );
                return Err(e);
            }
        };
        let elapsed = start.elapsed();

        trace!(
            "Operation {} poll {}: {} after {:?}",
            operation, attempt, result.status, elapsed
        );
        emit(
            on_progress,
            ProgressEvent::Polling {
                operation: operation.clone(),
                status: result.status,
                attempt,
                elapsed,
            },
        );

        if result.status.is_done() {
            if let Some(errors) = result.errors() {
                let err = CoreError::RemoteOperationFailed {
                    operation: operation.clone(),
                    errors: errors.to_vec(),
                };
                warn!("{}", err);
                emit(
                    on_progress,
                    ProgressEvent::Failed {
                        operation,
                        error: err.to_string(),
                    },
                );
                return Err(err);
            }

            debug!(
                "Operation {} done after {} poll(s) in {:?}",
                operation, attempt, elapsed
            );
            emit(
                on_progress,
                ProgressEvent::Completed {
                    operation,
                    target_id: result.target_id.clone(),
                },
            );
            return Ok(result);
        }

        let out_of_attempts = config.max_attempts.is_some_and(|max| attempt >= max);
        if elapsed >= config.timeout || out_of_attempts {
            let err = CoreError::Timeout {
                operation: operation.clone(),
                elapsed,
                attempts: attempt,
            };
            warn!("{}", err);
            emit(
                on_progress,
                ProgressEvent::Failed {
                    operation,
                    error: err.to_string(),
                },
            );
            return Err(err);
        }

        tokio::time::sleep(config.interval).await;
    }
}

fn emit(callback: Option<&ProgressCallback>, event: ProgressEvent) {
    if let Some(cb) = callback {
        cb(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::{OperationError, OperationErrorDetail};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Replays a fixed sequence of statuses; the last one repeats forever
    struct Scripted {
        statuses: Mutex<VecDeque<Result<Operation>>>,
        fetches: Mutex<u32>,
    }

    impl Scripted {
        fn new(statuses: Vec<Result<Operation>>) -> Self {
            Self {
                statuses: Mutex::new(statuses.into()),
                fetches: Mutex::new(0),
            }
        }

        fn fetches(&self) -> u32 {
            *self.fetches.lock().unwrap()
        }
    }

    #[async_trait]
    impl OperationSource for Scripted {
        async fn fetch_operation(&self, _handle: &OperationHandle) -> Result<Operation> {
            *self.fetches.lock().unwrap() += 1;
            let mut statuses = self.statuses.lock().unwrap();
            if statuses.len() > 1 {
                statuses.pop_front().unwrap()
            } else {
                match statuses.front().unwrap() {
                    Ok(op) => Ok(op.clone()),
                    Err(_) => statuses.pop_front().unwrap(),
                }
            }
        }
    }

    fn op(status: OperationStatus) -> Operation {
        serde_json::from_value(serde_json::json!({
            "name": "operation-1",
            "status": status.to_string(),
            "zone": "https://www.googleapis.com/compute/v1/projects/demo/zones/us-central1-a",
            "targetId": "123456",
        }))
        .unwrap()
    }

    fn failed_op(code: &str, message: &str) -> Operation {
        let mut op = op(OperationStatus::Done);
        op.error = Some(OperationError {
            errors: vec![OperationErrorDetail {
                code: code.to_string(),
                message: Some(message.to_string()),
                location: None,
            }],
        });
        op
    }

    fn handle() -> OperationHandle {
        OperationHandle::zonal("operation-1", "us-central1-a")
    }

    #[tokio::test(start_paused = true)]
    async fn test_completes_after_running() {
        let source = Scripted::new(vec![
            Ok(op(OperationStatus::Pending)),
            Ok(op(OperationStatus::Running)),
            Ok(op(OperationStatus::Done)),
        ]);
        let config = PollConfig::new(Duration::from_secs(60));

        let start = Instant::now();
        let done = poll_operation(&source, &handle(), &config, None).await.unwrap();

        assert_eq!(done.status, OperationStatus::Done);
        assert_eq!(done.target_id.as_deref(), Some("123456"));
        assert_eq!(source.fetches(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_done_with_error_is_remote_failure() {
        let source = Scripted::new(vec![
            Ok(op(OperationStatus::Running)),
            Ok(failed_op("400", "resource in use")),
        ]);
        let config = PollConfig::new(Duration::from_secs(60));

        let err = poll_operation(&source, &handle(), &config, None)
            .await
            .unwrap_err();
        match err {
            CoreError::RemoteOperationFailed { operation, errors } => {
                assert_eq!(operation, "operation-1");
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].code, "400");
                assert_eq!(errors[0].message.as_deref(), Some("resource in use"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let source = Scripted::new(vec![Ok(op(OperationStatus::Running))]);
        let config = PollConfig::new(Duration::from_secs(5)).with_interval(Duration::from_secs(2));

        let err = poll_operation(&source, &handle(), &config, None)
            .await
            .unwrap_err();
        match err {
            CoreError::Timeout {
                elapsed, attempts, ..
            } => {
                assert!(elapsed >= Duration::from_secs(5));
                assert_eq!(attempts, 4);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_cap() {
        let source = Scripted::new(vec![Ok(op(OperationStatus::Running))]);
        let config = PollConfig::new(Duration::from_secs(3600)).with_max_attempts(3);

        let err = poll_operation(&source, &handle(), &config, None)
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(source.fetches(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_surfaces_immediately() {
        let source = Scripted::new(vec![
            Ok(op(OperationStatus::Running)),
            Err(CoreError::Transport {
                status: Some(503),
                message: "backend unavailable".to_string(),
            }),
            Ok(op(OperationStatus::Done)),
        ]);
        let config = PollConfig::new(Duration::from_secs(60));

        let err = poll_operation(&source, &handle(), &config, None)
            .await
            .unwrap_err();
        assert!(err.is_server_error());
        assert_eq!(source.fetches(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_events() {
        let source = Scripted::new(vec![
            Ok(op(OperationStatus::Running)),
            Ok(op(OperationStatus::Done)),
        ]);
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let callback: ProgressCallback = Box::new(move |event| {
            sink.lock().unwrap().push(event);
        });

        poll_operation(
            &source,
            &handle(),
            &PollConfig::new(Duration::from_secs(60)),
            Some(&callback),
        )
        .await
        .unwrap();

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], ProgressEvent::Started { .. }));
        assert!(matches!(
            events[1],
            ProgressEvent::Polling {
                status: OperationStatus::Running,
                attempt: 1,
                ..
            }
        ));
        assert!(matches!(
            events[2],
            ProgressEvent::Polling {
                status: OperationStatus::Done,
                attempt: 2,
                ..
            }
        ));
        match &events[3] {
            ProgressEvent::Completed { target_id, .. } => {
                assert_eq!(target_id.as_deref(), Some("123456"))
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_poll_config_defaults() {
        let config = PollConfig::new(Duration::from_secs(10));
        assert_eq!(config.interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(config.max_attempts, None);
    }
}
