//! Poll loop for remote enhancement jobs.

use pixlift_core::{AppError, EnhancementJob, JobStatus, ReplicateConfig};
use std::time::{Duration, Instant};
use tokio::time::sleep;

use crate::replicate::ImageEnhancer;

/// Fixed-interval polling budget. No backoff, no jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl From<&ReplicateConfig> for PollPolicy {
    fn from(config: &ReplicateConfig) -> Self {
        Self {
            interval: config.poll_interval,
            max_attempts: config.poll_max_attempts,
        }
    }
}

/// Poll `job` until it reaches a terminal state, returning the output URL.
///
/// The first request goes out immediately; every non-terminal observation is followed by one
/// interval of sleep, so a timeout is never reported before `max_attempts * interval`.
pub async fn wait_for_output(
    enhancer: &dyn ImageEnhancer,
    job: &EnhancementJob,
    policy: &PollPolicy,
) -> Result<String, AppError> {
    let start = Instant::now();

    for attempt in 1..=policy.max_attempts {
        let snapshot = enhancer.fetch_job(job).await?;

        if !snapshot.status.is_terminal() {
            if snapshot.status == JobStatus::Unknown {
                tracing::warn!(
                    prediction_id = %job.id,
                    attempt = attempt,
                    "Unknown prediction status"
                );
            } else {
                tracing::debug!(
                    prediction_id = %job.id,
                    attempt = attempt,
                    status = %snapshot.status,
                    "Waiting for Replicate prediction to complete"
                );
            }
            sleep(policy.interval).await;
            continue;
        }

        if snapshot.status == JobStatus::Succeeded {
            let output = snapshot.output.ok_or_else(|| {
                AppError::InvalidServiceResponse(format!(
                    "Prediction {} succeeded without an output URL",
                    job.id
                ))
            })?;
            tracing::info!(
                prediction_id = %job.id,
                attempts = attempt,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Replicate prediction completed successfully"
            );
            return Ok(output);
        }

        // Failed or canceled
        let reason = snapshot.error.unwrap_or_else(|| {
            if snapshot.status == JobStatus::Canceled {
                "Prediction was canceled".to_string()
            } else {
                "Unknown error".to_string()
            }
        });
        tracing::warn!(
            prediction_id = %job.id,
            status = %snapshot.status,
            reason = %reason,
            attempts = attempt,
            "Replicate prediction did not succeed"
        );
        return Err(AppError::EnhancementFailed {
            job_id: job.id.clone(),
            reason,
        });
    }

    let elapsed_ms = start.elapsed().as_millis() as u64;
    tracing::warn!(
        prediction_id = %job.id,
        attempts = policy.max_attempts,
        elapsed_ms,
        "Replicate prediction timed out"
    );

    Err(AppError::EnhancementTimeout {
        attempts: policy.max_attempts,
        elapsed_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use pixlift_core::JobSnapshot;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Replays scripted snapshots; repeats the last one once the script runs out.
    struct ScriptedEnhancer {
        script: Mutex<VecDeque<JobSnapshot>>,
        last: Mutex<Option<JobSnapshot>>,
        polls: AtomicU32,
    }

    impl ScriptedEnhancer {
        fn new(script: Vec<JobSnapshot>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                last: Mutex::new(None),
                polls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl ImageEnhancer for ScriptedEnhancer {
        async fn submit(&self, _png: &Bytes) -> Result<EnhancementJob, AppError> {
            unreachable!("poll tests never submit")
        }

        async fn fetch_job(&self, _job: &EnhancementJob) -> Result<JobSnapshot, AppError> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            let mut last = self.last.lock().unwrap();
            if let Some(snapshot) = next {
                *last = Some(snapshot);
            }
            Ok(last.clone().expect("script must not be empty"))
        }
    }

    fn snapshot(status: JobStatus) -> JobSnapshot {
        JobSnapshot {
            status,
            output: None,
            error: None,
        }
    }

    fn job() -> EnhancementJob {
        EnhancementJob {
            id: "abc".to_string(),
            poll_url: "http://replicate.test/predictions/abc".to_string(),
        }
    }

    fn policy(interval_ms: u64, max_attempts: u32) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(interval_ms),
            max_attempts,
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_processing() {
        let enhancer = ScriptedEnhancer::new(vec![
            snapshot(JobStatus::Queued),
            snapshot(JobStatus::Processing),
            JobSnapshot {
                status: JobStatus::Succeeded,
                output: Some("https://example/out.png".to_string()),
                error: None,
            },
        ]);

        let url = wait_for_output(&enhancer, &job(), &policy(5, 10))
            .await
            .unwrap();
        assert_eq!(url, "https://example/out.png");
        assert_eq!(enhancer.polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_failed_job_stops_polling_immediately() {
        let enhancer = ScriptedEnhancer::new(vec![
            snapshot(JobStatus::Processing),
            JobSnapshot {
                status: JobStatus::Failed,
                output: None,
                error: Some("CUDA out of memory".to_string()),
            },
        ]);

        let err = wait_for_output(&enhancer, &job(), &policy(5, 10))
            .await
            .unwrap_err();
        match err {
            AppError::EnhancementFailed { job_id, reason } => {
                assert_eq!(job_id, "abc");
                assert_eq!(reason, "CUDA out of memory");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(enhancer.polls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_canceled_job_is_a_failure() {
        let enhancer = ScriptedEnhancer::new(vec![snapshot(JobStatus::Canceled)]);
        let err = wait_for_output(&enhancer, &job(), &policy(5, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EnhancementFailed { .. }));
        assert_eq!(enhancer.polls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_times_out_no_earlier_than_budget() {
        let enhancer = ScriptedEnhancer::new(vec![snapshot(JobStatus::Processing)]);
        let start = Instant::now();

        let err = wait_for_output(&enhancer, &job(), &policy(20, 3))
            .await
            .unwrap_err();

        assert!(start.elapsed() >= Duration::from_millis(60));
        assert!(matches!(
            err,
            AppError::EnhancementTimeout { attempts: 3, .. }
        ));
        assert_eq!(enhancer.polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_succeeded_without_output_is_invalid_response() {
        let enhancer = ScriptedEnhancer::new(vec![snapshot(JobStatus::Succeeded)]);
        let err = wait_for_output(&enhancer, &job(), &policy(5, 3))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidServiceResponse(_)));
    }
}
