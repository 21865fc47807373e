//! Background image workers
//!
//! Each image job runs on its own tokio task and reports back to the session
//! with exactly one event, whether it finishes, fails, is cancelled or panics.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::image::{ImageBackend, ImageJob, ImageOutput};

/// Completion notice delivered from a worker to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    ImageFinished(ImageOutput),
    ImageFailed {
        job_id: Uuid,
        prompt: String,
        error: String,
    },
    ImageCancelled {
        job_id: Uuid,
    },
}

impl SessionEvent {
    pub fn job_id(&self) -> Uuid {
        match self {
            SessionEvent::ImageFinished(output) => output.job_id,
            SessionEvent::ImageFailed { job_id, .. } => *job_id,
            SessionEvent::ImageCancelled { job_id } => *job_id,
        }
    }
}

/// Handle to a running image worker
#[derive(Debug)]
pub struct ImageJobHandle {
    pub job_id: Uuid,
    pub token: CancellationToken,
    pub join: JoinHandle<()>,
}

impl ImageJobHandle {
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Stop the worker; it reports `ImageCancelled` instead of its result
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Wait for the worker task to end
    pub async fn wait(self) {
        if let Err(e) = self.join.await {
            warn!(job_id = %self.job_id, error = %e, "Image worker panicked");
        }
    }
}

/// Sends a worker's terminal event
///
/// Dropped without sending (the task panicked or was aborted), it reports a
/// failure so the session never waits on a job that is gone.
struct Reporter {
    job_id: Uuid,
    prompt: String,
    events: Option<mpsc::UnboundedSender<SessionEvent>>,
}

impl Reporter {
    fn send(mut self, event: SessionEvent) {
        if let Some(events) = self.events.take() {
            if events.send(event).is_err() {
                debug!(job_id = %self.job_id, "Session gone; dropping image event");
            }
        }
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        if let Some(events) = self.events.take() {
            warn!(job_id = %self.job_id, "Image worker stopped before reporting");
            let _ = events.send(SessionEvent::ImageFailed {
                job_id: self.job_id,
                prompt: std::mem::take(&mut self.prompt),
                error: "Image worker stopped unexpectedly".to_string(),
            });
        }
    }
}

pub struct ImageWorker;

impl ImageWorker {
    /// Run `job` on a new task and report the outcome on `events`
    pub fn spawn(
        backend: Arc<dyn ImageBackend>,
        job: ImageJob,
        token: CancellationToken,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> ImageJobHandle {
        let job_id = job.id;
        let task_token = token.clone();

        let reporter = Reporter {
            job_id,
            prompt: job.prompt.clone(),
            events: Some(events),
        };

        let join = tokio::spawn(async move {
            debug!(job_id = %job.id, model = %job.model, "Image worker started");

            let result = tokio::select! {
                _ = task_token.cancelled() => None,
                result = backend.generate(&job) => Some(result),
            };

            // Cancellation may have raced with the final response
            let event = match result {
                _ if task_token.is_cancelled() => {
                    debug!(job_id = %job.id, "Image worker cancelled");
                    SessionEvent::ImageCancelled { job_id: job.id }
                }
                Some(Ok(output)) => SessionEvent::ImageFinished(output),
                Some(Err(e)) => {
                    warn!(job_id = %job.id, error = %e, "Image generation failed");
                    SessionEvent::ImageFailed {
                        job_id: job.id,
                        prompt: job.prompt.clone(),
                        error: e.to_string(),
                    }
                }
                None => SessionEvent::ImageCancelled { job_id: job.id },
            };

            reporter.send(event);
        });

        ImageJobHandle {
            job_id,
            token,
            join,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::error::{Error, Result};

    struct FixedBackend {
        urls: Vec<String>,
        delay: Duration,
    }

    #[async_trait]
    impl ImageBackend for FixedBackend {
        async fn generate(&self, job: &ImageJob) -> Result<ImageOutput> {
            tokio::time::sleep(self.delay).await;
            Ok(ImageOutput {
                job_id: job.id,
                prompt: job.prompt.clone(),
                urls: self.urls.clone(),
            })
        }
    }

    struct BrokenBackend;

    #[async_trait]
    impl ImageBackend for BrokenBackend {
        async fn generate(&self, _job: &ImageJob) -> Result<ImageOutput> {
            Err(Error::ImageGenerationError("Prediction failed: NSFW".to_string()))
        }
    }

    #[tokio::test]
    async fn test_worker_delivers_one_finished_event() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let backend = Arc::new(FixedBackend {
            urls: vec!["https://x/a.png".to_string()],
            delay: Duration::ZERO,
        });
        let job = ImageJob::new("m", "a cat");
        let job_id = job.id;

        let handle = ImageWorker::spawn(backend, job, CancellationToken::new(), tx);
        handle.wait().await;

        match rx.recv().await {
            Some(SessionEvent::ImageFinished(output)) => {
                assert_eq!(output.job_id, job_id);
                assert_eq!(output.primary(), Some("https://x/a.png"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
        // Sender dropped with the task: exactly one event
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_worker_delivers_failure() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let job = ImageJob::new("m", "a dog");

        ImageWorker::spawn(Arc::new(BrokenBackend), job, CancellationToken::new(), tx)
            .wait()
            .await;

        match rx.recv().await {
            Some(SessionEvent::ImageFailed { prompt, error, .. }) => {
                assert_eq!(prompt, "a dog");
                assert!(error.contains("NSFW"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_worker_reports_cancellation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let backend = Arc::new(FixedBackend {
            urls: vec!["u".to_string()],
            delay: Duration::from_secs(60),
        });
        let job = ImageJob::new("m", "p");
        let job_id = job.id;

        let handle = ImageWorker::spawn(backend, job, CancellationToken::new(), tx);
        assert!(!handle.is_finished());
        handle.cancel();
        handle.wait().await;

        assert_eq!(rx.recv().await, Some(SessionEvent::ImageCancelled { job_id }));
        assert!(rx.recv().await.is_none());
    }

    struct PanickingBackend;

    #[async_trait]
    impl ImageBackend for PanickingBackend {
        async fn generate(&self, _job: &ImageJob) -> Result<ImageOutput> {
            panic!("backend blew up");
        }
    }

    #[tokio::test]
    async fn test_panicked_worker_reports_failure() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let job = ImageJob::new("m", "a bird");

        ImageWorker::spawn(Arc::new(PanickingBackend), job, CancellationToken::new(), tx)
            .wait()
            .await;

        match rx.recv().await {
            Some(SessionEvent::ImageFailed { prompt, error, .. }) => {
                assert_eq!(prompt, "a bird");
                assert!(error.contains("stopped unexpectedly"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(rx.recv().await.is_none());
    }
}
