//! Session context
//!
//! Everything that lives for the duration of one run of the application:
//! settings, the API key, the last image prompt and URL, the last
//! transformation (for follow-up questions) and the background image worker.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::clipboard::ResultSink;
use crate::config::{Config, Credentials};
use crate::error::{Error, Result};
use crate::image::{ImageBackend, ImageClient, ImageJob, default_output_path, download_to};
use crate::language::LanguageGuard;
use crate::llm::{CompletionBackend, LlmClient};
use crate::operation::Operation;
use crate::transform::{
    TransformationOutcome, TransformationRequest, TransformationResult, Transformer, render_output,
};
use crate::worker::{ImageJobHandle, ImageWorker, SessionEvent};

/// A finished transformation and the text to display for it
#[derive(Debug, Clone)]
pub struct Processed {
    pub outcome: TransformationOutcome,
    pub display: String,
    /// Why the result could not be published, when it could not
    pub publish_error: Option<String>,
}

pub struct Session {
    config: Config,
    credentials: Credentials,
    guard: LanguageGuard,
    last_prompt: Option<String>,
    last_image_url: Option<String>,
    last_result: Option<TransformationResult>,
    image_job: Option<ImageJobHandle>,
    in_flight: usize,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    root_token: CancellationToken,
    http: reqwest::Client,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("api_key", &self.credentials.redacted())
            .field("last_prompt", &self.last_prompt)
            .field("last_image_url", &self.last_image_url)
            .field("in_flight", &self.in_flight)
            .finish()
    }
}

impl Session {
    pub fn new(config: Config, credentials: Credentials) -> Self {
        let guard = LanguageGuard::new(&config.language);
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            config,
            credentials,
            guard,
            last_prompt: None,
            last_image_url: None,
            last_result: None,
            image_job: None,
            in_flight: 0,
            events_tx,
            events_rx,
            root_token: CancellationToken::new(),
            http: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Replace the in-memory API key
    pub fn set_api_key(&mut self, api_key: impl Into<String>) {
        self.credentials.api_key = Some(api_key.into());
    }

    pub fn last_result(&self) -> Option<&TransformationResult> {
        self.last_result.as_ref()
    }

    pub fn last_image_url(&self) -> Option<&str> {
        self.last_image_url.as_deref()
    }

    pub fn current_job(&self) -> Option<&ImageJobHandle> {
        self.image_job.as_ref()
    }

    fn require_api_key(&self) -> Result<String> {
        self.credentials
            .api_key()
            .map(str::to_string)
            .ok_or_else(|| Error::MissingCredential("OpenAI API key".to_string()))
    }

    /// Transform `input` with the configured model and publish the result
    pub async fn process<S>(
        &mut self,
        operation: Operation,
        input: &str,
        sink: &mut S,
    ) -> Result<Processed>
    where
        S: ResultSink + ?Sized,
    {
        if input.trim().is_empty() {
            return Err(Error::MissingInput);
        }

        let api_key = self.require_api_key()?;
        let client = LlmClient::new(self.config.llm.clone(), api_key)?;

        self.process_with(&client, operation, input, sink).await
    }

    /// Same as [`Session::process`] with an explicit completion backend
    pub async fn process_with<B, S>(
        &mut self,
        backend: &B,
        operation: Operation,
        input: &str,
        sink: &mut S,
    ) -> Result<Processed>
    where
        B: CompletionBackend + ?Sized,
        S: ResultSink + ?Sized,
    {
        if input.trim().is_empty() {
            return Err(Error::MissingInput);
        }

        let transformer = Transformer::new(backend, &self.guard, &self.config.llm.model);
        let outcome = transformer
            .transform(TransformationRequest::new(operation, input))
            .await?;

        self.last_result = Some(outcome.result.clone());

        // The result stays usable when the clipboard rejects it
        let (display, publish_error) = match sink.publish(&outcome) {
            Ok(display) => (display, None),
            Err(e) => {
                debug!(error = %e, "Result not published");
                (render_output(&outcome.result), Some(e.to_string()))
            }
        };

        Ok(Processed {
            outcome,
            display,
            publish_error,
        })
    }

    /// Ask a question about the last transformation
    pub async fn ask(&mut self, question: &str) -> Result<String> {
        if self.last_result.is_none() {
            return Err(Error::NoPreviousResult);
        }

        let api_key = self.require_api_key()?;
        let client = LlmClient::new(self.config.llm.clone(), api_key)?;

        self.ask_with(&client, question).await
    }

    pub async fn ask_with<B>(&mut self, backend: &B, question: &str) -> Result<String>
    where
        B: CompletionBackend + ?Sized,
    {
        let result = self.last_result.as_ref().ok_or(Error::NoPreviousResult)?;
        let transformer = Transformer::new(backend, &self.guard, &self.config.llm.model);
        transformer.ask(result, question).await
    }

    /// Build an image job from the configured defaults
    pub fn prepare_image_job(&self, prompt: &str) -> Result<ImageJob> {
        if prompt.trim().is_empty() {
            return Err(Error::MissingInput);
        }
        Ok(ImageJob::from_config(&self.config.image, prompt.trim()))
    }

    /// Start `job` against the image service configured for this session
    pub fn start_image(&mut self, job: ImageJob) -> Result<Uuid> {
        let client = ImageClient::from_env(self.config.image.clone())?;
        Ok(self.start_image_job(Arc::new(client), job))
    }

    /// Run `job` on a background worker
    ///
    /// A worker that is still running is not cancelled; its completion is
    /// still delivered, only the handle is replaced.
    pub fn start_image_job(&mut self, backend: Arc<dyn ImageBackend>, job: ImageJob) -> Uuid {
        let job_id = job.id;
        info!(job_id = %job_id, model = %job.model, "Starting image generation");

        let handle = ImageWorker::spawn(
            backend,
            job,
            self.root_token.child_token(),
            self.events_tx.clone(),
        );

        if let Some(previous) = self.image_job.replace(handle) {
            if !previous.is_finished() {
                debug!(job_id = %previous.job_id, "Previous image job still running");
            }
        }
        self.in_flight += 1;

        job_id
    }

    /// Number of started image jobs whose completion has not been received
    pub fn pending_jobs(&self) -> usize {
        self.in_flight
    }

    /// Next completion that has already arrived
    ///
    /// Cancelled jobs are counted as ended but not returned; after
    /// [`Session::shutdown`] nothing is returned.
    pub fn try_next_event(&mut self) -> Option<SessionEvent> {
        while let Ok(event) = self.events_rx.try_recv() {
            if let Some(event) = self.receive(event) {
                return Some(event);
            }
        }
        None
    }

    /// Wait for the next completion; `None` when no job is pending
    pub async fn wait_for_event(&mut self) -> Option<SessionEvent> {
        if let Some(event) = self.try_next_event() {
            return Some(event);
        }

        while self.in_flight > 0 && !self.root_token.is_cancelled() {
            let event = tokio::select! {
                _ = self.root_token.cancelled() => None,
                event = self.events_rx.recv() => event,
            }?;
            if let Some(event) = self.receive(event) {
                return Some(event);
            }
        }
        None
    }

    fn receive(&mut self, event: SessionEvent) -> Option<SessionEvent> {
        self.in_flight = self.in_flight.saturating_sub(1);
        if self.root_token.is_cancelled() {
            return None;
        }
        match event {
            SessionEvent::ImageCancelled { job_id } => {
                debug!(job_id = %job_id, "Image job cancelled");
                None
            }
            event => Some(event),
        }
    }

    /// Fold a completion into the session and return its status line
    pub fn apply(&mut self, event: SessionEvent) -> String {
        match event {
            SessionEvent::ImageFinished(output) => {
                let status = match output.primary() {
                    Some(url) => {
                        info!(job_id = %output.job_id, url = %url, "Generated image");
                        self.last_image_url = Some(url.to_string());
                        format!(
                            "Generated {} images. Displaying the first one.",
                            output.urls.len()
                        )
                    }
                    None => "No images were generated.".to_string(),
                };
                self.last_prompt = Some(output.prompt);
                status
            }
            SessionEvent::ImageFailed { error, .. } => {
                format!("Error generating image: {}", error)
            }
            SessionEvent::ImageCancelled { .. } => "Image generation cancelled.".to_string(),
        }
    }

    /// The prompt of the last finished image job
    pub fn last_prompt(&self) -> Result<&str> {
        self.last_prompt.as_deref().ok_or(Error::NoPreviousPrompt)
    }

    /// Save the last generated image
    ///
    /// When `path` is an existing directory a timestamped file name is chosen
    /// inside it. Returns the path written.
    pub async fn download_last_image(&self, path: &Path) -> Result<PathBuf> {
        let url = self.last_image_url.as_deref().ok_or(Error::NoImageAvailable)?;

        let target = if path.is_dir() {
            default_output_path(path, url)
        } else {
            path.to_path_buf()
        };

        download_to(&self.http, url, &target).await?;
        Ok(target)
    }

    /// Stop delivering worker completions
    pub fn shutdown(&mut self) {
        if !self.root_token.is_cancelled() {
            debug!(pending = self.in_flight, "Shutting down session");
            self.root_token.cancel();
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.root_token.is_cancelled()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.root_token.cancel();
    }
}
