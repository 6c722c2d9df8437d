//! Operations served under `/v1`, adapted into dispatcher units of work.
//!
//! Each operation declares its route, a validated request type and an
//! `execute` step producing one artifact file. [`OperationUnit`] wraps it
//! with decoding, a scratch workspace, upload and logging, and always
//! reports through a [`TaskOutcome`].

pub mod captions;
pub mod frame;
pub mod speech;
pub mod video;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use mtk_dispatch::UnitOfWork;
use mtk_media::{Downloader, FfmpegRunner, JobWorkspace};
use mtk_models::{JobId, JobPayload, TaskOutcome};
use mtk_speech::SpeechClient;
use mtk_storage::ArtifactStore;
use serde::de::DeserializeOwned;
use tracing::Instrument;
use url::Url;
use validator::{Validate, ValidationError};

use crate::error::{JobError, JobResult};
use crate::logging::JobLogger;
use crate::metrics;

pub use captions::TtsWithCaptions;
pub use frame::{ExtractFrame, Thumbnail};
pub use speech::{TextToSpeech, VoiceCloning};
pub use video::{AddAudio, LoopAudio, LoopVideo};

/// One media or speech operation.
#[async_trait]
pub trait Operation: Send + Sync + 'static {
    type Request: DeserializeOwned + Validate + Send + Sync;

    /// Route path, also the endpoint reported in outcomes.
    const PATH: &'static str;
    /// Short name for logs.
    const NAME: &'static str;

    /// Produce the artifact for `request` inside the job's workspace.
    async fn execute(
        &self,
        toolkit: &Toolkit,
        scope: &JobScope,
        request: Self::Request,
    ) -> JobResult<PathBuf>;
}

/// Collaborators shared by every operation.
pub struct Toolkit {
    pub store: Arc<dyn ArtifactStore>,
    pub downloader: Downloader,
    pub ffmpeg: FfmpegRunner,
    pub speech: Arc<SpeechClient>,
    /// Parent of the per-job workspaces
    pub work_dir: PathBuf,
}

impl Toolkit {
    /// Download `url` into the job's workspace as `{stem}.{ext}`.
    pub async fn fetch(
        &self,
        scope: &JobScope,
        url: &str,
        stem: &str,
        default_ext: &str,
    ) -> JobResult<PathBuf> {
        scope.logger.step(&format!("Downloading {}", stem));
        let path = self
            .downloader
            .download(url, scope.workspace.path(), stem, default_ext)
            .await?;
        Ok(path)
    }
}

/// Per-run context handed to [`Operation::execute`].
pub struct JobScope {
    pub job_id: JobId,
    pub workspace: JobWorkspace,
    pub logger: JobLogger,
}

impl JobScope {
    /// Workspace path for an intermediate file.
    pub fn file(&self, name: &str) -> PathBuf {
        self.workspace.file(name)
    }

    /// Workspace path for the final artifact, unique per job.
    pub fn output(&self, suffix: &str, ext: &str) -> PathBuf {
        self.workspace
            .file(&format!("{}_{}.{}", self.job_id, suffix, ext))
    }
}

/// Adapts an [`Operation`] to the dispatcher's [`UnitOfWork`].
pub struct OperationUnit<O: Operation> {
    operation: O,
    toolkit: Arc<Toolkit>,
}

impl<O: Operation> OperationUnit<O> {
    pub fn new(operation: O, toolkit: Arc<Toolkit>) -> Self {
        Self { operation, toolkit }
    }

    async fn run_logged(&self, job_id: &JobId, payload: &JobPayload, logger: JobLogger) -> TaskOutcome {
        let request: O::Request = match payload.decode() {
            Ok(request) => request,
            Err(e) => return Self::fail(&logger, JobError::InvalidRequest(e.to_string())),
        };
        if let Err(e) = request.validate() {
            return Self::fail(&logger, JobError::InvalidRequest(e.to_string()));
        }

        let workspace = match JobWorkspace::create(&self.toolkit.work_dir, job_id.as_str()) {
            Ok(workspace) => workspace,
            Err(e) => return Self::fail(&logger, e.into()),
        };
        let scope = JobScope {
            job_id: job_id.clone(),
            workspace,
            logger,
        };

        // The workspace is dropped with `scope`, success or not.
        match self.produce(&scope, request).await {
            Ok(url) => {
                let outcome = TaskOutcome::success(O::PATH, url);
                scope.logger.finish(&outcome);
                outcome
            }
            Err(e) => Self::fail(&scope.logger, e),
        }
    }

    async fn produce(&self, scope: &JobScope, request: O::Request) -> JobResult<String> {
        let artifact = self.operation.execute(&self.toolkit, scope, request).await?;

        scope.logger.step("Uploading artifact");
        let started = Instant::now();
        let url = self.toolkit.store.upload(&artifact).await?;
        metrics::record_upload_duration(self.toolkit.store.kind(), started.elapsed().as_secs_f64());
        Ok(url)
    }

    fn fail(logger: &JobLogger, error: JobError) -> TaskOutcome {
        let outcome = TaskOutcome::failure(O::PATH, error.code(), error.to_string());
        logger.finish(&outcome);
        outcome
    }
}

#[async_trait]
impl<O: Operation> UnitOfWork for OperationUnit<O> {
    fn endpoint(&self) -> &str {
        O::PATH
    }

    async fn run(&self, job_id: &JobId, payload: &JobPayload) -> TaskOutcome {
        let logger = JobLogger::new(job_id, O::NAME, O::PATH);
        let span = logger.span();
        self.run_logged(job_id, payload, logger).instrument(span).await
    }
}

/// Units of work by route path.
#[derive(Default, Clone)]
pub struct OperationRegistry {
    units: HashMap<String, Arc<dyn UnitOfWork>>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every operation the API serves.
    pub fn standard(toolkit: Arc<Toolkit>) -> Self {
        let mut registry = Self::new();
        registry.register_operation(LoopVideo, &toolkit);
        registry.register_operation(LoopAudio, &toolkit);
        registry.register_operation(AddAudio, &toolkit);
        registry.register_operation(ExtractFrame, &toolkit);
        registry.register_operation(Thumbnail, &toolkit);
        registry.register_operation(TextToSpeech, &toolkit);
        registry.register_operation(VoiceCloning, &toolkit);
        registry.register_operation(TtsWithCaptions, &toolkit);
        registry
    }

    pub fn register_operation<O: Operation>(&mut self, operation: O, toolkit: &Arc<Toolkit>) {
        self.register(Arc::new(OperationUnit::new(operation, Arc::clone(toolkit))));
    }

    /// Register a unit under its own endpoint, replacing any previous one.
    pub fn register(&mut self, unit: Arc<dyn UnitOfWork>) {
        self.units.insert(unit.endpoint().to_string(), unit);
    }

    pub fn get(&self, path: &str) -> Option<Arc<dyn UnitOfWork>> {
        self.units.get(path).cloned()
    }

    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.units.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }
}

/// Accepts an empty string, which means "no webhook".
pub(crate) fn validate_webhook_url(url: &str) -> Result<(), ValidationError> {
    if url.is_empty() || Url::parse(url).is_ok() {
        Ok(())
    } else {
        Err(ValidationError::new("url"))
    }
}

/// `http(s)` URL of an input file.
pub(crate) fn validate_source_url(url: &str) -> Result<(), ValidationError> {
    match Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => Err(ValidationError::new("source_url")),
    }
}
