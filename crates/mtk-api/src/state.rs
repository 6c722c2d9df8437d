//! Application state.

use std::sync::Arc;

use anyhow::Context;
use mtk_cloudrun::CloudRunJobTrigger;
use mtk_dispatch::{Dispatcher, JobTrigger, RuntimeContext, Worker};
use mtk_media::{Downloader, FfmpegRunner};
use mtk_notify::{FileStatusRecorder, HttpWebhookNotifier, StatusRecorder, WebhookConfig};
use mtk_speech::SpeechClient;
use mtk_storage::store_from_env;
use tracing::{info, warn};

use crate::config::ApiConfig;
use crate::operations::{OperationRegistry, Toolkit};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub dispatcher: Arc<Dispatcher>,
    pub recorder: Arc<dyn StatusRecorder>,
    pub operations: Arc<OperationRegistry>,
    pub speech: Arc<SpeechClient>,
}

impl AppState {
    /// Wire every collaborator from the environment.
    ///
    /// Returns the worker draining the dispatcher's queue; the caller spawns
    /// it, or drops it when running a single delegated job.
    pub async fn build(config: ApiConfig, context: RuntimeContext) -> anyhow::Result<(Self, Worker)> {
        let recorder: Arc<dyn StatusRecorder> =
            Arc::new(FileStatusRecorder::new(&config.local_storage_path));
        let notifier = Arc::new(
            HttpWebhookNotifier::new(WebhookConfig::from_env())
                .context("Failed to build webhook client")?,
        );

        let trigger: Option<Arc<dyn JobTrigger>> = match &context.remote_job {
            Some(job) => match CloudRunJobTrigger::from_env().await {
                Ok(trigger) => {
                    info!(job = %job.name, location = %job.location, "Remote job delegation enabled");
                    Some(Arc::new(trigger))
                }
                Err(e) => {
                    // Requests with a webhook will fail with a 500 envelope.
                    warn!(error = %e, "Remote job configured but Cloud Run client unavailable");
                    None
                }
            },
            None => None,
        };

        let store = store_from_env(&config.local_storage_path)
            .await
            .context("Failed to configure artifact storage")?;
        let speech = Arc::new(SpeechClient::from_env().context("Failed to build speech client")?);
        let toolkit = Arc::new(Toolkit {
            store,
            downloader: Downloader::new(config.download_timeout)
                .context("Failed to build download client")?,
            ffmpeg: FfmpegRunner::new().with_timeout(config.ffmpeg_timeout),
            speech: Arc::clone(&speech),
            work_dir: config.work_dir(),
        });
        let operations = OperationRegistry::standard(toolkit);

        let (dispatcher, worker) = Dispatcher::with_worker(
            context,
            Arc::clone(&recorder),
            notifier,
            trigger,
            config.build_number.clone(),
        );

        let state = Self {
            config,
            dispatcher: Arc::new(dispatcher),
            recorder,
            operations: Arc::new(operations),
            speech,
        };
        Ok((state, worker))
    }
}
