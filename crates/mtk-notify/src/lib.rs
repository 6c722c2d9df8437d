//! Lifecycle sinks for dispatched jobs.
//!
//! - [`StatusRecorder`]: append-only status events keyed by job id
//! - [`WebhookNotifier`]: best-effort delivery of the final envelope

pub mod error;
pub mod recorder;
pub mod webhook;

pub use error::{NotifyError, NotifyResult};
pub use recorder::{FileStatusRecorder, MemoryStatusRecorder, StatusRecorder};
pub use webhook::{HttpWebhookNotifier, WebhookConfig, WebhookNotifier};
