//! HTTP handlers.

pub mod health;
pub mod jobs;
pub mod media;
pub mod operations;

pub use health::{health, ready};
pub use jobs::job_status;
pub use media::download_media;
pub use operations::submit;
