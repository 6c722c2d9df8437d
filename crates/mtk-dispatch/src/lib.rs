//! Job dispatch and execution core.
//!
//! Every operation request goes through [`Dispatcher::dispatch`], which picks
//! one of four [`ExecutionMode`]s:
//! - `Delegated`: this process is a remote job execution, run in place
//! - `Remote`: hand the job to the configured [`JobTrigger`]
//! - `Inline`: run on the calling task
//! - `Queued`: push onto the bounded [`TaskQueue`] for the single [`Worker`]
//!
//! All four paths produce the same [`Envelope`](mtk_models::Envelope) shape and
//! report lifecycle events through the same recorder and webhook sinks.

pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod metrics;
pub mod queue;
pub mod runner;
pub mod runtime;
pub mod trigger;
pub mod unit;
pub mod worker;

pub use dispatcher::{Dispatcher, ExecutionMode};
pub use envelope::EnvelopeFactory;
pub use error::{QueueError, TriggerError, TriggerResult};
pub use queue::{QueueEntry, QueueId, QueueReceiver, QueueSlot, TaskQueue};
pub use runner::JobRunner;
pub use runtime::{DelegatedRequest, RemoteJob, RuntimeContext, DEFAULT_EXECUTION_HANDLE};
pub use trigger::{EnvOverride, JobOverrides, JobTrigger, TriggerRequest, TriggerResponse};
pub use unit::{BoxedTask, UnitOfWork};
pub use worker::Worker;
