//! Cloud Run Jobs adapter.
//!
//! Implements [`JobTrigger`](mtk_dispatch::JobTrigger) by calling the Cloud
//! Run Admin API v2 `jobs.run` method with per-execution overrides.

pub mod client;
pub mod config;
pub mod error;
pub mod token;
pub mod types;

pub use client::CloudRunJobTrigger;
pub use config::CloudRunConfig;
pub use error::{CloudRunError, CloudRunResult};
pub use token::{AccessTokenSource, StaticToken, TokenCache};
