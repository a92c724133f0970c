//! Upload run engine: bounded-retry resumable upload plus the
//! token-acquire / upload / import sequencing.
//!
//! This crate is the business logic. It is transport-agnostic at the
//! upload seam — the engine drives any [`Transport`], the real one being
//! `bundlepush-tus`'s [`Uploader`](bundlepush_tus::Uploader) — and the
//! CLI app only resolves configuration into a [`RunConfig`] before calling
//! [`Orchestrator::run`].

mod engine;
mod error;
mod orchestrator;
mod progress;
mod retry;
mod transport;
mod types;

pub use engine::UploadEngine;
pub use error::EngineError;
pub use orchestrator::Orchestrator;
pub use progress::{progress_channel, spawn_reporter};
pub use retry::{RetryDecision, RetryPolicy};
pub use transport::Transport;
pub use types::{RunConfig, RunSummary};

// Re-exported so the CLI does not need to depend on the HTTP stack directly.
pub use bundlepush_tus::ProgressEvent;
pub use reqwest::Url;
pub use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
