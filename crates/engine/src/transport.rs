//! Upload transport trait.
//!
//! The engine drives any resumable transport through this seam, which
//! keeps the retry loop testable with mocks. The production impl is
//! [`bundlepush_tus::Uploader`].

use std::future::Future;
use std::pin::Pin;

use bundlepush_tus::{Error as TusError, ProgressEvent, Uploader};
use reqwest::Url;
use tokio::sync::mpsc;

/// A resumable upload capability: create-or-resume plus byte transfer.
///
/// Implementations hold the session URL internally so that a session
/// created on one attempt is resumed — never re-created — on the next.
pub trait Transport: Send {
    /// Creates the remote upload resource, or resumes the session held
    /// from a prior attempt. Returns the session URL.
    fn create_or_resume(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Result<Url, TusError>> + Send + '_>>;

    /// Transfers the remaining bytes, emitting progress events.
    fn transfer(
        &mut self,
        progress: mpsc::Sender<ProgressEvent>,
    ) -> Pin<Box<dyn Future<Output = Result<(), TusError>> + Send + '_>>;
}

impl Transport for Uploader {
    fn create_or_resume(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Result<Url, TusError>> + Send + '_>> {
        Box::pin(Uploader::create_or_resume(self))
    }

    fn transfer(
        &mut self,
        progress: mpsc::Sender<ProgressEvent>,
    ) -> Pin<Box<dyn Future<Output = Result<(), TusError>> + Send + '_>> {
        Box::pin(Uploader::transfer(self, progress))
    }
}
