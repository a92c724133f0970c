//! Minimal TUS resumable-upload client.
//!
//! Implements the subset of the [TUS protocol](https://tus.io) this tool
//! needs: upload creation (`POST` + `Location`), offset query (`HEAD`) for
//! resume, and chunked byte transfer (`PATCH` with
//! `application/offset+octet-stream`). No extensions beyond creation, no
//! cross-run upload store — a session URL lives for one process run.

mod client;
mod upload;

pub use client::{Client, Config};
pub use upload::{Upload, Uploader};

/// TUS protocol version sent in `Tus-Resumable`.
pub const TUS_VERSION: &str = "1.0.0";

/// Default transfer chunk size: 2 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 2 * 1024 * 1024;

/// A progress tick emitted after each confirmed chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Bytes confirmed by the server so far.
    pub offset: u64,
    /// Total upload size in bytes.
    pub total: u64,
}

impl ProgressEvent {
    /// Percentage complete, 0.0–100.0. A zero-byte upload reports 100%.
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.offset as f64 / self.total as f64 * 100.0
        }
    }
}

/// Errors produced by the TUS client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("unexpected status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("missing or invalid `{0}` header in server response")]
    MissingHeader(&'static str),

    #[error("server offset {actual} does not match expected offset {expected}")]
    OffsetMismatch { expected: u64, actual: u64 },

    #[error("no upload session: create must succeed before transfer")]
    NoSession,
}

impl Error {
    /// The HTTP status associated with this error, if a response was
    /// received. Used by the retry engine to classify failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::UnexpectedStatus { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
