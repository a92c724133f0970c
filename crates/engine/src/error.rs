//! Run error types.

/// Errors produced by an upload/import run.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// First create/resume attempt failed with a status that retrying
    /// cannot fix (400, 401, 403, 404). No further attempts were made.
    #[error("unrecoverable upload error: {0}")]
    Unrecoverable(#[source] bundlepush_tus::Error),

    /// The attempt budget ran out; carries the last error observed.
    #[error("upload failed after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        source: bundlepush_tus::Error,
    },

    /// The retry policy allows no attempts at all.
    #[error("retry budget allows no attempts")]
    NoAttempts,

    /// Upload transport error outside the retry loop (e.g. opening the
    /// source file).
    #[error("upload error: {0}")]
    Tus(#[from] bundlepush_tus::Error),

    /// Login or import failure.
    #[error("vRA error: {0}")]
    Vra(#[from] bundlepush_vra::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid authorization header: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),
}
