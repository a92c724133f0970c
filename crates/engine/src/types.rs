use std::path::PathBuf;

use bundlepush_vra::ImportSummary;
use reqwest::Url;
use reqwest::header::HeaderMap;

/// Everything one run needs, resolved up front by the caller. No ambient
/// state: environment fallbacks are the CLI's concern.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Local file to upload.
    pub source: PathBuf,
    /// TUS creation endpoint, also the vRA import endpoint.
    pub target: Url,
    /// Extra headers sent with every upload request.
    pub headers: HeaderMap,
    /// Disables TLS certificate verification.
    pub skip_tls_verify: bool,
    /// Pre-supplied bearer token. Takes precedence over login.
    pub bearer_token: Option<String>,
    /// vRA username; presence triggers login when no token is supplied.
    pub username: Option<String>,
    /// vRA password, paired with `username`.
    pub password: Option<String>,
    /// Trigger the bundle import after a successful upload.
    pub import_bundle: bool,
    /// Print the acquired token.
    pub verbose: bool,
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Server-assigned upload session URL.
    pub session_url: Url,
    /// Import result, when the import step ran.
    pub import: Option<ImportSummary>,
}
