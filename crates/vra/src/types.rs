use serde::Serialize;

/// CSP login request body.
#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Bundle import request body. The option is always `OVERWRITE`: re-importing
/// an existing bundle replaces it.
#[derive(Debug, Serialize)]
pub(crate) struct ImportRequest<'a> {
    #[serde(rename = "bundleId")]
    pub bundle_id: &'a str,
    pub option: &'static str,
}

/// Provider details reported by a successful import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub provider_name: String,
    pub provider_version: String,
}
