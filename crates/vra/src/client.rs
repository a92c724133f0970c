//! vRA HTTP calls: CSP login and bundle import.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{StatusCode, Url};
use tracing::{info, warn};

use crate::types::{ImportRequest, ImportSummary, LoginRequest};

/// CSP gateway login path, relative to the target host.
const LOGIN_PATH: &str = "/csp/gateway/am/api/login";
const LOGIN_QUERY: &str = "access_token";

/// Errors from the vRA client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to login on {endpoint}: {body}")]
    Authentication { endpoint: String, body: String },

    #[error("missing or non-string `{0}` field in response")]
    MalformedResponse(&'static str),

    #[error("failed to import the bundle: status {status} instead of 201")]
    Import { status: u16 },

    #[error("cannot derive a bundle id from session URL {0}")]
    MissingBundleId(String),
}

/// vRA API client bound to one import endpoint.
///
/// The login endpoint is derived from the import target: same scheme, host
/// and port, fixed CSP gateway path.
pub struct Client {
    http: reqwest::Client,
    target: Url,
}

impl Client {
    /// Creates a client around an existing HTTP client and the import
    /// target URL.
    pub fn new(http: reqwest::Client, target: Url) -> Self {
        Self { http, target }
    }

    /// Exchanges credentials for a bearer token.
    ///
    /// Only a 200 is accepted; any other status carries the response body
    /// as diagnostic. The token is the `access_token` field of the JSON
    /// response.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, Error> {
        let endpoint = login_url(&self.target);

        let resp = self
            .http
            .post(endpoint.clone())
            .json(&LoginRequest { username, password })
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();

        if status != StatusCode::OK {
            return Err(Error::Authentication {
                endpoint: endpoint.to_string(),
                body,
            });
        }

        let fields: serde_json::Value = serde_json::from_str(&body)?;
        fields
            .get("access_token")
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned)
            .ok_or(Error::MalformedResponse("access_token"))
    }

    /// Imports the bundle created by a completed upload.
    ///
    /// The bundle id is the last non-empty path segment of the upload's
    /// session URL. Only a 201 is accepted; the uploaded artifact remains
    /// on the server either way.
    pub async fn import_bundle(
        &self,
        token: &str,
        session_url: &Url,
    ) -> Result<ImportSummary, Error> {
        let bundle_id = bundle_id(session_url)
            .ok_or_else(|| Error::MissingBundleId(session_url.to_string()))?;

        info!(target_url = %self.target, bundle_id = %bundle_id, "importing bundle");

        let resp = self
            .http
            .post(self.target.clone())
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(CONTENT_TYPE, "application/json")
            .json(&ImportRequest {
                bundle_id: &bundle_id,
                option: "OVERWRITE",
            })
            .send()
            .await?;

        let status = resp.status();
        if status != StatusCode::CREATED {
            let headers = resp.headers().clone();
            let body = resp.text().await.unwrap_or_default();
            warn!(
                status = status.as_u16(),
                headers = ?headers,
                body = %body,
                "bundle import rejected"
            );
            return Err(Error::Import {
                status: status.as_u16(),
            });
        }

        let fields: serde_json::Value = resp.json().await?;
        let provider_name = string_field(&fields, "providerName")?;
        let provider_version = string_field(&fields, "providerVersion")?;

        Ok(ImportSummary {
            provider_name,
            provider_version,
        })
    }
}

/// Derives the CSP login URL from the import target: scheme + host + port
/// with the fixed gateway path.
fn login_url(target: &Url) -> Url {
    let mut url = target.clone();
    url.set_path(LOGIN_PATH);
    url.set_query(Some(LOGIN_QUERY));
    url.set_fragment(None);
    url
}

/// Last non-empty path segment of a session URL.
fn bundle_id(session_url: &Url) -> Option<String> {
    session_url
        .path_segments()?
        .filter(|s| !s.is_empty())
        .next_back()
        .map(str::to_owned)
}

fn string_field(
    fields: &serde_json::Value,
    name: &'static str,
) -> Result<String, Error> {
    fields
        .get(name)
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned)
        .ok_or(Error::MalformedResponse(name))
}
