//! TUS HTTP operations: create, offset query, chunk PATCH.

use reqwest::header::{CONTENT_TYPE, HeaderMap, LOCATION};
use reqwest::{StatusCode, Url};

use crate::{DEFAULT_CHUNK_SIZE, Error, TUS_VERSION, Upload};

const TUS_RESUMABLE: &str = "Tus-Resumable";
const UPLOAD_LENGTH: &str = "Upload-Length";
const UPLOAD_OFFSET: &str = "Upload-Offset";
const UPLOAD_METADATA: &str = "Upload-Metadata";

/// Client configuration.
pub struct Config {
    /// Extra headers sent with every request (including `Authorization`).
    pub headers: HeaderMap,
    /// Disables TLS certificate verification when set.
    pub skip_tls_verify: bool,
    /// Transfer chunk size in bytes. 0 selects [`DEFAULT_CHUNK_SIZE`].
    pub chunk_size: usize,
    /// Pre-built HTTP client override. When `None`, one is built honoring
    /// `skip_tls_verify`.
    pub http: Option<reqwest::Client>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            headers: HeaderMap::new(),
            skip_tls_verify: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
            http: None,
        }
    }
}

/// TUS client bound to one creation endpoint.
pub struct Client {
    http: reqwest::Client,
    target: Url,
    headers: HeaderMap,
    chunk_size: usize,
}

impl Client {
    /// Creates a client for the given creation endpoint.
    pub fn new(target: Url, config: Config) -> Result<Self, Error> {
        let http = match config.http {
            Some(client) => client,
            None => reqwest::Client::builder()
                .danger_accept_invalid_certs(config.skip_tls_verify)
                .build()?,
        };
        let chunk_size = if config.chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            config.chunk_size
        };

        Ok(Self {
            http,
            target,
            headers: config.headers,
            chunk_size,
        })
    }

    /// The creation endpoint this client uploads to.
    pub fn target(&self) -> &Url {
        &self.target
    }

    pub(crate) fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Creates a new upload resource. Requires a 201 with a `Location`
    /// header; a relative location is resolved against the target URL.
    pub(crate) async fn create(&self, upload: &Upload) -> Result<Url, Error> {
        let mut req = self
            .http
            .post(self.target.clone())
            .headers(self.headers.clone())
            .header(TUS_RESUMABLE, TUS_VERSION)
            .header(UPLOAD_LENGTH, upload.size().to_string());
        if let Some(metadata) = upload.encoded_metadata() {
            req = req.header(UPLOAD_METADATA, metadata);
        }

        let resp = req.send().await?;
        if resp.status() != StatusCode::CREATED {
            return Err(unexpected_status(resp).await);
        }

        let location = resp
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(Error::MissingHeader("Location"))?;
        self.target
            .join(location)
            .map_err(|e| Error::InvalidUrl(format!("{location}: {e}")))
    }

    /// Queries the server-confirmed offset of an existing session.
    pub(crate) async fn offset(&self, session: &Url) -> Result<u64, Error> {
        let resp = self
            .http
            .head(session.clone())
            .headers(self.headers.clone())
            .header(TUS_RESUMABLE, TUS_VERSION)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(unexpected_status(resp).await);
        }
        header_u64(resp.headers(), UPLOAD_OFFSET)
    }

    /// Writes one chunk at `offset` and returns the new confirmed offset.
    pub(crate) async fn patch(&self, session: &Url, offset: u64, body: Vec<u8>) -> Result<u64, Error> {
        let resp = self
            .http
            .patch(session.clone())
            .headers(self.headers.clone())
            .header(TUS_RESUMABLE, TUS_VERSION)
            .header(UPLOAD_OFFSET, offset.to_string())
            .header(CONTENT_TYPE, "application/offset+octet-stream")
            .body(body)
            .send()
            .await?;
        if resp.status() != StatusCode::NO_CONTENT {
            return Err(unexpected_status(resp).await);
        }
        header_u64(resp.headers(), UPLOAD_OFFSET)
    }
}

async fn unexpected_status(resp: reqwest::Response) -> Error {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Error::UnexpectedStatus { status, body }
}

fn header_u64(headers: &HeaderMap, name: &'static str) -> Result<u64, Error> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .ok_or(Error::MissingHeader(name))
}
