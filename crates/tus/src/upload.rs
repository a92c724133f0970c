//! Upload descriptor and the stateful uploader driving one transfer.

use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Url;
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::client::Client;
use crate::{Error, ProgressEvent};

/// A local file prepared for upload.
///
/// The file handle is opened once and held for the whole run; the offset
/// tracks bytes the server has confirmed and never exceeds the total size.
#[derive(Debug)]
pub struct Upload {
    file: tokio::fs::File,
    size: u64,
    offset: u64,
    metadata: Vec<(String, String)>,
}

impl Upload {
    /// Opens `path` and prepares it for upload. The file name is recorded
    /// as `filename` metadata for the creation request.
    pub async fn from_file(path: &Path) -> Result<Self, Error> {
        let file = tokio::fs::File::open(path).await?;
        let size = file.metadata().await?.len();

        let mut metadata = Vec::new();
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            metadata.push(("filename".to_string(), name.to_string()));
        }

        Ok(Self {
            file,
            size,
            offset: 0,
            metadata,
        })
    }

    /// Total upload size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Bytes confirmed by the server so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Current progress as an event.
    pub fn progress(&self) -> ProgressEvent {
        ProgressEvent {
            offset: self.offset,
            total: self.size,
        }
    }

    /// `Upload-Metadata` header value: comma-separated `key base64(value)`
    /// pairs. `None` when no metadata is set.
    pub fn encoded_metadata(&self) -> Option<String> {
        if self.metadata.is_empty() {
            return None;
        }
        let pairs: Vec<String> = self
            .metadata
            .iter()
            .map(|(k, v)| format!("{k} {}", BASE64.encode(v)))
            .collect();
        Some(pairs.join(","))
    }

    /// Repositions the upload at a server-reported offset (resume).
    /// The offset is capped at the file size.
    pub(crate) async fn seek_to(&mut self, offset: u64) -> Result<(), Error> {
        let offset = offset.min(self.size);
        self.file.seek(SeekFrom::Start(offset)).await?;
        self.offset = offset;
        Ok(())
    }

    /// Reads the next chunk at the current offset. Returns `None` when the
    /// upload is complete. The offset is only advanced once the server
    /// confirms the chunk, via [`confirm`](Self::confirm).
    pub(crate) async fn read_chunk(&mut self, chunk_size: usize) -> Result<Option<Vec<u8>>, Error> {
        let remaining = self.size - self.offset;
        if remaining == 0 {
            return Ok(None);
        }

        let want = remaining.min(chunk_size as u64) as usize;
        let mut buf = vec![0u8; want];
        self.file.read_exact(&mut buf).await?;
        Ok(Some(buf))
    }

    /// Records a server-confirmed offset after a successful chunk write.
    pub(crate) fn confirm(&mut self, offset: u64) {
        self.offset = offset;
    }
}

/// Drives one upload against a [`Client`].
///
/// Holds the session URL across attempts: once `create_or_resume` has
/// created the remote resource, later calls resume it (offset query +
/// seek) instead of creating a second one.
pub struct Uploader {
    client: Client,
    upload: Upload,
    url: Option<Url>,
}

impl Uploader {
    /// Pairs an upload with a client.
    pub fn new(client: Client, upload: Upload) -> Self {
        Self {
            client,
            upload,
            url: None,
        }
    }

    /// The server-assigned session URL, once created.
    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Creates the remote upload resource, or resumes the one created by a
    /// prior attempt: queries the confirmed offset and seeks the file there.
    pub async fn create_or_resume(&mut self) -> Result<Url, Error> {
        match self.url.clone() {
            Some(url) => {
                let offset = self.client.offset(&url).await?;
                debug!(url = %url, offset, "resuming upload session");
                self.upload.seek_to(offset).await?;
                Ok(url)
            }
            None => {
                let url = self.client.create(&self.upload).await?;
                debug!(url = %url, size = self.upload.size(), "created upload session");
                self.url = Some(url.clone());
                Ok(url)
            }
        }
    }

    /// Transfers remaining bytes chunk by chunk, emitting a progress event
    /// after each confirmed chunk. Events are sent with `try_send`: the
    /// channel is advisory, a full slot drops the tick.
    pub async fn transfer(&mut self, progress: mpsc::Sender<ProgressEvent>) -> Result<(), Error> {
        let url = self.url.clone().ok_or(Error::NoSession)?;

        while self.upload.offset() < self.upload.size() {
            let offset = self.upload.offset();
            let Some(chunk) = self.upload.read_chunk(self.client.chunk_size()).await? else {
                break;
            };
            let expected = offset + chunk.len() as u64;

            let confirmed = self.client.patch(&url, offset, chunk).await?;
            if confirmed != expected {
                return Err(Error::OffsetMismatch {
                    expected,
                    actual: confirmed,
                });
            }
            self.upload.confirm(confirmed);

            if progress.try_send(self.upload.progress()).is_err() {
                trace!(offset = confirmed, "progress slot full, tick dropped");
            }
        }

        Ok(())
    }
}
