//! Run orchestration: resolve identity, upload with retries, import.

use bundlepush_tus as tus;
use bundlepush_vra as vra;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use tracing::info;

use crate::engine::UploadEngine;
use crate::error::EngineError;
use crate::progress::{progress_channel, spawn_reporter};
use crate::retry::RetryPolicy;
use crate::types::{RunConfig, RunSummary};

/// Sequences one run: token resolution, resumable upload under the retry
/// policy, then the bundle import.
///
/// Synchronous from the caller's perspective; the only background task is
/// the progress reporter, which is joined before `run` returns. There is
/// no rollback: a completed upload stays on the server even when the
/// import step fails afterwards.
pub struct Orchestrator {
    config: RunConfig,
    policy: RetryPolicy,
}

impl Orchestrator {
    /// Creates an orchestrator with the default retry policy
    /// (50 attempts, 10-second backoff).
    pub fn new(config: RunConfig) -> Self {
        Self::with_policy(config, RetryPolicy::default())
    }

    /// Creates an orchestrator with a custom retry policy.
    pub fn with_policy(config: RunConfig, policy: RetryPolicy) -> Self {
        Self { config, policy }
    }

    /// Runs upload and import to completion.
    pub async fn run(&self) -> Result<RunSummary, EngineError> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(self.config.skip_tls_verify)
            .build()?;

        let token = self.resolve_token(&http).await?;

        let mut headers = self.config.headers.clone();
        if let Some(token) = &token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}"))?,
            );
        }

        println!(
            "TUS Uploading {} to {}",
            self.config.source.display(),
            self.config.target
        );

        let upload = tus::Upload::from_file(&self.config.source).await?;
        let client = tus::Client::new(
            self.config.target.clone(),
            tus::Config {
                headers,
                http: Some(http.clone()),
                ..tus::Config::default()
            },
        )?;
        let mut uploader = tus::Uploader::new(client, upload);

        let (progress_tx, progress_rx) = progress_channel();
        let reporter = spawn_reporter(progress_rx);

        // The engine owns the only sender; the reporter drains and exits
        // once the run — successful or not — drops it.
        let result = UploadEngine::new(self.policy.clone())
            .run(&mut uploader, progress_tx)
            .await;
        let _ = reporter.await;
        let session_url = result?;

        println!(
            "{} Done uploading",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        );

        let import = match (&token, self.config.import_bundle) {
            (Some(token), true) => {
                let vra = vra::Client::new(http, self.config.target.clone());
                let summary = vra.import_bundle(token, &session_url).await?;
                println!(
                    "Bundle imported into vRA: {} {}",
                    summary.provider_name, summary.provider_version
                );
                Some(summary)
            }
            _ => None,
        };

        Ok(RunSummary {
            session_url,
            import,
        })
    }

    /// Resolves the bearer token: a pre-supplied token wins and skips the
    /// login call entirely; otherwise a username triggers login; otherwise
    /// the run proceeds unauthenticated.
    async fn resolve_token(&self, http: &reqwest::Client) -> Result<Option<String>, EngineError> {
        if let Some(token) = &self.config.bearer_token {
            return Ok(Some(token.clone()));
        }

        let Some(username) = &self.config.username else {
            return Ok(None);
        };

        let vra = vra::Client::new(http.clone(), self.config.target.clone());
        let token = vra
            .login(username, self.config.password.as_deref().unwrap_or(""))
            .await?;
        info!(username = %username, "acquired vRA token");
        if self.config.verbose {
            println!("vRA token: {token}");
        }
        Ok(Some(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Url;
    use reqwest::header::HeaderMap;
    use std::io::Write as _;
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Scripted mock HTTP server: one canned response per connection, in
    /// order. Request text is recorded for assertions.
    async fn mock_server(
        responses: Vec<String>,
    ) -> (Url, Arc<Mutex<Vec<String>>>, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let url = Url::parse(&format!(
            "http://127.0.0.1:{port}/provisioning/ipam/api/providers/packages/import"
        ))
        .unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_srv = Arc::clone(&seen);

        let handle = tokio::spawn(async move {
            for resp in responses {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                let req = read_request(&mut stream).await;
                seen_srv.lock().unwrap().push(req);
                let _ = stream.write_all(resp.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        (url, seen, handle)
    }

    async fn read_request(stream: &mut tokio::net::TcpStream) -> String {
        let mut data = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = stream.read(&mut buf).await.unwrap_or(0);
            if n == 0 {
                break;
            }
            data.extend_from_slice(&buf[..n]);

            if let Some(head_end) = data.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&data[..head_end]).to_string();
                let content_length = head
                    .lines()
                    .find_map(|l| {
                        l.to_ascii_lowercase()
                            .strip_prefix("content-length:")
                            .map(str::trim)
                            .map(String::from)
                    })
                    .and_then(|v| v.parse::<usize>().ok())
                    .unwrap_or(0);
                if data.len() >= head_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&data).to_string()
    }

    fn response(status: &str, headers: &[(&str, &str)], body: &str) -> String {
        let mut resp = format!("HTTP/1.1 {status}\r\n");
        for (name, value) in headers {
            resp.push_str(&format!("{name}: {value}\r\n"));
        }
        resp.push_str(&format!(
            "Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        ));
        resp
    }

    fn source_file(content: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file
    }

    fn config(source: &Path, target: &Url) -> RunConfig {
        RunConfig {
            source: source.to_path_buf(),
            target: target.clone(),
            headers: HeaderMap::new(),
            skip_tls_verify: false,
            bearer_token: None,
            username: None,
            password: None,
            import_bundle: false,
            verbose: false,
        }
    }

    fn no_backoff() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 50,
            backoff: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn presupplied_token_skips_login_and_imports() {
        let (url, seen, handle) = mock_server(vec![
            response("201 Created", &[("Location", "/files/abc123")], ""),
            response("204 No Content", &[("Upload-Offset", "7")], ""),
            response(
                "201 Created",
                &[("Content-Type", "application/json")],
                r#"{"providerName":"Infoblox","providerVersion":"1.2.3"}"#,
            ),
        ])
        .await;

        let file = source_file(b"payload");
        let mut cfg = config(file.path(), &url);
        cfg.bearer_token = Some("tok-pre".into());
        cfg.import_bundle = true;

        let summary = Orchestrator::with_policy(cfg, no_backoff())
            .run()
            .await
            .unwrap();

        assert_eq!(summary.session_url.path(), "/files/abc123");
        let import = summary.import.unwrap();
        assert_eq!(import.provider_name, "Infoblox");
        assert_eq!(import.provider_version, "1.2.3");

        let requests = seen.lock().unwrap();
        assert_eq!(requests.len(), 3, "no login call was made");
        assert!(requests[0].starts_with("POST /provisioning"));
        assert!(requests[0].contains("Bearer tok-pre"));
        assert!(requests[1].starts_with("PATCH /files/abc123"));
        assert!(requests[2].contains(r#""bundleId":"abc123""#));
        handle.abort();
    }

    #[tokio::test]
    async fn login_failure_aborts_before_any_upload() {
        let (url, seen, handle) = mock_server(vec![response(
            "401 Unauthorized",
            &[],
            r#"{"message":"bad credentials"}"#,
        )])
        .await;

        let file = source_file(b"payload");
        let mut cfg = config(file.path(), &url);
        cfg.username = Some("admin".into());
        cfg.password = Some("wrong".into());
        cfg.import_bundle = true;

        let err = Orchestrator::with_policy(cfg, no_backoff())
            .run()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Vra(bundlepush_vra::Error::Authentication { .. })
        ));

        let requests = seen.lock().unwrap();
        assert_eq!(requests.len(), 1, "login only — the upload never started");
        assert!(requests[0].starts_with("POST /csp/gateway/am/api/login"));
        handle.abort();
    }

    #[tokio::test]
    async fn login_then_transient_create_then_success() {
        let (url, seen, handle) = mock_server(vec![
            response("200 OK", &[], r#"{"access_token":"tok-live"}"#),
            // First create fails server-side: retried, not aborted.
            response("500 Internal Server Error", &[], ""),
            response("201 Created", &[("Location", "/files/pkg9")], ""),
            response("204 No Content", &[("Upload-Offset", "3")], ""),
            response(
                "201 Created",
                &[],
                r#"{"providerName":"Infoblox","providerVersion":"2.0.0"}"#,
            ),
        ])
        .await;

        let file = source_file(b"zip");
        let mut cfg = config(file.path(), &url);
        cfg.username = Some("admin".into());
        cfg.password = Some("pw".into());
        cfg.import_bundle = true;

        let summary = Orchestrator::with_policy(cfg, no_backoff())
            .run()
            .await
            .unwrap();
        assert_eq!(summary.session_url.path(), "/files/pkg9");
        assert!(summary.import.is_some());

        let requests = seen.lock().unwrap();
        assert!(requests[1].starts_with("POST /provisioning"));
        assert!(requests[2].starts_with("POST /provisioning"));
        assert!(
            requests[2].contains("Bearer tok-live"),
            "upload carries the acquired token"
        );
        handle.abort();
    }

    #[tokio::test]
    async fn import_failure_surfaces_after_completed_upload() {
        let (url, _seen, handle) = mock_server(vec![
            response("201 Created", &[("Location", "/files/abc123")], ""),
            response("204 No Content", &[("Upload-Offset", "7")], ""),
            response("500 Internal Server Error", &[], r#"{"message":"boom"}"#),
        ])
        .await;

        let file = source_file(b"payload");
        let mut cfg = config(file.path(), &url);
        cfg.bearer_token = Some("tok-pre".into());
        cfg.import_bundle = true;

        let err = Orchestrator::with_policy(cfg, no_backoff())
            .run()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Vra(bundlepush_vra::Error::Import { status: 500 })
        ));
        handle.abort();
    }

    #[tokio::test]
    async fn upload_without_token_skips_import() {
        let (url, seen, handle) = mock_server(vec![
            response("201 Created", &[("Location", "/files/abc123")], ""),
            response("204 No Content", &[("Upload-Offset", "7")], ""),
        ])
        .await;

        let file = source_file(b"payload");
        let mut cfg = config(file.path(), &url);
        cfg.import_bundle = true; // no token though

        let summary = Orchestrator::with_policy(cfg, no_backoff())
            .run()
            .await
            .unwrap();
        assert!(summary.import.is_none());
        assert_eq!(seen.lock().unwrap().len(), 2);
        handle.abort();
    }

    #[tokio::test]
    async fn missing_source_file_fails_before_any_request() {
        let (url, seen, handle) = mock_server(vec![]).await;

        let cfg = config(Path::new("/nonexistent/plugin.zip"), &url);
        let err = Orchestrator::with_policy(cfg, no_backoff())
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Tus(tus::Error::Io(_))));
        assert!(seen.lock().unwrap().is_empty());
        handle.abort();
    }
}
