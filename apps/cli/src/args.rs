//! Flag, positional, and environment resolution into a [`RunConfig`].

use std::path::PathBuf;

use anyhow::{Context, bail};
use bundlepush_engine::{HeaderMap, HeaderName, HeaderValue, RunConfig, Url};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "bundlepush",
    about = "Streams a file to a TUS server, then imports the bundle into vRA",
    after_help = "Example:\n  bundlepush --vra-username=admin --vra-password=XXX \
                  Infoblox.zip https://vrahost/provisioning/ipam/api/providers/packages/import"
)]
pub struct Args {
    /// Path to the file to upload
    #[arg(long, env = "FILE")]
    source: Option<PathBuf>,

    /// URL to upload to
    #[arg(long, env = "URL")]
    target: Option<String>,

    /// Extra header, repeatable. eg: "Authorization: Bearer XXX"
    #[arg(long = "header", value_name = "NAME: VALUE")]
    headers: Vec<String>,

    /// Skip the validation of TLS certificates
    #[arg(long)]
    skip_ssl_verification: bool,

    /// vRA username; triggers a login and forces --vra-import
    #[arg(long)]
    vra_username: Option<String>,

    /// vRA password
    #[arg(long, env = "VRA_PASSWORD", hide_env_values = true)]
    vra_password: Option<String>,

    /// Import the bundle into vRA after a successful upload
    #[arg(long)]
    vra_import: bool,

    /// Pre-supplied bearer token; skips the vRA login
    #[arg(long, env = "BEARER_TOKEN", hide_env_values = true)]
    bearer_token: Option<String>,

    /// Print the acquired vRA token
    #[arg(
        long,
        default_value_t = true,
        action = clap::ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    verbose: bool,

    /// Fill unset --source then --target, in order
    #[arg(value_name = "SOURCE/TARGET")]
    positionals: Vec<String>,
}

impl Args {
    /// Resolves flags, positionals, and env fallbacks into a run config.
    pub fn into_run_config(self) -> anyhow::Result<RunConfig> {
        let mut source = self.source;
        let mut target = self.target;
        for arg in &self.positionals {
            if source.is_none() {
                source = Some(PathBuf::from(arg));
            } else if target.is_none() {
                target = Some(arg.clone());
            }
        }

        let source =
            source.context("no source file (use --source, the FILE env var, or a positional)")?;
        let target =
            target.context("no target URL (use --target, the URL env var, or a positional)")?;
        let target =
            Url::parse(&target).with_context(|| format!("invalid target URL '{target}'"))?;

        let headers = parse_headers(&self.headers)?;
        let bearer_token = self.bearer_token.or_else(|| bearer_from_headers(&headers));
        // An import is pointless without credentials, so a username opts in.
        let import_bundle = self.vra_import || self.vra_username.is_some();

        Ok(RunConfig {
            source,
            target,
            headers,
            skip_tls_verify: self.skip_ssl_verification,
            bearer_token,
            username: self.vra_username,
            password: self.vra_password,
            import_bundle,
            verbose: self.verbose,
        })
    }
}

/// Parses repeated `Name: Value` strings. Splits on the first colon only:
/// header values may themselves contain colons.
fn parse_headers(raw: &[String]) -> anyhow::Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for entry in raw {
        let Some((name, value)) = entry.split_once(':') else {
            bail!("invalid header '{entry}': expected 'Name: Value'");
        };
        let name: HeaderName = name
            .trim()
            .parse()
            .with_context(|| format!("invalid header name in '{entry}'"))?;
        let value: HeaderValue = value
            .trim()
            .parse()
            .with_context(|| format!("invalid header value in '{entry}'"))?;
        headers.append(name, value);
    }
    Ok(headers)
}

/// A `Authorization: Bearer <token>` header seeds the token the same way
/// the BEARER_TOKEN env var does, so the import step can reuse it.
fn bearer_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_owned)
}
