//! vRealize Automation API client.
//!
//! Two calls: CSP gateway login (username/password for a bearer token) and
//! bundle import (registering a completed upload with the provider API).

mod client;
mod types;

pub use client::{Client, Error};
pub use types::ImportSummary;
