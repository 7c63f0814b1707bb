//! Minimal HTTP plumbing for network-backed listing sources.

mod basic;

pub use basic::BasicClient;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Request, Response};
use serde::de::DeserializeOwned;

#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}

/// GETs `url` with `params` appended to the query string and decodes the
/// JSON body into `T`.
///
/// # Errors
///
/// Fails on transport errors, non-2xx statuses, and bodies that do not
/// decode as `T`.
pub async fn fetch_json<C: HttpClient, T: DeserializeOwned>(
    client: &C,
    url: &str,
    params: &[(&str, &str)],
) -> Result<T> {
    let mut url: reqwest::Url = url.parse().with_context(|| format!("invalid URL '{url}'"))?;
    if !params.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (k, v) in params {
            pairs.append_pair(k, v);
        }
    }

    let req = Request::new(reqwest::Method::GET, url);
    let resp = client.execute(req).await?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("HTTP {status}: {body}");
    }

    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).context("decoding JSON response")
}
