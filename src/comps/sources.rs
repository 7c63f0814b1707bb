//! Concrete [`Connector`] implementations and their registration from config.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use serde_json::Value;
use tracing::{debug, warn};

use super::{Comp, Connector, Query};
use crate::config::SourceConfig;
use crate::fetch::{BasicClient, fetch_json};

/// Reads a JSON array of listings from disk on every search and keeps the
/// ones whose `property_type` matches the query.
pub struct JsonFileConnector {
    name: String,
    path: PathBuf,
}

impl JsonFileConnector {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

#[async_trait]
impl Connector for JsonFileConnector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, query: &Query) -> Result<Vec<Comp>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("reading listings from {}", self.path.display()))?;
        let raw: Vec<Value> = serde_json::from_str(&content)
            .with_context(|| format!("parsing listings in {}", self.path.display()))?;
        let records = decode_listings(&self.name, raw);

        let wanted = query.property_type.as_str();
        let total = records.len();
        let matched: Vec<Comp> = records
            .into_iter()
            .filter(|c| c.property_type.as_deref() == Some(wanted))
            .collect();

        debug!(
            path = %self.path.display(),
            total,
            matched = matched.len(),
            "Listings file read"
        );
        Ok(matched)
    }
}

/// Asks an HTTP endpoint for listings. The endpoint receives the query as
/// `city`, `state`, `country` and `property_type` parameters and must answer
/// with a JSON array of records in the standard shape.
pub struct HttpJsonConnector {
    name: String,
    url: String,
    client: BasicClient,
}

impl HttpJsonConnector {
    pub fn new(name: impl Into<String>, url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            url: url.into(),
            client: BasicClient::new(timeout)?,
        })
    }
}

#[async_trait]
impl Connector for HttpJsonConnector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, query: &Query) -> Result<Vec<Comp>> {
        let params = [
            ("city", query.city.as_str()),
            ("state", query.state.as_str()),
            ("country", query.country.as_str()),
            ("property_type", query.property_type.as_str()),
        ];
        let raw: Vec<Value> = fetch_json(&self.client, &self.url, &params).await?;
        Ok(decode_listings(&self.name, raw))
    }
}

/// A registered source with nothing behind it yet.
pub struct EmptyConnector {
    name: String,
}

impl EmptyConnector {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Connector for EmptyConnector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, _query: &Query) -> Result<Vec<Comp>> {
        Ok(Vec::new())
    }
}

/// Converts raw listing records one by one. A record that does not fit the
/// [`Comp`] shape is logged and skipped; the rest of the payload is kept.
fn decode_listings(source: &str, raw: Vec<Value>) -> Vec<Comp> {
    let total = raw.len();
    let comps: Vec<Comp> = raw
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| {
            let id = record.get("id").map(Value::to_string);
            match serde_json::from_value::<Comp>(record) {
                Ok(comp) => Some(comp),
                Err(e) => {
                    warn!(source, index, ?id, error = %e, "Skipping malformed listing");
                    None
                }
            }
        })
        .collect();

    if comps.len() < total {
        debug!(source, total, decoded = comps.len(), "Listings partially decoded");
    }
    comps
}

/// Instantiates the configured sources, preserving their order.
pub fn build_connectors(
    sources: &[SourceConfig],
    timeout: Duration,
) -> Result<Vec<Arc<dyn Connector>>> {
    sources
        .iter()
        .map(|source| -> Result<Arc<dyn Connector>> {
            let connector: Arc<dyn Connector> = match source {
                SourceConfig::JsonFile { name, path } => {
                    Arc::new(JsonFileConnector::new(name.as_str(), path.clone()))
                }
                SourceConfig::HttpJson { name, url } => Arc::new(
                    HttpJsonConnector::new(name.as_str(), url.as_str(), timeout)
                        .with_context(|| format!("building HTTP source '{name}'"))?,
                ),
                SourceConfig::Empty { name } => Arc::new(EmptyConnector::new(name.as_str())),
            };
            Ok(connector)
        })
        .collect()
}
