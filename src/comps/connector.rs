use anyhow::Result;
use async_trait::async_trait;

use super::{Comp, Query};

/// A listing source.
///
/// `search` may return an empty list. Errors are not fatal: the
/// [`Aggregator`](super::Aggregator) treats a failing source as one that
/// returned nothing.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Provenance tag stamped on records that carry no `source` of their own.
    fn name(&self) -> &str;

    async fn search(&self, query: &Query) -> Result<Vec<Comp>>;
}
