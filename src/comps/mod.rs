//! Comparable listings: the record shape, its sources, and how they are
//! gathered and narrowed down for a valuation.
//!
//! [`Connector`] is the async trait every listing source implements.
//! [`Aggregator`] fans a [`Query`] out to all registered connectors.
//! [`filter_comps`] narrows the merged list by type and built area.

pub mod aggregator;
pub mod connector;
pub mod filter;
pub mod sources;

pub use aggregator::Aggregator;
pub use connector::Connector;
pub use filter::filter_comps;

use serde::{Deserialize, Serialize};

use crate::subject::PropertyType;

/// What a connector is asked for. The search radius is applied after
/// aggregation and is never part of the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Query {
    pub city: String,
    pub state: String,
    pub country: String,
    pub property_type: PropertyType,
}

/// A listing in the standard shape shared by all sources.
///
/// Every field is optional and deserializes to `None` when the source
/// omits it. `distance_km`, `weight` and `months_since` are filled in while
/// the valuation runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Comp {
    pub id: Option<String>,
    pub title: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub url: Option<String>,
    pub source: Option<String>,

    pub property_type: Option<String>,
    pub built_area_m2: Option<f64>,
    pub land_area_m2: Option<f64>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub parking: Option<u32>,

    /// `Some(true)` rental, `Some(false)` sale, `None` unknown.
    pub is_rental: Option<bool>,
    pub price_total: Option<f64>,
    pub price_per_m2: Option<f64>,
    pub date_posted: Option<String>,
    pub extras: Option<serde_json::Value>,

    /// Distance to the subject; `None` when either side has no coordinates.
    pub distance_km: Option<f64>,
    pub weight: Option<f64>,
    pub months_since: Option<f64>,
}

impl Comp {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.lat?, self.lon?))
    }
}
