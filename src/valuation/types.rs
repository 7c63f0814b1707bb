//! Data types produced by the valuation pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::comps::Comp;
use crate::subject::Subject;

/// Low / median / high price per m² and the matching totals for the
/// subject's built area.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub low: f64,
    pub median: f64,
    pub high: f64,
    pub total_low: f64,
    pub total_median: f64,
    pub total_high: f64,
}

impl PriceRange {
    pub fn from_per_m2(low: f64, median: f64, high: f64, built_area_m2: f64) -> Self {
        PriceRange {
            low,
            median,
            high,
            total_low: low * built_area_m2,
            total_median: median * built_area_m2,
            total_high: high * built_area_m2,
        }
    }

    /// Applies `f` to each per-m² figure and recomputes the totals.
    pub fn map_per_m2(&self, built_area_m2: f64, f: impl Fn(f64) -> f64) -> Self {
        Self::from_per_m2(f(self.low), f(self.median), f(self.high), built_area_m2)
    }
}

/// Decay rates used to weight comps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightingCoefficients {
    pub alpha_distance: f64,
    pub alpha_recency: f64,
    pub alpha_area_diff: f64,
}

/// Where the valuation placed the subject.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeocodedAddress {
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// Search bounds in effect when the comp set was frozen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SearchFilters {
    pub radius_km: f64,
    pub min_built: f64,
    pub max_built: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explainability {
    pub weights: WeightingCoefficients,
    pub filters: SearchFilters,
    pub notes: Vec<String>,
}

/// Complete answer for one subject.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Valuation {
    pub currency: String,
    pub address_geocoded: GeocodedAddress,
    pub image_quality_score: f64,
    /// Weighted rental comps followed by weighted sale comps.
    pub comps_used: Vec<Comp>,
    pub rental: PriceRange,
    pub sale: PriceRange,
    pub explainability: Explainability,
}

/// One flat row per valuation, appended to the history CSV.
#[derive(Debug, Serialize)]
pub struct ValuationSummary {
    pub timestamp: DateTime<Utc>,
    pub address: String,
    pub city: String,
    pub property_type: String,
    pub built_area_m2: f64,
    pub radius_km: f64,
    pub comps_used: usize,
    pub image_quality_score: f64,
    pub rental_low: f64,
    pub rental_median: f64,
    pub rental_high: f64,
    pub rental_total_median: f64,
    pub sale_low: f64,
    pub sale_median: f64,
    pub sale_high: f64,
    pub sale_total_median: f64,
}

impl ValuationSummary {
    pub fn new(subject: &Subject, valuation: &Valuation) -> Self {
        ValuationSummary {
            timestamp: Utc::now(),
            address: subject.address.clone(),
            city: subject.city.clone(),
            property_type: subject.property_type.to_string(),
            built_area_m2: subject.built_area_m2,
            radius_km: valuation.explainability.filters.radius_km,
            comps_used: valuation.comps_used.len(),
            image_quality_score: valuation.image_quality_score,
            rental_low: valuation.rental.low,
            rental_median: valuation.rental.median,
            rental_high: valuation.rental.high,
            rental_total_median: valuation.rental.total_median,
            sale_low: valuation.sale.low,
            sale_median: valuation.sale.median,
            sale_high: valuation.sale.high,
            sale_total_median: valuation.sale.total_median,
        }
    }
}
