//! Comp weighting and price estimation.
//!
//! [`hedonic::estimate`] turns a comp pool into weighted p25/p50/p75 prices
//! per m². [`Assessor`] drives a full valuation: geocoding, comp search with
//! radius widening, rental/sale split, the optional learned blend and the
//! photo-quality tilt.

pub mod assessor;
pub mod hedonic;
pub mod learned;
pub mod quantile;
pub mod types;

pub use assessor::Assessor;
pub use types::{PriceRange, Valuation, ValuationSummary, WeightingCoefficients};
