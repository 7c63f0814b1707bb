use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::debug;

use super::quantile::WeightedSample;
use super::types::{PriceRange, WeightingCoefficients};
use crate::comps::Comp;
use crate::subject::Subject;

/// Recency assumed for comps whose posting date is missing or unreadable.
const DEFAULT_MONTHS: f64 = 1.0;
const DAYS_PER_MONTH: f64 = 30.0;

/// Months elapsed between `date_posted` and `now`, never negative.
///
/// Accepts `YYYY-MM-DD`, naive `YYYY-MM-DDTHH:MM:SS[.f]` (or with a space
/// separator) and RFC 3339 timestamps.
pub fn months_since(date_posted: Option<&str>, now: NaiveDateTime) -> f64 {
    let Some(posted) = date_posted.map(str::trim).and_then(parse_posted) else {
        return DEFAULT_MONTHS;
    };
    let days = (now - posted).num_days() as f64;
    (days / DAYS_PER_MONTH).max(0.0)
}

fn parse_posted(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Listed price per m², or one derived from the total price and built area.
/// `None` when the comp carries no usable price signal.
pub fn price_per_m2(comp: &Comp) -> Option<f64> {
    let listed = comp.price_per_m2.filter(|p| p.is_finite() && *p > 0.0);
    let derived = || match (comp.price_total, comp.built_area_m2) {
        (Some(total), Some(area)) if total > 0.0 && area > 0.0 => Some(total / area.max(1.0)),
        _ => None,
    };
    listed
        .or_else(derived)
        .filter(|p| p.is_finite() && *p > 0.0)
}

/// `|area - built| / max(built, 1)`, or 0 when the comp area is unknown.
fn area_diff_ratio(comp_area: Option<f64>, built: f64) -> f64 {
    match comp_area {
        Some(area) if area > 0.0 && built > 0.0 => (area - built).abs() / built.max(1.0),
        _ => 0.0,
    }
}

/// Similarity weight in (0, 1]. Unknown distance costs nothing here.
pub fn comp_weight(
    coefficients: &WeightingCoefficients,
    distance_km: Option<f64>,
    months: f64,
    area_diff: f64,
) -> f64 {
    let dist = distance_km.unwrap_or(0.0);
    (-coefficients.alpha_distance * dist).exp()
        * (-coefficients.alpha_recency * months).exp()
        * (-coefficients.alpha_area_diff * area_diff).exp()
}

/// Weights each priced comp by similarity to the subject and returns the
/// weighted p25 / p50 / p75 price per m² with totals for the subject's
/// built area, together with the comps that contributed (with `weight` and
/// `months_since` filled in).
///
/// Comps without a price signal are skipped. An empty pool yields an
/// all-zero range.
pub fn estimate(
    subject: &Subject,
    comps: &[Comp],
    coefficients: &WeightingCoefficients,
    now: NaiveDateTime,
) -> (PriceRange, Vec<Comp>) {
    let built = subject.built_area_m2;

    let mut points = Vec::with_capacity(comps.len());
    let mut weighted = Vec::with_capacity(comps.len());

    for comp in comps {
        let Some(ppm2) = price_per_m2(comp) else {
            continue;
        };

        let months = months_since(comp.date_posted.as_deref(), now);
        let area_diff = area_diff_ratio(comp.built_area_m2, built);
        let weight = comp_weight(coefficients, comp.distance_km, months, area_diff);

        points.push((ppm2, weight));
        weighted.push(Comp {
            weight: Some(weight),
            months_since: Some(months),
            ..comp.clone()
        });
    }

    let skipped = comps.len() - weighted.len();
    let sample = WeightedSample::new(points);
    if sample.is_empty() {
        debug!(input = comps.len(), "No priced comps, returning zero range");
        return (PriceRange::default(), weighted);
    }

    let range = PriceRange::from_per_m2(
        sample.quantile(0.25),
        sample.quantile(0.50),
        sample.quantile(0.75),
        built,
    );

    debug!(
        used = sample.len(),
        skipped,
        total_weight = sample.total_weight(),
        low = range.low,
        median = range.median,
        high = range.high,
        "Hedonic estimate"
    );

    (range, weighted)
}
