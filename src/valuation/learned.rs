//! Optional learned price-per-m² predictors.
//!
//! Models are trained offline and exported as plain linear coefficients.
//! A missing or unreadable artifact means "no prediction" for that
//! transaction type, never an error.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::subject::Subject;

pub const RENT_MODEL_FILE: &str = "rent_model.json";
pub const SALE_MODEL_FILE: &str = "sale_model.json";

/// Number of numeric subject attributes ahead of the city one-hot block.
pub const NUMERIC_FEATURES: usize = 5;

pub trait PricePredictor: Send + Sync {
    /// Price per m² for an encoded subject, or `None` when the model cannot
    /// answer for this input.
    fn predict(&self, features: &[f64]) -> Option<f64>;
}

/// Encodes the subject as `[built, land, ceiling, power, docks, one-hot(city)]`.
/// Missing attributes encode as 0; the city match ignores case.
pub fn features(subject: &Subject, cities: &[String]) -> Vec<f64> {
    let city = subject.city.trim().to_lowercase();

    let mut x = Vec::with_capacity(NUMERIC_FEATURES + cities.len());
    x.push(subject.built_area_m2);
    x.push(subject.land_area_m2.unwrap_or(0.0));
    x.push(subject.ceiling_height_m.unwrap_or(0.0));
    x.push(subject.energy_capacity_kva.unwrap_or(0.0));
    x.push(subject.dock_doors.map_or(0.0, f64::from));
    x.extend(
        cities
            .iter()
            .map(|c| if c.to_lowercase() == city { 1.0 } else { 0.0 }),
    );
    x
}

/// Linear regression exported as JSON:
/// ```json
/// { "intercept": 12.5, "coefficients": [0.001, 0.0, 0.4, 0.01, 0.2, 1.5, 0.8, -0.3, -0.2, 0.6] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearModel {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading model {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("parsing model {}", path.display()))
    }
}

impl PricePredictor for LinearModel {
    fn predict(&self, features: &[f64]) -> Option<f64> {
        if features.len() != self.coefficients.len() {
            warn!(
                expected = self.coefficients.len(),
                got = features.len(),
                "Feature vector length mismatch, skipping prediction"
            );
            return None;
        }

        let y = self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(c, x)| c * x)
                .sum::<f64>();
        y.is_finite().then_some(y)
    }
}

/// Predictors for each transaction type, loaded once at startup.
#[derive(Default)]
pub struct LearnedModels {
    rent: Option<Box<dyn PricePredictor>>,
    sale: Option<Box<dyn PricePredictor>>,
}

impl LearnedModels {
    pub fn new(
        rent: Option<Box<dyn PricePredictor>>,
        sale: Option<Box<dyn PricePredictor>>,
    ) -> Self {
        Self { rent, sale }
    }

    /// Reads [`RENT_MODEL_FILE`] and [`SALE_MODEL_FILE`] from `dir`.
    pub fn load_dir(dir: &Path) -> Self {
        Self {
            rent: load_optional(&dir.join(RENT_MODEL_FILE)),
            sale: load_optional(&dir.join(SALE_MODEL_FILE)),
        }
    }

    pub fn rent(&self) -> Option<&dyn PricePredictor> {
        self.rent.as_deref()
    }

    pub fn sale(&self) -> Option<&dyn PricePredictor> {
        self.sale.as_deref()
    }
}

fn load_optional(path: &Path) -> Option<Box<dyn PricePredictor>> {
    if !path.exists() {
        debug!(path = %path.display(), "No learned model artifact");
        return None;
    }
    match LinearModel::load(path) {
        Ok(model) => {
            info!(path = %path.display(), features = model.coefficients.len(), "Learned model loaded");
            Some(Box::new(model))
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring unreadable learned model");
            None
        }
    }
}
