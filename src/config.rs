//! Process-wide valuation settings.
//!
//! Loaded once at startup from a JSON file (or built from defaults) and
//! read-only afterwards. Every key is optional on disk:
//! ```json
//! {
//!   "default_radius_km": 10.0,
//!   "min_comps": 4,
//!   "sources": [
//!     { "kind": "json_file", "name": "sample", "path": "data/sample_listings.json" },
//!     { "kind": "http_json", "name": "partner", "url": "https://example.com/listings" },
//!     { "kind": "empty", "name": "olx" }
//!   ]
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Approximate center of a city, used as the subject location fallback.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CityCenter {
    pub lat: f64,
    pub lon: f64,
}

/// A listing source registered at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Static listings read from a JSON file.
    JsonFile { name: String, path: PathBuf },
    /// Listings served as a JSON array by an HTTP endpoint.
    HttpJson { name: String, url: String },
    /// Registered source with no backing implementation yet.
    Empty { name: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub currency: String,

    pub default_radius_km: f64,
    pub max_radius_km: f64,
    pub radius_step_km: f64,
    pub min_comps: usize,

    /// Comp built area must fall in `[area_band_min, area_band_max]` times
    /// the subject's built area.
    pub area_band_min: f64,
    pub area_band_max: f64,

    /// Exponential decay per km.
    pub alpha_distance: f64,
    /// Exponential decay per month since posting.
    pub alpha_recency: f64,
    /// Exponential decay per unit of relative area difference.
    pub alpha_area_diff: f64,

    /// Share of the learned prediction in the blended median.
    pub learned_blend_weight: f64,
    /// Full swing of the photo-quality tilt; a score of 0 or 1 moves
    /// prices by half of this.
    pub image_tilt: f64,

    pub connector_timeout_secs: u64,

    pub city_centers: BTreeMap<String, CityCenter>,
    /// Cities one-hot encoded in the learned-model feature vector, in order.
    pub predictor_cities: Vec<String>,
    pub models_dir: PathBuf,

    pub sources: Vec<SourceConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let city_centers = [
            ("Contagem", -19.931, -44.053),
            ("Betim", -19.966, -44.196),
            ("Vespasiano", -19.689, -43.923),
            ("Santa Luzia", -19.769, -43.851),
            ("Lagoa Santa", -19.639, -43.893),
            ("Belo Horizonte", -19.922, -43.945),
        ]
        .into_iter()
        .map(|(name, lat, lon)| (name.to_string(), CityCenter { lat, lon }))
        .collect();

        let predictor_cities = ["contagem", "betim", "vespasiano", "santa luzia", "lagoa santa"]
            .into_iter()
            .map(String::from)
            .collect();

        let mut sources = vec![SourceConfig::JsonFile {
            name: "sample".to_string(),
            path: PathBuf::from("data/sample_listings.json"),
        }];
        sources.extend(["olx", "vivareal", "zap"].into_iter().map(|name| {
            SourceConfig::Empty {
                name: name.to_string(),
            }
        }));

        Self {
            currency: "BRL".to_string(),
            default_radius_km: 15.0,
            max_radius_km: 35.0,
            radius_step_km: 5.0,
            min_comps: 6,
            area_band_min: 0.5,
            area_band_max: 2.0,
            alpha_distance: 0.12,
            alpha_recency: 0.10,
            alpha_area_diff: 1.0,
            learned_blend_weight: 0.4,
            image_tilt: 0.10,
            connector_timeout_secs: 30,
            city_centers,
            predictor_cities,
            models_dir: PathBuf::from("data/models"),
            sources,
        }
    }
}

impl AppConfig {
    /// Loads the config from a JSON file at `path`. Missing keys keep their defaults.
    pub fn load(path: &str) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("reading config '{path}'"))?;
        let config: AppConfig =
            serde_json::from_str(&content).with_context(|| format!("parsing config '{path}'"))?;
        config.check()?;
        Ok(config)
    }

    pub fn connector_timeout(&self) -> Duration {
        Duration::from_secs(self.connector_timeout_secs)
    }

    /// Rejects settings that would stall the radius search, invert the area
    /// band, push comp weights above 1 or time out every source.
    pub fn check(&self) -> Result<()> {
        if !(self.radius_step_km > 0.0) {
            anyhow::bail!("radius_step_km must be positive, got {}", self.radius_step_km);
        }
        if self.max_radius_km < self.default_radius_km {
            anyhow::bail!(
                "max_radius_km ({}) is below default_radius_km ({})",
                self.max_radius_km,
                self.default_radius_km
            );
        }
        if self.area_band_min > self.area_band_max {
            anyhow::bail!(
                "area band [{}, {}] is inverted",
                self.area_band_min,
                self.area_band_max
            );
        }
        for (name, alpha) in [
            ("alpha_distance", self.alpha_distance),
            ("alpha_recency", self.alpha_recency),
            ("alpha_area_diff", self.alpha_area_diff),
        ] {
            if !(alpha.is_finite() && alpha >= 0.0) {
                anyhow::bail!("{name} must be a non-negative number, got {alpha}");
            }
        }
        if self.connector_timeout_secs == 0 {
            anyhow::bail!("connector_timeout_secs must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.learned_blend_weight) {
            anyhow::bail!(
                "learned_blend_weight must be within [0, 1], got {}",
                self.learned_blend_weight
            );
        }
        Ok(())
    }
}
