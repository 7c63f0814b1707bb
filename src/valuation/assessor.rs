use anyhow::Result;
use chrono::{NaiveDateTime, Utc};
use tracing::{debug, info, warn};

use super::hedonic::estimate;
use super::learned::{LearnedModels, PricePredictor, features};
use super::types::{
    Explainability, GeocodedAddress, PriceRange, SearchFilters, Valuation, WeightingCoefficients,
};
use crate::comps::sources::build_connectors;
use crate::comps::{Aggregator, Comp, Query, filter_comps};
use crate::config::AppConfig;
use crate::geo::{CityTableGeocoder, Geocoder};
use crate::subject::Subject;
use crate::vision::{NeutralScorer, PhotoScorer, photos_score};

const QUANTILE_NOTE: &str = "Ranges are weighted quantiles (25/50/75%) of comparable price per m².";

/// Next search radius: one step wider, never past `max`.
pub fn next_radius(radius: f64, step: f64, max: f64) -> f64 {
    (radius + step).min(max)
}

/// Scales `value` by photo quality. A score of 0.5 is the identity; 0 and 1
/// move the value by `-k/2` and `+k/2`.
pub fn tilt(value: f64, score: f64, k: f64) -> f64 {
    value * (1.0 + (score - 0.5) * k)
}

/// Convex mix of the hedonic median and a learned prediction. A missing,
/// zero or non-finite prediction leaves the hedonic value as is.
pub fn blend(hedonic: f64, learned: Option<f64>, learned_weight: f64) -> f64 {
    match learned {
        Some(p) if p.is_finite() && p != 0.0 => {
            (1.0 - learned_weight) * hedonic + learned_weight * p
        }
        _ => hedonic,
    }
}

/// Runs a full valuation for one subject at a time. Holds only read-only
/// state, so one instance serves any number of requests.
pub struct Assessor {
    config: AppConfig,
    aggregator: Aggregator,
    geocoder: Box<dyn Geocoder>,
    scorer: Box<dyn PhotoScorer>,
    models: LearnedModels,
}

impl Assessor {
    /// City-table geocoding, neutral photo scoring and no learned models;
    /// override with the `with_*` methods.
    pub fn new(config: AppConfig, aggregator: Aggregator) -> Self {
        let geocoder = CityTableGeocoder::new(config.city_centers.clone());
        Self {
            config,
            aggregator,
            geocoder: Box::new(geocoder),
            scorer: Box::new(NeutralScorer),
            models: LearnedModels::default(),
        }
    }

    /// Builds the configured sources and loads learned models from
    /// `config.models_dir`.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        config.check()?;
        let timeout = config.connector_timeout();
        let connectors = build_connectors(&config.sources, timeout)?;
        let models = LearnedModels::load_dir(&config.models_dir);
        Ok(Self::new(config, Aggregator::new(connectors, timeout)).with_models(models))
    }

    pub fn with_geocoder(mut self, geocoder: impl Geocoder + 'static) -> Self {
        self.geocoder = Box::new(geocoder);
        self
    }

    pub fn with_photo_scorer(mut self, scorer: impl PhotoScorer + 'static) -> Self {
        self.scorer = Box::new(scorer);
        self
    }

    pub fn with_models(mut self, models: LearnedModels) -> Self {
        self.models = models;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn geocoder(&self) -> &dyn Geocoder {
        self.geocoder.as_ref()
    }

    pub fn coefficients(&self) -> WeightingCoefficients {
        WeightingCoefficients {
            alpha_distance: self.config.alpha_distance,
            alpha_recency: self.config.alpha_recency,
            alpha_area_diff: self.config.alpha_area_diff,
        }
    }

    pub async fn assess(&self, subject: &Subject) -> Result<Valuation> {
        self.assess_at(subject, Utc::now().naive_utc()).await
    }

    /// Values `subject` with comp recency measured against `now`.
    ///
    /// Only an invalid subject is an error. Missing coordinates, photos,
    /// sources or comps all degrade to documented defaults, explained in
    /// the result's notes.
    #[tracing::instrument(
        skip(self, subject, now),
        fields(city = %subject.city, property_type = %subject.property_type, built_area_m2 = subject.built_area_m2)
    )]
    pub async fn assess_at(&self, subject: &Subject, now: NaiveDateTime) -> Result<Valuation> {
        subject.validate()?;
        let cfg = &self.config;
        let built = subject.built_area_m2;

        let mut notes = vec![
            QUANTILE_NOTE.to_string(),
            format!(
                "Prices tilted by photo quality (±{:.1}% max).",
                cfg.image_tilt * 50.0
            ),
        ];

        let location = self.geocoder.geocode(
            &subject.address,
            &subject.city,
            &subject.state,
            &subject.country,
        );
        if location.is_none() {
            warn!("Subject location unknown, distances unavailable");
            notes.push(format!(
                "Location of '{}' is unknown; comps were not weighted or filtered by distance.",
                subject.city
            ));
        }
        let (lat, lon) = location.unzip();

        let image_quality_score = photos_score(self.scorer.as_ref(), &subject.photos);
        debug!(image_quality_score, "Photo quality scored");

        let min_built = built * cfg.area_band_min;
        let max_built = built * cfg.area_band_max;
        let query = subject.query();

        let (comps, radius_km) = self
            .gather(&query, lat, lon, min_built, max_built)
            .await;
        if comps.len() < cfg.min_comps {
            notes.push(format!(
                "Only {} comparable listing(s) found within {} km (minimum {}).",
                comps.len(),
                radius_km,
                cfg.min_comps
            ));
        }

        let mut rental_pool = Vec::new();
        let mut sale_pool = Vec::new();
        let mut unknown_kind = 0usize;
        for comp in comps {
            match comp.is_rental {
                Some(true) => rental_pool.push(comp),
                Some(false) => sale_pool.push(comp),
                None => unknown_kind += 1,
            }
        }
        debug!(
            rental = rental_pool.len(),
            sale = sale_pool.len(),
            unknown_kind,
            "Comps partitioned"
        );

        let coefficients = self.coefficients();
        let (rent_range, rent_weighted) = estimate(subject, &rental_pool, &coefficients, now);
        let (sale_range, sale_weighted) = estimate(subject, &sale_pool, &coefficients, now);

        if rent_weighted.is_empty() {
            notes.push("No priced rental comps; rental range is zero.".to_string());
        }
        if sale_weighted.is_empty() {
            notes.push("No priced sale comps; sale range is zero.".to_string());
        }

        let x = features(subject, &cfg.predictor_cities);
        let rent_median = self.blended_median(&rent_range, self.models.rent(), &x, "rental", &mut notes);
        let sale_median = self.blended_median(&sale_range, self.models.sale(), &x, "sale", &mut notes);

        let apply_tilt = |v: f64| tilt(v, image_quality_score, cfg.image_tilt);
        let rental = PriceRange {
            median: rent_median,
            ..rent_range
        }
        .map_per_m2(built, apply_tilt);
        let sale = PriceRange {
            median: sale_median,
            ..sale_range
        }
        .map_per_m2(built, apply_tilt);

        let mut comps_used = rent_weighted;
        comps_used.extend(sale_weighted);

        info!(
            radius_km,
            comps = comps_used.len(),
            image_quality_score,
            rental_median = rental.median,
            sale_median = sale.median,
            "Valuation complete"
        );

        Ok(Valuation {
            currency: cfg.currency.clone(),
            address_geocoded: GeocodedAddress {
                address: subject.address.clone(),
                city: subject.city.clone(),
                state: subject.state.clone(),
                country: subject.country.clone(),
                lat,
                lon,
            },
            image_quality_score,
            comps_used,
            rental,
            sale,
            explainability: Explainability {
                weights: coefficients,
                filters: SearchFilters {
                    radius_km,
                    min_built,
                    max_built,
                },
                notes,
            },
        })
    }

    /// Aggregates and filters at the default radius, widening step by step
    /// until enough comps are found or the maximum radius is reached.
    /// Returns the final comp set and the radius that produced it.
    async fn gather(
        &self,
        query: &Query,
        lat: Option<f64>,
        lon: Option<f64>,
        min_built: f64,
        max_built: f64,
    ) -> (Vec<Comp>, f64) {
        let cfg = &self.config;
        let mut radius = cfg.default_radius_km;
        let mut comps = self
            .search(query, lat, lon, radius, min_built, max_built)
            .await;

        while comps.len() < cfg.min_comps && radius < cfg.max_radius_km {
            let next = next_radius(radius, cfg.radius_step_km, cfg.max_radius_km);
            if next <= radius {
                break;
            }
            debug!(from = radius, to = next, found = comps.len(), "Widening search radius");
            radius = next;
            comps = self
                .search(query, lat, lon, radius, min_built, max_built)
                .await;
        }

        (comps, radius)
    }

    async fn search(
        &self,
        query: &Query,
        lat: Option<f64>,
        lon: Option<f64>,
        radius: f64,
        min_built: f64,
        max_built: f64,
    ) -> Vec<Comp> {
        let comps = self.aggregator.get_comps(query, lat, lon, Some(radius)).await;
        filter_comps(
            comps,
            Some(query.property_type),
            Some(min_built),
            Some(max_built),
        )
    }

    fn blended_median(
        &self,
        range: &PriceRange,
        predictor: Option<&dyn PricePredictor>,
        features: &[f64],
        kind: &str,
        notes: &mut Vec<String>,
    ) -> f64 {
        let Some(learned) = predictor
            .and_then(|p| p.predict(features))
            .filter(|p| p.is_finite() && *p != 0.0)
        else {
            return range.median;
        };

        let weight = self.config.learned_blend_weight;
        let median = blend(range.median, Some(learned), weight);
        debug!(kind, hedonic = range.median, learned, blended = median, "Learned blend applied");
        notes.push(format!(
            "Learned {kind} model blended into the median ({:.0}% learned, {:.0}% hedonic).",
            weight * 100.0,
            (1.0 - weight) * 100.0
        ));
        median
    }
}
