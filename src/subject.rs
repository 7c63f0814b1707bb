//! The property being valued.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::comps::Query;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    /// Warehouse / industrial shed.
    #[default]
    Galpao,
    Apartamento,
    Casa,
    /// Office room.
    Sala,
    /// Retail store.
    Loja,
    /// Land lot.
    Terreno,
    Outro,
}

impl PropertyType {
    /// Wire name, as used by listing sources.
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Galpao => "galpao",
            PropertyType::Apartamento => "apartamento",
            PropertyType::Casa => "casa",
            PropertyType::Sala => "sala",
            PropertyType::Loja => "loja",
            PropertyType::Terreno => "terreno",
            PropertyType::Outro => "outro",
        }
    }
}

impl std::fmt::Display for PropertyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to a photo of the subject: a local file, a remote URL, or both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

fn default_state() -> String {
    "MG".to_string()
}

fn default_country() -> String {
    "BR".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub address: String,
    pub city: String,
    #[serde(default = "default_state")]
    pub state: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default)]
    pub property_type: PropertyType,

    pub built_area_m2: f64,
    #[serde(default)]
    pub land_area_m2: Option<f64>,

    #[serde(default)]
    pub bedrooms: Option<u32>,
    #[serde(default)]
    pub bathrooms: Option<u32>,
    #[serde(default)]
    pub parking: Option<u32>,

    // industrial attributes
    #[serde(default)]
    pub ceiling_height_m: Option<f64>,
    #[serde(default)]
    pub energy_capacity_kva: Option<f64>,
    #[serde(default)]
    pub dock_doors: Option<u32>,

    #[serde(default)]
    pub photos: Vec<Photo>,
}

impl Subject {
    /// Minimal subject with only the required fields set.
    pub fn new(address: &str, city: &str, property_type: PropertyType, built_area_m2: f64) -> Self {
        Subject {
            address: address.to_string(),
            city: city.to_string(),
            state: default_state(),
            country: default_country(),
            property_type,
            built_area_m2,
            land_area_m2: None,
            bedrooms: None,
            bathrooms: None,
            parking: None,
            ceiling_height_m: None,
            energy_capacity_kva: None,
            dock_doors: None,
            photos: Vec::new(),
        }
    }

    /// Request-boundary checks. The valuation core assumes these hold.
    pub fn validate(&self) -> Result<()> {
        if !self.built_area_m2.is_finite() || self.built_area_m2 <= 0.0 {
            anyhow::bail!(
                "built_area_m2 must be a positive number, got {}",
                self.built_area_m2
            );
        }
        if self.city.trim().is_empty() {
            anyhow::bail!("city must not be empty");
        }
        if let Some(land) = self.land_area_m2 {
            if !land.is_finite() || land < 0.0 {
                anyhow::bail!("land_area_m2 must be non-negative, got {land}");
            }
        }
        Ok(())
    }

    pub fn query(&self) -> Query {
        Query {
            city: self.city.clone(),
            state: self.state.clone(),
            country: self.country.clone(),
            property_type: self.property_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_applies_defaults() {
        let subject: Subject = serde_json::from_str(
            r#"{ "address": "Av. Central, 10", "city": "Contagem", "built_area_m2": 1500.0 }"#,
        )
        .unwrap();

        assert_eq!(subject.state, "MG");
        assert_eq!(subject.country, "BR");
        assert_eq!(subject.property_type, PropertyType::Galpao);
        assert!(subject.photos.is_empty());
        assert!(subject.validate().is_ok());
    }

    #[test]
    fn test_property_type_wire_names() {
        let t: PropertyType = serde_json::from_str(r#""terreno""#).unwrap();
        assert_eq!(t, PropertyType::Terreno);
        assert_eq!(t.as_str(), "terreno");
        assert!(serde_json::from_str::<PropertyType>(r#""castle""#).is_err());
    }

    #[test]
    fn test_validate_rejects_non_positive_area() {
        for area in [0.0, -10.0, f64::NAN, f64::INFINITY] {
            let subject = Subject::new("Rua A", "Betim", PropertyType::Galpao, area);
            assert!(subject.validate().is_err(), "area {area} accepted");
        }
    }

    #[test]
    fn test_validate_rejects_blank_city() {
        let subject = Subject::new("Rua A", "  ", PropertyType::Casa, 120.0);
        assert!(subject.validate().is_err());
    }

    #[test]
    fn test_query_carries_location_and_type() {
        let subject = Subject::new("Rua A", "Betim", PropertyType::Loja, 200.0);
        let query = subject.query();
        assert_eq!(query.city, "Betim");
        assert_eq!(query.state, "MG");
        assert_eq!(query.country, "BR");
        assert_eq!(query.property_type, PropertyType::Loja);
    }
}
