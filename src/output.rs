//! Output formatting and persistence for valuations.
//!
//! Supports pretty-printing, JSON to stdout, and a CSV history of summaries.

use anyhow::Result;
use tracing::debug;

use crate::valuation::{Valuation, ValuationSummary};
use csv::WriterBuilder;
use std::fs::OpenOptions;
use std::path::Path;

/// Logs a valuation using Rust's debug pretty-print format.
pub fn print_pretty(valuation: &Valuation) {
    debug!("{:#?}", valuation);
}

/// Writes a valuation to stdout as pretty-printed JSON.
pub fn print_json(valuation: &Valuation) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(valuation)?);
    Ok(())
}

/// Appends a [`ValuationSummary`] as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_summary(path: &str, summary: &ValuationSummary) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, "Appending valuation summary");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);

    writer.serialize(summary)?;
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subject::{PropertyType, Subject};
    use crate::valuation::PriceRange;
    use crate::valuation::types::{
        Explainability, GeocodedAddress, SearchFilters, WeightingCoefficients,
    };
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    fn subject() -> Subject {
        Subject::new("Av. Central, 10", "Contagem", PropertyType::Galpao, 1500.0)
    }

    fn valuation() -> Valuation {
        Valuation {
            currency: "BRL".to_string(),
            address_geocoded: GeocodedAddress {
                address: "Av. Central, 10".to_string(),
                city: "Contagem".to_string(),
                state: "MG".to_string(),
                country: "BR".to_string(),
                lat: Some(-19.931),
                lon: Some(-44.053),
            },
            image_quality_score: 0.5,
            comps_used: Vec::new(),
            rental: PriceRange::from_per_m2(20.0, 25.0, 30.0, 1500.0),
            sale: PriceRange::default(),
            explainability: Explainability {
                weights: WeightingCoefficients {
                    alpha_distance: 0.12,
                    alpha_recency: 0.10,
                    alpha_area_diff: 1.0,
                },
                filters: SearchFilters {
                    radius_km: 15.0,
                    min_built: 750.0,
                    max_built: 3000.0,
                },
                notes: vec!["note".to_string()],
            },
        }
    }

    #[test]
    fn test_print_pretty_does_not_panic() {
        print_pretty(&valuation());
    }

    #[test]
    fn test_print_json_does_not_panic() {
        print_json(&valuation()).unwrap();
    }

    #[test]
    fn test_append_summary_writes_header_once() {
        let path = temp_path("comp_valuator_test_summary_header.csv");
        let _ = fs::remove_file(&path);

        let summary = ValuationSummary::new(&subject(), &valuation());
        append_summary(&path, &summary).unwrap();
        append_summary(&path, &summary).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            content.lines().filter(|l| l.starts_with("timestamp")).count(),
            1
        );
        assert!(lines[1].contains("Contagem"));
        assert!(lines[1].contains("galpao"));

        fs::remove_file(&path).unwrap();
    }
}
