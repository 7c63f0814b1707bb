//! Photo quality as a single [0, 1] score.
//!
//! Pixel-level analysis lives behind [`PhotoScorer`]; this module only
//! combines per-photo scores.

use tracing::debug;

use crate::subject::Photo;

/// Score used when no photo could be scored. Leaves prices untouched.
pub const NEUTRAL_SCORE: f64 = 0.5;

pub trait PhotoScorer: Send + Sync {
    /// Quality of one photo in [0, 1], or `None` when it cannot be read.
    fn score(&self, photo: &Photo) -> Option<f64>;
}

/// Scorer for deployments without image analysis: every photo is unusable,
/// so the aggregate is always neutral.
pub struct NeutralScorer;

impl PhotoScorer for NeutralScorer {
    fn score(&self, _photo: &Photo) -> Option<f64> {
        None
    }
}

/// Mean of the usable photo scores, clamped to [0, 1];
/// [`NEUTRAL_SCORE`] when there are none.
pub fn photos_score(scorer: &dyn PhotoScorer, photos: &[Photo]) -> f64 {
    let scores: Vec<f64> = photos
        .iter()
        .filter_map(|p| scorer.score(p))
        .filter(|s| s.is_finite())
        .map(|s| s.clamp(0.0, 1.0))
        .collect();

    if scores.is_empty() {
        debug!(photos = photos.len(), "No usable photos, neutral quality score");
        return NEUTRAL_SCORE;
    }

    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    mean.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reads the score from the file name, e.g. `0.8.jpg`.
    struct NameScorer;

    impl PhotoScorer for NameScorer {
        fn score(&self, photo: &Photo) -> Option<f64> {
            photo.path.as_deref()?.strip_suffix(".jpg")?.parse().ok()
        }
    }

    fn photo(path: &str) -> Photo {
        Photo {
            path: Some(path.to_string()),
            url: None,
        }
    }

    #[test]
    fn test_no_photos_is_neutral() {
        assert_eq!(photos_score(&NameScorer, &[]), NEUTRAL_SCORE);
        assert_eq!(photos_score(&NeutralScorer, &[photo("0.9.jpg")]), NEUTRAL_SCORE);
    }

    #[test]
    fn test_unreadable_photos_are_skipped() {
        let photos = [photo("0.8.jpg"), photo("broken.png"), photo("0.6.jpg")];
        assert!((photos_score(&NameScorer, &photos) - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_scores_are_clamped() {
        let photos = [photo("1.6.jpg"), photo("-2.jpg")];
        assert_eq!(photos_score(&NameScorer, &photos), 0.5);
        assert_eq!(photos_score(&NameScorer, &[photo("3.jpg")]), 1.0);
    }
}
