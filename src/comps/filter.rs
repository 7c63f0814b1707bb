use super::Comp;
use crate::subject::PropertyType;

/// Keeps comps of the given type whose built area lies within the inclusive
/// `[min_built, max_built]` band. Every criterion is optional, but comps
/// with unknown built area are always dropped.
pub fn filter_comps(
    comps: Vec<Comp>,
    property_type: Option<PropertyType>,
    min_built: Option<f64>,
    max_built: Option<f64>,
) -> Vec<Comp> {
    comps
        .into_iter()
        .filter(|c| {
            if let Some(t) = property_type {
                if c.property_type.as_deref() != Some(t.as_str()) {
                    return false;
                }
            }

            let Some(area) = c.built_area_m2 else {
                return false;
            };

            min_built.is_none_or(|min| area >= min) && max_built.is_none_or(|max| area <= max)
        })
        .collect()
}
