//! Named threshold tables
//!
//! Each regime (global, land, water) has two table generations. Every table
//! also exists in a `-simple` form that folds the non-cloud class into the
//! ambiguous code.

use cirrus_core::{Error, Result};

use super::table::ThresholdTable;

const SIMPLE_SUFFIX: &str = "-simple";

/// Boundaries between clear/ambiguous, ambiguous/non-cloud and
/// non-cloud/cloud for each named four-class table.
const NAMED_BOUNDARIES: [(&str, [f64; 3]); 6] = [
    ("global-v1", [1.10, 2.75, 3.50]),
    ("global-v2", [1.25, 2.60, 3.45]),
    ("land-v1", [1.35, 2.90, 3.70]),
    ("land-v2", [1.50, 2.80, 3.60]),
    ("water-v1", [0.95, 2.50, 3.30]),
    ("water-v2", [1.05, 2.40, 3.25]),
];

impl ThresholdTable {
    /// Look up a named table, e.g. `land-v2` or `land-v2-simple`.
    pub fn named(name: &str) -> Result<Self> {
        let (base, simple) = match name.strip_suffix(SIMPLE_SUFFIX) {
            Some(base) => (base, true),
            None => (name, false),
        };
        let boundaries = NAMED_BOUNDARIES
            .iter()
            .find(|(n, _)| *n == base)
            .map(|(_, b)| *b)
            .ok_or_else(|| Error::ResourceUnavailable {
                resource: format!("threshold table '{}'", name),
                reason: format!("known tables: {}", table_names().join(", ")),
            })?;
        if simple {
            ThresholdTable::three_class(boundaries)
        } else {
            ThresholdTable::four_class(boundaries)
        }
    }
}

/// Every name accepted by [`ThresholdTable::named`], four-class tables first.
pub fn table_names() -> Vec<String> {
    let base = NAMED_BOUNDARIES.iter().map(|(n, _)| n.to_string());
    let simple = NAMED_BOUNDARIES
        .iter()
        .map(|(n, _)| format!("{}{}", n, SIMPLE_SUFFIX));
    base.chain(simple).collect()
}
