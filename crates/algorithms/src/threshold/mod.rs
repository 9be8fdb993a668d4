//! Threshold classification of network scores
//!
//! A [`ThresholdTable`] is pure data. Classifier variants differ only in
//! the table they carry, never in code path.

mod table;
mod variants;

pub use table::ThresholdTable;
pub use variants::table_names;
