//! Score to flag step function

use serde::{Deserialize, Serialize};
use cirrus_core::{Error, PixelFlag, Result};

/// Ordered boundaries with one flag per interval.
///
/// `flags[0]` is the class below every boundary; `flags[i + 1]` applies to
/// scores in `[boundaries[i], boundaries[i + 1])`. Boundaries are inclusive
/// lower bounds, so a score equal to a boundary maps to the higher class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTable", into = "RawTable")]
pub struct ThresholdTable {
    boundaries: Vec<f64>,
    flags: Vec<PixelFlag>,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTable {
    boundaries: Vec<f64>,
    flags: Vec<PixelFlag>,
}

impl TryFrom<RawTable> for ThresholdTable {
    type Error = Error;

    fn try_from(raw: RawTable) -> Result<Self> {
        ThresholdTable::new(raw.boundaries, raw.flags)
    }
}

impl From<ThresholdTable> for RawTable {
    fn from(table: ThresholdTable) -> Self {
        RawTable {
            boundaries: table.boundaries,
            flags: table.flags,
        }
    }
}

impl ThresholdTable {
    /// Build a validated table.
    ///
    /// Boundaries must be finite and strictly ascending, there must be at
    /// least one, and `flags` holds exactly one more entry than
    /// `boundaries`. Flags must be ordinal classes whose rank never
    /// decreases, which keeps classification monotone in the score.
    pub fn new(boundaries: Vec<f64>, flags: Vec<PixelFlag>) -> Result<Self> {
        if boundaries.is_empty() {
            return Err(invalid("boundaries", "[]", "at least one boundary is required"));
        }
        if flags.len() != boundaries.len() + 1 {
            return Err(invalid(
                "flags",
                flags.len(),
                format!("expected {} flags for {} boundaries", boundaries.len() + 1, boundaries.len()),
            ));
        }
        if let Some(b) = boundaries.iter().find(|b| !b.is_finite()) {
            return Err(invalid("boundaries", b, "boundaries must be finite"));
        }
        if let Some(w) = boundaries.windows(2).find(|w| w[0] >= w[1]) {
            return Err(invalid(
                "boundaries",
                format!("{:?}", w),
                "boundaries must be strictly ascending",
            ));
        }

        let mut prev = 0_u8;
        for flag in &flags {
            let rank = flag
                .rank()
                .ok_or_else(|| invalid("flags", flag, "only ordinal classes can be table flags"))?;
            if rank < prev {
                return Err(invalid("flags", flag, "flag ranks must not decrease"));
            }
            prev = rank;
        }

        Ok(Self { boundaries, flags })
    }

    /// Four classes: clear, ambiguous, non-cloud, cloud.
    pub fn four_class(boundaries: [f64; 3]) -> Result<Self> {
        Self::new(
            boundaries.to_vec(),
            vec![
                PixelFlag::Clear,
                PixelFlag::Ambiguous,
                PixelFlag::NonCloud,
                PixelFlag::Cloud,
            ],
        )
    }

    /// Three classes over the same boundaries: the non-cloud interval
    /// reports the ambiguous code.
    pub fn three_class(boundaries: [f64; 3]) -> Result<Self> {
        Self::new(
            boundaries.to_vec(),
            vec![
                PixelFlag::Clear,
                PixelFlag::Ambiguous,
                PixelFlag::Ambiguous,
                PixelFlag::Cloud,
            ],
        )
    }

    pub fn boundaries(&self) -> &[f64] {
        &self.boundaries
    }

    pub fn flags(&self) -> &[PixelFlag] {
        &self.flags
    }

    /// Number of distinct classes the table can produce
    pub fn arity(&self) -> usize {
        let mut distinct = self.flags.clone();
        distinct.dedup();
        distinct.len()
    }

    /// Map a score to its flag.
    ///
    /// Negative and NaN scores mean no valid inference was made and always
    /// yield [`PixelFlag::Unprocessed`].
    pub fn classify(&self, score: f64) -> PixelFlag {
        if score.is_nan() || score < 0.0 {
            return PixelFlag::Unprocessed;
        }
        self.boundaries
            .iter()
            .rposition(|&b| score >= b)
            .map_or(self.flags[0], |i| self.flags[i + 1])
    }
}

fn invalid(name: &'static str, value: impl std::fmt::Display, reason: impl Into<String>) -> Error {
    Error::InvalidParameter {
        name,
        value: value.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ThresholdTable {
        ThresholdTable::four_class([1.0, 2.0, 3.0]).unwrap()
    }

    #[test]
    fn test_classify_intervals() {
        let t = table();
        assert_eq!(t.classify(0.0), PixelFlag::Clear);
        assert_eq!(t.classify(0.5), PixelFlag::Clear);
        assert_eq!(t.classify(1.5), PixelFlag::Ambiguous);
        assert_eq!(t.classify(2.5), PixelFlag::NonCloud);
        assert_eq!(t.classify(3.5), PixelFlag::Cloud);
        assert_eq!(t.classify(f64::INFINITY), PixelFlag::Cloud);
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let t = table();
        assert_eq!(t.classify(1.0), PixelFlag::Ambiguous);
        assert_eq!(t.classify(2.0), PixelFlag::NonCloud);
        assert_eq!(t.classify(3.0), PixelFlag::Cloud);
        assert_eq!(t.classify(3.0 - 1e-9), PixelFlag::NonCloud);
    }

    #[test]
    fn test_negative_and_nan_are_unprocessed() {
        let t = table();
        assert_eq!(t.classify(-1e-12), PixelFlag::Unprocessed);
        assert_eq!(t.classify(-5.0), PixelFlag::Unprocessed);
        assert_eq!(t.classify(f64::NEG_INFINITY), PixelFlag::Unprocessed);
        assert_eq!(t.classify(f64::NAN), PixelFlag::Unprocessed);
    }

    #[test]
    fn test_three_class_fold() {
        let t = ThresholdTable::three_class([1.0, 2.0, 3.0]).unwrap();
        assert_eq!(t.classify(1.5), PixelFlag::Ambiguous);
        assert_eq!(t.classify(2.5), PixelFlag::Ambiguous);
        assert_eq!(t.classify(3.0), PixelFlag::Cloud);
        assert_eq!(t.arity(), 3);
        assert_eq!(table().arity(), 4);
    }

    #[test]
    fn test_validation() {
        use PixelFlag::*;
        let bad = [
            (vec![], vec![Clear]),
            (vec![1.0, 2.0], vec![Clear, Cloud]),
            (vec![2.0, 1.0], vec![Clear, Ambiguous, Cloud]),
            (vec![1.0, 1.0], vec![Clear, Ambiguous, Cloud]),
            (vec![1.0, f64::NAN], vec![Clear, Ambiguous, Cloud]),
            (vec![1.0], vec![Cloud, Clear]),
            (vec![1.0], vec![Clear, Buffer]),
        ];
        for (boundaries, flags) in bad {
            let err = ThresholdTable::new(boundaries.clone(), flags).unwrap_err();
            assert!(
                matches!(err, Error::InvalidParameter { .. }),
                "{:?} gave {:?}",
                boundaries,
                err
            );
        }
    }

    #[test]
    fn test_serde_validates() {
        let t: ThresholdTable =
            serde_json::from_str(r#"{"boundaries": [0.5], "flags": ["clear", "cloud"]}"#).unwrap();
        assert_eq!(t.classify(0.5), PixelFlag::Cloud);
        let bad = serde_json::from_str::<ThresholdTable>(
            r#"{"boundaries": [0.5, 0.1], "flags": ["clear", "ambiguous", "cloud"]}"#,
        );
        assert!(bad.is_err());
    }
}
