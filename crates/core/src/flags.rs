//! Pixel classification flags
//!
//! Every classifier variant and the cloud buffer share one flag vocabulary.
//! Flags are written into `u16` mask rasters as bits, so each flag carries an
//! explicit bit value.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single classification outcome or mask marker.
///
/// `Clear`, `Ambiguous`, `NonCloud` and `Cloud` are ordinal classes produced
/// by threshold tables, in increasing order of cloudiness. `Unprocessed` marks
/// pixels where no valid inference was computed and `Buffer` marks pixels
/// added around clouds by the buffer pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFlag {
    Clear,
    Ambiguous,
    NonCloud,
    Cloud,
    Unprocessed,
    Buffer,
}

impl PixelFlag {
    /// All flags, in bit order
    pub const ALL: [PixelFlag; 6] = [
        PixelFlag::Clear,
        PixelFlag::Ambiguous,
        PixelFlag::NonCloud,
        PixelFlag::Cloud,
        PixelFlag::Unprocessed,
        PixelFlag::Buffer,
    ];

    /// Bit value written into mask rasters
    pub const fn bits(self) -> u16 {
        match self {
            PixelFlag::Clear => 0x01,
            PixelFlag::Ambiguous => 0x02,
            PixelFlag::NonCloud => 0x04,
            PixelFlag::Cloud => 0x08,
            PixelFlag::Unprocessed => 0x10,
            PixelFlag::Buffer => 0x20,
        }
    }

    /// Ordinal rank of a classification outcome; `None` for markers that
    /// are not part of the ordered scale.
    pub const fn rank(self) -> Option<u8> {
        match self {
            PixelFlag::Clear => Some(0),
            PixelFlag::Ambiguous => Some(1),
            PixelFlag::NonCloud => Some(2),
            PixelFlag::Cloud => Some(3),
            PixelFlag::Unprocessed | PixelFlag::Buffer => None,
        }
    }

    /// Flag whose bit equals `bits` exactly
    pub fn from_bits(bits: u16) -> Option<PixelFlag> {
        PixelFlag::ALL.into_iter().find(|f| f.bits() == bits)
    }

    pub fn name(self) -> &'static str {
        match self {
            PixelFlag::Clear => "clear",
            PixelFlag::Ambiguous => "ambiguous",
            PixelFlag::NonCloud => "non_cloud",
            PixelFlag::Cloud => "cloud",
            PixelFlag::Unprocessed => "unprocessed",
            PixelFlag::Buffer => "buffer",
        }
    }
}

impl fmt::Display for PixelFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of [`PixelFlag`]s packed into the same bit layout as mask rasters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Vec<PixelFlag>", into = "Vec<PixelFlag>")]
pub struct FlagSet(u16);

impl FlagSet {
    pub const EMPTY: FlagSet = FlagSet(0);

    pub const fn from_bits(bits: u16) -> Self {
        FlagSet(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn with(self, flag: PixelFlag) -> Self {
        FlagSet(self.0 | flag.bits())
    }

    pub const fn contains(self, flag: PixelFlag) -> bool {
        self.0 & flag.bits() != 0
    }

    /// Whether a mask cell value has any bit of this set
    pub const fn intersects(self, cell: u16) -> bool {
        self.0 & cell != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = PixelFlag> {
        PixelFlag::ALL.into_iter().filter(move |f| self.contains(*f))
    }
}

impl From<PixelFlag> for FlagSet {
    fn from(flag: PixelFlag) -> Self {
        FlagSet(flag.bits())
    }
}

impl FromIterator<PixelFlag> for FlagSet {
    fn from_iter<I: IntoIterator<Item = PixelFlag>>(iter: I) -> Self {
        iter.into_iter().fold(FlagSet::EMPTY, FlagSet::with)
    }
}

impl From<Vec<PixelFlag>> for FlagSet {
    fn from(flags: Vec<PixelFlag>) -> Self {
        flags.into_iter().collect()
    }
}

impl From<FlagSet> for Vec<PixelFlag> {
    fn from(set: FlagSet) -> Self {
        set.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_are_distinct() {
        let mut seen = 0_u16;
        for flag in PixelFlag::ALL {
            assert_eq!(seen & flag.bits(), 0, "{} overlaps another flag", flag);
            assert_eq!(flag.bits().count_ones(), 1);
            seen |= flag.bits();
        }
    }

    #[test]
    fn test_rank_order() {
        assert!(PixelFlag::Clear.rank() < PixelFlag::Ambiguous.rank());
        assert!(PixelFlag::Ambiguous.rank() < PixelFlag::NonCloud.rank());
        assert!(PixelFlag::NonCloud.rank() < PixelFlag::Cloud.rank());
        assert_eq!(PixelFlag::Unprocessed.rank(), None);
    }

    #[test]
    fn test_from_bits_roundtrip() {
        for flag in PixelFlag::ALL {
            assert_eq!(PixelFlag::from_bits(flag.bits()), Some(flag));
        }
        assert_eq!(PixelFlag::from_bits(0x03), None);
    }

    #[test]
    fn test_flag_set() {
        let set: FlagSet = [PixelFlag::Cloud, PixelFlag::Ambiguous].into_iter().collect();
        assert!(set.contains(PixelFlag::Cloud));
        assert!(!set.contains(PixelFlag::Clear));
        assert!(set.intersects(PixelFlag::Cloud.bits() | PixelFlag::Buffer.bits()));
        assert!(!set.intersects(PixelFlag::Clear.bits()));
        assert_eq!(set.iter().count(), 2);
    }

    #[test]
    fn test_flag_set_serde() {
        let set: FlagSet = serde_json::from_str(r#"["cloud", "non_cloud"]"#).unwrap();
        assert_eq!(set.bits(), 0x08 | 0x04);
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["non_cloud","cloud"]"#);
    }
}
