//! Raw sample to network input mapping
//!
//! Band samples arrive as raw reflectances or radiances. Networks are trained
//! on transformed values (natural log by default), so every pixel goes
//! through an [`InputTransform`] before evaluation. Samples outside a
//! transform's domain are reported as [`Error::InvalidSample`] and never
//! turned into NaN.

use serde::{Deserialize, Serialize};
use cirrus_core::{Error, Result};

/// Transform applied to one band
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BandTransform {
    /// `ln(x)`, defined for `x > 0`
    #[default]
    Log,
    /// `sqrt(x)`, defined for `x >= 0`
    Sqrt,
    /// Pass-through
    Identity,
    /// `x * scale + offset`
    Affine { scale: f64, offset: f64 },
}

impl BandTransform {
    /// Transform one sample of band `band`.
    pub fn apply(&self, band: usize, x: f64) -> Result<f64> {
        if !x.is_finite() {
            return Err(Error::InvalidSample {
                band,
                value: x,
                reason: "not finite",
            });
        }
        match *self {
            BandTransform::Log => {
                if x <= 0.0 {
                    return Err(Error::InvalidSample {
                        band,
                        value: x,
                        reason: "log of a non-positive value",
                    });
                }
                Ok(x.ln())
            }
            BandTransform::Sqrt => {
                if x < 0.0 {
                    return Err(Error::InvalidSample {
                        band,
                        value: x,
                        reason: "square root of a negative value",
                    });
                }
                Ok(x.sqrt())
            }
            BandTransform::Identity => Ok(x),
            BandTransform::Affine { scale, offset } => Ok(x * scale + offset),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BandTransform::Log => "log",
            BandTransform::Sqrt => "sqrt",
            BandTransform::Identity => "identity",
            BandTransform::Affine { .. } => "affine",
        }
    }
}

/// Mapping from a pixel's raw samples to the network input vector.
///
/// In configuration files a single transform object applies to every band
/// and an array gives one transform per band:
///
/// ```json
/// { "kind": "log" }
/// [ { "kind": "log" }, { "kind": "affine", "scale": 0.001, "offset": 0.0 } ]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputTransform {
    Uniform(BandTransform),
    PerBand(Vec<BandTransform>),
}

impl Default for InputTransform {
    fn default() -> Self {
        InputTransform::Uniform(BandTransform::Log)
    }
}

impl InputTransform {
    /// Check the transform can serve `bands` input bands.
    pub fn validate(&self, bands: usize) -> Result<()> {
        match self {
            InputTransform::Uniform(_) => Ok(()),
            InputTransform::PerBand(per_band) if per_band.len() == bands => Ok(()),
            InputTransform::PerBand(per_band) => Err(Error::ShapeMismatch {
                what: "per-band transform",
                expected: bands,
                actual: per_band.len(),
            }),
        }
    }

    /// Transform `raw` into `out`, element by element.
    ///
    /// Stops at the first sample outside the domain; `out` is then only
    /// partially written and must not be evaluated.
    pub fn apply(&self, raw: &[f64], out: &mut [f64]) -> Result<()> {
        if raw.len() != out.len() {
            return Err(Error::ShapeMismatch {
                what: "transform output",
                expected: raw.len(),
                actual: out.len(),
            });
        }
        match self {
            InputTransform::Uniform(t) => {
                for (band, (dst, &x)) in out.iter_mut().zip(raw).enumerate() {
                    *dst = t.apply(band, x)?;
                }
            }
            InputTransform::PerBand(per_band) => {
                self.validate(raw.len())?;
                for (band, ((dst, &x), t)) in out.iter_mut().zip(raw).zip(per_band).enumerate() {
                    *dst = t.apply(band, x)?;
                }
            }
        }
        Ok(())
    }

    /// Short description for log lines
    pub fn label(&self) -> String {
        match self {
            InputTransform::Uniform(t) => t.name().to_string(),
            InputTransform::PerBand(per_band) => {
                let names: Vec<&str> = per_band.iter().map(|t| t.name()).collect();
                format!("[{}]", names.join(", "))
            }
        }
    }
}
