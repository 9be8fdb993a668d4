//! Classifier variants: network, transform and table wired together

use std::sync::Arc;

use cirrus_core::{Error, PixelFlag, Result};

use crate::neural::{EvaluationContext, NetworkModel};
use crate::threshold::ThresholdTable;
use crate::transform::InputTransform;

/// Flag and score decided for one pixel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelOutcome {
    pub flag: PixelFlag,
    /// Network score; NaN when no inference was made
    pub score: f64,
}

impl PixelOutcome {
    pub const UNPROCESSED: PixelOutcome = PixelOutcome {
        flag: PixelFlag::Unprocessed,
        score: f64::NAN,
    };
}

/// A named classifier: which bands feed which network, how samples are
/// transformed, which network output is the score, and how the score is
/// thresholded.
///
/// All wiring is checked in [`ClassifierVariant::new`]; after that the
/// per-pixel path cannot hit a shape error.
#[derive(Debug, Clone)]
pub struct ClassifierVariant {
    name: String,
    table: ThresholdTable,
    model: Arc<NetworkModel>,
    transform: InputTransform,
    bands: Vec<String>,
    output_index: usize,
}

impl ClassifierVariant {
    pub fn new(
        name: impl Into<String>,
        table: ThresholdTable,
        model: Arc<NetworkModel>,
        transform: InputTransform,
        bands: Vec<String>,
        output_index: usize,
    ) -> Result<Self> {
        let name = name.into();
        if bands.len() != model.inputs() {
            return Err(Error::ShapeMismatch {
                what: "variant bands",
                expected: model.inputs(),
                actual: bands.len(),
            });
        }
        if output_index >= model.outputs() {
            return Err(Error::integrity(format!(
                "variant '{}' reads output {} of a network with {} outputs",
                name,
                output_index,
                model.outputs()
            )));
        }
        transform.validate(bands.len())?;

        Ok(Self {
            name,
            table,
            model,
            transform,
            bands,
            output_index,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &ThresholdTable {
        &self.table
    }

    pub fn model(&self) -> &Arc<NetworkModel> {
        &self.model
    }

    pub fn transform(&self) -> &InputTransform {
        &self.transform
    }

    /// Band names in network input order
    pub fn bands(&self) -> &[String] {
        &self.bands
    }

    pub fn output_index(&self) -> usize {
        self.output_index
    }

    /// Fresh evaluation state for one worker
    pub fn context(&self) -> EvaluationContext<'_> {
        self.model.context()
    }

    /// Transform `raw` and evaluate the network, returning the raw score.
    ///
    /// `ctx` must come from [`ClassifierVariant::context`].
    ///
    /// # Errors
    /// - `InvalidSample` for out-of-domain samples
    /// - `Algorithm` if `ctx` was created for another model
    pub fn score(&self, ctx: &mut EvaluationContext<'_>, raw: &[f64]) -> Result<f64> {
        if !std::ptr::eq(ctx.model(), &*self.model) {
            return Err(Error::Algorithm(format!(
                "variant '{}' evaluates {}, context was created for {}",
                self.name,
                self.model.describe(),
                ctx.model().describe()
            )));
        }
        self.transform.apply(raw, ctx.input_mut())?;
        Ok(ctx.run()[self.output_index])
    }

    /// Classify one pixel.
    ///
    /// Invalid pixels skip inference. Out-of-domain samples and non-finite
    /// scores give [`PixelOutcome::UNPROCESSED`] for this pixel only; any
    /// other error is a wiring bug and is returned.
    pub fn classify_pixel(
        &self,
        ctx: &mut EvaluationContext<'_>,
        raw: &[f64],
        valid: bool,
    ) -> Result<PixelOutcome> {
        if !valid {
            return Ok(PixelOutcome::UNPROCESSED);
        }
        match self.score(ctx, raw) {
            Ok(score) if score.is_finite() => Ok(PixelOutcome {
                flag: self.table.classify(score),
                score,
            }),
            Ok(_) => Ok(PixelOutcome::UNPROCESSED),
            Err(e) if e.is_recoverable() => Ok(PixelOutcome::UNPROCESSED),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neural::{Activation, DenseLayer};
    use crate::transform::BandTransform;
    use ndarray::array;

    /// score = ln(a) + ln(b), linear output
    fn log_sum_model() -> Arc<NetworkModel> {
        let layer = DenseLayer::new(array![[1.0, 1.0]], array![0.0]).unwrap();
        Arc::new(
            NetworkModel::new(2, vec![layer], Activation::Identity)
                .unwrap()
                .with_linear_output(true),
        )
    }

    fn variant() -> ClassifierVariant {
        ClassifierVariant::new(
            "test",
            ThresholdTable::four_class([1.0, 2.0, 3.0]).unwrap(),
            log_sum_model(),
            InputTransform::default(),
            vec!["a".into(), "b".into()],
            0,
        )
        .unwrap()
    }

    #[test]
    fn test_classify_pixel() {
        let v = variant();
        let mut ctx = v.context();
        let e = std::f64::consts::E;
        let outcome = v.classify_pixel(&mut ctx, &[e, e], true).unwrap();
        assert!((outcome.score - 2.0).abs() < 1e-12);
        assert_eq!(v.classify_pixel(&mut ctx, &[e * e, e * e], true).unwrap().flag, PixelFlag::Cloud);
        assert_eq!(v.classify_pixel(&mut ctx, &[1.0, 1.0], true).unwrap().flag, PixelFlag::Clear);
    }

    #[test]
    fn test_invalid_pixel_skips_inference() {
        let v = variant();
        let mut ctx = v.context();
        // Samples outside the log domain would fail if inference ran
        let outcome = v.classify_pixel(&mut ctx, &[-1.0, 0.0], false).unwrap();
        assert_eq!(outcome.flag, PixelFlag::Unprocessed);
        assert!(outcome.score.is_nan());
    }

    #[test]
    fn test_bad_sample_degrades_to_unprocessed() {
        let v = variant();
        let mut ctx = v.context();
        for raw in [[0.0, 1.0], [1.0, -2.0], [f64::NAN, 1.0]] {
            let outcome = v.classify_pixel(&mut ctx, &raw, true).unwrap();
            assert_eq!(outcome.flag, PixelFlag::Unprocessed, "{:?}", raw);
        }
        // Context remains usable after a rejected pixel
        assert_eq!(v.classify_pixel(&mut ctx, &[1.0, 1.0], true).unwrap().flag, PixelFlag::Clear);
    }

    #[test]
    fn test_negative_score_is_unprocessed() {
        let v = variant();
        let mut ctx = v.context();
        let outcome = v.classify_pixel(&mut ctx, &[0.1, 0.1], true).unwrap();
        assert!(outcome.score < 0.0);
        assert_eq!(outcome.flag, PixelFlag::Unprocessed);
    }

    #[test]
    fn test_foreign_context_is_rejected() {
        let v = variant();
        // Same input width, different model
        let narrow = NetworkModel::new(
            2,
            vec![DenseLayer::new(array![[1.0, 0.0], [0.0, 1.0]], array![0.0, 0.0]).unwrap()],
            Activation::Identity,
        )
        .unwrap();
        let mut foreign = narrow.context();
        let err = v.score(&mut foreign, &[1.0, 1.0]).unwrap_err();
        assert!(matches!(err, Error::Algorithm(_)), "got {:?}", err);
        assert!(v.classify_pixel(&mut foreign, &[1.0, 1.0], true).is_err());

        // A structurally identical model is still a different model
        let twin = log_sum_model();
        let mut ctx = twin.context();
        assert!(v.score(&mut ctx, &[1.0, 1.0]).is_err());
        assert!(v.score(&mut v.context(), &[1.0, 1.0]).is_ok());
    }

    #[test]
    fn test_wiring_is_validated() {
        let table = ThresholdTable::named("land-v1").unwrap();
        let err = ClassifierVariant::new(
            "x",
            table.clone(),
            log_sum_model(),
            InputTransform::default(),
            vec!["a".into()],
            0,
        )
        .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { expected: 2, actual: 1, .. }));

        let err = ClassifierVariant::new(
            "x",
            table.clone(),
            log_sum_model(),
            InputTransform::default(),
            vec!["a".into(), "b".into()],
            1,
        )
        .unwrap_err();
        assert!(matches!(err, Error::ModelIntegrity { .. }));

        let err = ClassifierVariant::new(
            "x",
            table,
            log_sum_model(),
            InputTransform::PerBand(vec![BandTransform::Log; 3]),
            vec!["a".into(), "b".into()],
            0,
        )
        .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }
}
