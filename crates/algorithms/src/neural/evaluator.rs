//! Forward-pass scratch state

use cirrus_core::{Error, Result};

use super::model::NetworkModel;

/// Mutable buffers for evaluating one [`NetworkModel`].
///
/// A context belongs to exactly one worker. It is created once per worker
/// and reused for every pixel that worker classifies, so the hot loop does
/// not allocate. Buffer lengths are fixed by the model for the lifetime of
/// the context.
#[derive(Debug, Clone)]
pub struct EvaluationContext<'m> {
    model: &'m NetworkModel,
    input: Vec<f64>,
    front: Vec<f64>,
    back: Vec<f64>,
    output: Vec<f64>,
}

impl<'m> EvaluationContext<'m> {
    pub fn new(model: &'m NetworkModel) -> Self {
        let width = model.max_width();
        Self {
            model,
            input: vec![0.0; model.inputs()],
            front: vec![0.0; width],
            back: vec![0.0; width],
            output: vec![0.0; model.outputs()],
        }
    }

    pub fn model(&self) -> &'m NetworkModel {
        self.model
    }

    /// Input buffer, for callers that write transformed samples in place
    /// before calling [`EvaluationContext::run`].
    pub fn input_mut(&mut self) -> &mut [f64] {
        &mut self.input
    }

    /// Copy `input` into the context and run the forward pass.
    pub fn evaluate(&mut self, input: &[f64]) -> Result<&[f64]> {
        if input.len() != self.input.len() {
            return Err(Error::ShapeMismatch {
                what: "network input",
                expected: self.input.len(),
                actual: input.len(),
            });
        }
        self.input.copy_from_slice(input);
        Ok(self.run())
    }

    /// Run the forward pass on the current contents of the input buffer.
    pub fn run(&mut self) -> &[f64] {
        let Self {
            model,
            input,
            front,
            back,
            output,
        } = self;
        let model: &NetworkModel = *model;

        match model.input_normalization() {
            Some(norm) => {
                for (i, (dst, &x)) in front.iter_mut().zip(input.iter()).enumerate() {
                    *dst = norm.normalize(i, x);
                }
            }
            None => front[..input.len()].copy_from_slice(input),
        }

        let activation = model.activation();
        let last = model.layers().len() - 1;
        let mut width = input.len();
        let mut cur: &mut Vec<f64> = front;
        let mut next: &mut Vec<f64> = back;

        for (l, layer) in model.layers().iter().enumerate() {
            let out = &mut next[..layer.outputs()];
            layer.affine_into(&cur[..width], out);
            if l != last || !model.linear_output() {
                for v in out.iter_mut() {
                    *v = activation.apply(*v);
                }
            }
            width = layer.outputs();
            std::mem::swap(&mut cur, &mut next);
        }

        match model.output_normalization() {
            Some(norm) => {
                for (i, (dst, &x)) in output.iter_mut().zip(cur.iter()).enumerate() {
                    *dst = norm.denormalize(i, x);
                }
            }
            None => output.copy_from_slice(&cur[..width]),
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neural::{Activation, DenseLayer, Normalization};
    use ndarray::array;

    fn two_layer(activation: Activation) -> NetworkModel {
        let hidden = DenseLayer::new(
            array![[0.5, -1.0], [1.5, 0.25], [-0.75, 2.0]],
            array![0.1, -0.2, 0.3],
        )
        .unwrap();
        let out = DenseLayer::new(array![[1.0, -2.0, 0.5]], array![0.05]).unwrap();
        NetworkModel::new(2, vec![hidden, out], activation).unwrap()
    }

    fn reference(model: &NetworkModel, input: &[f64]) -> f64 {
        let act = |x: f64| model.activation().apply(x);
        let h: Vec<f64> = model.layers()[0]
            .weights()
            .rows()
            .into_iter()
            .zip(model.layers()[0].bias())
            .map(|(row, b)| act(row.dot(&ndarray::arr1(input)) + b))
            .collect();
        let o = &model.layers()[1];
        let z = o.weights().row(0).dot(&ndarray::arr1(&h)) + o.bias()[0];
        if model.linear_output() {
            z
        } else {
            act(z)
        }
    }

    #[test]
    fn test_forward_matches_reference() {
        for activation in [Activation::Sigmoid, Activation::Tanh, Activation::Identity] {
            let model = two_layer(activation);
            let mut ctx = model.context();
            let out = ctx.evaluate(&[0.3, -1.2]).unwrap()[0];
            let expected = reference(&model, &[0.3, -1.2]);
            assert!(
                (out - expected).abs() < 1e-12,
                "{:?}: got {}, expected {}",
                activation,
                out,
                expected
            );
        }
    }

    #[test]
    fn test_linear_output_skips_final_activation() {
        let model = two_layer(Activation::Sigmoid).with_linear_output(true);
        let out = model.evaluate(&[0.3, -1.2]).unwrap()[0];
        let expected = reference(&model, &[0.3, -1.2]);
        assert!((out - expected).abs() < 1e-12);
        // A linear output may leave the sigmoid range
        let model = two_layer(Activation::Identity).with_linear_output(true);
        assert!(model.evaluate(&[-10.0, 10.0]).unwrap()[0] > 1.0);
    }

    #[test]
    fn test_normalization_applied_around_network() {
        let layer = DenseLayer::new(array![[1.0, 1.0]], array![0.0]).unwrap();
        let model = NetworkModel::new(2, vec![layer], Activation::Identity)
            .unwrap()
            .with_input_normalization(Normalization::new(vec![1.0, 2.0], vec![2.0, 0.5]))
            .unwrap()
            .with_output_normalization(Normalization::new(vec![10.0], vec![0.25]))
            .unwrap();
        // (3 - 1) * 2 + (6 - 2) * 0.5 = 6; 6 / 0.25 + 10 = 34
        let out = model.evaluate(&[3.0, 6.0]).unwrap();
        assert!((out[0] - 34.0).abs() < 1e-12);
    }

    #[test]
    fn test_wrong_input_length_is_shape_mismatch() {
        let model = two_layer(Activation::Sigmoid);
        let mut ctx = model.context();
        let err = ctx.evaluate(&[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(
            err,
            Error::ShapeMismatch { expected: 2, actual: 3, .. }
        ));
    }

    #[test]
    fn test_context_reuse_is_stateless_between_calls() {
        let model = two_layer(Activation::Tanh);
        let mut ctx = model.context();
        let first = ctx.evaluate(&[0.7, 0.1]).unwrap()[0];
        ctx.evaluate(&[-5.0, 4.0]).unwrap();
        let again = ctx.evaluate(&[0.7, 0.1]).unwrap()[0];
        assert_eq!(first, again);
    }

    #[test]
    fn test_input_mut_then_run() {
        let model = two_layer(Activation::Sigmoid);
        let mut ctx = model.context();
        ctx.input_mut().copy_from_slice(&[0.3, -1.2]);
        let via_run = ctx.run()[0];
        let via_eval = model.evaluate(&[0.3, -1.2]).unwrap()[0];
        assert_eq!(via_run, via_eval);
    }
}
