use burn::prelude::*;

use crate::bridge::{check_width, row_tensor};
use crate::error::{Error, Result};

/// 各次元独立な正規分布 (目標分布)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gaussian<const D: usize> {
    mean: na::SVector<f64, D>,
    var: na::SVector<f64, D>,
}

impl<const D: usize> Gaussian<D> {
    pub fn new(mean: na::SVector<f64, D>, var: na::SVector<f64, D>) -> Result<Self> {
        if let Some(m) = mean.iter().find(|m| !m.is_finite()) {
            return Err(Error::InvalidDistribution(format!(
                "gaussian mean must be finite, got {m}"
            )));
        }
        if let Some(v) = var.iter().find(|v| !(v.is_finite() && **v > 0.0)) {
            return Err(Error::InvalidDistribution(format!(
                "gaussian variance must be positive and finite, got {v}"
            )));
        }
        Ok(Self { mean, var })
    }

    /// Per-dimension log density, `[batch, D]` → `[batch, D]`.
    pub fn log_prob<B: Backend>(&self, x: Tensor<B, 2>) -> Result<Tensor<B, 2>> {
        check_width("gaussian log_prob", &x, D)?;
        let device = x.device();
        let mean = row_tensor::<B, D>(&self.mean, &device);
        let inv_two_var = row_tensor::<B, D>(&self.var.map(|v| 0.5 / v), &device);
        let norm = row_tensor::<B, D>(
            &self.var.map(|v| -0.5 * (2.0 * core::f64::consts::PI * v).ln()),
            &device,
        );
        // -(x-μ)²/(2σ²) - ln(2πσ²)/2
        Ok((x - mean).powf_scalar(2.0).neg() * inv_two_var + norm)
    }

    pub fn log_prob_state(&self, x: &na::SVector<f64, D>) -> na::SVector<f64, D> {
        na::SVector::<f64, D>::from_fn(|i, _| {
            let v = self.var[i];
            let norm = 0.5 * (2.0 * core::f64::consts::PI * v).ln();
            -(x[i] - self.mean[i]).powi(2) / (2.0 * v) - norm
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{states_to_tensor, tensor_to_vec};
    use approx::assert_relative_eq;
    use burn::backend::ndarray::NdArray;
    use na::vector;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_rejects_degenerate_variance() {
        let mean = vector![0.0, 0.0];
        assert!(Gaussian::new(mean, vector![0.001, 0.0]).is_err());
        assert!(Gaussian::new(mean, vector![-1.0, 1.0]).is_err());
        assert!(Gaussian::new(mean, vector![f64::NAN, 1.0]).is_err());
        assert!(Gaussian::new(vector![f64::INFINITY, 0.0], vector![1.0, 1.0]).is_err());
        assert!(Gaussian::new(mean, vector![0.001, 0.001]).is_ok());
    }

    #[test]
    fn test_log_prob_matches_closed_form() {
        let device = Default::default();
        let target = Gaussian::new(vector![0.5, -1.0], vector![2.0, 0.25]).unwrap();
        let states = [vector![0.5, -1.0], vector![1.5, 0.0], vector![-2.0, 3.0]];
        let x = states_to_tensor::<TestBackend, 2>(&states, &device);
        let lp = tensor_to_vec(target.log_prob(x).unwrap()).unwrap();
        for (i, s) in states.iter().enumerate() {
            let expected = target.log_prob_state(s);
            assert_relative_eq!(lp[2 * i], expected[0], epsilon = 1e-4);
            assert_relative_eq!(lp[2 * i + 1], expected[1], epsilon = 1e-4);
        }
        // 平均での密度 N(μ; μ, σ²) = 1/sqrt(2πσ²)
        assert_relative_eq!(
            target.log_prob_state(&vector![0.5, -1.0])[0],
            -0.5 * (2.0 * core::f64::consts::PI * 2.0).ln(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_log_prob_rejects_wrong_width() {
        let device = Default::default();
        let target = Gaussian::new(vector![0.0, 0.0], vector![1.0, 1.0]).unwrap();
        let x = Tensor::<TestBackend, 2>::zeros([4, 3], &device);
        assert!(matches!(
            target.log_prob(x),
            Err(Error::ShapeMismatch { expected: 2, found: 3, .. })
        ));
    }
}
