use burn::prelude::*;

use crate::bridge::{check_width, row_tensor};
use crate::error::Result;
use crate::gaussian::Gaussian;

/// -mean_batch( Σ_dims weight ⊙ log p_target(x(T)) )
pub fn terminal_loss<B: Backend, const D: usize>(
    target: &Gaussian<D>,
    weight: &na::SVector<f64, D>,
    x_t: Tensor<B, 2>,
) -> Result<Tensor<B, 1>> {
    let device = x_t.device();
    let log_prob = target.log_prob(x_t)?;
    let weighted = log_prob * row_tensor::<B, D>(weight, &device);
    Ok(weighted.sum_dim(1).mean().neg())
}

/// mean_batch c(T)
pub fn integral_loss<B: Backend>(c_t: Tensor<B, 2>) -> Result<Tensor<B, 1>> {
    check_width("integral cost", &c_t, 1)?;
    Ok(c_t.mean())
}

pub struct LossTerms<B: Backend> {
    pub terminal: Tensor<B, 1>,
    pub integral: Tensor<B, 1>,
    pub total: Tensor<B, 1>,
}

/// Splits the augmented terminal state `[x(T), c(T)]` and combines both terms:
/// `terminal + lambda · integral`.
pub fn energy_shaping_loss<B: Backend, const D: usize>(
    target: &Gaussian<D>,
    weight: &na::SVector<f64, D>,
    lambda: f64,
    x_aug: Tensor<B, 2>,
) -> Result<LossTerms<B>> {
    check_width("augmented terminal state", &x_aug, D + 1)?;
    let x_t = x_aug.clone().narrow(1, 0, D);
    let c_t = x_aug.narrow(1, D, 1);
    let terminal = terminal_loss(target, weight, x_t)?;
    let integral = integral_loss(c_t)?;
    let total = terminal.clone() + integral.clone().mul_scalar(lambda);
    Ok(LossTerms {
        terminal,
        integral,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::scalar;
    use approx::assert_relative_eq;
    use burn::backend::ndarray::NdArray;
    use burn::tensor::TensorData;
    use na::vector;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_loss_terms() {
        let device = Default::default();
        let target = Gaussian::new(vector![0.0, 0.0], vector![1.0, 1.0]).unwrap();
        let weight = vector![1.0, 1.0];
        // x(T) = 0 のとき terminal = -2 · log N(0; 0, 1) = ln(2π)
        let x_aug = Tensor::<TestBackend, 2>::from_data(
            TensorData::new(vec![0.0f32, 0.0, 2.0, 0.0, 0.0, 4.0], [2, 3]),
            &device,
        );
        let terms = energy_shaping_loss(&target, &weight, 0.01, x_aug).unwrap();
        let ln_2pi = (2.0 * core::f64::consts::PI).ln();
        assert_relative_eq!(scalar(terms.terminal), ln_2pi, epsilon = 1e-5);
        assert_relative_eq!(scalar(terms.integral), 3.0, epsilon = 1e-6);
        assert_relative_eq!(scalar(terms.total), ln_2pi + 0.03, epsilon = 1e-5);
    }

    #[test]
    fn test_weight_masks_dimensions() {
        let device = Default::default();
        let target = Gaussian::new(vector![0.0, 0.0], vector![1.0, 1.0]).unwrap();
        let x = Tensor::<TestBackend, 2>::from_data(
            TensorData::new(vec![0.0f32, 100.0], [1, 2]),
            &device,
        );
        let only_q = terminal_loss(&target, &vector![1.0, 0.0], x).unwrap();
        assert_relative_eq!(
            scalar(only_q),
            0.5 * (2.0 * core::f64::consts::PI).ln(),
            epsilon = 1e-5
        );
    }

    #[test]
    fn test_rejects_physical_state_without_cost() {
        let device = Default::default();
        let target = Gaussian::new(vector![0.0, 0.0], vector![1.0, 1.0]).unwrap();
        let x = Tensor::<TestBackend, 2>::zeros([4, 2], &device);
        assert!(energy_shaping_loss(&target, &vector![1.0, 1.0], 0.01, x).is_err());
    }
}
