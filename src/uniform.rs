use burn::prelude::*;
use rand::Rng;
use rand_distr::{Distribution, Uniform};

use crate::bridge::states_to_tensor;
use crate::error::{Error, Result};

/// 箱型領域上の一様分布 (初期状態の事前分布)
#[derive(Debug, Clone)]
pub struct BoxUniform<const D: usize> {
    low: na::SVector<f64, D>,
    high: na::SVector<f64, D>,
    dists: [Uniform<f64>; D],
}

impl<const D: usize> BoxUniform<D> {
    pub fn new(low: na::SVector<f64, D>, high: na::SVector<f64, D>) -> Result<Self> {
        for i in 0..D {
            let (lo, hi) = (low[i], high[i]);
            if !(lo.is_finite() && hi.is_finite() && lo < hi) {
                return Err(Error::InvalidDistribution(format!(
                    "uniform bounds must be finite with low < high, got [{lo}, {hi}] in dim {i}"
                )));
            }
        }
        let dists = core::array::from_fn(|i| Uniform::new(low[i], high[i]));
        Ok(Self { low, high, dists })
    }

    /// Symmetric box `[-r, r]` in every dimension.
    pub fn symmetric(radius: f64) -> Result<Self> {
        let r = na::SVector::<f64, D>::from_element(radius);
        Self::new(-r, r)
    }

    pub fn contains(&self, x: &na::SVector<f64, D>) -> bool {
        (0..D).all(|i| self.low[i] <= x[i] && x[i] < self.high[i])
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> na::SVector<f64, D> {
        na::SVector::<f64, D>::from_fn(|i, _| self.dists[i].sample(rng))
    }

    pub fn sample_n<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<na::SVector<f64, D>> {
        (0..n).map(|_| self.sample(rng)).collect()
    }

    /// `n` samples as a `[n, D]` tensor.
    pub fn sample_tensor<B: Backend, R: Rng + ?Sized>(
        &self,
        n: usize,
        rng: &mut R,
        device: &B::Device,
    ) -> Tensor<B, 2> {
        states_to_tensor::<B, D>(&self.sample_n(n, rng), device)
    }
}
