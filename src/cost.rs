use burn::prelude::*;

/// 積分コストの被積分関数 r(x, u)
pub trait RunningCost<B: Backend> {
    /// `x`: `[batch, 2]`, `u`: `[batch, 1]` → `[batch, 1]`
    fn rate(&self, x: Tensor<B, 2>, u: Tensor<B, 2>) -> Tensor<B, 2>;
}

/// 制御入力の大きさ |u|
#[derive(Debug, Clone, Copy, Default)]
pub struct ControlEffort;

impl<B: Backend> RunningCost<B> for ControlEffort {
    fn rate(&self, _x: Tensor<B, 2>, u: Tensor<B, 2>) -> Tensor<B, 2> {
        u.abs()
    }
}

/// Constant cost rate, independent of state and control.
#[derive(Debug, Clone, Copy)]
pub struct ConstantRate(pub f64);

impl<B: Backend> RunningCost<B> for ConstantRate {
    fn rate(&self, _x: Tensor<B, 2>, u: Tensor<B, 2>) -> Tensor<B, 2> {
        u.zeros_like().add_scalar(self.0)
    }
}
