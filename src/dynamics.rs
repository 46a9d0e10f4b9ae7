use burn::prelude::*;

use crate::bridge::check_width;
use crate::error::{Error, Result};
use crate::State;

/// 弾性振り子の物理パラメータ
#[derive(Config, Debug)]
pub struct PendulumParams {
    /// 質量
    #[config(default = 1.0)]
    pub m: f64,
    /// ばね定数
    #[config(default = 0.5)]
    pub k: f64,
    /// 振り子の長さ
    #[config(default = 1.0)]
    pub l: f64,
    /// ばねの自然位置
    #[config(default = 0.0)]
    pub qr: f64,
    /// 粘性減衰
    #[config(default = 0.01)]
    pub b: f64,
    #[config(default = 9.81)]
    pub g: f64,
}

/// `[batch, 2]` の状態を `q`, `p` の列に分割
pub fn split_state<B: Backend>(x: Tensor<B, 2>) -> Result<(Tensor<B, 2>, Tensor<B, 2>)> {
    check_width("state", &x, 2)?;
    let q = x.clone().narrow(1, 0, 1);
    let p = x.narrow(1, 1, 1);
    Ok((q, p))
}

impl PendulumParams {
    pub fn validate(&self) -> Result<()> {
        let values = [self.m, self.k, self.l, self.qr, self.b, self.g];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidConfig(format!(
                "pendulum parameters must be finite: {self:?}"
            )));
        }
        // p/m で割るため
        if self.m <= 0.0 {
            return Err(Error::InvalidConfig(format!("m must be > 0, got {}", self.m)));
        }
        Ok(())
    }

    /// Batched vector field `[dq/dt, dp/dt]`. `q`, `p` and `u` are `[batch, 1]` columns.
    pub fn derivative<B: Backend>(
        &self,
        q: Tensor<B, 2>,
        p: Tensor<B, 2>,
        u: Tensor<B, 2>,
    ) -> Tensor<B, 2> {
        let dq = p.clone().div_scalar(self.m);
        let spring = q.clone().sub_scalar(self.qr).mul_scalar(self.k);
        let gravity = q.sin().mul_scalar(self.m * self.g * self.l);
        let friction = p.mul_scalar(self.b / self.m);
        let dp = u - spring - gravity - friction;
        Tensor::cat(vec![dq, dp], 1)
    }

    /// 制御なしのハミルトニアン H0(q, p)
    pub fn hamiltonian<B: Backend>(&self, q: Tensor<B, 2>, p: Tensor<B, 2>) -> Tensor<B, 2> {
        let kinetic = p.powf_scalar(2.0).div_scalar(2.0 * self.m);
        let elastic = q.clone().sub_scalar(self.qr).powf_scalar(2.0).mul_scalar(0.5 * self.k);
        let gravity = q
            .cos()
            .neg()
            .add_scalar(1.0)
            .mul_scalar(self.m * self.g * self.l);
        kinetic + elastic + gravity
    }

    pub fn derivative_state(&self, x: &State, u: f64) -> State {
        let (q, p) = (x[0], x[1]);
        State::new(
            p / self.m,
            -self.k * (q - self.qr) - self.m * self.g * self.l * q.sin() - self.b * p / self.m + u,
        )
    }

    pub fn hamiltonian_state(&self, x: &State) -> f64 {
        let (q, p) = (x[0], x[1]);
        p * p / (2.0 * self.m)
            + 0.5 * self.k * (q - self.qr).powi(2)
            + self.m * self.g * self.l * (1.0 - q.cos())
    }
}
