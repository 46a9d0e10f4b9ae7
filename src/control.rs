// u = -∂V/∂q - K(q, p)·p/m
// V: Linear → softplus → Linear → tanh → Linear, K: Linear → softplus → Linear → softplus

use burn::nn::{Initializer, Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::{sigmoid, softplus, tanh};

use crate::dynamics::PendulumParams;
use crate::error::{Error, Result};

#[derive(Config, Debug)]
pub struct ControlLawConfig {
    /// 隠れ層の幅
    #[config(default = 64)]
    pub hdim: usize,
}

impl ControlLawConfig {
    pub fn validate(&self) -> Result<()> {
        if self.hdim == 0 {
            return Err(Error::InvalidConfig("hdim must be > 0".into()));
        }
        Ok(())
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> ControlLaw<B> {
        ControlLaw {
            potential: PotentialNet::new(self.hdim, device),
            damping: DampingNet::new(self.hdim, device),
        }
    }
}

/// 学習するポテンシャル V(q)
#[derive(Module, Debug)]
pub struct PotentialNet<B: Backend> {
    pub(crate) input: Linear<B>,
    pub(crate) hidden: Linear<B>,
    pub(crate) output: Linear<B>,
}

impl<B: Backend> PotentialNet<B> {
    pub fn new(hdim: usize, device: &B::Device) -> Self {
        Self {
            input: LinearConfig::new(1, hdim).init(device),
            hidden: LinearConfig::new(hdim, hdim).init(device),
            output: LinearConfig::new(hdim, 1)
                .with_initializer(Initializer::Zeros)
                .init(device),
        }
    }

    /// V(q): `[batch, 1]` → `[batch, 1]`
    pub fn forward(&self, q: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = softplus(self.input.forward(q), 1.0);
        let x = tanh(self.hidden.forward(x));
        self.output.forward(x)
    }

    /// `(V(q), ∂V/∂q)`
    // 前進モードで微分を伝播する。結果はパラメータの通常のテンソル式なので backward が通る
    pub fn value_and_grad(&self, q: Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let (x2, dx2) = self.features_with_tangent(q);
        let dv = dx2.matmul(self.output.weight.val());
        (self.output.forward(x2), dv)
    }

    pub fn grad(&self, q: Tensor<B, 2>) -> Tensor<B, 2> {
        let (_, dx2) = self.features_with_tangent(q);
        dx2.matmul(self.output.weight.val())
    }

    /// 隠れ層の出力とその q に関する接ベクトル
    fn features_with_tangent(&self, q: Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        // dq/dq = 1 なので第1層の接ベクトルは重みそのもの
        let z1 = self.input.forward(q);
        let dz1 = self.input.weight.val();
        let x1 = softplus(z1.clone(), 1.0);
        let dx1 = sigmoid(z1) * dz1;

        let z2 = self.hidden.forward(x1);
        let dz2 = dx1.matmul(self.hidden.weight.val());
        let x2 = tanh(z2);
        let dx2 = x2.clone().powf_scalar(2.0).neg().add_scalar(1.0) * dz2;
        (x2, dx2)
    }
}

/// 非負の減衰ゲイン K(q, p)
#[derive(Module, Debug)]
pub struct DampingNet<B: Backend> {
    pub(crate) input: Linear<B>,
    pub(crate) output: Linear<B>,
}

impl<B: Backend> DampingNet<B> {
    pub fn new(hdim: usize, device: &B::Device) -> Self {
        Self {
            input: LinearConfig::new(2, hdim).init(device),
            output: LinearConfig::new(hdim, 1)
                .with_initializer(Initializer::Zeros)
                .init(device),
        }
    }

    /// `[batch, 2]` → `[batch, 1]`, elementwise ≥ 0
    pub fn gain(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let h = softplus(self.input.forward(x), 1.0);
        softplus(self.output.forward(h), 1.0)
    }
}

#[derive(Module, Debug)]
pub struct ControlLaw<B: Backend> {
    pub potential: PotentialNet<B>,
    pub damping: DampingNet<B>,
}

impl<B: Backend> ControlLaw<B> {
    /// u_shape = -∂V/∂q
    pub fn energy_shaping(&self, q: Tensor<B, 2>) -> Tensor<B, 2> {
        self.potential.grad(q).neg()
    }

    /// u_damp = -K(q, p) · p / m
    pub fn damping_injection(
        &self,
        q: Tensor<B, 2>,
        p: Tensor<B, 2>,
        params: &PendulumParams,
    ) -> Tensor<B, 2> {
        let gain = self.damping.gain(Tensor::cat(vec![q, p.clone()], 1));
        damping_injection(gain, p, params.m)
    }

    pub fn control(
        &self,
        q: Tensor<B, 2>,
        p: Tensor<B, 2>,
        params: &PendulumParams,
    ) -> Tensor<B, 2> {
        self.energy_shaping(q.clone()) + self.damping_injection(q, p, params)
    }

    /// H(q, p) = H0(q, p) + V(q)
    pub fn shaped_hamiltonian(
        &self,
        q: Tensor<B, 2>,
        p: Tensor<B, 2>,
        params: &PendulumParams,
    ) -> Tensor<B, 2> {
        params.hamiltonian(q.clone(), p) + self.potential.forward(q)
    }
}

pub fn damping_injection<B: Backend>(gain: Tensor<B, 2>, p: Tensor<B, 2>, m: f64) -> Tensor<B, 2> {
    (gain * p).div_scalar(m).neg()
}
