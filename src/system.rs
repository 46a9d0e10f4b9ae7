use burn::prelude::*;

use crate::bridge::check_width;
use crate::control::ControlLaw;
use crate::cost::RunningCost;
use crate::dynamics::{split_state, PendulumParams};
use crate::error::Result;

/// ベクトル場 dx/dt = f(t, x) のバッチ評価
pub trait VectorField<B: Backend> {
    fn eval(&mut self, t: f64, x: Tensor<B, 2>) -> Result<Tensor<B, 2>>;
}

/// Closed-loop pendulum: the control law feeding the dynamics.
pub struct ControlledSystem<'a, B: Backend> {
    law: &'a ControlLaw<B>,
    params: PendulumParams,
    nfe: usize,
}

impl<'a, B: Backend> ControlledSystem<'a, B> {
    pub fn new(law: &'a ControlLaw<B>, params: PendulumParams) -> Self {
        Self {
            law,
            params,
            nfe: 0,
        }
    }

    pub fn nfe(&self) -> usize {
        self.nfe
    }

    pub fn control(&self, x: Tensor<B, 2>) -> Result<Tensor<B, 2>> {
        let (q, p) = split_state(x)?;
        Ok(self.law.control(q, p, &self.params))
    }

    /// 状態微分と制御入力を返す
    pub fn evaluate(&self, x: Tensor<B, 2>) -> Result<(Tensor<B, 2>, Tensor<B, 2>)> {
        let (q, p) = split_state(x)?;
        let u = self.law.control(q.clone(), p.clone(), &self.params);
        let dx = self.params.derivative(q, p, u.clone());
        Ok((dx, u))
    }
}

impl<B: Backend> VectorField<B> for ControlledSystem<'_, B> {
    fn eval(&mut self, _t: f64, x: Tensor<B, 2>) -> Result<Tensor<B, 2>> {
        let (dx, _) = self.evaluate(x)?;
        self.nfe += 1;
        Ok(dx)
    }
}

/// `[q, p, c]` system: closed-loop dynamics plus the running cost channel.
pub struct AugmentedSystem<'a, B: Backend, C> {
    system: ControlledSystem<'a, B>,
    cost: C,
    nfe: usize,
}

impl<'a, B: Backend, C: RunningCost<B>> AugmentedSystem<'a, B, C> {
    pub fn new(system: ControlledSystem<'a, B>, cost: C) -> Self {
        Self {
            system,
            cost,
            nfe: 0,
        }
    }

    pub fn system(&self) -> &ControlledSystem<'a, B> {
        &self.system
    }

    pub fn nfe(&self) -> usize {
        self.nfe
    }

    pub fn reset_nfe(&mut self) {
        self.nfe = 0;
    }
}

impl<B: Backend, C: RunningCost<B>> VectorField<B> for AugmentedSystem<'_, B, C> {
    fn eval(&mut self, _t: f64, x: Tensor<B, 2>) -> Result<Tensor<B, 2>> {
        check_width("augmented state", &x, 3)?;
        self.nfe += 1;
        // コスト成分を除いた物理状態
        let x = x.narrow(1, 0, 2);
        let (dx, u) = self.system.evaluate(x.clone())?;
        let rate = self.cost.rate(x, u);
        Ok(Tensor::cat(vec![dx, rate], 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::tensor_to_vec;
    use crate::control::ControlLawConfig;
    use crate::cost::{ConstantRate, ControlEffort};
    use burn::backend::ndarray::NdArray;
    use burn::nn::LinearConfig;
    use burn::tensor::Distribution;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_controlled_system_is_idempotent() {
        let device = Default::default();
        let mut law = ControlLawConfig::new().with_hdim(16).init::<TestBackend>(&device);
        law.potential.output = LinearConfig::new(16, 1).init(&device);
        law.damping.output = LinearConfig::new(16, 1).init(&device);
        let mut system = ControlledSystem::new(&law, PendulumParams::new());
        let x =
            Tensor::<TestBackend, 2>::random([32, 2], Distribution::Uniform(-6.0, 6.0), &device);

        let u1 = tensor_to_vec(system.control(x.clone()).unwrap()).unwrap();
        let u2 = tensor_to_vec(system.control(x.clone()).unwrap()).unwrap();
        assert_eq!(u1, u2);

        let d1 = tensor_to_vec(system.eval(0.0, x.clone()).unwrap()).unwrap();
        let d2 = tensor_to_vec(system.eval(1.0, x).unwrap()).unwrap();
        assert_eq!(d1, d2);
        assert_eq!(system.nfe(), 2);
    }

    #[test]
    fn test_augmented_appends_control_effort() {
        let device = Default::default();
        let law = ControlLawConfig::new().with_hdim(8).init::<TestBackend>(&device);
        let params = PendulumParams::new();
        let mut aug =
            AugmentedSystem::new(ControlledSystem::new(&law, params.clone()), ControlEffort);

        let x =
            Tensor::<TestBackend, 2>::random([16, 3], Distribution::Uniform(-3.0, 3.0), &device);
        let dx = aug.eval(0.0, x.clone()).unwrap();
        assert_eq!(dx.dims(), [16, 3]);

        let phys = aug.system().evaluate(x.narrow(1, 0, 2)).unwrap();
        let expected_u = tensor_to_vec(phys.1.abs()).unwrap();
        let rate = tensor_to_vec(dx.clone().narrow(1, 2, 1)).unwrap();
        assert_eq!(rate, expected_u);
        assert!(rate.iter().all(|r| *r >= 0.0));
        assert_eq!(
            tensor_to_vec(dx.narrow(1, 0, 2)).unwrap(),
            tensor_to_vec(phys.0).unwrap()
        );

        assert_eq!(aug.nfe(), 1);
        aug.reset_nfe();
        assert_eq!(aug.nfe(), 0);
    }

    #[test]
    fn test_shape_mismatch_fails_fast() {
        let device = Default::default();
        let law = ControlLawConfig::new().with_hdim(8).init::<TestBackend>(&device);
        let mut system = ControlledSystem::new(&law, PendulumParams::new());
        let mut aug = AugmentedSystem::new(
            ControlledSystem::new(&law, PendulumParams::new()),
            ConstantRate(1.0),
        );

        let x2 = Tensor::<TestBackend, 2>::zeros([4, 2], &device);
        let x3 = Tensor::<TestBackend, 2>::zeros([4, 3], &device);
        assert!(system.eval(0.0, x3).is_err());
        assert!(aug.eval(0.0, x2).is_err());
        // 拒否された評価は数えない
        assert_eq!(system.nfe(), 0);
        assert_eq!(aug.nfe(), 0);
    }
}
