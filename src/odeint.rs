// 固定ステップ積分 (時刻グリッドの各区間で1ステップ)

use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::bridge::ensure_finite;
use crate::error::{Error, Result};
use crate::system::VectorField;
use crate::trajectory::Trajectory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Solver {
    Euler,
    Midpoint,
    Rk4,
}

impl Solver {
    pub fn step<B: Backend, F: VectorField<B>>(
        &self,
        f: &mut F,
        t: f64,
        dt: f64,
        x: Tensor<B, 2>,
    ) -> Result<Tensor<B, 2>> {
        match self {
            Solver::Euler => {
                let k1 = f.eval(t, x.clone())?;
                Ok(x + k1.mul_scalar(dt))
            }
            Solver::Midpoint => {
                let k1 = f.eval(t, x.clone())?;
                let x_mid = x.clone() + k1.mul_scalar(0.5 * dt);
                let k2 = f.eval(t + 0.5 * dt, x_mid)?;
                Ok(x + k2.mul_scalar(dt))
            }
            Solver::Rk4 => {
                let t_mid = t + 0.5 * dt;
                let k1 = f.eval(t, x.clone())?;
                let k2 = f.eval(t_mid, x.clone() + k1.clone().mul_scalar(0.5 * dt))?;
                let k3 = f.eval(t_mid, x.clone() + k2.clone().mul_scalar(0.5 * dt))?;
                let k4 = f.eval(t + dt, x.clone() + k3.clone().mul_scalar(dt))?;
                let delta = k1 + k2.mul_scalar(2.0) + k3.mul_scalar(2.0) + k4;
                Ok(x + delta.mul_scalar(dt / 6.0))
            }
        }
    }

    /// Vector-field evaluations per step.
    pub fn stages(&self) -> usize {
        match self {
            Solver::Euler => 1,
            Solver::Midpoint => 2,
            Solver::Rk4 => 4,
        }
    }
}

#[derive(Config, Debug)]
pub struct SolverConfig {
    #[config(default = "Solver::Rk4")]
    pub method: Solver,
    /// 固定ステップ法では使用しない
    pub atol: Option<f64>,
    /// 固定ステップ法では使用しない
    pub rtol: Option<f64>,
}

impl SolverConfig {
    pub fn warn_ignored_tolerances(&self) {
        if self.atol.is_some() || self.rtol.is_some() {
            log::warn!(
                "atol/rtol ({:?}/{:?}) are ignored by the fixed-step {:?} solver",
                self.atol,
                self.rtol,
                self.method
            );
        }
    }
}

/// Equally spaced horizon `start..=end` with `steps` points.
#[derive(Config, Debug)]
pub struct TimeSpan {
    #[config(default = 0.0)]
    pub start: f64,
    #[config(default = 3.0)]
    pub end: f64,
    #[config(default = 30)]
    pub steps: usize,
}

impl TimeSpan {
    pub fn points(&self) -> Result<Vec<f64>> {
        if self.steps < 2 {
            return Err(Error::InvalidTimeSpan(format!(
                "need at least 2 points, got {}",
                self.steps
            )));
        }
        if !(self.start.is_finite() && self.end.is_finite() && self.end > self.start) {
            return Err(Error::InvalidTimeSpan(format!(
                "end ({}) must be greater than start ({})",
                self.end, self.start
            )));
        }
        let n = (self.steps - 1) as f64;
        let t = (0..self.steps)
            .map(|i| self.start + (self.end - self.start) * i as f64 / n)
            .collect();
        Ok(t)
    }
}

fn validate_grid(t_span: &[f64]) -> Result<()> {
    if t_span.len() < 2 {
        return Err(Error::InvalidTimeSpan(format!(
            "need at least 2 points, got {}",
            t_span.len()
        )));
    }
    if let Some(w) = t_span.windows(2).find(|w| !(w[1] > w[0])) {
        return Err(Error::InvalidTimeSpan(format!(
            "times must be strictly increasing ({} -> {})",
            w[0], w[1]
        )));
    }
    Ok(())
}

/// Integrate `f` from `x0` over `t_span`, returning the state at every time
/// (the first entry is `x0`). Fails on the first non-finite state.
pub fn odeint<B: Backend, F: VectorField<B>>(
    f: &mut F,
    x0: Tensor<B, 2>,
    t_span: &[f64],
    solver: Solver,
) -> Result<Trajectory<B>> {
    validate_grid(t_span)?;
    ensure_finite("integration", Some(t_span[0]), &x0)?;

    let mut states = Vec::with_capacity(t_span.len());
    states.push(x0.clone());
    let mut x = x0;
    for w in t_span.windows(2) {
        x = solver.step(f, w[0], w[1] - w[0], x)?;
        ensure_finite("integration", Some(w[1]), &x)?;
        states.push(x.clone());
    }
    Ok(Trajectory::new(t_span.to_vec(), states))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::tensor_to_vec;
    use approx::assert_relative_eq;
    use burn::backend::ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    /// dx/dt = -a x
    struct Decay {
        a: f64,
        calls: usize,
    }

    impl<B: Backend> VectorField<B> for Decay {
        fn eval(&mut self, _t: f64, x: Tensor<B, 2>) -> Result<Tensor<B, 2>> {
            self.calls += 1;
            Ok(x.mul_scalar(-self.a))
        }
    }

    /// dx/dt = 1e30 x², blows up within a couple of steps
    struct Explode;

    impl<B: Backend> VectorField<B> for Explode {
        fn eval(&mut self, _t: f64, x: Tensor<B, 2>) -> Result<Tensor<B, 2>> {
            Ok(x.powf_scalar(2.0).mul_scalar(1e30))
        }
    }

    #[test]
    fn test_time_span_points() {
        let t = TimeSpan::new().points().unwrap();
        assert_eq!(t.len(), 30);
        assert_eq!(t[0], 0.0);
        assert_relative_eq!(t[29], 3.0, epsilon = 1e-12);
        assert!(t.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_time_span_rejects_degenerate() {
        assert!(TimeSpan::new().with_steps(1).points().is_err());
        assert!(TimeSpan::new().with_end(0.0).points().is_err());
        assert!(TimeSpan::new().with_start(2.0).with_end(1.0).points().is_err());
    }

    #[test]
    fn test_rk4_exponential_decay() {
        let device = Default::default();
        let t = TimeSpan::new().with_end(2.0).with_steps(41).points().unwrap();
        let x0 = Tensor::<TestBackend, 2>::ones([3, 2], &device);
        let mut f = Decay { a: 1.5, calls: 0 };
        let traj = odeint(&mut f, x0, &t, Solver::Rk4).unwrap();
        assert_eq!(traj.len(), 41);
        assert_eq!(traj.times(), &t[..]);
        assert_eq!(f.calls, 40 * Solver::Rk4.stages());
        let x_t = tensor_to_vec(traj.last().unwrap()).unwrap();
        for v in x_t {
            assert_relative_eq!(v, (-3.0f64).exp(), epsilon = 1e-5);
        }
    }

    #[test]
    fn test_solver_orders() {
        let device = Default::default();
        let t = TimeSpan::new().with_end(1.0).with_steps(11).points().unwrap();
        let exact = (-1.0f64).exp();
        let error = |solver: Solver| {
            let x0 = Tensor::<TestBackend, 2>::ones([1, 1], &device);
            let traj = odeint(&mut Decay { a: 1.0, calls: 0 }, x0, &t, solver).unwrap();
            (tensor_to_vec(traj.last().unwrap()).unwrap()[0] - exact).abs()
        };
        let euler = error(Solver::Euler);
        let midpoint = error(Solver::Midpoint);
        let rk4 = error(Solver::Rk4);
        assert!(euler > midpoint);
        assert!(midpoint > rk4);
        assert!(rk4 < 1e-5);
    }

    #[test]
    fn test_divergence_is_reported() {
        let device = Default::default();
        let t = TimeSpan::new().points().unwrap();
        let x0 = Tensor::<TestBackend, 2>::ones([2, 2], &device).mul_scalar(10.0);
        let err = odeint(&mut Explode, x0, &t, Solver::Euler).unwrap_err();
        assert!(matches!(err, Error::NonFinite { phase: "integration", time: Some(_) }));
    }

    #[test]
    fn test_non_increasing_grid_is_rejected() {
        let device = Default::default();
        let x0 = Tensor::<TestBackend, 2>::ones([1, 1], &device);
        let mut f = Decay { a: 1.0, calls: 0 };
        assert!(odeint(&mut f, x0.clone(), &[0.0, 1.0, 1.0], Solver::Rk4).is_err());
        assert!(odeint(&mut f, x0, &[0.0], Solver::Rk4).is_err());
        assert_eq!(f.calls, 0);
    }
}
