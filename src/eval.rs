use burn::prelude::*;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::config::ExperimentConfig;
use crate::control::ControlLaw;
use crate::cost::ControlEffort;
use crate::dynamics::PendulumParams;
use crate::error::{Error, Result};
use crate::odeint::{odeint, SolverConfig};
use crate::system::{AugmentedSystem, ControlledSystem};
use crate::trajectory::Trajectory;
use crate::uniform::BoxUniform;

/// `n_ic` 個の初期状態から閉ループで積分し、`[q, p]` の軌道を返す
#[allow(clippy::too_many_arguments)]
pub fn rollout<B: Backend, R: Rng + ?Sized>(
    law: &ControlLaw<B>,
    params: &PendulumParams,
    prior: &BoxUniform<2>,
    t_span: &[f64],
    n_ic: usize,
    solver: &SolverConfig,
    rng: &mut R,
    device: &B::Device,
) -> Result<Trajectory<B>> {
    if n_ic == 0 {
        return Err(Error::InvalidConfig("n_ic must be > 0".into()));
    }
    solver.warn_ignored_tolerances();
    let x0 = prior.sample_tensor::<B, R>(n_ic, rng, device);
    let c0 = Tensor::<B, 2>::zeros([n_ic, 1], device);
    let x0 = Tensor::cat(vec![x0, c0], 1);

    let system = ControlledSystem::new(law, params.clone());
    let mut augmented = AugmentedSystem::new(system, ControlEffort);
    let trajectory = odeint(&mut augmented, x0, t_span, solver.method)?;
    log::info!(
        "rollout: {} initial conditions, {} points, {:?}, nfe {}",
        n_ic,
        t_span.len(),
        solver.method,
        augmented.nfe()
    );
    trajectory.narrow(0, 2)
}

// 学習の最初のバッチと重ならないよう seed + 1 を使う
pub fn evaluate<B: Backend>(
    config: &ExperimentConfig,
    law: &ControlLaw<B>,
    device: &B::Device,
) -> Result<Trajectory<B>> {
    config.validate()?;
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(config.seed.wrapping_add(1));
    rollout(
        law,
        &config.pendulum,
        &config.prior()?,
        &config.time_points()?,
        config.n_ic,
        &config.eval_solver,
        &mut rng,
        device,
    )
}
