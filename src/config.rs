use burn::prelude::*;

use crate::control::{ControlLaw, ControlLawConfig};
use crate::dynamics::PendulumParams;
use crate::error::{Error, Result};
use crate::gaussian::Gaussian;
use crate::odeint::{Solver, SolverConfig, TimeSpan};
use crate::train::TrainingConfig;
use crate::uniform::BoxUniform;

/// Everything one experiment run needs. Serialized next to the outputs.
#[derive(Config, Debug)]
pub struct ExperimentConfig {
    #[config(default = "PendulumParams::new()")]
    pub pendulum: PendulumParams,
    #[config(default = "ControlLawConfig::new()")]
    pub control: ControlLawConfig,
    #[config(default = "TrainingConfig::new()")]
    pub training: TrainingConfig,
    #[config(default = "TimeSpan::new()")]
    pub horizon: TimeSpan,
    /// 初期状態 [q, p] の範囲
    #[config(default = "[-2.0 * core::f64::consts::PI, -2.0 * core::f64::consts::PI]")]
    pub prior_low: [f64; 2],
    #[config(default = "[2.0 * core::f64::consts::PI, 2.0 * core::f64::consts::PI]")]
    pub prior_high: [f64; 2],
    /// 目標分布
    #[config(default = "[0.0, 0.0]")]
    pub target_mean: [f64; 2],
    #[config(default = "[0.001, 0.001]")]
    pub target_var: [f64; 2],
    /// Number of evaluation rollouts.
    #[config(default = 256)]
    pub n_ic: usize,
    #[config(default = "SolverConfig::new().with_method(Solver::Midpoint)")]
    pub eval_solver: SolverConfig,
    #[config(default = 42)]
    pub seed: u64,
    #[config(default = "String::from(\"logs/energy-shaping\")")]
    pub output_dir: String,
}

impl ExperimentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.n_ic == 0 {
            return Err(Error::InvalidConfig("n_ic must be > 0".into()));
        }
        self.pendulum.validate()?;
        self.control.validate()?;
        self.training.validate()?;
        self.time_points()?;
        self.prior()?;
        self.target()?;
        Ok(())
    }

    pub fn prior(&self) -> Result<BoxUniform<2>> {
        BoxUniform::new(self.prior_low.into(), self.prior_high.into())
    }

    pub fn target(&self) -> Result<Gaussian<2>> {
        Gaussian::new(self.target_mean.into(), self.target_var.into())
    }

    pub fn time_points(&self) -> Result<Vec<f64>> {
        self.horizon.points()
    }

    pub fn init_law<B: Backend>(&self, device: &B::Device) -> ControlLaw<B> {
        B::seed(self.seed);
        self.control.init(device)
    }
}
