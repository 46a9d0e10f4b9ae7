use std::time::Instant;

use burn::module::AutodiffModule;
use burn::optim::{GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::bridge::{ensure_finite, scalar};
use crate::config::ExperimentConfig;
use crate::control::ControlLaw;
use crate::cost::ControlEffort;
use crate::dynamics::{split_state, PendulumParams};
use crate::error::{Error, Result};
use crate::gaussian::Gaussian;
use crate::loss::energy_shaping_loss;
use crate::odeint::{odeint, SolverConfig};
use crate::system::{AugmentedSystem, ControlledSystem};
use crate::uniform::BoxUniform;

#[derive(Config, Debug)]
pub struct TrainingConfig {
    #[config(default = 2048)]
    pub batch_size: usize,
    #[config(default = 1e-3)]
    pub lr: f64,
    /// 学習率の減衰率 (毎イテレーション)
    #[config(default = 0.999)]
    pub lr_decay: f64,
    /// One training iteration per epoch.
    #[config(default = 500)]
    pub epochs: usize,
    /// λ: 積分コストの重み
    #[config(default = 0.01)]
    pub integral_weight: f64,
    #[config(default = "[1.0, 1.0]")]
    pub terminal_weight: [f64; 2],
    #[config(default = "SolverConfig::new()")]
    pub solver: SolverConfig,
    #[config(default = 10)]
    pub log_interval: usize,
}

impl TrainingConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be > 0".into()));
        }
        if !(self.lr.is_finite() && self.lr > 0.0) {
            return Err(Error::InvalidConfig(format!("lr must be > 0, got {}", self.lr)));
        }
        if !(self.lr_decay > 0.0 && self.lr_decay <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "lr_decay must be in (0, 1], got {}",
                self.lr_decay
            )));
        }
        if !self.integral_weight.is_finite()
            || self.terminal_weight.iter().any(|w| !w.is_finite())
        {
            return Err(Error::InvalidConfig("loss weights must be finite".into()));
        }
        Ok(())
    }
}

/// lr_n = lr_0 · γ^n
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialDecay {
    lr: f64,
    gamma: f64,
}

impl ExponentialDecay {
    pub fn new(lr: f64, gamma: f64) -> Self {
        Self { lr, gamma }
    }

    pub fn lr(&self) -> f64 {
        self.lr
    }

    pub fn step(&mut self) -> f64 {
        self.lr *= self.gamma;
        self.lr
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Sampling,
    Integrating,
    Scoring,
    Updating,
    Finished,
    Failed,
}

impl Phase {
    fn label(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Sampling => "sampling",
            Phase::Integrating => "integration",
            Phase::Scoring => "scoring",
            Phase::Updating => "update",
            Phase::Finished => "finished",
            Phase::Failed => "failed",
        }
    }
}

/// Scalars recorded for one iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    pub iteration: usize,
    pub loss: f64,
    pub terminal_loss: f64,
    pub integral_loss: f64,
    /// 更新に使った学習率
    pub lr: f64,
    /// Vector-field evaluations in this iteration's integration.
    pub nfe: usize,
    /// Batch mean of H0 at the terminal state.
    pub terminal_energy: f64,
    /// Batch mean of the shaped Hamiltonian H0 + V at the terminal state.
    pub terminal_shaped_energy: f64,
}

pub struct Trainer<B: AutodiffBackend, O> {
    config: TrainingConfig,
    params: PendulumParams,
    prior: BoxUniform<2>,
    target: Gaussian<2>,
    weight: na::Vector2<f64>,
    t_span: Vec<f64>,
    law: ControlLaw<B>,
    optim: O,
    schedule: ExponentialDecay,
    rng: Xoshiro256PlusPlus,
    device: B::Device,
    phase: Phase,
    iteration: usize,
    history: Vec<StepReport>,
}

impl<B, O> Trainer<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<ControlLaw<B>, B>,
{
    pub fn new(
        config: &ExperimentConfig,
        law: ControlLaw<B>,
        optim: O,
        device: B::Device,
    ) -> Result<Self> {
        config.validate()?;
        let training = config.training.clone();
        training.solver.warn_ignored_tolerances();
        Ok(Self {
            params: config.pendulum.clone(),
            prior: config.prior()?,
            target: config.target()?,
            weight: training.terminal_weight.into(),
            t_span: config.time_points()?,
            law,
            optim,
            schedule: ExponentialDecay::new(training.lr, training.lr_decay),
            rng: Xoshiro256PlusPlus::seed_from_u64(config.seed),
            device,
            phase: Phase::Idle,
            iteration: 0,
            history: Vec::with_capacity(training.epochs),
            config: training,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn law(&self) -> &ControlLaw<B> {
        &self.law
    }

    pub fn into_law(self) -> ControlLaw<B> {
        self.law
    }

    pub fn history(&self) -> &[StepReport] {
        &self.history
    }

    /// Runs one iteration. `Ok(None)` once the iteration budget is spent or
    /// after a failed iteration.
    pub fn step(&mut self) -> Result<Option<StepReport>> {
        if matches!(self.phase, Phase::Finished | Phase::Failed) {
            return Ok(None);
        }
        if self.iteration >= self.config.epochs {
            self.enter(Phase::Finished);
            return Ok(None);
        }
        let iteration = self.iteration;
        match self.iterate() {
            Ok(report) => {
                self.history.push(report);
                self.iteration += 1;
                let next = if self.iteration >= self.config.epochs {
                    Phase::Finished
                } else {
                    Phase::Idle
                };
                self.enter(next);
                Ok(Some(report))
            }
            Err(e) => {
                log::error!("iteration {iteration} failed during {}: {e}", self.phase.label());
                self.enter(Phase::Failed);
                Err(e.at_iteration(iteration))
            }
        }
    }

    /// Runs until the iteration budget is spent. Any failure aborts the run.
    pub fn fit(&mut self) -> Result<&[StepReport]> {
        log::info!(
            "training: {} iterations, batch {}, {:?} over {} points, lr {:e}",
            self.config.epochs,
            self.config.batch_size,
            self.config.solver.method,
            self.t_span.len(),
            self.config.lr
        );
        let start = Instant::now();
        while let Some(report) = self.step()? {
            let interval = self.config.log_interval;
            let last = report.iteration + 1 == self.config.epochs;
            if interval > 0 && (report.iteration % interval == 0 || last) {
                log::info!(
                    "iter {:>5}: loss {:.4} (terminal {:.4}, integral {:.4}) \
                     H0(T) {:.4} H(T) {:.4} lr {:.3e} nfe {}",
                    report.iteration,
                    report.loss,
                    report.terminal_loss,
                    report.integral_loss,
                    report.terminal_energy,
                    report.terminal_shaped_energy,
                    report.lr,
                    report.nfe
                );
            }
        }
        log::info!("training finished in {:.1}s", start.elapsed().as_secs_f64());
        Ok(&self.history)
    }

    fn enter(&mut self, phase: Phase) {
        log::debug!("iteration {}: {:?} -> {:?}", self.iteration, self.phase, phase);
        self.phase = phase;
    }

    fn iterate(&mut self) -> Result<StepReport> {
        let batch = self.config.batch_size;

        self.enter(Phase::Sampling);
        let x0 = self
            .prior
            .sample_tensor::<B, _>(batch, &mut self.rng, &self.device);
        let c0 = Tensor::<B, 2>::zeros([batch, 1], &self.device);
        let x0 = Tensor::cat(vec![x0, c0], 1);

        self.enter(Phase::Integrating);
        let (trajectory, nfe) = {
            let system = ControlledSystem::new(&self.law, self.params.clone());
            let mut augmented = AugmentedSystem::new(system, ControlEffort);
            let trajectory = odeint(&mut augmented, x0, &self.t_span, self.config.solver.method)?;
            (trajectory, augmented.nfe())
        };

        self.enter(Phase::Scoring);
        let x_t = trajectory
            .last()
            .ok_or_else(|| Error::InvalidTimeSpan("empty trajectory".into()))?;
        let terms = energy_shaping_loss(
            &self.target,
            &self.weight,
            self.config.integral_weight,
            x_t.clone(),
        )?;
        ensure_finite("scoring", self.t_span.last().copied(), &terms.total)?;
        let loss = scalar(terms.total.clone());
        let terminal_loss = scalar(terms.terminal.clone());
        let integral_loss = scalar(terms.integral.clone());
        let (terminal_energy, terminal_shaped_energy) = {
            let (q, p) = split_state(x_t.inner().narrow(1, 0, 2))?;
            let h0 = self.params.hamiltonian(q.clone(), p.clone()).mean();
            let h = self.law.valid().shaped_hamiltonian(q, p, &self.params).mean();
            (scalar(h0), scalar(h))
        };

        self.enter(Phase::Updating);
        let lr = self.schedule.lr();
        let grads = GradientsParams::from_grads(terms.total.backward(), &self.law);
        self.law = self.optim.step(lr, self.law.clone(), grads);
        self.schedule.step();

        Ok(StepReport {
            iteration: self.iteration,
            loss,
            terminal_loss,
            integral_loss,
            lr,
            nfe,
            terminal_energy,
            terminal_shaped_energy,
        })
    }
}
