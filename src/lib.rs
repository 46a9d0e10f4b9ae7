extern crate nalgebra as na;

pub mod bridge;
pub mod config;
pub mod control;
pub mod cost;
pub mod dynamics;
pub mod error;
pub mod eval;
pub mod experiment;
pub mod export;
pub mod gaussian;
pub mod loss;
pub mod odeint;
pub mod system;
pub mod train;
pub mod trajectory;
pub mod uniform;

pub use config::ExperimentConfig;
pub use control::{ControlLaw, ControlLawConfig};
pub use dynamics::PendulumParams;
pub use error::{Error, Result};
pub use odeint::{odeint, Solver, SolverConfig, TimeSpan};
pub use system::{AugmentedSystem, ControlledSystem, VectorField};
pub use train::{Trainer, TrainingConfig};
pub use trajectory::Trajectory;

/// 一自由度系の状態 [q, p]
pub type State = na::Vector2<f64>;
