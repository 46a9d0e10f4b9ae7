use thiserror::Error;

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid distribution: {0}")]
    InvalidDistribution(String),

    #[error("shape mismatch in {context}: expected width {expected}, found {found}")]
    ShapeMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid time span: {0}")]
    InvalidTimeSpan(String),

    #[error("non-finite values during {phase} (t = {time:?})")]
    NonFinite { phase: &'static str, time: Option<f64> },

    #[error("training iteration {iteration} failed")]
    Iteration {
        iteration: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("tensor readback failed: {0}")]
    Data(String),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn shape(context: &'static str, expected: usize, found: usize) -> Self {
        Self::ShapeMismatch {
            context,
            expected,
            found,
        }
    }

    pub fn at_iteration(self, iteration: usize) -> Self {
        Self::Iteration {
            iteration,
            source: Box::new(self),
        }
    }
}
