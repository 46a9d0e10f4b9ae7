use burn::prelude::*;
use ndarray::Array2;

use crate::bridge::{check_width, tensor_to_vec};
use crate::error::{Error, Result};

/// 時刻列と各時刻のバッチ状態 `[batch, dim]`
#[derive(Debug, Clone)]
pub struct Trajectory<B: Backend> {
    times: Vec<f64>,
    states: Vec<Tensor<B, 2>>,
}

impl<B: Backend> Trajectory<B> {
    pub fn new(times: Vec<f64>, states: Vec<Tensor<B, 2>>) -> Self {
        debug_assert_eq!(times.len(), states.len());
        Self { times, states }
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub(crate) fn len(&self) -> usize {
        self.states.len()
    }

    pub fn batch_size(&self) -> usize {
        self.states.first().map_or(0, |x| x.dims()[0])
    }

    pub fn width(&self) -> usize {
        self.states.first().map_or(0, |x| x.dims()[1])
    }

    /// 終端状態 x(T)
    pub fn last(&self) -> Option<Tensor<B, 2>> {
        self.states.last().cloned()
    }

    /// Keep columns `start..start + len` of every state (e.g. drop the cost channel).
    pub fn narrow(self, start: usize, len: usize) -> Result<Self> {
        let width = self.width();
        if start + len > width {
            return Err(Error::shape("trajectory columns", start + len, width));
        }
        let states = self
            .states
            .into_iter()
            .map(|x| x.narrow(1, start, len))
            .collect();
        Ok(Self {
            times: self.times,
            states,
        })
    }

    /// One coordinate as a table: rows = time, columns = batch sample.
    pub fn coordinate(&self, index: usize) -> Result<Array2<f64>> {
        let width = self.width();
        if index >= width {
            return Err(Error::shape("trajectory coordinate", index + 1, width));
        }
        let batch = self.batch_size();
        let mut table = Array2::<f64>::zeros((self.len(), batch));
        for (mut row, x) in table.rows_mut().into_iter().zip(&self.states) {
            check_width("trajectory state", x, width)?;
            let column = tensor_to_vec(x.clone().narrow(1, index, 1))?;
            for (cell, v) in row.iter_mut().zip(column) {
                *cell = v;
            }
        }
        Ok(table)
    }
}
