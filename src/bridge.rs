// nalgebra の状態と burn のバッチテンソルの変換

use burn::prelude::*;
use burn::tensor::TensorData;

use crate::error::{Error, Result};

/// Stack a slice of states into a `[batch, D]` tensor.
pub fn states_to_tensor<B: Backend, const D: usize>(
    states: &[na::SVector<f64, D>],
    device: &B::Device,
) -> Tensor<B, 2> {
    let flat: Vec<f32> = states
        .iter()
        .flat_map(|x| x.iter().map(|v| *v as f32))
        .collect();
    Tensor::from_data(TensorData::new(flat, [states.len(), D]), device)
}

/// `[1, D]` row used for broadcasting per-dimension constants over a batch.
pub fn row_tensor<B: Backend, const D: usize>(
    row: &na::SVector<f64, D>,
    device: &B::Device,
) -> Tensor<B, 2> {
    let flat: Vec<f32> = row.iter().map(|v| *v as f32).collect();
    Tensor::from_data(TensorData::new(flat, [1, D]), device)
}

/// 行優先で f64 に読み戻す
pub fn tensor_to_vec<B: Backend, const N: usize>(tensor: Tensor<B, N>) -> Result<Vec<f64>> {
    let values = tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| Error::Data(format!("{e:?}")))?;
    Ok(values.into_iter().map(|v| v as f64).collect())
}

pub fn scalar<B: Backend>(tensor: Tensor<B, 1>) -> f64 {
    tensor.into_scalar().elem::<f64>()
}

pub fn check_width<B: Backend>(
    context: &'static str,
    tensor: &Tensor<B, 2>,
    expected: usize,
) -> Result<()> {
    let [_, width] = tensor.dims();
    if width != expected {
        return Err(Error::shape(context, expected, width));
    }
    Ok(())
}

pub fn ensure_finite<B: Backend, const N: usize>(
    phase: &'static str,
    time: Option<f64>,
    tensor: &Tensor<B, N>,
) -> Result<()> {
    let values = tensor_to_vec(tensor.clone())?;
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(Error::NonFinite { phase, time })
    }
}
