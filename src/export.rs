use std::fs;
use std::path::Path;

use burn::prelude::*;
use ndarray::Array2;

use crate::error::{Error, Result};
use crate::train::StepReport;
use crate::trajectory::Trajectory;

fn prepare(path: &Path) -> Result<std::path::PathBuf> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }
    // 書き込み完了までは一時ファイルに出力
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".partial");
    Ok(tmp.into())
}

/// Writes `table` as headerless CSV, one table row per line.
pub fn write_table<P: AsRef<Path>>(path: P, table: &Array2<f64>) -> Result<()> {
    let path = path.as_ref();
    let tmp = prepare(path)?;
    {
        let mut wtr = csv::WriterBuilder::new().has_headers(false).from_path(&tmp)?;
        for row in table.rows() {
            wtr.write_record(row.iter().map(|v| v.to_string()))?;
        }
        wtr.flush()?;
    }
    fs::rename(&tmp, path)?;
    log::info!("wrote {}x{} table to {}", table.nrows(), table.ncols(), path.display());
    Ok(())
}

pub fn read_table<P: AsRef<Path>>(path: P) -> Result<Array2<f64>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    let mut values = Vec::new();
    let mut rows = 0;
    let mut cols = 0;
    for record in rdr.records() {
        let record = record?;
        cols = record.len();
        for field in record.iter() {
            let v = field
                .parse::<f64>()
                .map_err(|e| Error::Data(format!("{field:?}: {e}")))?;
            values.push(v);
        }
        rows += 1;
    }
    Array2::from_shape_vec((rows, cols), values).map_err(|e| Error::Data(e.to_string()))
}

/// 角度 q の時系列 (行: 時刻, 列: 初期条件) を書き出す
pub fn write_positions<B: Backend, P: AsRef<Path>>(
    path: P,
    trajectory: &Trajectory<B>,
) -> Result<Array2<f64>> {
    let table = trajectory.coordinate(0)?;
    write_table(path, &table)?;
    Ok(table)
}

pub fn write_history<P: AsRef<Path>>(path: P, history: &[StepReport]) -> Result<()> {
    let path = path.as_ref();
    let tmp = prepare(path)?;
    {
        let mut wtr = csv::Writer::from_path(&tmp)?;
        wtr.write_record([
            "iteration",
            "loss",
            "terminal_loss",
            "integral_loss",
            "lr",
            "terminal_energy",
            "terminal_shaped_energy",
        ])?;
        for r in history {
            wtr.write_record(&[
                r.iteration.to_string(),
                r.loss.to_string(),
                r.terminal_loss.to_string(),
                r.integral_loss.to_string(),
                r.lr.to_string(),
                r.terminal_energy.to_string(),
                r.terminal_shaped_energy.to_string(),
            ])?;
        }
        wtr.flush()?;
    }
    fs::rename(&tmp, path)?;
    log::info!("wrote {} loss records to {}", history.len(), path.display());
    Ok(())
}
