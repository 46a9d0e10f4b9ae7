use anyhow::{anyhow, Context, Result};
use burn::backend::ndarray::NdArrayDevice;
use burn::backend::{Autodiff, NdArray};
use burn::config::Config;
use energy_shaping::{experiment, ExperimentConfig};

type B = Autodiff<NdArray<f32>>;

fn main() -> Result<()> {
    simple_logger::init_with_level(log::Level::Info)?;

    // 引数で設定ファイルを指定できる
    let config = match std::env::args().nth(1) {
        Some(path) => ExperimentConfig::load(&path)
            .map_err(|e| anyhow!("failed to load config {path}: {e:?}"))?,
        None => ExperimentConfig::new(),
    };
    let device = NdArrayDevice::default();

    let table = experiment::run::<B>(&config, &device)
        .with_context(|| format!("run into {} failed", config.output_dir))?;
    let last = table.row(table.nrows() - 1);
    log::info!(
        "q(T) range: [{:.3}, {:.3}]",
        last.fold(f64::INFINITY, |a, b| a.min(*b)),
        last.fold(f64::NEG_INFINITY, |a, b| a.max(*b)),
    );
    Ok(())
}
