use std::path::Path;

use burn::config::Config;
use burn::module::AutodiffModule;
use burn::optim::AdamConfig;
use burn::tensor::backend::AutodiffBackend;
use ndarray::Array2;

use crate::config::ExperimentConfig;
use crate::error::Result;
use crate::eval;
use crate::export;
use crate::train::Trainer;

/// 学習 → 評価 → 出力。戻り値は書き出した q の表 (行: 時刻, 列: 初期条件)
pub fn run<B: AutodiffBackend>(
    config: &ExperimentConfig,
    device: &B::Device,
) -> Result<Array2<f64>> {
    config.validate()?;

    let law = config.init_law::<B>(device);
    let mut trainer = Trainer::new(config, law, AdamConfig::new().init(), device.clone())?;
    trainer.fit()?;
    let history = trainer.history().to_vec();

    // 評価は autodiff なしのバックエンドで行う
    let law = trainer.into_law().valid();
    let trajectory = eval::evaluate(config, &law, device)?;

    // 評価まで成功した場合のみ出力する
    let out = Path::new(&config.output_dir);
    std::fs::create_dir_all(out)?;
    config.save(out.join("config.json"))?;
    export::write_history(out.join("loss.csv"), &history)?;
    export::write_positions(out.join("trajectories.csv"), &trajectory)
}
