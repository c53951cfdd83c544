/*!
Training and inference loops for the EnergyLSTM
*/
use crate::eval::ClipRange;
use crate::features::{Sample, WindowedDataset};
use crate::lstm::EnergyLSTM;
use anyhow::{bail, format_err};
use indicatif::{ProgressBar, ProgressStyle};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tch::nn::{self, Module, OptimizerConfig, VarStore};
use tch::{Device, TchError, Tensor};
use tracing::{debug, info};

/// Training hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// The Adam learning rate
    pub learning_rate: f64,
    /// The number of samples per batch
    pub batch_size: usize,
    /// The maximum number of epochs to train for
    pub max_epochs: usize,
    /// The number of epochs without improvement of the validation loss before stopping
    pub patience: usize,
    /// The smallest decrease of the validation loss counted as an improvement
    pub min_delta: f64,
    /// The gradient clipping bound
    pub grad_clip: f64,
}

impl Default for TrainConfig {
    fn default() -> TrainConfig {
        TrainConfig {
            learning_rate: 1e-3,
            batch_size: 64,
            max_epochs: 100,
            patience: 10,
            min_delta: 1e-4,
            grad_clip: 0.5,
        }
    }
}

/// What an epoch's validation loss means for training
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Progress {
    /// The loss is the best seen so far
    Improved,
    /// The loss did not improve, but patience is not exhausted
    Stalled,
    /// The loss has not improved for `patience` epochs: stop training
    Stop,
}

/// Early stopping on a plateau of the validation loss
#[derive(Debug, Clone, PartialEq)]
pub struct EarlyStopping {
    patience: usize,
    min_delta: f64,
    best: f64,
    best_epoch: Option<usize>,
    stalled: usize,
}

impl EarlyStopping {
    /// Stop after `patience` epochs in a row which fail to improve on the best loss by more than `min_delta`
    pub fn new(patience: usize, min_delta: f64) -> EarlyStopping {
        EarlyStopping {
            patience: patience.max(1),
            min_delta: min_delta.max(0.0),
            best: f64::INFINITY,
            best_epoch: None,
            stalled: 0,
        }
    }
    /// Record an epoch's validation loss
    pub fn update(&mut self, epoch: usize, loss: f64) -> Progress {
        if loss.is_finite() && loss < self.best - self.min_delta {
            self.best = loss;
            self.best_epoch = Some(epoch);
            self.stalled = 0;
            return Progress::Improved;
        }
        self.stalled += 1;
        if self.stalled >= self.patience {
            Progress::Stop
        } else {
            Progress::Stalled
        }
    }
    /// The best loss seen
    #[inline]
    pub fn best(&self) -> f64 {
        self.best
    }
    /// The epoch the best loss was seen at
    #[inline]
    pub fn best_epoch(&self) -> Option<usize> {
        self.best_epoch
    }
}

/// A summary of a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainReport {
    /// The number of epochs run
    pub epochs_run: usize,
    /// The epoch whose weights were kept
    pub best_epoch: Option<usize>,
    /// The validation loss of the kept weights
    pub best_val_loss: f64,
    /// The mean training loss of each epoch
    pub train_losses: Vec<f64>,
    /// The validation loss of each epoch
    pub val_losses: Vec<f64>,
}

fn snapshot(vs: &VarStore) -> Vec<(String, Tensor)> {
    vs.variables()
        .into_iter()
        .map(|(name, var)| (name, var.detach().copy()))
        .collect()
}

fn restore(vs: &VarStore, saved: &[(String, Tensor)]) {
    let mut variables = vs.variables();
    tch::no_grad(|| {
        for (name, value) in saved {
            if let Some(var) = variables.get_mut(name) {
                var.copy_(value);
            }
        }
    });
}

/// The mean loss of a model over a dataset, without tracking gradients
pub fn evaluate_loss(model: &EnergyLSTM, data: &WindowedDataset, batch_size: usize, device: Device) -> f64 {
    let mut sum_loss = 0.0;
    tch::no_grad(|| {
        for chunk in data.samples.chunks(batch_size.max(1)) {
            let (xs, ys) = EnergyLSTM::make_batch(chunk, data.sequence_length, data.features, data.horizons);
            let loss = model.loss(&xs.to_device(device), &ys.to_device(device));
            sum_loss += loss.double_value(&[]) * chunk.len() as f64;
        }
    });
    sum_loss / data.len().max(1) as f64
}

/// Train a model, stopping early once the validation loss plateaus.
///
/// Training batches are reshuffled every epoch. At the end the weights of the epoch with the best validation loss
/// are restored and the var store is frozen. With an empty validation set the training loss stands in for it.
pub fn train<R: Rng>(
    model: &EnergyLSTM,
    vs: &mut VarStore,
    train: &WindowedDataset,
    val: &WindowedDataset,
    config: &TrainConfig,
    rng: &mut R,
) -> anyhow::Result<TrainReport> {
    if train.is_empty() {
        bail!("no training samples: not enough observations for the configured windows");
    }
    let device = vs.device();
    let batch_size = config.batch_size.max(1);
    let mut opt = nn::Adam::default()
        .build(vs, config.learning_rate)
        .map_err(|err| format_err!("Error building optimizer: {:#?}", err))?;

    let mut stopping = EarlyStopping::new(config.patience, config.min_delta);
    let mut best = snapshot(vs);
    let mut report = TrainReport {
        epochs_run: 0,
        best_epoch: None,
        best_val_loss: f64::INFINITY,
        train_losses: Vec::new(),
        val_losses: Vec::new(),
    };

    let epochs_progress = ProgressBar::new(config.max_epochs as u64);
    epochs_progress.set_style(ProgressStyle::default_bar().template("Epochs: {wide_bar} {pos}/{len} {msg}"));
    let data_progress_style = ProgressStyle::default_bar().template("[{msg:<15}] {wide_bar} {pos:> 7}/{len:7}");
    let mut order: Vec<&Sample> = train.samples.iter().collect();

    for epoch in 0..config.max_epochs {
        // === TRAINING ===

        order.shuffle(&mut *rng);
        let data_progress = ProgressBar::new(train.len() as u64);
        data_progress.set_style(data_progress_style.clone());
        data_progress.set_message("no loss");

        let mut sum_loss = 0.0;
        for chunk in order.chunks(batch_size) {
            let (xs, ys) = EnergyLSTM::make_batch(
                chunk.iter().copied(),
                train.sequence_length,
                train.features,
                train.horizons,
            );
            let loss = model.loss(&xs.to_device(device), &ys.to_device(device));
            opt.backward_step_clip(&loss, config.grad_clip);

            let loss = loss.double_value(&[]);
            sum_loss += loss * chunk.len() as f64;
            data_progress.inc(chunk.len() as u64);
            data_progress.set_message(&format!("loss = {:.5}", loss));
        }
        data_progress.finish_and_clear();
        let train_loss = sum_loss / train.len() as f64;

        // === VALIDATION ===

        let val_loss = if val.is_empty() {
            train_loss
        } else {
            evaluate_loss(model, val, batch_size, device)
        };
        report.train_losses.push(train_loss);
        report.val_losses.push(val_loss);
        report.epochs_run = epoch + 1;
        info!(epoch, train_loss, val_loss, "epoch finished");
        epochs_progress.set_message(&format!("val loss = {:.5}", val_loss));
        epochs_progress.inc(1);

        match stopping.update(epoch, val_loss) {
            Progress::Improved => best = snapshot(vs),
            Progress::Stalled => {}
            Progress::Stop => {
                info!(
                    epoch,
                    best_epoch = ?stopping.best_epoch(),
                    "validation loss plateaued, stopping early"
                );
                break;
            }
        }
    }
    epochs_progress.finish_and_clear();

    debug!(best_epoch = ?stopping.best_epoch(), "restoring best weights");
    restore(vs, &best);
    vs.freeze();
    report.best_epoch = stopping.best_epoch();
    report.best_val_loss = stopping.best();
    Ok(report)
}

/// Predict every sample of a dataset, in dataset order, without tracking gradients
pub fn predict(
    model: &EnergyLSTM,
    data: &WindowedDataset,
    batch_size: usize,
    device: Device,
) -> Result<Vec<Vec<f32>>, TchError> {
    let mut predictions = Vec::with_capacity(data.len());
    for chunk in data.samples.chunks(batch_size.max(1)) {
        let (xs, _) = EnergyLSTM::make_batch(chunk, data.sequence_length, data.features, data.horizons);
        let output = tch::no_grad(|| model.forward(&xs.to_device(device)));
        let output = output.to_device(Device::Cpu).flatten(0, -1);
        let flat = Vec::<f32>::try_from(&output)?;
        predictions.extend(flat.chunks(data.horizons.max(1)).map(|row| row.to_vec()));
    }
    Ok(predictions)
}

/// Bring scaled predictions or targets back to physical units, clipping predictions to a valid range
pub fn to_physical<F>(rows: &[Vec<f32>], unscale: F, clip: Option<&ClipRange>) -> Vec<Vec<f64>>
where
    F: Fn(f32) -> f32,
{
    rows.iter()
        .map(|row| {
            row.iter()
                .map(|value| {
                    let value = unscale(*value) as f64;
                    clip.map_or(value, |range| range.clip(value))
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn early_stopping_on_plateau() {
        let mut stopping = EarlyStopping::new(2, 0.01);
        assert_eq!(stopping.update(0, 1.0), Progress::Improved);
        assert_eq!(stopping.update(1, 0.5), Progress::Improved);
        assert_eq!(stopping.update(2, 0.495), Progress::Stalled);
        assert_eq!(stopping.update(3, 0.3), Progress::Improved);
        assert_eq!(stopping.update(4, f64::NAN), Progress::Stalled);
        assert_eq!(stopping.update(5, 0.31), Progress::Stop);
        assert_eq!(stopping.best(), 0.3);
        assert_eq!(stopping.best_epoch(), Some(3));
    }

    #[test]
    fn physical_units_are_clipped() {
        let rows = vec![vec![-1.0, 0.5], vec![3.0, 2.0]];
        let range = ClipRange::default();
        let physical = to_physical(&rows, |v| v * 2000.0 + 1000.0, Some(&range));
        assert_eq!(physical, vec![vec![0.0, 2000.0], vec![5500.0, 5000.0]]);
        let raw = to_physical(&rows, |v| v * 2000.0 + 1000.0, None);
        assert_eq!(raw[1][0], 7000.0);
    }
}
