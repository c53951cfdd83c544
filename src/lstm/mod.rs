/*!
The forecasting model: a single recurrent layer, a normalization layer and a dense head with one output per horizon
*/

use crate::features::Sample;
use tch::nn::{self, LayerNorm, Linear, Module, RNNConfig, VarStore, LSTM, RNN};
use tch::{Reduction, Tensor};

/// The EnergyLSTM model
#[derive(Debug)]
pub struct EnergyLSTM {
    /// The length of each input feature vector
    pub features: usize,
    /// The number of horizons predicted
    pub horizons: usize,
    /// This model's LSTM layer
    pub lstm_layer: LSTM,
    /// Normalization of the LSTM's last hidden state
    pub norm_layer: LayerNorm,
    /// This model's linear layer
    pub linear_layer: Linear,
}

impl EnergyLSTM {
    /// Compute the mean squared error of the model's predictions for a batch of inputs
    pub fn loss(&self, xs: &Tensor, ys: &Tensor) -> Tensor {
        self.forward(xs).mse_loss(ys, Reduction::Mean)
    }
    /// Package a batch of samples into an input tensor of shape `[batch, sequence, features]` and a target tensor
    /// of shape `[batch, horizons]`
    pub fn make_batch<'a, I>(
        samples: I,
        sequence_length: usize,
        features: usize,
        horizons: usize,
    ) -> (Tensor, Tensor)
    where
        I: IntoIterator<Item = &'a Sample>,
    {
        // Step 1: allocate space
        let samples = samples.into_iter();
        let input_size = sequence_length * features;
        let (capacity, _) = samples.size_hint();
        let mut input = Vec::<f32>::with_capacity(capacity * input_size);
        let mut output = Vec::<f32>::with_capacity(capacity * horizons);
        let mut rows = 0;

        // Step 2: fill in rows, zero filling or truncating malformed samples
        for sample in samples {
            let truncate_input = sample.inputs.len().min(input_size);
            input.extend_from_slice(&sample.inputs[..truncate_input]);
            input.extend(std::iter::repeat(0.0).take(input_size - truncate_input));
            let truncate_output = sample.targets.len().min(horizons);
            output.extend_from_slice(&sample.targets[..truncate_output]);
            output.extend(std::iter::repeat(0.0).take(horizons - truncate_output));
            rows += 1;
        }

        // Step 3: generate tensors from vectors
        let input = Tensor::from_slice(&input).view([rows, sequence_length as i64, features as i64]);
        let output = Tensor::from_slice(&output).view([rows, horizons as i64]);
        (input, output)
    }
}

impl Module for EnergyLSTM {
    fn forward(&self, xs: &Tensor) -> Tensor {
        let (hidden, _state) = self.lstm_layer.seq(xs);
        let last = hidden.select(1, -1);
        self.linear_layer.forward(&self.norm_layer.forward(&last))
    }
}

/// A descriptor for an instance of the EnergyLSTM model
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyLSTMDesc {
    /// The length of each input feature vector
    pub features: usize,
    /// The number of horizons to predict
    pub horizons: usize,
    /// The size of the hidden LSTM layer
    pub hidden: usize,
    /// The number of stacked LSTM layers
    pub layers: usize,
    /// Dropout between stacked LSTM layers
    pub dropout: f64,
}

impl EnergyLSTMDesc {
    /// Build an untrained `EnergyLSTM` over a given `VarStore`
    pub fn build(&self, vs: &VarStore) -> EnergyLSTM {
        let root = vs.root();
        let lstm_layer = nn::lstm(
            &root / "lstm",
            self.features as i64,
            self.hidden as i64,
            RNNConfig {
                has_biases: true,
                num_layers: self.layers.max(1) as i64,
                dropout: self.dropout,
                train: true,
                bidirectional: false,
                batch_first: true,
            },
        );
        let norm_layer = nn::layer_norm(&root / "norm", vec![self.hidden as i64], Default::default());
        let linear_layer = nn::linear(
            &root / "head",
            self.hidden as i64,
            self.horizons as i64,
            Default::default(),
        );
        EnergyLSTM {
            features: self.features,
            horizons: self.horizons,
            lstm_layer,
            norm_layer,
            linear_layer,
        }
    }
}
