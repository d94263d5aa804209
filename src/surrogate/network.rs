//! Dense neural network surrogate
//!
//! Architecture: Input → [Linear → ReLU] × hidden layers → Linear → output
//! activation. The output activation follows the task:
//! - two classes: one sigmoid unit (probability of class 1), cross-entropy loss
//! - more classes: softmax over all classes, cross-entropy loss
//! - regression: linear units, mean squared error loss
//!
//! Weights use Glorot-uniform initialisation and are trained with Adam over
//! shuffled mini-batches. A trailing fraction of the rows is held out and its
//! loss is logged each epoch for monitoring only.

use super::{Estimator, Targets, Task, TrainingData};
use crate::error::{AbcError, AbcResult};
use nalgebra::DMatrix;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const ADAM_BETA1: f64 = 0.9;
const ADAM_BETA2: f64 = 0.999;
const ADAM_EPSILON: f64 = 1e-7;

/// Clamp for probabilities inside log-losses
const PROB_EPSILON: f64 = 1e-7;

/// Network training configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Width of each hidden layer
    pub hidden_layers: Vec<usize>,
    /// Number of passes over the training rows
    pub epochs: usize,
    /// Mini-batch size
    pub batch_size: usize,
    /// Adam step size
    pub learning_rate: f64,
    /// Fraction of rows held out for monitoring (0.0 - 1.0).
    /// Defaults to 0.2 for classification and 0.1 for regression.
    pub validation_split: Option<f64>,
    /// Seed for initialisation and shuffling; random when unset
    pub seed: Option<u64>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            hidden_layers: vec![10, 10],
            epochs: 10,
            batch_size: 64,
            learning_rate: 0.001,
            validation_split: None,
            seed: None,
        }
    }
}

impl NetworkConfig {
    fn validate(&self) -> AbcResult<()> {
        if self.hidden_layers.iter().any(|&w| w == 0) {
            return Err(AbcError::InvalidConfig(
                "hidden layer widths must be positive".into(),
            ));
        }
        if self.epochs == 0 || self.batch_size == 0 {
            return Err(AbcError::InvalidConfig(
                "epochs and batch_size must be positive".into(),
            ));
        }
        if !(self.learning_rate > 0.0) {
            return Err(AbcError::InvalidConfig(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if let Some(split) = self.validation_split {
            if !(0.0..1.0).contains(&split) {
                return Err(AbcError::InvalidConfig(format!(
                    "validation_split must be in [0, 1), got {split}"
                )));
            }
        }
        Ok(())
    }

    fn effective_validation_split(&self, task: Task) -> f64 {
        self.validation_split.unwrap_or(match task {
            Task::Classification { .. } => 0.2,
            Task::Regression { .. } => 0.1,
        })
    }
}

/// Activation applied to the last layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputActivation {
    Sigmoid,
    Softmax,
    Linear,
}

impl OutputActivation {
    fn for_task(task: Task) -> Self {
        match task {
            Task::Classification { n_classes: 2 } => OutputActivation::Sigmoid,
            Task::Classification { .. } => OutputActivation::Softmax,
            Task::Regression { .. } => OutputActivation::Linear,
        }
    }

    fn apply(&self, z: &DMatrix<f64>) -> DMatrix<f64> {
        match self {
            OutputActivation::Sigmoid => z.map(|v| 1.0 / (1.0 + (-v).exp())),
            OutputActivation::Linear => z.clone(),
            OutputActivation::Softmax => {
                let mut out = z.clone();
                for i in 0..out.nrows() {
                    let max = (0..out.ncols())
                        .map(|j| out[(i, j)])
                        .fold(f64::NEG_INFINITY, f64::max);
                    let mut sum = 0.0;
                    for j in 0..out.ncols() {
                        let e = (out[(i, j)] - max).exp();
                        out[(i, j)] = e;
                        sum += e;
                    }
                    for j in 0..out.ncols() {
                        out[(i, j)] /= sum;
                    }
                }
                out
            }
        }
    }

    /// Mean loss over the rows of `output` against `target`
    fn loss(&self, output: &DMatrix<f64>, target: &DMatrix<f64>) -> f64 {
        let n = output.nrows().max(1) as f64;
        match self {
            OutputActivation::Sigmoid => {
                let total: f64 = output
                    .iter()
                    .zip(target.iter())
                    .map(|(&p, &y)| {
                        let p = p.clamp(PROB_EPSILON, 1.0 - PROB_EPSILON);
                        -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
                    })
                    .sum();
                total / n
            }
            OutputActivation::Softmax => {
                let total: f64 = output
                    .iter()
                    .zip(target.iter())
                    .map(|(&p, &y)| -y * p.clamp(PROB_EPSILON, 1.0).ln())
                    .sum();
                total / n
            }
            OutputActivation::Linear => {
                let elems = (output.nrows() * output.ncols()).max(1) as f64;
                let total: f64 = output
                    .iter()
                    .zip(target.iter())
                    .map(|(&o, &y)| (o - y).powi(2))
                    .sum();
                total / elems
            }
        }
    }

    /// Gradient of the mean loss with respect to the pre-activation output
    fn output_gradient(&self, output: &DMatrix<f64>, target: &DMatrix<f64>) -> DMatrix<f64> {
        let n = output.nrows().max(1) as f64;
        match self {
            // sigmoid + BCE and softmax + CE share the same simplified gradient
            OutputActivation::Sigmoid | OutputActivation::Softmax => (output - target) / n,
            OutputActivation::Linear => {
                let elems = (output.nrows() * output.ncols()).max(1) as f64;
                (output - target) * (2.0 / elems)
            }
        }
    }
}

/// One fully-connected layer; weights are `[input x output]`, bias `[1 x output]`
#[derive(Debug, Clone)]
struct Dense {
    weights: DMatrix<f64>,
    bias: DMatrix<f64>,
}

impl Dense {
    /// Glorot-uniform weights, zero bias
    fn glorot(input: usize, output: usize, rng: &mut ChaCha8Rng) -> Self {
        let limit = (6.0 / (input + output) as f64).sqrt();
        let weights = DMatrix::from_fn(input, output, |_, _| rng.random_range(-limit..limit));
        Self {
            weights,
            bias: DMatrix::zeros(1, output),
        }
    }

    fn forward(&self, x: &DMatrix<f64>) -> DMatrix<f64> {
        let ones = DMatrix::from_element(x.nrows(), 1, 1.0);
        x * &self.weights + ones * &self.bias
    }
}

/// First and second moment estimates for one layer
#[derive(Debug, Clone)]
struct AdamState {
    m_w: DMatrix<f64>,
    v_w: DMatrix<f64>,
    m_b: DMatrix<f64>,
    v_b: DMatrix<f64>,
}

impl AdamState {
    fn for_layer(layer: &Dense) -> Self {
        let (r, c) = layer.weights.shape();
        Self {
            m_w: DMatrix::zeros(r, c),
            v_w: DMatrix::zeros(r, c),
            m_b: DMatrix::zeros(1, c),
            v_b: DMatrix::zeros(1, c),
        }
    }
}

fn adam_update(
    param: &mut DMatrix<f64>,
    grad: &DMatrix<f64>,
    m: &mut DMatrix<f64>,
    v: &mut DMatrix<f64>,
    step_size: f64,
) {
    for ((p, g), (m, v)) in param
        .iter_mut()
        .zip(grad.iter())
        .zip(m.iter_mut().zip(v.iter_mut()))
    {
        *m = ADAM_BETA1 * *m + (1.0 - ADAM_BETA1) * g;
        *v = ADAM_BETA2 * *v + (1.0 - ADAM_BETA2) * g * g;
        *p -= step_size * *m / (v.sqrt() + ADAM_EPSILON);
    }
}

/// Trained dense network
#[derive(Debug, Clone)]
pub struct NeuralNetwork {
    layers: Vec<Dense>,
    activation: OutputActivation,
    input_dim: usize,
}

impl NeuralNetwork {
    /// Network with freshly initialised weights
    pub fn new(
        input_dim: usize,
        hidden_layers: &[usize],
        output_dim: usize,
        activation: OutputActivation,
        rng: &mut ChaCha8Rng,
    ) -> Self {
        let mut widths = Vec::with_capacity(hidden_layers.len() + 2);
        widths.push(input_dim);
        widths.extend_from_slice(hidden_layers);
        widths.push(output_dim);

        let layers = widths
            .windows(2)
            .map(|w| Dense::glorot(w[0], w[1], rng))
            .collect();

        Self {
            layers,
            activation,
            input_dim,
        }
    }

    pub fn activation(&self) -> OutputActivation {
        self.activation
    }

    /// Forward pass keeping every layer's input and pre-activation
    fn forward_trace(&self, x: &DMatrix<f64>) -> (Vec<DMatrix<f64>>, Vec<DMatrix<f64>>, DMatrix<f64>) {
        let mut inputs = Vec::with_capacity(self.layers.len());
        let mut pre_activations = Vec::with_capacity(self.layers.len());
        let mut a = x.clone();
        let last = self.layers.len() - 1;

        for (l, layer) in self.layers.iter().enumerate() {
            let z = layer.forward(&a);
            inputs.push(a);
            a = if l == last {
                self.activation.apply(&z)
            } else {
                z.map(|v| v.max(0.0))
            };
            pre_activations.push(z);
        }

        (inputs, pre_activations, a)
    }

    /// Network output for a batch of rows
    pub fn forward(&self, x: &DMatrix<f64>) -> DMatrix<f64> {
        self.forward_trace(x).2
    }

    /// One Adam step on a mini-batch; returns the batch loss before the step
    fn train_step(
        &mut self,
        x: &DMatrix<f64>,
        y: &DMatrix<f64>,
        state: &mut [AdamState],
        step: i32,
        learning_rate: f64,
    ) -> f64 {
        let (inputs, pre_activations, output) = self.forward_trace(x);
        let loss = self.activation.loss(&output, y);

        // Backward pass
        let mut delta = self.activation.output_gradient(&output, y);
        let mut grads = Vec::with_capacity(self.layers.len());
        for l in (0..self.layers.len()).rev() {
            let ones = DMatrix::from_element(1, delta.nrows(), 1.0);
            let grad_w = inputs[l].transpose() * &delta;
            let grad_b = ones * &delta;
            if l > 0 {
                let relu_mask = pre_activations[l - 1].map(|z| if z > 0.0 { 1.0 } else { 0.0 });
                delta = (&delta * self.layers[l].weights.transpose()).component_mul(&relu_mask);
            }
            grads.push((l, grad_w, grad_b));
        }

        let bias_correction1 = 1.0 - ADAM_BETA1.powi(step);
        let bias_correction2 = 1.0 - ADAM_BETA2.powi(step);
        let step_size = learning_rate * bias_correction2.sqrt() / bias_correction1;

        for (l, grad_w, grad_b) in grads {
            let layer = &mut self.layers[l];
            let s = &mut state[l];
            adam_update(&mut layer.weights, &grad_w, &mut s.m_w, &mut s.v_w, step_size);
            adam_update(&mut layer.bias, &grad_b, &mut s.m_b, &mut s.v_b, step_size);
        }

        loss
    }

    /// Fit a network to the training data
    pub fn fit(config: &NetworkConfig, data: &TrainingData<'_>) -> AbcResult<Self> {
        config.validate()?;
        if data.is_empty() {
            return Err(AbcError::EmptyReferenceTable);
        }

        let task = data.task();
        let activation = OutputActivation::for_task(task);
        let (x, y) = design_matrices(data);

        let n = x.nrows();
        let mut n_val = (n as f64 * config.effective_validation_split(task)).floor() as usize;
        if n_val >= n {
            n_val = 0;
        }
        let n_train = n - n_val;

        let seed = config.seed.unwrap_or_else(|| rand::rng().random());
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let mut net = NeuralNetwork::new(
            x.ncols(),
            &config.hidden_layers,
            y.ncols(),
            activation,
            &mut rng,
        );
        let mut state: Vec<AdamState> = net.layers.iter().map(AdamState::for_layer).collect();

        info!(
            "Fitting network {:?} on {} rows ({} held out for validation)",
            config.hidden_layers, n_train, n_val
        );

        let val_rows: Vec<usize> = (n_train..n).collect();
        let (x_val, y_val) = (x.select_rows(val_rows.iter()), y.select_rows(val_rows.iter()));

        let mut order: Vec<usize> = (0..n_train).collect();
        let mut step = 0i32;
        let mut first_loss = None;
        let mut train_loss = 0.0;

        for epoch in 0..config.epochs {
            order.shuffle(&mut rng);
            let mut epoch_loss = 0.0;

            for batch in order.chunks(config.batch_size) {
                let xb = x.select_rows(batch.iter());
                let yb = y.select_rows(batch.iter());
                step = step.saturating_add(1);
                let loss = net.train_step(&xb, &yb, &mut state, step, config.learning_rate);
                epoch_loss += loss * batch.len() as f64;
            }

            train_loss = epoch_loss / n_train as f64;
            first_loss.get_or_insert(train_loss);

            if n_val > 0 {
                let val_loss = activation.loss(&net.forward(&x_val), &y_val);
                debug!(
                    "Epoch {}/{}: loss={:.4}, val_loss={:.4}",
                    epoch + 1,
                    config.epochs,
                    train_loss,
                    val_loss
                );
            } else {
                debug!("Epoch {}/{}: loss={:.4}", epoch + 1, config.epochs, train_loss);
            }
        }

        if !train_loss.is_finite() {
            warn!("Network training diverged: final loss is {}", train_loss);
        } else if config.epochs > 1 && first_loss.is_some_and(|first| train_loss >= first) {
            warn!(
                "Network training did not reduce the loss ({:.4} -> {:.4}); returning the model anyway",
                first_loss.unwrap_or(train_loss),
                train_loss
            );
        }

        Ok(net)
    }
}

impl Estimator for NeuralNetwork {
    fn predict_row(&self, x: &[f64]) -> Vec<f64> {
        let input = DMatrix::from_row_slice(1, x.len(), x);
        let out = self.forward(&input);
        out.row(0).iter().copied().collect()
    }

    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn output_dim(&self) -> usize {
        self.layers.last().map(|l| l.weights.ncols()).unwrap_or(0)
    }
}

/// Row-major feature matrix and target matrix for the task
///
/// Binary labels become a single 0/1 column, multi-class labels are one-hot.
fn design_matrices(data: &TrainingData<'_>) -> (DMatrix<f64>, DMatrix<f64>) {
    let n = data.len();
    let d = data.input_dim();
    let x = DMatrix::from_fn(n, d, |i, j| data.features[i][j]);

    let y = match &data.targets {
        Targets::Classes { labels, n_classes: 2 } => {
            DMatrix::from_fn(n, 1, |i, _| if labels[i] == 1 { 1.0 } else { 0.0 })
        }
        Targets::Classes { labels, n_classes } => {
            DMatrix::from_fn(n, *n_classes, |i, j| if labels[i] == j { 1.0 } else { 0.0 })
        }
        Targets::Values { values, dim } => DMatrix::from_fn(n, *dim, |i, j| values[i][j]),
    };

    (x, y)
}
