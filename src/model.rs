//! Trainable classifiers that consume dataset batches.
//!
//! The dataset does not care what sits behind [`TrainableModel`]; the
//! [`DenseClassifier`] here is a one-hidden-layer network (dense ReLU layer
//! followed by a softmax output) trained with plain minibatch SGD on
//! categorical cross-entropy.
//!
//! # Examples
//!
//! ```
//! use title_tagger::data::Batch;
//! use title_tagger::model::{Hyperparameters, TrainableModel};
//!
//! let mut model = Hyperparameters::new(2, 2).dense_dim(16).learning_rate(0.5).build();
//! let batch = Batch {
//!     inputs: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
//!     labels: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
//! };
//! for _ in 0..200 {
//!     model.train_batch(&batch);
//! }
//! assert_eq!(model.evaluate_batch(&batch).accuracy, 1.0);
//! ```

use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::data::model::{argmax, Batch};

/// Mean loss and accuracy over one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BatchStats {
    pub loss: f32,
    pub accuracy: f32,
}

/// A classifier trained one minibatch at a time.
pub trait TrainableModel {
    /// Run one optimisation step on `batch` and report the pre-update stats.
    fn train_batch(&mut self, batch: &Batch) -> BatchStats;

    /// Loss and accuracy on `batch` without touching the parameters.
    fn evaluate_batch(&self, batch: &Batch) -> BatchStats;

    /// Class probabilities for a single feature vector.
    fn predict_scores(&self, input: &[f32]) -> Vec<f32>;
}

/// Hyperparameters for a [`DenseClassifier`].
#[derive(Debug, Clone)]
pub struct Hyperparameters {
    input_dim: usize,
    num_labels: usize,
    dense_dim: usize,
    learning_rate: f32,
    seed: u64,
}

impl Hyperparameters {
    pub fn new(input_dim: usize, num_labels: usize) -> Hyperparameters {
        Hyperparameters {
            input_dim,
            num_labels,
            dense_dim: 64,
            learning_rate: 0.1,
            seed: 42,
        }
    }

    /// Width of the hidden ReLU layer.
    pub fn dense_dim(&mut self, dense_dim: usize) -> &mut Hyperparameters {
        self.dense_dim = dense_dim;
        self
    }

    pub fn learning_rate(&mut self, learning_rate: f32) -> &mut Hyperparameters {
        self.learning_rate = learning_rate;
        self
    }

    /// Seed for weight initialisation.
    pub fn seed(&mut self, seed: u64) -> &mut Hyperparameters {
        self.seed = seed;
        self
    }

    pub fn build(&self) -> DenseClassifier {
        let mut rng = StdRng::seed_from_u64(self.seed);
        DenseClassifier {
            input_dim: self.input_dim,
            dense_dim: self.dense_dim,
            num_labels: self.num_labels,
            learning_rate: self.learning_rate,
            hidden_weights: glorot(&mut rng, self.input_dim, self.dense_dim),
            hidden_bias: vec![0.0; self.dense_dim],
            output_weights: glorot(&mut rng, self.dense_dim, self.num_labels),
            output_bias: vec![0.0; self.num_labels],
        }
    }
}

/// `fan_out x fan_in` row-major weights drawn from the Glorot uniform range.
fn glorot(rng: &mut StdRng, fan_in: usize, fan_out: usize) -> Vec<f32> {
    let limit = (6.0 / (fan_in + fan_out).max(1) as f32).sqrt();
    let dist = Uniform::new_inclusive(-limit, limit);
    (0..fan_in * fan_out).map(|_| dist.sample(rng)).collect()
}

/// Dense(ReLU) → Dense(softmax) classifier.
#[derive(Debug, Clone)]
pub struct DenseClassifier {
    input_dim: usize,
    dense_dim: usize,
    num_labels: usize,
    learning_rate: f32,
    hidden_weights: Vec<f32>,
    hidden_bias: Vec<f32>,
    output_weights: Vec<f32>,
    output_bias: Vec<f32>,
}

/// Activations kept from a forward pass for backpropagation.
struct Forward {
    hidden: Vec<f32>,
    probs: Vec<f32>,
}

impl DenseClassifier {
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub fn num_labels(&self) -> usize {
        self.num_labels
    }

    fn forward(&self, input: &[f32]) -> Forward {
        let hidden: Vec<f32> = (0..self.dense_dim)
            .map(|h| {
                let row = &self.hidden_weights[h * self.input_dim..(h + 1) * self.input_dim];
                (dot(row, input) + self.hidden_bias[h]).max(0.0)
            })
            .collect();

        let logits: Vec<f32> = (0..self.num_labels)
            .map(|o| {
                let row = &self.output_weights[o * self.dense_dim..(o + 1) * self.dense_dim];
                dot(row, &hidden) + self.output_bias[o]
            })
            .collect();

        Forward {
            hidden,
            probs: softmax(&logits),
        }
    }
}

impl TrainableModel for DenseClassifier {
    fn train_batch(&mut self, batch: &Batch) -> BatchStats {
        if batch.is_empty() {
            return BatchStats::default();
        }

        let mut grad_hidden_w = vec![0.0f32; self.hidden_weights.len()];
        let mut grad_hidden_b = vec![0.0f32; self.dense_dim];
        let mut grad_output_w = vec![0.0f32; self.output_weights.len()];
        let mut grad_output_b = vec![0.0f32; self.num_labels];
        let mut stats = Accumulator::default();

        for (input, target) in batch.inputs.iter().zip(&batch.labels) {
            let fwd = self.forward(input);
            stats.add(&fwd.probs, target);

            // softmax + cross-entropy: dL/dlogit = p - y
            let delta_out: Vec<f32> = fwd.probs.iter().zip(target).map(|(p, y)| p - y).collect();

            let mut delta_hidden = vec![0.0f32; self.dense_dim];
            for (o, d) in delta_out.iter().enumerate() {
                grad_output_b[o] += d;
                let row = o * self.dense_dim;
                for h in 0..self.dense_dim {
                    grad_output_w[row + h] += d * fwd.hidden[h];
                    delta_hidden[h] += d * self.output_weights[row + h];
                }
            }

            for h in 0..self.dense_dim {
                if fwd.hidden[h] <= 0.0 {
                    continue;
                }
                let d = delta_hidden[h];
                grad_hidden_b[h] += d;
                let row = h * self.input_dim;
                for (i, x) in input.iter().enumerate() {
                    grad_hidden_w[row + i] += d * x;
                }
            }
        }

        let step = self.learning_rate / batch.len() as f32;
        sgd_update(&mut self.hidden_weights, &grad_hidden_w, step);
        sgd_update(&mut self.hidden_bias, &grad_hidden_b, step);
        sgd_update(&mut self.output_weights, &grad_output_w, step);
        sgd_update(&mut self.output_bias, &grad_output_b, step);

        stats.finish(batch.len())
    }

    fn evaluate_batch(&self, batch: &Batch) -> BatchStats {
        if batch.is_empty() {
            return BatchStats::default();
        }
        let mut stats = Accumulator::default();
        for (input, target) in batch.inputs.iter().zip(&batch.labels) {
            stats.add(&self.forward(input).probs, target);
        }
        stats.finish(batch.len())
    }

    fn predict_scores(&self, input: &[f32]) -> Vec<f32> {
        self.forward(input).probs
    }
}

#[derive(Default)]
struct Accumulator {
    loss: f32,
    correct: usize,
}

impl Accumulator {
    fn add(&mut self, probs: &[f32], target: &[f32]) {
        self.loss += cross_entropy(probs, target);
        if argmax(probs) == argmax(target) {
            self.correct += 1;
        }
    }

    fn finish(self, n: usize) -> BatchStats {
        BatchStats {
            loss: self.loss / n as f32,
            accuracy: self.correct as f32 / n as f32,
        }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

fn cross_entropy(probs: &[f32], target: &[f32]) -> f32 {
    -probs
        .iter()
        .zip(target)
        .map(|(p, y)| y * p.max(1e-7).ln())
        .sum::<f32>()
}

fn sgd_update(params: &mut [f32], grads: &[f32], step: f32) {
    for (p, g) in params.iter_mut().zip(grads) {
        *p -= step * g;
    }
}
