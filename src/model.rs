use std::fs;
use std::path::Path;

use rand::{ SeedableRng, rngs::StdRng };
use serde::{ Serialize, Deserialize, de::DeserializeOwned };
use tracing::{ info, trace };

use crate::{
  context::Context,
  error::{ Error, Result },
  encode::hot_indices,
  layer::{ Layer, Dense, Recurrent },
  tensor::Tensor,
};


/// Result of running a [SequenceModel].

#[derive(Debug, Clone, PartialEq)]
pub struct Forward {
  /// Per-step, per-character scores, `(steps, batch, vocab_size)`.
  pub output: Tensor<f32>,
  /// State to continue from, for models that carry one.
  pub hidden: Option<Tensor<f32>>,
}


/// Anything that scores the next character of every position
/// in a time-major one-hot sequence.

pub trait SequenceModel {
  fn vocab_size(&self) -> usize;

  /// `input` has shape `(steps, batch, vocab_size)`.

  fn forward(&self, ctx: &Context, input: &Tensor<f32>, hidden: Option<&Tensor<f32>>) -> Result<Forward>;

  /// Fail unless `input` is a time-major tensor over this model's vocabulary.

  fn check_input(&self, input: &Tensor<f32>) -> Result<()> {
    input.expect_rank(3, "model input")?;
    let dims = input.dims();
    if dims[2] != self.vocab_size() {
      return Err(Error::shape(&[dims[0], dims[1], self.vocab_size()], dims, "model input"))
    }
    Ok(())
  }
}

impl<M: SequenceModel + ?Sized> SequenceModel for &M {
  fn vocab_size(&self) -> usize {
    (**self).vocab_size()
  }

  fn forward(&self, ctx: &Context, input: &Tensor<f32>, hidden: Option<&Tensor<f32>>) -> Result<Forward> {
    (**self).forward(ctx, input, hidden)
  }
}


/// Saving models to disc and loading them back.

pub trait Checkpoint: Serialize + DeserializeOwned {
  /// Reject structurally broken models after loading.

  fn validate(&self) -> Result<()> {
    Ok(())
  }

  fn save(&self, filename: impl AsRef<Path>) -> Result<()> {
    let bytes = postcard::to_allocvec(self)?;
    fs::write(&filename, &bytes)?;
    info!(path = %filename.as_ref().display(), bytes = bytes.len(), "saved model");
    Ok(())
  }

  fn load(filename: impl AsRef<Path>) -> Result<Self> {
    let bytes = fs::read(&filename)?;
    let model: Self = postcard::from_bytes(&bytes)?;
    model.validate()?;
    info!(path = %filename.as_ref().display(), "loaded model");
    Ok(model)
  }
}


/// Settings for [CharRnn].

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RnnConfig {
  pub hidden_size: usize,
  /// Seed for weight initialization. Random when unset.
  pub seed: Option<u64>,
}

impl Default for RnnConfig {
  fn default() -> Self {
    Self { hidden_size: 32, seed: None }
  }
}


/// Character level recurrent network: an Elman cell followed
/// by a dense projection back onto the vocabulary.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharRnn {
  vocab_size: usize,
  recurrent: Recurrent,
  head: Dense,
}

impl CharRnn {
  pub fn new(vocab_size: usize, config: &RnnConfig) -> Self {
    let mut rng = match config.seed {
      Some(seed) => StdRng::seed_from_u64(seed),
      None => StdRng::from_entropy(),
    };
    Self {
      vocab_size,
      recurrent: Recurrent::new(vocab_size, config.hidden_size, &mut rng),
      head: Dense::new(config.hidden_size, vocab_size, &mut rng),
    }
  }

  pub fn hidden_size(&self) -> usize {
    self.recurrent.hidden_size()
  }

  pub fn num_parameters(&self) -> usize {
    self.recurrent.num_parameters() + self.head.num_parameters()
  }
}

impl SequenceModel for CharRnn {
  fn vocab_size(&self) -> usize {
    self.vocab_size
  }

  fn forward(&self, ctx: &Context, input: &Tensor<f32>, hidden: Option<&Tensor<f32>>) -> Result<Forward> {
    self.check_input(input)?;
    let (steps, batch_size) = (input.dims()[0], input.dims()[1]);
    let (states, last) = self.recurrent.run(ctx, input, hidden)?;
    trace!(steps, batch_size, "rnn forward");
    let flat = states.reshape(&[steps * batch_size, self.hidden_size()])?;
    let output = self.head
      .forward(ctx, &flat)?
      .reshape(&[steps, batch_size, self.vocab_size])?;
    Ok(Forward { output, hidden: Some(last) })
  }
}

impl Checkpoint for CharRnn {
  fn validate(&self) -> Result<()> {
    self.recurrent.validate()?;
    self.head.validate()?;
    if self.recurrent.input_size() != self.vocab_size {
      return Err(Error::shape(&[self.vocab_size], &[self.recurrent.input_size()], "rnn input"))
    }
    if self.head.output_size() != self.vocab_size {
      return Err(Error::shape(&[self.vocab_size], &[self.head.output_size()], "rnn head"))
    }
    if self.head.input_size() != self.hidden_size() {
      return Err(Error::shape(&[self.hidden_size()], &[self.head.input_size()], "rnn head"))
    }
    Ok(())
  }
}


/// Next-character model built from transition counts.
///
/// Fitting needs no gradients: every observed pair of current and
/// following character bumps a counter. Scores are smoothed log
/// probabilities of the following character given the current one.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BigramModel {
  vocab_size: usize,
  smoothing: f32,
  counts: Vec<f32>,
}

impl BigramModel {
  /// Negative or non-finite smoothing counts as none.

  pub fn new(vocab_size: usize, smoothing: f32) -> Self {
    let smoothing = if smoothing.is_finite() { smoothing.max(0.0) } else { 0.0 };
    Self {
      vocab_size,
      smoothing,
      counts: vec![0.0; vocab_size * vocab_size],
    }
  }

  /// Count the transitions of a time-major batch.

  pub fn fit(&mut self, inputs: &Tensor<f32>, targets: &Tensor<usize>) -> Result<()> {
    self.check_input(inputs)?;
    let current = hot_indices(inputs)?;
    targets.expect_dims(current.dims(), "bigram targets")?;
    if let Some(to) = targets.param_iter().find(|&to| to >= self.vocab_size ) {
      return Err(Error::IndexOutOfRange { index: to, size: self.vocab_size })
    }
    for (from, to) in current.param_iter().zip(targets.param_iter()) {
      self.counts[from * self.vocab_size + to] += 1.0;
    }
    Ok(())
  }

  pub fn count(&self, from: usize, to: usize) -> f32 {
    if from >= self.vocab_size || to >= self.vocab_size { return 0.0 }
    self.counts[from * self.vocab_size + to]
  }

  /// Log probabilities of every character following `from`.
  /// Rows without observations are uniform.

  pub fn scores(&self, from: usize) -> Result<Vec<f32>> {
    let v = self.vocab_size;
    let row = self.counts
      .get(from * v..(from + 1) * v)
      .ok_or(Error::IndexOutOfRange { index: from, size: v })?;
    let total: f32 = row.iter().sum();
    if total == 0.0 {
      return Ok(vec![-(v as f32).ln(); v])
    }
    let norm = total + self.smoothing * v as f32;
    Ok(row.iter().map(|&count| ((count + self.smoothing) / norm).ln() ).collect())
  }
}

impl SequenceModel for BigramModel {
  fn vocab_size(&self) -> usize {
    self.vocab_size
  }

  fn forward(&self, _ctx: &Context, input: &Tensor<f32>, _hidden: Option<&Tensor<f32>>) -> Result<Forward> {
    self.check_input(input)?;
    let current = hot_indices(input)?;
    let mut dims = current.dims().to_vec();
    dims.push(self.vocab_size);
    let data = current.param_iter()
      .map(|from| self.scores(from) )
      .collect::<Result<Vec<_>>>()?
      .concat();
    Ok(Forward { output: Tensor::new(&dims, data)?, hidden: None })
  }
}

impl Checkpoint for BigramModel {
  fn validate(&self) -> Result<()> {
    if self.vocab_size.checked_mul(self.vocab_size) != Some(self.counts.len()) {
      return Err(Error::shape(&[self.vocab_size, self.vocab_size], &[self.counts.len()], "bigram counts"))
    }
    if !(self.smoothing.is_finite() && self.smoothing >= 0.0) {
      return Err(Error::InvalidParameter("bigram smoothing"))
    }
    if !self.counts.iter().all(|&count| count.is_finite() && count >= 0.0 ) {
      return Err(Error::InvalidParameter("bigram counts"))
    }
    Ok(())
  }
}
