use rand::Rng;
use serde::{ Serialize, Deserialize };

use crate::{
  context::Context,
  error::{ Error, Result },
  tensor::Tensor,
};


/// A differentiable-in-principle building block of a model.
///
/// Composite models own their layers and call them explicitly.

pub trait Layer {
  fn forward(&self, ctx: &Context, input: &Tensor<f32>) -> Result<Tensor<f32>>;
  fn parameters(&self) -> Vec<&Tensor<f32>>;

  fn num_parameters(&self) -> usize {
    self.parameters().iter().map(|param| param.size() ).sum()
  }

  /// Check that loaded parameters are usable.

  fn validate(&self) -> Result<()> {
    check_storage(&self.parameters())
  }
}

fn check_storage(params: &[&Tensor<f32>]) -> Result<()> {
  match params.iter().find(|param| !param.is_consistent() ) {
    Some(param) => Err(Error::shape(param.dims(), &[], "parameter storage")),
    None => Ok(()),
  }
}


/// Fully connected layer, `x·W + b`.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dense {
  weights: Tensor<f32>,
  bias: Tensor<f32>,
}

impl Dense {
  pub fn new(inputs: usize, outputs: usize, rng: &mut impl Rng) -> Self {
    Self {
      weights: Tensor::glorot_uniform(&[inputs, outputs], rng),
      bias: Tensor::zeros(&[outputs]),
    }
  }

  pub fn from_parts(weights: Tensor<f32>, bias: Tensor<f32>) -> Result<Self> {
    weights.expect_rank(2, "dense weights")?;
    bias.expect_dims(&[weights.dims()[1]], "dense bias")?;
    Ok(Self { weights, bias })
  }

  pub fn input_size(&self) -> usize {
    self.weights.dims()[0]
  }

  pub fn output_size(&self) -> usize {
    self.weights.dims()[1]
  }
}

impl Layer for Dense {
  fn forward(&self, ctx: &Context, input: &Tensor<f32>) -> Result<Tensor<f32>> {
    input.expect_rank(2, "dense input")?;
    if input.dims()[1] != self.input_size() {
      return Err(Error::shape(&[input.dims()[0], self.input_size()], input.dims(), "dense input"))
    }
    input.mm(&self.weights, ctx)?.add_rows(&self.bias)
  }

  fn parameters(&self) -> Vec<&Tensor<f32>> {
    vec![&self.weights, &self.bias]
  }

  fn validate(&self) -> Result<()> {
    check_storage(&self.parameters())?;
    self.weights.expect_rank(2, "dense weights")?;
    self.bias.expect_dims(&[self.output_size()], "dense bias")
  }
}


/// Elman recurrent cell, `h' = tanh(x·Wx + h·Wh + b)`.
///
/// As a [Layer] it runs a whole time-major sequence `(steps, batch, inputs)`
/// from a zero state and returns every hidden state.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recurrent {
  input: Dense,
  hidden: Dense,
}

impl Recurrent {
  pub fn new(inputs: usize, hidden_size: usize, rng: &mut impl Rng) -> Self {
    Self {
      input: Dense::new(inputs, hidden_size, rng),
      hidden: Dense::new(hidden_size, hidden_size, rng),
    }
  }

  pub fn input_size(&self) -> usize {
    self.input.input_size()
  }

  pub fn hidden_size(&self) -> usize {
    self.hidden.output_size()
  }

  pub fn zero_state(&self, batch_size: usize) -> Tensor<f32> {
    Tensor::zeros(&[batch_size, self.hidden_size()])
  }

  /// Advance one time step for a `(batch, inputs)` slice.

  pub fn step(&self, ctx: &Context, input: &Tensor<f32>, state: &Tensor<f32>) -> Result<Tensor<f32>> {
    let x = self.input.forward(ctx, input)?;
    let h = self.hidden.forward(ctx, state)?;
    Ok(x.add(&h)?.tanh())
  }

  /// Run a time-major sequence, returning all hidden states
  /// `(steps, batch, hidden)` and the final one.

  pub fn run(&self, ctx: &Context, sequence: &Tensor<f32>, state: Option<&Tensor<f32>>) -> Result<(Tensor<f32>, Tensor<f32>)> {
    sequence.expect_rank(3, "recurrent input")?;
    let batch_size = sequence.dims()[1];
    let mut state = match state {
      Some(state) => {
        state.expect_dims(&[batch_size, self.hidden_size()], "recurrent state")?;
        state.clone()
      },
      None => self.zero_state(batch_size),
    };
    let mut outputs = Vec::with_capacity(sequence.dims()[0]);
    for input in sequence.iter() {
      state = self.step(ctx, &input, &state)?;
      outputs.push(state.clone());
    }
    if outputs.is_empty() {
      return Err(Error::SequenceTooShort(0))
    }
    Ok((Tensor::rows(&outputs)?, state))
  }
}

impl Layer for Recurrent {
  fn forward(&self, ctx: &Context, input: &Tensor<f32>) -> Result<Tensor<f32>> {
    Ok(self.run(ctx, input, None)?.0)
  }

  fn parameters(&self) -> Vec<&Tensor<f32>> {
    [self.input.parameters(), self.hidden.parameters()].concat()
  }

  fn validate(&self) -> Result<()> {
    self.input.validate()?;
    self.hidden.validate()?;
    if self.hidden.input_size() != self.hidden_size() || self.input.output_size() != self.hidden_size() {
      return Err(Error::shape(
        &[self.hidden_size(), self.hidden_size()],
        &[self.input.output_size(), self.hidden.input_size()],
        "recurrent weights",
      ))
    }
    Ok(())
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use rand::{ SeedableRng, rngs::StdRng };

  #[test]
  fn dense_forward() {
    let ctx = Context::default();
    let dense = Dense::from_parts(
      Tensor::new(&[2,3], vec![1., 0., 2., 0., 1., 3.]).unwrap(),
      Tensor::vec(&[0.5, 0.5, 0.5]),
    ).unwrap();
    let out = dense.forward(&ctx, &Tensor::new(&[1,2], vec![1., 2.]).unwrap()).unwrap();
    assert_eq!(out, Tensor::new(&[1,3], vec![1.5, 2.5, 8.5]).unwrap());
    assert_eq!(dense.num_parameters(), 9);
    assert!(dense.forward(&ctx, &Tensor::zeros(&[1,3])).is_err());
  }

  #[test]
  fn dense_from_parts_checks_bias() {
    assert!(Dense::from_parts(Tensor::zeros(&[2,3]), Tensor::zeros(&[2])).is_err());
  }

  #[test]
  fn glorot_bounds() {
    let mut rng = StdRng::seed_from_u64(1);
    let dense = Dense::new(4, 2, &mut rng);
    let limit = (6.0f32 / 6.0).sqrt();
    assert!(dense.weights.param_iter().all(|w| w.abs() <= limit ));
  }

  #[test]
  fn recurrent_shapes() {
    let ctx = Context::default();
    let mut rng = StdRng::seed_from_u64(3);
    let cell = Recurrent::new(4, 5, &mut rng);
    let sequence = Tensor::zeros(&[3, 2, 4]);
    let (outputs, last) = cell.run(&ctx, &sequence, None).unwrap();
    assert_eq!(outputs.dims(), &[3, 2, 5]);
    assert_eq!(last.dims(), &[2, 5]);
    assert_eq!(outputs.at(&[2]).unwrap(), last);
    // Zero input, zero state and zero bias keep everything at zero
    assert!(outputs.param_iter().all(|h| h == 0.0 ));
    assert!(cell.run(&ctx, &sequence, Some(&Tensor::zeros(&[1, 5]))).is_err());
    assert!(cell.validate().is_ok());
  }

  #[test]
  fn recurrent_output_is_bounded() {
    let ctx = Context::default();
    let mut rng = StdRng::seed_from_u64(9);
    let cell = Recurrent::new(3, 4, &mut rng);
    let sequence = Tensor::ones(&[5, 1, 3]);
    let hidden = cell.forward(&ctx, &sequence).unwrap();
    assert!(hidden.param_iter().all(|h| h.abs() <= 1.0 ));
  }
}
