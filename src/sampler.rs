use tracing::{ debug, trace };

use crate::{
  context::Context,
  encode::{ one_hot, time_major },
  error::{ Error, Result },
  model::SequenceModel,
  tensor::Tensor,
  vocab::Vocabulary,
};

pub use crate::internal::argmax;


/// Phase of a [Generation].

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
  /// Replaying the seed, `position` characters in.
  Seeding { position: usize },
  /// Predicting new characters.
  Generating,
  /// A prediction failed; nothing more will be produced.
  Failed,
}


/// Greedy autoregressive text generation.
///
/// Every step feeds the entire text so far through the model and appends
/// the character with the highest score for the last position. There is
/// no randomness, so equal models, seeds and lengths give equal output.

#[derive(Debug)]
pub struct GreedySampler<'a, M: SequenceModel + ?Sized> {
  model: &'a M,
  vocabulary: &'a Vocabulary,
  context: Context,
}

impl<'a, M: SequenceModel + ?Sized> GreedySampler<'a, M> {
  pub fn new(model: &'a M, vocabulary: &'a Vocabulary) -> Result<Self> {
    if vocabulary.is_empty() { return Err(Error::EmptyVocabulary) }
    if model.vocab_size() != vocabulary.len() {
      return Err(Error::shape(&[vocabulary.len()], &[model.vocab_size()], "sampler vocabulary"))
    }
    Ok(Self { model, vocabulary, context: Context::default() })
  }

  pub fn with_context(mut self, context: Context) -> Self {
    self.context = context;
    self
  }

  pub fn vocabulary(&self) -> &Vocabulary {
    self.vocabulary
  }

  /// Text of exactly `out_len` characters starting with `seed`.
  ///
  /// A seed at least `out_len` characters long is truncated and nothing
  /// gets generated. The seed is validated against the vocabulary either way.

  pub fn sample(&self, seed: &str, out_len: usize) -> Result<String> {
    self.generate(seed)?.take(out_len).collect()
  }

  /// Endless stream of characters: first the seed, then predictions.

  pub fn generate(&self, seed: &str) -> Result<Generation<'_, 'a, M>> {
    let indices = self.vocabulary.encode_str(seed)?;
    debug!(seed_len = indices.len(), "seeding");
    Ok(Generation {
      sampler: self,
      seed_len: indices.len(),
      indices,
      state: State::Seeding { position: 0 },
    })
  }

  /// Model scores for the character following `indices`.

  pub fn scores(&self, indices: &[usize]) -> Result<Tensor<f32>> {
    if indices.is_empty() { return Err(Error::EmptySeed) }
    let steps = indices.len();
    let vocab_size = self.vocabulary.len();
    let input = time_major(&one_hot(&[indices.to_vec()], vocab_size, steps, 1)?)?;
    let forward = self.model.forward(&self.context, &input, None)?;
    forward.output.expect_dims(&[steps, 1, vocab_size], "model output")?;
    forward.output.at(&[steps - 1, 0])
  }

  /// Probability of every character following `text`.

  pub fn distribution(&self, text: &str) -> Result<Tensor<f32>> {
    let indices = self.vocabulary.encode_str(text)?;
    self.scores(&indices)?.softmax()
  }

  /// Greedy pick for the character following `indices`.
  /// Falls back to the first character when every score is NaN.

  pub fn next_index(&self, indices: &[usize]) -> Result<usize> {
    let scores = self.scores(indices)?.to_vec();
    Ok(argmax(&scores).unwrap_or(0))
  }
}


/// Iterator produced by [GreedySampler::generate].

pub struct Generation<'s, 'a, M: SequenceModel + ?Sized> {
  sampler: &'s GreedySampler<'a, M>,
  indices: Vec<usize>,
  seed_len: usize,
  state: State,
}

impl<M: SequenceModel + ?Sized> Generation<'_, '_, M> {
  pub fn state(&self) -> State {
    self.state
  }

  /// Everything produced so far, seed included.

  pub fn text(&self) -> Result<String> {
    let produced = match self.state {
      State::Seeding { position } => &self.indices[..position],
      _ => &self.indices[..],
    };
    self.sampler.vocabulary.decode_indices(produced)
  }
}

impl<M: SequenceModel + ?Sized> Iterator for Generation<'_, '_, M> {
  type Item = Result<char>;

  fn next(&mut self) -> Option<Self::Item> {
    match self.state {
      State::Seeding { position } if position < self.seed_len => {
        self.state = State::Seeding { position: position + 1 };
        Some(self.sampler.vocabulary.decode(self.indices[position]))
      },
      State::Seeding { .. } => {
        debug!(len = self.indices.len(), "seed consumed, generating");
        self.state = State::Generating;
        self.next()
      },
      State::Generating => {
        let result = self.sampler
          .next_index(&self.indices)
          .and_then(|index| {
            let c = self.sampler.vocabulary.decode(index)?;
            Ok((index, c))
          });
        match result {
          Ok((index, c)) => {
            trace!(index, ?c, "picked");
            self.indices.push(index);
            Some(Ok(c))
          },
          Err(err) => {
            debug!(%err, "generation failed");
            self.state = State::Failed;
            Some(Err(err))
          },
        }
      },
      State::Failed => None,
    }
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::Forward;

  /// Scores every character equally.

  struct Uniform(usize);

  impl SequenceModel for Uniform {
    fn vocab_size(&self) -> usize {
      self.0
    }

    fn forward(&self, _ctx: &Context, input: &Tensor<f32>, _hidden: Option<&Tensor<f32>>) -> Result<Forward> {
      self.check_input(input)?;
      Ok(Forward { output: Tensor::fill(input.dims(), 1.0 / self.0 as f32), hidden: None })
    }
  }

  /// Always predicts the character after the last one, wrapping around.

  struct Successor(usize);

  impl SequenceModel for Successor {
    fn vocab_size(&self) -> usize {
      self.0
    }

    fn forward(&self, _ctx: &Context, input: &Tensor<f32>, _hidden: Option<&Tensor<f32>>) -> Result<Forward> {
      self.check_input(input)?;
      let current = input.argmax()?;
      let next = current.map(|i| (i + 1) % self.0 );
      Ok(Forward { output: next.one_hot(self.0)?, hidden: None })
    }
  }

  /// Returns a tensor of the wrong shape.

  struct Broken;

  impl SequenceModel for Broken {
    fn vocab_size(&self) -> usize {
      3
    }

    fn forward(&self, _ctx: &Context, _input: &Tensor<f32>, _hidden: Option<&Tensor<f32>>) -> Result<Forward> {
      Ok(Forward { output: Tensor::zeros(&[1, 3]), hidden: None })
    }
  }

  #[test]
  fn uniform_model_picks_lowest_index() {
    let vocab = Vocabulary::build(&["hey"]);
    let sampler = GreedySampler::new(&Uniform(3), &vocab).unwrap();
    assert_eq!(sampler.sample("hey", 6).unwrap(), "heyeee");
  }

  #[test]
  fn successor_model() {
    let vocab = Vocabulary::build(&["abc"]);
    let sampler = GreedySampler::new(&Successor(3), &vocab).unwrap();
    assert_eq!(sampler.sample("a", 7).unwrap(), "abcabca");
    assert_eq!(sampler.sample("cc", 4).unwrap(), "ccab");
  }

  #[test]
  fn long_seed_is_truncated() {
    let vocab = Vocabulary::build(&["hey"]);
    let sampler = GreedySampler::new(&Uniform(3), &vocab).unwrap();
    assert_eq!(sampler.sample("hey", 3).unwrap(), "hey");
    assert_eq!(sampler.sample("hey", 2).unwrap(), "he");
    assert_eq!(sampler.sample("hey", 0).unwrap(), "");
  }

  #[test]
  fn unknown_seed_character() {
    let vocab = Vocabulary::build(&["hey"]);
    let sampler = GreedySampler::new(&Uniform(3), &vocab).unwrap();
    assert!(matches!(sampler.sample("hex", 6), Err(Error::UnknownChar('x'))));
    assert!(matches!(sampler.sample("hex", 1), Err(Error::UnknownChar('x'))));
  }

  #[test]
  fn empty_seed() {
    let vocab = Vocabulary::build(&["hey"]);
    let sampler = GreedySampler::new(&Uniform(3), &vocab).unwrap();
    assert!(matches!(sampler.sample("", 2), Err(Error::EmptySeed)));
    assert_eq!(sampler.sample("", 0).unwrap(), "");
  }

  #[test]
  fn vocabulary_mismatch() {
    let vocab = Vocabulary::build(&["hey"]);
    assert!(GreedySampler::new(&Uniform(4), &vocab).is_err());
    let empty = Vocabulary::build::<&str>(&[]);
    assert!(matches!(GreedySampler::new(&Uniform(0), &empty), Err(Error::EmptyVocabulary)));
  }

  #[test]
  fn malformed_output_fails_fast() {
    let vocab = Vocabulary::build(&["abc"]);
    let sampler = GreedySampler::new(&Broken, &vocab).unwrap();
    assert!(matches!(sampler.sample("a", 3), Err(Error::ShapeMismatch { .. })));
  }

  #[test]
  fn generation_states() {
    let vocab = Vocabulary::build(&["abc"]);
    let sampler = GreedySampler::new(&Successor(3), &vocab).unwrap();
    let mut generation = sampler.generate("ab").unwrap();
    assert_eq!(generation.state(), State::Seeding { position: 0 });
    assert_eq!(generation.next().unwrap().unwrap(), 'a');
    assert_eq!(generation.text().unwrap(), "a");
    assert_eq!(generation.next().unwrap().unwrap(), 'b');
    assert_eq!(generation.next().unwrap().unwrap(), 'c');
    assert_eq!(generation.state(), State::Generating);
    assert_eq!(generation.text().unwrap(), "abc");
  }

  #[test]
  fn failed_generation_stops() {
    let vocab = Vocabulary::build(&["abc"]);
    let sampler = GreedySampler::new(&Broken, &vocab).unwrap();
    let mut generation = sampler.generate("a").unwrap();
    assert!(generation.next().unwrap().is_ok());
    assert!(generation.next().unwrap().is_err());
    assert_eq!(generation.state(), State::Failed);
    assert!(generation.next().is_none());
  }

  #[test]
  fn distribution_sums_to_one() {
    let vocab = Vocabulary::build(&["abc"]);
    let sampler = GreedySampler::new(&Successor(3), &vocab).unwrap();
    let probs = sampler.distribution("ab").unwrap();
    assert_eq!(probs.dims(), &[3]);
    assert!((probs.sum().unwrap().item().unwrap() - 1.0).abs() < 1e-6);
    assert_eq!(probs.argmax().unwrap().item().unwrap(), 2);
  }
}
