use thiserror::Error;


/// Everything that can go wrong while encoding, running or sampling a model.

#[derive(Error, Debug)]
pub enum Error {
  #[error("character {0:?} is not part of the vocabulary")]
  UnknownChar(char),

  #[error("index {0} is not part of the vocabulary")]
  UnknownIndex(usize),

  #[error("index {index} out of range for axis of size {size}")]
  IndexOutOfRange {
    index: usize,
    size: usize,
  },

  #[error("axis {axis} out of range for rank {rank}")]
  InvalidAxis {
    axis: isize,
    rank: usize,
  },

  #[error("shape mismatch in {context}: expected {expected:?}, got {actual:?}")]
  ShapeMismatch {
    expected: Vec<usize>,
    actual: Vec<usize>,
    context: &'static str,
  },

  #[error("rank mismatch in {context}: expected one of {expected:?}, got {actual}")]
  RankMismatch {
    expected: Vec<usize>,
    actual: usize,
    context: &'static str,
  },

  #[error("sequences of length {0} are too short for next-character framing")]
  SequenceTooShort(usize),

  #[error("row {0} is not a one-hot vector")]
  NotOneHot(usize),

  #[error("invalid model parameter: {0}")]
  InvalidParameter(&'static str),

  #[error("cannot generate from an empty seed")]
  EmptySeed,

  #[error("vocabulary is empty")]
  EmptyVocabulary,

  #[error("batch size must be positive")]
  EmptyBatch,

  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),

  #[error("serialization error: {0}")]
  Serialization(#[from] postcard::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
  pub(crate) fn shape(expected: &[usize], actual: &[usize], context: &'static str) -> Self {
    Self::ShapeMismatch {
      expected: expected.to_vec(),
      actual: actual.to_vec(),
      context,
    }
  }

  pub(crate) fn rank(expected: &[usize], actual: usize, context: &'static str) -> Self {
    Self::RankMismatch {
      expected: expected.to_vec(),
      actual,
      context,
    }
  }
}
