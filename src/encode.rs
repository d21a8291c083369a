//! Turning character sequences into model inputs.
//!
//! Encoders produce batch-major tensors, `(batch, position, vocabulary)`.
//! Models consume time-major ones, `(position, batch, vocabulary)`,
//! so [time_major] sits between the two.

use tracing::trace;

use crate::{
  error::{ Error, Result },
  scalar::Inner,
  tensor::Tensor,
  vocab::Vocabulary,
};


/// One batch of next-character training data, time-major.

#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
  /// One-hot inputs of shape `(seq_len, batch_size, vocab_size)`.
  pub inputs: Tensor<f32>,
  /// Indices of the following characters, shape `(seq_len, batch_size)`.
  pub targets: Tensor<usize>,
}

impl Batch {
  pub fn seq_len(&self) -> usize {
    self.targets.dims()[0]
  }

  pub fn batch_size(&self) -> usize {
    self.targets.dims()[1]
  }
}


fn index_tensor(indices: &[Vec<usize>], seq_len: usize, batch_size: usize) -> Result<Tensor<usize>> {
  if indices.len() != batch_size {
    return Err(Error::shape(&[batch_size], &[indices.len()], "batch"))
  }
  let mut data = Vec::with_capacity(batch_size * seq_len);
  for row in indices {
    if row.len() != seq_len {
      return Err(Error::shape(&[seq_len], &[row.len()], "sequence"))
    }
    data.extend_from_slice(row);
  }
  Tensor::new(&[batch_size, seq_len], data)
}


/// Encode `batch_size` index sequences of length `seq_len` into a
/// `(batch_size, seq_len, vocab_size)` tensor with a single `1.0`
/// per position.

pub fn one_hot(indices: &[Vec<usize>], vocab_size: usize, seq_len: usize, batch_size: usize) -> Result<Tensor<f32>> {
  trace!(batch_size, seq_len, vocab_size, "one-hot encoding");
  index_tensor(indices, seq_len, batch_size)?.one_hot(vocab_size)
}


/// Recover indices from a one-hot tensor, dropping its last axis.
///
/// Every row must hold a single `1.0` with zeros elsewhere, otherwise
/// [Error::NotOneHot] names the first offending row.

pub fn hot_indices(tensor: &Tensor<f32>) -> Result<Tensor<usize>> {
  let positions = tensor.collapse(hot_position)?;
  if let Some(row) = positions.param_iter().position(|position| position.is_none() ) {
    return Err(Error::NotOneHot(row))
  }
  Ok(positions.map(|position| position.unwrap_or(0) ))
}

fn hot_position(row: &[f32]) -> Option<usize> {
  let mut hot = row.iter().enumerate().filter(|(_, &a)| a != 0.0 );
  match (hot.next(), hot.next()) {
    (Some((i, &a)), None) if a == 1.0 => Some(i),
    _ => None,
  }
}


/// The `(batch_size, seq_len)` integer counterpart of [one_hot].

pub fn targets(indices: &[Vec<usize>], seq_len: usize, batch_size: usize) -> Result<Tensor<usize>> {
  index_tensor(indices, seq_len, batch_size)
}


/// Reorder `(batch, seq, ..)` into `(seq, batch, ..)`.
///
/// Accepts one-hot tensors of rank 3 and target tensors of rank 2.
/// The result is laid out contiguously.

pub fn time_major<T: Inner>(tensor: &Tensor<T>) -> Result<Tensor<T>> {
  swap_leading(tensor, "time_major")
}


/// Reorder `(seq, batch, ..)` back into `(batch, seq, ..)`.

pub fn batch_major<T: Inner>(tensor: &Tensor<T>) -> Result<Tensor<T>> {
  swap_leading(tensor, "batch_major")
}

fn swap_leading<T: Inner>(tensor: &Tensor<T>, context: &'static str) -> Result<Tensor<T>> {
  if !(2..=3).contains(&tensor.rank()) {
    return Err(Error::rank(&[2, 3], tensor.rank(), context))
  }
  Ok(tensor.transpose(0, 1)?.contiguous())
}


/// Encode equally long lines for next-character prediction.
///
/// Inputs are characters `0..L-1` of every line, targets are
/// characters `1..L`, both returned time-major.

pub fn encode_lines<S: AsRef<str>>(vocabulary: &Vocabulary, lines: &[S]) -> Result<Batch> {
  let encoded = lines.iter()
    .map(|line| vocabulary.encode_str(line.as_ref()) )
    .collect::<Result<Vec<_>>>()?;
  encode_indices(vocabulary.len(), &encoded)
}

pub(crate) fn encode_indices(vocab_size: usize, encoded: &[Vec<usize>]) -> Result<Batch> {
  let len = encoded.first().map_or(0, |row| row.len() );
  if len < 2 { return Err(Error::SequenceTooShort(len)) }
  let seq_len = len - 1;
  let batch_size = encoded.len();

  let inputs: Vec<Vec<usize>> = encoded.iter().map(|row| row[..row.len().min(seq_len)].to_vec() ).collect();
  let following: Vec<Vec<usize>> = encoded.iter().map(|row| row.iter().skip(1).copied().collect() ).collect();

  let hot = one_hot(&inputs, vocab_size, seq_len, batch_size)?;
  let labels = targets(&following, seq_len, batch_size)?;

  Ok(Batch {
    inputs: time_major(&hot)?,
    targets: time_major(&labels)?,
  })
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn one_hot_layout() {
    let hot = one_hot(&[vec![0, 2], vec![1, 1]], 3, 2, 2).unwrap();
    assert_eq!(hot.dims(), &[2, 2, 3]);
    assert_eq!(hot.get(&[0, 1, 2]).unwrap(), 1.0);
    assert_eq!(hot.get(&[1, 0, 1]).unwrap(), 1.0);
    assert_eq!(hot.get(&[1, 0, 0]).unwrap(), 0.0);
    for value in hot.sum().unwrap().param_iter() {
      assert_eq!(value, 1.0);
    }
  }

  #[test]
  fn one_hot_checks_indices() {
    assert!(matches!(
      one_hot(&[vec![0, 3]], 3, 2, 1),
      Err(Error::IndexOutOfRange { index: 3, size: 3 })
    ));
    assert!(one_hot(&[vec![0, 1]], 3, 3, 1).is_err());
    assert!(one_hot(&[vec![0, 1]], 3, 2, 2).is_err());
  }

  #[test]
  fn hot_indices_inverts_one_hot() {
    let rows = vec![vec![0, 2], vec![1, 1]];
    let hot = one_hot(&rows, 3, 2, 2).unwrap();
    assert_eq!(hot_indices(&hot).unwrap(), targets(&rows, 2, 2).unwrap());
    assert_eq!(hot_indices(&time_major(&hot).unwrap()).unwrap().to_vec(), vec![0, 1, 2, 1]);
  }

  #[test]
  fn hot_indices_rejects_other_rows() {
    let zero = Tensor::new(&[2, 3], vec![0., 1., 0., 0., 0., 0.]).unwrap();
    assert!(matches!(hot_indices(&zero), Err(Error::NotOneHot(1))));
    let double = Tensor::new(&[2, 3], vec![1., 1., 0., 0., 1., 0.]).unwrap();
    assert!(matches!(hot_indices(&double), Err(Error::NotOneHot(0))));
    let scaled = Tensor::new(&[1, 3], vec![0., 0.5, 0.]).unwrap();
    assert!(matches!(hot_indices(&scaled), Err(Error::NotOneHot(0))));
    let nan = Tensor::new(&[1, 2], vec![f32::NAN, 0.]).unwrap();
    assert!(hot_indices(&nan).is_err());
  }

  #[test]
  fn transpose_round_trip() {
    let hot = one_hot(&[vec![0, 1, 2], vec![2, 1, 0]], 3, 3, 2).unwrap();
    let time = time_major(&hot).unwrap();
    assert_eq!(time.dims(), &[3, 2, 3]);
    assert_eq!(time.get(&[0, 1, 2]).unwrap(), hot.get(&[1, 0, 2]).unwrap());
    assert_eq!(batch_major(&time).unwrap(), hot);

    let idx = targets(&[vec![0, 1, 2], vec![2, 1, 0]], 3, 2).unwrap();
    let time = time_major(&idx).unwrap();
    assert_eq!(time.to_vec(), vec![0, 2, 1, 1, 2, 0]);
    assert_eq!(batch_major(&time).unwrap(), idx);
  }

  #[test]
  fn transpose_rejects_rank() {
    assert!(time_major(&Tensor::vec(&[1.0f32])).is_err());
    assert!(batch_major(&Tensor::<f32>::zeros(&[1, 1, 1, 1])).is_err());
  }

  #[test]
  fn next_character_framing() {
    let vocab = Vocabulary::build(&["abc", "cab"]);
    let batch = encode_lines(&vocab, &["abc", "cab"]).unwrap();
    assert_eq!(batch.seq_len(), 2);
    assert_eq!(batch.batch_size(), 2);
    assert_eq!(batch.inputs.argmax().unwrap(), Tensor::new(&[2, 2], vec![0, 2, 1, 0]).unwrap());
    assert_eq!(batch.targets, Tensor::new(&[2, 2], vec![1, 0, 2, 1]).unwrap());
  }

  #[test]
  fn ragged_and_short_lines() {
    let vocab = Vocabulary::build(&["abc", "ab"]);
    assert!(encode_lines(&vocab, &["abc", "ab"]).is_err());
    assert!(matches!(encode_lines(&vocab, &["a"]), Err(Error::SequenceTooShort(1))));
    assert!(matches!(encode_lines::<&str>(&vocab, &[]), Err(Error::SequenceTooShort(0))));
  }
}
