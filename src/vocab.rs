use std::collections::HashMap;

use itertools::Itertools;
use serde::{ Serialize, Deserialize };

use crate::error::{ Error, Result };


/// Bijection between the characters of a corpus and `0..len()`.
///
/// Characters are numbered in ascending code point order, so building
/// from the same corpus always yields the same indices.

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<char>", into = "Vec<char>")]
pub struct Vocabulary {
  chars: Vec<char>,
  index: HashMap<char, usize>,
}

impl Vocabulary {
  pub fn build<S: AsRef<str>>(lines: &[S]) -> Self {
    let chars: Vec<char> = lines.iter()
      .flat_map(|line| line.as_ref().chars() )
      .unique()
      .sorted()
      .collect();
    Self::from(chars)
  }

  pub fn len(&self) -> usize {
    self.chars.len()
  }

  pub fn is_empty(&self) -> bool {
    self.chars.is_empty()
  }

  pub fn chars(&self) -> &[char] {
    &self.chars
  }

  pub fn contains(&self, c: char) -> bool {
    self.index.contains_key(&c)
  }

  pub fn encode(&self, c: char) -> Result<usize> {
    self.index.get(&c).copied().ok_or(Error::UnknownChar(c))
  }

  pub fn decode(&self, i: usize) -> Result<char> {
    self.chars.get(i).copied().ok_or(Error::UnknownIndex(i))
  }

  pub fn encode_str(&self, text: &str) -> Result<Vec<usize>> {
    text.chars().map(|c| self.encode(c) ).collect()
  }

  pub fn decode_indices(&self, indices: &[usize]) -> Result<String> {
    indices.iter().map(|&i| self.decode(i) ).collect()
  }
}

impl From<Vec<char>> for Vocabulary {
  /// Later duplicates are dropped.

  fn from(chars: Vec<char>) -> Self {
    let chars: Vec<char> = chars.into_iter().unique().collect();
    let index = chars.iter()
      .enumerate()
      .map(|(i, &c)| (c, i) )
      .collect();
    Self { chars, index }
  }
}

impl From<Vocabulary> for Vec<char> {
  fn from(vocabulary: Vocabulary) -> Self {
    vocabulary.chars
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn two_chars() {
    let vocab = Vocabulary::build(&["ab", "ba"]);
    assert_eq!(vocab.len(), 2);
    let encoded = vocab.encode_str("ab").unwrap();
    assert_eq!(encoded, vec![0, 1]);
    assert_eq!(vocab.decode_indices(&encoded).unwrap(), "ab");
  }

  #[test]
  fn sorted_order() {
    let vocab = Vocabulary::build(&["hey", "ye h"]);
    assert_eq!(vocab.chars(), &[' ', 'e', 'h', 'y']);
    for (i, &c) in vocab.chars().iter().enumerate() {
      assert_eq!(vocab.encode(c).unwrap(), i);
      assert_eq!(vocab.decode(i).unwrap(), c);
    }
  }

  #[test]
  fn unknown_members() {
    let vocab = Vocabulary::build(&["abc"]);
    assert!(matches!(vocab.encode('z'), Err(Error::UnknownChar('z'))));
    assert!(matches!(vocab.decode(3), Err(Error::UnknownIndex(3))));
    assert!(vocab.encode_str("abz").is_err());
    assert!(!vocab.contains('z'));
  }

  #[test]
  fn empty() {
    let vocab = Vocabulary::build::<&str>(&[]);
    assert!(vocab.is_empty());
  }

  #[test]
  fn serialize() {
    let vocab = Vocabulary::build(&["hello world"]);
    let bytes = postcard::to_allocvec(&vocab).unwrap();
    let restored: Vocabulary = postcard::from_bytes(&bytes).unwrap();
    assert_eq!(restored, vocab);
    assert_eq!(restored.encode('w').unwrap(), vocab.encode('w').unwrap());
  }
}
