use rand::{ SeedableRng, rngs::StdRng, seq::SliceRandom };
use tracing::{ debug, info };

use crate::{
  encode::{ self, Batch },
  error::{ Error, Result },
  vocab::Vocabulary,
};


/// Right-pad every line with spaces to the length of the longest one,
/// counted in characters. Returns that length.

pub fn pad(lines: &mut [String]) -> usize {
  let max_len = lines.iter().map(|line| line.chars().count() ).max().unwrap_or(0);
  for line in lines.iter_mut() {
    let missing = max_len - line.chars().count();
    line.extend(std::iter::repeat(' ').take(missing));
  }
  max_len
}


/// Padded copies of `lines`.

pub fn padded<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
  let mut lines: Vec<String> = lines.iter().map(|line| line.as_ref().to_string() ).collect();
  pad(&mut lines);
  lines
}


/// A padded set of training lines together with their vocabulary.

#[derive(Debug, Clone)]
pub struct Corpus {
  vocabulary: Vocabulary,
  lines: Vec<String>,
  encoded: Vec<Vec<usize>>,
}

impl Corpus {
  pub fn new<S: AsRef<str>>(lines: &[S]) -> Result<Self> {
    let lines = padded(lines);
    let vocabulary = Vocabulary::build(&lines);
    let encoded = lines.iter()
      .map(|line| vocabulary.encode_str(line) )
      .collect::<Result<Vec<_>>>()?;
    info!(lines = lines.len(), vocabulary = vocabulary.len(), "built corpus");
    Ok(Self { vocabulary, lines, encoded })
  }

  pub fn vocabulary(&self) -> &Vocabulary {
    &self.vocabulary
  }

  pub fn lines(&self) -> &[String] {
    &self.lines
  }

  pub fn len(&self) -> usize {
    self.lines.len()
  }

  pub fn is_empty(&self) -> bool {
    self.lines.is_empty()
  }

  /// Padded length shared by all lines.

  pub fn line_len(&self) -> usize {
    self.encoded.first().map_or(0, |line| line.len() )
  }

  /// Encode the lines at `rows` into a time-major batch.

  pub fn encode_batch(&self, rows: &[usize]) -> Result<Batch> {
    let encoded = rows.iter()
      .map(|&row| self.encoded.get(row)
        .cloned()
        .ok_or(Error::IndexOutOfRange { index: row, size: self.len() }) )
      .collect::<Result<Vec<_>>>()?;
    encode::encode_indices(self.vocabulary.len(), &encoded)
  }

  /// Iterate once over the whole corpus in batches of `batch_size` lines.
  /// The final batch holds the remainder.
  ///
  /// With a shuffle seed, lines are visited in a reproducible random order.
  /// The same seed always gives the same order, so use a [Loader] to
  /// reshuffle between epochs.

  pub fn batches(&self, batch_size: usize, shuffle: Option<u64>) -> Result<Batches<'_>> {
    self.loader(batch_size, shuffle)?.epoch()
  }

  /// Multi-epoch batching. Every call to [Loader::epoch] continues
  /// the same random stream, so each pass gets a fresh order while
  /// the whole sequence of passes stays reproducible.

  pub fn loader(&self, batch_size: usize, shuffle: Option<u64>) -> Result<Loader<'_>> {
    if batch_size == 0 { return Err(Error::EmptyBatch) }
    Ok(Loader {
      corpus: self,
      batch_size,
      rng: shuffle.map(StdRng::seed_from_u64),
      epochs: 0,
    })
  }
}


/// Hands out one [Batches] pass per epoch.

pub struct Loader<'a> {
  corpus: &'a Corpus,
  batch_size: usize,
  rng: Option<StdRng>,
  epochs: usize,
}

impl<'a> Loader<'a> {
  /// Number of passes started so far.

  pub fn epochs(&self) -> usize {
    self.epochs
  }

  pub fn epoch(&mut self) -> Result<Batches<'a>> {
    let mut order: Vec<usize> = (0..self.corpus.len()).collect();
    if let Some(rng) = &mut self.rng {
      order.shuffle(rng);
    }
    self.epochs += 1;
    debug!(epoch = self.epochs, "starting epoch");
    Ok(Batches { corpus: self.corpus, order, batch_size: self.batch_size, position: 0 })
  }
}


/// Iterator over a [Corpus] in batches.

pub struct Batches<'a> {
  corpus: &'a Corpus,
  order: Vec<usize>,
  batch_size: usize,
  position: usize,
}

impl Batches<'_> {
  pub fn num_batches(&self) -> usize {
    (self.order.len() + self.batch_size - 1) / self.batch_size
  }
}

impl Iterator for Batches<'_> {
  type Item = Result<Batch>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.position >= self.order.len() { return None }
    let end = (self.position + self.batch_size).min(self.order.len());
    let rows = &self.order[self.position..end];
    debug!(start = self.position, end, "next batch");
    self.position = end;
    Some(self.corpus.encode_batch(rows))
  }
}
