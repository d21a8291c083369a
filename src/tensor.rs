use std::sync::Arc;

use rand::Rng;
use serde::{ Serialize, Deserialize };

mod cops;

use crate::{
  internal::*,
  shape::Shape,
  error::{ Error, Result },
  scalar::{ Inner, Numeric, Real },
};


/// Multidimensional array.
///
/// Tensors may contain any type that satisfies [Inner], but
/// additional methods are available for [Numeric] and [Real]
/// inner types as well as for index tensors of [usize].
///
/// Storage is immutable and shared between views, so
/// cloning, slicing and transposing never copy any data.

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "TensorData<T>", bound(deserialize = "T: Deserialize<'de>"))]
pub struct Tensor<T: Inner> {
  shape: Shape,
  data: Arc<Vec<T>>,
}

// Deserialized tensors pass through here so that no shape
// ever reaches past its storage.
#[derive(Deserialize)]
struct TensorData<T> {
  shape: Shape,
  data: Arc<Vec<T>>,
}

impl<T: Inner> TryFrom<TensorData<T>> for Tensor<T> {
  type Error = Error;

  fn try_from(raw: TensorData<T>) -> Result<Self> {
    let tensor = Self { shape: raw.shape, data: raw.data };
    if !tensor.is_consistent() {
      return Err(Error::shape(&[tensor.data.len()], &tensor.shape.dims, "tensor storage"))
    }
    Ok(tensor)
  }
}

impl<T: Inner> PartialEq for Tensor<T> {
  fn eq(&self, rhs: &Self) -> bool {
    self.shape.dims == rhs.shape.dims &&
      self.param_iter().zip(rhs.param_iter()).all(|(a, b)| a == b )
  }
}

impl<T: Inner> Tensor<T> {
  pub fn from_shape(shape: Shape, data: Vec<T>) -> Result<Self> {
    if shape.checked_size() != Some(data.len()) || !shape.fits(data.len()) {
      return Err(Error::shape(&shape.dims, &[data.len()], "tensor construction"))
    }
    Ok(Self { shape, data: Arc::new(data) })
  }

  pub fn new(dims: &[usize], data: Vec<T>) -> Result<Self> {
    Self::from_shape(Shape::new(dims), data)
  }

  pub fn vec(vec: &[T]) -> Self {
    Self { shape: Shape::new(&[vec.len()]), data: Arc::new(vec.to_vec()) }
  }

  pub fn fill(dims: &[usize], filler: T) -> Self {
    let shape = Shape::new(dims);
    let data = vec![filler; shape.size()];
    Self { shape, data: Arc::new(data) }
  }

  /// Stack equally shaped tensors along a new leading axis.

  pub fn rows(rows: &[Tensor<T>]) -> Result<Self> {
    let first = rows.first().ok_or(Error::EmptyBatch)?;
    let mut dims = first.shape.dims.clone();
    let mut data = Vec::with_capacity(first.size() * rows.len());
    for row in rows {
      if row.shape.dims != first.shape.dims {
        return Err(Error::shape(&first.shape.dims, &row.shape.dims, "rows"))
      }
      data.extend(row.param_iter());
    }
    dims.insert(0, rows.len());
    Self::new(&dims, data)
  }

  pub fn shape(&self) -> &Shape {
    &self.shape
  }

  pub fn dims(&self) -> &[usize] {
    &self.shape.dims
  }

  pub fn size(&self) -> usize {
    self.shape.size()
  }

  pub fn rank(&self) -> usize {
    self.shape.rank()
  }

  /// Fail unless this tensor has exactly the given dimensions.

  pub fn expect_dims(&self, dims: &[usize], context: &'static str) -> Result<()> {
    if self.shape.dims != dims {
      return Err(Error::shape(dims, &self.shape.dims, context))
    }
    Ok(())
  }

  /// Fail unless this tensor has the given rank.

  pub fn expect_rank(&self, rank: usize, context: &'static str) -> Result<()> {
    if self.rank() != rank {
      return Err(Error::rank(&[rank], self.rank(), context))
    }
    Ok(())
  }

  /// Whether the shape stays within its storage.

  pub fn is_consistent(&self) -> bool {
    self.shape.fits(self.data.len())
  }

  pub fn contiguous(&self) -> Self {
    if self.shape.contiguous() {
      self.clone()
    } else {
      self.detach()
    }
  }

  /// Copy into fresh, contiguous storage.

  pub fn detach(&self) -> Self {
    self.map(|a| a )
  }

  pub fn to_vec(&self) -> Vec<T> {
    self.param_iter().collect()
  }

  pub fn param_iter(&self) -> impl Iterator<Item=T> + '_ {
    self.shape.iter().map(move |i| self.data[i] )
  }

  /// Sub-tensors along the first axis.

  pub fn iter(&self) -> impl Iterator<Item=Tensor<T>> + '_ {
    let n = if self.rank() == 0 { 0 } else { self.shape.dims[0] };
    (0..n).filter_map(move |i| self.at(&[i]).ok() )
  }

  pub fn get(&self, indices: &[usize]) -> Result<T> {
    Ok(self.data[self.shape.index(indices)?])
  }

  /// View of the sub-tensor at the given leading indices.

  pub fn at(&self, indices: &[usize]) -> Result<Self> {
    let shape = self.shape.take(indices)?;
    Ok(Self { shape, data: self.data.clone() })
  }

  pub fn item(&self) -> Result<T> {
    if self.size() != 1 {
      return Err(Error::shape(&[1], &self.shape.dims, "item"))
    }
    self.param_iter().next().ok_or_else(|| Error::shape(&[1], &self.shape.dims, "item") )
  }

  pub fn reshape(&self, dims: &[usize]) -> Result<Self> {
    let this = self.contiguous();
    let shape = this.shape.view(dims)?;
    Ok(Self { shape, data: this.data })
  }

  pub fn transpose(&self, dim1: isize, dim2: isize) -> Result<Self> {
    let shape = self.shape.transpose(dim1, dim2)?;
    Ok(Self { shape, data: self.data.clone() })
  }

  pub fn map<O, F>(&self, cb: F) -> Tensor<O>
  where
    O: Inner,
    F: FnMut(T) -> O,
  {
    let data = self.param_iter().map(cb).collect();
    Tensor { shape: Shape::new(&self.shape.dims), data: Arc::new(data) }
  }

  pub fn zip<O, F>(&self, rhs: &Self, cb: F) -> Result<Tensor<O>>
  where
    O: Inner,
    F: Fn((T, T)) -> O,
  {
    rhs.expect_dims(&self.shape.dims, "zip")?;
    let data = self.param_iter()
      .zip(rhs.param_iter())
      .map(cb)
      .collect();
    Tensor::new(&self.shape.dims, data)
  }

  /// Collapse the last axis by handing each of its rows to `cb`.

  pub fn collapse<O, F>(&self, cb: F) -> Result<Tensor<O>>
  where
    O: Inner,
    F: Fn(&[T]) -> O,
  {
    if self.rank() == 0 {
      return Err(Error::rank(&[1, 2, 3], 0, "collapse"))
    }
    let dims = &self.shape.dims[..self.rank() - 1];
    let row_len = self.shape[-1];
    let values = self.to_vec();
    let data = if row_len == 0 {
      vec![cb(&[]); dims.iter().product()]
    } else {
      values.chunks(row_len).map(cb).collect()
    };
    Tensor::new(dims, data)
  }
}

impl<T: Numeric> Tensor<T> {
  pub fn zeros(dims: &[usize]) -> Self {
    Self::fill(dims, T::zero())
  }

  pub fn ones(dims: &[usize]) -> Self {
    Self::fill(dims, T::one())
  }

  pub fn add(&self, rhs: &Self) -> Result<Self> {
    self.zip(rhs, |(a, b)| a + b )
  }

  /// Add a vector to every row of a matrix.

  pub fn add_rows(&self, row: &Self) -> Result<Self> {
    self.expect_rank(2, "add_rows")?;
    row.expect_dims(&[self.shape[-1]], "add_rows")?;
    let row = row.to_vec();
    let data = self.param_iter()
      .enumerate()
      .map(|(i, a)| a + row[i % row.len()] )
      .collect();
    Self::new(&self.shape.dims, data)
  }

  /// Sum over the last axis.

  pub fn sum(&self) -> Result<Self> {
    self.collapse(|row| row.iter().copied().sum() )
  }

  /// Index of the greatest value along the last axis, earlier indices winning ties.

  pub fn argmax(&self) -> Result<Tensor<usize>> {
    if self.rank() > 0 && self.shape[-1] == 0 {
      return Err(Error::shape(&[1], &[0], "argmax"))
    }
    self.collapse(|row| argmax(row).unwrap_or(0) )
  }
}

impl<T: Real> Tensor<T> {
  pub fn glorot_uniform(dims: &[usize], rng: &mut impl Rng) -> Self {
    let fan_in = if dims.len() > 1 { dims[dims.len() - 2] } else { 1 };
    let fan_out = dims.last().copied().unwrap_or(1);
    let shape = Shape::new(dims);
    let data = (0..shape.size()).map(|_| glorot_uniform(rng, fan_in, fan_out) ).collect();
    Self { shape, data: Arc::new(data) }
  }

  pub fn tanh(&self) -> Self {
    self.map(|a| a.tanh() )
  }

  pub fn log(&self) -> Self {
    self.map(|a| a.ln() )
  }

  /// Normalized exponentials over the last axis.

  pub fn softmax(&self) -> Result<Self> {
    let row_len = if self.rank() == 0 { 1 } else { self.shape[-1] };
    let values = self.to_vec();
    let data = values
      .chunks(row_len.max(1))
      .flat_map(|row| {
        let max = row.iter().copied().fold(T::neg_infinity(), T::max);
        let exp: Vec<T> = row.iter().map(|&a| (a - max).exp() ).collect();
        let sum = exp.iter().copied().fold(T::zero(), |acc, a| acc + a );
        exp.into_iter().map(move |a| a / sum )
      })
      .collect();
    Self::new(&self.shape.dims, data)
  }
}

impl Tensor<usize> {
  /// Expand into indicator vectors of length `size` along a new last axis.

  pub fn one_hot<O: Numeric>(&self, size: usize) -> Result<Tensor<O>> {
    let mut dims = self.shape.dims.clone();
    dims.push(size);
    let mut data = vec![O::zero(); self.size() * size];
    for (i, index) in self.param_iter().enumerate() {
      if index >= size {
        return Err(Error::IndexOutOfRange { index, size })
      }
      data[i * size + index] = O::one();
    }
    Tensor::new(&dims, data)
  }
}

impl<T: Inner> std::fmt::Display for Tensor<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    write!(f, "Tensor{:?} ", self.shape.dims)?;
    print_chunks(0, &self.shape.dims, &self.to_vec(), f)
  }
}

fn print_chunks<T: std::fmt::Debug>(idx: usize, dims: &[usize], vec: &[T], f: &mut std::fmt::Formatter) -> std::fmt::Result {
  let indent = "  ".repeat(idx);
  if dims.is_empty() {
    write!(f, "{indent}{:?}", vec.first())?;
  } else if idx == dims.len() - 1 || vec.is_empty() {
    writeln!(f, "{indent}{:?}", vec)?;
  } else {
    writeln!(f, "{indent}[")?;
    for chunk in vec.chunks((vec.len() / dims[idx]).max(1)) {
      print_chunks(idx + 1, dims, chunk, f)?;
    }
    writeln!(f, "{indent}]")?;
  }
  Ok(())
}
