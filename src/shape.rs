use serde::{ Serialize, Deserialize };

use crate::{
  internal::*,
  error::{ Error, Result },
};


/// The shape of a [Tensor](crate::Tensor).
///
/// Besides its dimensions, a shape knows how to walk the underlying storage.
/// Views like [transpose](Shape::transpose) only rearrange strides and never
/// touch the data itself.

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
  pub dims: Vec<usize>,
  pub(crate) strides: Vec<usize>,
  pub(crate) offset: usize,
}

impl Shape {
  pub fn new(dims: &[usize]) -> Self {
    Self {
      dims: dims.to_vec(),
      strides: Self::make_strides(dims),
      offset: 0,
    }
  }

  fn make_strides(dims: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; dims.len()];
    for i in (1..dims.len()).rev() {
      strides[i - 1] = dims[i] * strides[i];
    }
    strides
  }

  pub fn size(&self) -> usize {
    self.dims.iter().product()
  }

  /// Number of elements, or `None` if it does not fit into a `usize`.

  pub fn checked_size(&self) -> Option<usize> {
    self.dims.iter().try_fold(1usize, |acc, &n| acc.checked_mul(n) )
  }

  pub fn rank(&self) -> usize {
    self.dims.len()
  }

  /// Storage position of the element at `indices`.

  pub(crate) fn index(&self, indices: &[usize]) -> Result<usize> {
    if indices.len() != self.rank() {
      return Err(Error::rank(&[self.rank()], indices.len(), "index"))
    }
    let mut position = self.offset;
    for ((&i, &n), &stride) in indices.iter().zip(&self.dims).zip(&self.strides) {
      if i >= n { return Err(Error::IndexOutOfRange { index: i, size: n }) }
      position += i * stride;
    }
    Ok(position)
  }

  /// One past the highest storage position this shape can reach,
  /// or `None` on overflow or when dims and strides disagree in rank.

  pub(crate) fn span(&self) -> Option<usize> {
    if self.strides.len() != self.dims.len() { return None }
    if self.checked_size()? == 0 { return Some(self.offset) }
    self.dims.iter()
      .zip(&self.strides)
      .try_fold(self.offset.checked_add(1)?, |acc, (&n, &stride)| {
        acc.checked_add((n - 1).checked_mul(stride)?)
      })
  }

  /// Whether every position this shape reaches lies inside `len` elements
  /// of storage, with strides small enough for signed pointer offsets.

  pub(crate) fn fits(&self, len: usize) -> bool {
    self.strides.iter().all(|&stride| stride <= isize::MAX as usize ) &&
      self.checked_size().map_or(false, |size| size <= len ) &&
      self.span().map_or(false, |span| span <= len )
  }

  pub fn contiguous(&self) -> bool {
    self.strides == Self::make_strides(&self.dims)
  }

  /// Storage positions in logical (row-major) order.

  pub fn iter(&self) -> Box<dyn Iterator<Item=usize> + '_> {
    if self.contiguous() {
      Box::new(self.offset..self.offset + self.size())
    } else {
      Box::new(ShapeIterator::new(self))
    }
  }

  /// Fix the leading dimensions to `indices`, keeping the rest.

  pub fn take(&self, indices: &[usize]) -> Result<Self> {
    if indices.len() > self.rank() {
      return Err(Error::rank(&[self.rank()], indices.len(), "take"))
    }
    let mut offset = self.offset;
    for ((&i, &n), &stride) in indices.iter().zip(&self.dims).zip(&self.strides) {
      if i >= n { return Err(Error::IndexOutOfRange { index: i, size: n }) }
      offset += i * stride;
    }
    Ok(Self {
      dims: self.dims[indices.len()..].to_vec(),
      strides: self.strides[indices.len()..].to_vec(),
      offset,
    })
  }

  pub fn view(&self, dims: &[usize]) -> Result<Self> {
    if !self.contiguous() || dims.iter().product::<usize>() != self.size() {
      return Err(Error::shape(&self.dims, dims, "view"))
    }
    Ok(Self { dims: dims.to_vec(), strides: Self::make_strides(dims), offset: self.offset })
  }

  pub fn transpose(&self, dim1: isize, dim2: isize) -> Result<Self> {
    let dim1 = resolve_dim(dim1, self.rank())?;
    let dim2 = resolve_dim(dim2, self.rank())?;
    let mut shape = self.clone();
    shape.dims.swap(dim1, dim2);
    shape.strides.swap(dim1, dim2);
    Ok(shape)
  }
}

impl std::ops::Index<isize> for Shape {
  type Output = usize;

  /// Panics when `i` lies outside the shape's rank, like slice indexing.

  fn index(&self, i: isize) -> &usize {
    let idx = if i < 0 { self.rank() as isize + i } else { i };
    &self.dims[idx as usize]
  }
}

impl std::fmt::Display for Shape {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    write!(f, "Shape{:?}", self.dims)
  }
}


/// Iterate through a [Shape]'s storage positions, odometer style.

pub struct ShapeIterator<'a> {
  shape: &'a Shape,
  counter: Vec<usize>,
  remaining: usize,
}

impl<'a> ShapeIterator<'a> {
  fn new(shape: &'a Shape) -> Self {
    Self {
      counter: vec![0; shape.rank()],
      remaining: shape.size(),
      shape,
    }
  }
}

impl<'a> Iterator for ShapeIterator<'a> {
  type Item = usize;

  fn next(&mut self) -> Option<Self::Item> {
    if self.remaining == 0 { return None }
    self.remaining -= 1;
    let out = self.shape.offset + self.counter.iter()
      .zip(&self.shape.strides)
      .map(|(&i, &stride)| i * stride )
      .sum::<usize>();
    // Walk backward through dimensions, carrying full turns
    for d in (0..self.counter.len()).rev() {
      self.counter[d] += 1;
      if self.counter[d] < self.shape.dims[d] { break }
      self.counter[d] = 0;
    }
    Some(out)
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    (self.remaining, Some(self.remaining))
  }
}
