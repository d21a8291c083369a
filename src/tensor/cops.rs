#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::{
  tensor::Tensor,
  context::{ Context, Device },
  error::{ Error, Result },
};


impl Tensor<f32> {
  /// Matrix product of two rank 2 tensors.

  pub fn mm(&self, rhs: &Self, ctx: &Context) -> Result<Self> {
    self.expect_rank(2, "mm")?;
    rhs.expect_rank(2, "mm")?;
    let rows_l = self.shape[0];
    let cols_l = self.shape[1];
    let cols_r = rhs.shape[1];
    if rhs.shape[0] != cols_l {
      return Err(Error::shape(&[cols_l, cols_r], &rhs.shape.dims, "mm"))
    }

    let data = match ctx.device {
      Device::Cpu => self.matmul(rhs),
      #[cfg(feature = "rayon")]
      Device::Threaded => self.matmul_threaded(rhs),
    };

    Self::new(&[rows_l, cols_r], data)
  }

  #[cfg(not(feature = "unsafe"))]
  fn matmul(&self, rhs: &Self) -> Vec<f32> {
    let lhs = self.contiguous();
    let rhs = rhs.contiguous();
    let (rows_l, cols_l, cols_r) = (lhs.shape[0], lhs.shape[1], rhs.shape[1]);
    let data_l = &lhs.data[lhs.shape.offset..];
    let data_r = &rhs.data[rhs.shape.offset..];

    let mut data = vec![0.0; rows_l * cols_r];
    for i in 0..rows_l {
      for k in 0..cols_l {
        let a = data_l[i * cols_l + k];
        for j in 0..cols_r {
          data[i * cols_r + j] += a * data_r[k * cols_r + j];
        }
      }
    }
    data
  }

  #[cfg(feature = "unsafe")]
  fn matmul(&self, rhs: &Self) -> Vec<f32> {
    let rows_l = self.shape[0];
    let cols_l = self.shape[1];
    let cols_r = rhs.shape[1];

    let mut data = vec![0.0; rows_l * cols_r];
    if data.is_empty() || cols_l == 0 { return data }

    // Tensors are built from fresh shapes or views of them, and anything deserialized
    // or passed to `from_shape` must pass `Shape::fits`. Strides therefore fit an
    // isize and the furthest strided read stays inside the storage.
    unsafe {
      matrixmultiply::sgemm(
        rows_l,
        cols_l,
        cols_r,
        1.0,
        self.data.as_ptr().add(self.shape.offset),
        self.shape.strides[0] as isize,
        self.shape.strides[1] as isize,
        rhs.data.as_ptr().add(rhs.shape.offset),
        rhs.shape.strides[0] as isize,
        rhs.shape.strides[1] as isize,
        0.0,
        data.as_mut_ptr(),
        cols_r as isize,
        1,
      );
    };

    data
  }

  #[cfg(feature = "rayon")]
  fn matmul_threaded(&self, rhs: &Self) -> Vec<f32> {
    let lhs = self.contiguous();
    let rhs = rhs.contiguous();
    let (rows_l, cols_l, cols_r) = (lhs.shape[0], lhs.shape[1], rhs.shape[1]);
    let data_l = &lhs.data[lhs.shape.offset..];
    let data_r = &rhs.data[rhs.shape.offset..];

    let mut data = vec![0.0; rows_l * cols_r];
    if cols_r == 0 { return data }
    data
      .par_chunks_mut(cols_r)
      .enumerate()
      .for_each(|(i, row)| {
        for k in 0..cols_l {
          let a = data_l[i * cols_l + k];
          for (j, out) in row.iter_mut().enumerate() {
            *out += a * data_r[k * cols_r + j];
          }
        }
      });
    data
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn matmul() {
    let ctx = Context::default();
    let x = Tensor::new(&[2,3], vec![1., 2., 3., 4., 5., 6.]).unwrap();
    let y = Tensor::new(&[3,2], vec![1., 2., 3., 4., 5., 6.]).unwrap();
    assert_eq!(x.mm(&y, &ctx).unwrap(), Tensor::new(&[2,2], vec![22., 28., 49., 64.]).unwrap());
  }

  #[test]
  fn matmul_transposed_operand() {
    let ctx = Context::default();
    let x = Tensor::new(&[2,3], vec![1., 2., 3., 4., 5., 6.]).unwrap();
    let y = Tensor::new(&[2,3], vec![1., 3., 5., 2., 4., 6.]).unwrap().transpose(0, 1).unwrap();
    assert_eq!(x.mm(&y, &ctx).unwrap(), Tensor::new(&[2,2], vec![22., 28., 49., 64.]).unwrap());
  }

  #[test]
  fn matmul_vector() {
    let ctx = Context::default();
    let x = Tensor::new(&[2,3], vec![1., 2., 3., 4., 5., 6.]).unwrap();
    let y = Tensor::new(&[3,1], vec![1., 2., 3.]).unwrap();
    assert_eq!(x.mm(&y, &ctx).unwrap(), Tensor::new(&[2,1], vec![14., 32.]).unwrap());
  }

  #[test]
  fn matmul_mismatch() {
    let ctx = Context::default();
    let x = Tensor::<f32>::zeros(&[2,3]);
    assert!(x.mm(&Tensor::zeros(&[2,3]), &ctx).is_err());
    assert!(x.mm(&Tensor::zeros(&[3]), &ctx).is_err());
  }

  #[cfg(feature = "rayon")]
  #[test]
  fn matmul_threaded() {
    let x = Tensor::new(&[2,3], vec![1., 2., 3., 4., 5., 6.]).unwrap();
    let y = Tensor::new(&[3,2], vec![1., 2., 3., 4., 5., 6.]).unwrap();
    let serial = x.mm(&y, &Context::cpu()).unwrap();
    let threaded = x.mm(&y, &Context::new(Device::Threaded)).unwrap();
    assert_eq!(serial, threaded);
  }
}
