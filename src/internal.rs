use rand::Rng;

use crate::{
  error::{ Error, Result },
  scalar::Real,
};


/// Resolve a possibly negative axis against a tensor's rank.

#[inline]
pub fn resolve_dim(i: isize, rank: usize) -> Result<usize> {
  let dim = if i < 0 { rank as isize + i } else { i };
  if dim < 0 || dim as usize >= rank {
    return Err(Error::InvalidAxis { axis: i, rank })
  }
  Ok(dim as usize)
}


/// Position of the greatest value. Earlier positions win ties
/// and NaN never wins.

pub fn argmax<T: PartialOrd + Copy>(values: &[T]) -> Option<usize> {
  let mut best: Option<(usize, T)> = None;
  for (i, &value) in values.iter().enumerate() {
    // NaN is unordered, even against itself
    if value.partial_cmp(&value).is_none() { continue }
    if best.map_or(true, |(_, max)| value > max ) {
      best = Some((i, value));
    }
  }
  best.map(|(i, _)| i )
}


// Glorot/Xavier uniform initialization

pub fn glorot_uniform<T: Real>(rng: &mut impl Rng, fan_in: usize, fan_out: usize) -> T {
  let fans = T::from((fan_in + fan_out).max(1)).unwrap_or_else(T::one);
  let six = T::from(6.0).unwrap_or_else(T::one);
  let limit = (six / fans).sqrt();
  rng.gen_range(-limit, limit)
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn negative_dims() {
    assert_eq!(resolve_dim(-1, 3).unwrap(), 2);
    assert_eq!(resolve_dim(0, 3).unwrap(), 0);
    assert!(resolve_dim(3, 3).is_err());
    assert!(matches!(resolve_dim(-4, 3), Err(Error::InvalidAxis { axis: -4, rank: 3 })));
    assert_eq!(resolve_dim(-4, 3).unwrap_err().to_string(), "axis -4 out of range for rank 3");
  }

  #[test]
  fn argmax_ties() {
    assert_eq!(argmax(&[1.0, 3.0, 3.0, 2.0]), Some(1));
    assert_eq!(argmax(&[0.5, 0.5, 0.5]), Some(0));
    assert_eq!(argmax(&[-3.0, -1.0, -2.0]), Some(1));
    assert_eq!(argmax(&[f32::NAN, 1.0, f32::NAN]), Some(1));
    assert_eq!(argmax::<f32>(&[]), None);
  }
}
