use crate::error::{Error, Result};

/// Allocates a zero-filled buffer of `len` elements, reporting failure as
/// `Error::ResourceExhausted` instead of aborting the process.
pub(crate) fn try_zeroed_vec<V: Copy + Default>(
  len: usize,
  what: &str,
) -> Result<Vec<V>> {
  let mut buffer = Vec::new();
  buffer.try_reserve_exact(len).map_err(|_| {
    Error::resource_exhausted(format!(
      "cannot allocate {what} of {len} elements"
    ))
  })?;
  buffer.resize(len, V::default());
  Ok(buffer)
}

/// Ratio of two counts, defined as 0.0 when the denominator is zero.
///
/// The zero-denominator case carries the crate policy for the Jaccard
/// similarity of two empty sets: 0.0, not an error.
#[inline]
pub(crate) fn ratio_usize(numerator: usize, denominator: usize) -> f64 {
  if denominator == 0 {
    0.0
  } else {
    numerator as f64 / denominator as f64
  }
}

/// Counts positions where `a` and `b` hold equal values.
///
/// Callers pass rows of one signature matrix, so the slices always have
/// equal length.
#[inline]
pub(crate) fn count_equal_rows<V: Copy + Eq>(a: &[V], b: &[V]) -> usize {
  let mut equal_count = 0usize;

  let chunks_a = a.chunks_exact(8);
  let chunks_b = b.chunks_exact(8);

  for (chunk_a, chunk_b) in chunks_a.zip(chunks_b) {
    equal_count += usize::from(chunk_a[0] == chunk_b[0]);
    equal_count += usize::from(chunk_a[1] == chunk_b[1]);
    equal_count += usize::from(chunk_a[2] == chunk_b[2]);
    equal_count += usize::from(chunk_a[3] == chunk_b[3]);
    equal_count += usize::from(chunk_a[4] == chunk_b[4]);
    equal_count += usize::from(chunk_a[5] == chunk_b[5]);
    equal_count += usize::from(chunk_a[6] == chunk_b[6]);
    equal_count += usize::from(chunk_a[7] == chunk_b[7]);
  }

  let remainder_start = (a.len() / 8) * 8;
  if remainder_start < a.len() {
    equal_count += a[remainder_start..]
      .iter()
      .zip(&b[remainder_start..])
      .filter(|&(&x, &y)| x == y)
      .count();
  }

  equal_count
}

#[cfg(test)]
mod tests {
  use crate::error::Error;
  use crate::utils::{count_equal_rows, ratio_usize, try_zeroed_vec};

  fn reference_count<V: Copy + Eq>(a: &[V], b: &[V]) -> usize {
    a.iter().zip(b.iter()).filter(|&(&x, &y)| x == y).count()
  }

  #[test]
  fn ratio_usize_handles_zero_denominator() {
    assert_eq!(ratio_usize(0, 0), 0.0);
    assert_eq!(ratio_usize(3, 0), 0.0);
    assert_eq!(ratio_usize(1, 4), 0.25);
    assert_eq!(ratio_usize(4, 4), 1.0);
  }

  #[test]
  fn count_equal_rows_matches_reference_across_chunk_boundaries() {
    let lengths = [0usize, 1, 7, 8, 9, 16, 17, 31];

    for len in lengths {
      let a: Vec<u32> = (0..len as u32).collect();
      let mut b = a.clone();
      for value in b.iter_mut().step_by(3) {
        *value = value.wrapping_add(1);
      }

      assert_eq!(count_equal_rows(&a, &b), reference_count(&a, &b));
      assert_eq!(count_equal_rows(&a, &a), len);
    }
  }

  #[test]
  fn count_equal_rows_works_for_wide_values() {
    let a: Vec<u64> = vec![5, 6, 7, u64::MAX, 9, 10, 11, 12, 13];
    let mut b = a.clone();
    b[3] = 0;
    b[8] = 0;

    assert_eq!(count_equal_rows(&a, &b), 7);
  }

  #[test]
  fn try_zeroed_vec_fills_with_zeroes() {
    let buffer: Vec<u32> = try_zeroed_vec(9, "test buffer").unwrap();

    assert_eq!(buffer.len(), 9);
    assert!(buffer.iter().all(|&value| value == 0));
  }

  #[test]
  fn try_zeroed_vec_reports_absurd_requests() {
    let result: Result<Vec<u64>, _> =
      try_zeroed_vec(usize::MAX, "test buffer");

    assert!(matches!(result, Err(Error::ResourceExhausted(_))));
  }
}
