use crate::signature::{SignatureMatrix, SignatureValue};
use rustc_hash::FxHashMap;
use std::collections::hash_map::Entry;

/// Bucket grouping of the active objects for one band.
///
/// Buckets are band-local and discarded after verification; bands never
/// share grouping state.
pub(crate) struct BandBuckets {
  /// Member lists in first-seen key order; each list ascends because the
  /// active objects are scanned in ascending order.
  members: Vec<Vec<usize>>,
}

impl BandBuckets {
  /// Buckets holding at least two members, the only ones that can produce
  /// candidate pairs.
  pub(crate) fn colliding(&self) -> impl Iterator<Item = &[usize]> {
    self
      .members
      .iter()
      .filter(|bucket| bucket.len() > 1)
      .map(Vec::as_slice)
  }
}

/// Groups the active objects of one band by their exact R-row band slice.
///
/// The key is the band slice itself, compared by value, so two objects
/// share a bucket exactly when every row of the band agrees; nothing is
/// folded into a digest first.
pub(crate) fn bucketize<'matrix, V: SignatureValue>(
  matrix: &'matrix SignatureMatrix<V>,
  band_index: usize,
  rows_per_band: usize,
  active_objects: &[usize],
) -> BandBuckets {
  let mut slots: FxHashMap<&'matrix [V], usize> = FxHashMap::default();
  slots.reserve(active_objects.len());
  let mut members: Vec<Vec<usize>> = Vec::new();

  for &object in active_objects {
    let key = matrix.band(object, band_index, rows_per_band);
    match slots.entry(key) {
      Entry::Occupied(slot) => members[*slot.get()].push(object),
      Entry::Vacant(slot) => {
        slot.insert(members.len());
        members.push(vec![object]);
      }
    }
  }

  BandBuckets { members }
}

#[cfg(test)]
mod tests {
  use crate::lsh::bucket::bucketize;
  use crate::signature::SignatureMatrix;

  // Four hash rows, two bands of two rows. Objects 0 and 1 agree on band 0
  // and disagree on band 1; objects 2 and 3 agree only on band 1.
  fn matrix() -> SignatureMatrix<u32> {
    SignatureMatrix::from_rows(&[
      vec![1, 1, 2, 9],
      vec![5, 5, 3, 8],
      vec![4, 6, 7, 7],
      vec![0, 2, 3, 3],
    ])
    .unwrap()
  }

  #[test]
  fn groups_by_exact_band_equality() {
    let matrix = matrix();
    let buckets = bucketize(&matrix, 0, 2, &[0, 1, 2, 3]);

    let colliding: Vec<&[usize]> = buckets.colliding().collect();
    assert_eq!(colliding, vec![&[0usize, 1][..]]);
  }

  #[test]
  fn bands_do_not_share_grouping_state() {
    let matrix = matrix();
    let buckets = bucketize(&matrix, 1, 2, &[0, 1, 2, 3]);

    let colliding: Vec<&[usize]> = buckets.colliding().collect();
    assert_eq!(colliding, vec![&[2usize, 3][..]]);
  }

  #[test]
  fn partial_row_agreement_is_not_a_collision() {
    // One shared row out of two is not enough; the whole band key must
    // match.
    let partial = SignatureMatrix::from_rows(&[vec![4u32, 4], vec![5, 9]])
      .unwrap();
    let buckets = bucketize(&partial, 0, 2, &[0, 1]);

    assert_eq!(buckets.colliding().count(), 0);
  }

  #[test]
  fn inactive_objects_are_never_bucketized() {
    let matrix = matrix();
    let buckets = bucketize(&matrix, 0, 2, &[0, 2, 3]);

    assert_eq!(buckets.colliding().count(), 0);
  }

  #[test]
  fn grouping_is_deterministic() {
    let matrix = matrix();

    let first: Vec<Vec<usize>> =
      bucketize(&matrix, 0, 2, &[0, 1, 2, 3]).members;
    let second: Vec<Vec<usize>> =
      bucketize(&matrix, 0, 2, &[0, 1, 2, 3]).members;

    assert_eq!(first, second);
  }

  #[test]
  fn member_lists_ascend_with_the_scan_order() {
    let rows = vec![vec![7u32, 7, 7, 7, 7]];
    let matrix = SignatureMatrix::from_rows(&rows).unwrap();
    let buckets = bucketize(&matrix, 0, 1, &[0, 1, 2, 3, 4]);

    let colliding: Vec<&[usize]> = buckets.colliding().collect();
    assert_eq!(colliding, vec![&[0usize, 1, 2, 3, 4][..]]);
  }
}
