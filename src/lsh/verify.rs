use crate::lsh::bucket::BandBuckets;
use crate::lsh::SimilarPair;
use crate::relation::SetIndex;
use crate::signature::{SignatureMatrix, SignatureValue};
use rustc_hash::FxHashSet;

/// Accumulates accepted pairs across bands and suppresses re-verification
/// of recorded pairs.
///
/// `seen[a]` holds every partner already recorded for `a`, keyed by the
/// smaller object id of the pair. Partners are marked exactly when a pair
/// is recorded, so a candidate that failed the exact check stays unmarked;
/// re-examining it in a later band repeats the same deterministic checks
/// and fails the same way.
pub(crate) struct PairCollector {
  seen: Vec<FxHashSet<usize>>,
  pairs: Vec<SimilarPair>,
}

impl PairCollector {
  pub(crate) fn new(num_objects: usize) -> Self {
    Self {
      seen: vec![FxHashSet::default(); num_objects],
      pairs: Vec::new(),
    }
  }

  #[inline]
  pub(crate) fn len(&self) -> usize {
    self.pairs.len()
  }

  pub(crate) fn into_pairs(self) -> Vec<SimilarPair> {
    self.pairs
  }

  #[inline]
  fn already_recorded(&self, first: usize, second: usize) -> bool {
    self.seen[first].contains(&second)
  }

  fn record(&mut self, first: usize, second: usize, similarity: f64) {
    self.seen[first].insert(second);
    self.pairs.push(SimilarPair {
      object_a: first,
      object_b: second,
      similarity,
    });
  }
}

/// Verifies every colliding bucket of one band.
///
/// Bucket members ascend, so each member pairs with the later ones and the
/// smaller id is always the pair's first object. A candidate must clear the
/// full-signature estimate before the exact Jaccard similarity is computed;
/// only the exact value decides acceptance and is the score recorded.
pub(crate) fn verify_band<V: SignatureValue>(
  buckets: &BandBuckets,
  matrix: &SignatureMatrix<V>,
  index: &SetIndex,
  threshold: f64,
  collector: &mut PairCollector,
) {
  for members in buckets.colliding() {
    for (position, &first) in members.iter().enumerate() {
      // The first object's item set is only needed once a partner clears
      // the estimate gate.
      let mut first_set = None;
      for &second in &members[position + 1..] {
        if collector.already_recorded(first, second) {
          continue;
        }
        if matrix.estimated_similarity(first, second) < threshold {
          continue;
        }
        let set_a = first_set.get_or_insert_with(|| index.item_set(first));
        let similarity = index.jaccard_against(set_a, second);
        if similarity >= threshold {
          collector.record(first, second, similarity);
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use crate::lsh::bucket::bucketize;
  use crate::lsh::verify::{verify_band, PairCollector};
  use crate::relation::SetIndex;
  use crate::signature::SignatureMatrix;

  #[test]
  fn records_once_across_recolliding_bands() {
    let pairs = [(0, 0), (0, 1), (1, 0), (1, 1), (2, 5)];
    let index = SetIndex::from_relation(&pairs, None).unwrap();
    // Objects 0 and 1 share both bands; object 2 collides with nobody.
    let matrix = SignatureMatrix::from_rows(&[
      vec![7u32, 7, 1],
      vec![3, 3, 9],
      vec![5, 5, 2],
      vec![6, 6, 8],
    ])
    .unwrap();

    let mut collector = PairCollector::new(index.num_objects());
    for band_index in 0..2 {
      let buckets =
        bucketize(&matrix, band_index, 2, index.active_objects());
      verify_band(&buckets, &matrix, &index, 0.5, &mut collector);
    }

    let recorded = collector.into_pairs();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].object_a, 0);
    assert_eq!(recorded[0].object_b, 1);
    assert_eq!(recorded[0].similarity, 1.0);
  }

  #[test]
  fn estimate_gate_blocks_low_scoring_candidates() {
    // Identical sets, but a signature that only agrees on the colliding
    // band: the gate keeps the pair out even though the true similarity is
    // 1.0. Banding false negatives are accepted by design.
    let pairs = [(0, 0), (0, 1), (1, 0), (1, 1)];
    let index = SetIndex::from_relation(&pairs, None).unwrap();
    let matrix = SignatureMatrix::from_rows(&[
      vec![4u32, 4],
      vec![1, 2],
      vec![3, 5],
      vec![8, 9],
    ])
    .unwrap();

    let mut collector = PairCollector::new(index.num_objects());
    let buckets = bucketize(&matrix, 0, 1, index.active_objects());
    verify_band(&buckets, &matrix, &index, 0.5, &mut collector);

    assert_eq!(collector.len(), 0);
  }

  #[test]
  fn exact_check_rejects_estimate_false_positives() {
    // Disjoint sets behind forged identical signatures: the estimate says
    // 1.0, the exact check says 0.0, and nothing is recorded. The pair is
    // also not marked seen, so a later band re-verifies and rejects again.
    let pairs = [(0, 0), (1, 9)];
    let index = SetIndex::from_relation(&pairs, None).unwrap();
    let matrix =
      SignatureMatrix::from_rows(&[vec![2u32, 2], vec![6, 6]]).unwrap();

    let mut collector = PairCollector::new(index.num_objects());
    for _ in 0..2 {
      let buckets = bucketize(&matrix, 0, 2, index.active_objects());
      verify_band(&buckets, &matrix, &index, 0.5, &mut collector);
    }

    assert_eq!(collector.len(), 0);
  }

  #[test]
  fn bucket_pairs_are_emitted_in_ascending_order() {
    let pairs = [(0, 3), (1, 3), (2, 3)];
    let index = SetIndex::from_relation(&pairs, None).unwrap();
    let matrix =
      SignatureMatrix::from_rows(&[vec![5u32, 5, 5]]).unwrap();

    let mut collector = PairCollector::new(index.num_objects());
    let buckets = bucketize(&matrix, 0, 1, index.active_objects());
    verify_band(&buckets, &matrix, &index, 0.5, &mut collector);

    let recorded: Vec<(usize, usize)> = collector
      .into_pairs()
      .iter()
      .map(|pair| (pair.object_a, pair.object_b))
      .collect();
    assert_eq!(recorded, vec![(0, 1), (0, 2), (1, 2)]);
  }
}
