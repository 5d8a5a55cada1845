use crate::error::{Error, Result};
use crate::relation::SetIndex;
use crate::signature::permutation::PermutationGenerator;
use crate::signature::{
  validate_build_params, PermutationRng, SignatureMatrix, SignatureValue,
};
use crate::utils::try_zeroed_vec;

/// One way of computing the per-row minimum permuted rank for every active
/// object.
///
/// Implementations must draw permutations from the generator in hash-row
/// order, so the same seed produces the same matrix from any strategy.
pub trait SignatureStrategy {
  /// Builds the full signature matrix over `index`'s active objects.
  ///
  /// # Errors
  ///
  /// `Error::InvalidInput` when `num_hashes` is zero or the item universe
  /// is empty; `Error::ResourceExhausted` when working memory cannot be
  /// allocated.
  fn build<V: SignatureValue>(
    &self,
    index: &SetIndex,
    num_hashes: usize,
    rng: PermutationRng,
  ) -> Result<SignatureMatrix<V>>;
}

/// One permutation at a time: H passes over the active objects, one rank
/// buffer of extra memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct LowMemory;

impl SignatureStrategy for LowMemory {
  fn build<V: SignatureValue>(
    &self,
    index: &SetIndex,
    num_hashes: usize,
    rng: PermutationRng,
  ) -> Result<SignatureMatrix<V>> {
    validate_build_params(num_hashes, index.universe_size())?;
    let mut matrix =
      SignatureMatrix::zeroed(num_hashes, index.num_objects())?;
    let mut permutations =
      PermutationGenerator::new(index.universe_size(), rng)?;

    for hash_row in 0..num_hashes {
      let ranks = permutations.advance();
      for &object in index.active_objects() {
        let mut minimum = V::MAX;
        for &item in index.items_of(object) {
          let rank = ranks[item];
          if rank < minimum {
            minimum = rank;
          }
        }
        matrix.set(hash_row, object, minimum);
      }
    }
    Ok(matrix)
  }
}

/// All permutations up front: one item-major rank table, then a single pass
/// per object folding column-wise minimums.
///
/// Trades O(universe_size x H) memory for fewer item scans; the table
/// allocation is fallible and reported as `ResourceExhausted` so callers can
/// fall back to [`LowMemory`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Precomputed;

impl SignatureStrategy for Precomputed {
  fn build<V: SignatureValue>(
    &self,
    index: &SetIndex,
    num_hashes: usize,
    rng: PermutationRng,
  ) -> Result<SignatureMatrix<V>> {
    validate_build_params(num_hashes, index.universe_size())?;
    let universe_size = index.universe_size();
    let table_len = universe_size.checked_mul(num_hashes).ok_or_else(|| {
      Error::resource_exhausted(format!(
        "rank table of {universe_size} x {num_hashes} entries overflows the \
         addressable range"
      ))
    })?;
    let mut rank_table = try_zeroed_vec::<V>(table_len, "rank table")?;
    let mut permutations =
      PermutationGenerator::new(universe_size, rng)?;

    for hash_row in 0..num_hashes {
      let ranks = permutations.advance();
      for (item, &rank) in ranks.iter().enumerate() {
        rank_table[item * num_hashes + hash_row] = rank;
      }
    }

    let mut matrix =
      SignatureMatrix::zeroed(num_hashes, index.num_objects())?;
    for &object in index.active_objects() {
      let signature = matrix.signature_mut(object);
      signature.fill(V::MAX);
      for &item in index.items_of(object) {
        let lanes = &rank_table[item * num_hashes..][..num_hashes];
        for (slot, &rank) in signature.iter_mut().zip(lanes) {
          if rank < *slot {
            *slot = rank;
          }
        }
      }
    }
    Ok(matrix)
  }
}
