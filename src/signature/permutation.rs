use crate::error::{Error, Result};
use crate::signature::{PermutationRng, SignatureValue};
use rand::seq::SliceRandom;

/// Successive uniform permutations of `[0, universe_size)`, produced by
/// shuffling one rank buffer in place.
///
/// Every strategy draws permutations from this generator in hash-row order,
/// so a fixed seed yields the same permutation sequence everywhere and the
/// strategies' matrices come out bit-identical.
pub(crate) struct PermutationGenerator<V> {
  ranks: Vec<V>,
  rng: PermutationRng,
}

impl<V: SignatureValue> PermutationGenerator<V> {
  /// # Errors
  ///
  /// `Error::ResourceExhausted` when the rank buffer cannot be allocated.
  pub(crate) fn new(
    universe_size: usize,
    rng: PermutationRng,
  ) -> Result<Self> {
    let mut ranks = Vec::new();
    ranks.try_reserve_exact(universe_size).map_err(|_| {
      Error::resource_exhausted(format!(
        "cannot allocate permutation buffer of {universe_size} ranks"
      ))
    })?;
    ranks.extend((0..universe_size).map(V::from_rank));
    Ok(Self { ranks, rng })
  }

  /// Advances to the next permutation; the returned slice maps item id to
  /// permuted rank and stays valid until the next call.
  pub(crate) fn advance(&mut self) -> &[V] {
    self.ranks.shuffle(&mut self.rng);
    &self.ranks
  }
}

#[cfg(test)]
mod tests {
  use crate::signature::permutation::PermutationGenerator;
  use crate::signature::PermutationRng;
  use rand::SeedableRng;

  fn generator(seed: u64) -> PermutationGenerator<u32> {
    PermutationGenerator::new(16, PermutationRng::seed_from_u64(seed)).unwrap()
  }

  #[test]
  fn every_draw_is_a_permutation_of_the_universe() {
    let mut permutations = generator(21);

    for _ in 0..4 {
      let mut ranks = permutations.advance().to_vec();
      ranks.sort_unstable();
      let identity: Vec<u32> = (0..16).collect();
      assert_eq!(ranks, identity);
    }
  }

  #[test]
  fn same_seed_replays_the_same_sequence() {
    let mut first = generator(9);
    let mut second = generator(9);

    for _ in 0..5 {
      assert_eq!(first.advance(), second.advance());
    }
  }

  #[test]
  fn draws_evolve_between_calls() {
    let mut permutations = generator(3);
    let first = permutations.advance().to_vec();
    let second = permutations.advance().to_vec();

    assert_ne!(first, second);
  }
}
