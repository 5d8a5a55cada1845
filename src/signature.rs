//! MinHash signature construction.
//!
//! A hash row is one uniform random permutation of the item universe; the
//! signature value of an object under that row is the minimum permuted rank
//! over its items. Two objects agree on a row with probability equal to
//! their Jaccard similarity, so the row-agreement fraction across all H rows
//! is an unbiased similarity estimate.
//!
//! For background see Broder, *On the resemblance and containment of
//! documents* (1997), and Leskovec, Rajaraman, Ullman, *Mining of Massive
//! Datasets*, chapter 3.

use crate::error::{Error, Result};
use crate::relation::SetIndex;
use crate::utils::{count_equal_rows, ratio_usize, try_zeroed_vec};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;
use tracing::warn;

mod permutation;
mod strategy;

pub use strategy::{LowMemory, Precomputed, SignatureStrategy};

/// Generator that drives permutation shuffles; seeded from `random_state`
/// and owned by a single build call.
pub type PermutationRng = Xoshiro256PlusPlus;

/// Integer width of one signature entry.
///
/// Ranks live in `[0, universe_size)`, so `u32` covers universes of up to
/// `u32::MAX + 1` items and `u64` the rest. Width selection happens in
/// [`Signatures::build`]; the strategies and the matrix are generic.
pub trait SignatureValue:
  Copy
  + Eq
  + Ord
  + Hash
  + Default
  + Debug
  + Serialize
  + DeserializeOwned
  + Send
  + Sync
  + 'static
{
  const ZERO: Self;
  const MAX: Self;

  /// Converts a permutation rank. Width selection guarantees the rank fits.
  fn from_rank(rank: usize) -> Self;

  /// Widens the value for width-agnostic consumers.
  fn to_u64(self) -> u64;
}

impl SignatureValue for u32 {
  const ZERO: Self = 0;
  const MAX: Self = u32::MAX;

  #[inline]
  fn from_rank(rank: usize) -> Self {
    u32::try_from(rank).unwrap_or(u32::MAX)
  }

  #[inline]
  fn to_u64(self) -> u64 {
    u64::from(self)
  }
}

impl SignatureValue for u64 {
  const ZERO: Self = 0;
  const MAX: Self = u64::MAX;

  #[inline]
  fn from_rank(rank: usize) -> Self {
    u64::try_from(rank).unwrap_or(u64::MAX)
  }

  #[inline]
  fn to_u64(self) -> u64 {
    self
  }
}

/// Dense H x N signature matrix.
///
/// Storage is object-major so one object's signature, and any band slice of
/// it, is a contiguous slice; the logical shape stays (H, N). Columns of
/// inactive objects keep the zero fill and must never be read as signatures;
/// activity is tracked by the [`SetIndex`], not by sentinel values, because
/// a rank of zero is also a legitimate minimum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureMatrix<V> {
  num_hashes: usize,
  num_objects: usize,
  values: Vec<V>,
}

impl<V: SignatureValue> SignatureMatrix<V> {
  pub(crate) fn zeroed(num_hashes: usize, num_objects: usize) -> Result<Self> {
    let len = num_hashes.checked_mul(num_objects).ok_or_else(|| {
      Error::resource_exhausted(format!(
        "signature matrix of {num_hashes} x {num_objects} entries overflows \
         the addressable range"
      ))
    })?;
    let values = try_zeroed_vec(len, "signature matrix")?;
    Ok(Self {
      num_hashes,
      num_objects,
      values,
    })
  }

  /// Builds a matrix from H hash rows of N values each, e.g. rows produced
  /// by an external signature source.
  ///
  /// # Errors
  ///
  /// `Error::InvalidInput` when there are no rows, rows are empty, or row
  /// lengths disagree.
  pub fn from_rows(rows: &[Vec<V>]) -> Result<Self> {
    let num_hashes = rows.len();
    if num_hashes == 0 {
      return Err(Error::invalid_input(
        "signature matrix needs at least one hash row",
      ));
    }
    let num_objects = rows[0].len();
    if num_objects == 0 {
      return Err(Error::invalid_input("hash rows must not be empty"));
    }

    let mut matrix = Self::zeroed(num_hashes, num_objects)?;
    for (hash_row, row) in rows.iter().enumerate() {
      if row.len() != num_objects {
        return Err(Error::invalid_input(format!(
          "hash row {hash_row} has {} objects, expected {num_objects}",
          row.len()
        )));
      }
      for (object, &value) in row.iter().enumerate() {
        matrix.values[object * num_hashes + hash_row] = value;
      }
    }
    Ok(matrix)
  }

  #[inline]
  #[must_use]
  pub const fn num_hashes(&self) -> usize {
    self.num_hashes
  }

  #[inline]
  #[must_use]
  pub const fn num_objects(&self) -> usize {
    self.num_objects
  }

  /// Logical shape (H, N).
  #[inline]
  #[must_use]
  pub const fn shape(&self) -> (usize, usize) {
    (self.num_hashes, self.num_objects)
  }

  /// Full signature of `object`; callers keep `object < num_objects`.
  #[inline]
  #[must_use]
  pub fn signature(&self, object: usize) -> &[V] {
    &self.values[object * self.num_hashes..][..self.num_hashes]
  }

  /// Entry at hash row `hash_row`, object column `object`.
  #[inline]
  #[must_use]
  pub fn value(&self, hash_row: usize, object: usize) -> V {
    self.values[object * self.num_hashes + hash_row]
  }

  #[inline]
  pub(crate) fn set(&mut self, hash_row: usize, object: usize, value: V) {
    self.values[object * self.num_hashes + hash_row] = value;
  }

  #[inline]
  pub(crate) fn signature_mut(&mut self, object: usize) -> &mut [V] {
    &mut self.values[object * self.num_hashes..][..self.num_hashes]
  }

  /// The band slice of `object` for band `band_index`.
  #[inline]
  pub(crate) fn band(
    &self,
    object: usize,
    band_index: usize,
    rows_per_band: usize,
  ) -> &[V] {
    let start = object * self.num_hashes + band_index * rows_per_band;
    &self.values[start..start + rows_per_band]
  }

  /// Fraction of hash rows on which two objects agree.
  #[inline]
  #[must_use]
  pub fn estimated_similarity(&self, object_a: usize, object_b: usize) -> f64 {
    let equal =
      count_equal_rows(self.signature(object_a), self.signature(object_b));
    ratio_usize(equal, self.num_hashes)
  }

  /// Binary encoding of the matrix.
  ///
  /// # Errors
  ///
  /// `Error::InvalidInput` when encoding fails.
  pub fn to_bytes(&self) -> Result<Vec<u8>> {
    bincode::serde::encode_to_vec(self, bincode::config::standard()).map_err(
      |error| {
        Error::invalid_input(format!("cannot encode signature matrix: {error}"))
      },
    )
  }

  /// Decodes a matrix produced by [`to_bytes`](Self::to_bytes), checking
  /// that the payload length matches the recorded shape.
  ///
  /// # Errors
  ///
  /// `Error::InvalidInput` for undecodable payloads, trailing bytes, or a
  /// value count that disagrees with the shape.
  pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
    let (matrix, consumed): (Self, usize) =
      bincode::serde::decode_from_slice(bytes, bincode::config::standard())
        .map_err(|error| {
          Error::invalid_input(format!(
            "cannot decode signature matrix: {error}"
          ))
        })?;
    if consumed != bytes.len() {
      return Err(Error::invalid_input(format!(
        "signature matrix payload has {} trailing bytes",
        bytes.len() - consumed
      )));
    }
    matrix.validate_dimensions()?;
    Ok(matrix)
  }

  fn validate_dimensions(&self) -> Result<()> {
    let expected = self.num_hashes.checked_mul(self.num_objects);
    if expected != Some(self.values.len()) {
      return Err(Error::invalid_input(format!(
        "decoded signature matrix has {} values for shape ({}, {})",
        self.values.len(),
        self.num_hashes,
        self.num_objects
      )));
    }
    Ok(())
  }
}

/// A built signature matrix at whichever width the universe required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signatures {
  /// Every rank fits in 32 bits.
  Narrow(SignatureMatrix<u32>),
  /// Universe too large for 32-bit ranks.
  Wide(SignatureMatrix<u64>),
}

impl Signatures {
  /// Builds signatures for every active object of `index`.
  ///
  /// `low_memory` selects [`LowMemory`]; otherwise [`Precomputed`] runs
  /// first and a `ResourceExhausted` failure falls back to [`LowMemory`]
  /// with a fresh generator from the same seed, so the fallback result is
  /// bit-identical to a direct low-memory run.
  ///
  /// # Errors
  ///
  /// `Error::InvalidInput` when `num_hashes` is zero or the item universe is
  /// empty; `Error::ResourceExhausted` when no strategy can allocate its
  /// working memory.
  pub fn build(
    index: &SetIndex,
    num_hashes: usize,
    low_memory: bool,
    seed: u64,
  ) -> Result<Self> {
    validate_build_params(num_hashes, index.universe_size())?;
    if index.universe_size() - 1 <= u32::MAX as usize {
      build_with_width::<u32>(index, num_hashes, low_memory, seed)
        .map(Self::Narrow)
    } else {
      build_with_width::<u64>(index, num_hashes, low_memory, seed)
        .map(Self::Wide)
    }
  }

  #[inline]
  #[must_use]
  pub const fn num_hashes(&self) -> usize {
    match self {
      Self::Narrow(matrix) => matrix.num_hashes(),
      Self::Wide(matrix) => matrix.num_hashes(),
    }
  }

  #[inline]
  #[must_use]
  pub const fn num_objects(&self) -> usize {
    match self {
      Self::Narrow(matrix) => matrix.num_objects(),
      Self::Wide(matrix) => matrix.num_objects(),
    }
  }

  /// Logical shape (H, N).
  #[inline]
  #[must_use]
  pub const fn shape(&self) -> (usize, usize) {
    match self {
      Self::Narrow(matrix) => matrix.shape(),
      Self::Wide(matrix) => matrix.shape(),
    }
  }

  #[inline]
  #[must_use]
  pub const fn is_wide(&self) -> bool {
    matches!(self, Self::Wide(_))
  }

  /// Entry at hash row `hash_row`, object column `object`, widened to u64.
  #[inline]
  #[must_use]
  pub fn value(&self, hash_row: usize, object: usize) -> u64 {
    match self {
      Self::Narrow(matrix) => matrix.value(hash_row, object).to_u64(),
      Self::Wide(matrix) => matrix.value(hash_row, object),
    }
  }

  /// Fraction of hash rows on which two objects agree.
  #[inline]
  #[must_use]
  pub fn estimated_similarity(&self, object_a: usize, object_b: usize) -> f64 {
    match self {
      Self::Narrow(matrix) => matrix.estimated_similarity(object_a, object_b),
      Self::Wide(matrix) => matrix.estimated_similarity(object_a, object_b),
    }
  }

  /// Binary encoding of the matrix, width tag included.
  ///
  /// # Errors
  ///
  /// `Error::InvalidInput` when encoding fails.
  pub fn to_bytes(&self) -> Result<Vec<u8>> {
    bincode::serde::encode_to_vec(self, bincode::config::standard()).map_err(
      |error| {
        Error::invalid_input(format!("cannot encode signatures: {error}"))
      },
    )
  }

  /// Decodes signatures produced by [`to_bytes`](Self::to_bytes).
  ///
  /// # Errors
  ///
  /// `Error::InvalidInput` for undecodable payloads, trailing bytes, or
  /// shape metadata that disagrees with the payload.
  pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
    let (signatures, consumed): (Self, usize) =
      bincode::serde::decode_from_slice(bytes, bincode::config::standard())
        .map_err(|error| {
          Error::invalid_input(format!("cannot decode signatures: {error}"))
        })?;
    if consumed != bytes.len() {
      return Err(Error::invalid_input(format!(
        "signatures payload has {} trailing bytes",
        bytes.len() - consumed
      )));
    }
    match &signatures {
      Self::Narrow(matrix) => matrix.validate_dimensions()?,
      Self::Wide(matrix) => matrix.validate_dimensions()?,
    }
    Ok(signatures)
  }
}

fn build_with_width<V: SignatureValue>(
  index: &SetIndex,
  num_hashes: usize,
  low_memory: bool,
  seed: u64,
) -> Result<SignatureMatrix<V>> {
  if low_memory {
    return LowMemory.build(index, num_hashes, rng_for(seed));
  }
  match Precomputed.build(index, num_hashes, rng_for(seed)) {
    Err(Error::ResourceExhausted(reason)) => {
      warn!(
        error = %reason,
        "precomputed signature strategy exhausted memory, falling back to \
         low-memory"
      );
      LowMemory.build(index, num_hashes, rng_for(seed))
    }
    other => other,
  }
}

#[inline]
fn rng_for(seed: u64) -> PermutationRng {
  PermutationRng::seed_from_u64(seed)
}

pub(crate) fn validate_build_params(
  num_hashes: usize,
  universe_size: usize,
) -> Result<()> {
  if num_hashes == 0 {
    return Err(Error::invalid_input("num_hashes must be greater than 0"));
  }
  if universe_size == 0 {
    return Err(Error::invalid_input("item universe is empty"));
  }
  Ok(())
}
