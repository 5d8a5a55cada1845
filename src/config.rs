use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_THRESHOLD: f64 = 0.5;
const DEFAULT_NUM_BANDS: usize = 22;
const DEFAULT_NUM_ROWS: usize = 6;

/// Parameters for a [`MinHashLSH`](crate::MinHashLSH) run.
///
/// `num_bands * num_rows` fixes the number of hash functions H; together with
/// `threshold` it controls the recall curve (a pair of similarity `s` collides
/// in one band with probability `s.powi(num_rows as i32)` and is missed by the
/// whole run with probability `(1 - s^num_rows)^num_bands`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinHashLshConfig {
  /// Similarity cutoff in `[0.0, 1.0]`; applied to the signature estimate
  /// first and to the exact Jaccard similarity afterwards.
  pub threshold: f64,
  /// Number of bands B.
  pub num_bands: usize,
  /// Rows per band R; H = B * R.
  pub num_rows: usize,
  /// When set, only objects with strictly more than this many relation rows
  /// take part in the search.
  pub min_set_size: Option<usize>,
  /// Seed for the permutation generator. `None` draws a fresh seed from
  /// entropy on every build, making runs non-reproducible.
  pub random_state: Option<u64>,
  /// Selects the one-permutation-at-a-time signature strategy. When `false`
  /// the builder materializes all permutations up front and falls back to
  /// the low-memory path if that table cannot be allocated.
  pub low_memory: bool,
  /// Diagnostic verbosity. Zero keeps per-band progress at trace level;
  /// anything higher raises it to info. Never affects results.
  pub verbose: u8,
}

impl Default for MinHashLshConfig {
  fn default() -> Self {
    Self {
      threshold: DEFAULT_THRESHOLD,
      num_bands: DEFAULT_NUM_BANDS,
      num_rows: DEFAULT_NUM_ROWS,
      min_set_size: None,
      random_state: None,
      low_memory: true,
      verbose: 0,
    }
  }
}

impl MinHashLshConfig {
  /// Checks every parameter and returns the hash count H on success.
  ///
  /// # Errors
  ///
  /// `Error::Configuration` for a threshold outside `[0.0, 1.0]` (or not
  /// finite) and for a zero `min_set_size`; `Error::InvalidInput` for zero
  /// bands or rows, or a band/row product that overflows.
  pub fn validate(&self) -> Result<usize> {
    if !self.threshold.is_finite() || !(0.0..=1.0).contains(&self.threshold) {
      return Err(Error::configuration(format!(
        "threshold must be a finite value between 0.0 and 1.0, got {}",
        self.threshold
      )));
    }
    if self.num_bands == 0 {
      return Err(Error::invalid_input("num_bands must be greater than 0"));
    }
    if self.num_rows == 0 {
      return Err(Error::invalid_input("num_rows must be greater than 0"));
    }
    if self.min_set_size == Some(0) {
      return Err(Error::configuration(
        "min_set_size must be greater than 0 when set",
      ));
    }

    self.num_bands.checked_mul(self.num_rows).ok_or_else(|| {
      Error::invalid_input(format!(
        "num_bands ({}) times num_rows ({}) overflows the hash count",
        self.num_bands, self.num_rows
      ))
    })
  }

  /// Hash count H = `num_bands * num_rows`.
  ///
  /// Meaningful after [`validate`](Self::validate) has accepted the
  /// configuration; the product is unchecked here.
  #[inline]
  #[must_use]
  pub const fn num_hashes(&self) -> usize {
    self.num_bands * self.num_rows
  }
}
