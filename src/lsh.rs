//! LSH banding over MinHash signatures.
//!
//! The H signature rows split into B contiguous bands of R rows
//! (H = B * R). Two objects land in the same bucket of one band exactly
//! when their R band rows are equal, which for Jaccard similarity `s`
//! happens with probability `s^R`; across B bands the pair surfaces as a
//! candidate with probability `1 - (1 - s^R)^B`. Candidates are then
//! verified twice, first against the full-signature estimate and then
//! against the exact Jaccard similarity, so reported pairs carry true
//! scores and the only losses are the banding false negatives.
//!
//! [`MinHashLSH`] drives the two-stage workflow: [`minhash`](MinHashLSH::minhash)
//! builds the signature matrix, [`lsh`](MinHashLSH::lsh) runs the band scan.

use crate::config::MinHashLshConfig;
use crate::error::{Error, Result};
use crate::lsh::bucket::bucketize;
use crate::lsh::verify::PairCollector;
use crate::relation::SetIndex;
use crate::signature::{SignatureMatrix, SignatureValue, Signatures};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

mod bucket;
mod verify;

/// One accepted similar pair.
///
/// Undirected and canonical: `object_a < object_b`. `similarity` is the
/// exact Jaccard similarity of the two item sets, not the signature
/// estimate that surfaced the candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarPair {
  pub object_a: usize,
  pub object_b: usize,
  pub similarity: f64,
}

/// All-pairs Jaccard similarity search over one relation.
///
/// Owns the validated configuration, the immutable [`SetIndex`], and the
/// signature matrix once built. Results are returned per run, in discovery
/// order across bands.
pub struct MinHashLSH {
  config: MinHashLshConfig,
  index: SetIndex,
  signatures: Option<Signatures>,
}

impl MinHashLSH {
  /// Validates the configuration and indexes the relation.
  ///
  /// # Errors
  ///
  /// Configuration errors from [`MinHashLshConfig::validate`] and relation
  /// errors from [`SetIndex::from_relation`].
  pub fn new(
    relation: &[(i64, i64)],
    config: MinHashLshConfig,
  ) -> Result<Self> {
    let num_hashes = config.validate()?;
    let index = SetIndex::from_relation(relation, config.min_set_size)?;
    debug!(
      threshold = config.threshold,
      num_bands = config.num_bands,
      num_rows = config.num_rows,
      num_hashes,
      num_objects = index.num_objects(),
      universe_size = index.universe_size(),
      active_objects = index.active_objects().len(),
      "initialized minhash lsh"
    );
    Ok(Self {
      config,
      index,
      signatures: None,
    })
  }

  /// Builds the signature matrix and stores it for [`lsh`](Self::lsh).
  ///
  /// Uses `random_state` when configured; otherwise a fresh seed is drawn
  /// from entropy for this call (and shared with any low-memory fallback,
  /// keeping one build internally consistent).
  ///
  /// # Errors
  ///
  /// `Error::InvalidInput` and `Error::ResourceExhausted` from
  /// [`Signatures::build`].
  pub fn minhash(&mut self) -> Result<()> {
    let seed = self
      .config
      .random_state
      .unwrap_or_else(|| rand::rng().random());
    let signatures = Signatures::build(
      &self.index,
      self.config.num_hashes(),
      self.config.low_memory,
      seed,
    )?;
    debug!(
      num_hashes = signatures.num_hashes(),
      num_objects = signatures.num_objects(),
      wide = signatures.is_wide(),
      low_memory = self.config.low_memory,
      seed,
      "built signature matrix"
    );
    self.signatures = Some(signatures);
    Ok(())
  }

  /// Runs the band scan over the stored signature matrix and returns every
  /// verified pair, deduplicated across bands, in discovery order.
  ///
  /// # Errors
  ///
  /// `Error::Configuration` when no signature matrix is present or the
  /// stored matrix does not match the configured shape.
  pub fn lsh(&self) -> Result<Vec<SimilarPair>> {
    let signatures = self.signatures.as_ref().ok_or_else(|| {
      Error::configuration(
        "no signature matrix: run minhash() or supply one via \
         lsh_with_signatures()",
      )
    })?;
    self.validate_signature_shape(signatures)?;
    let pairs = match signatures {
      Signatures::Narrow(matrix) => self.run_bands(matrix),
      Signatures::Wide(matrix) => self.run_bands(matrix),
    };
    Ok(pairs)
  }

  /// Replaces the stored signature matrix wholesale and runs the band scan.
  ///
  /// This is the wire-format seam between the two stages: any matrix of
  /// shape `(num_bands * num_rows, num_objects)` is accepted regardless of
  /// origin, e.g. one decoded via [`Signatures::from_bytes`].
  ///
  /// # Errors
  ///
  /// `Error::Configuration` when the supplied shape does not match the
  /// configuration and relation.
  pub fn lsh_with_signatures(
    &mut self,
    signatures: Signatures,
  ) -> Result<Vec<SimilarPair>> {
    self.validate_signature_shape(&signatures)?;
    self.signatures = Some(signatures);
    self.lsh()
  }

  /// The stored signature matrix, if one was built or supplied.
  #[inline]
  #[must_use]
  pub const fn signatures(&self) -> Option<&Signatures> {
    self.signatures.as_ref()
  }

  #[inline]
  #[must_use]
  pub const fn set_index(&self) -> &SetIndex {
    &self.index
  }

  #[inline]
  #[must_use]
  pub const fn config(&self) -> &MinHashLshConfig {
    &self.config
  }

  /// Exact Jaccard similarity straight from the indexed relation, outside
  /// the LSH pipeline. Two empty sets score 0.0 by policy.
  #[inline]
  #[must_use]
  pub fn exact_jaccard(&self, object_a: usize, object_b: usize) -> f64 {
    self.index.exact_jaccard(object_a, object_b)
  }

  fn validate_signature_shape(&self, signatures: &Signatures) -> Result<()> {
    let expected_hashes = self.config.num_hashes();
    let (num_hashes, num_objects) = signatures.shape();
    if num_hashes != expected_hashes {
      return Err(Error::configuration(format!(
        "signature matrix has {num_hashes} hash rows but num_bands ({}) \
         times num_rows ({}) requires {expected_hashes}",
        self.config.num_bands, self.config.num_rows
      )));
    }
    if num_objects != self.index.num_objects() {
      return Err(Error::configuration(format!(
        "signature matrix covers {num_objects} objects but the relation \
         has {}",
        self.index.num_objects()
      )));
    }
    Ok(())
  }

  fn run_bands<V: SignatureValue>(
    &self,
    matrix: &SignatureMatrix<V>,
  ) -> Vec<SimilarPair> {
    let num_bands = self.config.num_bands;
    let rows_per_band = self.config.num_rows;
    debug!(
      num_bands,
      rows_per_band,
      threshold = self.config.threshold,
      "starting lsh candidate search"
    );

    let mut collector = PairCollector::new(self.index.num_objects());
    for band_index in 0..num_bands {
      let buckets = bucketize(
        matrix,
        band_index,
        rows_per_band,
        self.index.active_objects(),
      );
      let recorded_before = collector.len();
      verify::verify_band(
        &buckets,
        matrix,
        &self.index,
        self.config.threshold,
        &mut collector,
      );
      let pairs_found = collector.len() - recorded_before;
      if self.config.verbose > 0 {
        info!(
          band = band_index + 1,
          num_bands,
          pairs_found,
          total_pairs = collector.len(),
          "processed band"
        );
      } else {
        trace!(
          band = band_index + 1,
          num_bands,
          pairs_found,
          total_pairs = collector.len(),
          "processed band"
        );
      }
    }

    let pairs = collector.into_pairs();
    debug!(pairs = pairs.len(), "lsh candidate search finished");
    pairs
  }
}
