//! Python bindings, compiled under the `python` feature.
//!
//! The class exposes the two-stage workflow, `minhash()` then `lsh()`, with
//! the latest results kept as parallel attributes.

use crate::config::MinHashLshConfig;
use crate::error::Error;
use crate::lsh::{MinHashLSH, SimilarPair};
use crate::signature::{SignatureMatrix, Signatures};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

impl From<Error> for PyErr {
  fn from(error: Error) -> Self {
    PyValueError::new_err(error.to_string())
  }
}

/// All-pairs Jaccard similarity search over a (object_id, item_id) relation.
#[pyclass(module = "ruiji", name = "MinHashLSH")]
pub struct PyMinHashLSH {
  model: MinHashLSH,
  pairs: Vec<SimilarPair>,
}

#[pymethods]
impl PyMinHashLSH {
  /// Creates a new `MinHashLSH` search.
  ///
  /// # Arguments
  ///
  /// * `relation` - Sequence of `(object_id, item_id)` integer pairs.
  /// * `threshold` - Jaccard similarity cutoff in `[0.0, 1.0]`.
  /// * `num_bands` - Number of LSH bands.
  /// * `num_rows` - Rows per band; hashes = `num_bands * num_rows`.
  /// * `min_set_size` - Keep only objects with strictly more relation rows.
  /// * `random_state` - Seed for reproducible permutations.
  /// * `low_memory` - One permutation at a time instead of a full rank table.
  /// * `verbose` - Raises per-band progress events to info level.
  ///
  /// # Errors
  ///
  /// Raises `ValueError` for negative ids, an empty relation, or parameters
  /// outside their documented domain.
  #[new]
  #[pyo3(signature = (
    relation,
    threshold = 0.5,
    num_bands = 22,
    num_rows = 6,
    min_set_size = None,
    random_state = None,
    low_memory = true,
    verbose = 0
  ))]
  #[allow(clippy::too_many_arguments)]
  pub fn new(
    relation: Vec<(i64, i64)>,
    threshold: f64,
    num_bands: usize,
    num_rows: usize,
    min_set_size: Option<usize>,
    random_state: Option<u64>,
    low_memory: bool,
    verbose: u8,
  ) -> PyResult<Self> {
    let config = MinHashLshConfig {
      threshold,
      num_bands,
      num_rows,
      min_set_size,
      random_state,
      low_memory,
      verbose,
    };
    let model = MinHashLSH::new(&relation, config)?;
    Ok(Self {
      model,
      pairs: Vec::new(),
    })
  }

  /// Builds the signature matrix.
  ///
  /// # Errors
  ///
  /// Raises `ValueError` when the matrix cannot be built.
  pub fn minhash(&mut self) -> PyResult<()> {
    self.model.minhash()?;
    Ok(())
  }

  /// Runs the band scan and returns (object_a, object_b, similarity)
  /// triples in discovery order.
  ///
  /// `signature_matrix` optionally replaces the built matrix with H rows of
  /// N integer values each, H = num_bands * num_rows and N = the number of
  /// object slots.
  ///
  /// # Errors
  ///
  /// Raises `ValueError` when no matrix is available or the supplied one
  /// has the wrong shape.
  #[pyo3(signature = (signature_matrix = None))]
  pub fn lsh(
    &mut self,
    signature_matrix: Option<Vec<Vec<u64>>>,
  ) -> PyResult<Vec<(usize, usize, f64)>> {
    let pairs = match signature_matrix {
      Some(rows) => {
        let matrix = SignatureMatrix::from_rows(&rows)?;
        self.model.lsh_with_signatures(Signatures::Wide(matrix))?
      }
      None => self.model.lsh()?,
    };
    self.pairs = pairs;
    Ok(
      self
        .pairs
        .iter()
        .map(|pair| (pair.object_a, pair.object_b, pair.similarity))
        .collect(),
    )
  }

  /// Pairs from the latest run as (object_a, object_b) tuples.
  #[getter]
  pub fn similar_items(&self) -> Vec<(usize, usize)> {
    self
      .pairs
      .iter()
      .map(|pair| (pair.object_a, pair.object_b))
      .collect()
  }

  /// Scores parallel to `similar_items`.
  #[getter]
  pub fn jaccard_similarity_scores(&self) -> Vec<f64> {
    self.pairs.iter().map(|pair| pair.similarity).collect()
  }

  /// (H, N) shape of the stored signature matrix, or None before minhash.
  #[getter]
  pub fn signature_shape(&self) -> Option<(usize, usize)> {
    self.model.signatures().map(Signatures::shape)
  }

  /// The stored signature matrix as H rows of N values, or None before
  /// minhash. The row format round-trips through `lsh(signature_matrix=...)`.
  pub fn signature_rows(&self) -> Option<Vec<Vec<u64>>> {
    self.model.signatures().map(|signatures| {
      let (num_hashes, num_objects) = signatures.shape();
      (0..num_hashes)
        .map(|hash_row| {
          (0..num_objects)
            .map(|object| signatures.value(hash_row, object))
            .collect()
        })
        .collect()
    })
  }

  /// Exact Jaccard similarity from the indexed relation; two empty sets
  /// score 0.0.
  pub fn exact_jaccard(&self, object_a: usize, object_b: usize) -> f64 {
    self.model.exact_jaccard(object_a, object_b)
  }
}

#[pymodule]
fn ruiji(m: &Bound<'_, PyModule>) -> PyResult<()> {
  m.add_class::<PyMinHashLSH>()?;
  Ok(())
}
