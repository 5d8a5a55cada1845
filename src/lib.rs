//! MinHash + LSH all-pairs Jaccard similarity search.
//!
//! `ruiji` finds the pairs of objects whose item sets meet a Jaccard
//! similarity threshold without scoring every pair. Objects are sketched as
//! MinHash signatures of H = `num_bands * num_rows` hash rows, the signature
//! matrix is cut into bands, and only objects that collide in some band are
//! verified: first against the signature estimate, then against the exact
//! Jaccard similarity. Reported scores are always exact; the sketch only
//! decides which pairs get scored.
//!
//! ```
//! use ruiji::{MinHashLSH, MinHashLshConfig};
//!
//! // Objects 0 and 1 share all three items; object 2 overlaps neither.
//! let relation = [
//!   (0, 0), (0, 1), (0, 2),
//!   (1, 0), (1, 1), (1, 2),
//!   (2, 7), (2, 8),
//! ];
//! let config = MinHashLshConfig {
//!   threshold: 0.8,
//!   num_bands: 4,
//!   num_rows: 2,
//!   random_state: Some(7),
//!   ..MinHashLshConfig::default()
//! };
//!
//! let mut model = MinHashLSH::new(&relation, config)?;
//! model.minhash()?;
//! let pairs = model.lsh()?;
//!
//! assert_eq!(pairs.len(), 1);
//! assert_eq!((pairs[0].object_a, pairs[0].object_b), (0, 1));
//! assert_eq!(pairs[0].similarity, 1.0);
//! # Ok::<(), ruiji::Error>(())
//! ```

mod config;
mod error;
mod lsh;
mod relation;
mod signature;
mod utils;

#[cfg(feature = "python")]
mod py;

pub use config::MinHashLshConfig;
pub use error::{Error, Result};
pub use lsh::{MinHashLSH, SimilarPair};
pub use relation::SetIndex;
pub use signature::{
  LowMemory, PermutationRng, Precomputed, SignatureMatrix, SignatureStrategy,
  SignatureValue, Signatures,
};
