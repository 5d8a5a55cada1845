use thiserror::Error;

/// Errors reported by relation indexing, signature building, and LSH runs.
///
/// Every failure is reported eagerly at the start of the operation that
/// detected it; no operation leaves partially-updated state behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  /// The relation or a derived quantity is malformed: negative ids, an
  /// empty relation, or a hash count of zero.
  #[error("invalid input: {0}")]
  InvalidInput(String),

  /// A parameter is outside its documented domain, or a supplied signature
  /// matrix does not match the configured shape.
  #[error("invalid configuration: {0}")]
  Configuration(String),

  /// A signature or permutation buffer cannot be allocated. Recoverable for
  /// the precomputed strategy, which falls back to the low-memory path.
  #[error("resource exhausted: {0}")]
  ResourceExhausted(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
  #[inline]
  pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
    Self::InvalidInput(message.into())
  }

  #[inline]
  pub(crate) fn configuration(message: impl Into<String>) -> Self {
    Self::Configuration(message.into())
  }

  #[inline]
  pub(crate) fn resource_exhausted(message: impl Into<String>) -> Self {
    Self::ResourceExhausted(message.into())
  }
}
