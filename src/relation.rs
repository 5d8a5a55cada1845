//! Indexed view of the (object, item) relation.
//!
//! The relation arrives as a flat list of pairs; [`SetIndex`] counting-sorts
//! it by object id into one contiguous item column plus per-object range
//! offsets, so every object's item set is a slice lookup. Universe sizes are
//! taken over the raw relation before the optional minimum-set-size filter,
//! which keeps signature-matrix shapes independent of filtering.

use crate::error::{Error, Result};
use crate::utils::{ratio_usize, try_zeroed_vec};
use rustc_hash::FxHashSet;

/// Immutable index over the input relation.
///
/// Objects whose rows were filtered out (or that never appear) stay
/// addressable: they report an empty item slice and are absent from
/// [`active_objects`](Self::active_objects).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetIndex {
  /// Item column of the retained relation, grouped by object id.
  items: Vec<usize>,
  /// `items[offsets[o]..offsets[o + 1]]` is object `o`'s item range.
  offsets: Vec<usize>,
  /// Ascending object ids with a non-empty range.
  active: Vec<usize>,
  num_objects: usize,
  universe_size: usize,
}

impl SetIndex {
  /// Builds the index from `(object_id, item_id)` pairs.
  ///
  /// When `min_set_size` is given, only objects with strictly more relation
  /// rows than the threshold are retained; duplicate rows count towards the
  /// threshold but never change set semantics.
  ///
  /// # Errors
  ///
  /// `Error::InvalidInput` when the relation is empty or an id is negative
  /// (the message names the column and row); `Error::ResourceExhausted` when
  /// an index buffer cannot be allocated.
  pub fn from_relation(
    pairs: &[(i64, i64)],
    min_set_size: Option<usize>,
  ) -> Result<Self> {
    if pairs.is_empty() {
      return Err(Error::invalid_input("relation is empty"));
    }

    let mut rows = Vec::new();
    rows.try_reserve_exact(pairs.len()).map_err(|_| {
      Error::resource_exhausted(format!(
        "cannot allocate relation copy of {} rows",
        pairs.len()
      ))
    })?;

    let mut max_object = 0usize;
    let mut max_item = 0usize;
    for (row, &(object_id, item_id)) in pairs.iter().enumerate() {
      let object = column_index(object_id, row, "object_id")?;
      let item = column_index(item_id, row, "item_id")?;
      max_object = max_object.max(object);
      max_item = max_item.max(item);
      rows.push((object, item));
    }

    let num_objects = checked_domain_size(max_object, "object_id")?;
    let universe_size = checked_domain_size(max_item, "item_id")?;

    let mut counts = try_zeroed_vec::<usize>(num_objects, "object counts")?;
    for &(object, _) in &rows {
      counts[object] += 1;
    }

    // The filter keyword means "strictly more rows than"; zeroed counts mark
    // dropped objects for the placement pass below.
    if let Some(min_size) = min_set_size {
      for count in &mut counts {
        if *count <= min_size {
          *count = 0;
        }
      }
    }

    let mut offsets = try_zeroed_vec::<usize>(num_objects + 1, "offsets")?;
    let mut total = 0usize;
    for (object, &count) in counts.iter().enumerate() {
      offsets[object] = total;
      total += count;
    }
    offsets[num_objects] = total;

    let mut items = try_zeroed_vec::<usize>(total, "item column")?;
    let mut cursors = offsets.clone();
    for &(object, item) in &rows {
      if counts[object] == 0 {
        continue;
      }
      items[cursors[object]] = item;
      cursors[object] += 1;
    }

    let active = (0..num_objects)
      .filter(|&object| counts[object] > 0)
      .collect();

    Ok(Self {
      items,
      offsets,
      active,
      num_objects,
      universe_size,
    })
  }

  /// Maximum object id + 1 over the raw relation.
  #[inline]
  #[must_use]
  pub const fn num_objects(&self) -> usize {
    self.num_objects
  }

  /// Maximum item id + 1 over the raw relation.
  #[inline]
  #[must_use]
  pub const fn universe_size(&self) -> usize {
    self.universe_size
  }

  /// Ascending object ids that survived filtering with at least one item.
  #[inline]
  #[must_use]
  pub fn active_objects(&self) -> &[usize] {
    &self.active
  }

  /// Retained items of `object`, in relation order; empty for filtered,
  /// absent, or out-of-range ids.
  #[inline]
  #[must_use]
  pub fn items_of(&self, object: usize) -> &[usize] {
    if object >= self.num_objects {
      return &[];
    }
    &self.items[self.offsets[object]..self.offsets[object + 1]]
  }

  #[inline]
  #[must_use]
  pub fn is_active(&self, object: usize) -> bool {
    !self.items_of(object).is_empty()
  }

  /// Distinct items of `object` as a hash set.
  #[must_use]
  pub fn item_set(&self, object: usize) -> FxHashSet<usize> {
    self.items_of(object).iter().copied().collect()
  }

  /// Exact Jaccard similarity between two objects' item sets.
  ///
  /// Two empty sets score 0.0 by policy, never an error; this is the only
  /// place the pipeline could meet an undefined 0/0 ratio.
  #[must_use]
  pub fn exact_jaccard(&self, object_a: usize, object_b: usize) -> f64 {
    let set_a = self.item_set(object_a);
    self.jaccard_against(&set_a, object_b)
  }

  /// Exact Jaccard similarity against a prebuilt item set, so a verifier
  /// comparing one object to many partners builds its set once.
  pub(crate) fn jaccard_against(
    &self,
    set_a: &FxHashSet<usize>,
    object_b: usize,
  ) -> f64 {
    let set_b = self.item_set(object_b);
    let intersection =
      set_b.iter().filter(|item| set_a.contains(*item)).count();
    let union = set_a.len() + set_b.len() - intersection;
    ratio_usize(intersection, union)
  }
}

fn column_index(value: i64, row: usize, column: &str) -> Result<usize> {
  usize::try_from(value).map_err(|_| {
    Error::invalid_input(format!(
      "{column} {value} at relation row {row} is negative or out of range"
    ))
  })
}

fn checked_domain_size(max_id: usize, column: &str) -> Result<usize> {
  max_id.checked_add(1).ok_or_else(|| {
    Error::invalid_input(format!(
      "{column} {max_id} exceeds the addressable domain"
    ))
  })
}
