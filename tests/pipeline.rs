//! End-to-end runs over the public API.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use ruiji::{MinHashLSH, MinHashLshConfig, Signatures};
use std::collections::HashSet;

const BASE_OBJECTS: i64 = 60;
const UNIVERSE: i64 = 300;
const CLONES: [(i64, i64); 3] = [(60, 0), (61, 1), (62, 2)];

/// Sixty random sets of 10 to 20 items each, plus three exact clones of the
/// first three objects.
fn planted_relation(seed: u64) -> Vec<(i64, i64)> {
  let mut rng = ChaCha8Rng::seed_from_u64(seed);
  let mut relation = Vec::new();
  let mut sets: Vec<Vec<i64>> = Vec::new();

  for object in 0..BASE_OBJECTS {
    let size = rng.random_range(10..=20);
    let mut items = HashSet::new();
    while items.len() < size {
      items.insert(rng.random_range(0..UNIVERSE));
    }
    let mut items: Vec<i64> = items.into_iter().collect();
    items.sort_unstable();
    for &item in &items {
      relation.push((object, item));
    }
    sets.push(items);
  }
  for (clone, source) in CLONES {
    for &item in &sets[source as usize] {
      relation.push((clone, item));
    }
  }
  relation
}

#[test]
fn reported_pairs_score_exactly_and_clones_are_always_found() {
  let relation = planted_relation(2024);
  let config = MinHashLshConfig {
    threshold: 0.5,
    num_bands: 16,
    num_rows: 2,
    random_state: Some(31),
    ..MinHashLshConfig::default()
  };

  let mut model = MinHashLSH::new(&relation, config).unwrap();
  model.minhash().unwrap();
  let pairs = model.lsh().unwrap();

  let mut reported = HashSet::new();
  for pair in &pairs {
    assert!(pair.object_a < pair.object_b);
    assert!(pair.similarity >= 0.5);
    assert_eq!(
      pair.similarity,
      model.exact_jaccard(pair.object_a, pair.object_b)
    );
    assert!(reported.insert((pair.object_a, pair.object_b)));
  }

  // Clone columns are identical, so they collide in every band no matter
  // which seed drove the permutations.
  for (clone, source) in CLONES {
    let key = (source as usize, clone as usize);
    assert!(reported.contains(&key), "clone pair {key:?} was not reported");
    assert_eq!(model.exact_jaccard(key.0, key.1), 1.0);
  }
}

#[test]
fn banding_recall_matches_the_collision_probability() {
  // One planted pair at exact similarity 8/16 = 0.5. With two rows per band
  // a band collides with probability 0.25, so three bands find the pair
  // with probability 1 - 0.75^3 = 0.578125. The threshold 0.3 sits below
  // 2/6, the lowest estimate a band collision can come with, so neither
  // verification stage rejects a colliding pair. Over 400 trials the
  // tolerance below is past five standard deviations.
  let mut relation: Vec<(i64, i64)> = Vec::new();
  for item in 0..12 {
    relation.push((0, item));
  }
  for item in 0..8 {
    relation.push((1, item));
  }
  for item in 100..104 {
    relation.push((1, item));
  }

  let trials = 400u64;
  let mut found = 0u32;
  for seed in 0..trials {
    let config = MinHashLshConfig {
      threshold: 0.3,
      num_bands: 3,
      num_rows: 2,
      random_state: Some(seed),
      ..MinHashLshConfig::default()
    };
    let mut model = MinHashLSH::new(&relation, config).unwrap();
    model.minhash().unwrap();
    let pairs = model.lsh().unwrap();

    assert!(pairs.len() <= 1);
    if let Some(pair) = pairs.first() {
      assert_eq!((pair.object_a, pair.object_b), (0, 1));
      assert_eq!(pair.similarity, 0.5);
      found += 1;
    }
  }

  let recall = f64::from(found) / trials as f64;
  assert!(
    (recall - 0.578125).abs() < 0.13,
    "observed recall {recall} is too far from 0.578125"
  );
}

#[test]
fn serialized_signatures_reproduce_the_run() {
  let relation = planted_relation(7);
  let config = MinHashLshConfig {
    threshold: 0.5,
    num_bands: 8,
    num_rows: 3,
    random_state: Some(12),
    ..MinHashLshConfig::default()
  };

  let mut source = MinHashLSH::new(&relation, config).unwrap();
  source.minhash().unwrap();
  let expected = source.lsh().unwrap();

  let bytes = source.signatures().unwrap().to_bytes().unwrap();
  let restored = Signatures::from_bytes(&bytes).unwrap();

  let mut target = MinHashLSH::new(&relation, config).unwrap();
  let pairs = target.lsh_with_signatures(restored).unwrap();

  assert_eq!(pairs, expected);
}
