//! # Clustering Module
//!
//! Groups item identifiers into "same or near-same content" sets, given
//! either fixed-length embeddings compared by cosine similarity or an opaque
//! pairwise distance function.
//!
//! ## Algorithm
//! Greedy single-seed absorption: walk items in input order; an unvisited
//! item seeds a group, then one forward pass absorbs every remaining
//! unvisited item that meets the threshold *against the seed*. Absorbed
//! items are never compared against each other, so this is not transitive
//! closure: if A~B and B~C but not A~C, whichever of A and B seeds first
//! decides where C lands. That order dependence is the accepted price for a
//! single pass per seed.
//!
//! ## Scale
//! Above [`BRUTE_FORCE_CUTOFF`] items, a random-projection pre-filter
//! buckets items by a k-bit sign hash and absorption runs inside each
//! bucket only. Pairs hashing into different buckets are never compared -
//! recall traded for throughput.

use rand::Rng;
use std::collections::HashMap;

/// Input sizes up to this run the exact pairwise comparison
pub const BRUTE_FORCE_CUTOFF: usize = 200;

/// Most projection bits used for bucketing
const MAX_PROJECTIONS: usize = 8;

/// Cosine similarity of two embeddings.
///
/// Empty, length-mismatched, or zero-norm inputs yield 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denominator = norm_a.sqrt() * norm_b.sqrt();
    if denominator <= 0.0 {
        return 0.0;
    }
    dot / denominator
}

/// Group embeddings whose cosine similarity to a seed meets `threshold`.
///
/// Exact O(n^2) comparison; only groups of two or more are returned, seed
/// first.
pub fn group_by_similarity(items: &[(String, Vec<f32>)], threshold: f32) -> Vec<Vec<String>> {
    let mut visited = vec![false; items.len()];
    let mut groups = Vec::new();

    for i in 0..items.len() {
        if visited[i] {
            continue;
        }
        let mut group = vec![items[i].0.clone()];
        visited[i] = true;

        for j in (i + 1)..items.len() {
            if visited[j] {
                continue;
            }
            let similarity = cosine_similarity(&items[i].1, &items[j].1);
            if similarity >= threshold {
                group.push(items[j].0.clone());
                visited[j] = true;
            }
        }

        if group.len() > 1 {
            groups.push(group);
        }
    }

    groups
}

/// Group embeddings at scale using a random-projection bucket pre-filter.
///
/// Small inputs delegate to [`group_by_similarity`]. Larger inputs are
/// bucketed by a `min(8, dim)`-bit hash (bit i = sign of the dot product
/// with random unit projection i) and absorbed within buckets only.
pub fn group_by_similarity_bucketed(
    items: &[(String, Vec<f32>)],
    threshold: f32,
) -> Vec<Vec<String>> {
    let Some(dim) = items.first().map(|(_, e)| e.len()) else {
        return Vec::new();
    };
    if items.len() < 2 || dim == 0 {
        return Vec::new();
    }

    if items.len() < BRUTE_FORCE_CUTOFF {
        return group_by_similarity(items, threshold);
    }

    let num_projections = MAX_PROJECTIONS.min(dim);
    let mut rng = rand::thread_rng();
    let projections: Vec<Vec<f32>> = (0..num_projections)
        .map(|_| {
            let mut projection: Vec<f32> =
                (0..dim).map(|_| rng.gen_range(-1.0f32..1.0)).collect();
            let norm = projection.iter().map(|v| v * v).sum::<f32>().sqrt();
            if norm > 0.0 {
                for v in &mut projection {
                    *v /= norm;
                }
            }
            projection
        })
        .collect();

    let hash_key = |embedding: &[f32]| -> usize {
        let mut key = 0usize;
        for (i, projection) in projections.iter().enumerate() {
            let dot: f32 = embedding
                .iter()
                .zip(projection.iter())
                .map(|(a, b)| a * b)
                .sum();
            if dot >= 0.0 {
                key |= 1 << i;
            }
        }
        key
    };

    let mut buckets: HashMap<usize, Vec<usize>> = HashMap::new();
    for (i, (_, embedding)) in items.iter().enumerate() {
        buckets.entry(hash_key(embedding)).or_default().push(i);
    }

    let mut visited = vec![false; items.len()];
    let mut groups = Vec::new();

    for indices in buckets.values() {
        for &i in indices {
            if visited[i] {
                continue;
            }
            let mut group = vec![items[i].0.clone()];
            visited[i] = true;

            for &j in indices {
                if visited[j] || i == j {
                    continue;
                }
                let similarity = cosine_similarity(&items[i].1, &items[j].1);
                if similarity >= threshold {
                    group.push(items[j].0.clone());
                    visited[j] = true;
                }
            }

            if group.len() > 1 {
                groups.push(group);
            }
        }
    }

    groups
}

/// Group opaque descriptors whose distance to a seed is at most
/// `max_distance`.
///
/// Same absorption algorithm as the similarity mode, no bucketing. A pair
/// whose distance computation fails is simply not absorbed.
pub fn group_by_distance<T, E, F>(
    items: &[(String, T)],
    max_distance: f32,
    distance: F,
) -> Vec<Vec<String>>
where
    F: Fn(&T, &T) -> Result<f32, E>,
{
    let mut visited = vec![false; items.len()];
    let mut groups = Vec::new();

    for i in 0..items.len() {
        if visited[i] {
            continue;
        }
        let mut group = vec![items[i].0.clone()];
        visited[i] = true;

        for j in (i + 1)..items.len() {
            if visited[j] {
                continue;
            }
            match distance(&items[i].1, &items[j].1) {
                Ok(d) if d <= max_distance => {
                    group.push(items[j].0.clone());
                    visited[j] = true;
                }
                _ => {}
            }
        }

        if group.len() > 1 {
            groups.push(group);
        }
    }

    groups
}
