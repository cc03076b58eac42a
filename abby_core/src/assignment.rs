//! Weighted-random variant selection with sticky persistence.
//!
//! A returning visitor must never flip variants while a test runs unchanged:
//! the first evaluation draws a variant and persists it through the
//! [`StorageAdapter`]; every later evaluation returns the stored variant as
//! long as it is still a member of the current variant set.
use rand::Rng;

use crate::storage::{SetOptions, StorageAdapter};

/// Storage key prefix for A/B test assignments.
pub const TEST_STORAGE_PREFIX: &str = "__abby__ab";
/// Storage key prefix for sticky flag decisions.
pub const FLAG_STORAGE_PREFIX: &str = "__abby__ff";

/// Storage key for a test assignment: `<prefix>_<projectId>_<testName>`.
pub fn test_storage_key(project_id: &str, test_name: &str) -> String {
    format!("{TEST_STORAGE_PREFIX}_{project_id}_{test_name}")
}

/// Storage key for a sticky flag value: `<prefix>_<projectId>_<flagName>`.
pub fn flag_storage_key(project_id: &str, flag_name: &str) -> String {
    format!("{FLAG_STORAGE_PREFIX}_{project_id}_{flag_name}")
}

/// Assign a visitor to a test variant.
///
/// Reuses a stored assignment when its variant is still part of `variants`;
/// otherwise draws a fresh variant from the weight distribution, persists it,
/// and returns it. Invalid or missing weights silently fall back to a uniform
/// distribution — never an error. Returns `None` only for an empty variant
/// set.
///
/// Randomness comes from [`rand::thread_rng`], a cryptographically sound,
/// OS-reseeded generator.
pub fn assign(
    storage: &dyn StorageAdapter,
    project_id: &str,
    test_name: &str,
    variants: &[String],
    weights: &[f64],
) -> Option<String> {
    assign_with_rng(
        storage,
        project_id,
        test_name,
        variants,
        weights,
        &mut rand::thread_rng(),
    )
}

/// [`assign`] with an injected random source. This is the seam for
/// deterministic tests; production callers use [`assign`].
pub fn assign_with_rng(
    storage: &dyn StorageAdapter,
    project_id: &str,
    test_name: &str,
    variants: &[String],
    weights: &[f64],
    rng: &mut impl Rng,
) -> Option<String> {
    if variants.is_empty() {
        return None;
    }

    let key = test_storage_key(project_id, test_name);

    // Sticky reuse. A stored variant that is no longer part of the current
    // set (test reconfigured) fails the membership check and is overwritten
    // by a fresh draw below.
    if let Some(stored) = storage.get(project_id, &key) {
        if variants.iter().any(|v| v == &stored) {
            return Some(stored);
        }
        log::debug!(target: "abby",
            "stored variant {stored:?} no longer in variant set for test {test_name:?}, redrawing");
    }

    let weights = validated_weights(variants.len(), weights);
    let selected = draw(variants, &weights, rng.gen::<f64>());

    storage.set(project_id, &key, selected, SetOptions::default());
    Some(selected.to_owned())
}

/// Delete a visitor's stored assignment for a test.
pub fn reset(storage: &dyn StorageAdapter, project_id: &str, test_name: &str) {
    storage.remove(project_id, &test_storage_key(project_id, test_name));
}

/// Read a sticky flag decision, if one is stored.
pub fn stored_flag_value(
    storage: &dyn StorageAdapter,
    project_id: &str,
    flag_name: &str,
) -> Option<String> {
    storage.get(project_id, &flag_storage_key(project_id, flag_name))
}

/// Persist an evaluated flag decision for sticky reuse.
pub fn store_flag_value(
    storage: &dyn StorageAdapter,
    project_id: &str,
    flag_name: &str,
    value: &str,
) {
    storage.set(
        project_id,
        &flag_storage_key(project_id, flag_name),
        value,
        SetOptions::default(),
    );
}

/// Validate a weight vector against the variant count, silently substituting
/// a uniform distribution when it's unusable.
fn validated_weights(variant_count: usize, weights: &[f64]) -> Vec<f64> {
    let usable = weights.len() == variant_count
        && weights.iter().all(|w| w.is_finite() && *w >= 0.0)
        && weights.iter().sum::<f64>() > 0.0;
    if usable {
        weights.to_vec()
    } else {
        vec![1.0 / variant_count as f64; variant_count]
    }
}

/// Walk the cumulative distribution and pick the first variant whose
/// cumulative sum exceeds `r ∈ [0,1)`. Weights are relative proportions, so
/// `r` is scaled by their total.
fn draw<'a>(variants: &'a [String], weights: &[f64], r: f64) -> &'a str {
    let total: f64 = weights.iter().sum();
    let target = r * total;
    let mut cumulative = 0.0;
    for (variant, weight) in variants.iter().zip(weights) {
        cumulative += weight;
        if target < cumulative {
            return variant;
        }
    }
    // Only reachable through float rounding at the upper edge.
    variants
        .last()
        .map(|v| v.as_str())
        .expect("variants checked non-empty")
}
