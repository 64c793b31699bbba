//! Pairwise collision audit over all placed cargo.
//!
//! Re-run after every placement, move or deletion. The audit itself is pure:
//! it only reports ids. The caller owns the highlighting side effect and must
//! fully restore every item's original appearance before re-applying the
//! collision color, so no stale highlight from a previous audit survives.

use std::collections::BTreeSet;

use crate::geometry::intersects;
use crate::model::CargoItem;

/// Finds all items that participate in at least one colliding pair.
///
/// O(n²) unordered pair checks with an AABB broad phase in front of the
/// exact per-shape test. Item counts in this domain are small (tens to low
/// hundreds), so no spatial partitioning is needed; the prefilter is a pure
/// optimization with no behavioral difference.
///
/// # Returns
/// The set of colliding item ids, in ascending order. Symmetric (both
/// partners of a pair are reported) and idempotent for an unchanged input.
pub fn audit_collisions(items: &[CargoItem]) -> BTreeSet<u64> {
    let mut colliding = BTreeSet::new();
    let aabbs: Vec<_> = items.iter().map(|item| item.aabb()).collect();

    for i in 0..items.len() {
        for j in (i + 1)..items.len() {
            if !aabbs[i].intersects(&aabbs[j]) {
                continue;
            }
            if intersects(&items[i], &items[j]) {
                colliding.insert(items[i].id);
                colliding.insert(items[j].id);
            }
        }
    }
    colliding
}
