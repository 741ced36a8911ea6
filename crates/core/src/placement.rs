//! Deterministic replica placement.

/// Choose the storage nodes for a chunk ordinal.
///
/// Round-robin: the primary is `index % |pool|` and replicas follow on the
/// next nodes, wrapping. The same ordinal always maps to the same node
/// sequence for a stable pool. A non-positive replica count falls back to
/// 2; a pool no larger than the replica count is returned whole, in pool
/// order.
pub fn choose_nodes(index: usize, pool: &[String], replicas: usize) -> Vec<String> {
    let replicas = if replicas == 0 { 2 } else { replicas };

    if pool.len() <= replicas {
        return pool.to_vec();
    }

    let primary = index % pool.len();
    (0..replicas)
        .map(|k| pool[(primary + k) % pool.len()].clone())
        .collect()
}
