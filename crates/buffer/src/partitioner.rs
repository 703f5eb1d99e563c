//! Stream routing for records.

use std::hash::{Hash, Hasher};

/// Computes the shard a recording is routed to.
///
/// All records of one recording land in the same stream, so their relative
/// arrival order survives batching.
pub fn shard_for(recording_id: &str, shards: usize) -> usize {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    recording_id.hash(&mut hasher);
    let hash = hasher.finish();
    (hash % shards.max(1) as u64) as usize
}

/// Name of a stream: `{base}-{shard}`.
pub fn stream_name(base: &str, shard: usize) -> String {
    format!("{}-{}", base, shard)
}
