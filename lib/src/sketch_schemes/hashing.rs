use xxhash_rust::xxh32::xxh32;
use xxhash_rust::xxh64::xxh64;

// The individual values stored in a sketch
pub type ItemHash = u64;

/// Hash used only to pick the canonical orientation of a k-mer.
#[inline]
pub fn orientation_hash(kmer: &[u8]) -> u32 {
    xxh32(kmer, 0)
}

#[inline]
pub fn hash_f(item: &[u8], seed: u64) -> ItemHash {
    xxh64(item, seed)
}
