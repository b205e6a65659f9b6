use std::collections::HashSet;

use rayon::prelude::*;

use crate::errors::PhashResult;
use crate::sketch_schemes::canonical::{complement_normalized, normalize, CanonicalKmers};
use crate::sketch_schemes::hashing::hash_f;
use crate::sketch_schemes::{ItemHash, Sketch, SketchParams};

/// Builds fixed-size sketches by running one independent minimum scan per
/// hash seed over the canonical k-mer set of a sequence.
#[derive(Clone, Debug)]
pub struct MinHashSketcher {
    kmer_length: u8,
    size: usize,
    parallel_seeds: bool,
}

impl MinHashSketcher {
    pub fn new(size: usize, kmer_length: u8) -> Self {
        MinHashSketcher {
            kmer_length,
            size,
            parallel_seeds: false,
        }
    }

    /// Fill the seed slots with rayon. Parallelism is bounded by the pool
    /// the caller is running in.
    pub fn with_parallel_seeds(mut self, parallel_seeds: bool) -> Self {
        self.parallel_seeds = parallel_seeds;
        self
    }

    /// Sketch a raw (possibly lowercase) nucleotide sequence.
    ///
    /// Sequences without a single valid k-mer (shorter than k, or all `N`)
    /// get the degenerate all-`u64::MAX` sketch.
    pub fn sketch(&self, seq: &[u8]) -> PhashResult<Sketch> {
        let norm_seq = normalize(seq)?;
        let rc = complement_normalized(&norm_seq);
        let kmers: HashSet<&[u8]> =
            CanonicalKmers::new(&norm_seq, &rc, usize::from(self.kmer_length)).collect();
        let kmers: Vec<&[u8]> = kmers.into_iter().collect();
        Ok(self.sketch_kmers(&kmers))
    }

    /// Sketch an already deduplicated set of canonical k-mers.
    pub fn sketch_kmers<K: AsRef<[u8]> + Sync>(&self, kmers: &[K]) -> Sketch {
        if kmers.is_empty() {
            return Sketch::degenerate(self.size);
        }

        let mut hashes = vec![ItemHash::MAX; self.size];
        if self.parallel_seeds {
            hashes
                .par_iter_mut()
                .enumerate()
                .for_each(|(seed, slot)| *slot = min_hash(kmers, seed as u64));
        } else {
            for (seed, slot) in hashes.iter_mut().enumerate() {
                *slot = min_hash(kmers, seed as u64);
            }
        }
        Sketch::new(hashes)
    }

    pub fn parameters(&self) -> SketchParams {
        SketchParams {
            kmer_length: self.kmer_length,
            sketch_size: self.size,
            parallel_seeds: self.parallel_seeds,
        }
    }
}

#[inline]
fn min_hash<K: AsRef<[u8]>>(kmers: &[K], seed: u64) -> ItemHash {
    kmers
        .iter()
        .map(|kmer| hash_f(kmer.as_ref(), seed))
        .min()
        .unwrap_or(ItemHash::MAX)
}
