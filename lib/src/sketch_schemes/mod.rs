pub mod canonical;
mod hashing;
pub mod minhash;

use serde::{Deserialize, Serialize};

use crate::bail;
use crate::errors::{PhashError, PhashResult};
pub use hashing::{hash_f, orientation_hash, ItemHash};
pub use minhash::MinHashSketcher;

/// One minimum hash per seed; slot `i` was produced with seed `i`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Hash, Serialize)]
#[serde(transparent)]
pub struct Sketch {
    pub hashes: Vec<ItemHash>,
}

impl Sketch {
    pub fn new(hashes: Vec<ItemHash>) -> Self {
        Sketch { hashes }
    }

    /// The sketch of a sequence with no valid k-mers.
    pub fn degenerate(size: usize) -> Self {
        Sketch {
            hashes: vec![ItemHash::MAX; size],
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.hashes.iter().all(|h| *h == ItemHash::MAX)
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

impl From<Vec<ItemHash>> for Sketch {
    fn from(hashes: Vec<ItemHash>) -> Self {
        Sketch::new(hashes)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SketchParams {
    pub kmer_length: u8,
    pub sketch_size: usize,
    /// Sub-parallelize each sketch across its seeds.
    pub parallel_seeds: bool,
}

impl Default for SketchParams {
    fn default() -> Self {
        SketchParams {
            kmer_length: 16,
            sketch_size: 512,
            parallel_seeds: false,
        }
    }
}

impl SketchParams {
    pub fn create_sketcher(&self) -> MinHashSketcher {
        MinHashSketcher::new(self.sketch_size, self.kmer_length)
            .with_parallel_seeds(self.parallel_seeds)
    }

    pub fn k(&self) -> u8 {
        self.kmer_length
    }

    pub fn validate(&self) -> PhashResult<()> {
        if self.kmer_length == 0 {
            bail!("k-mer length must be at least 1");
        }
        if self.sketch_size == 0 {
            bail!("sketch size must be at least 1");
        }
        Ok(())
    }

    /// Return any sketch parameter difference that would make comparisons
    /// between sketches generated by these parameter sets not work.
    pub fn check_compatibility(&self, other: &SketchParams) -> Option<(&str, String, String)> {
        if self.k() != other.k() {
            return Some(("k", self.k().to_string(), other.k().to_string()));
        }
        if self.sketch_size != other.sketch_size {
            return Some((
                "sketch size",
                self.sketch_size.to_string(),
                other.sketch_size.to_string(),
            ));
        }
        None
    }

    /// Like `check_compatibility`, but as the typed error the query
    /// pipeline reports; `self` is the database side.
    pub fn ensure_compatible(&self, query: &SketchParams) -> PhashResult<()> {
        if self.k() != query.k() {
            return Err(PhashError::KmerMismatch {
                expected: self.k(),
                found: query.k(),
            });
        }
        if self.sketch_size != query.sketch_size {
            return Err(PhashError::SizeMismatch {
                expected: self.sketch_size,
                found: query.sketch_size,
            });
        }
        Ok(())
    }
}
