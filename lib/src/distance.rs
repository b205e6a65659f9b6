use serde::{Deserialize, Serialize};

use crate::errors::{PhashError, PhashResult};
use crate::sketch_schemes::Sketch;

/// Expected rate at which two independent 64-bit values collide,
/// `2^-64 / (1 - 2^-64)`, subtracted from every raw estimate.
pub const COLLISION_FLOOR: f64 = 5.421_010_862_427_522e-20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SketchDistance {
    pub similarity: f64,
    #[serde(rename = "matchingHashes")]
    pub matching_hashes: u64,
    #[serde(rename = "totalHashes")]
    pub total_hashes: u64,
}

/// Counts the slots where two sketches hold the same minimum.
///
/// Both sketches must have been built with the same seeds, i.e. they must
/// have the same length. A degenerate sketch matches nothing, including
/// another degenerate sketch.
pub fn raw_distance(query: &Sketch, reference: &Sketch) -> PhashResult<(u64, u64)> {
    if query.len() != reference.len() {
        return Err(PhashError::SizeMismatch {
            expected: reference.len(),
            found: query.len(),
        });
    }
    if query.is_degenerate() || reference.is_degenerate() {
        return Ok((0, query.len() as u64));
    }
    let matching = query
        .hashes
        .iter()
        .zip(&reference.hashes)
        .filter(|(q, r)| q == r)
        .count();
    Ok((matching as u64, query.len() as u64))
}

/// Estimates the Jaccard index of the k-mer sets behind two sketches.
///
/// Each slot matches with probability equal to the Jaccard index, so the
/// fraction of matching slots is an unbiased estimate; the chance of two
/// unrelated minima colliding is then subtracted. The result can be
/// (very slightly) negative.
pub fn distance(query: &Sketch, reference: &Sketch) -> PhashResult<SketchDistance> {
    let (matching_hashes, total_hashes) = raw_distance(query, reference)?;
    let raw = if total_hashes == 0 {
        0.
    } else {
        matching_hashes as f64 / total_hashes as f64
    };
    Ok(SketchDistance {
        similarity: raw - COLLISION_FLOOR,
        matching_hashes,
        total_hashes,
    })
}

pub fn similarity(query: &Sketch, reference: &Sketch) -> PhashResult<f64> {
    Ok(distance(query, reference)?.similarity)
}
