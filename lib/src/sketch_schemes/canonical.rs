//! Strand-canonical k-mers over the IUPAC nucleotide alphabet.
//!
//! A k-mer and its reverse complement are both hashed with
//! [`orientation_hash`] and the one with the larger hash is kept, so a
//! sequence and its reverse complement produce the same set of k-mers.
use std::cmp::Ordering;
use std::collections::HashSet;

use crate::errors::{PhashError, PhashResult};
use crate::sketch_schemes::hashing::orientation_hash;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Nucleotide {
    A,
    C,
    G,
    T,
    M,
    K,
    R,
    Y,
    S,
    W,
    B,
    V,
    D,
    H,
    N,
}

impl Nucleotide {
    /// Case-insensitive; `None` for anything outside the IUPAC table.
    pub fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte.to_ascii_uppercase() {
            b'A' => Nucleotide::A,
            b'C' => Nucleotide::C,
            b'G' => Nucleotide::G,
            b'T' => Nucleotide::T,
            b'M' => Nucleotide::M,
            b'K' => Nucleotide::K,
            b'R' => Nucleotide::R,
            b'Y' => Nucleotide::Y,
            b'S' => Nucleotide::S,
            b'W' => Nucleotide::W,
            b'B' => Nucleotide::B,
            b'V' => Nucleotide::V,
            b'D' => Nucleotide::D,
            b'H' => Nucleotide::H,
            b'N' => Nucleotide::N,
            _ => return None,
        })
    }

    pub fn complement(self) -> Self {
        match self {
            Nucleotide::A => Nucleotide::T,
            Nucleotide::T => Nucleotide::A,
            Nucleotide::C => Nucleotide::G,
            Nucleotide::G => Nucleotide::C,
            Nucleotide::M => Nucleotide::K,
            Nucleotide::K => Nucleotide::M,
            Nucleotide::R => Nucleotide::Y,
            Nucleotide::Y => Nucleotide::R,
            Nucleotide::V => Nucleotide::B,
            Nucleotide::B => Nucleotide::V,
            Nucleotide::H => Nucleotide::D,
            Nucleotide::D => Nucleotide::H,
            // S (C/G), W (A/T) and N are their own complements
            Nucleotide::S => Nucleotide::S,
            Nucleotide::W => Nucleotide::W,
            Nucleotide::N => Nucleotide::N,
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Nucleotide::A => b'A',
            Nucleotide::C => b'C',
            Nucleotide::G => b'G',
            Nucleotide::T => b'T',
            Nucleotide::M => b'M',
            Nucleotide::K => b'K',
            Nucleotide::R => b'R',
            Nucleotide::Y => b'Y',
            Nucleotide::S => b'S',
            Nucleotide::W => b'W',
            Nucleotide::B => b'B',
            Nucleotide::V => b'V',
            Nucleotide::D => b'D',
            Nucleotide::H => b'H',
            Nucleotide::N => b'N',
        }
    }
}

/// Uppercases `seq`, failing on the first symbol outside the alphabet.
pub fn normalize(seq: &[u8]) -> PhashResult<Vec<u8>> {
    seq.iter()
        .enumerate()
        .map(|(position, &byte)| {
            Nucleotide::from_byte(byte)
                .map(Nucleotide::as_byte)
                .ok_or(PhashError::InvalidNucleotide {
                    symbol: char::from(byte),
                    position,
                })
        })
        .collect()
}

/// Reverse complement of an already normalized sequence.
pub(crate) fn complement_normalized(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .rev()
        .map(|&byte| {
            Nucleotide::from_byte(byte)
                .map(|n| n.complement().as_byte())
                .unwrap_or(byte)
        })
        .collect()
}

pub fn reverse_complement(seq: &[u8]) -> PhashResult<Vec<u8>> {
    Ok(complement_normalized(&normalize(seq)?))
}

#[inline]
fn pick_canonical<'a>(forward: &'a [u8], reverse: &'a [u8]) -> &'a [u8] {
    match orientation_hash(forward).cmp(&orientation_hash(reverse)) {
        Ordering::Greater => forward,
        Ordering::Less => reverse,
        // only reachable for palindromes or a 32-bit collision
        Ordering::Equal => forward.min(reverse),
    }
}

/// Canonical form of a single k-mer, or `None` if it contains an `N`.
pub fn canonical(kmer: &[u8]) -> PhashResult<Option<Vec<u8>>> {
    let forward = normalize(kmer)?;
    if forward.contains(&b'N') {
        return Ok(None);
    }
    let reverse = complement_normalized(&forward);
    Ok(Some(pick_canonical(&forward, &reverse).to_vec()))
}

/// Iterates over the canonical k-mers of a normalized sequence, given the
/// reverse complement of the whole sequence. Windows containing `N` are
/// skipped.
pub struct CanonicalKmers<'a> {
    seq: &'a [u8],
    rc: &'a [u8],
    k: usize,
    pos: usize,
}

impl<'a> CanonicalKmers<'a> {
    pub fn new(seq: &'a [u8], rc: &'a [u8], k: usize) -> Self {
        debug_assert_eq!(seq.len(), rc.len());
        CanonicalKmers { seq, rc, k, pos: 0 }
    }
}

impl<'a> Iterator for CanonicalKmers<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let len = self.seq.len();
        while self.k > 0 && self.pos + self.k <= len {
            let i = self.pos;
            self.pos += 1;

            let forward = &self.seq[i..i + self.k];
            if forward.contains(&b'N') {
                continue;
            }
            let reverse = &self.rc[len - i - self.k..len - i];
            return Some(pick_canonical(forward, reverse));
        }
        None
    }
}

/// The deduplicated canonical k-mer set of `seq`.
pub fn canonical_kmer_set(seq: &[u8], k: usize) -> PhashResult<HashSet<Vec<u8>>> {
    let norm_seq = normalize(seq)?;
    let rc = complement_normalized(&norm_seq);
    Ok(CanonicalKmers::new(&norm_seq, &rc, k)
        .map(|kmer| kmer.to_vec())
        .collect())
}
