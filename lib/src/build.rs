use std::collections::HashSet;

use tracing::{info, warn};

use crate::errors::PhashResult;
use crate::metadata::Metadata;
use crate::pipeline::{drain, Cancellation, QueryFailure};
use crate::sequences::QueryRecord;
use crate::serialization::{Database, Record};
use crate::sketch_schemes::SketchParams;

#[derive(Debug)]
pub struct BuildReport {
    pub database: Database,
    pub failures: Vec<QueryFailure>,
    /// A source failed partway through, so `database` is incomplete.
    pub aborted: bool,
    pub cancelled: bool,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && !self.aborted && !self.cancelled
    }
}

/// Sketch every sequence from `sources` into a new database.
///
/// Records keep the order in which the sources produced them, whatever
/// order the workers finish in. Sequences that fail to sketch are left out
/// and reported in `failures`.
pub fn build_database<I>(
    sources: I,
    sketch_params: &SketchParams,
    metadata: &Metadata,
    threads: usize,
    cancel: Option<&Cancellation>,
) -> PhashResult<BuildReport>
where
    I: IntoIterator<Item = PhashResult<QueryRecord>>,
    I::IntoIter: Send,
{
    sketch_params.validate()?;
    let sketcher = sketch_params.create_sketcher();
    info!(
        k = sketch_params.kmer_length,
        sketch_size = sketch_params.sketch_size,
        threads,
        "building database"
    );

    let drained = drain(sources.into_iter(), threads, cancel, |_, record| {
        let sketch = sketcher.sketch(&record.sequence)?;
        if sketch.is_degenerate() {
            warn!(id = %record.id, "sequence has no valid k-mers");
        }
        Ok(Record::new(&record.id, metadata.get(&record.id), sketch))
    })?;

    let mut records = drained.outputs;
    records.sort_by_key(|(ix, _)| *ix);

    let mut database = Database::new(sketch_params);
    let mut seen = HashSet::new();
    for (_, record) in records {
        if !seen.insert(record.id.clone()) {
            warn!(id = %record.id, "duplicate record id");
        }
        database.push(record)?;
    }
    info!(
        records = database.len(),
        failures = drained.failures.len(),
        "database built"
    );

    Ok(BuildReport {
        database,
        failures: drained.failures,
        aborted: drained.aborted,
        cancelled: drained.cancelled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::similarity;

    fn sources(seqs: &[(&str, &str)]) -> Vec<PhashResult<QueryRecord>> {
        seqs.iter()
            .map(|(id, seq)| Ok(QueryRecord::new(id, "", seq.as_bytes())))
            .collect()
    }

    const SEQS: &[(&str, &str)] = &[
        ("p1", "ATGCTAGCTACGTAACGTCGCCAGTCGATCGATCGTAGCTGA"),
        ("p2", "CTCAGATGCTGAGCCGGTCTAGCTAGCTAGCATCGCTAGCTA"),
        ("p3", "GACTAGCTAGCTAGCTAGCGACGCTAGCTACGATCGATCGAC"),
        ("p4", "TAATTTATACGGGCCTATTAAGCATCAGCTAGCATCGCTGTA"),
    ];

    fn params() -> SketchParams {
        SketchParams {
            kmer_length: 7,
            sketch_size: 32,
            parallel_seeds: false,
        }
    }

    #[test]
    fn test_build_keeps_source_order() {
        let metadata: Metadata = vec![("p2", "Firmicutes")].into_iter().collect();
        let report = build_database(sources(SEQS), &params(), &metadata, 4, None).unwrap();
        assert!(report.is_success());
        let db = report.database;
        assert_eq!(db.kmer_length, 7);
        assert_eq!(db.sketch_size, 32);
        let ids: Vec<&str> = db.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2", "p3", "p4"]);
        assert_eq!(db.records[0].metadata(), None);
        assert_eq!(db.records[1].metadata(), Some("Firmicutes"));
    }

    #[test]
    fn test_build_matches_direct_sketching() {
        let report = build_database(sources(SEQS), &params(), &Metadata::new(), 2, None).unwrap();
        let sketcher = params().create_sketcher();
        for ((_, seq), record) in SEQS.iter().zip(&report.database.records) {
            let sketch = sketcher.sketch(seq.as_bytes()).unwrap();
            assert_eq!(record.sketch, sketch);
            assert_eq!(similarity(&record.sketch, &sketch).unwrap(), 1. - crate::distance::COLLISION_FLOOR);
        }

        let seeded = SketchParams {
            parallel_seeds: true,
            ..params()
        };
        let parallel = build_database(sources(SEQS), &seeded, &Metadata::new(), 2, None).unwrap();
        assert_eq!(
            parallel.database.records[2].sketch,
            report.database.records[2].sketch
        );
    }

    #[test]
    fn test_bad_record_is_skipped() {
        let mut seqs = SEQS.to_vec();
        seqs.insert(1, ("broken", "ACGTXACGT"));
        seqs.push(("tiny", "ACG"));
        let report = build_database(sources(&seqs), &params(), &Metadata::new(), 3, None).unwrap();
        assert!(!report.is_success());
        assert!(!report.aborted);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 1);
        assert_eq!(report.database.len(), 5);
        // too short to sketch, but still a record
        assert!(report.database.records[4].sketch.is_degenerate());
    }

    #[test]
    fn test_empty_database() {
        let report = build_database(Vec::new(), &params(), &Metadata::new(), 2, None).unwrap();
        assert!(report.is_success());
        assert!(report.database.is_empty());
    }

    #[test]
    fn test_invalid_params() {
        let bad = SketchParams {
            sketch_size: 0,
            ..params()
        };
        assert!(build_database(sources(SEQS), &bad, &Metadata::new(), 1, None).is_err());
    }
}
