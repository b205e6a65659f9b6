//! Writers for the results of a search/identify run.
use std::io::Write;

use serde::Serialize;

use crate::errors::PhashResult;
use crate::search::{IdentifiedSequence, SearchHit};

pub const FASTA_LINE_WIDTH: usize = 60;

pub const HIT_TSV_HEADER: &str = "AccId\tSimilarPlasmidAccId\tSimilarity";

/// One line per (query, best id) pair; a query tied between several
/// references gets several lines and a query with no hit gets none.
pub fn write_hits_tsv(file: &mut dyn Write, hits: &[SearchHit]) -> PhashResult<()> {
    writeln!(file, "{}", HIT_TSV_HEADER)?;
    for hit in hits {
        for best_id in &hit.best_ids {
            writeln!(file, "{}\t{}\t{:.6}", hit.query_id, best_id, hit.score)?;
        }
    }
    Ok(())
}

pub fn write_fasta_records(file: &mut dyn Write, records: &[IdentifiedSequence]) -> PhashResult<()> {
    for record in records {
        if record.description.is_empty() {
            writeln!(file, ">{}", record.id)?;
        } else {
            writeln!(file, ">{} {}", record.id, record.description)?;
        }
        for line in record.sequence.chunks(FASTA_LINE_WIDTH) {
            file.write_all(line)?;
            file.write_all(b"\n")?;
        }
    }
    Ok(())
}

pub fn write_json<T: Serialize + ?Sized>(file: &mut dyn Write, value: &T) -> PhashResult<()> {
    serde_json::to_writer_pretty(&mut *file, value)?;
    writeln!(file)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(query: &str, best: &[&str], score: f64) -> SearchHit {
        SearchHit {
            query_id: query.to_string(),
            query_length: 100,
            best_ids: best.iter().map(|s| s.to_string()).collect(),
            best_metadata: vec![String::new(); best.len()],
            score,
        }
    }

    #[test]
    fn test_hits_tsv() {
        let hits = vec![
            hit("q1", &["r1"], 0.5),
            hit("q2", &["r1", "r2"], 0.25),
            hit("q3", &[], 0.),
        ];
        let mut out = Vec::new();
        write_hits_tsv(&mut out, &hits).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "AccId\tSimilarPlasmidAccId\tSimilarity\n\
             q1\tr1\t0.500000\n\
             q2\tr1\t0.250000\n\
             q2\tr2\t0.250000\n"
        );
    }

    #[test]
    fn test_fasta_wrapping() {
        let records = vec![
            IdentifiedSequence {
                id: "q1".to_string(),
                description: "Similar to r1 (0.500000)".to_string(),
                sequence: vec![b'A'; 130],
            },
            IdentifiedSequence {
                id: "q2".to_string(),
                description: String::new(),
                sequence: b"ACGT".to_vec(),
            },
        ];
        let mut out = Vec::new();
        write_fasta_records(&mut out, &records).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], ">q1 Similar to r1 (0.500000)");
        assert_eq!(lines[1].len(), 60);
        assert_eq!(lines[2].len(), 60);
        assert_eq!(lines[3].len(), 10);
        assert_eq!(lines[4], ">q2");
        assert_eq!(lines[5], "ACGT");
    }

    #[test]
    fn test_json() {
        let mut out = Vec::new();
        write_json(&mut out, &[hit("q1", &["r1"], 0.5)]).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value[0]["queryId"], "q1");
        assert_eq!(value[0]["bestIds"][0], "r1");
    }
}
