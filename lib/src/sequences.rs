use std::io::Read;
use std::path::Path;

use needletail::errors::{ParseError, ParseErrorKind};
use needletail::{parse_fastx_file, parse_fastx_reader, FastxReader};

use crate::errors::PhashResult;

/// A sequence pulled from a FASTA/FASTQ source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryRecord {
    pub id: String,
    pub description: String,
    pub sequence: Vec<u8>,
}

impl QueryRecord {
    pub fn new(id: &str, description: &str, sequence: &[u8]) -> Self {
        QueryRecord {
            id: id.to_string(),
            description: description.to_string(),
            sequence: sequence.to_vec(),
        }
    }

    /// Split a FASTA/FASTQ header line into the id (up to the first
    /// whitespace) and the description (everything after it).
    pub fn from_header(header: &[u8], sequence: Vec<u8>) -> Self {
        let header = String::from_utf8_lossy(header);
        let header = header.trim();
        let (id, description) = match header.find(char::is_whitespace) {
            Some(ix) => (&header[..ix], header[ix..].trim_start()),
            None => (header, ""),
        };
        QueryRecord {
            id: id.to_string(),
            description: description.to_string(),
            sequence,
        }
    }
}

/// A query source over a FASTA/FASTQ stream.
///
/// `None` signals the end of the input; `Some(Err(_))` is a read failure
/// that leaves the stream in an unknown state. An empty input is a source
/// with no records.
pub struct FastxQueries<'a> {
    reader: Option<Box<dyn FastxReader + 'a>>,
}

// needletail refuses to open an empty stream; that is just zero records here
fn empty_as_none<'a>(
    reader: Result<Box<dyn FastxReader + 'a>, ParseError>,
) -> PhashResult<Option<Box<dyn FastxReader + 'a>>> {
    match reader {
        Ok(reader) => Ok(Some(reader)),
        Err(e) if matches!(e.kind, ParseErrorKind::EmptyFile) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl<'a> FastxQueries<'a> {
    pub fn from_reader<R: Read + Send + 'a>(reader: R) -> PhashResult<Self> {
        Ok(FastxQueries {
            reader: empty_as_none(parse_fastx_reader(reader))?,
        })
    }
}

impl FastxQueries<'static> {
    /// Open a (possibly gzip compressed) FASTA/FASTQ file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> PhashResult<Self> {
        Ok(FastxQueries {
            reader: empty_as_none(parse_fastx_file(path))?,
        })
    }
}

impl Iterator for FastxQueries<'_> {
    type Item = PhashResult<QueryRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.reader.as_mut()?.next()? {
            Ok(record) => record,
            Err(e) => return Some(Err(e.into())),
        };
        Some(Ok(QueryRecord::from_header(
            record.id(),
            record.seq().into_owned(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_from_header() {
        let rec = QueryRecord::from_header(b"NZ_CP000001.1 Escherichia coli plasmid", b"ACGT".to_vec());
        assert_eq!(rec.id, "NZ_CP000001.1");
        assert_eq!(rec.description, "Escherichia coli plasmid");

        let rec = QueryRecord::from_header(b"contig_1", Vec::new());
        assert_eq!(rec.id, "contig_1");
        assert_eq!(rec.description, "");
    }

    #[test]
    fn test_fasta_source() {
        let fasta = ">seq1 first one\nACGTACGT\nACGT\n>seq2\nTTTTGGGG\n";
        let queries = FastxQueries::from_reader(Cursor::new(fasta)).unwrap();
        let records: Vec<QueryRecord> = queries.collect::<PhashResult<_>>().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "seq1");
        assert_eq!(records[0].description, "first one");
        assert_eq!(records[0].sequence, b"ACGTACGTACGT");
        assert_eq!(records[1].id, "seq2");
        assert_eq!(records[1].sequence, b"TTTTGGGG");
    }

    #[test]
    fn test_fastq_source() {
        let fastq = "@read1\nACGTN\n+\nIIIII\n";
        let queries = FastxQueries::from_reader(Cursor::new(fastq)).unwrap();
        let records: Vec<QueryRecord> = queries.collect::<PhashResult<_>>().unwrap();
        assert_eq!(records, vec![QueryRecord::new("read1", "", b"ACGTN")]);
    }

    #[test]
    fn test_empty_input_has_no_records() {
        for input in &["", "\n"] {
            let mut queries = FastxQueries::from_reader(Cursor::new(*input)).unwrap();
            assert!(queries.next().is_none());
            assert!(queries.next().is_none());
        }

        let empty = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(FastxQueries::from_path(empty.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_unreadable_input() {
        assert!(FastxQueries::from_path("tests/does/not/exist.fa").is_err());
        assert!(FastxQueries::from_reader(Cursor::new("not a fasta file")).is_err());
    }
}
