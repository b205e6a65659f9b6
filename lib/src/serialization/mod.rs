use std::io::{Read, Write};

use bincode::Options;
use serde::{Deserialize, Serialize};

use crate::errors::{PhashError, PhashResult};
use crate::sketch_schemes::{Sketch, SketchParams};

pub const PHASH_EXT: &str = ".phash";

/// Leading bytes of every database blob.
pub const MAGIC: &[u8; 4] = b"PHSH";
pub const FORMAT_VERSION: u16 = 1;

const HEADER_LEN: usize = 6;

/// One reference sequence's sketch plus its (possibly empty) metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub metadata: String,
    pub sketch: Sketch,
}

impl Record {
    pub fn new(id: &str, metadata: Option<&str>, sketch: Sketch) -> Self {
        Record {
            id: id.to_string(),
            metadata: metadata.unwrap_or_default().to_string(),
            sketch,
        }
    }

    pub fn metadata(&self) -> Option<&str> {
        if self.metadata.is_empty() {
            None
        } else {
            Some(&self.metadata)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Database {
    pub kmer_length: u8,
    pub sketch_size: usize,
    pub records: Vec<Record>,
}

impl Database {
    pub fn new(params: &SketchParams) -> Self {
        Database {
            kmer_length: params.kmer_length,
            sketch_size: params.sketch_size,
            records: Vec::new(),
        }
    }

    /// Parameters a query must be sketched with to be compared against
    /// this database.
    pub fn sketch_params(&self) -> SketchParams {
        SketchParams {
            kmer_length: self.kmer_length,
            sketch_size: self.sketch_size,
            parallel_seeds: false,
        }
    }

    pub fn push(&mut self, record: Record) -> PhashResult<()> {
        if record.sketch.len() != self.sketch_size {
            return Err(PhashError::SizeMismatch {
                expected: self.sketch_size,
                found: record.sketch.len(),
            });
        }
        self.records.push(record);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn check_records(&self) -> PhashResult<()> {
        for record in &self.records {
            if record.sketch.len() != self.sketch_size {
                return Err(PhashError::Decode(format!(
                    "record {} has {} hashes but the header declares {}",
                    record.id,
                    record.sketch.len(),
                    self.sketch_size,
                )));
            }
        }
        Ok(())
    }
}

// fixed-width little-endian integers with u64 length prefixes; trailing
// bytes are rejected on decode
fn bincode_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
}

pub fn encode_database(db: &Database) -> PhashResult<Vec<u8>> {
    let mut buf = Vec::with_capacity(HEADER_LEN + 17 + db.records.len() * db.sketch_size * 8);
    write_database(&mut buf, db)?;
    Ok(buf)
}

pub fn write_database(file: &mut dyn Write, db: &Database) -> PhashResult<()> {
    db.check_records()?;
    file.write_all(MAGIC)?;
    file.write_all(&FORMAT_VERSION.to_le_bytes())?;
    bincode_options().serialize_into(file, db)?;
    Ok(())
}

pub fn decode_database(buf: &[u8]) -> PhashResult<Database> {
    if buf.len() < HEADER_LEN || &buf[..4] != MAGIC {
        return Err(PhashError::Decode("not a pHash database".to_string()));
    }
    let version = u16::from_le_bytes([buf[4], buf[5]]);
    if version != FORMAT_VERSION {
        return Err(PhashError::Decode(format!(
            "unsupported database format version {} (expected {})",
            version, FORMAT_VERSION
        )));
    }
    let db: Database = bincode_options()
        .deserialize(&buf[HEADER_LEN..])
        .map_err(|e| PhashError::Decode(e.to_string()))?;
    db.check_records()?;
    Ok(db)
}

pub fn read_database(file: &mut dyn Read) -> PhashResult<Database> {
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;
    decode_database(&buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_db(n_records: usize) -> Database {
        let mut db = Database::new(&SketchParams {
            kmer_length: 16,
            sketch_size: 4,
            parallel_seeds: false,
        });
        for i in 0..n_records {
            let metadata = if i % 2 == 0 { Some("Proteobacteria") } else { None };
            let base = i as u64 * 10;
            db.push(Record::new(
                &format!("NZ_CP{:06}.1", i),
                metadata,
                Sketch::new(vec![base, base + 1, u64::MAX, base + 3]),
            ))
            .unwrap();
        }
        db
    }

    #[test]
    fn test_roundtrip() {
        for n in &[0, 1, 25] {
            let db = example_db(*n);
            let buf = encode_database(&db).unwrap();
            assert_eq!(&buf[..4], MAGIC);
            let decoded = decode_database(&buf).unwrap();
            assert_eq!(decoded, db);
        }
    }

    #[test]
    fn test_roundtrip_preserves_fields() {
        let db = example_db(3);
        let decoded = decode_database(&encode_database(&db).unwrap()).unwrap();
        assert_eq!(decoded.kmer_length, 16);
        assert_eq!(decoded.sketch_size, 4);
        assert_eq!(decoded.records[0].metadata(), Some("Proteobacteria"));
        assert_eq!(decoded.records[1].metadata(), None);
        assert_eq!(decoded.records[1].metadata, "");
        assert_eq!(decoded.records[2].id, "NZ_CP000002.1");
        assert_eq!(decoded.records[2].sketch.hashes, vec![20, 21, u64::MAX, 23]);
    }

    #[test]
    fn test_read_write() {
        let db = example_db(4);
        let mut buf = Vec::new();
        write_database(&mut buf, &db).unwrap();
        let decoded = read_database(&mut buf.as_slice()).unwrap();
        assert_eq!(decoded, db);
    }

    #[test]
    fn test_bad_magic() {
        let mut buf = encode_database(&example_db(1)).unwrap();
        buf[0] = b'X';
        assert!(matches!(decode_database(&buf), Err(PhashError::Decode(_))));
        assert!(matches!(decode_database(b"PH"), Err(PhashError::Decode(_))));
        assert!(matches!(decode_database(b""), Err(PhashError::Decode(_))));
    }

    #[test]
    fn test_bad_version() {
        let mut buf = encode_database(&example_db(1)).unwrap();
        buf[4] = 2;
        match decode_database(&buf) {
            Err(PhashError::Decode(msg)) => assert!(msg.contains("version 2")),
            other => panic!("expected a decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_truncated_and_trailing() {
        let buf = encode_database(&example_db(3)).unwrap();
        assert!(matches!(
            decode_database(&buf[..buf.len() - 5]),
            Err(PhashError::Decode(_))
        ));

        let mut longer = buf.clone();
        longer.push(0);
        assert!(matches!(decode_database(&longer), Err(PhashError::Decode(_))));
    }

    #[test]
    fn test_sketch_length_must_match_header() {
        let mut db = example_db(2);
        assert!(matches!(
            db.push(Record::new("short", None, Sketch::new(vec![1, 2]))),
            Err(PhashError::SizeMismatch {
                expected: 4,
                found: 2
            })
        ));

        // a corrupted header is caught on decode
        db.sketch_size = 3;
        let mut buf = Vec::new();
        buf.extend_from_slice(MAGIC);
        buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        buf.extend(bincode_options().serialize(&db).unwrap());
        assert!(matches!(decode_database(&buf), Err(PhashError::Decode(_))));
    }
}
