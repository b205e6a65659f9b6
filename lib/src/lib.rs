use std::fs::File;
use std::io::stdin;
use std::path::Path;

use memmap::MmapOptions;
use tracing::info;

use crate::serialization::{decode_database, Database};
use crate::sequences::{FastxQueries, QueryRecord};

pub mod build;
pub mod distance;
pub mod errors;
pub mod metadata;
pub mod output;
mod pipeline;
pub mod search;
pub mod sequences;
pub mod serialization;
pub mod sketch_schemes;

use crate::errors::{PhashError, PhashResult};

pub use crate::build::{build_database, BuildReport};
pub use crate::pipeline::{Cancellation, QueryFailure};
pub use crate::search::{identify, search, Identification, SearchParams, SearchReport};

/// Load a database file written by `serialization::write_database`.
pub fn open_database<P: AsRef<Path>>(path: P) -> PhashResult<Database> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| format_err!("Error opening {}: {}", path.display(), e))?;
    // zero-length files can't be mapped
    if file.metadata()?.len() == 0 {
        return Err(PhashError::Decode(format!("{} is empty", path.display())));
    }
    let mapped = unsafe { MmapOptions::new().map(&file)? };
    let database = decode_database(&mapped)?;
    info!(
        path = %path.display(),
        records = database.len(),
        k = database.kmer_length,
        sketch_size = database.sketch_size,
        "loaded database"
    );
    Ok(database)
}

/// Chain the records of several FASTA/FASTQ files into one source. `-`
/// reads from stdin. Every file is opened up front so a missing input fails
/// before any work starts.
pub fn open_sequence_files(
    filenames: &[&str],
) -> PhashResult<impl Iterator<Item = PhashResult<QueryRecord>> + Send> {
    let sources = filenames
        .iter()
        .map(|filename| {
            if *filename == "-" {
                FastxQueries::from_reader(stdin())
            } else {
                FastxQueries::from_path(filename)
                    .map_err(|e| format_err!("Error opening {}: {}", filename, e))
            }
        })
        .collect::<PhashResult<Vec<_>>>()?;
    Ok(sources.into_iter().flatten())
}
