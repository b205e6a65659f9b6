use std::result::Result as StdResult;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PhashError {
    #[error("failed to load/read/write file: {0:?}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse the fasta/fastq file: {0}")]
    Parse(#[from] needletail::errors::ParseError),
    #[error("invalid nucleotide {symbol:?} at position {position}")]
    InvalidNucleotide { symbol: char, position: usize },
    #[error("failed to decode database: {0}")]
    Decode(String),
    #[error("bincode error: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("sketch size mismatch: expected {expected}, found {found}")]
    SizeMismatch { expected: usize, found: usize },
    #[error("k-mer length mismatch: database uses {expected}, query uses {found}")]
    KmerMismatch { expected: u8, found: u8 },
    #[error("malformed metadata on line {line}: {message}")]
    Metadata { line: usize, message: String },
    #[error("json error: {0:?}")]
    Json(#[from] serde_json::Error),
    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("pHash error: {0}")]
    Message(String),
}

impl PhashError {
    /// True for errors caused by a single bad record rather than by the
    /// source or run as a whole.
    pub fn is_record_error(&self) -> bool {
        matches!(self, PhashError::InvalidNucleotide { .. })
    }
}

pub type PhashResult<T> = StdResult<T, PhashError>;

#[doc(hidden)]
#[macro_export]
macro_rules! bail {
    ($e:expr) => {
        return Err($crate::errors::PhashError::Message($e.to_owned()));
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::errors::PhashError::Message(format!($fmt, $($arg)*)))
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! format_err {
    ($($arg:tt)*) => { $crate::errors::PhashError::Message(format!($($arg)*)) }
}
