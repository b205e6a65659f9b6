//! The worker pool shared by database building and searching.
//!
//! Every worker repeatedly pulls the next record from one shared source
//! (the only step done under the source lock), processes it without holding
//! any lock, and appends the result to a shared collection. Output order is
//! the order in which workers finish, so each output carries the index of
//! its record in the source.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rayon::ThreadPoolBuilder;
use tracing::warn;

use crate::errors::{PhashError, PhashResult};
use crate::sequences::QueryRecord;

/// A handle for stopping a running pool early. Workers finish the record
/// they are on and stop pulling new ones.
#[derive(Clone, Debug, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    pub fn new() -> Self {
        Cancellation::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A record that could not be processed. `query_id` is `None` when the
/// source itself failed to produce a record.
#[derive(Debug)]
pub struct QueryFailure {
    pub index: usize,
    pub query_id: Option<String>,
    pub error: PhashError,
}

pub(crate) struct Drained<T> {
    pub outputs: Vec<(usize, T)>,
    pub failures: Vec<QueryFailure>,
    pub aborted: bool,
    pub cancelled: bool,
}

struct SourceCursor<I> {
    source: I,
    next_index: usize,
    exhausted: bool,
}

impl<I> SourceCursor<I>
where
    I: Iterator<Item = PhashResult<QueryRecord>>,
{
    fn pull(&mut self) -> Option<(usize, PhashResult<QueryRecord>)> {
        if self.exhausted {
            return None;
        }
        let index = self.next_index;
        match self.source.next() {
            None => {
                self.exhausted = true;
                None
            }
            Some(record) => {
                // a failed read leaves the stream in an unknown state
                if record.is_err() {
                    self.exhausted = true;
                }
                self.next_index += 1;
                Some((index, record))
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Run `process` over every record of `source` on `threads` workers.
///
/// A failing `process` call is recorded and the run continues; a failing
/// read from `source` is recorded, marks the run as aborted and stops all
/// workers once they finish their current record.
pub(crate) fn drain<I, T, F>(
    source: I,
    threads: usize,
    cancel: Option<&Cancellation>,
    process: F,
) -> PhashResult<Drained<T>>
where
    I: Iterator<Item = PhashResult<QueryRecord>> + Send,
    T: Send,
    F: Fn(usize, QueryRecord) -> PhashResult<T> + Sync,
{
    let threads = threads.max(1);
    let pool = ThreadPoolBuilder::new().num_threads(threads).build()?;

    let cursor = Mutex::new(SourceCursor {
        source,
        next_index: 0,
        exhausted: false,
    });
    let outputs = Mutex::new(Vec::new());
    let failures = Mutex::new(Vec::new());
    let aborted = AtomicBool::new(false);
    let is_cancelled = || cancel.map_or(false, Cancellation::is_cancelled);

    {
        let cursor = &cursor;
        let outputs = &outputs;
        let failures = &failures;
        let aborted = &aborted;
        let process = &process;
        let is_cancelled = &is_cancelled;
        pool.scope(|scope| {
            for _ in 0..threads {
                scope.spawn(move |_| loop {
                    if is_cancelled() {
                        break;
                    }
                    let next = lock(cursor).pull();
                    let (index, record) = match next {
                        Some((index, Ok(record))) => (index, record),
                        Some((index, Err(error))) => {
                            warn!(index, %error, "failed to read record");
                            aborted.store(true, Ordering::SeqCst);
                            lock(failures).push(QueryFailure {
                                index,
                                query_id: None,
                                error,
                            });
                            break;
                        }
                        None => break,
                    };

                    let query_id = record.id.clone();
                    match process(index, record) {
                        Ok(output) => lock(outputs).push((index, output)),
                        Err(error) => {
                            warn!(index, id = %query_id, %error, "skipping record");
                            lock(failures).push(QueryFailure {
                                index,
                                query_id: Some(query_id),
                                error,
                            });
                        }
                    }
                });
            }
        });
    }

    let mut failures = failures.into_inner().unwrap_or_else(PoisonError::into_inner);
    failures.sort_by_key(|f| f.index);
    Ok(Drained {
        outputs: outputs.into_inner().unwrap_or_else(PoisonError::into_inner),
        failures,
        aborted: aborted.load(Ordering::SeqCst),
        cancelled: is_cancelled(),
    })
}
