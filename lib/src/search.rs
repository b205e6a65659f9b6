use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::distance::similarity;
use crate::errors::PhashResult;
use crate::pipeline::{drain, Cancellation, QueryFailure};
use crate::sequences::QueryRecord;
use crate::serialization::Database;
use crate::sketch_schemes::{Sketch, SketchParams};

/// Run configuration for the query pipeline.
#[derive(Clone, Debug)]
pub struct SearchParams {
    /// Number of workers pulling queries.
    pub threads: usize,
    pub cancel: Option<Cancellation>,
}

impl Default for SearchParams {
    fn default() -> Self {
        SearchParams {
            threads: rayon::current_num_threads(),
            cancel: None,
        }
    }
}

/// Best match(es) for one query. `best_ids` holds every record tied for
/// the highest similarity and is empty if no record shares a single hash
/// with the query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub query_id: String,
    pub query_length: usize,
    pub best_ids: Vec<String>,
    pub best_metadata: Vec<String>,
    pub score: f64,
}

impl SearchHit {
    pub fn has_match(&self) -> bool {
        !self.best_ids.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct SearchReport {
    pub hits: Vec<SearchHit>,
    pub failures: Vec<QueryFailure>,
    /// The query source failed partway through.
    pub aborted: bool,
    pub cancelled: bool,
}

impl SearchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && !self.aborted && !self.cancelled
    }

    /// Put hits in query id order (the pipeline itself returns them in
    /// completion order).
    pub fn sort(&mut self) {
        self.hits.sort_by(|a, b| a.query_id.cmp(&b.query_id));
    }
}

/// A query whose best similarity reached the threshold, with its
/// description replaced by the matching reference ids.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentifiedSequence {
    pub id: String,
    pub description: String,
    pub sequence: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    #[serde(flatten)]
    pub hit: SearchHit,
    pub identified: bool,
}

#[derive(Debug, Default)]
pub struct Identification {
    pub summary: Vec<SummaryRow>,
    pub sequences: Vec<IdentifiedSequence>,
    pub failures: Vec<QueryFailure>,
    pub aborted: bool,
    pub cancelled: bool,
}

impl Identification {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && !self.aborted && !self.cancelled
    }

    pub fn identified(&self) -> impl Iterator<Item = &SummaryRow> {
        self.summary.iter().filter(|row| row.identified)
    }

    /// Put the summary and the identified sequences in query id order.
    pub fn sort(&mut self) {
        self.summary.sort_by(|a, b| a.hit.query_id.cmp(&b.hit.query_id));
        self.sequences.sort_by(|a, b| a.id.cmp(&b.id));
    }
}

/// Indices of the records tied for the best similarity to `query`, and
/// that similarity.
///
/// The running best starts at zero with no records, so a record only
/// becomes a hit by sharing at least one hash with the query.
#[allow(clippy::float_cmp)]
pub fn best_hits(database: &Database, query: &Sketch) -> PhashResult<(Vec<usize>, f64)> {
    let mut best_ixs = Vec::new();
    let mut best_score = 0.;
    for (ix, record) in database.records.iter().enumerate() {
        let score = similarity(query, &record.sketch)?;
        if score > best_score {
            best_ixs.clear();
            best_ixs.push(ix);
            best_score = score;
        } else if score == best_score {
            best_ixs.push(ix);
        }
    }
    Ok((best_ixs, best_score))
}

fn query_hit(database: &Database, record: &QueryRecord, sketch: &Sketch) -> PhashResult<SearchHit> {
    let (best_ixs, score) = best_hits(database, sketch)?;
    let best = best_ixs.iter().map(|ix| &database.records[*ix]);
    Ok(SearchHit {
        query_id: record.id.clone(),
        query_length: record.sequence.len(),
        best_ids: best.clone().map(|r| r.id.clone()).collect(),
        best_metadata: best.map(|r| r.metadata.clone()).collect(),
        score,
    })
}

fn run<I, T, F>(
    database: &Database,
    queries: I,
    sketch_params: &SketchParams,
    params: &SearchParams,
    emit: F,
) -> PhashResult<(Vec<T>, Vec<QueryFailure>, bool, bool)>
where
    I: IntoIterator<Item = PhashResult<QueryRecord>>,
    I::IntoIter: Send,
    T: Send,
    F: Fn(QueryRecord, SearchHit) -> T + Sync,
{
    // nothing is pulled from the source until the parameters check out
    sketch_params.validate()?;
    database.sketch_params().ensure_compatible(sketch_params)?;

    let sketcher = sketch_params.create_sketcher();
    info!(
        records = database.len(),
        k = sketch_params.kmer_length,
        sketch_size = sketch_params.sketch_size,
        threads = params.threads,
        "searching queries against database"
    );

    let drained = drain(
        queries.into_iter(),
        params.threads,
        params.cancel.as_ref(),
        |_, record| {
            let sketch = sketcher.sketch(&record.sequence)?;
            let hit = query_hit(database, &record, &sketch)?;
            debug!(
                query = %hit.query_id,
                best = ?hit.best_ids,
                score = hit.score,
                "query done"
            );
            Ok(emit(record, hit))
        },
    )?;

    info!(
        queries = drained.outputs.len(),
        failures = drained.failures.len(),
        aborted = drained.aborted,
        cancelled = drained.cancelled,
        "search finished"
    );
    let outputs = drained.outputs.into_iter().map(|(_, output)| output).collect();
    Ok((outputs, drained.failures, drained.aborted, drained.cancelled))
}

/// Find the best matching record(s) for every query.
///
/// `sketch_params` must match the database's k-mer length and sketch size;
/// a mismatch fails before any query is read.
pub fn search<I>(
    database: &Database,
    queries: I,
    sketch_params: &SketchParams,
    params: &SearchParams,
) -> PhashResult<SearchReport>
where
    I: IntoIterator<Item = PhashResult<QueryRecord>>,
    I::IntoIter: Send,
{
    let (hits, failures, aborted, cancelled) =
        run(database, queries, sketch_params, params, |_, hit| hit)?;
    Ok(SearchReport {
        hits,
        failures,
        aborted,
        cancelled,
    })
}

/// Search every query and keep the sequences of those whose best
/// similarity is at least `threshold`.
pub fn identify<I>(
    database: &Database,
    queries: I,
    threshold: f64,
    params: &SearchParams,
) -> PhashResult<Identification>
where
    I: IntoIterator<Item = PhashResult<QueryRecord>>,
    I::IntoIter: Send,
{
    let sketch_params = database.sketch_params();
    let (rows, failures, aborted, cancelled) =
        run(database, queries, &sketch_params, params, |record, hit| {
            let identified = hit.has_match() && hit.score >= threshold;
            let sequence = if identified {
                Some(IdentifiedSequence {
                    id: record.id,
                    description: format!(
                        "Similar to {} ({:.6})",
                        hit.best_ids.join(":"),
                        hit.score
                    ),
                    sequence: record.sequence,
                })
            } else {
                None
            };
            (SummaryRow { hit, identified }, sequence)
        })?;

    let mut summary = Vec::with_capacity(rows.len());
    let mut sequences = Vec::new();
    for (row, sequence) in rows {
        summary.push(row);
        sequences.extend(sequence);
    }
    Ok(Identification {
        summary,
        sequences,
        failures,
        aborted,
        cancelled,
    })
}
