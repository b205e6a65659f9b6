use std::fs::File;
use std::io::{stdout, BufWriter, Write};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use clap::ArgMatches;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{get_float_arg, get_threads, parse_sketch_options, update_sketch_params};
use phash::metadata::Metadata;
use phash::output::{write_fasta_records, write_hits_tsv, write_json};
use phash::serialization::{write_database, PHASH_EXT};
use phash::{
    build_database, identify, open_database, open_sequence_files, search, QueryFailure,
    SearchParams,
};

mod cli;

fn output_to<F>(output_fn: F, output: Option<&str>, extension: &str) -> Result<()>
where
    F: Fn(&mut dyn Write) -> Result<()>,
{
    match output {
        None => {
            let out = stdout();
            let mut out = out.lock();
            output_fn(&mut out)?;
        }
        Some(o) => {
            // if the filename doesn't have the right extension
            // add it on
            let filename = String::from(o);
            let out_filename = if filename.ends_with(extension) {
                filename
            } else {
                filename + extension
            };

            let file = File::create(&out_filename)
                .context(format!("unable to create '{}'", out_filename))?;
            let mut out = BufWriter::new(file);
            output_fn(&mut out)?;
            out.flush()
                .context(format!("unable to write '{}'", out_filename))?;
        }
    };
    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("phash=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("phash=warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn input_filenames<'a>(matches: &'a ArgMatches) -> Result<Vec<&'a str>> {
    Ok(matches
        .values_of("INPUT")
        .ok_or_else(|| anyhow!("Bad INPUT"))?
        .collect())
}

fn search_params(matches: &ArgMatches) -> Result<SearchParams> {
    Ok(SearchParams {
        threads: get_threads(matches)?,
        cancel: None,
    })
}

/// Turn per-record failures (already logged as they happened) into the
/// final error, if there were any.
fn check_failures(failures: &[QueryFailure], aborted: bool, what: &str) -> Result<()> {
    if aborted {
        let reason = failures
            .iter()
            .find(|f| f.query_id.is_none())
            .map(|f| f.error.to_string())
            .unwrap_or_default();
        bail!("Reading {} stopped early: {}", what, reason);
    }
    if !failures.is_empty() {
        bail!("{} of the {} could not be processed", failures.len(), what);
    }
    Ok(())
}

fn run() -> Result<()> {
    let matches = cli::build_cli().get_matches();
    let verbose = matches.is_present("verbose")
        || matches
            .subcommand()
            .1
            .map_or(false, |m| m.is_present("verbose"));
    init_logging(verbose);

    match matches.subcommand() {
        ("build", Some(matches)) => {
            let filenames = input_filenames(matches)?;
            let sketch_params = parse_sketch_options(matches)?;
            let metadata = match matches.value_of("metadata") {
                Some(path) => Metadata::from_path(Path::new(path))
                    .context(format!("unable to read metadata '{}'", path))?,
                None => Metadata::new(),
            };
            let sources = open_sequence_files(&filenames)?;
            let report = build_database(
                sources,
                &sketch_params,
                &metadata,
                get_threads(matches)?,
                None,
            )?;
            // an incomplete database is worse than none
            if !report.aborted {
                output_to(
                    |writer| {
                        write_database(writer, &report.database)?;
                        Ok(())
                    },
                    matches.value_of("output_file"),
                    PHASH_EXT,
                )?;
                info!(records = report.database.len(), "wrote database");
            }
            check_failures(&report.failures, report.aborted, "reference sequences")?;
        }
        ("search", Some(matches)) => {
            let database = open_database(
                matches
                    .value_of("database")
                    .ok_or_else(|| anyhow!("Bad database"))?,
            )?;
            let sketch_params = update_sketch_params(matches, &database.sketch_params())?;
            let params = search_params(matches)?;
            let queries = open_sequence_files(&input_filenames(matches)?)?;

            let mut report = search(&database, queries, &sketch_params, &params)?;
            if matches.is_present("sorted") {
                report.sort();
            }
            output_to(
                |writer| {
                    write_json(writer, &report.hits)?;
                    Ok(())
                },
                matches.value_of("output_file"),
                ".json",
            )?;
            check_failures(&report.failures, report.aborted, "query sequences")?;
        }
        ("identify", Some(matches)) => {
            let database = open_database(
                matches
                    .value_of("database")
                    .ok_or_else(|| anyhow!("Bad database"))?,
            )?;
            let threshold = get_float_arg(matches, "threshold", 100f64)? / 100f64;
            let params = search_params(matches)?;
            let queries = open_sequence_files(&input_filenames(matches)?)?;

            let mut identification = identify(&database, queries, threshold, &params)?;
            if matches.is_present("sorted") {
                identification.sort();
            }
            info!(
                queries = identification.summary.len(),
                identified = identification.sequences.len(),
                "identification finished"
            );
            if let Some(path) = matches.value_of("tsv_file") {
                let hits: Vec<_> = identification
                    .summary
                    .iter()
                    .map(|row| row.hit.clone())
                    .collect();
                output_to(
                    |writer| {
                        write_hits_tsv(writer, &hits)?;
                        Ok(())
                    },
                    Some(path),
                    "",
                )?;
            }
            if let Some(path) = matches.value_of("fasta_file") {
                output_to(
                    |writer| {
                        write_fasta_records(writer, &identification.sequences)?;
                        Ok(())
                    },
                    Some(path),
                    "",
                )?;
            }
            output_to(
                |writer| {
                    write_json(writer, &identification.summary)?;
                    Ok(())
                },
                matches.value_of("output_file"),
                ".json",
            )?;
            check_failures(
                &identification.failures,
                identification.aborted,
                "query sequences",
            )?;
        }
        ("info", Some(matches)) => {
            for filename in input_filenames(matches)? {
                let database = open_database(filename)?;
                println!("{}", filename);
                println!("  k-mer length: {}", database.kmer_length);
                println!("  sketch size: {}", database.sketch_size);
                println!("  records: {}", database.len());
                let annotated = database
                    .records
                    .iter()
                    .filter(|r| r.metadata().is_some())
                    .count();
                println!("  records with metadata: {}", annotated);
            }
        }
        other => bail!("Unknown subcommand: {:?}", other.0),
    };

    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {:?}", err);
        std::process::exit(1);
    }
}
