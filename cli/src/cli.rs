use anyhow::{anyhow, bail, Result};
use clap::{crate_authors, crate_version, App, AppSettings, Arg, ArgMatches, SubCommand};
use phash::sketch_schemes::SketchParams;
use phash::SearchParams;
use std::str::FromStr;

pub fn build_cli() -> App<'static, 'static> {
    App::new("phash")
        .version(crate_version!())
        .author(crate_authors!())
        .about("Identify known plasmids in nucleotide sequences with MinHash sketches")
        .setting(AppSettings::VersionlessSubcommands)
        .setting(AppSettings::ArgRequiredElseHelp)
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .global(true)
                .help("Log progress and per-query details to stderr"),
        )
        .subcommand(build_command())
        .subcommand(search_command())
        .subcommand(identify_command())
        .subcommand(info_command())
}

fn build_command() -> App<'static, 'static> {
    let mut build_command = SubCommand::with_name("build")
        .about("Sketch reference FASTA/Q file(s) into a database")
        .arg(
            Arg::with_name("INPUT")
                .help("The reference file(s) to sketch")
                .multiple(true)
                .required(true),
        )
        .arg(
            Arg::with_name("output_file")
                .short("o")
                .long("output")
                .help("Write the database to this file")
                .takes_value(true)
                .required(true),
        )
        .arg(
            Arg::with_name("metadata")
                .short("m")
                .long("metadata")
                .help("CSV of `id,metadata` lines to attach to records")
                .takes_value(true),
        );
    build_command = add_sketch_options(build_command, true);
    build_command = add_thread_options(build_command);
    build_command
}

fn search_command() -> App<'static, 'static> {
    let mut search_command = SubCommand::with_name("search")
        .about("Find the most similar database record(s) for each query sequence")
        .arg(
            Arg::with_name("INPUT")
                .help("FASTA/Q file(s) of query sequences (`-` for stdin)")
                .multiple(true)
                .required(true),
        )
        .arg(
            Arg::with_name("sorted")
                .long("sorted")
                .help("Sort hits by query id instead of completion order"),
        );
    search_command = add_database_option(search_command);
    search_command = add_sketch_options(search_command, false);
    search_command = add_thread_options(search_command);
    search_command = add_output_options(search_command);
    search_command
}

fn identify_command() -> App<'static, 'static> {
    let mut identify_command = SubCommand::with_name("identify")
        .about("Keep query sequences that are similar enough to a database record")
        .arg(
            Arg::with_name("INPUT")
                .help("FASTA/Q file(s) of query sequences (`-` for stdin)")
                .multiple(true)
                .required(true),
        )
        .arg(
            Arg::with_name("threshold")
                .short("t")
                .long("threshold")
                .help("Minimum similarity, as a percentage, for a query to be identified")
                .takes_value(true)
                .default_value("10"),
        )
        .arg(
            Arg::with_name("tsv_file")
                .long("tsv")
                .help("Write one `query, best match, similarity` line per hit to this file")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("fasta_file")
                .long("fasta")
                .help("Write the identified sequences as FASTA to this file")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("sorted")
                .long("sorted")
                .help("Write every output in query id order instead of completion order"),
        );
    identify_command = add_database_option(identify_command);
    identify_command = add_thread_options(identify_command);
    identify_command = add_output_options(identify_command);
    identify_command
}

fn info_command() -> App<'static, 'static> {
    SubCommand::with_name("info")
        .about("Display the parameters and size of database(s)")
        .arg(
            Arg::with_name("INPUT")
                .help("Return stats on these database file(s)")
                .multiple(true)
                .required(true),
        )
}

fn add_database_option<'a, 'b>(app: App<'a, 'b>) -> App<'a, 'b> {
    app.arg(
        Arg::with_name("database")
            .short("d")
            .long("database")
            .help("Database built by `phash build`")
            .takes_value(true)
            .required(true),
    )
}

// building needs defaults; a search only checks whatever was given against
// the database header
fn add_sketch_options<'a, 'b>(app: App<'a, 'b>, with_defaults: bool) -> App<'a, 'b> {
    let mut kmer_length = Arg::with_name("kmer_length")
        .short("k")
        .long("kmer-length")
        .takes_value(true)
        .help("Length of kmers to use");
    let mut sketch_size = Arg::with_name("sketch_size")
        .short("s")
        .long("sketch-size")
        .takes_value(true)
        .help("How many seeded minimum hashes to store per sequence");
    if with_defaults {
        kmer_length = kmer_length.default_value("16");
        sketch_size = sketch_size.default_value("512");
    }
    app.arg(kmer_length).arg(sketch_size).arg(
        Arg::with_name("parallel_seeds")
            .long("parallel-seeds")
            .help("Also spread each sequence's hash seeds across threads"),
    )
}

fn add_thread_options<'a, 'b>(app: App<'a, 'b>) -> App<'a, 'b> {
    app.arg(
        Arg::with_name("threads")
            .short("p")
            .long("threads")
            .help("Number of worker threads [default: number of CPUs]")
            .takes_value(true),
    )
}

fn add_output_options<'a, 'b>(app: App<'a, 'b>) -> App<'a, 'b> {
    app.arg(
        Arg::with_name("output_file")
            .short("o")
            .long("output")
            .help("Output to this file")
            .takes_value(true),
    )
}

pub fn get_int_arg<T: FromStr>(matches: &ArgMatches, key: &str) -> Result<T> {
    let display_key = key.replace('_', "-");
    matches
        .value_of(key)
        .ok_or_else(|| anyhow!("Bad {}", display_key))?
        .parse::<T>()
        .map_err(|_| anyhow!("{} must be a positive integer", display_key))
}

pub fn get_float_arg(matches: &ArgMatches, key: &str, limit: f64) -> Result<f64> {
    let display_key = key.replace('_', "-");
    matches
        .value_of(key)
        .ok_or_else(|| anyhow!("Bad {}", display_key))?
        .parse::<f64>()
        .map_err(|_| anyhow!("{} must be a number", display_key))
        .and_then(|r| {
            if 0f64 <= r && r <= limit {
                return Ok(r);
            }
            bail!("{} must be between 0 and {}", display_key, limit)
        })
}

pub fn get_threads(matches: &ArgMatches) -> Result<usize> {
    if matches.occurrences_of("threads") == 0 {
        return Ok(SearchParams::default().threads);
    }
    let threads: usize = get_int_arg(matches, "threads")?;
    if threads == 0 {
        bail!("threads must be at least 1");
    }
    Ok(threads)
}

/// Sketch parameters for `build`, straight from the flags (or defaults).
pub fn parse_sketch_options(matches: &ArgMatches) -> Result<SketchParams> {
    let sketch_params = SketchParams {
        kmer_length: get_int_arg(matches, "kmer_length")?,
        sketch_size: get_int_arg(matches, "sketch_size")?,
        parallel_seeds: matches.is_present("parallel_seeds"),
    };
    sketch_params.validate()?;
    Ok(sketch_params)
}

/// Sketch parameters for `search`: the database header, with any explicit
/// flag required to agree with it.
pub fn update_sketch_params(
    matches: &ArgMatches,
    database_params: &SketchParams,
) -> Result<SketchParams> {
    let mut sketch_params = database_params.clone();
    if matches.occurrences_of("kmer_length") > 0 {
        sketch_params.kmer_length = get_int_arg(matches, "kmer_length")?;
    }
    if matches.occurrences_of("sketch_size") > 0 {
        sketch_params.sketch_size = get_int_arg(matches, "sketch_size")?;
    }
    sketch_params.parallel_seeds = matches.is_present("parallel_seeds");
    if let Some((name, v1, v2)) = database_params.check_compatibility(&sketch_params) {
        bail!(
            "Specified {} {} does not match {} from the database",
            name,
            v2,
            v1,
        );
    }
    Ok(sketch_params)
}
