#[macro_use]
extern crate clap;
#[macro_use]
extern crate slog;
extern crate rayon;
extern crate wikirank;

use clap::Arg;
use std::path::Path;
use std::process;

use wikirank::Config;
use wikirank::rank_state::{new_logger, Pipeline};

fn argv<'a>() -> clap::ArgMatches<'a> {
    clap::App::new(crate_name!()).about(crate_description!())
        .author(crate_authors!()).version(crate_version!())

        .arg(Arg::with_name("input")
             .required(true)
             .help("MediaWiki XML export, or a directory of them (one shard per file)"))

        .arg(Arg::with_name("config")
             .long("config")
             .takes_value(true)
             .help("JSON file with any of the settings below; flags override it"))
        .arg(Arg::with_name("work_dir")
             .long("work_dir")
             .short("o")
             .takes_value(true)
             .help("Where snapshots, the manifest and the result go [default: out]"))
        .arg(Arg::with_name("damping")
             .long("damping")
             .takes_value(true)
             .help("Share of rank passed along links each pass [default: 0.85]"))
        .arg(Arg::with_name("iterations")
             .long("iterations")
             .short("k")
             .takes_value(true)
             .help("Number of rank passes; there is no convergence check [default: 4]"))
        .arg(Arg::with_name("precision")
             .long("precision")
             .takes_value(true)
             .help("Decimal digits ranks are rounded to in the result [default: 2]"))
        .arg(Arg::with_name("partitions")
             .long("partitions")
             .takes_value(true)
             .help("Reduce partitions, i.e. files per snapshot [default: 4]"))
        .arg(Arg::with_name("threads")
             .long("threads")
             .takes_value(true)
             .help("Worker threads; 0 means one per core [default: 0]"))

        .arg(Arg::with_name("verbose")
             .long("verbose")
             .short("v")
             .help("Log per-pass debug output"))
        .get_matches()
}

fn main() {
    let args = argv();
    let log = new_logger(args.is_present("verbose"));

    let config = match Config::from_args(&args) {
        Ok(c) => c,
        Err(e) => {
            crit!(log, "{}", e);
            process::exit(2);
        }
    };
    if config.threads > 0 {
        if let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(config.threads).build_global() {
            warn!(log, "Could not size the worker pool: {}", e);
        }
    }

    let input = args.value_of("input").map(Path::new).unwrap_or_else(|| Path::new("."));
    let pipeline = Pipeline::new(config, log.clone());
    match pipeline.run(input) {
        Ok(result) => info!(log, "Ranks written to `{}`", result.display()),
        Err(e) => {
            crit!(log, "Run failed: {}", e);
            process::exit(1);
        }
    }
}
