// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

extern crate clap;
extern crate env_logger;
extern crate log;
extern crate num_cpus;
extern crate roadmap;

use clap::{App, Arg, ArgMatches};
use log::{error, info};
use std::path::Path;
use std::str::FromStr;

use roadmap::{
    Coordinator, Discard, DumpSink, Geometry, Policy, Summary, Window, ZoomDriver, ZoomReport,
};

fn parse_pair<T>(s: &str, separator: char) -> Option<(T, T)>
where
    T: FromStr,
{
    match s.find(separator) {
        None => None,
        Some(index) => match (T::from_str(&s[..index]), T::from_str(&s[index + 1..])) {
            (Ok(l), Ok(r)) => Some((l, r)),
            _ => None,
        },
    }
}

fn validate_pair<T: FromStr>(s: &str, separator: char, err: &str) -> Result<(), String> {
    match parse_pair::<T>(s, separator) {
        Some(_) => Ok(()),
        None => Err(err.to_string()),
    }
}

fn validate_range<T: FromStr + Ord>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

const POLICY: &str = "policy";
const WORKERS: &str = "workers";
const CHUNK: &str = "chunk";
const THREADS: &str = "threads";
const ZOOMS: &str = "zooms";
const SIZE: &str = "size";
const ITERATIONS: &str = "iterations";
const DUMP: &str = "dump";
const OUTPUT_DIR: &str = "output-dir";

fn args<'a>() -> ArgMatches<'a> {
    let max_threads = num_cpus::get();

    App::new("roadmap")
        .version("0.1.0")
        .about("Escape-time road map, computed by cooperating workers")
        .arg(
            Arg::with_name(POLICY)
                .long(POLICY)
                .short("p")
                .takes_value(true)
                .possible_values(&["seq", "rows", "rowsrr", "dynamic"])
                .default_value("rowsrr")
                .help("How rows are shared out between workers"),
        )
        .arg(
            Arg::with_name(WORKERS)
                .long(WORKERS)
                .short("w")
                .takes_value(true)
                .default_value("4")
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        100_000,
                        "Could not parse worker count",
                        "Worker count must be between 1 and 100000",
                    )
                })
                .help("Ranks in the process group, the coordinator included"),
        )
        .arg(
            Arg::with_name(CHUNK)
                .long(CHUNK)
                .short("c")
                .takes_value(true)
                .default_value("1")
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        100_000,
                        "Could not parse chunk size",
                        "Chunk size must be between 1 and 100000",
                    )
                })
                .help("Rows per assignment under the dynamic policy"),
        )
        .arg(
            Arg::with_name(THREADS)
                .long(THREADS)
                .short("t")
                .takes_value(true)
                .default_value("1")
                .validator(move |s| {
                    validate_range(
                        &s,
                        1,
                        max_threads,
                        "Could not parse thread count",
                        &format!("Thread count must be between 1 and {}", max_threads),
                    )
                })
                .help("Threads each worker splits its rows over"),
        )
        .arg(
            Arg::with_name(ZOOMS)
                .long(ZOOMS)
                .short("z")
                .takes_value(true)
                .default_value("10")
                .validator(|s| {
                    validate_range(
                        &s,
                        0,
                        10_000,
                        "Could not parse zoom count",
                        "Zoom count must be between 0 and 10000",
                    )
                })
                .help("Zoom steps between the start and target windows"),
        )
        .arg(
            Arg::with_name(SIZE)
                .long(SIZE)
                .short("s")
                .takes_value(true)
                .default_value("2000x2000")
                .validator(|s| validate_pair::<usize>(&s, 'x', "Could not parse field size"))
                .help("Field size, WIDTHxHEIGHT"),
        )
        .arg(
            Arg::with_name(ITERATIONS)
                .long(ITERATIONS)
                .short("i")
                .takes_value(true)
                .default_value("100")
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        1_000_000,
                        "Could not parse iteration count",
                        "Iteration count must be between 1 and 1000000",
                    )
                })
                .help("Iteration cap of the escape kernel"),
        )
        .arg(
            Arg::with_name(DUMP)
                .long(DUMP)
                .short("d")
                .help("Store every field under OUTPUT_DIR/data"),
        )
        .arg(
            Arg::with_name(OUTPUT_DIR)
                .long(OUTPUT_DIR)
                .short("o")
                .takes_value(true)
                .default_value(".")
                .help("Where the result summary and dumps are written"),
        )
        .get_matches()
}

// Validators have already run, so these parses cannot fail; the
// fallbacks only keep the types honest.
fn value<T: FromStr>(matches: &ArgMatches, name: &str, fallback: T) -> T {
    matches
        .value_of(name)
        .and_then(|s| T::from_str(s).ok())
        .unwrap_or(fallback)
}

fn run(matches: &ArgMatches) -> roadmap::Result<()> {
    let (width, height) = matches
        .value_of(SIZE)
        .and_then(|s| parse_pair::<usize>(s, 'x'))
        .unwrap_or((roadmap::planes::WIDTH, roadmap::planes::HEIGHT));
    let geometry = Geometry::new(
        width,
        height,
        value(matches, ITERATIONS, roadmap::planes::MAX_ITERATIONS),
    )?;

    let policy = match value(matches, POLICY, Policy::RoundRobin) {
        Policy::Dynamic { .. } => Policy::Dynamic {
            chunk_size: value(matches, CHUNK, 1),
        },
        other => other,
    };
    let workers = value(matches, WORKERS, 1);
    let threads = value(matches, THREADS, 1);
    let driver = ZoomDriver::new(
        Window::start(),
        Window::target(),
        value(matches, ZOOMS, roadmap::zoom::ZOOMS),
    );
    let output_dir = Path::new(matches.value_of(OUTPUT_DIR).unwrap_or("."));

    info!(
        "{}x{} field, cap {}, {} over {} ranks, {} threads per worker",
        geometry.width, geometry.height, geometry.max_iterations, policy, workers, threads
    );

    let coordinator = Coordinator::new(geometry, workers, policy, threads)?;
    let report: ZoomReport = if matches.is_present(DUMP) {
        let mut sink = DumpSink::new(output_dir.join("data"))?;
        driver.run(&coordinator, &mut sink)?
    } else {
        driver.run(&coordinator, &mut Discard)?
    };

    let summary = Summary::new(policy, geometry, &report);
    let path = summary.write_to(output_dir, policy.result_file())?;
    info!("Summary written to {}", path.display());
    println!("{}", summary);
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    let matches = args();
    if let Err(e) = run(&matches) {
        error!("{}", e);
        eprintln!("Road map failure: {}", e);
        std::process::exit(1);
    }
}
