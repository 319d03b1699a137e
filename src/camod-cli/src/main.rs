// Copyright 2024 The Camod Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::fs::File;
use std::io::{BufReader, Write};
use std::result::Result as StdResult;

use pico_args::Arguments;

use camod_engine::datamodel::Project as DatamodelProject;
use camod_engine::{full_report, ModelCollection, STATE_VECTOR_DERIVATIVE};

const VERSION: &str = "0.1";
const EXIT_FAILURE: i32 = 1;

macro_rules! die(
    ($($arg:tt)*) => { {
        eprintln!($($arg)*);
        std::process::exit(EXIT_FAILURE)
    } }
);

fn usage() -> ! {
    let argv0 = std::env::args()
        .next()
        .unwrap_or_else(|| "<camod>".to_string());
    die!(
        concat!(
            "camod {}: Compare carbon-allocation models.\n\
         \n\
         USAGE:\n",
            "    {} [SUBCOMMAND] [OPTION...] PATH\n",
            "\n\
         OPTIONS:\n",
            "    -h, --help       show this message\n",
            "    --key KEY        target key for deps (default: state_vector_derivative)\n",
            "    --output FILE    path to write output file\n",
            "\n\
         SUBCOMMANDS:\n",
            "    report           Assemble the full comparative report as JSON\n",
            "    deps             Print the dependency histogram for a key\n",
            "    metrics          Print per-model complexity metrics\n",
        ),
        VERSION,
        argv0
    );
}

#[derive(Clone, Default, Debug)]
struct Args {
    path: Option<String>,
    output: Option<String>,
    key: Option<String>,
    is_report: bool,
    is_deps: bool,
    is_metrics: bool,
}

fn parse_args() -> StdResult<Args, Box<dyn std::error::Error>> {
    let mut parsed = Arguments::from_env();
    if parsed.contains(["-h", "--help"]) {
        usage();
    }

    let subcommand = parsed.subcommand()?;
    if subcommand.is_none() {
        eprintln!("error: subcommand required");
        usage();
    }

    let mut args: Args = Default::default();

    let subcommand = subcommand.unwrap();
    if subcommand == "report" {
        args.is_report = true;
    } else if subcommand == "deps" {
        args.is_deps = true;
    } else if subcommand == "metrics" {
        args.is_metrics = true;
    } else {
        eprintln!("error: unknown subcommand {}", subcommand);
        usage();
    }

    args.output = parsed.value_from_str("--output").ok();
    args.key = parsed.value_from_str("--key").ok();

    let free_arguments = parsed.finish();
    if free_arguments.is_empty() {
        eprintln!("error: input path required");
        usage();
    }

    args.path = free_arguments[0].to_str().map(|s| s.to_owned());

    Ok(args)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(err) => {
            eprintln!("error: {}", err);
            usage();
        }
    };
    let file_path = args.path.unwrap_or_else(|| "/dev/stdin".to_string());
    let file = match File::open(&file_path) {
        Ok(file) => file,
        Err(err) => die!("error: open {}: {}", &file_path, err),
    };
    let reader = BufReader::new(file);

    let project: DatamodelProject = match serde_json::from_reader(reader) {
        Ok(project) => project,
        Err(err) => die!("project '{}' error: {}", &file_path, err),
    };

    let collection = match ModelCollection::from_project(&project) {
        Ok(collection) => collection,
        Err(err) => die!("project '{}' error: {}", &file_path, err),
    };

    let mut output_file: Box<dyn Write> = match args.output {
        Some(ref path) => match File::create(path) {
            Ok(file) => Box::new(file),
            Err(err) => die!("error: create {}: {}", path, err),
        },
        None => Box::new(std::io::stdout()),
    };

    if args.is_report {
        let doc = full_report(&project.name, &collection);
        let rendered = serde_json::to_string_pretty(&doc).unwrap();
        writeln!(output_file, "{}", rendered).unwrap();
    } else if args.is_deps {
        let key = args
            .key
            .unwrap_or_else(|| STATE_VECTOR_DERIVATIVE.to_string());
        let hist = collection.dependency_histogram(&key);
        for (dep, count) in hist.iter() {
            writeln!(output_file, "{}\t{}", dep, count).unwrap();
        }
    } else if args.is_metrics {
        writeln!(output_file, "model\tops\tdepth\tvars\tparams").unwrap();
        for record in camod_engine::collection_metrics(&collection).iter() {
            writeln!(
                output_file,
                "{}\t{}\t{}\t{}\t{}",
                record.name,
                record.total_operations,
                record.max_depth,
                record.variable_count,
                record.parameter_count
            )
            .unwrap();
        }
    }
}
