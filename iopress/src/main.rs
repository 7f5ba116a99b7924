// Copyright (c) Facebook, Inc. and its affiliates.
use log::{error, info, warn};
use std::process::exit;

use iop_util::*;
use iopress::analyze_file;
use iopress::format::format_report;
use iopress_intf::{Args, FileReport};

fn main() {
    let args_file = Args::init_args_and_logging().unwrap_or_else(|e| {
        error!("Failed to process args ({:#})", &e);
        exit(1);
    });
    let args = &args_file.data;

    let inputs = match find_inputs(&args.inputs) {
        Ok(v) => v,
        Err(e) => {
            error!("Failed to find input files ({:#})", &e);
            exit(1);
        }
    };
    if inputs.is_empty() {
        warn!("No input log files found in {:?}", &args.inputs);
    }

    let mut reports: Vec<FileReport> = vec![];
    let mut nr_failed = 0;
    for path in inputs.iter() {
        match analyze_file(path, args) {
            Ok(rep) => {
                print!("{}", format_report(&rep, args.mode, args.sort_by_pressure));
                println!("");
                reports.push(rep);
            }
            Err(e) => {
                error!("Failed to analyze {:?} ({:#})", path, &e);
                nr_failed += 1;
            }
        }
    }

    if let Some(result) = args.result.as_ref() {
        match reports.save(result) {
            Ok(()) => info!("Saved {} reports to {:?}", reports.len(), result),
            Err(e) => {
                error!("Failed to save results to {:?} ({:#})", result, &e);
                exit(1);
            }
        }
    }

    if nr_failed > 0 {
        error!("{}/{} input files failed", nr_failed, inputs.len());
        exit(1);
    }
}
