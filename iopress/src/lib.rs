// Copyright (c) Facebook, Inc. and its affiliates.
use anyhow::{Context, Result};
use chrono::prelude::*;
use log::{debug, info};
use std::path::Path;

pub mod cursor;
pub mod error;
pub mod extract;
pub mod format;
pub mod phase;
pub mod pressure;
pub mod study;
pub mod task_params;

pub use cursor::LastState;
pub use error::AnalysisError;
pub use extract::{extract, extract_file, open_log, task_name, LogData};
pub use phase::PhaseSegmentator;
pub use pressure::{aggregate, aggregate_samples, decreased_phases, sorted_by_pressure};
pub use study::{bucket_means, cut_begin, io_summary, throughput_points, StudyMeanPcts};
pub use task_params::{extract_task_params, SineWave};

use iopress_intf::{Args, FileReport, PhaseTick, PressureResult, Series};

/// Time range covered by the given series.
pub fn time_span(series: &[&Series]) -> Option<(f64, f64)> {
    let mut span: Option<(f64, f64)> = None;
    for s in series.iter() {
        if let (Some(first), Some(last)) = (s.first(), s.last()) {
            span = Some(match span {
                Some((start, end)) => (start.min(first.time), end.max(last.time)),
                None => (first.time, last.time),
            });
        }
    }
    span
}

fn sweep_ticks(gens: &[&Series], span: Option<(f64, f64)>, args: &Args) -> Result<Vec<PhaseTick>> {
    let (start, end) = match span {
        Some(v) => v,
        None => return Ok(vec![]),
    };
    let start = args.start_time.map(|st| st.max(start)).unwrap_or(start);
    PhaseSegmentator::new(gens).phase_ticks(start, end, args.tick_step)
}

/// Runs the whole analysis on one log file.
pub fn analyze_file<P: AsRef<Path>>(path: P, args: &Args) -> Result<FileReport> {
    let path = path.as_ref();
    let data = extract_file(path)?;
    let (tasks, nr_param_warnings) = extract_task_params(
        open_log(path)?,
        &args.instance_kind,
        &args.instance_count_param,
    )
    .with_context(|| format!("Extracting task parameters from {:?}", path))?;

    let gens = data.interference_series(&args.interference_kind);
    let primary = data.primary_series(&args.primary_kinds);
    debug!(
        "{:?}: primary={:?} {} {} generators",
        path,
        primary.map(|s| s.task()),
        gens.len(),
        &args.interference_kind
    );

    let start = args.start_time.unwrap_or(std::f64::NEG_INFINITY);
    let (phases, pressure, throughput_means) = match primary {
        Some(primary) => {
            let mut seg = PhaseSegmentator::new(&gens);
            let pressure = aggregate_samples(
                primary.samples().iter().filter(|s| s.time >= start),
                &mut seg,
            )
            .with_context(|| format!("Aggregating {} in {:?}", primary.task(), path))?;

            let mut points = throughput_points(primary);
            if let Some(st) = args.start_time {
                points = cut_begin(&points, st);
            }
            (
                seg.into_phases(),
                pressure,
                bucket_means(&points, args.mean_interval),
            )
        }
        None => {
            info!("{:?}: No primary workload series found", path);
            (vec![], PressureResult::default(), vec![])
        }
    };

    let mut all: Vec<&Series> = gens.clone();
    all.extend(primary);
    let ticks = sweep_ticks(&gens, time_span(&all), args)
        .with_context(|| format!("Sweeping phases of {:?}", path))?;

    Ok(FileReport {
        file: path.display().to_string(),
        analyzed_at: Local::now(),
        tasks,
        series_lens: data
            .series
            .iter()
            .map(|(k, v)| (k.to_string(), v.len()))
            .collect(),
        nr_warnings: data.nr_warnings + nr_param_warnings,
        primary: primary.map(|s| s.task().to_string()),
        nr_interference: gens.len(),
        decreased: decreased_phases(&pressure.rows),
        io_summary: io_summary(&gens),
        phases,
        ticks,
        throughput_means,
        pressure,
        series: if args.dump_series {
            Some(data.series.clone())
        } else {
            None
        },
        params: data.params.clone(),
    })
}
