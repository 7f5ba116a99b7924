// Copyright (c) Facebook, Inc. and its affiliates.
use std::fmt::Write;

use super::pressure::sorted_by_pressure;
use super::task_params::SineWave;
use iop_util::*;
use iopress_intf::{FileReport, Mode};

pub fn format_header<'a>(out: &mut Box<dyn Write + 'a>, rep: &FileReport) {
    writeln!(
        out,
        "{}",
        double_underline(&format!(
            "[{}] {}",
            &rep.file,
            rep.analyzed_at.format("%Y-%m-%d %T")
        ))
    )
    .unwrap();
    writeln!(
        out,
        "Tasks: primary={} interference={} series={} warnings={}",
        rep.primary.as_deref().unwrap_or("-"),
        rep.nr_interference,
        rep.series_lens.len(),
        rep.nr_warnings
    )
    .unwrap();
}

pub fn format_pressure<'a>(out: &mut Box<dyn Write + 'a>, rep: &FileReport, sort: bool) {
    writeln!(out, "\n{}", underline("Pressure")).unwrap();
    if rep.pressure.is_empty() {
        writeln!(out, "No primary workload samples").unwrap();
        return;
    }

    let rows = if sort {
        sorted_by_pressure(&rep.pressure.rows)
    } else {
        rep.pressure.rows.clone()
    };
    let label_width = rows.iter().map(|r| r.label.chars().count()).max().unwrap_or(0).max(5);

    writeln!(
        out,
        "{:>5}  {:<lw$}  {:>7}  {:>5}  {:>5}  {:>5}  {:>5}  {:>5}  {:>8}",
        "phase",
        "label",
        "at",
        "cnt",
        "mean",
        "stdev",
        "p50",
        "max",
        "pressure",
        lw = label_width,
    )
    .unwrap();
    for row in rows.iter() {
        let mark = if rep.decreased.contains(&row.phase) {
            "*"
        } else {
            ""
        };
        writeln!(
            out,
            "{:>5}  {:<lw$}  {:>7.1}  {:>5}  {:>5}  {:>5}  {:>5}  {:>5}  {:>7}%{}",
            format!("w_{}", row.phase),
            &row.label,
            row.active_from,
            row.samples,
            format_count(row.mean_ops_per_s),
            format_count(row.stdev),
            format_count(row.p50),
            format_count(row.max),
            row.normalized_pressure
                .map(format_pct)
                .unwrap_or_else(|| "-".into()),
            mark,
            lw = label_width,
        )
        .unwrap();
    }

    match rep.pressure.baseline_row() {
        Some(base) => writeln!(
            out,
            "\nBaseline: w_{} mean={} ops/s",
            base.phase,
            format_count(base.mean_ops_per_s)
        )
        .unwrap(),
        None => writeln!(out, "\nBaseline: none, pressure unavailable").unwrap(),
    }
    if !rep.decreased.is_empty() {
        writeln!(
            out,
            "Decreased: {}",
            rep.decreased
                .iter()
                .map(|id| format!("w_{}", id))
                .collect::<Vec<String>>()
                .join(" ")
        )
        .unwrap();
    }
}

pub fn format_phases<'a>(out: &mut Box<dyn Write + 'a>, rep: &FileReport) {
    writeln!(out, "\n{}", underline("Phases")).unwrap();
    if rep.ticks.is_empty() {
        writeln!(out, "No phases").unwrap();
        return;
    }
    for tick in rep.ticks.iter() {
        writeln!(
            out,
            "{:>9.1}  {:>5}  {}",
            tick.at,
            format!("w_{}", tick.phase),
            &tick.label
        )
        .unwrap();
    }
}

pub fn format_params<'a>(out: &mut Box<dyn Write + 'a>, rep: &FileReport) {
    writeln!(out, "\n{}", underline("Run parameters")).unwrap();
    let width = rep.params.keys().map(|k| k.len()).max().unwrap_or(0);
    for (k, v) in rep.params.iter() {
        writeln!(out, "{:<w$} = {}", k, v, w = width).unwrap();
    }

    for task in rep.tasks.iter() {
        writeln!(out, "\n{}", underline(&format!("Task [{}]", task.index))).unwrap();
        if task.is_empty() {
            writeln!(out, "-").unwrap();
            continue;
        }
        let width = task.params.keys().map(|k| k.len()).max().unwrap_or(0);
        for (k, v) in task.params.iter() {
            writeln!(out, "{:<w$} = {}", k, v, w = width).unwrap();
        }
        if let Some(sine) = SineWave::from_params(task) {
            writeln!(
                out,
                "expected ops/s: {} * sin({} * t + {}) + {}",
                sine.a, sine.b, sine.c, sine.d
            )
            .unwrap();
        }
    }
}

pub fn format_io<'a>(out: &mut Box<dyn Write + 'a>, rep: &FileReport) {
    writeln!(out, "\n{}", underline("Interference IO")).unwrap();
    if rep.io_summary.is_empty() {
        writeln!(out, "No interference samples").unwrap();
        return;
    }
    writeln!(
        out,
        "{:>5}  {:>5}  {:>5}  {:>5}  {:>9}  {:>9}",
        "bs", "rand%", "wr%", "cnt", "total", "first"
    )
    .unwrap();
    for row in rep.io_summary.iter() {
        writeln!(
            out,
            "{:>5}  {:>5}  {:>5}  {:>5}  {:>9}  {:>9}",
            row.block_size
                .map(|v| v.to_string())
                .unwrap_or_else(|| "-".into()),
            format_ratio_pct(row.random_ratio),
            format_ratio_pct(row.write_ratio),
            row.samples,
            format!("{:.1}M", row.total_mibps),
            row.first_mibps
                .map(|v| format!("{:.1}M", v))
                .unwrap_or_else(|| "-".into()),
        )
        .unwrap();
    }
}

pub fn format_report(rep: &FileReport, mode: Mode, sort: bool) -> String {
    let mut buf = String::new();
    let mut out: Box<dyn Write + '_> = Box::new(&mut buf);
    format_header(&mut out, rep);
    match mode {
        Mode::Pressure => format_pressure(&mut out, rep, sort),
        Mode::Phases => format_phases(&mut out, rep),
        Mode::Params => format_params(&mut out, rep),
        Mode::Io => format_io(&mut out, rep),
    }
    drop(out);
    buf
}
