// Copyright (c) Facebook, Inc. and its affiliates.
use anyhow::{Context, Result};
use log::{debug, warn};
use regex::Regex;
use std::io::BufRead;

use super::extract::LogLines;
use iop_util::*;
use iopress_intf::TaskParams;

lazy_static::lazy_static! {
    static ref QUOTED_RE: Regex = Regex::new(r#"^\s*([^=\s][^=]*)="([^"]+)""#).unwrap();
    static ref PLAIN_RE: Regex = Regex::new(r"^\s*([^=\s][^=]*)=(\S+)").unwrap();
    static ref BLOCK_END_RE: Regex = Regex::new(r"^\[").unwrap();
}

/// Command block being scanned.
struct Block {
    idx: usize,
    seen_delim: bool,
}

fn parse_flags(line: &str, params: &mut TaskParams) {
    for part in line.split("--") {
        let (key, val) = if let Some(caps) = QUOTED_RE.captures(part) {
            (caps[1].trim().to_string(), caps[2].to_string())
        } else if let Some(caps) = PLAIN_RE.captures(part) {
            (caps[1].trim().to_string(), caps[2].to_string())
        } else {
            continue;
        };
        params.params.insert(key, coerce(&val, INT_FLOAT));
    }
}

fn end_block(block: Option<Block>, kind: &str, nr_warnings: &mut usize) {
    if let Some(block) = block {
        if !block.seen_delim {
            warn!(
                "task_params: No parameters found in the command of {}[{}]",
                kind, block.idx
            );
            *nr_warnings += 1;
        }
    }
}

/// Recovers the command line parameters of each `kind` instance from the
/// "Executing KIND[IDX]... Command:" blocks. The number of instances is
/// read from the `count_param` run parameter, which must precede the
/// blocks. Returns one record per instance in index order and the number
/// of warnings.
pub fn extract_task_params<R: BufRead>(
    reader: R,
    kind: &str,
    count_param: &str,
) -> Result<(Vec<TaskParams>, usize)> {
    let count_re = Regex::new(&format!(r"Args\.{}: *([0-9]+)", regex::escape(count_param)))?;
    let exec_re = Regex::new(&format!(
        r"Executing *{}\[([0-9]+)\]. *Command:",
        regex::escape(kind)
    ))?;

    let mut tasks: Vec<TaskParams> = vec![];
    let mut nr_tasks: Option<usize> = None;
    let mut block: Option<Block> = None;
    let mut nr_warnings = 0;

    let mut lines = LogLines::new(reader);
    while let Some(line) = lines.next() {
        let line = line.with_context(|| format!("Reading line {}", lines.lineno() + 1))?;

        let nr = match nr_tasks {
            Some(v) => v,
            None => {
                if let Some(caps) = count_re.captures(&line) {
                    let nr = caps[1].parse::<usize>()?;
                    tasks = (0..nr).map(TaskParams::new).collect();
                    nr_tasks = Some(nr);
                }
                continue;
            }
        };

        if let Some(caps) = exec_re.captures(&line) {
            end_block(block.take(), kind, &mut nr_warnings);
            let idx = caps[1].parse::<usize>()?;
            if idx < nr {
                block = Some(Block {
                    idx,
                    seen_delim: false,
                });
            } else {
                warn!(
                    "task_params: {}[{}] out of range, only {} declared",
                    kind, idx, nr
                );
                nr_warnings += 1;
            }
            continue;
        }

        if BLOCK_END_RE.is_match(&line) {
            let last = block.as_ref().map(|b| b.idx + 1 == nr).unwrap_or(false);
            end_block(block.take(), kind, &mut nr_warnings);
            if last {
                break;
            }
            continue;
        }

        if let Some(cur) = block.as_mut() {
            if line.contains("--") {
                cur.seen_delim = true;
            }
            parse_flags(&line, &mut tasks[cur.idx]);
        }
    }
    end_block(block.take(), kind, &mut nr_warnings);

    debug!(
        "task_params: {} {} instances, {} warnings",
        tasks.len(),
        kind,
        nr_warnings
    );
    Ok((tasks, nr_warnings))
}

/// Synthetic load shape `a * sin(b * x + c) + d` a throughput benchmark
/// instance was asked to follow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SineWave {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl SineWave {
    /// Only instances with `sine_d` follow a sine wave. Missing
    /// coefficients are zero.
    pub fn from_params(params: &TaskParams) -> Option<Self> {
        let d = params.get_f64("sine_d")?;
        Some(Self {
            a: params.get_f64("sine_a").unwrap_or(0.0),
            b: params.get_f64("sine_b").unwrap_or(0.0),
            c: params.get_f64("sine_c").unwrap_or(0.0),
            d,
        })
    }

    pub fn expected(&self, x: f64) -> f64 {
        self.a * (self.b * x + self.c).sin() + self.d
    }
}
