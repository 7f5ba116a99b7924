// Copyright (c) Facebook, Inc. and its affiliates.
use chrono::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use super::{Series, TaskParams};
use iop_util::*;

/// f64 with a total order so that it can be used in keys.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ratio(pub f64);

impl PartialEq for Ratio {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ratio {}

impl PartialOrd for Ratio {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ratio {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// `count` active generators running the same access pattern.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PhaseGroup {
    pub random_ratio: Ratio,
    pub write_ratio: Ratio,
    pub count: usize,
}

impl fmt::Display for PhaseGroup {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}×rand{}write{}",
            self.count,
            format_ratio_pct(self.random_ratio.0),
            format_ratio_pct(self.write_ratio.0)
        )
    }
}

/// Canonical description of the joint interference configuration. The
/// groups are sorted by access pattern so that two keys compare equal
/// iff the same multiset of patterns is active, independent of which
/// generator runs which pattern.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PhaseKey(pub Vec<PhaseGroup>);

impl PhaseKey {
    pub const IDLE_LABEL: &'static str = "w0";

    /// Builds the key from the `(random_ratio, write_ratio)` pairs of the
    /// currently active generators.
    pub fn from_patterns<I>(patterns: I) -> Self
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut counts = BTreeMap::<(Ratio, Ratio), usize>::new();
        for (rr, wr) in patterns {
            *counts.entry((Ratio(rr), Ratio(wr))).or_insert(0) += 1;
        }
        Self(
            counts
                .into_iter()
                .map(|((random_ratio, write_ratio), count)| PhaseGroup {
                    random_ratio,
                    write_ratio,
                    count,
                })
                .collect(),
        )
    }

    /// No interference active.
    pub fn is_idle(&self) -> bool {
        self.0.is_empty()
    }

    pub fn nr_active(&self) -> usize {
        self.0.iter().map(|g| g.count).sum()
    }
}

/// Renders the phase label. Groups appear in canonical
/// `(random_ratio, write_ratio)` order rather than in the order the
/// generators were encountered, so the same set of active patterns always
/// yields the same label, e.g. "1×rand50write10|2×rand100write0".
impl fmt::Display for PhaseKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_idle() {
            return write!(f, "{}", Self::IDLE_LABEL);
        }
        let mut first = true;
        for group in self.0.iter() {
            write!(f, "{}{}", if first { "" } else { "|" }, group)?;
            first = false;
        }
        Ok(())
    }
}

/// A maximal stretch of time with constant interference configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub id: u64,
    pub label: String,
    pub key: PhaseKey,
    /// Query time at which the phase was first observed.
    pub active_from: f64,
}

impl Phase {
    pub fn is_idle(&self) -> bool {
        self.key.is_idle()
    }

    /// Axis tick label, e.g. "w_3".
    pub fn tick_label(&self) -> String {
        format!("w_{}", self.id)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhaseTick {
    pub at: f64,
    pub phase: u64,
    pub label: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PressureRow {
    pub phase: u64,
    pub label: String,
    pub active_from: f64,
    pub samples: usize,
    pub mean_ops_per_s: f64,
    /// (baseline_mean - mean) / baseline_mean, None without a usable
    /// baseline.
    pub normalized_pressure: Option<f64>,
    pub stdev: f64,
    pub min: f64,
    pub p50: f64,
    pub max: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PressureResult {
    /// Id of the first idle phase which has samples.
    pub baseline: Option<u64>,
    /// In phase id order.
    pub rows: Vec<PressureRow>,
}

impl PressureResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, phase: u64) -> Option<&PressureRow> {
        self.rows.iter().find(|row| row.phase == phase)
    }

    pub fn baseline_row(&self) -> Option<&PressureRow> {
        self.baseline.and_then(|id| self.row(id))
    }
}

/// Interference generator throughput for one access pattern.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IoSummaryRow {
    pub block_size: Option<i64>,
    pub random_ratio: f64,
    pub write_ratio: f64,
    pub samples: usize,
    /// Mean per-generator MiB/s scaled by the number of generators.
    pub total_mibps: f64,
    /// Mean MiB/s of the first generator alone.
    pub first_mibps: Option<f64>,
}

/// Everything derived from one log file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileReport {
    pub file: String,
    pub analyzed_at: DateTime<Local>,
    pub params: BTreeMap<String, Value>,
    pub tasks: Vec<TaskParams>,
    pub series_lens: BTreeMap<String, usize>,
    pub nr_warnings: usize,
    pub primary: Option<String>,
    pub nr_interference: usize,
    pub phases: Vec<Phase>,
    pub ticks: Vec<PhaseTick>,
    /// `(time, ops_per_s)` of the primary workload averaged over the mean
    /// interval.
    pub throughput_means: Vec<(f64, f64)>,
    pub pressure: PressureResult,
    pub decreased: Vec<u64>,
    pub io_summary: Vec<IoSummaryRow>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub series: Option<BTreeMap<String, Series>>,
}
