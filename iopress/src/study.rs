// Copyright (c) Facebook, Inc. and its affiliates.
use num_traits::cast::AsPrimitive;
use quantiles::ckms::CKMS;
use std::collections::BTreeMap;

use iopress_intf::{IoSummaryRow, Ratio, Series};

//
// Calculate mean, stdev and percentiles of a set of values.
//
pub struct StudyMeanPcts {
    ckms: CKMS<f64>,
    data: Vec<f64>,
}

impl StudyMeanPcts {
    pub fn new(error: Option<f64>) -> Self {
        const CKMS_DFL_ERROR: f64 = 0.001;
        Self {
            ckms: CKMS::<f64>::new(error.unwrap_or(CKMS_DFL_ERROR)),
            data: vec![],
        }
    }

    pub fn study<T: AsPrimitive<f64>>(&mut self, v: T) {
        self.ckms.insert(v.as_());
        self.data.push(v.as_());
    }

    pub fn study_data<T: AsPrimitive<f64>>(&mut self, data: &[T]) {
        for v in data {
            self.study(*v);
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn mean(&self) -> f64 {
        if self.data.is_empty() {
            0.0
        } else {
            statistical::mean(&self.data)
        }
    }

    pub fn stdev(&self) -> f64 {
        if self.data.len() <= 1 {
            0.0
        } else {
            statistical::standard_deviation(&self.data, None)
        }
    }

    pub fn min(&self) -> f64 {
        self.data.iter().cloned().fold(std::f64::NAN, f64::min)
    }

    pub fn max(&self) -> f64 {
        self.data.iter().cloned().fold(std::f64::NAN, f64::max)
    }

    /// `pct` in [0, 100]. Approximate within the CKMS error bound.
    pub fn pct(&self, pct: f64) -> f64 {
        self.ckms.query(pct / 100.0).map(|x| x.1).unwrap_or(0.0)
    }
}

/// Averages `(x, y)` points over `interval` wide buckets of x. Each bucket
/// is reported at its center. A non-positive interval returns the points
/// unchanged.
pub fn bucket_means(points: &[(f64, f64)], interval: f64) -> Vec<(f64, f64)> {
    if interval.is_nan() || interval <= 0.0 {
        return points.to_vec();
    }

    let mut buckets = BTreeMap::<i64, (f64, usize)>::new();
    for (x, y) in points.iter() {
        let idx = (x / interval).floor() as i64;
        let ent = buckets.entry(idx).or_insert((0.0, 0));
        ent.0 += y;
        ent.1 += 1;
    }
    buckets
        .into_iter()
        .map(|(idx, (sum, cnt))| {
            (
                idx as f64 * interval + interval / 2.0,
                sum / cnt as f64,
            )
        })
        .collect()
}

/// Drops points before `start` and shifts the rest so that x starts at 0.
pub fn cut_begin(points: &[(f64, f64)], start: f64) -> Vec<(f64, f64)> {
    points
        .iter()
        .filter(|(x, _)| *x >= start)
        .map(|(x, y)| (x - start, *y))
        .collect()
}

/// `(time, ops_per_s)` of the throughput samples of a series.
pub fn throughput_points(series: &Series) -> Vec<(f64, f64)> {
    series
        .samples()
        .iter()
        .filter_map(|s| s.ops_per_s().map(|ops| (s.time, ops)))
        .collect()
}

/// Per access pattern throughput of the interference generators. Samples
/// taken while a generator was waiting are ignored.
pub fn io_summary(generators: &[&Series]) -> Vec<IoSummaryRow> {
    #[derive(Default)]
    struct Acc {
        all: Vec<f64>,
        first: Vec<f64>,
    }

    let mut groups = BTreeMap::<(Option<i64>, Ratio, Ratio), Acc>::new();
    for (gen_idx, gen) in generators.iter().enumerate() {
        for intf in gen.samples().iter().filter_map(|s| s.interference()) {
            if intf.wait {
                continue;
            }
            let acc = groups
                .entry((
                    intf.block_size,
                    Ratio(intf.random_ratio),
                    Ratio(intf.write_ratio),
                ))
                .or_default();
            acc.all.push(intf.total_mibps);
            if gen_idx == 0 {
                acc.first.push(intf.total_mibps);
            }
        }
    }

    groups
        .into_iter()
        .map(|((block_size, rr, wr), acc)| {
            let first_mibps = match acc.first.len() {
                0 => None,
                _ => Some(statistical::mean(&acc.first)),
            };
            IoSummaryRow {
                block_size,
                random_ratio: rr.0,
                write_ratio: wr.0,
                samples: acc.all.len(),
                total_mibps: statistical::mean(&acc.all) * generators.len() as f64,
                first_mibps,
            }
        })
        .collect()
}
