// Copyright (c) Facebook, Inc. and its affiliates.
use log::debug;
use std::collections::BTreeMap;

use super::error::AnalysisError;
use super::phase::PhaseSegmentator;
use super::study::StudyMeanPcts;
use iopress_intf::{PressureResult, PressureRow, Sample, Series};

/// Attributes the primary workload's throughput samples to the phase
/// active at each sample's time and scores every phase against the
/// idle baseline.
pub fn aggregate(
    primary: &Series,
    seg: &mut PhaseSegmentator,
) -> Result<PressureResult, AnalysisError> {
    aggregate_samples(primary.samples().iter(), seg)
}

/// Same as `aggregate()` over an arbitrary time-ordered sample sequence,
/// e.g. with the beginning of the run cut off.
pub fn aggregate_samples<'s, I>(
    samples: I,
    seg: &mut PhaseSegmentator,
) -> Result<PressureResult, AnalysisError>
where
    I: IntoIterator<Item = &'s Sample>,
{
    let mut studies = BTreeMap::<u64, StudyMeanPcts>::new();
    for sample in samples {
        let ops = match sample.ops_per_s() {
            Some(v) => v,
            None => continue,
        };
        let phase = seg.phase_at(sample.time)?.id;
        studies
            .entry(phase)
            .or_insert_with(|| StudyMeanPcts::new(None))
            .study(ops);
    }

    let phases = seg.phases();
    let mut rows: Vec<PressureRow> = studies
        .into_iter()
        .map(|(id, study)| {
            let phase = &phases[id as usize];
            PressureRow {
                phase: id,
                label: phase.label.clone(),
                active_from: phase.active_from,
                samples: study.len(),
                mean_ops_per_s: study.mean(),
                normalized_pressure: None,
                stdev: study.stdev(),
                min: study.min(),
                p50: study.pct(50.0),
                max: study.max(),
            }
        })
        .collect();

    let baseline = rows
        .iter()
        .find(|row| phases[row.phase as usize].is_idle())
        .map(|row| (row.phase, row.mean_ops_per_s));

    if let Some((id, base)) = baseline {
        if base != 0.0 {
            for row in rows.iter_mut() {
                row.normalized_pressure = Some((base - row.mean_ops_per_s) / base);
            }
        } else {
            debug!("pressure: Baseline phase {} has zero throughput", id);
        }
    } else if !rows.is_empty() {
        debug!("pressure: No idle phase with samples, pressure unavailable");
    }

    Ok(PressureResult {
        baseline: baseline.map(|(id, _)| id),
        rows,
    })
}

/// Ids of the rows whose pressure is lower than the highest pressure seen
/// in the preceding rows.
pub fn decreased_phases(rows: &[PressureRow]) -> Vec<u64> {
    let mut decreased = vec![];
    let mut max: Option<f64> = None;
    for row in rows.iter() {
        let pressure = match row.normalized_pressure {
            Some(v) => v,
            None => continue,
        };
        match max {
            Some(max) if pressure < max => decreased.push(row.phase),
            _ => max = Some(pressure),
        }
    }
    decreased
}

/// Rows ordered by descending pressure. Rows without pressure go last and
/// ties keep their phase order.
pub fn sorted_by_pressure(rows: &[PressureRow]) -> Vec<PressureRow> {
    let mut sorted = rows.to_vec();
    sorted.sort_by(|a, b| {
        let pa = a.normalized_pressure.unwrap_or(std::f64::NEG_INFINITY);
        let pb = b.normalized_pressure.unwrap_or(std::f64::NEG_INFINITY);
        pb.total_cmp(&pa)
    });
    sorted
}
