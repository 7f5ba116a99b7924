// Copyright (c) Facebook, Inc. and its affiliates.
use anyhow::{bail, Result};
use log::trace;

use super::cursor::LastState;
use super::error::AnalysisError;
use iopress_intf::{Phase, PhaseKey, PhaseTick, Series};

/// Turns the joint state of the interference generators into a sequence
/// of phases. Every change of the joint configuration mints a new phase
/// id, including a return to a configuration seen before. Must be driven
/// with non-decreasing query times.
pub struct PhaseSegmentator<'a> {
    cursors: Vec<LastState<'a>>,
    history: Vec<Phase>,
}

impl<'a> PhaseSegmentator<'a> {
    pub fn new(generators: &[&'a Series]) -> Self {
        Self {
            cursors: generators.iter().map(|s| LastState::new(s)).collect(),
            history: vec![],
        }
    }

    pub fn nr_generators(&self) -> usize {
        self.cursors.len()
    }

    /// Joint configuration of the generators which aren't waiting at `t`.
    pub fn key_at(&mut self, t: f64) -> Result<PhaseKey, AnalysisError> {
        let mut patterns = vec![];
        for cursor in self.cursors.iter_mut() {
            if let Some(intf) = cursor.at(t)?.interference() {
                if !intf.wait {
                    patterns.push((intf.random_ratio, intf.write_ratio));
                }
            }
        }
        Ok(PhaseKey::from_patterns(patterns))
    }

    pub fn label_at(&mut self, t: f64) -> Result<String, AnalysisError> {
        Ok(self.key_at(t)?.to_string())
    }

    pub fn phase_at(&mut self, t: f64) -> Result<&Phase, AnalysisError> {
        let key = self.key_at(t)?;
        let changed = match self.history.last() {
            Some(cur) => cur.key != key,
            None => true,
        };
        if changed {
            let phase = Phase {
                id: self.history.len() as u64,
                label: key.to_string(),
                key,
                active_from: t,
            };
            trace!(
                "phase: {} {:?} from {}",
                phase.tick_label(),
                &phase.label,
                t
            );
            self.history.push(phase);
        }
        // history is non-empty at this point
        Ok(&self.history[self.history.len() - 1])
    }

    /// All phases minted so far in id order.
    pub fn phases(&self) -> &[Phase] {
        &self.history
    }

    pub fn into_phases(self) -> Vec<Phase> {
        self.history
    }

    /// Sweeps from `start` to `end` inclusive in `step` increments and
    /// returns where each phase begins.
    pub fn phase_ticks(&mut self, start: f64, end: f64, step: f64) -> Result<Vec<PhaseTick>> {
        if step.is_nan() || step <= 0.0 {
            bail!("phase tick step must be positive, got {}", step);
        }
        if !start.is_finite() || !end.is_finite() {
            bail!("phase tick range must be finite, got {}..{}", start, end);
        }

        let mut ticks: Vec<PhaseTick> = vec![];
        let mut idx: u64 = 0;
        loop {
            let at = start + idx as f64 * step;
            if at > end {
                break;
            }
            let phase = self.phase_at(at)?;
            if ticks.last().map(|tick| tick.phase) != Some(phase.id) {
                ticks.push(PhaseTick {
                    at,
                    phase: phase.id,
                    label: phase.label.clone(),
                });
            }
            idx += 1;
        }
        Ok(ticks)
    }
}
