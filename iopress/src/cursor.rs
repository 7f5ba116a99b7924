// Copyright (c) Facebook, Inc. and its affiliates.
use super::error::AnalysisError;
use iopress_intf::{Sample, Series};

/// Answers "what was the last sample of the series at or before t".
///
/// Queries are expected to arrive in non-decreasing time order, in which
/// case the cursor only moves forward and a sweep over the whole series
/// costs O(n) in total. A query earlier than the previous one resets the
/// cursor to the start of the series.
#[derive(Debug, Clone)]
pub struct LastState<'a> {
    series: &'a Series,
    cursor: usize,
    last_t: Option<f64>,
}

impl<'a> LastState<'a> {
    pub fn new(series: &'a Series) -> Self {
        Self {
            series,
            cursor: 0,
            last_t: None,
        }
    }

    pub fn series(&self) -> &'a Series {
        self.series
    }

    /// Returns the latest sample with `time <= t`, or the first sample if
    /// `t` precedes all of them.
    pub fn at(&mut self, t: f64) -> Result<&'a Sample, AnalysisError> {
        let samples = self.series.samples();
        if samples.is_empty() {
            return Err(AnalysisError::EmptySeries {
                task: self.series.task().to_string(),
            });
        }

        match self.last_t {
            Some(last_t) if t >= last_t => {}
            _ => self.cursor = 0,
        }
        self.last_t = Some(t);

        while self.cursor + 1 < samples.len() && samples[self.cursor + 1].time <= t {
            self.cursor += 1;
        }
        Ok(&samples[self.cursor])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iopress_intf::Fields;
    use iop_util::Value;

    fn series_at(task: &str, times: &[f64]) -> Series {
        let samples = times
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let mut fields = Fields::new();
                fields.insert("time".into(), Value::Float(*t));
                fields.insert("ops_per_s".into(), Value::Int(i as i64));
                Sample::from_fields(fields).unwrap()
            })
            .collect();
        Series::new(task, samples)
    }

    #[test]
    fn test_last_state() {
        let s = series_at("ycsb[0]", &[10.0, 20.0, 30.0, 30.0, 40.0]);
        let mut ls = LastState::new(&s);

        assert_eq!(ls.at(5.0).unwrap().time, 10.0);
        assert_eq!(ls.at(10.0).unwrap().time, 10.0);
        assert_eq!(ls.at(19.9).unwrap().time, 10.0);
        assert_eq!(ls.at(25.0).unwrap().time, 20.0);
        assert_eq!(ls.at(30.0).unwrap().ops_per_s(), Some(3.0));
        assert_eq!(ls.at(1000.0).unwrap().time, 40.0);
    }

    #[test]
    fn test_last_state_monotonic() {
        let times: Vec<f64> = (0..50).map(|i| (i * 3) as f64).collect();
        let s = series_at("db_bench[0]", &times);
        let mut ls = LastState::new(&s);

        let mut prev = std::f64::NEG_INFINITY;
        let mut t = 0.0;
        while t < 160.0 {
            let sample = ls.at(t).unwrap();
            assert!(sample.time >= prev);
            assert!(sample.time <= t);
            prev = sample.time;
            t += 0.7;
        }
    }

    #[test]
    fn test_last_state_rewind() {
        let s = series_at("ycsb[0]", &[10.0, 20.0, 30.0]);
        let mut ls = LastState::new(&s);

        assert_eq!(ls.at(35.0).unwrap().time, 30.0);
        assert_eq!(ls.at(15.0).unwrap().time, 10.0);
        assert_eq!(ls.at(25.0).unwrap().time, 20.0);
        assert_eq!(ls.at(0.0).unwrap().time, 10.0);
    }

    #[test]
    fn test_last_state_empty() {
        let s = series_at("access_time3[0]", &[]);
        let mut ls = LastState::new(&s);
        match ls.at(1.0) {
            Err(AnalysisError::EmptySeries { task }) => assert_eq!(task, "access_time3[0]"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
