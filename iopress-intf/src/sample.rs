// Copyright (c) Facebook, Inc. and its affiliates.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use iop_util::Value;

pub type Fields = BTreeMap<String, Value>;

pub const TIME_KEY: &str = "time";
pub const OPS_KEY: &str = "ops_per_s";
pub const BLOCK_SIZE_KEY: &str = "block_size";
pub const RANDOM_RATIO_KEY: &str = "random_ratio";
pub const WRITE_RATIO_KEY: &str = "write_ratio";
pub const TOTAL_MIBPS_KEY: &str = "total_MiB/s";
pub const READ_MIBPS_KEY: &str = "read_MiB/s";
pub const WRITE_MIBPS_KEY: &str = "write_MiB/s";
pub const BLOCKS_PS_KEY: &str = "blocks/s";
pub const WAIT_KEY: &str = "wait";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThroughputSample {
    pub ops_per_s: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InterferenceSample {
    pub block_size: Option<i64>,
    pub random_ratio: f64,
    pub write_ratio: f64,
    pub total_mibps: f64,
    pub read_mibps: f64,
    pub write_mibps: f64,
    pub blocks_ps: Option<f64>,
    /// The generator is paused and doesn't generate any IO.
    pub wait: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SampleKind {
    Throughput(ThroughputSample),
    Interference(InterferenceSample),
    Other,
}

/// One STATS record. Recognized fields are lifted into `kind`, the rest
/// stay in `extra`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time: f64,
    #[serde(flatten)]
    pub kind: SampleKind,
    pub extra: Fields,
}

fn take_f64(fields: &mut Fields, key: &str) -> Option<f64> {
    match fields.get(key).and_then(|v| v.as_f64()) {
        Some(v) => {
            fields.remove(key);
            Some(v)
        }
        None => None,
    }
}

fn take_i64(fields: &mut Fields, key: &str) -> Option<i64> {
    match fields.get(key).and_then(|v| v.as_i64()) {
        Some(v) => {
            fields.remove(key);
            Some(v)
        }
        None => None,
    }
}

impl Sample {
    /// Returns None if there's no finite numeric "time" field.
    pub fn from_fields(mut fields: Fields) -> Option<Self> {
        let time = fields.get(TIME_KEY).and_then(|v| v.as_f64())?;
        if !time.is_finite() {
            return None;
        }
        fields.remove(TIME_KEY);

        let kind = if let Some(ops_per_s) = take_f64(&mut fields, OPS_KEY) {
            SampleKind::Throughput(ThroughputSample { ops_per_s })
        } else if fields.get(RANDOM_RATIO_KEY).and_then(|v| v.as_f64()).is_some()
            && fields.get(WRITE_RATIO_KEY).and_then(|v| v.as_f64()).is_some()
        {
            let wait = match fields.remove(WAIT_KEY) {
                Some(v) => v.is_true(),
                None => false,
            };
            SampleKind::Interference(InterferenceSample {
                block_size: take_i64(&mut fields, BLOCK_SIZE_KEY),
                random_ratio: take_f64(&mut fields, RANDOM_RATIO_KEY).unwrap_or(0.0),
                write_ratio: take_f64(&mut fields, WRITE_RATIO_KEY).unwrap_or(0.0),
                total_mibps: take_f64(&mut fields, TOTAL_MIBPS_KEY).unwrap_or(0.0),
                read_mibps: take_f64(&mut fields, READ_MIBPS_KEY).unwrap_or(0.0),
                write_mibps: take_f64(&mut fields, WRITE_MIBPS_KEY).unwrap_or(0.0),
                blocks_ps: take_f64(&mut fields, BLOCKS_PS_KEY),
                wait,
            })
        } else {
            SampleKind::Other
        };

        Some(Self {
            time,
            kind,
            extra: fields,
        })
    }

    pub fn ops_per_s(&self) -> Option<f64> {
        match &self.kind {
            SampleKind::Throughput(tp) => Some(tp.ops_per_s),
            _ => None,
        }
    }

    pub fn interference(&self) -> Option<&InterferenceSample> {
        match &self.kind {
            SampleKind::Interference(intf) => Some(intf),
            _ => None,
        }
    }

    /// Looks up a field by its name in the log regardless of whether it
    /// was recognized.
    pub fn get(&self, key: &str) -> Option<Value> {
        if key == TIME_KEY {
            return Some(Value::Float(self.time));
        }
        let known = match (&self.kind, key) {
            (SampleKind::Throughput(tp), OPS_KEY) => Some(Value::Float(tp.ops_per_s)),
            (SampleKind::Interference(intf), key) => match key {
                BLOCK_SIZE_KEY => intf.block_size.map(Value::Int),
                RANDOM_RATIO_KEY => Some(Value::Float(intf.random_ratio)),
                WRITE_RATIO_KEY => Some(Value::Float(intf.write_ratio)),
                TOTAL_MIBPS_KEY => Some(Value::Float(intf.total_mibps)),
                READ_MIBPS_KEY => Some(Value::Float(intf.read_mibps)),
                WRITE_MIBPS_KEY => Some(Value::Float(intf.write_mibps)),
                BLOCKS_PS_KEY => intf.blocks_ps.map(Value::Float),
                WAIT_KEY => Some(Value::Str(intf.wait.to_string())),
                _ => None,
            },
            _ => None,
        };
        known.or_else(|| self.extra.get(key).cloned())
    }
}

/// The samples reported by one task in log order. Immutable once built.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    task: String,
    samples: Vec<Sample>,
}

impl Series {
    pub fn new(task: &str, samples: Vec<Sample>) -> Self {
        Self {
            task: task.to_string(),
            samples,
        }
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first(&self) -> Option<&Sample> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    pub fn is_time_ordered(&self) -> bool {
        self.samples.windows(2).all(|w| w[0].time <= w[1].time)
    }
}

/// Invocation parameters of one benchmark instance.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskParams {
    pub index: usize,
    pub params: BTreeMap<String, Value>,
}

impl TaskParams {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            params: Default::default(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.params.get(key).and_then(|v| v.as_f64())
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, Value)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_throughput_sample() {
        let s = Sample::from_fields(fields(&[
            ("time", Value::Int(30)),
            ("ops_per_s", Value::Int(10000)),
            ("threads", Value::Int(8)),
        ]))
        .unwrap();
        assert_eq!(s.time, 30.0);
        assert_eq!(s.ops_per_s(), Some(10000.0));
        assert!(s.interference().is_none());
        assert_eq!(s.get("threads"), Some(Value::Int(8)));
        assert_eq!(s.get("ops_per_s"), Some(Value::Float(10000.0)));
        assert_eq!(s.extra.len(), 1);
    }

    #[test]
    fn test_interference_sample() {
        let s = Sample::from_fields(fields(&[
            ("time", Value::Float(62.0)),
            ("block_size", Value::Int(4)),
            ("random_ratio", Value::Float(0.5)),
            ("write_ratio", Value::Float(0.1)),
            ("total_MiB/s", Value::Float(120.0)),
            ("read_MiB/s", Value::Float(108.0)),
            ("write_MiB/s", Value::Float(12.0)),
            ("wait", Value::Str("false".into())),
            ("filename", Value::Str("/tmp/0".into())),
        ]))
        .unwrap();
        let intf = s.interference().unwrap();
        assert_eq!(intf.block_size, Some(4));
        assert_eq!(intf.random_ratio, 0.5);
        assert_eq!(intf.write_ratio, 0.1);
        assert_eq!(intf.blocks_ps, None);
        assert!(!intf.wait);
        assert_eq!(s.get("wait"), Some(Value::Str("false".into())));
        assert_eq!(s.get("filename"), Some(Value::Str("/tmp/0".into())));
        assert_eq!(s.get("blocks/s"), None);
    }

    #[test]
    fn test_untimed_and_other() {
        assert!(Sample::from_fields(fields(&[("ops_per_s", Value::Int(1))])).is_none());
        assert!(Sample::from_fields(fields(&[("time", Value::Str("x".into()))])).is_none());

        let s = Sample::from_fields(fields(&[
            ("time", Value::Int(1)),
            ("random_ratio", Value::Float(0.5)),
        ]))
        .unwrap();
        assert_eq!(s.kind, SampleKind::Other);
        assert_eq!(s.get("random_ratio"), Some(Value::Float(0.5)));
    }

    #[test]
    fn test_non_finite_time() {
        for time in &[std::f64::INFINITY, std::f64::NEG_INFINITY, std::f64::NAN] {
            let f = fields(&[("time", Value::Float(*time)), ("ops_per_s", Value::Int(1))]);
            assert!(Sample::from_fields(f).is_none());
        }
    }
}
