// Copyright (c) Facebook, Inc. and its affiliates.
use anyhow::{Context, Result};
use log::{debug, warn};
use regex::Regex;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use super::error::AnalysisError;
use iop_util::*;
use iopress_intf::{Fields, Sample, Series};

lazy_static::lazy_static! {
    static ref PARAM_RE: Regex = Regex::new(r"Args\.([^:]+): *(.+)").unwrap();
    static ref STATS_RE: Regex = Regex::new(r"Task ([^,]+), STATS: (.+)").unwrap();
}

/// Instances of one task kind are named "KIND[IDX]".
pub const MAX_INSTANCES: usize = 1024;

pub fn task_name(kind: &str, idx: usize) -> String {
    format!("{}[{}]", kind, idx)
}

/// Run parameters and per-task series recovered from one log.
#[derive(Debug, Default)]
pub struct LogData {
    pub params: BTreeMap<String, Value>,
    pub series: BTreeMap<String, Series>,
    pub nr_warnings: usize,
}

/// Line iterator over a log stream which tolerates invalid UTF-8. Such
/// lines are decoded lossily, logged and counted in `nr_invalid`.
pub struct LogLines<R> {
    reader: R,
    buf: Vec<u8>,
    lineno: usize,
    pub nr_invalid: usize,
}

impl<R: BufRead> LogLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: vec![],
            lineno: 0,
            nr_invalid: 0,
        }
    }

    pub fn lineno(&self) -> usize {
        self.lineno
    }
}

impl<R: BufRead> Iterator for LogLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<io::Result<String>> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => return None,
            Ok(_) => {}
            Err(e) => return Some(Err(e)),
        }
        self.lineno += 1;
        if self.buf.ends_with(b"\n") {
            self.buf.pop();
            if self.buf.ends_with(b"\r") {
                self.buf.pop();
            }
        }
        Some(Ok(match String::from_utf8_lossy(&self.buf) {
            Cow::Borrowed(line) => line.to_string(),
            Cow::Owned(line) => {
                warn!("extract: Line {} is not valid UTF-8", self.lineno);
                self.nr_invalid += 1;
                line
            }
        }))
    }
}

enum Line {
    Param(String, Value),
    Stats(String, Option<Fields>),
    Other,
}

fn parse_stats_json(task: &str, body: &str) -> Option<Fields> {
    let parsed: serde_json::Value = match serde_json::from_str(body.trim()) {
        Ok(v) => v,
        Err(e) => {
            warn!("extract: Malformed STATS json for task {:?} ({}): {}", task, &e, body);
            return None;
        }
    };
    let obj = match parsed.as_object() {
        Some(v) => v,
        None => {
            warn!("extract: STATS for task {:?} is not an object: {}", task, body);
            return None;
        }
    };

    let mut fields = Fields::new();
    for (k, v) in obj.iter() {
        let val = match v {
            serde_json::Value::String(s) => coerce(s, INT_FLOAT_DECIMAL),
            v => Value::from(v),
        };
        fields.insert(k.to_string(), val);
    }
    Some(fields)
}

fn parse_line(line: &str) -> Line {
    if let Some(caps) = STATS_RE.captures(line) {
        let task = caps[1].to_string();
        let fields = parse_stats_json(&task, &caps[2]);
        Line::Stats(task, fields)
    } else if let Some(caps) = PARAM_RE.captures(line) {
        Line::Param(caps[1].to_string(), coerce(caps[2].trim(), INT_FLOAT))
    } else {
        Line::Other
    }
}

/// Extracts run parameters and per-task series from a log stream. Lines
/// which fail to parse are logged and skipped. The first sample of each
/// task is dropped as it covers a partial interval.
pub fn extract<R: BufRead>(reader: R) -> Result<LogData> {
    let mut params = BTreeMap::new();
    let mut samples = BTreeMap::<String, Vec<Sample>>::new();
    let mut nr_warnings = 0;

    let mut lines = LogLines::new(reader);
    while let Some(line) = lines.next() {
        let line = line.with_context(|| format!("Reading line {}", lines.lineno() + 1))?;
        match parse_line(&line) {
            Line::Param(name, val) => {
                params.insert(name, val);
            }
            Line::Stats(task, Some(fields)) => match Sample::from_fields(fields) {
                Some(sample) => samples.entry(task).or_default().push(sample),
                None => {
                    warn!(
                        "extract: STATS for task {:?} without finite numeric time, skipping",
                        &task
                    );
                    nr_warnings += 1;
                }
            },
            Line::Stats(_, None) => nr_warnings += 1,
            Line::Other => {}
        }
    }
    nr_warnings += lines.nr_invalid;

    let series = samples
        .into_iter()
        .map(|(task, mut samples)| {
            samples.remove(0);
            let series = Series::new(&task, samples);
            if !series.is_time_ordered() {
                warn!("extract: Samples of task {:?} are not in time order", &task);
            }
            debug!("extract: {} has {} samples", &task, series.len());
            (task, series)
        })
        .collect();

    Ok(LogData {
        params,
        series,
        nr_warnings,
    })
}

pub fn open_log<P: AsRef<Path>>(path: P) -> Result<BufReader<fs::File>> {
    let path = path.as_ref();
    match fs::OpenOptions::new().read(true).open(path) {
        Ok(f) => Ok(BufReader::new(f)),
        Err(e) => Err(AnalysisError::MissingFile {
            path: path.to_path_buf(),
            source: e,
        }
        .into()),
    }
}

pub fn extract_file<P: AsRef<Path>>(path: P) -> Result<LogData> {
    let path = path.as_ref();
    extract(open_log(path)?).with_context(|| format!("Extracting {:?}", path))
}

impl LogData {
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    pub fn param_i64(&self, name: &str) -> Option<i64> {
        self.params.get(name).and_then(|v| v.as_i64())
    }

    pub fn series(&self, task: &str) -> Result<&Series, AnalysisError> {
        self.series
            .get(task)
            .ok_or_else(|| AnalysisError::UnknownTask {
                task: task.to_string(),
            })
    }

    /// Number of consecutive instances "KIND[0]", "KIND[1]"... present.
    pub fn count_tasks(&self, kind: &str) -> usize {
        (0..MAX_INSTANCES)
            .take_while(|idx| self.series.contains_key(&task_name(kind, *idx)))
            .count()
    }

    /// The first instance of the first kind in `kinds` which exists.
    pub fn primary_series(&self, kinds: &[String]) -> Option<&Series> {
        kinds
            .iter()
            .filter_map(|kind| self.series.get(&task_name(kind, 0)))
            .next()
    }

    pub fn interference_series(&self, kind: &str) -> Vec<&Series> {
        (0..self.count_tasks(kind))
            .map(|idx| &self.series[&task_name(kind, idx)])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iop_util::Value;

    const LOG: &str = r#"[2020-05-16 08:54:54.123] [info] Initializing program build/rocksdb_test
[2020-05-16 08:54:54.124] [info] Args.num_dbs: 1
[2020-05-16 08:54:54.124] [info] Args.num_at: 1
[2020-05-16 08:54:54.124] [info] Args.stats_interval: 5
[2020-05-16 08:54:54.124] [info] Args.at_params[0]: --direct_io
[2020-05-16 08:55:00.000] [info] Task db_bench[0], STATS: {"time":"5", "ops_per_s":"1.2K", "threads":"4"}
[2020-05-16 08:55:00.000] [info] Task access_time3[0], STATS: {"time":"5", "block_size":"4", "random_ratio":"0.5", "write_ratio":"0", "total_MiB/s":"10.5", "read_MiB/s":"10.5", "write_MiB/s":"0", "wait":"true"}
[2020-05-16 08:55:05.000] [info] Task db_bench[0], STATS: {"time":"10", "ops_per_s":"10000", "threads":"4"}
[2020-05-16 08:55:05.000] [info] Task access_time3[0], STATS: {"time":"10", "block_size":"4", "random_ratio":"0.5", "write_ratio":"0.1", "total_MiB/s":"20", "read_MiB/s":"18", "write_MiB/s":"2", "wait":"false"}
[2020-05-16 08:55:10.000] [info] Task db_bench[0], STATS: {"time":"15", "ops_per_s":"6000", "threads":"4"}
[2020-05-16 08:55:10.000] [warning] Task db_bench[0], stderr: something odd
"#;

    #[test]
    fn test_extract() {
        let data = extract(LOG.as_bytes()).unwrap();
        assert_eq!(data.nr_warnings, 0);
        assert_eq!(data.param_i64("num_dbs"), Some(1));
        assert_eq!(data.param_i64("stats_interval"), Some(5));
        assert_eq!(
            data.param("at_params[0]"),
            Some(&Value::Str("--direct_io".into()))
        );

        let db = data.series("db_bench[0]").unwrap();
        assert_eq!(db.len(), 2);
        assert_eq!(db.samples()[0].time, 10.0);
        assert_eq!(db.samples()[0].ops_per_s(), Some(10000.0));
        assert_eq!(db.samples()[1].ops_per_s(), Some(6000.0));
        assert_eq!(db.samples()[0].get("threads"), Some(Value::Int(4)));

        let at = data.series("access_time3[0]").unwrap();
        assert_eq!(at.len(), 1);
        let intf = at.samples()[0].interference().unwrap();
        assert!(!intf.wait);
        assert_eq!(intf.write_ratio, 0.1);
        assert_eq!(intf.total_mibps, 20.0);
    }

    #[test]
    fn test_warmup_sample_dropped() {
        let mut log = String::new();
        for i in 0..5 {
            log += &format!(
                "Task ycsb[0], STATS: {{\"time\":\"{}\", \"ops_per_s\":\"{}\"}}\n",
                i * 5,
                100 + i
            );
        }
        log += "Task ycsb[1], STATS: {\"time\":\"0\", \"ops_per_s\":\"1\"}\n";

        let data = extract(log.as_bytes()).unwrap();
        let s = data.series("ycsb[0]").unwrap();
        assert_eq!(s.len(), 4);
        assert_eq!(s.first().unwrap().ops_per_s(), Some(101.0));
        assert!(data.series("ycsb[1]").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_stats() {
        let _ = ::env_logger::try_init();
        let log = r#"Task ycsb[0], STATS: {"time":"0", "ops_per_s":"1"}
Task ycsb[0], STATS: {"time":"5", "ops_per_s":"2"}
Task ycsb[0], STATS: {"time":"10", "ops_per_s":
Task ycsb[0], STATS: {"time":"15", "ops_per_s":"4"}
Task ycsb[0], STATS: {"time":"20", "ops_per_s":"5"}
"#;
        let data = extract(log.as_bytes()).unwrap();
        assert_eq!(data.nr_warnings, 1);
        let s = data.series("ycsb[0]").unwrap();
        assert_eq!(s.len(), 5 - 1 - 1);
        let times: Vec<f64> = s.samples().iter().map(|x| x.time).collect();
        assert_eq!(times, vec![5.0, 15.0, 20.0]);
    }

    #[test]
    fn test_invalid_utf8_line() {
        let _ = ::env_logger::try_init();
        let mut log: Vec<u8> = vec![];
        log.extend_from_slice(b"Task ycsb[0], STATS: {\"time\":\"0\", \"ops_per_s\":\"1\"}\n");
        log.extend_from_slice(b"Task ycsb[0], STATS: {\"time\":\"5\", \"ops_per_s\":\"2\"}\n");
        log.extend_from_slice(b"Task ycsb[0], stderr: \xff\xfe garbage\n");
        log.extend_from_slice(b"Task ycsb[0], STATS: {\"time\":\"10\", \"ops_per_s\":\"3\"}\r\n");

        let data = extract(&log[..]).unwrap();
        assert_eq!(data.nr_warnings, 1);
        let s = data.series("ycsb[0]").unwrap();
        let times: Vec<f64> = s.samples().iter().map(|x| x.time).collect();
        assert_eq!(times, vec![5.0, 10.0]);
        assert_eq!(s.last().unwrap().ops_per_s(), Some(3.0));
    }

    #[test]
    fn test_non_finite_time_skipped() {
        let log = r#"Task ycsb[0], STATS: {"time":"0", "ops_per_s":"1"}
Task ycsb[0], STATS: {"time":"5", "ops_per_s":"2"}
Task ycsb[0], STATS: {"time":"1e400", "ops_per_s":"3"}
Task ycsb[0], STATS: {"time":"nan", "ops_per_s":"4"}
Task ycsb[0], STATS: {"time":"10", "ops_per_s":"5"}
"#;
        let data = extract(log.as_bytes()).unwrap();
        assert_eq!(data.nr_warnings, 2);
        let s = data.series("ycsb[0]").unwrap();
        let times: Vec<f64> = s.samples().iter().map(|x| x.time).collect();
        assert_eq!(times, vec![5.0, 10.0]);
    }

    #[test]
    fn test_empty_input() {
        let data = extract("".as_bytes()).unwrap();
        assert!(data.params.is_empty());
        assert!(data.series.is_empty());
        assert_eq!(data.nr_warnings, 0);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = extract_file(dir.path().join("nope.out")).unwrap_err();
        match err.downcast_ref::<AnalysisError>() {
            Some(AnalysisError::MissingFile { .. }) => {}
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_task_discovery() {
        let mut log = String::new();
        for task in &["db_bench[0]", "access_time3[0]", "access_time3[1]", "access_time3[3]"] {
            for t in 0..2 {
                log += &format!(
                    "Task {}, STATS: {{\"time\":\"{}\", \"ops_per_s\":\"1\"}}\n",
                    task, t
                );
            }
        }
        let data = extract(log.as_bytes()).unwrap();
        assert_eq!(data.count_tasks("access_time3"), 2);
        assert_eq!(data.count_tasks("ycsb"), 0);
        assert_eq!(data.interference_series("access_time3").len(), 2);

        let kinds = vec!["ycsb".to_string(), "db_bench".to_string()];
        assert_eq!(data.primary_series(&kinds).unwrap().task(), "db_bench[0]");
        assert!(data.primary_series(&kinds[..1]).is_none());

        match data.series("ycsb[0]") {
            Err(AnalysisError::UnknownTask { task }) => assert_eq!(task, "ycsb[0]"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
