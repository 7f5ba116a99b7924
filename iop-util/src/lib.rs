// Copyright (c) Facebook, Inc. and its affiliates.
use anyhow::{bail, Result};
use glob::glob;
use log::warn;
use simplelog as sl;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

pub mod coerce;
pub mod json_file;

pub use coerce::{
    binary_suffix, coerce, decimal_suffix, to_float, to_int, Converter, InvalidNumberError,
    Value, INT_FLOAT, INT_FLOAT_BINARY, INT_FLOAT_DECIMAL,
};
pub use json_file::{ArgsFile, JsonArgs, JsonArgsHelper, JsonLoad, JsonSave};

pub const TO_PCT: f64 = 100.0;

pub fn full_version(semver: &str) -> String {
    if cfg!(debug_assertions) {
        format!("{}-dbg", semver)
    } else {
        semver.to_string()
    }
}

pub fn custom_underline(content: &str, line_char: &str) -> String {
    let nr_spaces = content.chars().take_while(|c| *c == ' ').count();
    let len = content.chars().count() - nr_spaces;
    format!(
        "{}\n{}{}\n",
        content,
        " ".repeat(nr_spaces),
        line_char.repeat(len)
    )
}

pub fn underline(content: &str) -> String {
    custom_underline(content, "-")
}

pub fn double_underline(content: &str) -> String {
    custom_underline(content, "=")
}

fn format_count_internal<T>(count: T, zero: &str) -> String
where
    T: num::ToPrimitive,
{
    let format_count_helper = |count: f64, zeroes: i32, suffix: &str| -> Option<String> {
        let unit = 10_f64.powi(zeroes);

        if count / unit < 99.95 {
            Some(format!("{:.1}{}", (count / unit).max(0.1), suffix))
        } else if count / unit < 1000.0 {
            Some(format!("{:.0}{}", count / unit, suffix))
        } else {
            None
        }
    };

    let count = match count.to_f64() {
        Some(v) if v.is_finite() => v,
        _ => return "NaN".into(),
    };

    if count == 0.0 {
        zero.to_string()
    } else if count < 0.0 {
        format!("-{}", format_count_internal(-count, zero))
    } else if count < 1000.0 {
        format!("{:.0}", count)
    } else {
        format_count_helper(count, 3, "k")
            .or_else(|| format_count_helper(count, 6, "m"))
            .or_else(|| format_count_helper(count, 9, "g"))
            .or_else(|| format_count_helper(count, 12, "p"))
            .or_else(|| format_count_helper(count, 15, "e"))
            .unwrap_or_else(|| "INF".into())
    }
}

pub fn format_count<T>(count: T) -> String
where
    T: num::ToPrimitive,
{
    format_count_internal(count, "0")
}

/// Unlike the usage-oriented percentages elsewhere, pressure can be
/// negative when a phase outperforms the baseline.
fn format_pct_internal(ratio: f64, zero: &str) -> String {
    let pct = ratio * TO_PCT;
    if !pct.is_finite() {
        "NaN".into()
    } else if pct == 0.0 {
        zero.to_string()
    } else if pct.abs() < 99.995 {
        format!("{:.02}", pct)
    } else if pct.abs() < 999.95 {
        format!("{:.01}", pct)
    } else if pct.abs() < 99999.5 {
        format!("{:.0}", pct)
    } else {
        "INF".into()
    }
}

pub fn format_pct(ratio: f64) -> String {
    format_pct_internal(ratio, "0")
}

/// Formats a ratio in [0, 1] as an integer percentage when it is one,
/// e.g. 0.1 -> "10", 0.125 -> "12.5".
pub fn format_ratio_pct(ratio: f64) -> String {
    let pct = ratio * TO_PCT;
    if (pct - pct.round()).abs() < 1e-9 {
        format!("{}", pct.round() as i64)
    } else {
        let s = format!("{:.3}", pct);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Compares strings so that embedded numbers sort numerically, e.g.
/// "run2.out" < "run10.out".
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut ai = a.chars().peekable();
    let mut bi = b.chars().peekable();

    loop {
        match (ai.peek().copied(), bi.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(ac), Some(bc)) if ac.is_ascii_digit() && bc.is_ascii_digit() => {
                let mut an = String::new();
                while let Some(c) = ai.peek().copied().filter(|c| c.is_ascii_digit()) {
                    an.push(c);
                    ai.next();
                }
                let mut bn = String::new();
                while let Some(c) = bi.peek().copied().filter(|c| c.is_ascii_digit()) {
                    bn.push(c);
                    bi.next();
                }
                let at = an.trim_start_matches('0');
                let bt = bn.trim_start_matches('0');
                let ord = at.len().cmp(&bt.len()).then_with(|| at.cmp(bt));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(ac), Some(bc)) => {
                if ac != bc {
                    return ac.cmp(&bc);
                }
                ai.next();
                bi.next();
            }
        }
    }
}

/// Expands the input list. Directories contribute their "*.out" files in
/// natural order, everything else is passed through.
pub fn find_inputs<P: AsRef<Path>>(inputs: &[P]) -> Result<Vec<PathBuf>> {
    let mut files = vec![];
    for input in inputs.iter() {
        let input = input.as_ref();
        if !input.is_dir() {
            files.push(input.to_path_buf());
            continue;
        }

        let pattern = input.join("*.out");
        let pattern = match pattern.to_str() {
            Some(v) => v.to_string(),
            None => bail!("non UTF-8 path {:?}", input),
        };
        let mut found: Vec<PathBuf> = vec![];
        for entry in glob(&pattern)? {
            match entry {
                Ok(path) => found.push(path),
                Err(e) => warn!("Failed to read directory entry ({})", &e),
            }
        }
        found.sort_by(|a, b| natural_cmp(&a.to_string_lossy(), &b.to_string_lossy()));
        files.append(&mut found);
    }
    Ok(files)
}

pub fn init_logging(verbosity: u32) {
    if std::env::var("RUST_LOG").is_ok() {
        env_logger::init();
    } else {
        let sl_level = match verbosity {
            0 | 1 => sl::LevelFilter::Info,
            2 => sl::LevelFilter::Debug,
            _ => sl::LevelFilter::Trace,
        };
        let mut lcfg = sl::ConfigBuilder::new();
        lcfg.set_time_level(sl::LevelFilter::Off)
            .set_location_level(sl::LevelFilter::Off)
            .set_target_level(sl::LevelFilter::Off)
            .set_thread_level(sl::LevelFilter::Off);
        if !console::user_attended_stderr()
            || sl::TermLogger::init(
                sl_level,
                lcfg.build(),
                sl::TerminalMode::Stderr,
                sl::ColorChoice::Auto,
            )
            .is_err()
        {
            let _ = sl::SimpleLogger::init(sl_level, lcfg.build());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;

    #[test]
    fn test_format_count() {
        for pair in &[
            (0.0, "0"),
            (999.0, "999"),
            (6000.0, "6.0k"),
            (12345.0, "12.3k"),
            (250_000.0, "250k"),
            (-4000.0, "-4.0k"),
        ] {
            let result = super::format_count(pair.0);
            assert_eq!(&result, pair.1);
        }
    }

    #[test]
    fn test_format_pct() {
        for pair in &[
            (0.0, "0"),
            (0.4, "40.00"),
            (-0.125, "-12.50"),
            (1.5, "150.0"),
        ] {
            let result = super::format_pct(pair.0);
            assert_eq!(&result, pair.1);
        }
    }

    #[test]
    fn test_format_ratio_pct() {
        for pair in &[(0.1, "10"), (0.5, "50"), (1.0, "100"), (0.0, "0"), (0.125, "12.5")] {
            assert_eq!(&super::format_ratio_pct(pair.0), pair.1);
        }
    }

    #[test]
    fn test_natural_cmp() {
        assert_eq!(super::natural_cmp("a2.out", "a10.out"), Ordering::Less);
        assert_eq!(super::natural_cmp("a10.out", "a10.out"), Ordering::Equal);
        assert_eq!(super::natural_cmp("b1", "a9"), Ordering::Greater);
        assert_eq!(super::natural_cmp("a", "a1"), Ordering::Less);
    }

    #[test]
    fn test_find_inputs() {
        let dir = tempfile::tempdir().unwrap();
        for name in &["run10.out", "run2.out", "notes.txt", "run1.out"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        let extra = dir.path().join("notes.txt");
        let files = super::find_inputs(&[dir.path().to_path_buf(), extra.clone()]).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["run1.out", "run2.out", "run10.out", "notes.txt"]);
    }
}
