// Copyright (c) Facebook, Inc. and its affiliates.
use anyhow::{Context, Result};
use log::info;
use serde::{de::DeserializeOwned, Serialize};
use std::default::Default;
use std::fs;
use std::io::{self, prelude::*};
use std::path::{Path, PathBuf};

/// Reads a json file, blanking out `//` and `#` comment lines so that
/// line numbers in parse errors still match.
fn read_json<P: AsRef<Path>>(path: P) -> Result<String> {
    let mut f = fs::OpenOptions::new().read(true).open(path)?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;

    let mut body = String::new();
    for line in buf.lines() {
        let trimmed = line.trim();
        if !trimmed.starts_with("//") && !trimmed.starts_with("#") {
            body += line;
        }
        body += "\n";
    }
    Ok(body)
}

pub trait JsonLoad
where
    Self: DeserializeOwned,
{
    fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let body = read_json(path)?;
        Ok(serde_json::from_str::<Self>(&body)?)
    }
}

pub trait JsonSave
where
    Self: Serialize,
{
    fn as_json(&self) -> Result<String> {
        let mut serialized = serde_json::to_string_pretty(&self)?;
        if !serialized.ends_with("\n") {
            serialized += "\n";
        }
        Ok(serialized)
    }

    /// Writes to a staging file first and renames it over `path` so that
    /// readers never see a partial file.
    fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut staging = path.as_os_str().to_owned();
        staging.push(".staging");

        let mut f = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&staging)
            .with_context(|| format!("Opening {:?}", &staging))?;
        f.write_all(self.as_json()?.as_ref())?;
        fs::rename(&staging, path)?;
        Ok(())
    }
}

impl<T: Serialize> JsonSave for Vec<T> {}

/// Command line arguments backed by an optional json file which carries
/// the persistent part across invocations.
#[derive(Clone, Debug, Default)]
pub struct ArgsFile<T: JsonLoad + JsonSave + Default> {
    pub path: Option<PathBuf>,
    pub data: T,
}

impl<T: JsonLoad + JsonSave + Default> ArgsFile<T> {
    pub fn load_or_default<P: AsRef<Path>>(path_opt: Option<P>) -> Result<Self> {
        let path = match path_opt {
            Some(p) => PathBuf::from(p.as_ref()),
            None => return Ok(Default::default()),
        };

        let data = match T::load(&path) {
            Ok(v) => v,
            Err(e) => match e.downcast_ref::<io::Error>() {
                Some(ioe) if ioe.kind() == io::ErrorKind::NotFound => {
                    info!("cfg: {:?} doesn't exist, using defaults", &path);
                    Default::default()
                }
                _ => return Err(e.context(format!("Loading {:?}", &path))),
            },
        };

        Ok(Self {
            path: Some(path),
            data,
        })
    }

    pub fn save(&self) -> Result<()> {
        match self.path.as_deref() {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() {
                        fs::create_dir_all(parent)?;
                    }
                }
                self.data.save(path)
            }
            None => Ok(()),
        }
    }
}

pub trait JsonArgs
where
    Self: JsonLoad + JsonSave + Default,
{
    fn match_cmdline() -> clap::ArgMatches<'static>;
    fn verbosity(matches: &clap::ArgMatches) -> u32;
    /// Applies command line overrides and returns whether the persistent
    /// part changed.
    fn process_cmdline(&mut self, matches: &clap::ArgMatches) -> Result<bool>;
}

pub trait JsonArgsHelper
where
    Self: JsonArgs,
{
    fn init_args_and_logging() -> Result<ArgsFile<Self>>;
}

impl<T> JsonArgsHelper for T
where
    T: JsonArgs,
{
    fn init_args_and_logging() -> Result<ArgsFile<T>> {
        let matches = T::match_cmdline();
        super::init_logging(T::verbosity(&matches));

        let mut args_file = ArgsFile::<T>::load_or_default(matches.value_of("args"))?;
        if args_file.data.process_cmdline(&matches)? {
            if let Some(path) = args_file.path.as_ref() {
                info!("Updating command line arguments file {:?}", path);
                args_file.save()?;
            }
        }
        Ok(args_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct Knobs {
        interval: f64,
        kinds: Vec<String>,
    }

    impl JsonLoad for Knobs {}
    impl JsonSave for Knobs {}

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("knobs.json");
        let knobs = Knobs {
            interval: 2.5,
            kinds: vec!["ycsb".into(), "db_bench".into()],
        };
        knobs.save(&path).unwrap();
        assert!(!dir.path().join("knobs.json.staging").exists());
        assert_eq!(Knobs::load(&path).unwrap(), knobs);
    }

    #[test]
    fn test_load_with_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("knobs.json");
        fs::write(&path, "// knobs\n# more\n{\n  \"interval\": 5.0\n}\n").unwrap();
        let knobs = Knobs::load(&path).unwrap();
        assert_eq!(knobs.interval, 5.0);
        assert!(knobs.kinds.is_empty());
    }

    #[test]
    fn test_args_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.json");
        let af = ArgsFile::<Knobs>::load_or_default(Some(&path)).unwrap();
        assert_eq!(af.data, Knobs::default());
        assert_eq!(af.path.as_deref(), Some(path.as_path()));

        let af = ArgsFile::<Knobs>::load_or_default(None::<&Path>).unwrap();
        assert!(af.path.is_none());
    }
}
