// Copyright (c) Facebook, Inc. and its affiliates.
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use iop_util::*;

lazy_static::lazy_static! {
    static ref TOP_ARGS_STR: String = {
        let dfl_args = Args::default();
        format!(
            "-a, --args=[FILE]              'Loads base command line arguments from FILE'
             -r, --result=[FILE]            'Saves the analysis results to FILE as json'
             -p, --primary=[KINDS]          'Primary workload task kinds in preference order (dfl: {dfl_primary})'
             -i, --interference=[KIND]      'Interference generator task kind (dfl: {dfl_intf})'
                 --instance=[KIND]          'Task kind of the command blocks to extract parameters from (dfl: {dfl_inst})'
                 --instance-count=[PARAM]   'Run parameter holding the number of instances (dfl: {dfl_inst_cnt})'
                 --mean-interval=[TIME]     'Interval for throughput means, 0 to disable (dfl: {dfl_mean})'
                 --tick-step=[TIME]         'Phase tick sweep step (dfl: {dfl_tick})'
                 --start=[TIME]             'Ignore primary workload samples before TIME'
             -v...                          'Sets the level of verbosity'",
            dfl_primary = dfl_args.primary_kinds.join(","),
            dfl_intf = &dfl_args.interference_kind,
            dfl_inst = &dfl_args.instance_kind,
            dfl_inst_cnt = &dfl_args.instance_count_param,
            dfl_mean = dfl_args.mean_interval,
            dfl_tick = dfl_args.tick_step,
        )
    };
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Mode {
    Pressure,
    Phases,
    Params,
    Io,
}

impl Default for Mode {
    fn default() -> Self {
        Self::Pressure
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Args {
    pub primary_kinds: Vec<String>,
    pub interference_kind: String,
    pub instance_kind: String,
    pub instance_count_param: String,
    pub mean_interval: f64,
    pub tick_step: f64,
    pub start_time: Option<f64>,

    #[serde(skip)]
    pub mode: Mode,
    #[serde(skip)]
    pub inputs: Vec<String>,
    #[serde(skip)]
    pub result: Option<String>,
    #[serde(skip)]
    pub sort_by_pressure: bool,
    #[serde(skip)]
    pub dump_series: bool,
    #[serde(skip)]
    pub verbosity: u32,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            primary_kinds: vec!["ycsb".into(), "db_bench".into()],
            interference_kind: "access_time3".into(),
            instance_kind: "db_bench".into(),
            instance_count_param: "num_dbs".into(),
            mean_interval: 2.0,
            tick_step: 1.0,
            start_time: None,
            mode: Mode::Pressure,
            inputs: vec![],
            result: None,
            sort_by_pressure: false,
            dump_series: false,
            verbosity: 0,
        }
    }
}

impl Args {
    fn parse_time(name: &str, v: &str) -> Result<f64> {
        let t = v
            .trim()
            .parse::<f64>()
            .with_context(|| format!("Parsing --{} {:?}", name, v))?;
        if !t.is_finite() || t < 0.0 {
            bail!("--{} {:?} out of range", name, v);
        }
        Ok(t)
    }

    fn process_subcommand(&mut self, mode: Mode, subm: &clap::ArgMatches) {
        self.mode = mode;
        self.inputs = subm
            .values_of("INPUT")
            .map(|vals| vals.map(|x| x.to_string()).collect())
            .unwrap_or_default();
        if mode == Mode::Pressure {
            self.sort_by_pressure = subm.is_present("sort");
            self.dump_series = subm.is_present("series");
        }
    }
}

impl JsonLoad for Args {}
impl JsonSave for Args {}

impl JsonArgs for Args {
    fn match_cmdline() -> clap::ArgMatches<'static> {
        let input_arg = clap::Arg::with_name("INPUT")
            .multiple(true)
            .required(true)
            .help("Benchmark log file or directory of *.out files");

        clap::App::new("iopress")
            .version((*super::FULL_VERSION).as_str())
            .about("Measures how much IO interference degrades benchmark throughput")
            .setting(clap::AppSettings::UnifiedHelpMessage)
            .setting(clap::AppSettings::DeriveDisplayOrder)
            .setting(clap::AppSettings::SubcommandRequiredElseHelp)
            .args_from_usage(&TOP_ARGS_STR)
            .subcommand(
                clap::SubCommand::with_name("pressure")
                    .about("Shows the throughput and normalized pressure of each workload phase")
                    .arg(
                        clap::Arg::with_name("sort")
                            .long("sort")
                            .short("s")
                            .help("Sort phases by pressure instead of time"),
                    )
                    .arg(
                        clap::Arg::with_name("series")
                            .long("series")
                            .help("Include the parsed series in the result file"),
                    )
                    .arg(input_arg.clone()),
            )
            .subcommand(
                clap::SubCommand::with_name("phases")
                    .about("Shows the workload phases and where they start")
                    .arg(input_arg.clone()),
            )
            .subcommand(
                clap::SubCommand::with_name("params")
                    .about("Shows run and task parameters")
                    .arg(input_arg.clone()),
            )
            .subcommand(
                clap::SubCommand::with_name("io")
                    .about("Shows interference generator throughput per access pattern")
                    .arg(input_arg.clone()),
            )
            .get_matches()
    }

    fn verbosity(matches: &clap::ArgMatches) -> u32 {
        matches.occurrences_of("v") as u32
    }

    fn process_cmdline(&mut self, matches: &clap::ArgMatches) -> Result<bool> {
        let dfl = Args::default();
        let mut updated = false;

        if let Some(v) = matches.value_of("primary") {
            self.primary_kinds = if v.len() > 0 {
                v.split(',')
                    .map(|x| x.trim())
                    .filter(|x| x.len() > 0)
                    .map(|x| x.to_string())
                    .collect()
            } else {
                dfl.primary_kinds.clone()
            };
            updated = true;
        }
        if let Some(v) = matches.value_of("interference") {
            self.interference_kind = if v.len() > 0 {
                v.to_string()
            } else {
                dfl.interference_kind.clone()
            };
            updated = true;
        }
        if let Some(v) = matches.value_of("instance") {
            self.instance_kind = if v.len() > 0 {
                v.to_string()
            } else {
                dfl.instance_kind.clone()
            };
            updated = true;
        }
        if let Some(v) = matches.value_of("instance-count") {
            self.instance_count_param = if v.len() > 0 {
                v.to_string()
            } else {
                dfl.instance_count_param.clone()
            };
            updated = true;
        }
        if let Some(v) = matches.value_of("mean-interval") {
            self.mean_interval = if v.len() > 0 {
                Self::parse_time("mean-interval", v)?
            } else {
                dfl.mean_interval
            };
            updated = true;
        }
        if let Some(v) = matches.value_of("tick-step") {
            self.tick_step = if v.len() > 0 {
                let step = Self::parse_time("tick-step", v)?;
                if step == 0.0 {
                    bail!("--tick-step must be positive");
                }
                step
            } else {
                dfl.tick_step
            };
            updated = true;
        }
        if let Some(v) = matches.value_of("start") {
            self.start_time = if v.len() > 0 {
                Some(Self::parse_time("start", v)?)
            } else {
                None
            };
            updated = true;
        }

        self.result = matches.value_of("result").map(|x| x.to_string());
        self.verbosity = Self::verbosity(matches);

        match matches.subcommand() {
            ("pressure", Some(subm)) => self.process_subcommand(Mode::Pressure, subm),
            ("phases", Some(subm)) => self.process_subcommand(Mode::Phases, subm),
            ("params", Some(subm)) => self.process_subcommand(Mode::Params, subm),
            ("io", Some(subm)) => self.process_subcommand(Mode::Io, subm),
            _ => bail!("unknown subcommand"),
        }

        if self.primary_kinds.is_empty() {
            bail!("at least one primary task kind is required");
        }

        Ok(updated)
    }
}
