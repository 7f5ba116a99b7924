// Copyright (c) Facebook, Inc. and its affiliates.
use iop_util::*;

pub mod args;
pub mod report;
pub mod sample;

pub use args::{Args, Mode};
pub use report::{
    FileReport, IoSummaryRow, Phase, PhaseGroup, PhaseKey, PhaseTick, PressureResult,
    PressureRow, Ratio,
};
pub use sample::{Fields, InterferenceSample, Sample, SampleKind, Series, TaskParams, ThroughputSample};

lazy_static::lazy_static! {
    pub static ref VERSION: &'static str = env!("CARGO_PKG_VERSION");
    pub static ref FULL_VERSION: String = full_version(*VERSION);
}
