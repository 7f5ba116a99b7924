// Copyright (c) Facebook, Inc. and its affiliates.
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("failed to open {path:?} ({source})")]
    MissingFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("series {task:?} has no samples")]
    EmptySeries { task: String },
    #[error("no series for task {task:?}")]
    UnknownTask { task: String },
}
