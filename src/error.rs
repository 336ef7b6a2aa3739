//! Failures of the collaborators around the loudness core.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("could not start {tool}: {source}")]
    ToolMissing {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with {status}")]
    ToolFailed { tool: &'static str, status: ExitStatus },

    #[error("could not determine the duration of {}", .0.display())]
    UnknownDuration(PathBuf),

    #[error("no audio track in {}", .0.display())]
    NoAudioTrack(PathBuf),
}
