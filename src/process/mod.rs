use std::path::PathBuf;

use thiserror::Error;

use crate::{cmd::execution_plan::StageSpec, prelude::*};

use self::status::StageStatus;

pub mod child;
pub mod status;
#[cfg(test)]
pub mod testing;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("{op} failed: {source}")]
    Sys {
        op: &'static str,
        #[source]
        source: nix::Error,
    },
    #[error("argument contains a nul byte: {0:?}")]
    Nul(String),
}

impl ExecError {
    pub fn sys(op: &'static str) -> impl FnOnce(nix::Error) -> Self {
        move |source| Self::Sys { op, source }
    }
}

/// Where a stage's standard output goes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StdoutTarget {
    /// The shell's own standard output.
    #[default]
    Inherit,
    /// The write end of a pipe owned by the orchestrator.
    Pipe(RawFd),
    /// Opened by the child before exec: create, truncate, owner read/write.
    File(PathBuf),
}

/// Descriptor wiring for one stage. Every descriptor here stays owned by
/// the orchestrator; a runner only duplicates or closes its own copies.
/// The default inherits the shell's standard streams.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageIo {
    /// `None` keeps the shell's standard input.
    pub stdin: Option<RawFd>,
    pub stdout: StdoutTarget,
    /// Descriptors the child must close before exec.
    pub close: Vec<RawFd>,
}

/// The capability of running a resolved program as a child process.
pub trait Runnable {
    fn spawn(&mut self, stage: &StageSpec, io: &StageIo) -> Result<Pid, ExecError>;
    /// Blocks until the child terminates.
    fn wait(&mut self, pid: Pid) -> Result<StageStatus, ExecError>;
}

/// A stage that has been spawned and reaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutcome {
    pub program: PathBuf,
    pub pid: Pid,
    pub status: StageStatus,
}
