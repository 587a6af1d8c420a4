use std::{fmt, path::PathBuf};

use itertools::Itertools;

/// One resolved program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl StageSpec {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// `argv[0]` is the resolved path, followed by the arguments as typed.
    pub fn argv(&self) -> impl Iterator<Item = String> + '_ {
        std::iter::once(self.program.to_string_lossy().into_owned())
            .chain(self.args.iter().cloned())
    }
}

impl fmt::Display for StageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.argv().join(" "))
    }
}

/// What a single input line asks the orchestrator to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineRequest {
    Simple(StageSpec),
    Redirect(StageSpec, PathBuf),
    /// Always at least two stages.
    Pipe(Vec<StageSpec>),
    /// The last command's output goes to the file instead of a pipe.
    PipeRedirect(Vec<StageSpec>, PathBuf),
}

impl PipelineRequest {
    pub fn stages(&self) -> &[StageSpec] {
        match self {
            Self::Simple(stage) | Self::Redirect(stage, _) => std::slice::from_ref(stage),
            Self::Pipe(stages) | Self::PipeRedirect(stages, _) => stages,
        }
    }

    pub fn destination(&self) -> Option<&PathBuf> {
        match self {
            Self::Redirect(_, dest) | Self::PipeRedirect(_, dest) => Some(dest),
            Self::Simple(_) | Self::Pipe(_) => None,
        }
    }
}
