use std::fmt;

use nix::sys::{signal::Signal, wait::WaitStatus};

/// Status a child exits with when it could not be exec'd.
pub const EXEC_FAILED: i32 = 126;

/// How a reaped stage finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Exited(i32),
    Signaled(Signal),
}

impl StageStatus {
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Exited(code) => Some(*code),
            Self::Signaled(_) => None,
        }
    }

    pub fn success(&self) -> bool {
        self.code() == Some(0)
    }

    /// Maps a terminal wait status; stops and continues are not terminal.
    pub fn from_wait(status: WaitStatus) -> Option<Self> {
        match status {
            WaitStatus::Exited(_, code) => Some(Self::Exited(code)),
            WaitStatus::Signaled(_, signal, _) => Some(Self::Signaled(signal)),
            _ => None,
        }
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "exit {code}"),
            Self::Signaled(signal) => write!(f, "killed by {signal}"),
        }
    }
}
