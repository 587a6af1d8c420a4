use std::{
    cell::RefCell,
    path::{Path, PathBuf},
    rc::Rc,
};

use super::{status::StageStatus, ExecError, Runnable, StageIo};
use crate::{cmd::execution_plan::StageSpec, prelude::*};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Spawn(Pid),
    Wait(Pid),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spawned {
    pub stage: StageSpec,
    pub io: StageIo,
    pub pid: Pid,
}

#[derive(Debug, Default)]
pub struct Log {
    pub spawned: Vec<Spawned>,
    pub events: Vec<Event>,
    /// Fail the nth spawn (zero based).
    pub fail_spawn_at: Option<usize>,
}

/// Records every spawn and wait instead of running anything.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    pub log: Rc<RefCell<Log>>,
}

impl Recorder {
    pub fn spawned(&self) -> Vec<Spawned> {
        self.log.borrow().spawned.clone()
    }

    pub fn events(&self) -> Vec<Event> {
        self.log.borrow().events.clone()
    }
}

impl Runnable for Recorder {
    fn spawn(&mut self, stage: &StageSpec, io: &StageIo) -> Result<Pid, ExecError> {
        let mut log = self.log.borrow_mut();

        if log.fail_spawn_at == Some(log.spawned.len()) {
            return Err(ExecError::Sys {
                op: "fork",
                source: nix::Error::EAGAIN,
            });
        }

        let pid = Pid::from_raw(1000 + log.spawned.len() as i32);
        log.spawned.push(Spawned {
            stage: stage.clone(),
            io: io.clone(),
            pid,
        });
        log.events.push(Event::Spawn(pid));

        Ok(pid)
    }

    fn wait(&mut self, pid: Pid) -> Result<StageStatus, ExecError> {
        self.log.borrow_mut().events.push(Event::Wait(pid));
        Ok(StageStatus::Exited(0))
    }
}

/// Finds a system binary for tests that really fork.
pub fn system_binary(name: &str) -> Option<PathBuf> {
    ["/bin", "/usr/bin"]
        .iter()
        .map(|dir| Path::new(dir).join(name))
        .find(|path| path.is_file())
}
