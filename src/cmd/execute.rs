use super::execution_plan::{PipelineRequest, StageSpec};
use crate::{
    config::WaitPolicy,
    prelude::*,
    process::{ExecError, Runnable, StageIo, StageOutcome, StdoutTarget},
};

/// Spawns the stages of a request, wires their descriptors and waits for
/// every one of them.
pub struct Orchestrator {
    runner: Box<dyn Runnable>,
    policy: WaitPolicy,
}

impl Orchestrator {
    pub fn new(runner: Box<dyn Runnable>, policy: WaitPolicy) -> Self {
        Self { runner, policy }
    }

    /// Returns once every spawned stage has been reaped, in stage order.
    pub fn execute(&mut self, request: &PipelineRequest) -> Result<Vec<StageOutcome>, ExecError> {
        trace!(?request, policy = ?self.policy, "executing request");

        let last_stdout = match request.destination() {
            Some(dest) => StdoutTarget::File(dest.clone()),
            None => StdoutTarget::Inherit,
        };

        let stages = request.stages();
        let mut outcomes = Vec::with_capacity(stages.len());
        let mut running = Vec::new();

        let spawned = self.spawn_all(stages, &last_stdout, &mut outcomes, &mut running);

        // children that were started before a failure still get reaped
        let mut reaped = Ok(());
        for (stage, pid) in running {
            match self.reap(stage, pid) {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => {
                    error!(%pid, %err, "failed to reap stage");
                    if reaped.is_ok() {
                        reaped = Err(err);
                    }
                }
            }
        }

        spawned.and(reaped)?;

        Ok(outcomes)
    }

    fn spawn_all<'a>(
        &mut self,
        stages: &'a [StageSpec],
        last_stdout: &StdoutTarget,
        outcomes: &mut Vec<StageOutcome>,
        running: &mut Vec<(&'a StageSpec, Pid)>,
    ) -> Result<(), ExecError> {
        let mut previous: Option<OwnedFd> = None;

        for (i, stage) in stages.iter().enumerate() {
            let pipe = if i + 1 < stages.len() {
                Some(open_pipe()?)
            } else {
                None
            };

            let io = StageIo {
                stdin: previous.as_ref().map(AsRawFd::as_raw_fd),
                stdout: match &pipe {
                    Some((_, write)) => StdoutTarget::Pipe(write.as_raw_fd()),
                    None => last_stdout.clone(),
                },
                close: pipe.iter().map(|(read, _)| read.as_raw_fd()).collect(),
            };

            let pid = self.runner.spawn(stage, &io)?;

            // the child has its own copies; keep only the next stage's input
            drop(previous.take());
            let next = pipe.map(|(read, write)| {
                drop(write);
                read
            });

            match self.policy {
                WaitPolicy::Sequential => outcomes.push(self.reap(stage, pid)?),
                WaitPolicy::Concurrent => running.push((stage, pid)),
            }

            previous = next;
        }

        Ok(())
    }

    fn reap(&mut self, stage: &StageSpec, pid: Pid) -> Result<StageOutcome, ExecError> {
        let status = self.runner.wait(pid)?;

        if !status.success() {
            debug!(%pid, %status, program = ?stage.program, "stage did not succeed");
        }

        Ok(StageOutcome {
            program: stage.program.clone(),
            pid,
            status,
        })
    }
}

/// Both ends are close-on-exec; only the copies a child dups onto 0 and 1
/// survive exec.
fn open_pipe() -> Result<(OwnedFd, OwnedFd), ExecError> {
    let (read, write) = raw_pipe()?;
    // SAFETY: both descriptors were just created and have no other owner
    let (read, write) = unsafe { (OwnedFd::from_raw_fd(read), OwnedFd::from_raw_fd(write)) };

    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    for fd in [&read, &write] {
        use nix::fcntl::{fcntl, FcntlArg, FdFlag};
        fcntl(fd.as_raw_fd(), FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))
            .map_err(ExecError::sys("fcntl"))?;
    }

    Ok((read, write))
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn raw_pipe() -> Result<(RawFd, RawFd), ExecError> {
    nix::unistd::pipe2(nix::fcntl::OFlag::O_CLOEXEC).map_err(ExecError::sys("pipe"))
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn raw_pipe() -> Result<(RawFd, RawFd), ExecError> {
    nix::unistd::pipe().map_err(ExecError::sys("pipe"))
}
