use std::{ffi::CString, os::unix::ffi::OsStrExt, path::Path};

use nix::{
    errno::Errno,
    fcntl::{open, OFlag},
    libc,
    sys::{stat::Mode, wait::waitpid},
    unistd::{close, dup2, execve, fork, write, ForkResult},
};

use super::{
    status::{StageStatus, EXEC_FAILED},
    ExecError, Runnable, StageIo, StdoutTarget,
};
use crate::{cmd::execution_plan::StageSpec, prelude::*};

/// Runs stages with `fork` + `execve` and an empty environment.
#[derive(Debug, Default)]
pub struct ForkExec;

impl Runnable for ForkExec {
    fn spawn(&mut self, stage: &StageSpec, io: &StageIo) -> Result<Pid, ExecError> {
        let prepared = Prepared::new(stage, io)?;

        trace!(%stage, ?io, "forking");

        // SAFETY: the child only touches memory prepared above and calls
        // async-signal-safe functions before exec or _exit.
        match unsafe { fork() }.map_err(ExecError::sys("fork"))? {
            ForkResult::Parent { child } => {
                debug!(%child, program = ?stage.program, "spawned stage");
                Ok(child)
            }
            ForkResult::Child => prepared.exec(),
        }
    }

    fn wait(&mut self, pid: Pid) -> Result<StageStatus, ExecError> {
        loop {
            match waitpid(pid, None) {
                Ok(status) => {
                    if let Some(status) = StageStatus::from_wait(status) {
                        trace!(%pid, %status, "reaped stage");
                        return Ok(status);
                    }
                }
                Err(Errno::EINTR) => continue,
                Err(err) => return Err(ExecError::sys("waitpid")(err)),
            }
        }
    }
}

enum ChildStdout {
    Inherit,
    Fd(RawFd),
    File { path: CString, open_failed: Vec<u8> },
}

/// Everything the child needs, allocated before fork.
struct Prepared {
    program: CString,
    argv: Vec<CString>,
    envp: Vec<CString>,
    stdin: Option<RawFd>,
    stdout: ChildStdout,
    close: Vec<RawFd>,
    exec_failed: Vec<u8>,
}

impl Prepared {
    fn new(stage: &StageSpec, io: &StageIo) -> Result<Self, ExecError> {
        let stdout = match &io.stdout {
            StdoutTarget::Inherit => ChildStdout::Inherit,
            StdoutTarget::Pipe(fd) => ChildStdout::Fd(*fd),
            StdoutTarget::File(path) => ChildStdout::File {
                path: path_cstring(path)?,
                open_failed: format!("cannot open {} for writing\n", path.display()).into_bytes(),
            },
        };

        Ok(Self {
            program: path_cstring(&stage.program)?,
            argv: stage.argv().map(cstring).collect::<Result<_, _>>()?,
            envp: Vec::new(),
            stdin: io.stdin,
            stdout,
            close: io.close.clone(),
            exec_failed: format!("{}: ", stage.program.display()).into_bytes(),
        })
    }

    fn exec(&self) -> ! {
        if let Some(fd) = self.stdin {
            redirect(fd, libc::STDIN_FILENO);
        }

        for fd in &self.close {
            let _ = close(*fd);
        }

        match &self.stdout {
            ChildStdout::Inherit => {}
            ChildStdout::Fd(fd) => redirect(*fd, libc::STDOUT_FILENO),
            ChildStdout::File { path, open_failed } => {
                let flags = OFlag::O_CREAT | OFlag::O_WRONLY | OFlag::O_TRUNC;
                match open(path.as_c_str(), flags, Mode::S_IRUSR | Mode::S_IWUSR) {
                    Ok(fd) => redirect(fd, libc::STDOUT_FILENO),
                    Err(_) => {
                        let _ = write(libc::STDERR_FILENO, open_failed);
                        exit(1);
                    }
                }
            }
        }

        let errno = match execve(&self.program, &self.argv, &self.envp) {
            Ok(never) => match never {},
            Err(errno) => errno,
        };

        let _ = write(libc::STDERR_FILENO, &self.exec_failed);
        let _ = write(libc::STDERR_FILENO, errno.desc().as_bytes());
        let _ = write(libc::STDERR_FILENO, b"\n");
        exit(EXEC_FAILED)
    }
}

fn redirect(fd: RawFd, target: RawFd) {
    if fd == target {
        return;
    }
    if dup2(fd, target).is_err() {
        let _ = write(libc::STDERR_FILENO, b"cannot wire stage descriptors\n");
        exit(EXEC_FAILED);
    }
    let _ = close(fd);
}

fn exit(code: i32) -> ! {
    // SAFETY: _exit skips atexit handlers and stdio flushing, which belong
    // to the parent.
    unsafe { libc::_exit(code) }
}

fn cstring(s: String) -> Result<CString, ExecError> {
    CString::new(s).map_err(|err| {
        let bytes = err.into_vec();
        ExecError::Nul(String::from_utf8_lossy(&bytes).into_owned())
    })
}

fn path_cstring(path: &Path) -> Result<CString, ExecError> {
    CString::new(path.as_os_str().as_bytes())
        .map_err(|_| ExecError::Nul(path.display().to_string()))
}
