use std::io::{self, Write};

use thiserror::Error;

use crate::{
    builtins::{BuiltinCommand, BuiltinCommands},
    cmd::{execute::Orchestrator, resolve::PathResolver},
    config::{Limits, RcFile},
    history::{parse_recall, HistoryBuffer, HistoryError},
    input::InputError,
    parse::{parse_request, tokenize, ParseError},
    process::{ExecError, Runnable, StageOutcome},
};

/// Everything that can go wrong with a single input line. None of these
/// stop the shell.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Exec(#[from] ExecError),
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct State {
    pub prompt: String,
    pub limits: Limits,
    pub resolver: PathResolver,
    pub history: HistoryBuffer,
    pub orchestrator: Orchestrator,
}

impl State {
    pub fn new(rc: RcFile, limits: Limits, runner: Box<dyn Runnable>) -> Self {
        Self {
            prompt: rc.prompt,
            resolver: PathResolver::new(rc.dirs),
            history: HistoryBuffer::new(limits.history_capacity),
            orchestrator: Orchestrator::new(runner, limits.wait_policy),
            limits,
        }
    }

    pub fn render<W: Write>(&self, stdout: &mut W) -> io::Result<()> {
        write!(stdout, "{} ", self.prompt)?;
        stdout.flush()
    }

    /// Handles one line from the read loop: builtins, history recall, then
    /// tokenize, parse and execute.
    pub fn handle_line(&mut self, line: &str, out: &mut dyn Write) -> Result<Flow, ShellError> {
        if line.is_empty() {
            return Ok(Flow::Continue);
        }

        if let Some(builtin) = BuiltinCommands::from_name(line) {
            trace!(builtin = builtin.name(), "running builtin");
            return Ok(builtin.execute(self, out)?);
        }

        let line = match parse_recall(line) {
            Some(index) => {
                let recalled = self.history.recall(index?)?.to_owned();
                debug!(%recalled, "recalled history entry");
                recalled
            }
            None => {
                self.history.append(line);
                line.to_owned()
            }
        };

        // anything still buffered would otherwise interleave with the children
        out.flush()?;

        for outcome in self.execute(&line)? {
            debug!(
                pid = %outcome.pid,
                status = %outcome.status,
                program = ?outcome.program,
                "stage finished"
            );
        }

        Ok(Flow::Continue)
    }

    pub fn execute(&mut self, line: &str) -> Result<Vec<StageOutcome>, ShellError> {
        let tokens = tokenize(line, self.limits.max_tokens)?;

        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        let request = parse_request(line, &tokens, &self.resolver, &self.limits)?;

        trace!(?request, "parsed request");

        Ok(self.orchestrator.execute(&request)?)
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, path::PathBuf};

    use nix::{libc, sys::stat::fstat};
    use tempfile::TempDir;

    use super::*;
    use crate::process::{child::ForkExec, testing::Recorder};

    fn recording_shell(commands: &[&str]) -> (State, Recorder, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        for command in commands {
            fs::write(dir.path().join(command), "").unwrap();
        }
        let recorder = Recorder::default();
        let rc = RcFile {
            prompt: "sh360>".into(),
            dirs: vec![dir.path().to_owned()],
        };
        let state = State::new(rc, Limits::default(), Box::new(recorder.clone()));
        (state, recorder, dir)
    }

    fn run(state: &mut State, line: &str) -> (Result<Flow, ShellError>, String) {
        let mut out = Vec::new();
        let flow = state.handle_line(line, &mut out);
        (flow, String::from_utf8(out).unwrap())
    }

    fn history(state: &State) -> Vec<String> {
        state.history.list().map(|(_, line)| line.to_owned()).collect()
    }

    #[test]
    fn renders_prompt_with_trailing_space() {
        let (state, _, _dir) = recording_shell(&[]);
        let mut out = Vec::new();
        state.render(&mut out).unwrap();
        assert_eq!(out, b"sh360> ");
    }

    #[test]
    fn runs_and_records_commands() {
        let (mut state, recorder, _dir) = recording_shell(&["ls"]);

        let (flow, _) = run(&mut state, "ls -l");

        assert_eq!(flow.unwrap(), Flow::Continue);
        assert_eq!(recorder.spawned().len(), 1);
        assert_eq!(history(&state), vec!["ls -l"]);
    }

    #[test]
    fn exit_and_history_are_not_recorded() {
        let (mut state, recorder, _dir) = recording_shell(&["ls"]);
        run(&mut state, "ls").0.unwrap();

        let (flow, out) = run(&mut state, "history");
        assert_eq!(flow.unwrap(), Flow::Continue);
        assert_eq!(out, "0 ls\n");

        assert_eq!(run(&mut state, "exit").0.unwrap(), Flow::Exit);
        assert_eq!(history(&state), vec!["ls"]);
        assert_eq!(recorder.spawned().len(), 1);
    }

    #[test]
    fn empty_and_blank_lines_do_nothing() {
        let (mut state, recorder, _dir) = recording_shell(&[]);

        assert_eq!(run(&mut state, "").0.unwrap(), Flow::Continue);
        assert_eq!(run(&mut state, "   ").0.unwrap(), Flow::Continue);
        assert!(recorder.spawned().is_empty());
        assert_eq!(history(&state), vec!["   "]);
    }

    #[test]
    fn recall_reruns_without_recording() {
        let (mut state, recorder, dir) = recording_shell(&["ls", "wc"]);
        run(&mut state, "ls -a").0.unwrap();
        run(&mut state, "PP ls -> wc").0.unwrap();

        run(&mut state, "!0").0.unwrap();

        let spawned = recorder.spawned();
        assert_eq!(spawned.len(), 4);
        assert_eq!(spawned[3].stage.program, dir.path().join("ls"));
        assert_eq!(spawned[3].stage.args, vec!["-a"]);
        assert_eq!(history(&state), vec!["ls -a", "PP ls -> wc"]);
    }

    #[test]
    fn recall_of_unwritten_slot_fails() {
        let (mut state, recorder, _dir) = recording_shell(&["ls"]);
        run(&mut state, "ls").0.unwrap();

        let err = run(&mut state, "!5").0.unwrap_err();

        assert!(matches!(
            err,
            ShellError::History(HistoryError::EventNotFound(5))
        ));
        assert_eq!(err.to_string(), "5: event not found");
        assert_eq!(recorder.spawned().len(), 1);
    }

    #[test]
    fn failing_lines_are_still_recorded() {
        let (mut state, recorder, _dir) = recording_shell(&[]);

        let err = run(&mut state, "nope").0.unwrap_err();

        assert_eq!(err.to_string(), "nope: command not found");
        assert_eq!(history(&state), vec!["nope"]);
        assert!(recorder.spawned().is_empty());
    }

    #[test]
    fn too_many_pipes_spawns_nothing() {
        let (mut state, recorder, _dir) = recording_shell(&["a", "b", "c", "d"]);

        let err = run(&mut state, "PP a -> b -> c -> d").0.unwrap_err();

        assert!(matches!(
            err,
            ShellError::Parse(ParseError::TooManyPipes { max: 3 })
        ));
        assert!(recorder.spawned().is_empty());
    }

    #[test]
    fn repeated_pipeline_runs_independently() {
        let (mut state, recorder, _dir) = recording_shell(&["ls", "wc"]);

        run(&mut state, "PP ls -> wc").0.unwrap();
        run(&mut state, "PP ls -> wc").0.unwrap();

        let spawned = recorder.spawned();
        assert_eq!(spawned.len(), 4);
        assert_eq!(spawned[0].stage, spawned[2].stage);
        assert_eq!(spawned[1].stage, spawned[3].stage);
        assert_eq!(history(&state), vec!["PP ls -> wc", "PP ls -> wc"]);
    }

    #[test]
    fn redirect_writes_file_and_leaves_stdout_alone() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out");
        let rc = RcFile {
            prompt: "$".into(),
            dirs: vec![PathBuf::from("/bin"), PathBuf::from("/usr/bin")],
        };
        let mut state = State::new(rc, Limits::default(), Box::new(ForkExec));
        if state.resolver.resolve("echo").is_none() {
            return;
        }

        let stdout_identity = || {
            let stat = fstat(libc::STDOUT_FILENO).unwrap();
            (stat.st_dev, stat.st_ino, stat.st_rdev, stat.st_mode)
        };
        let before = stdout_identity();

        let line = format!("OR echo hi -> {}", dest.display());
        let (flow, out) = run(&mut state, &line);

        assert_eq!(flow.unwrap(), Flow::Continue);
        assert_eq!(fs::read_to_string(&dest).unwrap(), "hi\n");
        assert!(out.is_empty());
        assert_eq!(stdout_identity(), before);
    }
}
