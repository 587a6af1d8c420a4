use std::io::{self, Write};

use crate::state::{Flow, State};

use super::BuiltinCommand;

#[derive(Default)]
pub struct History;

impl BuiltinCommand for History {
    fn name(&self) -> &'static str {
        "history"
    }

    fn execute(&self, state: &mut State, out: &mut dyn Write) -> io::Result<Flow> {
        for (index, line) in state.history.list() {
            writeln!(out, "{index} {line}")?;
        }

        Ok(Flow::Continue)
    }
}
