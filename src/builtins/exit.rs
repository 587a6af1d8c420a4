use std::io::{self, Write};

use crate::state::{Flow, State};

use super::BuiltinCommand;

#[derive(Default)]
pub struct Exit;

impl BuiltinCommand for Exit {
    fn name(&self) -> &'static str {
        "exit"
    }

    fn execute(&self, _state: &mut State, _out: &mut dyn Write) -> io::Result<Flow> {
        trace!("exit requested");
        Ok(Flow::Exit)
    }
}
