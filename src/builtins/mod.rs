use std::io::{self, Write};

use enum_dispatch::enum_dispatch;
use strum::{EnumIter, IntoEnumIterator};

use crate::state::{Flow, State};

pub mod exit;
pub mod history;

/// Sentinel lines handled by the shell itself instead of a child process.
#[enum_dispatch(BuiltinCommands)]
pub trait BuiltinCommand {
    fn name(&self) -> &'static str;
    fn execute(&self, state: &mut State, out: &mut dyn Write) -> io::Result<Flow>;
}

#[enum_dispatch]
#[derive(EnumIter)]
pub enum BuiltinCommands {
    Exit(exit::Exit),
    History(history::History),
}

impl BuiltinCommands {
    /// Builtins only match a whole line.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::iter().find(|cmd| cmd.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_whole_line_only() {
        assert!(matches!(
            BuiltinCommands::from_name("exit"),
            Some(BuiltinCommands::Exit(_))
        ));
        assert!(matches!(
            BuiltinCommands::from_name("history"),
            Some(BuiltinCommands::History(_))
        ));
        assert!(BuiltinCommands::from_name("exit 1").is_none());
        assert!(BuiltinCommands::from_name("ls").is_none());
    }
}
