use std::{path::PathBuf, str::FromStr};

use strum::{Display, EnumString};
use thiserror::Error;

use crate::{
    cmd::{
        execution_plan::{PipelineRequest, StageSpec},
        resolve::PathResolver,
    },
    config::Limits,
};

use self::token::LexerError;

pub mod token;

pub use token::tokenize;

pub const SEPARATOR: &str = "->";

#[derive(Debug, Error)]
pub enum ParseError {
    /// Names the whole input line; `name` is the token that failed to resolve.
    #[error("{input}: command not found")]
    CommandNotFound { input: String, name: String },
    #[error("Too many tokens, max of {max} is allowed")]
    TooManyTokens { max: usize },
    #[error("Too many arguments, max of {max} is allowed")]
    TooManyArguments { max: usize },
    #[error("Too many pipes, max of {max} is allowed")]
    TooManyPipes { max: usize },
    #[error("command {input} {reason}")]
    MalformedPipeline { input: String, reason: Malformation },
    #[error(transparent)]
    Lexer(#[from] LexerError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Malformation {
    #[error("must have tokens before and after arrows")]
    MissingTokens,
    #[error("must contain ->")]
    MissingSeparator,
    #[error("must contain a command before ->")]
    MissingCommand,
    #[error("must contain another command following ->")]
    MissingNextCommand,
    #[error("must contain an output file following ->")]
    MissingOutputFile,
    #[error("must contain one output file following the ->")]
    WrongOutputCount,
}

/// Leading keywords that switch the line out of plain execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum Keyword {
    #[strum(serialize = "OR")]
    Redirect,
    #[strum(serialize = "PP")]
    Pipe,
    #[strum(serialize = "ORPP")]
    PipeRedirect,
}

impl Keyword {
    fn missing_operand(self) -> Malformation {
        match self {
            Self::Redirect => Malformation::WrongOutputCount,
            Self::Pipe => Malformation::MissingNextCommand,
            Self::PipeRedirect => Malformation::MissingOutputFile,
        }
    }
}

/// Validates a tokenized line and resolves every command in it. Nothing is
/// spawned here, so any error leaves the system untouched.
pub fn parse_request(
    input: &str,
    tokens: &[String],
    resolver: &PathResolver,
    limits: &Limits,
) -> Result<PipelineRequest, ParseError> {
    let malformed = |reason| ParseError::MalformedPipeline {
        input: input.to_owned(),
        reason,
    };

    let Some((first, rest)) = tokens.split_first() else {
        return Err(malformed(Malformation::MissingTokens));
    };

    let Ok(keyword) = Keyword::from_str(first) else {
        return Ok(PipelineRequest::Simple(stage(input, tokens, resolver, limits)?));
    };

    trace!(%keyword, "parsing pipeline");

    if rest.is_empty() {
        return Err(malformed(Malformation::MissingTokens));
    }

    let groups = rest
        .split(|token| token == SEPARATOR)
        .collect::<Vec<_>>();

    if groups[0].is_empty() {
        return Err(malformed(Malformation::MissingCommand));
    }

    if groups[1..].iter().any(|group| group.is_empty()) {
        return Err(malformed(keyword.missing_operand()));
    }

    if groups.len() < 2 {
        return Err(malformed(Malformation::MissingSeparator));
    }

    match keyword {
        Keyword::Redirect => {
            let &[command, dest] = &groups[..] else {
                return Err(malformed(Malformation::WrongOutputCount));
            };
            let dest =
                destination(dest).ok_or_else(|| malformed(Malformation::WrongOutputCount))?;

            Ok(PipelineRequest::Redirect(
                stage(input, command, resolver, limits)?,
                dest,
            ))
        }
        Keyword::Pipe => Ok(PipelineRequest::Pipe(stages(
            input, &groups, resolver, limits,
        )?)),
        Keyword::PipeRedirect => {
            // `groups` has at least two entries here
            let (dest, commands) = groups
                .split_last()
                .ok_or_else(|| malformed(Malformation::MissingSeparator))?;
            let dest =
                destination(dest).ok_or_else(|| malformed(Malformation::WrongOutputCount))?;

            Ok(PipelineRequest::PipeRedirect(
                stages(input, commands, resolver, limits)?,
                dest,
            ))
        }
    }
}

fn destination(group: &[String]) -> Option<PathBuf> {
    match group {
        [file] => Some(PathBuf::from(file)),
        _ => None,
    }
}

fn stages(
    input: &str,
    groups: &[&[String]],
    resolver: &PathResolver,
    limits: &Limits,
) -> Result<Vec<StageSpec>, ParseError> {
    if groups.len() > limits.max_stages {
        return Err(ParseError::TooManyPipes {
            max: limits.max_stages,
        });
    }

    groups
        .iter()
        .map(|group| stage(input, group, resolver, limits))
        .collect()
}

fn stage(
    input: &str,
    group: &[String],
    resolver: &PathResolver,
    limits: &Limits,
) -> Result<StageSpec, ParseError> {
    let not_found = |name: &str| ParseError::CommandNotFound {
        input: input.to_owned(),
        name: name.to_owned(),
    };

    let Some((name, args)) = group.split_first() else {
        return Err(not_found(""));
    };

    if args.len() > limits.max_args {
        return Err(ParseError::TooManyArguments {
            max: limits.max_args,
        });
    }

    let program = resolver
        .resolve(name)
        .ok_or_else(|| not_found(name.as_str()))?;

    Ok(StageSpec::new(program, args.to_vec()))
}
