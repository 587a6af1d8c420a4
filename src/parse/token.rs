use logos::Logos;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Default, Error)]
pub enum LexerError {
    #[default]
    #[error("unrecognized input")]
    Unrecognized,
}

/// Words are split on spaces only. There is no quoting, so a word never
/// contains a space; runs of spaces never produce empty words.
#[derive(Debug, PartialEq, Logos)]
#[logos(skip r" +", error = LexerError)]
pub enum Token<'a> {
    #[regex(r"[^ ]+")]
    Word(&'a str),
}

pub fn tokenize(line: &str, max_tokens: usize) -> Result<Vec<String>, super::ParseError> {
    let mut tokens = Vec::new();

    for token in Token::lexer(line) {
        let Token::Word(word) = token?;

        if tokens.len() == max_tokens {
            return Err(super::ParseError::TooManyTokens { max: max_tokens });
        }

        tokens.push(word.to_owned());
    }

    Ok(tokens)
}
