use std::io;

use thiserror::Error;
use tokio::io::{stdin, AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};

#[derive(Debug, Error)]
pub enum InputError {
    #[error("Input line too long, max of {max} characters is allowed")]
    LineTooLong { max: usize },
    #[error("Input is not valid UTF-8")]
    Encoding,
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Reads one bounded line at a time from the shell's input.
pub struct LineReader<R> {
    reader: R,
    max_line: usize,
    buf: String,
}

impl LineReader<BufReader<Stdin>> {
    pub fn stdin(max_line: usize) -> Self {
        Self::new(BufReader::new(stdin()), max_line)
    }
}

impl<R: AsyncBufRead + Unpin> LineReader<R> {
    pub fn new(reader: R, max_line: usize) -> Self {
        Self {
            reader,
            max_line,
            buf: String::new(),
        }
    }

    /// `Ok(None)` at end of input. The line ending is stripped.
    pub async fn next_line(&mut self) -> Result<Option<String>, InputError> {
        self.buf.clear();

        let read = match self.reader.read_line(&mut self.buf).await {
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::InvalidData => {
                return Err(InputError::Encoding)
            }
            Err(err) => return Err(err.into()),
        };

        if read == 0 {
            return Ok(None);
        }

        let line = self.buf.strip_suffix('\n').unwrap_or(&self.buf);
        let line = line.strip_suffix('\r').unwrap_or(line);

        if line.len() > self.max_line {
            return Err(InputError::LineTooLong { max: self.max_line });
        }

        Ok(Some(line.to_owned()))
    }
}
