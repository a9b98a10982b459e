//! Input stream handed to create/edit flows: piped data seeds a node body.

use std::io::{self, IsTerminal, Read, Stdin};

use crate::error::{KegError, KegResult};

/// Reader plus whether it is piped (not an interactive terminal).
#[derive(Debug)]
pub struct Stream<R> {
    reader: R,
    piped: bool,
}

impl Stream<Stdin> {
    /// Standard input; piped when stdin is not a terminal.
    #[must_use]
    pub fn stdin() -> Self {
        let stdin = io::stdin();
        let piped = !stdin.is_terminal();
        Self {
            reader: stdin,
            piped,
        }
    }
}

impl<R: Read> Stream<R> {
    /// Wrap an arbitrary reader.
    pub const fn new(reader: R, piped: bool) -> Self {
        Self { reader, piped }
    }

    /// Whether input is being piped.
    #[must_use]
    pub const fn is_piped(&self) -> bool {
        self.piped
    }

    /// Drain piped input. `None` for terminals and empty pipes.
    ///
    /// # Errors
    ///
    /// [`KegError::Io`] on read failure.
    pub fn read_seed(&mut self) -> KegResult<Option<Vec<u8>>> {
        if !self.piped {
            return Ok(None);
        }
        let mut buf = Vec::new();
        self.reader
            .read_to_end(&mut buf)
            .map_err(|e| KegError::io("<stdin>", e))?;
        Ok((!buf.is_empty()).then_some(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_stream_is_not_read() -> KegResult<()> {
        let mut stream = Stream::new(&b"ignored"[..], false);
        assert_eq!(stream.read_seed()?, None);
        Ok(())
    }

    #[test]
    fn test_piped_stream_seeds_body() -> KegResult<()> {
        let mut stream = Stream::new(&b"# Piped\n"[..], true);
        assert!(stream.is_piped());
        assert_eq!(stream.read_seed()?, Some(b"# Piped\n".to_vec()));
        let mut empty = Stream::new(&b""[..], true);
        assert_eq!(empty.read_seed()?, None);
        Ok(())
    }
}
