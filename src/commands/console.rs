//! Operator-facing output streams.

use std::fmt::Display;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// The shell's standard output and standard error.
///
/// Commands never print directly; they go through the console so the
/// dispatcher can run against captured buffers.
pub struct Console {
    out: Box<dyn Write + Send>,
    err: Box<dyn Write + Send>,
}

impl Console {
    /// Create a console over arbitrary writers.
    pub fn new(out: impl Write + Send + 'static, err: impl Write + Send + 'static) -> Self {
        Self {
            out: Box::new(out),
            err: Box::new(err),
        }
    }

    /// Console bound to the process's stdout and stderr.
    pub fn stdio() -> Self {
        Self::new(io::stdout(), io::stderr())
    }

    /// Console writing into in-memory buffers.
    ///
    /// Returns the console together with handles to its stdout and stderr.
    pub fn captured() -> (Self, SharedBuffer, SharedBuffer) {
        let out = SharedBuffer::default();
        let err = SharedBuffer::default();
        (Self::new(out.clone(), err.clone()), out, err)
    }

    /// Print a line on stdout.
    pub fn println(&mut self, line: impl Display) -> io::Result<()> {
        writeln!(self.out, "{}", line)?;
        self.out.flush()
    }

    /// Print a line on stderr.
    pub fn eprintln(&mut self, line: impl Display) -> io::Result<()> {
        writeln!(self.err, "{}", line)?;
        self.err.flush()
    }

    /// Report an error to the operator.
    pub fn error(&mut self, err: impl Display) -> io::Result<()> {
        self.eprintln(format_args!("Error: {}", err))
    }

    /// Write raw text on stdout, without adding a newline.
    pub fn write_out(&mut self, text: &str) -> io::Result<()> {
        self.out.write_all(text.as_bytes())?;
        self.out.flush()
    }

    /// Write raw text on stderr, without adding a newline.
    pub fn write_err(&mut self, text: &str) -> io::Result<()> {
        self.err.write_all(text.as_bytes())?;
        self.err.flush()
    }
}

/// Cloneable in-memory writer.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    /// Everything written so far, decoded lossily.
    pub fn contents(&self) -> String {
        self.0
            .lock()
            .map(|buf| String::from_utf8_lossy(&buf).into_owned())
            .unwrap_or_default()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut buf = self
            .0
            .lock()
            .map_err(|_| io::Error::other("buffer lock poisoned"))?;
        buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
