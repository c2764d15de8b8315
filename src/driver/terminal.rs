//! Terminal mode bookkeeping for the line editor.
//!
//! The editor switches the terminal to raw mode while it waits for a line
//! and only switches it back when `readline` returns. When the session ends
//! with a read still pending, the saved mode is put back by hand.

/// The terminal settings of a descriptor, captured at one point in time.
#[cfg(unix)]
pub(crate) struct TerminalMode {
    fd: libc::c_int,
    saved: libc::termios,
}

#[cfg(unix)]
impl TerminalMode {
    /// Capture the mode of standard input, if it is a terminal.
    pub(crate) fn stdin() -> Option<Self> {
        Self::capture(libc::STDIN_FILENO)
    }

    /// Capture the mode of `fd`, if it is a terminal.
    pub(crate) fn capture(fd: libc::c_int) -> Option<Self> {
        // SAFETY: isatty and tcgetattr only read the state of `fd`, and
        // termios is plain data that tcgetattr fills in completely.
        unsafe {
            if libc::isatty(fd) != 1 {
                return None;
            }
            let mut saved = std::mem::zeroed::<libc::termios>();
            if libc::tcgetattr(fd, &mut saved) != 0 {
                return None;
            }
            Some(Self { fd, saved })
        }
    }

    /// Put the captured settings back.
    pub(crate) fn restore(&self) -> std::io::Result<()> {
        // SAFETY: `saved` was produced by tcgetattr on the same descriptor.
        if unsafe { libc::tcsetattr(self.fd, libc::TCSANOW, &self.saved) } != 0 {
            return Err(std::io::Error::last_os_error());
        }
        Ok(())
    }
}

#[cfg(not(unix))]
pub(crate) struct TerminalMode;

#[cfg(not(unix))]
impl TerminalMode {
    pub(crate) fn stdin() -> Option<Self> {
        None
    }

    pub(crate) fn restore(&self) -> std::io::Result<()> {
        Ok(())
    }
}
