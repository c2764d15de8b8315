//! Interactive line input.
//!
//! The line editor blocks, so it lives on its own thread. The driver asks
//! for one line at a time, which keeps the prompt from showing up before
//! the previous line has finished.

use std::io::Write;
use std::sync::mpsc as std_mpsc;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::terminal::TerminalMode;
use crate::Result;

/// One reply from the input source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// A line of input, without the trailing newline.
    Line(String),
    /// No more input.
    Eof,
    /// Ctrl-C while the line editor owned the terminal.
    Interrupted,
}

/// Request/reply channel pair to a line-producing thread.
pub struct LineReader {
    requests: std_mpsc::Sender<String>,
    replies: mpsc::Receiver<InputEvent>,
    // A prompt was sent and its reply has not arrived yet.
    pending: bool,
    terminal: Option<TerminalMode>,
}

impl LineReader {
    /// Start a `rustyline` editor on a dedicated thread.
    ///
    /// The terminal mode is saved first and put back if the reader is
    /// dropped while the editor still owns the terminal.
    pub fn spawn_editor() -> Result<Self> {
        let terminal = TerminalMode::stdin();
        let mut reader = Self::spawn("line-editor", move |requests, replies| {
            let mut editor = match DefaultEditor::new() {
                Ok(editor) => editor,
                Err(e) => {
                    warn!("cannot start line editor: {}", e);
                    let _ = replies.blocking_send(InputEvent::Eof);
                    return;
                }
            };

            while let Ok(prompt) = requests.recv() {
                let event = match editor.readline(&prompt) {
                    Ok(line) => {
                        if !line.trim().is_empty() {
                            let _ = editor.add_history_entry(line.as_str());
                        }
                        InputEvent::Line(line)
                    }
                    Err(ReadlineError::Interrupted) => InputEvent::Interrupted,
                    Err(ReadlineError::Eof) => InputEvent::Eof,
                    Err(e) => {
                        warn!("line editor failed: {}", e);
                        InputEvent::Eof
                    }
                };

                let more = matches!(event, InputEvent::Line(_));
                if replies.blocking_send(event).is_err() || !more {
                    break;
                }
            }
        })?;
        reader.terminal = terminal;
        Ok(reader)
    }

    /// Input source answering from a fixed list of lines, then `Eof`.
    pub fn scripted<I, S>(lines: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut lines = lines
            .into_iter()
            .map(Into::into)
            .collect::<Vec<String>>()
            .into_iter();

        Self::spawn("scripted-input", move |requests, replies| {
            while requests.recv().is_ok() {
                let event = lines.next().map(InputEvent::Line).unwrap_or(InputEvent::Eof);
                if replies.blocking_send(event).is_err() {
                    break;
                }
            }
        })
    }

    /// Input source answering with `events` in order.
    ///
    /// Once the list runs out it never answers again, like an operator who
    /// stopped typing.
    pub fn from_events<I>(events: I) -> Result<Self>
    where
        I: IntoIterator<Item = InputEvent>,
    {
        let mut events = events.into_iter().collect::<Vec<_>>().into_iter();

        Self::spawn("event-input", move |requests, replies| {
            while requests.recv().is_ok() {
                if let Some(event) = events.next() {
                    if replies.blocking_send(event).is_err() {
                        break;
                    }
                }
            }
        })
    }

    fn spawn<F>(name: &str, body: F) -> Result<Self>
    where
        F: FnOnce(std_mpsc::Receiver<String>, mpsc::Sender<InputEvent>) + Send + 'static,
    {
        let (requests, request_rx) = std_mpsc::channel();
        let (reply_tx, replies) = mpsc::channel(1);
        std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || body(request_rx, reply_tx))?;
        Ok(Self {
            requests,
            replies,
            pending: false,
            terminal: None,
        })
    }

    /// Show `prompt` and wait for the next line.
    ///
    /// Cancel safe: dropping the future leaves the request outstanding, and
    /// its reply is returned by the next call.
    pub async fn next_line(&mut self, prompt: &str) -> InputEvent {
        if !self.pending {
            if self.requests.send(prompt.to_string()).is_err() {
                return InputEvent::Eof;
            }
            self.pending = true;
        }
        let event = self.replies.recv().await.unwrap_or(InputEvent::Eof);
        self.pending = false;
        event
    }

    /// Whether a prompt is waiting for its reply.
    pub fn is_pending(&self) -> bool {
        self.pending
    }
}

impl Drop for LineReader {
    fn drop(&mut self) {
        if !self.pending {
            return;
        }
        if let Some(terminal) = &self.terminal {
            debug!("restoring terminal mode of abandoned prompt");
            if let Err(e) = terminal.restore() {
                warn!("failed to restore terminal mode: {}", e);
            }
            // Move past the prompt the editor left on screen.
            let mut stdout = std::io::stdout();
            let _ = writeln!(stdout);
            let _ = stdout.flush();
        }
    }
}
