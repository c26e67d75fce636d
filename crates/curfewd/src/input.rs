//! Line input shared by the console and the challenge prompt
//!
//! A reader thread reads one line per request, so nothing is taken from the
//! terminal before a prompt asks for it. That lets secret prompts switch
//! echo off for exactly the line they read.

use nix::sys::termios::{self, FlushArg};
use parking_lot::Mutex;
use std::io::{BufRead, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadLine {
    Line(String),
    TimedOut,
    Closed,
}

/// Where the reader thread gets its lines from. `None` means input ended.
pub trait LineSource: Send + 'static {
    fn read_line(&mut self) -> Option<String>;

    /// Show `prompt` and read a line without echoing it
    fn read_secret(&mut self, prompt: &str) -> Option<String>;
}

/// stdin, with hidden input read from the controlling terminal
struct TerminalSource;

impl LineSource for TerminalSource {
    fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match std::io::stdin().lock().read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.trim_end_matches(['\n', '\r']).to_string()),
            Err(e) => {
                warn!(error = %e, "Failed to read console input");
                None
            }
        }
    }

    fn read_secret(&mut self, prompt: &str) -> Option<String> {
        match rpassword::prompt_password(prompt) {
            Ok(secret) => Some(secret),
            Err(e) => {
                // No controlling terminal, e.g. input piped in
                warn!(error = %e, "Hidden input unavailable, reading a visible line");
                print!("{}", prompt);
                let _ = std::io::stdout().flush();
                self.read_line()
            }
        }
    }
}

enum Request {
    Line,
    Secret(String),
}

struct Reader {
    requests: Option<Sender<Request>>,
    lines: Receiver<String>,
    /// A request was sent and its line not yet received
    pending: bool,
}

impl Reader {
    fn request(&mut self, request: Request) {
        if self.pending {
            return;
        }
        if let Some(requests) = &self.requests
            && requests.send(request).is_err()
        {
            debug!("Input reader already stopped");
        }
        self.pending = true;
    }

    fn received(&mut self, line: Option<String>) -> Option<String> {
        if line.is_some() {
            self.pending = false;
        }
        line
    }
}

/// Lines typed by the user, delivered through a channel so reads can time out
pub struct LineInput {
    reader: Mutex<Reader>,
    terminal: bool,
}

impl LineInput {
    /// Read from stdin on a dedicated thread
    pub fn stdin() -> Self {
        Self::spawn(TerminalSource, true)
    }

    /// Serve requests from `source` on a dedicated thread. `terminal`
    /// enables discarding typed-ahead input in [`LineInput::drain`].
    pub fn spawn(source: impl LineSource, terminal: bool) -> Self {
        let (request_tx, request_rx) = mpsc::channel();
        let (line_tx, line_rx) = mpsc::channel();

        let spawned = std::thread::Builder::new()
            .name("input-reader".into())
            .spawn(move || serve(source, request_rx, line_tx));

        // Without the reader the line channel is simply closed
        if let Err(e) = spawned {
            warn!(error = %e, "Failed to start input reader");
        }

        Self {
            reader: Mutex::new(Reader {
                requests: Some(request_tx),
                lines: line_rx,
                pending: false,
            }),
            terminal,
        }
    }

    /// Input fed directly through a channel, without a reader thread
    pub fn from_receiver(rx: Receiver<String>) -> Self {
        Self {
            reader: Mutex::new(Reader {
                requests: None,
                lines: rx,
                pending: false,
            }),
            terminal: false,
        }
    }

    /// Block until a line arrives; `None` once input is closed
    pub fn read_line(&self) -> Option<String> {
        let mut reader = self.reader.lock();
        reader.request(Request::Line);
        let line = reader.lines.recv().ok();
        reader.received(line)
    }

    /// Prompt for a line that is not echoed back
    pub fn read_secret(&self, prompt: &str) -> Option<String> {
        let mut reader = self.reader.lock();
        if reader.pending {
            // The terminal is already being read for an earlier prompt
            warn!("Earlier prompt still waiting, reading the secret with echo");
            print!("{}", prompt);
            let _ = std::io::stdout().flush();
        }
        reader.request(Request::Secret(prompt.to_string()));
        let line = reader.lines.recv().ok();
        reader.received(line)
    }

    /// Discard lines typed ahead of a prompt
    pub fn drain(&self) -> usize {
        let mut reader = self.reader.lock();
        if self.terminal {
            discard_terminal_input();
        }

        let skipped = std::iter::from_fn(|| reader.lines.try_recv().ok()).count();
        if skipped > 0 {
            reader.pending = false;
        }
        skipped
    }

    /// Like [`LineInput::read_line`], giving up after `timeout`. A line
    /// typed after the timeout is returned by the next read.
    pub fn read_line_timeout(&self, timeout: Duration) -> ReadLine {
        let mut reader = self.reader.lock();
        reader.request(Request::Line);
        match reader.lines.recv_timeout(timeout) {
            Ok(line) => {
                reader.pending = false;
                ReadLine::Line(line)
            }
            Err(RecvTimeoutError::Timeout) => ReadLine::TimedOut,
            Err(RecvTimeoutError::Disconnected) => ReadLine::Closed,
        }
    }
}

fn serve(mut source: impl LineSource, requests: Receiver<Request>, lines: Sender<String>) {
    for request in requests {
        let line = match request {
            Request::Line => source.read_line(),
            Request::Secret(prompt) => source.read_secret(&prompt),
        };
        let Some(line) = line else { break };
        if lines.send(line).is_err() {
            break;
        }
    }
    debug!("Input closed");
}

/// Drop whatever the terminal holds that nobody has read yet
fn discard_terminal_input() {
    if let Err(e) = termios::tcflush(std::io::stdin(), FlushArg::TCIFLUSH) {
        debug!(error = %e, "Could not discard typed-ahead input");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Arc;

    /// Scripted lines, recording which kind of read consumed each one
    struct Scripted {
        lines: VecDeque<&'static str>,
        reads: Arc<Mutex<Vec<String>>>,
    }

    impl LineSource for Scripted {
        fn read_line(&mut self) -> Option<String> {
            self.reads.lock().push("line".into());
            self.lines.pop_front().map(str::to_string)
        }

        fn read_secret(&mut self, prompt: &str) -> Option<String> {
            self.reads.lock().push(format!("secret {}", prompt));
            self.lines.pop_front().map(str::to_string)
        }
    }

    fn scripted(lines: &[&'static str]) -> (LineInput, Arc<Mutex<Vec<String>>>) {
        let reads = Arc::new(Mutex::new(Vec::new()));
        let source = Scripted {
            lines: lines.iter().copied().collect(),
            reads: reads.clone(),
        };
        (LineInput::spawn(source, false), reads)
    }

    #[test]
    fn reads_then_reports_closed() {
        let (tx, rx) = mpsc::channel();
        let input = LineInput::from_receiver(rx);

        tx.send("status".to_string()).unwrap();
        assert_eq!(input.read_line().as_deref(), Some("status"));
        assert_eq!(
            input.read_line_timeout(Duration::from_millis(10)),
            ReadLine::TimedOut
        );

        tx.send("a".to_string()).unwrap();
        tx.send("b".to_string()).unwrap();
        assert_eq!(input.drain(), 2);

        drop(tx);
        assert_eq!(input.read_line(), None);
        assert_eq!(input.read_line_timeout(Duration::from_millis(10)), ReadLine::Closed);
    }

    #[test]
    fn reader_waits_for_a_request() {
        let (input, reads) = scripted(&["unblock app steam", "hunter2"]);

        std::thread::sleep(Duration::from_millis(50));
        assert!(reads.lock().is_empty());

        assert_eq!(input.read_line().as_deref(), Some("unblock app steam"));
        assert_eq!(*reads.lock(), vec!["line"]);
    }

    #[test]
    fn secrets_use_hidden_read() {
        let (input, reads) = scripted(&["unblock app steam", "hunter2"]);

        assert_eq!(input.read_line().as_deref(), Some("unblock app steam"));
        assert_eq!(input.read_secret("password> ").as_deref(), Some("hunter2"));
        assert_eq!(*reads.lock(), vec!["line", "secret password> "]);

        // Source exhausted: the reader stops and input is closed
        assert_eq!(input.read_line(), None);
    }
}
