//! Interactive console
//!
//! A small line-oriented front end to the enforcement engine. During the
//! blocking period the console is "hidden": it only answers `open` and
//! `status` until it is opened again.

use curfew_core::{
    BlockOutcome, EnforcementEngine, EnforcementState, EngineStatus, UiIntent, UnblockOutcome,
};
use curfew_util::{CurfewError, ListKind, format_datetime_full, format_duration};
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use crate::input::LineInput;

const DEFAULT_LOG_ENTRIES: usize = 10;

const HELP: &str = "\
Commands:
  status                          show the blocking period and counters
  list [websites|apps]            show blocked names
  block <website|app> <name>      add a name to a blocklist
  unblock <website|app> <name>    remove a name (password, attempt limit, challenge)
  password set|clear              change the unblock password
  log [n]                         show recent audit entries
  open                            show the console during the blocking period
  quit                            stop curfew (not during the blocking period)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Status,
    List(Option<ListKind>),
    Block(ListKind, String),
    Unblock(ListKind, String),
    PasswordSet,
    PasswordClear,
    Log(usize),
    Open,
    Quit,
}

/// Parse one console line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "help" | "?" => Command::Help,
        "status" => Command::Status,
        "list" | "ls" => Command::List(words.next().map(str::parse::<ListKind>).transpose()?),
        verb @ ("block" | "unblock") => {
            let kind: ListKind = words
                .next()
                .ok_or_else(|| format!("usage: {} <website|app> <name>", verb))?
                .parse()?;
            let name = words.collect::<Vec<_>>().join(" ");
            if name.is_empty() {
                return Err(format!("usage: {} <website|app> <name>", verb));
            }
            if verb == "block" {
                Command::Block(kind, name)
            } else {
                Command::Unblock(kind, name)
            }
        }
        "password" => match words.next() {
            Some("set") => Command::PasswordSet,
            Some("clear") => Command::PasswordClear,
            _ => return Err("usage: password set|clear".into()),
        },
        "log" => match words.next() {
            Some(n) => Command::Log(n.parse().map_err(|_| format!("not a number: {}", n))?),
            None => Command::Log(DEFAULT_LOG_ENTRIES),
        },
        "open" | "show" => Command::Open,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("unknown command '{}', try 'help'", other)),
    };

    Ok(Some(command))
}

/// Visibility of the console, driven by UI intents
#[derive(Debug, Default)]
pub struct ConsoleView {
    hidden: AtomicBool,
}

impl ConsoleView {
    pub fn is_hidden(&self) -> bool {
        self.hidden.load(Ordering::SeqCst)
    }

    pub fn open(&self) {
        self.hidden.store(false, Ordering::SeqCst);
    }

    pub fn apply(&self, intent: &UiIntent) {
        match intent {
            UiIntent::Hide => {
                self.hidden.store(true, Ordering::SeqCst);
                println!("Blocking period active. Console hidden, type 'open' to show it.");
            }
            UiIntent::Show => {
                self.hidden.store(false, Ordering::SeqCst);
                println!("Blocking period over.");
            }
            UiIntent::Notify(message) => println!("{}", message),
        }
    }

    fn accepts(&self, command: &Command) -> bool {
        !self.is_hidden() || matches!(command, Command::Open | Command::Status)
    }
}

pub struct Console {
    engine: Arc<EnforcementEngine>,
    input: Arc<LineInput>,
    view: Arc<ConsoleView>,
    quit: UnboundedSender<()>,
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

impl Console {
    pub fn new(
        engine: Arc<EnforcementEngine>,
        input: Arc<LineInput>,
        view: Arc<ConsoleView>,
        quit: UnboundedSender<()>,
    ) -> Self {
        Self {
            engine,
            input,
            view,
            quit,
        }
    }

    /// Run the console on its own thread; engine calls (including the
    /// unblock challenge) block only that thread
    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        std::thread::Builder::new()
            .name("console".into())
            .spawn(move || self.run())
    }

    fn run(&self) {
        println!("curfew console. Type 'help' for commands.");

        loop {
            prompt("> ");
            let Some(line) = self.input.read_line() else {
                info!("Console input closed");
                return;
            };

            let command = match parse_command(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(message) => {
                    println!("{}", message);
                    continue;
                }
            };

            if self.execute(command) == Flow::Quit {
                if self.quit.send(()).is_err() {
                    warn!("Service already stopped");
                }
                return;
            }
        }
    }

    fn execute(&self, command: Command) -> Flow {
        if !self.view.accepts(&command) {
            println!("The console is hidden during the blocking period. Type 'open' to show it.");
            return Flow::Continue;
        }

        let now = curfew_util::now();

        match command {
            Command::Help => println!("{}", HELP),
            Command::Status => print_status(&self.engine.status(now)),
            Command::List(kind) => {
                let kinds = match kind {
                    Some(kind) => vec![kind],
                    None => ListKind::ALL.to_vec(),
                };
                for kind in kinds {
                    let names = self.engine.blocked(kind);
                    println!("Blocked {} ({}):", kind.plural(), names.len());
                    for name in names {
                        println!("  {}", name);
                    }
                }
            }
            Command::Block(kind, name) => match self.engine.block(kind, &name, now) {
                Ok(BlockOutcome::Blocked(name)) => println!("Blocked {} {}.", kind, name),
                Ok(BlockOutcome::AlreadyBlocked(name)) => {
                    println!("{} is already blocked.", name)
                }
                Ok(BlockOutcome::Rejected(reason)) => println!("Not blocked: {}", reason),
                Err(e) => self.report_error(e),
            },
            Command::Unblock(kind, name) => self.unblock(kind, &name),
            Command::PasswordSet => self.change_password(true),
            Command::PasswordClear => self.change_password(false),
            Command::Log(limit) => match self.engine.recent_audits(limit) {
                Ok(events) => {
                    for event in events.iter().rev() {
                        println!("{}  {}", format_datetime_full(&event.timestamp), event.event);
                    }
                }
                Err(e) => self.report_error(e),
            },
            Command::Open => {
                self.view.open();
                println!("Console open.");
            }
            Command::Quit => {
                let status = self.engine.status(now);
                if status.state == EnforcementState::Enforcing {
                    println!(
                        "Cannot quit during the blocking period ({} left).",
                        status.ends_in.map(format_duration).unwrap_or_default()
                    );
                    return Flow::Continue;
                }
                return Flow::Quit;
            }
        }

        Flow::Continue
    }

    fn unblock(&self, kind: ListKind, name: &str) {
        let password = if self.engine.requires_password() {
            match self.ask_secret("password> ") {
                Some(password) => password,
                None => return,
            }
        } else {
            String::new()
        };

        // The challenge runs on this thread; use the time of the request
        match self.engine.unblock(kind, name, &password, curfew_util::now()) {
            Ok(UnblockOutcome::Unblocked(name)) => println!("Unblocked {} {}.", kind, name),
            Ok(UnblockOutcome::NotBlocked(name)) => println!("{} is not blocked.", name),
            Ok(UnblockOutcome::Denied(denial)) => println!("Unblock denied: {}.", denial),
            Err(e) => self.report_error(e),
        }
    }

    fn change_password(&self, set: bool) {
        let current = if self.engine.requires_password() {
            match self.ask_secret("current password> ") {
                Some(password) => password,
                None => return,
            }
        } else {
            String::new()
        };

        let new = if set {
            let Some(first) = self.ask_secret("new password> ") else { return };
            let Some(second) = self.ask_secret("repeat new password> ") else { return };
            if first != second {
                println!("Passwords do not match.");
                return;
            }
            Some(first)
        } else {
            None
        };

        match self
            .engine
            .change_password(&current, new.as_deref(), curfew_util::now())
        {
            Ok(true) if set => println!("Password set."),
            Ok(true) => println!("Password cleared."),
            Ok(false) => println!("Incorrect password."),
            Err(e) => self.report_error(e),
        }
    }

    fn ask(&self, question: &str) -> Option<String> {
        prompt(question);
        self.input.read_line().map(|line| line.trim().to_string())
    }

    fn ask_secret(&self, question: &str) -> Option<String> {
        self.input.read_secret(question).map(|line| line.trim().to_string())
    }

    fn report_error(&self, error: CurfewError) {
        println!("Error: {}", error);
        if !error.needs_elevation() || !self.engine.can_relaunch_elevated() {
            return;
        }

        let answer = self.ask("Relaunch with administrator rights? [y/N] ");
        if !matches!(answer.as_deref(), Some("y" | "Y" | "yes")) {
            return;
        }

        // Only returns if the relaunch did not happen
        if let Err(e) = self.engine.relaunch_elevated() {
            warn!(error = %e, "Relaunch failed");
            println!("Relaunch failed: {}", e);
        }
    }
}

fn print_status(status: &EngineStatus) {
    let timing = match (status.ends_in, status.resumes_in) {
        (Some(ends_in), _) => format!("ends in {}", format_duration(ends_in)),
        (None, Some(resumes_in)) => format!("starts in {}", format_duration(resumes_in)),
        (None, None) => String::new(),
    };

    println!("State:     {} ({})", status.state, timing);
    println!("Schedule:  {}", status.window);
    println!("Blocked:   {} websites, {} apps", status.websites, status.apps);
    println!(
        "Unblocks:  {} of {} attempts used this hour",
        status.attempts_used, status.max_attempts
    );
    println!(
        "Password:  {}",
        if status.password_set { "set" } else { "not set" }
    );
    println!(
        "Privilege: {}",
        if status.elevated {
            "administrator"
        } else {
            "user (website changes need administrator rights)"
        }
    );
    if status.hosts_pending {
        println!("Hosts:     update pending, will retry");
    }
}

fn prompt(text: &str) {
    print!("{}", text);
    let _ = std::io::stdout().flush();
}
