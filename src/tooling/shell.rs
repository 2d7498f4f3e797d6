//! Interactive Shell
//!
//! Line-oriented browser over a [`DriveSession`]. Every navigation waits for
//! the listener's terminal event before the next prompt, so at most one
//! delivery is outstanding at a time.

use crate::error::DriveError;
use crate::model::Entry;
use crate::session::DriveSession;
use crate::tooling::format::{format_error, format_listing, format_notice};
use crate::tree::NavEvent;
use dialoguer::{Confirm, Input};
use std::path::PathBuf;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

const HELP: &str = "\
Commands:
  ls                     show the current folder
  cd <folder>            enter a folder from the listing
  cd ..  | back          go to the parent folder
  cd /                   go to the root folder
  refresh                reload the current folder from the server
  pwd                    print the current path
  mkdir <name>           create a folder here
  rename <name> <new>    rename an item in this folder
  rm [-f] <name>         delete an item in this folder
  get <file>             download a file
  help                   show this help
  quit                   leave the shell
Names containing spaces can be quoted: cd \"My Files\"";

/// A parsed shell line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Empty,
    List,
    Cd(String),
    Back,
    Root,
    Refresh,
    Pwd,
    Mkdir(String),
    Rename { from: String, to: String },
    Rm { name: String, force: bool },
    Get(String),
    Help,
    Quit,
}

impl ShellCommand {
    pub fn parse(line: &str) -> Result<Self, DriveError> {
        let args = split_args(line)?;
        let Some((command, rest)) = args.split_first() else {
            return Ok(ShellCommand::Empty);
        };
        let joined = rest.join(" ");

        let parsed = match command.as_str() {
            "ls" | "list" => ShellCommand::List,
            "cd" => match joined.as_str() {
                "" => return Err(usage("cd <folder>")),
                ".." => ShellCommand::Back,
                "/" | "~" => ShellCommand::Root,
                _ => ShellCommand::Cd(joined),
            },
            "back" => ShellCommand::Back,
            "refresh" => ShellCommand::Refresh,
            "pwd" => ShellCommand::Pwd,
            "mkdir" if !joined.is_empty() => ShellCommand::Mkdir(joined),
            "mkdir" => return Err(usage("mkdir <name>")),
            "rename" | "mv" => match rest {
                [from, to] => ShellCommand::Rename {
                    from: from.clone(),
                    to: to.clone(),
                },
                _ => return Err(usage("rename <name> <new name>")),
            },
            "rm" | "del" => {
                let force = rest.first().map(|a| a == "-f").unwrap_or(false);
                let name = if force { rest[1..].join(" ") } else { joined };
                if name.is_empty() {
                    return Err(usage("rm [-f] <name>"));
                }
                ShellCommand::Rm { name, force }
            }
            "get" | "download" if !joined.is_empty() => ShellCommand::Get(joined),
            "get" | "download" => return Err(usage("get <file>")),
            "help" | "?" => ShellCommand::Help,
            "quit" | "exit" | "q" => ShellCommand::Quit,
            other => {
                return Err(DriveError::InvalidOperation(format!(
                    "Unknown command: {} (type 'help')",
                    other
                )))
            }
        };
        Ok(parsed)
    }
}

fn usage(text: &str) -> DriveError {
    DriveError::InvalidOperation(format!("usage: {}", text))
}

/// Split a line into whitespace-separated arguments, honouring quotes
pub fn split_args(line: &str) -> Result<Vec<String>, DriveError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut in_arg = false;

    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_arg = true;
            }
            None if c.is_whitespace() => {
                if in_arg {
                    args.push(std::mem::take(&mut current));
                    in_arg = false;
                }
            }
            None => {
                current.push(c);
                in_arg = true;
            }
        }
    }
    if quote.is_some() {
        return Err(DriveError::InvalidOperation(
            "Unterminated quote".to_string(),
        ));
    }
    if in_arg {
        args.push(current);
    }
    Ok(args)
}

/// Look up an entry by display name
///
/// Names compare after NFC normalization. A case-insensitive match is used
/// only when it is unambiguous.
pub fn find_entry<'a>(items: &'a [Entry], name: &str) -> Option<&'a Entry> {
    let wanted: String = name.nfc().collect();
    if let Some(exact) = items.iter().find(|e| e.name.nfc().eq(wanted.chars())) {
        return Some(exact);
    }
    let lowered = wanted.to_lowercase();
    let mut matches = items
        .iter()
        .filter(|e| e.name.nfc().collect::<String>().to_lowercase() == lowered);
    let first = matches.next();
    if matches.next().is_some() {
        return None;
    }
    first
}

/// Wait for the next Loaded or Failed event
pub async fn next_terminal_event(
    events: &mut UnboundedReceiver<NavEvent>,
) -> Result<NavEvent, DriveError> {
    while let Some(event) = events.recv().await {
        if event.is_terminal() {
            return Ok(event);
        }
        debug!("Listing is loading");
    }
    Err(DriveError::InvalidOperation(
        "Navigation listener disconnected".to_string(),
    ))
}

/// Result of one shell command
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Output(String),
    Quit,
}

pub struct Shell {
    session: DriveSession,
    events: UnboundedReceiver<NavEvent>,
    runtime: Handle,
    /// Last listing delivered for the current folder
    listing: Vec<Entry>,
}

impl Shell {
    /// `events` must receive the callbacks of the session's cache listener
    pub fn new(session: DriveSession, events: UnboundedReceiver<NavEvent>, runtime: Handle) -> Self {
        Self {
            session,
            events,
            runtime,
            listing: Vec::new(),
        }
    }

    pub fn session(&self) -> &DriveSession {
        &self.session
    }

    pub fn listing(&self) -> &[Entry] {
        &self.listing
    }

    /// Position at the root and wait for its listing
    pub fn start(&mut self) -> Result<String, DriveError> {
        self.session.cache().init();
        self.await_listing()
    }

    /// Walk a slash-separated path of folder names below the root
    pub fn open_path(&mut self, path: &str) -> Result<String, DriveError> {
        let mut output = self.start()?;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            output = self.enter(segment)?;
        }
        Ok(output)
    }

    /// Download a file from the current listing
    pub fn download(&self, name: &str) -> Result<PathBuf, DriveError> {
        let entry = self.lookup(name)?.clone();
        if entry.is_folder() {
            return Err(DriveError::InvalidOperation(format!(
                "{} is a folder; only files can be downloaded",
                entry.name
            )));
        }
        self.runtime.block_on(self.session.download(&entry))
    }

    /// Read commands until `quit` or end of input
    pub fn run(&mut self) -> Result<(), DriveError> {
        match self.start() {
            Ok(listing) => println!("{}", listing),
            Err(e) => eprintln!("{}", format_error(&e.to_string())),
        }
        loop {
            let line: String = Input::new()
                .with_prompt(self.session.cache().current_path())
                .allow_empty(true)
                .interact_text()
                .map_err(|e| DriveError::InvalidOperation(format!("Failed to read input: {}", e)))?;

            let result = ShellCommand::parse(&line).and_then(|command| self.execute(command));
            match result {
                Ok(Outcome::Quit) => break,
                Ok(Outcome::Output(text)) if text.is_empty() => {}
                Ok(Outcome::Output(text)) => println!("{}", text),
                Err(e) => eprintln!("{}", format_error(&e.to_string())),
            }
        }
        Ok(())
    }

    pub fn execute(&mut self, command: ShellCommand) -> Result<Outcome, DriveError> {
        let output = match command {
            ShellCommand::Empty => String::new(),
            ShellCommand::Quit => return Ok(Outcome::Quit),
            ShellCommand::Help => HELP.to_string(),
            ShellCommand::Pwd => self.session.cache().current_path(),
            ShellCommand::List => match self.session.cache().current_items() {
                Some(items) => {
                    self.listing = items;
                    format_listing(&self.session.cache().current_path(), &self.listing, true)
                }
                None => format!(
                    "{} has no listing loaded; use 'refresh' to retry",
                    self.session.cache().current_path()
                ),
            },
            ShellCommand::Cd(name) => self.enter(&name)?,
            ShellCommand::Back => {
                if !self.session.cache().go_back() {
                    return Err(DriveError::InvalidOperation(
                        "Already at the root folder".to_string(),
                    ));
                }
                self.await_listing()?
            }
            ShellCommand::Root => self.start()?,
            ShellCommand::Refresh => {
                self.session.cache().refresh();
                self.await_listing()?
            }
            ShellCommand::Mkdir(name) => {
                let created = self.runtime.block_on(self.session.create_folder(&name))?;
                self.with_refreshed_listing(format!("Created folder {}", created.name), true)?
            }
            ShellCommand::Rename { from, to } => {
                let entry = self.lookup(&from)?.clone();
                let refreshes = self.affects_current(&entry);
                let renamed = self.runtime.block_on(self.session.rename(&entry, &to))?;
                self.with_refreshed_listing(
                    format!("Renamed {} to {}", entry.name, renamed.name),
                    refreshes,
                )?
            }
            ShellCommand::Rm { name, force } => {
                let entry = self.lookup(&name)?.clone();
                if !force && !confirm_delete(&entry)? {
                    return Ok(Outcome::Output("Delete cancelled".to_string()));
                }
                let refreshes = self.affects_current(&entry);
                self.runtime.block_on(self.session.delete(&entry))?;
                self.with_refreshed_listing(format!("Deleted {}", entry.name), refreshes)?
            }
            ShellCommand::Get(name) => {
                let path = self.download(&name)?;
                format_notice(&format!("Downloaded {} to {}", name, path.display()))
            }
        };
        Ok(Outcome::Output(output))
    }

    fn enter(&mut self, name: &str) -> Result<String, DriveError> {
        let entry = self.lookup(name)?.clone();
        if !entry.is_folder() {
            return Err(DriveError::InvalidOperation(format!(
                "{} is not a folder",
                entry.name
            )));
        }
        self.session.cache().navigate_to(&entry);
        self.await_listing()
    }

    fn lookup(&self, name: &str) -> Result<&Entry, DriveError> {
        find_entry(&self.listing, name).ok_or_else(|| {
            DriveError::NotFound(format!(
                "{} in {}",
                name,
                self.session.cache().current_path()
            ))
        })
    }

    /// Whether mutating `entry` makes the session refresh the current folder
    fn affects_current(&self, entry: &Entry) -> bool {
        self.session.owning_folder(entry) == self.session.cache().current_id()
    }

    /// Notice, followed by the reloaded listing when the mutation refreshed
    /// the current folder
    fn with_refreshed_listing(&mut self, notice: String, refreshed: bool) -> Result<String, DriveError> {
        let notice = format_notice(&notice);
        if !refreshed {
            return Ok(notice);
        }
        let listing = self.await_listing()?;
        Ok(format!("{}\n{}", notice, listing))
    }

    fn await_listing(&mut self) -> Result<String, DriveError> {
        let event = self.runtime.block_on(next_terminal_event(&mut self.events))?;
        let path = self.session.cache().current_path();
        match event {
            NavEvent::Loaded { items, from_cache } => {
                self.listing = items;
                Ok(format_listing(&path, &self.listing, from_cache))
            }
            NavEvent::Failed(message) => {
                self.listing.clear();
                Err(DriveError::Listing(format!(
                    "{}: {} (use 'refresh' to retry)",
                    path, message
                )))
            }
            NavEvent::Loading => Err(DriveError::InvalidOperation(
                "Unexpected loading event".to_string(),
            )),
        }
    }
}

fn confirm_delete(entry: &Entry) -> Result<bool, DriveError> {
    Confirm::new()
        .with_prompt(format!("Delete {}?", entry.name))
        .default(false)
        .interact()
        .map_err(|e| DriveError::InvalidOperation(format!("Failed to get user input: {}", e)))
}
