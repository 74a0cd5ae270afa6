//! Scripted stand-ins for subprocesses and downloads.

use std::cell::RefCell;
use std::path::PathBuf;

use crate::command::{CommandLine, CommandOutput, CommandRunner};
use crate::error::{InstallError, Result};
use crate::fetch::{self, Fetch};

type Handler = Box<dyn Fn(&CommandLine) -> Result<CommandOutput>>;

/// Records every command and answers with a handler.
pub struct FakeRunner {
    calls: RefCell<Vec<CommandLine>>,
    handler: Handler,
}

impl FakeRunner {
    /// Every command succeeds with no output.
    pub fn ok() -> Self {
        Self::with(|_| Ok(CommandOutput::default()))
    }

    pub fn with(handler: impl Fn(&CommandLine) -> Result<CommandOutput> + 'static) -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            handler: Box::new(handler),
        }
    }

    pub fn calls(&self) -> Vec<CommandLine> {
        self.calls.borrow().clone()
    }

    /// Each recorded command's arguments joined by spaces.
    pub fn lines(&self) -> Vec<String> {
        self.calls.borrow().iter().map(words).collect()
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        self.lines().iter().filter(|l| l.contains(needle)).count()
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, cmd: &CommandLine) -> Result<CommandOutput> {
        self.calls.borrow_mut().push(cmd.clone());
        (self.handler)(cmd)
    }
}

pub fn words(cmd: &CommandLine) -> String {
    cmd.get_args().join(" ")
}

pub fn failure(cmd: &CommandLine, output: &[&str]) -> InstallError {
    InstallError::Command {
        command: cmd.to_string(),
        exit_code: Some(1),
        output: output.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn output(lines: &[&str]) -> CommandOutput {
    CommandOutput::success(lines.iter().map(|s| s.to_string()).collect())
}

/// Writes fixed bytes for every URL, failing for URLs containing `fail_on`.
#[derive(Default)]
pub struct FakeFetcher {
    pub fail_on: Option<String>,
    pub urls: RefCell<Vec<String>>,
}

impl FakeFetcher {
    pub fn failing_on(needle: &str) -> Self {
        Self {
            fail_on: Some(needle.to_string()),
            urls: RefCell::new(Vec::new()),
        }
    }
}

impl Fetch for FakeFetcher {
    fn fetch(&self, url: &str, destinations: &[PathBuf], _token: Option<&str>) -> Result<()> {
        self.urls.borrow_mut().push(url.to_string());
        if let Some(needle) = &self.fail_on {
            if url.contains(needle.as_str()) {
                return Err(InstallError::download(url, "connection refused"));
            }
        }
        fetch::write_all(url, b"phar", destinations)
    }
}
