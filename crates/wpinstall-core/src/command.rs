//! Subprocess invocation for the wp-cli and composer phars.
//!
//! Commands are spawned directly (no `sh -c`), so arguments never need shell
//! escaping. The working directory is a property of each [`CommandLine`]; the
//! installer never changes its own process working directory.
//!
//! Only a non-zero exit status (or a spawn failure) counts as a failure. Empty
//! output on a zero exit is a success.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{InstallError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub fn get_current_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(dir) = &self.current_dir {
            write!(f, "cd {} && ", quote(&dir.to_string_lossy()))?;
        }
        write!(f, "{}", quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

fn quote(s: &str) -> std::borrow::Cow<'_, str> {
    shlex::try_quote(s).unwrap_or(std::borrow::Cow::Borrowed(s))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: i32,
    pub stdout: Vec<String>,
    /// Kept apart so notices and warnings never leak into parsed values.
    pub stderr: Vec<String>,
}

impl CommandOutput {
    pub fn success(stdout: Vec<String>) -> Self {
        Self {
            status: 0,
            stdout,
            stderr: Vec::new(),
        }
    }

    /// Stdout only, the part commands print their values on.
    pub fn text(&self) -> String {
        self.stdout.join("\n")
    }

    /// Stdout lines followed by stderr lines, for diagnostics.
    pub fn combined(&self) -> Vec<String> {
        self.stdout.iter().chain(&self.stderr).cloned().collect()
    }
}

fn split_lines(bytes: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::to_string)
        .collect()
}

/// Runs a command to completion. Implementations return
/// [`InstallError::Command`] when the process cannot be spawned or exits
/// non-zero.
pub trait CommandRunner {
    fn run(&self, cmd: &CommandLine) -> Result<CommandOutput>;
}

/// Runs commands as real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &CommandLine) -> Result<CommandOutput> {
        tracing::debug!("running: {cmd}");
        let mut command = Command::new(cmd.program());
        command
            .args(cmd.get_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = cmd.get_current_dir() {
            command.current_dir(dir);
        }

        let output = command.output().map_err(|e| InstallError::Command {
            command: cmd.to_string(),
            exit_code: None,
            output: vec![e.to_string()],
        })?;

        let captured = CommandOutput {
            status: output.status.code().unwrap_or(0),
            stdout: split_lines(&output.stdout),
            stderr: split_lines(&output.stderr),
        };
        if !captured.stderr.is_empty() {
            tracing::debug!("stderr of {cmd}: {}", captured.stderr.join(" | "));
        }

        if !output.status.success() {
            return Err(InstallError::Command {
                command: cmd.to_string(),
                exit_code: output.status.code(),
                output: captured.combined(),
            });
        }
        Ok(captured)
    }
}

/// Run `cmd`, reporting any failure as `message` with `code` instead of the
/// raw command error. The raw error is logged.
pub fn run_or_fail(
    runner: &dyn CommandRunner,
    cmd: &CommandLine,
    message: &str,
    code: i32,
) -> Result<CommandOutput> {
    runner.run(cmd).map_err(|e| {
        tracing::error!("{e}");
        InstallError::Step {
            message: message.to_string(),
            code,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::INTERNAL_ERROR_CODE;

    #[test]
    fn display_round_trips_through_a_shell() {
        let cmd = CommandLine::new("php")
            .arg("/srv/WPResources/wp-cli.phar")
            .args(["option", "update", "auth0_state", r#"{"enable":"true"}"#])
            .arg("--path=/srv/my cms");
        let rendered = cmd.to_string();
        let words = shlex::split(&rendered).unwrap();
        assert_eq!(words[0], "php");
        assert_eq!(&words[1..], cmd.get_args());
    }

    #[test]
    fn display_includes_working_dir() {
        let cmd = CommandLine::new("php")
            .arg("composer.phar")
            .current_dir("/srv/my site");
        let words = shlex::split(&cmd.to_string()).unwrap();
        assert_eq!(words, vec!["cd", "/srv/my site", "&&", "php", "composer.phar"]);
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_captures_output() {
        let out = SystemRunner
            .run(&CommandLine::new("sh").args(["-c", "echo one; echo two >&2"]))
            .unwrap();
        assert_eq!(out.status, 0);
        assert_eq!(out.stdout, vec!["one"]);
        assert_eq!(out.stderr, vec!["two"]);
        assert_eq!(out.text(), "one");
        assert_eq!(out.combined(), vec!["one", "two"]);
    }

    #[cfg(unix)]
    #[test]
    fn failure_output_includes_stderr() {
        let err = SystemRunner
            .run(&CommandLine::new("sh").args(["-c", "echo out; echo Error: bad >&2; exit 1"]))
            .unwrap_err();
        match err {
            InstallError::Command { output, .. } => {
                assert_eq!(output, vec!["out", "Error: bad"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_honours_working_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = SystemRunner
            .run(&CommandLine::new("pwd").current_dir(dir.path()))
            .unwrap();
        let reported = std::fs::canonicalize(out.text().trim()).unwrap();
        assert_eq!(reported, std::fs::canonicalize(dir.path()).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_command_error() {
        let err = SystemRunner
            .run(&CommandLine::new("sh").args(["-c", "echo nope; exit 3"]))
            .unwrap_err();
        match err {
            InstallError::Command {
                exit_code, output, ..
            } => {
                assert_eq!(exit_code, Some(3));
                assert_eq!(output, vec!["nope"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_program_is_command_error() {
        let err = SystemRunner
            .run(&CommandLine::new("definitely-not-a-real-binary-wpinstall"))
            .unwrap_err();
        assert!(matches!(err, InstallError::Command { exit_code: None, .. }));
    }

    #[test]
    fn run_or_fail_replaces_message() {
        let err = run_or_fail(
            &SystemRunner,
            &CommandLine::new("definitely-not-a-real-binary-wpinstall"),
            "Something went wrong while installing the language",
            INTERNAL_ERROR_CODE,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Something went wrong while installing the language"
        );
        assert_eq!(err.code(), 500);
    }
}
