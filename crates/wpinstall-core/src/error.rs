use std::path::PathBuf;

use thiserror::Error;

/// Response code used for every fatal failure that has no more specific code.
pub const INTERNAL_ERROR_CODE: i32 = 500;

/// Response code for an install target that already exists.
pub const CONFLICT_ERROR_CODE: i32 = 400;

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Something went wrong while downloading: {url}\n - {message}")]
    Download { url: String, message: String },

    #[error("Command failed: {command}\n - {}", .output.join("\n - "))]
    Command {
        command: String,
        exit_code: Option<i32>,
        output: Vec<String>,
    },

    /// A command failed and the caller supplied the message to report.
    #[error("{message}")]
    Step { message: String, code: i32 },

    #[error("The wordpress core was not downloaded successfully")]
    CoreDownloadFailed,

    #[error("Something went wrong while executing wp rewrite")]
    RewriteFailed,

    #[error("The plugin {0} was not installed correctly")]
    PluginNotInstalled(String),

    #[error("missing key '{key}' in env file {}", .path.display())]
    MissingEnvKey { key: String, path: PathBuf },

    #[error("invalid settings: {0}")]
    Settings(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl InstallError {
    /// Code reported in the JSON response and used as the process exit code.
    pub fn code(&self) -> i32 {
        match self {
            InstallError::Conflict(_) => CONFLICT_ERROR_CODE,
            InstallError::Step { code, .. } => *code,
            _ => INTERNAL_ERROR_CODE,
        }
    }

    pub fn download(url: &str, message: impl Into<String>) -> Self {
        InstallError::Download {
            url: url.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, InstallError>;
