pub mod auth0;
pub mod command;
pub mod composer;
pub mod config;
pub mod env_file;
pub mod error;
pub mod fetch;
pub mod fs;
pub mod gateway;
pub mod installer;
pub mod reconcile;
pub mod site_files;
pub mod wp_cli;

#[cfg(test)]
mod testing;

pub use error::{InstallError, Result};
