//! Downloads of tool phars and release files.
//!
//! Anonymous downloads take the response body as-is. Authenticated downloads
//! go through the GitHub contents API, whose JSON envelope carries the file
//! as base64 in its `content` field.

use std::path::PathBuf;
use std::time::Duration;

use base64::Engine;

use crate::error::{InstallError, Result};
use crate::fs;

pub const WP_CLI_PHAR_URL: &str =
    "https://raw.githubusercontent.com/wp-cli/builds/gh-pages/phar/wp-cli.phar";
pub const COMPOSER_PHAR_URL: &str = "https://getcomposer.org/composer.phar";

const USER_AGENT: &str = concat!("wpinstall/", env!("CARGO_PKG_VERSION"));

/// Fetch a URL into one or more local files.
pub trait Fetch {
    /// Download `url` and write the bytes to every path in `destinations`,
    /// creating parent directories and marking each file executable.
    /// Nothing is written when the download or decoding fails.
    fn fetch(&self, url: &str, destinations: &[PathBuf], bearer_token: Option<&str>)
        -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| InstallError::download("<client>", e.to_string()))?;
        Ok(Self { client })
    }

    fn download(&self, url: &str, bearer_token: Option<&str>) -> Result<Vec<u8>> {
        let mut request = self.client.get(url);
        if let Some(token) = bearer_token {
            request = request
                .bearer_auth(token)
                .header(reqwest::header::USER_AGENT, USER_AGENT)
                .header(reqwest::header::ACCEPT, "application/vnd.github+json");
        }
        let response = request
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| InstallError::download(url, e.to_string()))?;
        let body = response
            .bytes()
            .map_err(|e| InstallError::download(url, e.to_string()))?;

        if bearer_token.is_some() {
            decode_contents_envelope(url, &body)
        } else {
            Ok(body.to_vec())
        }
    }
}

impl Fetch for HttpFetcher {
    fn fetch(
        &self,
        url: &str,
        destinations: &[PathBuf],
        bearer_token: Option<&str>,
    ) -> Result<()> {
        let bearer_token = bearer_token.filter(|t| !t.is_empty());
        tracing::debug!("downloading {url}");
        let bytes = self.download(url, bearer_token)?;
        write_all(url, &bytes, destinations)
    }
}

/// Write downloaded bytes to each destination and make it executable.
pub fn write_all(url: &str, bytes: &[u8], destinations: &[PathBuf]) -> Result<()> {
    for destination in destinations {
        fs::write_file(destination, bytes)
            .and_then(|_| fs::make_executable(destination))
            .map_err(|e| InstallError::download(url, e.to_string()))?;
    }
    Ok(())
}

/// Extract the file bytes from a GitHub contents-API response body.
pub fn decode_contents_envelope(url: &str, body: &[u8]) -> Result<Vec<u8>> {
    let envelope: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| InstallError::download(url, format!("Unable to decode response: {e}")))?;
    let content = envelope
        .get("content")
        .and_then(|c| c.as_str())
        .ok_or_else(|| {
            InstallError::download(url, "Unable to decode response: no 'content' field")
        })?;
    // the API wraps base64 at 60 columns
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| InstallError::download(url, format!("Unable to decode content: {e}")))
}

/// A file inside a GitHub repository at a given tag or branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubFile {
    pub owner: String,
    pub repo: String,
    pub path: String,
    pub reference: String,
}

impl GithubFile {
    pub fn raw_url(&self) -> String {
        format!(
            "https://raw.githubusercontent.com/{}/{}/{}/{}",
            self.owner, self.repo, self.reference, self.path
        )
    }

    pub fn contents_api_url(&self) -> String {
        format!(
            "https://api.github.com/repos/{}/{}/contents/{}?ref={}",
            self.owner, self.repo, self.path, self.reference
        )
    }

    /// The URL to fetch: the contents API when a token is available (it is
    /// rate limited per token), the raw host otherwise.
    pub fn url_for(&self, bearer_token: Option<&str>) -> String {
        match bearer_token {
            Some(t) if !t.is_empty() => self.contents_api_url(),
            _ => self.raw_url(),
        }
    }
}
