//! Deploy notification to the Zilch gateway once a site is installed.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use crate::env_file;
use crate::error::{InstallError, Result};

/// Asks an external service to deploy the project manifest onto a fresh site.
pub trait DeployNotifier {
    fn deploy_manifest(&self, project_id: &str, domain: &str) -> Result<()>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ManifestRequest<'a> {
    project_id: &'a str,
}

/// Posts to `<scheme>://<gateway host>/v1/deploy/manifest`. Host and client
/// secret come from the Auth0 env file, read when the request is made.
pub struct GatewayClient {
    client: reqwest::blocking::Client,
    auth0_env_path: PathBuf,
    scheme: String,
}

impl GatewayClient {
    pub fn new(auth0_env_path: &Path) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| InstallError::download("<client>", e.to_string()))?;
        Ok(Self {
            client,
            auth0_env_path: auth0_env_path.to_path_buf(),
            scheme: "https".to_string(),
        })
    }

    /// Override the URL scheme (plain `http` for local gateways).
    pub fn with_scheme(mut self, scheme: &str) -> Self {
        self.scheme = scheme.to_string();
        self
    }
}

impl DeployNotifier for GatewayClient {
    fn deploy_manifest(&self, project_id: &str, domain: &str) -> Result<()> {
        let env = env_file::read(&self.auth0_env_path);
        let secret = env.require("ZILCH_AUTH0_CLIENT_SECRET")?;
        let host = env.require("ZILCH_AUTH0_CUSTOM_TENANT_DOMAIN")?;
        let url = format!("{}://{host}/v1/deploy/manifest", self.scheme);

        tracing::debug!("notifying gateway at {url}");
        self.client
            .post(&url)
            .header("X-Zilch-Client-Secret", secret)
            .header("X-Zilch-Client-Host", domain)
            .json(&ManifestRequest { project_id })
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| InstallError::Step {
                message: format!("Error making request to {url}: {e}"),
                code: crate::error::INTERNAL_ERROR_CODE,
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use tempfile::TempDir;

    fn env_for(dir: &Path, host: &str) -> PathBuf {
        let path = dir.join(".auth0.env");
        std::fs::write(
            &path,
            format!("ZILCH_AUTH0_CLIENT_SECRET=c2VjcmV0\nZILCH_AUTH0_CUSTOM_TENANT_DOMAIN={host}\n"),
        )
        .unwrap();
        path
    }

    #[test]
    fn posts_project_id_with_client_headers() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/v1/deploy/manifest")
            .match_header("x-zilch-client-secret", "c2VjcmV0")
            .match_header("x-zilch-client-host", "site.example.com")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(serde_json::json!({ "projectId": "p-42" })))
            .with_status(200)
            .create();

        let dir = TempDir::new().unwrap();
        let env = env_for(dir.path(), &server.host_with_port());
        GatewayClient::new(&env)
            .unwrap()
            .with_scheme("http")
            .deploy_manifest("p-42", "site.example.com")
            .unwrap();
        mock.assert();
    }

    #[test]
    fn server_error_is_reported_with_url() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", "/v1/deploy/manifest")
            .with_status(502)
            .create();

        let dir = TempDir::new().unwrap();
        let env = env_for(dir.path(), &server.host_with_port());
        let err = GatewayClient::new(&env)
            .unwrap()
            .with_scheme("http")
            .deploy_manifest("p-42", "site.example.com")
            .unwrap_err();
        assert!(err.to_string().starts_with("Error making request to http://"));
        assert_eq!(err.code(), 500);
    }

    #[test]
    fn missing_env_file_names_the_key() {
        let dir = TempDir::new().unwrap();
        let err = GatewayClient::new(&dir.path().join(".auth0.env"))
            .unwrap()
            .deploy_manifest("p-42", "site.example.com")
            .unwrap_err();
        assert!(err.to_string().contains("ZILCH_AUTH0_CLIENT_SECRET"));
    }
}
