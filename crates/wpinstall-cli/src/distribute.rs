use std::path::PathBuf;

use wpinstall_core::fetch::{Fetch, GithubFile};

pub const DEPLOY_SCRIPT_NAME: &str = "deploy-zilch.php";

/// The deploy script of the release matching this binary.
pub fn deploy_script() -> GithubFile {
    GithubFile {
        owner: "xelmedia".to_string(),
        repo: "wp-install-script".to_string(),
        path: format!("src/Scripts/{DEPLOY_SCRIPT_NAME}"),
        reference: env!("CARGO_PKG_VERSION").to_string(),
    }
}

pub fn script_destinations(dirs: &[PathBuf]) -> Vec<PathBuf> {
    dirs.iter().map(|d| d.join(DEPLOY_SCRIPT_NAME)).collect()
}

/// Copy the deploy script into every static content directory.
pub fn distribute_deploy_script(
    fetcher: &dyn Fetch,
    dirs: &[PathBuf],
    git_token: Option<&str>,
) -> anyhow::Result<()> {
    let destinations = script_destinations(dirs);
    let file = deploy_script();
    fetcher.fetch(&file.url_for(git_token), &destinations, git_token)?;
    tracing::info!(count = destinations.len(), "deploy script distributed");
    Ok(())
}

pub fn describe(destinations: &[PathBuf]) -> String {
    destinations
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use wpinstall_core::fetch::write_all;

    #[derive(Default)]
    struct Recorder {
        urls: RefCell<Vec<(String, Option<String>)>>,
    }

    impl Fetch for Recorder {
        fn fetch(
            &self,
            url: &str,
            destinations: &[PathBuf],
            bearer_token: Option<&str>,
        ) -> wpinstall_core::Result<()> {
            self.urls
                .borrow_mut()
                .push((url.to_string(), bearer_token.map(str::to_string)));
            write_all(url, b"<?php", destinations)
        }
    }

    #[test]
    fn writes_script_into_each_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let dirs = vec![dir.path().join("a"), dir.path().join("b")];
        let fetcher = Recorder::default();

        distribute_deploy_script(&fetcher, &dirs, None).unwrap();

        for d in &dirs {
            assert!(d.join(DEPLOY_SCRIPT_NAME).exists());
        }
        let urls = fetcher.urls.borrow();
        assert_eq!(
            urls[0].0,
            format!(
                "https://raw.githubusercontent.com/xelmedia/wp-install-script/{}/src/Scripts/deploy-zilch.php",
                env!("CARGO_PKG_VERSION")
            )
        );
    }

    #[test]
    fn token_switches_to_contents_api() {
        let dir = tempfile::TempDir::new().unwrap();
        let fetcher = Recorder::default();
        distribute_deploy_script(&fetcher, &[dir.path().to_path_buf()], Some("ghp_x")).unwrap();
        let urls = fetcher.urls.borrow();
        assert!(urls[0]
            .0
            .starts_with("https://api.github.com/repos/xelmedia/wp-install-script/contents/"));
        assert_eq!(urls[0].1.as_deref(), Some("ghp_x"));
    }

    #[test]
    fn describe_joins_paths() {
        let dests = script_destinations(&[PathBuf::from("/a"), PathBuf::from("/b")]);
        assert_eq!(describe(&dests), "/a/deploy-zilch.php,/b/deploy-zilch.php");
    }
}
