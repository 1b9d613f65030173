//! GitHub releases provider
//!
//! Packages are addressed as `user/repo` or `https://github.com/user/repo(.git)`.
//! Versions come from release tags, sources from the release tarballs.
//! API endpoint: https://api.github.com/repos/{user}/{repo}/releases

use super::archive::extract_manifest;
use super::{found, FetchedManifest, HttpClient, PackageProvider};
use crate::domain::{normalize_name, Checksum, RecipeSource, Version};
use crate::error::RegistryError;
use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// GitHub API base URL
const GITHUB_API_URL: &str = "https://api.github.com/repos";

const GITHUB_URL: &str = "https://github.com/";

const GITHUB_JSON: &str = "application/vnd.github+json";

const REGISTRY: &str = "GitHub";

/// Release entry of the releases API
#[derive(Debug, Deserialize)]
struct Release {
    #[serde(default)]
    tag_name: String,
    #[serde(default)]
    tarball_url: Option<String>,
}

/// `user/repo` from a repository specifier, `None` if it is not one
pub fn parse_repo_name(name: &str) -> Option<String> {
    let specifier = match name.strip_prefix(GITHUB_URL) {
        Some(rest) => {
            let rest = rest.trim_end_matches('/');
            rest.strip_suffix(".git").unwrap_or(rest)
        }
        None => name,
    };
    let mut parts = specifier.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(user), Some(repo), None) if !user.is_empty() && !repo.is_empty() => {
            Some(format!("{}/{}", user, repo))
        }
        _ => None,
    }
}

/// GitHub provider
pub struct GitHubProvider {
    client: HttpClient,
    base_url: String,
    cache: Mutex<HashMap<String, Arc<BTreeMap<Version, String>>>>,
}

impl GitHubProvider {
    /// Create a new GitHub provider
    pub fn new(client: HttpClient) -> Self {
        Self::with_base_url(client, GITHUB_API_URL)
    }

    /// Create a provider against another API host
    pub fn with_base_url(client: HttpClient, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn repo(package: &str) -> Result<String, RegistryError> {
        parse_repo_name(package).ok_or_else(|| RegistryError::InvalidResponse {
            package: package.to_string(),
            registry: REGISTRY.to_string(),
            message: "expected 'user/repository' or a GitHub repository URL".to_string(),
        })
    }

    /// Tag versions mapped to tarball URLs
    async fn releases(&self, package: &str) -> Result<Arc<BTreeMap<Version, String>>, RegistryError> {
        let repo = Self::repo(package)?;
        if let Some(releases) = self.cache.lock().await.get(&repo) {
            return Ok(Arc::clone(releases));
        }

        debug!(%repo, "querying GitHub releases");
        let url = format!("{}/{}/releases", self.base_url, repo);
        let releases: Vec<Release> = self
            .client
            .get_json(&url, Some(GITHUB_JSON), package, REGISTRY)
            .await?;

        let parsed: BTreeMap<Version, String> = releases
            .into_iter()
            .filter_map(|release| {
                let version = Version::parse(&release.tag_name).ok()?;
                Some((version, release.tarball_url?))
            })
            .collect();
        let parsed = Arc::new(parsed);
        self.cache.lock().await.insert(repo, Arc::clone(&parsed));
        Ok(parsed)
    }
}

#[async_trait]
impl PackageProvider for GitHubProvider {
    fn name(&self) -> &'static str {
        REGISTRY
    }

    fn package_name(&self, package: &str) -> String {
        let repo = parse_repo_name(package).unwrap_or_else(|| package.to_string());
        normalize_name(repo.rsplit('/').next().unwrap_or(&repo))
    }

    async fn exists(&self, package: &str) -> Result<bool, RegistryError> {
        if parse_repo_name(package).is_none() {
            return Ok(false);
        }
        found(self.releases(package).await.map(|_| ()))
    }

    async fn list_versions(&self, package: &str) -> Result<Vec<Version>, RegistryError> {
        let releases = self.releases(package).await?;
        if releases.is_empty() {
            return Err(RegistryError::no_versions(package, REGISTRY));
        }
        Ok(releases.keys().cloned().collect())
    }

    async fn fetch_manifest(
        &self,
        package: &str,
        version: &Version,
    ) -> Result<FetchedManifest, RegistryError> {
        let releases = self.releases(package).await?;
        let url = releases
            .get(version)
            .ok_or_else(|| RegistryError::NoSourceDistribution {
                package: package.to_string(),
                version: version.to_string(),
                registry: REGISTRY.to_string(),
            })?;

        debug!(package, %version, "downloading release tarball");
        let data = self.client.get_bytes(url, package, REGISTRY).await?;
        let digest = format!("{:x}", Sha256::digest(&data));
        let content = extract_manifest("release.tar.gz", &data, package, &version.to_string())?;
        Ok(FetchedManifest {
            content,
            checksum: Some(Checksum::sha256(digest)),
        })
    }

    async fn source_url(&self, package: &str) -> Result<RecipeSource, RegistryError> {
        let repo = Self::repo(package)?;
        let releases = self.releases(package).await?;
        let (_, url) = releases
            .iter()
            .next_back()
            .ok_or_else(|| RegistryError::no_versions(package, REGISTRY))?;
        Ok(RecipeSource::Git {
            url: url.clone(),
            git: format!("{}{}.git", GITHUB_URL, repo),
        })
    }
}
