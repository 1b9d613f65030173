//! Package providers for fetching versions and manifests
//!
//! This module provides:
//! - HTTP client shared foundation with retry logic
//! - PyPI simple JSON API provider
//! - GitHub releases provider
//! - In-memory source archive inspection

pub mod archive;
mod client;
mod github;
mod pypi;

pub use client::HttpClient;
pub use github::{parse_repo_name, GitHubProvider};
pub use pypi::PyPiProvider;

use crate::domain::{Checksum, RecipeSource, Version};
use crate::error::RegistryError;
use async_trait::async_trait;

/// Manifest text of one release plus its source archive checksum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedManifest {
    pub content: String,
    pub checksum: Option<Checksum>,
}

/// Capability interface shared by every package source
#[async_trait]
pub trait PackageProvider: Send + Sync {
    /// Human readable provider name, used in errors
    fn name(&self) -> &'static str;

    /// Package name as it appears in the recipe (`user/repo` → `repo`)
    fn package_name(&self, package: &str) -> String;

    /// Whether the provider knows the package
    async fn exists(&self, package: &str) -> Result<bool, RegistryError>;

    /// Usable versions, ascending
    async fn list_versions(&self, package: &str) -> Result<Vec<Version>, RegistryError>;

    /// pyproject.toml content and archive checksum of one release
    async fn fetch_manifest(
        &self,
        package: &str,
        version: &Version,
    ) -> Result<FetchedManifest, RegistryError>;

    /// Where the recipe downloads sources from
    async fn source_url(&self, package: &str) -> Result<RecipeSource, RegistryError>;
}

/// Map a not-found error to `false`, keep every other error
pub(crate) fn found(result: Result<(), RegistryError>) -> Result<bool, RegistryError> {
    match result {
        Ok(()) => Ok(true),
        Err(err) if err.is_not_found() => Ok(false),
        Err(err) => Err(err),
    }
}
