//! PyPI simple JSON API provider
//!
//! Fetches the project page once per package and caches it.
//! API endpoint: https://pypi.org/simple/{package}/
//! (`Accept: application/vnd.pypi.simple.v1+json`)

use super::archive::extract_manifest;
use super::{found, FetchedManifest, HttpClient, PackageProvider};
use crate::domain::{normalize_name, Checksum, RecipeSource, Version};
use crate::error::RegistryError;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// PyPI simple API base URL
const PYPI_SIMPLE_URL: &str = "https://pypi.org/simple";

/// Media type of the JSON flavour of the simple API
const SIMPLE_JSON: &str = "application/vnd.pypi.simple.v1+json";

/// Source distribution extensions, in order of preference
const SDIST_EXTENSIONS: &[&str] = &[".tar.gz", ".tgz", ".tar", ".zip"];

const REGISTRY: &str = "PyPI";

/// Project page of the simple API
#[derive(Debug, Deserialize)]
struct ProjectPage {
    #[serde(default)]
    versions: Vec<String>,
    #[serde(default)]
    files: Vec<DistributionFile>,
}

/// One uploaded distribution file
#[derive(Debug, Deserialize)]
struct DistributionFile {
    filename: String,
    url: String,
    #[serde(default)]
    hashes: BTreeMap<String, String>,
}

/// Source distribution chosen for one version
#[derive(Debug, Clone, PartialEq, Eq)]
struct Sdist {
    filename: String,
    url: String,
    checksum: Option<Checksum>,
}

/// Parsed project data kept per package
#[derive(Debug)]
struct Project {
    versions: Vec<Version>,
    sdists: BTreeMap<Version, Sdist>,
}

/// PyPI provider
pub struct PyPiProvider {
    client: HttpClient,
    base_url: String,
    cache: Mutex<HashMap<String, Arc<Project>>>,
}

impl PyPiProvider {
    /// Create a new PyPI provider
    pub fn new(client: HttpClient) -> Self {
        Self::with_base_url(client, PYPI_SIMPLE_URL)
    }

    /// Create a provider against another simple API index
    pub fn with_base_url(client: HttpClient, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Build the project page URL for a package
    fn build_url(&self, package: &str) -> String {
        format!("{}/{}/", self.base_url, normalize_name(package))
    }

    async fn project(&self, package: &str) -> Result<Arc<Project>, RegistryError> {
        let key = normalize_name(package);
        if let Some(project) = self.cache.lock().await.get(&key) {
            return Ok(Arc::clone(project));
        }

        debug!(package = %key, "querying PyPI");
        let page: ProjectPage = self
            .client
            .get_json(&self.build_url(&key), Some(SIMPLE_JSON), &key, REGISTRY)
            .await?;
        let project = Arc::new(Project::from_page(&key, page));
        self.cache
            .lock()
            .await
            .insert(key, Arc::clone(&project));
        Ok(project)
    }

    async fn sdist(&self, package: &str, version: &Version) -> Result<Sdist, RegistryError> {
        let project = self.project(package).await?;
        project
            .sdists
            .get(version)
            .cloned()
            .ok_or_else(|| RegistryError::NoSourceDistribution {
                package: package.to_string(),
                version: version.to_string(),
                registry: REGISTRY.to_string(),
            })
    }
}

impl Project {
    fn from_page(package: &str, page: ProjectPage) -> Self {
        let mut versions: Vec<Version> = page
            .versions
            .iter()
            .filter_map(|v| Version::parse(v).ok())
            .filter(|v| !v.is_compound_prerelease())
            .collect();
        versions.sort();
        versions.dedup();

        let mut sdists: BTreeMap<Version, (usize, Sdist)> = BTreeMap::new();
        for file in page.files {
            let Some((rank, version)) = sdist_version(package, &file.filename) else {
                continue;
            };
            if sdists.get(&version).is_some_and(|(r, _)| *r <= rank) {
                continue;
            }
            let checksum = file
                .hashes
                .get("sha256")
                .map(|digest| Checksum::sha256(digest.clone()))
                .or_else(|| {
                    file.hashes.iter().next().map(|(algorithm, digest)| Checksum {
                        algorithm: algorithm.clone(),
                        digest: digest.clone(),
                    })
                });
            sdists.insert(
                version,
                (
                    rank,
                    Sdist {
                        filename: file.filename,
                        url: file.url,
                        checksum,
                    },
                ),
            );
        }

        Self {
            versions,
            sdists: sdists.into_iter().map(|(v, (_, s))| (v, s)).collect(),
        }
    }
}

/// Parse `{name}-{version}{ext}` into the extension rank and version
fn sdist_version(package: &str, filename: &str) -> Option<(usize, Version)> {
    let (rank, stem) = SDIST_EXTENSIONS
        .iter()
        .enumerate()
        .find_map(|(rank, ext)| filename.strip_suffix(ext).map(|stem| (rank, stem)))?;

    let prefix = format!("{}-", normalize_name(package));
    let head = stem.get(..prefix.len())?;
    if normalize_name(head) != prefix {
        return None;
    }
    let version = Version::parse(&stem[prefix.len()..]).ok()?;
    Some((rank, version))
}

#[async_trait]
impl PackageProvider for PyPiProvider {
    fn name(&self) -> &'static str {
        REGISTRY
    }

    fn package_name(&self, package: &str) -> String {
        normalize_name(package)
    }

    async fn exists(&self, package: &str) -> Result<bool, RegistryError> {
        found(self.project(package).await.map(|_| ()))
    }

    async fn list_versions(&self, package: &str) -> Result<Vec<Version>, RegistryError> {
        let project = self.project(package).await?;
        if project.versions.is_empty() {
            return Err(RegistryError::no_versions(package, REGISTRY));
        }
        Ok(project.versions.clone())
    }

    async fn fetch_manifest(
        &self,
        package: &str,
        version: &Version,
    ) -> Result<FetchedManifest, RegistryError> {
        let sdist = self.sdist(package, version).await?;
        debug!(package, %version, file = %sdist.filename, "downloading sdist");
        let data = self.client.get_bytes(&sdist.url, package, REGISTRY).await?;
        let content = extract_manifest(&sdist.filename, &data, package, &version.to_string())?;
        Ok(FetchedManifest {
            content,
            checksum: sdist.checksum,
        })
    }

    async fn source_url(&self, package: &str) -> Result<RecipeSource, RegistryError> {
        let project = self.project(package).await?;
        let (_, sdist) = project
            .sdists
            .iter()
            .next_back()
            .ok_or_else(|| RegistryError::no_versions(package, REGISTRY))?;
        Ok(RecipeSource::Pypi {
            path: format!("{}/{}", normalize_name(package), sdist.filename),
        })
    }
}
