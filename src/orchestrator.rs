//! Conversion orchestrator for a package and its dependency closure
//!
//! This module provides:
//! - Workflow coordination: select provider → list versions → fetch manifests → convert → write
//! - Breadth-first traversal of dependencies with an explicit [`TraversalContext`]
//! - Parallel provider queries with a concurrency limit
//! - Dry-run mode support
//! - Error handling with partial continuation

use crate::convert::{convert_package, AnalyzedRelease, ConversionConfig, PackageInput, StaticCatalog};
use crate::domain::{normalize_name, recipe_name, Diagnostic, PackageRecipe, Version};
use crate::error::{AppError, ConversionError, IoError};
use crate::manifest::decode_pyproject;
use crate::output::render_package_py;
use crate::progress::Progress;
use crate::registry::{GitHubProvider, HttpClient, PackageProvider, PyPiProvider};
use crate::repository::SpackRepository;
use serde::Serialize;
use std::collections::{BTreeSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Default concurrency limit for provider requests
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Default number of packages converted per run
pub const DEFAULT_MAX_CONVERSIONS: usize = 10;

/// Configuration for the orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Successful conversions per run, `None` for no limit
    pub max_conversions: Option<usize>,
    /// Dependencies that are never queued
    pub ignore: BTreeSet<String>,
    /// Convert the root package even if the repository already has it
    pub allow_duplicate: bool,
    /// Render recipes without writing them
    pub dry_run: bool,
    /// Maximum concurrent provider requests
    pub concurrency: usize,
    pub conversion: ConversionConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_conversions: Some(DEFAULT_MAX_CONVERSIONS),
            ignore: BTreeSet::new(),
            allow_duplicate: false,
            dry_run: false,
            concurrency: DEFAULT_CONCURRENCY,
            conversion: ConversionConfig::default(),
        }
    }
}

/// A package that was converted into a recipe
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConvertedPackage {
    /// Name as it was queued
    pub name: String,
    pub recipe_name: String,
    /// Number of versions in the recipe
    pub versions: usize,
    /// Dependency problems a human has to fix (`[FIX DEP.]`)
    pub needs_review: bool,
    /// Where the recipe was written, `None` if it was only rendered
    pub path: Option<PathBuf>,
    pub recipe: PackageRecipe,
    #[serde(skip)]
    pub rendered: String,
}

/// A package that could not be converted at all
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionFailure {
    pub name: String,
    pub reason: String,
}

/// Result of one orchestrator run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub dry_run: bool,
    pub converted: Vec<ConvertedPackage>,
    /// Queued packages left when the conversion limit was reached
    pub remaining: Vec<String>,
    pub failures: Vec<ConversionFailure>,
}

impl RunReport {
    /// No failures and nothing that needs review
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.converted.iter().all(|c| !c.needs_review)
    }

    pub fn needs_review_count(&self) -> usize {
        self.converted.iter().filter(|c| c.needs_review).count()
    }
}

/// Mutable state of one traversal
#[derive(Debug, Default)]
pub struct TraversalContext {
    queue: VecDeque<String>,
    /// Normalised names that were queued at some point
    seen: BTreeSet<String>,
    ignore: BTreeSet<String>,
    converted: Vec<ConvertedPackage>,
    failures: Vec<ConversionFailure>,
}

impl TraversalContext {
    /// Start a traversal at `root`; the root is queued even if ignored
    pub fn new(root: &str, ignore: &BTreeSet<String>) -> Self {
        let mut context = Self {
            ignore: ignore.iter().map(|name| normalize_name(name)).collect(),
            ..Self::default()
        };
        context.seen.insert(normalize_name(root));
        context.queue.push_back(root.to_string());
        context
    }

    pub fn next(&mut self) -> Option<String> {
        self.queue.pop_front()
    }

    pub fn has_pending(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Queue a dependency unless it is the interpreter, ignored or already seen
    pub fn enqueue(&mut self, name: &str) -> bool {
        let key = normalize_name(name);
        if key == "python" || self.ignore.contains(&key) || self.seen.contains(&key) {
            return false;
        }
        self.seen.insert(key);
        self.queue.push_back(name.to_string());
        true
    }

    /// Record a name under which a package became known
    pub fn mark_seen(&mut self, name: &str) {
        self.seen.insert(normalize_name(name));
    }

    pub fn converted_count(&self) -> usize {
        self.converted.len()
    }

    fn into_report(self, dry_run: bool) -> RunReport {
        RunReport {
            dry_run,
            converted: self.converted,
            remaining: self.queue.into_iter().collect(),
            failures: self.failures,
        }
    }
}

/// Orchestrator for converting a package and its dependencies
pub struct Orchestrator {
    /// Package index, also used for every dependency
    index: Arc<dyn PackageProvider>,
    /// Source hosting, tried first for the queued name
    hosting: Arc<dyn PackageProvider>,
    repository: Option<SpackRepository>,
    config: OrchestratorConfig,
    semaphore: Arc<Semaphore>,
}

impl Orchestrator {
    /// Create an orchestrator backed by PyPI and GitHub
    pub fn new(
        client: HttpClient,
        repository: Option<SpackRepository>,
        config: OrchestratorConfig,
    ) -> Self {
        Self::with_providers(
            Arc::new(PyPiProvider::new(client.clone())),
            Arc::new(GitHubProvider::new(client)),
            repository,
            config,
        )
    }

    /// Create an orchestrator with custom providers (for testing)
    pub fn with_providers(
        index: Arc<dyn PackageProvider>,
        hosting: Arc<dyn PackageProvider>,
        repository: Option<SpackRepository>,
        config: OrchestratorConfig,
    ) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
        Self {
            index,
            hosting,
            repository,
            config,
            semaphore,
        }
    }

    /// Convert `root` and, breadth-first, the dependencies that are missing
    /// from the repository
    pub async fn run(&self, root: &str, progress: &mut Progress) -> RunReport {
        let mut context = TraversalContext::new(root, &self.config.ignore);
        let mut is_root = true;

        progress.start(root);
        while context.has_pending() && !self.limit_reached(&context) {
            let Some(name) = context.next() else {
                break;
            };
            progress.converting(&name, context.converted_count(), self.config.max_conversions);

            match self.convert_one(&name, is_root).await {
                Ok((converted, dependencies)) => {
                    info!(package = %name, recipe = %converted.recipe_name, "converted");
                    context.mark_seen(&converted.recipe.name);
                    for dependency in &dependencies {
                        if !self.exists_in_repository(dependency) {
                            context.enqueue(dependency);
                        }
                    }
                    context.converted.push(converted);
                }
                Err(err) => {
                    warn!(package = %name, error = %err, "conversion failed");
                    context.failures.push(ConversionFailure {
                        name: name.clone(),
                        reason: err.to_string(),
                    });
                }
            }
            is_root = false;
        }
        progress.finish();

        context.into_report(self.config.dry_run)
    }

    fn limit_reached(&self, context: &TraversalContext) -> bool {
        self.config
            .max_conversions
            .is_some_and(|max| context.converted_count() >= max)
    }

    fn exists_in_repository(&self, package: &str) -> bool {
        self.repository
            .as_ref()
            .is_some_and(|repo| repo.exists(&recipe_name(package)))
    }

    /// Hosting provider if it knows the name, else the index
    async fn select_provider(&self, name: &str) -> &Arc<dyn PackageProvider> {
        match self.hosting.exists(name).await {
            Ok(true) => &self.hosting,
            Ok(false) => &self.index,
            Err(err) => {
                warn!(package = name, error = %err, "{} lookup failed", self.hosting.name());
                &self.index
            }
        }
    }

    /// Convert a single package; returns it with the names it depends on
    async fn convert_one(
        &self,
        name: &str,
        is_root: bool,
    ) -> Result<(ConvertedPackage, BTreeSet<String>), AppError> {
        let provider = self.select_provider(name).await;
        let package = provider.package_name(name);
        let target = recipe_name(&package);
        debug!(package = name, provider = provider.name(), recipe = %target, "selected provider");

        let existing = self
            .repository
            .as_ref()
            .filter(|repo| repo.exists(&target))
            .map(|repo| repo.root().join("packages").join(&target));
        if let Some(path) = &existing {
            if !(is_root && self.config.allow_duplicate) {
                return Err(IoError::AlreadyExists { path: path.clone() }.into());
            }
        }

        let versions = provider.list_versions(name).await.map_err(|err| {
            if err.is_not_found() {
                AppError::from(ConversionError::PackageNotFound {
                    package: name.to_string(),
                })
            } else {
                AppError::from(err)
            }
        })?;
        let selected: Vec<Version> = versions
            .iter()
            .rev()
            .take(self.config.conversion.max_versions_per_package.max(1))
            .cloned()
            .collect();

        let (releases, release_failures) =
            self.analyze_releases(provider, name, &package, selected).await;

        let dependencies: BTreeSet<String> = releases
            .iter()
            .flat_map(|release| release.manifest.requirements().value)
            .filter(|requirement| !requirement.is_runtime_itself())
            .map(|requirement| requirement.name)
            .collect();
        let catalog = self.prefetch_versions(&dependencies).await;

        let source = match provider.source_url(name).await {
            Ok(source) => Some(source),
            Err(err) => {
                warn!(package = name, error = %err, "no download location");
                None
            }
        };

        let input = PackageInput {
            name: package,
            releases,
            host_versions: versions,
            release_failures,
            source,
        };
        let recipe = convert_package(&input, &catalog, &self.config.conversion)?;
        let rendered = render_package_py(&recipe);

        let path = match (&self.repository, self.config.dry_run || existing.is_some()) {
            (Some(repo), false) => Some(repo.write_recipe(&recipe.recipe_name, &rendered)?),
            _ => None,
        };

        let converted = ConvertedPackage {
            name: name.to_string(),
            recipe_name: recipe.recipe_name.clone(),
            versions: recipe.versions.len(),
            needs_review: needs_dependency_fix(&recipe),
            path,
            recipe,
            rendered,
        };
        Ok((converted, dependencies))
    }

    /// Fetch and decode the manifests of the selected versions.
    ///
    /// Unavailable releases are logged and skipped. Releases whose manifest
    /// cannot be decoded are reported as diagnostics.
    async fn analyze_releases(
        &self,
        provider: &Arc<dyn PackageProvider>,
        name: &str,
        package: &str,
        versions: Vec<Version>,
    ) -> (Vec<AnalyzedRelease>, Vec<Diagnostic>) {
        let mut tasks = JoinSet::new();
        for version in versions {
            let provider = Arc::clone(provider);
            let semaphore = Arc::clone(&self.semaphore);
            let name = name.to_string();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let fetched = provider.fetch_manifest(&name, &version).await;
                (version, fetched)
            });
        }

        let mut releases = Vec::new();
        let mut failures = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let (version, fetched) = match joined {
                Ok(result) => result,
                Err(err) => {
                    warn!(package = name, error = %err, "manifest task failed");
                    continue;
                }
            };
            let fetched = match fetched {
                Ok(fetched) => fetched,
                Err(err) => {
                    warn!(package = name, %version, error = %err, "skipping release");
                    continue;
                }
            };
            match decode_pyproject(package, Some(&version), &fetched.content) {
                Ok(manifest) => releases.push(AnalyzedRelease {
                    version,
                    manifest,
                    checksum: fetched.checksum,
                }),
                Err(err) => {
                    warn!(package = name, %version, error = %err, "undecodable manifest");
                    failures.push(Diagnostic::parse(err.to_string()).with_host(&version));
                }
            }
        }
        (releases, failures)
    }

    /// Look up every dependency's version list on the index
    async fn prefetch_versions(&self, dependencies: &BTreeSet<String>) -> StaticCatalog {
        let mut tasks = JoinSet::new();
        for dependency in dependencies {
            let index = Arc::clone(&self.index);
            let semaphore = Arc::clone(&self.semaphore);
            let dependency = dependency.clone();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let versions = index.list_versions(&dependency).await;
                (dependency, versions)
            });
        }

        let mut catalog = StaticCatalog::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((dependency, Ok(versions))) => catalog.insert(&dependency, versions),
                Ok((dependency, Err(err))) => {
                    debug!(%dependency, error = %err, "dependency versions unavailable");
                }
                Err(err) => warn!(error = %err, "version lookup task failed"),
            }
        }
        catalog
    }
}

/// Whether dependency declarations need manual attention
fn needs_dependency_fix(recipe: &PackageRecipe) -> bool {
    !recipe.diagnostics.is_empty()
        || !recipe.conflicts.is_empty()
        || recipe.all_entries().any(|entry| !entry.diagnostics.is_empty())
}
