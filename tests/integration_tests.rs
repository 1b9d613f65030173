//! Integration tests for spackify
//!
//! These tests verify:
//! - The manifest → recipe pipeline on realistic pyproject.toml files
//! - Repository writing
//! - A full run against a mock package index

use flate2::write::GzEncoder;
use flate2::Compression;
use spackify::convert::{convert_package, AnalyzedRelease, ConversionConfig, PackageInput, StaticCatalog};
use spackify::domain::{Checksum, DependencyClass, DiagnosticKind, RecipeSource, Version};
use spackify::manifest::decode_pyproject;
use spackify::output::{render_json, render_package_py};
use spackify::repository::SpackRepository;
use std::fs;
use tempfile::TempDir;

fn v(s: &str) -> Version {
    Version::parse(s).unwrap()
}

fn versions(list: &[&str]) -> Vec<Version> {
    list.iter().map(|s| v(s)).collect()
}

/// Create an empty Spack repository in a temporary directory
fn create_repository() -> (TempDir, SpackRepository) {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    fs::create_dir(dir.path().join("packages")).unwrap();
    fs::write(dir.path().join("repo.yaml"), "repo:\n  namespace: test\n").unwrap();
    let repo = SpackRepository::open(dir.path()).unwrap();
    (dir, repo)
}

const PYPROJECT_1_0: &str = r#"
[build-system]
requires = ["hatchling"]
build-backend = "hatchling.build"

[project]
name = "demo-pkg"
description = "A demo package"
requires-python = ">=3.8"
license = { text = "MIT" }
authors = [{ name = "Jane Doe", email = "jane@example.com" }]
dependencies = ["foo>=2.0"]

[project.urls]
Homepage = "https://example.com/demo"
"#;

const PYPROJECT_1_1: &str = r#"
[build-system]
requires = ["hatchling"]
build-backend = "hatchling.build"

[project]
name = "demo-pkg"
description = "A demo package"
requires-python = ">=3.8"
license = { text = "MIT" }
authors = [{ name = "Jane Doe", email = "jane@example.com" }]
dependencies = ["foo>=2.1", "ghost>=1.0"]

[project.optional-dependencies]
cli = ["click"]

[project.urls]
Homepage = "https://example.com/demo"
"#;

mod pipeline {
    use super::*;

    fn release(version: &str, content: &str, digest: Option<&str>) -> AnalyzedRelease {
        let version = v(version);
        AnalyzedRelease {
            manifest: decode_pyproject("demo-pkg", Some(&version), content).unwrap(),
            version,
            checksum: digest.map(Checksum::sha256),
        }
    }

    fn input(reverse: bool) -> PackageInput {
        let mut releases = vec![
            release("1.0", PYPROJECT_1_0, Some("aaa")),
            release("1.1", PYPROJECT_1_1, None),
        ];
        if reverse {
            releases.reverse();
        }
        PackageInput {
            name: "demo-pkg".to_string(),
            releases,
            host_versions: versions(&["1.0", "1.1"]),
            release_failures: Vec::new(),
            source: Some(RecipeSource::Pypi {
                path: "demo-pkg/demo_pkg-1.1.tar.gz".to_string(),
            }),
        }
    }

    fn catalog() -> StaticCatalog {
        StaticCatalog::new()
            .with("foo", versions(&["1.0", "2.0", "2.1"]))
            .with("click", versions(&["7.0", "8.0"]))
    }

    #[test]
    fn test_recipe_from_two_releases() {
        let recipe = convert_package(&input(false), &catalog(), &ConversionConfig::default()).unwrap();

        assert_eq!(recipe.recipe_name, "py-demo-pkg");
        assert_eq!(recipe.class_name, "PyDemoPkg");
        assert_eq!(recipe.description.as_deref(), Some("A demo package"));
        assert_eq!(recipe.versions.len(), 2);
        assert_eq!(recipe.versions[0].version, v("1.1"));
        assert!(recipe.variants.contains("cli"));

        let runtime = &recipe.entries[&DependencyClass::Runtime];
        let foo: Vec<_> = runtime.iter().filter(|e| e.entity == "foo").collect();
        assert_eq!(foo.len(), 2);
        for entry in foo {
            let candidates = versions(&["1.0", "2.0", "2.1"]);
            let host_versions = versions(&["1.0", "1.1"]);
            let selected = entry.range.filter(&candidates);
            let hosts = entry.when.host.filter(&host_versions);
            assert_eq!(hosts.len(), 1);
            if hosts[0] == &v("1.0") {
                assert_eq!(selected, vec![&v("2.0"), &v("2.1")]);
            } else {
                assert_eq!(selected, vec![&v("2.1")]);
            }
        }

        let build = &recipe.entries[&DependencyClass::Build];
        assert!(build.iter().any(|e| e.entity == "hatchling" && e.when.is_unconstrained()));

        // ghost is not in the catalog
        assert!(recipe.needs_review());
        assert!(!recipe.dependency_names().contains("ghost"));
        assert!(recipe
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::UnresolvedEntity && d.message.contains("ghost")));
    }

    #[test]
    fn test_rendered_recipe() {
        let recipe = convert_package(&input(false), &catalog(), &ConversionConfig::default()).unwrap();
        let text = render_package_py(&recipe);

        assert!(text.contains("class PyDemoPkg(PythonPackage):\n"));
        assert!(text.contains("    \"\"\"A demo package\"\"\"\n"));
        assert!(text.contains("    homepage = \"https://example.com/demo\"\n"));
        assert!(text.contains("    pypi = \"demo-pkg/demo_pkg-1.1.tar.gz\"\n"));
        assert!(text.contains("    version(\"1.0\", sha256=\"aaa\")\n"));
        assert!(text.contains("    version(\"1.1\")\n"));
        assert!(text.contains("    variant(\"cli\", default=False)\n"));
        assert!(text.contains("depends_on(\"py-hatchling\")"));
        assert!(text.contains("depends_on(\"python@3.8:\")"));
        assert!(text.contains("depends_on(\"py-click\", when=\"@1.1: +cli\")"));
        assert!(text.contains("ghost"));
    }

    #[test]
    fn test_release_order_does_not_matter() {
        let config = ConversionConfig::default();
        let forward = convert_package(&input(false), &catalog(), &config).unwrap();
        let backward = convert_package(&input(true), &catalog(), &config).unwrap();
        assert_eq!(forward, backward);
        assert_eq!(render_package_py(&forward), render_package_py(&backward));
    }

    #[test]
    fn test_json_rendering() {
        let recipe = convert_package(&input(false), &catalog(), &ConversionConfig::default()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&render_json(&recipe).unwrap()).unwrap();
        assert_eq!(json["recipe_name"], "py-demo-pkg");
        assert_eq!(json["versions"][0]["version"], "1.1");
    }

    #[test]
    fn test_version_limit() {
        let config = ConversionConfig {
            max_versions_per_package: 1,
            ..ConversionConfig::default()
        };
        let recipe = convert_package(&input(false), &catalog(), &config).unwrap();
        assert_eq!(recipe.versions.len(), 1);
        assert_eq!(recipe.versions[0].version, v("1.1"));
    }

    #[test]
    fn test_missing_project_table() {
        let err = decode_pyproject("demo-pkg", None, "[build-system]\nrequires = []\n").unwrap_err();
        assert!(err.to_string().contains("demo-pkg"));
    }
}

mod repository {
    use super::*;

    #[test]
    fn test_write_recipe_layout() {
        let (dir, repo) = create_repository();
        assert!(!repo.exists("py-demo-pkg"));

        let path = repo.write_recipe("py-demo-pkg", "class PyDemoPkg:\n").unwrap();
        assert_eq!(path, dir.path().join("packages/py-demo-pkg/package.py"));
        assert!(repo.exists("py-demo-pkg"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "class PyDemoPkg:\n");
    }

    #[test]
    fn test_existing_recipe_is_not_overwritten() {
        let (_dir, repo) = create_repository();
        let path = repo.write_recipe("py-demo-pkg", "original\n").unwrap();

        assert!(repo.write_recipe("py-demo-pkg", "replacement\n").is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "original\n");
    }

    #[test]
    fn test_discover_builtin_repository() {
        let spack_root = tempfile::tempdir().unwrap();
        let builtin = spack_root.path().join("var/spack/repos/builtin");
        fs::create_dir_all(builtin.join("packages")).unwrap();
        fs::write(builtin.join("repo.yaml"), "repo:\n  namespace: builtin\n").unwrap();

        let repo = SpackRepository::discover(None, Some(spack_root.path())).unwrap();
        assert_eq!(repo.root(), builtin.as_path());
    }
}

mod full_run {
    use super::*;
    use spackify::orchestrator::{Orchestrator, OrchestratorConfig};
    use spackify::progress::Progress;
    use spackify::registry::{GitHubProvider, HttpClient, PyPiProvider};
    use std::sync::Arc;

    fn tar_gz(files: &[(&str, &str)]) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (path, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_path(path).unwrap();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append(&header, content.as_bytes()).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    fn project_page(server_url: &str, name: &str, file_stem: &str, version: &str) -> String {
        format!(
            r#"{{
                "name": "{name}",
                "versions": ["{version}"],
                "files": [
                    {{"filename": "{stem}-{version}.tar.gz", "url": "{url}/files/{stem}-{version}.tar.gz", "hashes": {{"sha256": "{stem}sum"}}}}
                ]
            }}"#,
            name = name,
            version = version,
            stem = file_stem,
            url = server_url
        )
    }

    async fn mock_package(
        server: &mut mockito::Server,
        name: &str,
        file_stem: &str,
        version: &str,
        pyproject: &str,
    ) -> Vec<mockito::Mock> {
        let page = server
            .mock("GET", format!("/{}/", name).as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(project_page(&server.url(), name, file_stem, version))
            .create_async()
            .await;
        let manifest_path = format!("{}-{}/pyproject.toml", file_stem, version);
        let archive = server
            .mock("GET", format!("/files/{}-{}.tar.gz", file_stem, version).as_str())
            .with_status(200)
            .with_body(tar_gz(&[(manifest_path.as_str(), pyproject)]))
            .create_async()
            .await;
        vec![page, archive]
    }

    fn orchestrator(server_url: &str, repo: SpackRepository) -> Orchestrator {
        let client = HttpClient::new().unwrap().with_max_retries(0);
        Orchestrator::with_providers(
            Arc::new(PyPiProvider::with_base_url(client.clone(), server_url)),
            Arc::new(GitHubProvider::with_base_url(client, server_url)),
            Some(repo),
            OrchestratorConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_root_and_dependency_are_written() {
        let mut server = mockito::Server::new_async().await;
        let _root = mock_package(
            &mut server,
            "demo-pkg",
            "demo_pkg",
            "1.0",
            "[project]\nname = \"demo-pkg\"\ndependencies = [\"dep-lib>=1.0\"]\n",
        )
        .await;
        let _dep = mock_package(
            &mut server,
            "dep-lib",
            "dep_lib",
            "1.0",
            "[project]\nname = \"dep-lib\"\n",
        )
        .await;

        let (dir, repo) = create_repository();
        let orchestrator = orchestrator(&server.url(), repo);
        let report = orchestrator.run("demo-pkg", &mut Progress::disabled()).await;

        assert!(report.failures.is_empty(), "{:?}", report.failures);
        let names: Vec<&str> = report.converted.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["demo-pkg", "dep-lib"]);
        assert!(report.remaining.is_empty());

        let root = fs::read_to_string(dir.path().join("packages/py-demo-pkg/package.py")).unwrap();
        assert!(root.contains("    version(\"1.0\", sha256=\"demo_pkgsum\")\n"));
        assert!(root.contains("depends_on(\"py-dep-lib\")"));
        assert!(dir.path().join("packages/py-dep-lib/package.py").is_file());
    }

    #[tokio::test]
    async fn test_existing_dependency_is_not_converted() {
        let mut server = mockito::Server::new_async().await;
        let _root = mock_package(
            &mut server,
            "demo-pkg",
            "demo_pkg",
            "1.0",
            "[project]\nname = \"demo-pkg\"\ndependencies = [\"dep-lib\"]\n",
        )
        .await;

        let (dir, repo) = create_repository();
        repo.write_recipe("py-dep-lib", "existing\n").unwrap();
        let orchestrator = orchestrator(&server.url(), repo);
        let report = orchestrator.run("demo-pkg", &mut Progress::disabled()).await;

        assert!(report.is_clean());
        assert_eq!(report.converted.len(), 1);
        assert_eq!(
            fs::read_to_string(dir.path().join("packages/py-dep-lib/package.py")).unwrap(),
            "existing\n"
        );
    }

    #[tokio::test]
    async fn test_unknown_root_fails() {
        let mut server = mockito::Server::new_async().await;
        let _missing = server
            .mock("GET", "/no-such-pkg/")
            .with_status(404)
            .create_async()
            .await;

        let (_dir, repo) = create_repository();
        let orchestrator = orchestrator(&server.url(), repo);
        let report = orchestrator.run("no-such-pkg", &mut Progress::disabled()).await;

        assert!(report.converted.is_empty());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].name, "no-such-pkg");
        assert!(!report.is_clean());
    }
}
