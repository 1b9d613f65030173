//! End-to-end tests for the spackify CLI
//!
//! These tests verify:
//! - Argument validation and its exit codes
//! - Repository discovery errors
//! - Report output for packages that cannot be converted
//!
//! None of them reach the network.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn spackify() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_spackify"));
    cmd.env_remove("SPACK_ROOT").env("RUST_LOG", "off");
    cmd
}

/// Create a Spack repository that already has `py-demo-pkg`
fn create_repository() -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let recipe_dir = dir.path().join("packages").join("py-demo-pkg");
    fs::create_dir_all(&recipe_dir).unwrap();
    fs::write(dir.path().join("repo.yaml"), "repo:\n  namespace: test\n").unwrap();
    fs::write(recipe_dir.join("package.py"), "# existing recipe\n").unwrap();
    dir
}

mod arguments {
    use super::*;

    #[test]
    fn test_help() {
        spackify()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("--max-conversions"))
            .stdout(predicate::str::contains("--versions-per-package"))
            .stdout(predicate::str::contains("--allow-duplicate"));
    }

    #[test]
    fn test_version() {
        spackify()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("spackify"));
    }

    #[test]
    fn test_package_is_required() {
        spackify().assert().failure();
    }

    #[test]
    fn test_zero_versions_per_package() {
        spackify()
            .args(["demo-pkg", "--dry-run", "--versions-per-package", "0"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("--versions-per-package"));
    }

    #[test]
    fn test_negative_max_conversions() {
        spackify()
            .args(["demo-pkg", "--dry-run", "--max-conversions", "-5"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("--max-conversions"));
    }

    #[test]
    fn test_quiet_and_verbose() {
        spackify()
            .args(["demo-pkg", "--dry-run", "--quiet", "--verbose"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("conflicting options"));
    }
}

mod repository {
    use super::*;

    #[test]
    fn test_missing_repository() {
        spackify()
            .arg("demo-pkg")
            .assert()
            .code(1)
            .stderr(predicate::str::contains("no Spack repository found"));
    }

    #[test]
    fn test_invalid_repository() {
        let dir = tempfile::tempdir().unwrap();
        spackify()
            .arg("demo-pkg")
            .arg("--repo")
            .arg(dir.path())
            .assert()
            .code(1)
            .stderr(predicate::str::contains("not a Spack repository"));
    }

    #[test]
    fn test_invalid_repository_from_spack_root() {
        let dir = tempfile::tempdir().unwrap();
        spackify()
            .arg("demo-pkg")
            .env("SPACK_ROOT", dir.path())
            .assert()
            .code(1)
            .stderr(predicate::str::contains("not a Spack repository"));
    }

    #[test]
    fn test_existing_root_is_reported() {
        let repo = create_repository();
        spackify()
            .arg("demo-pkg")
            .arg("--repo")
            .arg(repo.path())
            .assert()
            .code(2)
            .stdout(predicate::str::contains("could not be converted"))
            .stdout(predicate::str::contains("already exists"));

        assert_eq!(
            fs::read_to_string(repo.path().join("packages/py-demo-pkg/package.py")).unwrap(),
            "# existing recipe\n"
        );
    }

    #[test]
    fn test_existing_root_json_report() {
        let repo = create_repository();
        let output = spackify()
            .args(["demo-pkg", "--json"])
            .arg("--repo")
            .arg(repo.path())
            .output()
            .unwrap();

        assert_eq!(output.status.code(), Some(2));
        let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(json["dry_run"], false);
        assert_eq!(json["summary"]["converted"], 0);
        assert_eq!(json["summary"]["failures"], 1);
        assert_eq!(json["failures"][0]["name"], "demo-pkg");
        assert!(json["failures"][0]["reason"]
            .as_str()
            .unwrap()
            .contains("already exists"));
    }
}
