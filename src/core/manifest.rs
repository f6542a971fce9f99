//! Dependency policy gate over `package-lock.json`.
//!
//! Some environments forbid particular packages at runtime. The gate fails
//! when any disallowed package is present without the `dev` flag, in either
//! the `packages["node_modules/<name>"]` layout (lockfile v2+) or the legacy
//! `dependencies[<name>]` layout.

use std::path::Path;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::io;

pub const POLICY: &str = "runtime-dependency";

/// Whether `package` is a non-development dependency in `lock`.
pub fn has_runtime_dependency(lock: &Value, package: &str) -> bool {
    let in_packages = lock
        .get("packages")
        .and_then(|packages| packages.get(format!("node_modules/{}", package)))
        .is_some_and(|entry| !is_dev(entry));

    let in_dependencies = lock
        .get("dependencies")
        .and_then(|dependencies| dependencies.get(package))
        .is_some_and(|entry| !is_dev(entry));

    in_packages || in_dependencies
}

fn is_dev(entry: &Value) -> bool {
    entry.get("dev").and_then(Value::as_bool).unwrap_or(false)
}

/// Fail with a policy violation if any `disallowed` package is a runtime
/// dependency in the lockfile at `path`.
pub fn check_lockfile(path: &Path, disallowed: &[String]) -> Result<()> {
    let lock: Value = io::read_json(path, "read lockfile")?;

    let violations: Vec<&String> = disallowed
        .iter()
        .filter(|package| has_runtime_dependency(&lock, package))
        .collect();

    match violations.as_slice() {
        [] => {
            crate::log_status!(
                "policy",
                "No runtime dependency on {} in {}",
                disallowed.join(", "),
                path.display()
            );
            Ok(())
        }
        [first, ..] => {
            let names: Vec<&str> = violations.iter().map(|s| s.as_str()).collect();
            Err(Error::policy_violation(
                POLICY,
                first.as_str(),
                format!("Runtime dependency on {} was detected!", names.join(", ")),
                Some(path.display().to_string()),
            )
            .with_hint("Move the package to devDependencies or remove it before releasing"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn disallowed() -> Vec<String> {
        vec!["binwrap".to_string()]
    }

    #[test]
    fn detects_runtime_dependency_in_packages_layout() {
        let lock = json!({
            "packages": {
                "node_modules/binwrap": { "version": "0.2.3" }
            }
        });
        assert!(has_runtime_dependency(&lock, "binwrap"));
    }

    #[test]
    fn detects_runtime_dependency_in_legacy_layout() {
        let lock = json!({
            "dependencies": {
                "binwrap": { "version": "0.2.3", "dev": false }
            }
        });
        assert!(has_runtime_dependency(&lock, "binwrap"));
    }

    #[test]
    fn dev_dependencies_are_allowed() {
        let lock = json!({
            "packages": { "node_modules/binwrap": { "dev": true } },
            "dependencies": { "binwrap": { "dev": true } }
        });
        assert!(!has_runtime_dependency(&lock, "binwrap"));
    }

    #[test]
    fn absent_package_is_allowed() {
        let lock = json!({ "packages": { "node_modules/elm": {} } });
        assert!(!has_runtime_dependency(&lock, "binwrap"));
        assert!(!has_runtime_dependency(&json!({}), "binwrap"));
    }

    #[test]
    fn check_lockfile_reports_policy_violation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("package-lock.json");
        fs::write(
            &path,
            json!({ "packages": { "node_modules/binwrap": { "version": "0.2.3" } } }).to_string(),
        )
        .unwrap();

        let err = check_lockfile(&path, &disallowed()).unwrap_err();
        assert_eq!(err.code.as_str(), "policy.violation");
        assert_eq!(err.details["subject"], "binwrap");
        assert!(err.message.contains("binwrap was detected"));
    }

    #[test]
    fn check_lockfile_passes_clean_lockfile() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("package-lock.json");
        fs::write(&path, json!({ "packages": { "": { "name": "morphir-elm" } } }).to_string()).unwrap();
        assert!(check_lockfile(&path, &disallowed()).is_ok());
    }

    #[test]
    fn missing_lockfile_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = check_lockfile(&dir.path().join("package-lock.json"), &disallowed()).unwrap_err();
        assert_eq!(err.code.as_str(), "internal.io_error");
    }
}
