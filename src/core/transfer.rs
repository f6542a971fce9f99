//! File transfer collaborator: glob copies, concatenation, deletion.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::io;

/// Copy every file matching `pattern` into `dest`.
///
/// Relative structure below the pattern's non-glob base is preserved:
/// `sdk/**` copies `sdk/a/b.scala` to `dest/a/b.scala`. A literal path
/// copies the single file into `dest`. Returns the number of files copied.
pub fn copy_glob(pattern: &str, dest: &Path) -> Result<usize> {
    let base = glob_base(pattern);
    let expanded = file_pattern(pattern);
    let entries = glob::glob(&expanded).map_err(|e| {
        Error::validation_invalid_argument(
            "pattern",
            format!("Invalid glob pattern '{}': {}", pattern, e),
            Some(pattern.to_string()),
            None,
        )
    })?;

    let mut copied = 0;
    for entry in entries {
        let source = entry.map_err(|e| {
            Error::internal_io(e.to_string(), Some(format!("expand {}", pattern)))
        })?;
        if !source.is_file() {
            continue;
        }

        let relative = match source.strip_prefix(&base) {
            Ok(relative) => relative.to_path_buf(),
            Err(_) => PathBuf::from(source.file_name().unwrap_or_default()),
        };
        let target = dest.join(&relative);
        if let Some(parent) = target.parent() {
            io::ensure_dir(parent, "create copy destination")?;
        }
        fs::copy(&source, &target).map_err(|e| {
            Error::internal_io(
                e.to_string(),
                Some(format!("copy {} to {}", source.display(), target.display())),
            )
        })?;
        copied += 1;
    }

    if copied == 0 {
        tracing::warn!("No files matched '{}'", pattern);
    } else {
        crate::log_status!("copy", "Copied {} file(s) from '{}' to {}", copied, pattern, dest.display());
    }
    Ok(copied)
}

/// `glob` matches only directories for a trailing `**`; descend into them.
fn file_pattern(pattern: &str) -> String {
    match pattern.strip_suffix("**") {
        Some(prefix) if prefix.is_empty() || prefix.ends_with('/') => format!("{}**/*", prefix),
        _ => pattern.to_string(),
    }
}

/// Leading path components of `pattern` that contain no glob characters.
pub fn glob_base(pattern: &str) -> PathBuf {
    let path = Path::new(pattern);
    if !contains_glob_chars(pattern) {
        return path.parent().map(Path::to_path_buf).unwrap_or_default();
    }

    let mut base = PathBuf::new();
    for component in path.components() {
        if contains_glob_chars(&component.as_os_str().to_string_lossy()) {
            break;
        }
        base.push(component);
    }
    base
}

fn contains_glob_chars(s: &str) -> bool {
    s.contains('*') || s.contains('?') || s.contains('[') || s.contains(']')
}

/// Concatenate `sources` into `dest`, separated by newlines.
pub fn concat(sources: &[PathBuf], dest: &Path) -> Result<()> {
    let mut parts = Vec::with_capacity(sources.len());
    for source in sources {
        parts.push(io::read_file(source, "read concat source")?);
    }

    if let Some(parent) = dest.parent() {
        io::ensure_dir(parent, "create concat destination")?;
    }
    fs::write(dest, parts.join("\n")).map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("write {}", dest.display())))
    })?;

    crate::log_status!("copy", "Concatenated {} file(s) into {}", sources.len(), dest.display());
    Ok(())
}

/// Delete files or directory trees; missing paths are ignored.
///
/// Returns the number of paths that existed and were removed.
pub fn remove(paths: &[PathBuf]) -> Result<usize> {
    let mut removed = 0;
    for path in paths {
        if io::remove_path(path, "delete build output")? {
            tracing::debug!(path = %path.display(), "Removed");
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn glob_base_stops_at_first_wildcard() {
        assert_eq!(glob_base("clone/morphir/sdk/**"), PathBuf::from("clone/morphir/sdk"));
        assert_eq!(glob_base("lib/sdk/**/*"), PathBuf::from("lib/sdk"));
        assert_eq!(glob_base("*.js"), PathBuf::new());
        assert_eq!(glob_base("cli/web/insight.js"), PathBuf::from("cli/web"));
    }

    #[test]
    fn copy_glob_preserves_relative_structure() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        touch(&src.path().join("morphir/sdk/Basics.scala"), "basics");
        touch(&src.path().join("morphir/sdk/list/List.scala"), "list");
        touch(&src.path().join("morphir/other/Skip.scala"), "skip");

        let pattern = format!("{}/morphir/sdk/**", src.path().display());
        let copied = copy_glob(&pattern, dest.path()).unwrap();

        assert_eq!(copied, 2);
        assert_eq!(fs::read_to_string(dest.path().join("Basics.scala")).unwrap(), "basics");
        assert_eq!(fs::read_to_string(dest.path().join("list/List.scala")).unwrap(), "list");
        assert!(!dest.path().join("Skip.scala").exists());
    }

    #[test]
    fn trailing_double_star_reaches_nested_files() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        touch(&src.path().join("morphir/sdk/top.scala"), "top");
        touch(&src.path().join("morphir/sdk/a/b/deep.scala"), "deep");

        let pattern = format!("{}/morphir/sdk/**", src.path().display());
        assert_eq!(copy_glob(&pattern, dest.path()).unwrap(), 2);
        assert!(dest.path().join("top.scala").is_file());
        assert!(dest.path().join("a/b/deep.scala").is_file());
    }

    #[test]
    fn file_pattern_only_rewrites_trailing_double_star() {
        assert_eq!(file_pattern("clone/morphir/sdk/**"), "clone/morphir/sdk/**/*");
        assert_eq!(file_pattern("lib/sdk/**/*"), "lib/sdk/**/*");
        assert_eq!(file_pattern("**"), "**/*");
        assert_eq!(file_pattern("cli/web/insight.js"), "cli/web/insight.js");
    }

    #[test]
    fn copy_literal_path_lands_in_destination() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let file = src.path().join("generated/morphir-ir.json");
        touch(&file, "{}");

        let copied = copy_glob(&file.to_string_lossy(), &dest.path().join("model")).unwrap();
        assert_eq!(copied, 1);
        assert!(dest.path().join("model/morphir-ir.json").is_file());
    }

    #[test]
    fn copy_without_matches_copies_nothing() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let pattern = format!("{}/missing/**", src.path().display());
        assert_eq!(copy_glob(&pattern, dest.path()).unwrap(), 0);
    }

    #[test]
    fn invalid_pattern_rejected() {
        let dest = TempDir::new().unwrap();
        let err = copy_glob("src/[", dest.path()).unwrap_err();
        assert_eq!(err.code.as_str(), "validation.invalid_argument");
    }

    #[test]
    fn concat_joins_sources_in_order() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("insight.js");
        let b = dir.path().join("morphir-insight-element.js");
        touch(&a, "const a = 1;");
        touch(&b, "const b = 2;");

        let dest = dir.path().join("out/insight.js");
        concat(&[a, b], &dest).unwrap();
        assert_eq!(fs::read_to_string(dest).unwrap(), "const a = 1;\nconst b = 2;");
    }

    #[test]
    fn concat_can_overwrite_one_of_its_sources() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("insight.js");
        let b = dir.path().join("element.js");
        touch(&a, "a");
        touch(&b, "b");

        concat(&[a.clone(), b], &a).unwrap();
        assert_eq!(fs::read_to_string(a).unwrap(), "a\nb");
    }

    #[test]
    fn remove_counts_existing_paths() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("dist/cli.js"), "x");
        let removed = remove(&[dir.path().join("dist"), dir.path().join("nope")]).unwrap();
        assert_eq!(removed, 1);
    }
}
