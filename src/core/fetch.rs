//! Network fetch collaborator.
//!
//! Retrieves a snapshot of a repository at a given reference. Proxy routing
//! is decided by the caller through [`ProxyStrategy`]; nothing here reads
//! proxy variables from the environment.

use std::fs;
use std::io::{Cursor, Read};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::command;
use crate::error::{Error, ErrorCode, Result};
use crate::io;
use crate::process::{self, ProcessSpec};

const USER_AGENT: &str = concat!("morphir-build/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchTransport {
    /// Shallow single-branch `git clone`.
    #[default]
    Git,
    /// Download and unpack the hosted zip snapshot over HTTP(S).
    Archive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyStrategy {
    Direct,
    Via(String),
}

impl ProxyStrategy {
    pub fn proxy_url(&self) -> Option<&str> {
        match self {
            ProxyStrategy::Direct => None,
            ProxyStrategy::Via(url) => Some(url.as_str()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    /// `tags/<name>`, `heads/<name>`, `refs/...` or a bare branch/tag name.
    pub reference: String,
    pub dest: PathBuf,
    pub attempts: u32,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>, reference: impl Into<String>, dest: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            reference: reference.into(),
            dest: dest.into(),
            attempts: 1,
        }
    }

    pub fn attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }
}

/// Fetch `request.reference` of `request.url` into `request.dest`.
///
/// Retryable failures are retried up to `request.attempts` times with the
/// destination emptied between attempts.
pub fn fetch(request: &FetchRequest, transport: FetchTransport, proxy: &ProxyStrategy) -> Result<()> {
    crate::log_status!(
        "fetch",
        "Fetching {} at {} via {:?}{}",
        request.url,
        request.reference,
        transport,
        proxy
            .proxy_url()
            .map(|p| format!(" (proxy {})", p))
            .unwrap_or_default()
    );

    let mut attempt = 1;
    loop {
        let result = match transport {
            FetchTransport::Git => fetch_git(request, proxy),
            FetchTransport::Archive => fetch_archive(request, proxy),
        };

        match result {
            Err(err) if err.retryable == Some(true) && attempt < request.attempts => {
                tracing::warn!(
                    attempt,
                    attempts = request.attempts,
                    "Fetch failed, retrying: {}",
                    err
                );
                reset_dir(&request.dest)?;
                attempt += 1;
            }
            other => return other,
        }
    }
}

fn reset_dir(dir: &Path) -> Result<()> {
    io::remove_path(dir, "reset fetch destination")?;
    io::ensure_dir(dir, "reset fetch destination")
}

/// Branch or tag name for a reference.
pub fn ref_name(reference: &str) -> &str {
    let reference = reference.strip_prefix("refs/").unwrap_or(reference);
    reference
        .strip_prefix("tags/")
        .or_else(|| reference.strip_prefix("heads/"))
        .unwrap_or(reference)
}

pub fn git_clone_spec(request: &FetchRequest, proxy: &ProxyStrategy) -> ProcessSpec {
    let mut spec = ProcessSpec::new("git");
    if let Some(url) = proxy.proxy_url() {
        spec = spec.arg("-c").arg(format!("http.proxy={}", url));
    }
    spec.args([
        "clone",
        "--quiet",
        "--depth",
        "1",
        "--single-branch",
        "--branch",
        ref_name(&request.reference),
        request.url.as_str(),
    ])
    .path_arg(&request.dest)
}

fn fetch_git(request: &FetchRequest, proxy: &ProxyStrategy) -> Result<()> {
    if let Err(err) = process::run(&git_clone_spec(request, proxy)) {
        // Network hiccups surface as a plain non-zero exit from git.
        return Err(match err.code {
            ErrorCode::ProcessFailed => Error::fetch_failed(&request.url, err.to_string()),
            _ => err,
        });
    }

    if let Ok(head) = command::run_in(&request.dest, "git", &["rev-parse", "HEAD"], "resolve fetched commit") {
        tracing::debug!(commit = %head, "Fetched {}", request.url);
    }
    Ok(())
}

/// Hosted zip snapshot URL for a repository reference.
pub fn archive_url(url: &str, reference: &str) -> String {
    let base = url.trim_end_matches('/').trim_end_matches(".git");
    let reference = reference.strip_prefix("refs/").unwrap_or(reference);
    let qualified = if reference.starts_with("tags/") || reference.starts_with("heads/") {
        reference.to_string()
    } else {
        format!("heads/{}", reference)
    };
    format!("{}/archive/refs/{}.zip", base, qualified)
}

fn fetch_archive(request: &FetchRequest, proxy: &ProxyStrategy) -> Result<()> {
    let url = archive_url(&request.url, &request.reference);
    let bytes = download(&url, proxy)?;
    let written = extract_archive(&bytes, &request.dest)?;
    tracing::debug!(files = written, "Unpacked {}", url);
    Ok(())
}

fn download(url: &str, proxy: &ProxyStrategy) -> Result<Vec<u8>> {
    let mut builder = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(120));
    builder = match proxy {
        ProxyStrategy::Direct => builder.no_proxy(),
        ProxyStrategy::Via(proxy_url) => builder.proxy(reqwest::Proxy::all(proxy_url).map_err(|e| {
            Error::config_invalid_value("proxy", Some(proxy_url.clone()), e.to_string())
        })?),
    };

    let client = builder
        .build()
        .map_err(|e| Error::internal_io(e.to_string(), Some("create HTTP client".to_string())))?;

    let response = client
        .get(url)
        .send()
        .and_then(|response| response.error_for_status())
        .map_err(|e| Error::fetch_failed(url, e.to_string()))?;

    response
        .bytes()
        .map(|bytes| bytes.to_vec())
        .map_err(|e| Error::fetch_failed(url, e.to_string()))
}

/// Unpack a zip snapshot into `dest`, dropping the archive's top-level
/// directory. Returns the number of files written.
pub fn extract_archive(bytes: &[u8], dest: &Path) -> Result<usize> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| Error::internal_io(e.to_string(), Some("open snapshot archive".to_string())))?;

    let mut written = 0;
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| Error::internal_io(e.to_string(), Some("read snapshot archive".to_string())))?;

        let Some(name) = entry.enclosed_name().map(Path::to_path_buf) else {
            tracing::warn!("Skipping unsafe archive entry '{}'", entry.name());
            continue;
        };
        let relative: PathBuf = name
            .components()
            .skip(1)
            .filter(|c| matches!(c, Component::Normal(_)))
            .collect();
        if relative.as_os_str().is_empty() {
            continue;
        }

        let target = dest.join(&relative);
        if entry.is_dir() {
            io::ensure_dir(&target, "unpack snapshot")?;
            continue;
        }
        if let Some(parent) = target.parent() {
            io::ensure_dir(parent, "unpack snapshot")?;
        }

        let mut content = Vec::new();
        entry
            .read_to_end(&mut content)
            .map_err(|e| Error::internal_io(e.to_string(), Some(format!("read {}", entry.name()))))?;
        fs::write(&target, content).map_err(|e| {
            Error::internal_io(e.to_string(), Some(format!("write {}", target.display())))
        })?;
        written += 1;
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::FileOptions;

    fn snapshot(entries: &[(&str, Option<&str>)]) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            for (name, content) in entries {
                match content {
                    Some(content) => {
                        writer.start_file(*name, FileOptions::default()).unwrap();
                        writer.write_all(content.as_bytes()).unwrap();
                    }
                    None => writer.add_directory(*name, FileOptions::default()).unwrap(),
                }
            }
            writer.finish().unwrap();
        }
        buffer.into_inner()
    }

    #[test]
    fn ref_names() {
        assert_eq!(ref_name("tags/v0.18.2"), "v0.18.2");
        assert_eq!(ref_name("refs/heads/main"), "main");
        assert_eq!(ref_name("develop"), "develop");
    }

    #[test]
    fn archive_urls() {
        assert_eq!(
            archive_url("https://github.com/finos/morphir-jvm", "tags/v0.18.2"),
            "https://github.com/finos/morphir-jvm/archive/refs/tags/v0.18.2.zip"
        );
        assert_eq!(
            archive_url("https://github.com/finos/morphir-jvm.git/", "main"),
            "https://github.com/finos/morphir-jvm/archive/refs/heads/main.zip"
        );
    }

    #[test]
    fn git_clone_passes_explicit_proxy() {
        let request = FetchRequest::new("https://github.com/finos/morphir-jvm", "tags/v0.18.2", "/tmp/jvm");
        let direct = git_clone_spec(&request, &ProxyStrategy::Direct);
        assert_eq!(
            direct.display(),
            "git clone --quiet --depth 1 --single-branch --branch v0.18.2 https://github.com/finos/morphir-jvm /tmp/jvm"
        );

        let proxied = git_clone_spec(&request, &ProxyStrategy::Via("http://proxy:3128".to_string()));
        assert_eq!(proxied.args[0], "-c");
        assert_eq!(proxied.args[1], "http.proxy=http://proxy:3128");
    }

    #[test]
    fn extract_strips_top_level_directory() {
        let bytes = snapshot(&[
            ("morphir-jvm-0.18.2/", None),
            ("morphir-jvm-0.18.2/morphir/sdk/", None),
            ("morphir-jvm-0.18.2/morphir/sdk/Basics.scala", Some("object Basics")),
            ("morphir-jvm-0.18.2/README.md", Some("readme")),
        ]);
        let dest = TempDir::new().unwrap();

        let written = extract_archive(&bytes, dest.path()).unwrap();

        assert_eq!(written, 2);
        assert_eq!(
            fs::read_to_string(dest.path().join("morphir/sdk/Basics.scala")).unwrap(),
            "object Basics"
        );
        assert!(dest.path().join("README.md").is_file());
    }

    #[test]
    fn extract_ignores_declared_entry_size() {
        let mut bytes = snapshot(&[("morphir-jvm-0.18.2/morphir/sdk/Basics.scala", Some("object Basics"))]);
        let central = bytes
            .windows(4)
            .position(|w| w == [0x50, 0x4b, 0x01, 0x02])
            .unwrap();
        bytes[central + 24..central + 28].copy_from_slice(&0x7fff_fff0u32.to_le_bytes());
        let dest = TempDir::new().unwrap();

        assert_eq!(extract_archive(&bytes, dest.path()).unwrap(), 1);
        assert_eq!(
            fs::read_to_string(dest.path().join("morphir/sdk/Basics.scala")).unwrap(),
            "object Basics"
        );
    }

    #[test]
    fn extract_rejects_garbage() {
        let dest = TempDir::new().unwrap();
        assert!(extract_archive(b"not a zip", dest.path()).is_err());
    }

    #[test]
    fn attempts_never_below_one() {
        let request = FetchRequest::new("u", "r", "/tmp/x").attempts(0);
        assert_eq!(request.attempts, 1);
    }

    #[test]
    fn transport_deserializes_lowercase() {
        let transport: FetchTransport = serde_json::from_str("\"archive\"").unwrap();
        assert_eq!(transport, FetchTransport::Archive);
        assert_eq!(FetchTransport::default(), FetchTransport::Git);
    }
}
