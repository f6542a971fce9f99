//! Build settings.
//!
//! Resolution order: built-in defaults, then `morphir-build.json` (or the
//! file passed with `--config`), then environment variables.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fetch::FetchTransport;
use crate::io;

pub const SETTINGS_FILE: &str = "morphir-build.json";

#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    pub root: PathBuf,
    /// Node.js executable used to run the JavaScript CLIs.
    pub node: String,
    /// Alternate dependency-fetch strategy for the Elm compiler step.
    pub use_shelm: bool,
    pub proxy: ProxySettings,
    pub jvm_sdk: JvmSdkSettings,
    pub lockfile: PathBuf,
    pub disallowed_runtime_packages: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProxySettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub https: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JvmSdkSettings {
    #[serde(default = "default_jvm_repository")]
    pub repository: String,
    #[serde(default = "default_jvm_version")]
    pub version: String,
    #[serde(default)]
    pub transport: FetchTransport,
    /// Tries per fetch; only network failures are retried.
    #[serde(default = "default_fetch_attempts")]
    pub attempts: u32,
}

impl Default for JvmSdkSettings {
    fn default() -> Self {
        Self {
            repository: default_jvm_repository(),
            version: default_jvm_version(),
            transport: FetchTransport::default(),
            attempts: default_fetch_attempts(),
        }
    }
}

impl JvmSdkSettings {
    /// Git reference of the configured release tag.
    pub fn reference(&self) -> String {
        format!("tags/v{}", self.version.trim_start_matches('v'))
    }
}

/// On-disk shape of `morphir-build.json`. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    node: Option<String>,
    #[serde(default)]
    use_shelm: Option<bool>,
    #[serde(default)]
    proxy: Option<ProxySettings>,
    #[serde(default)]
    jvm_sdk: Option<JvmSdkSettings>,
    #[serde(default)]
    lockfile: Option<String>,
    #[serde(default)]
    disallowed_runtime_packages: Option<Vec<String>>,
}

// =============================================================================
// Default value functions
// =============================================================================

fn default_jvm_repository() -> String {
    "https://github.com/finos/morphir-jvm".to_string()
}

fn default_jvm_version() -> String {
    "0.18.2".to_string()
}

fn default_fetch_attempts() -> u32 {
    1
}

impl Settings {
    /// Defaults for a project rooted at `root`, ignoring files and environment.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            node: "node".to_string(),
            use_shelm: false,
            proxy: ProxySettings::default(),
            jvm_sdk: JvmSdkSettings::default(),
            lockfile: PathBuf::from("package-lock.json"),
            disallowed_runtime_packages: vec!["binwrap".to_string()],
        }
    }

    /// Load settings for `root` from the settings file and the process environment.
    pub fn load(root: &Path, config: Option<&Path>) -> Result<Self> {
        let mut settings = Self::with_root(root);

        let config_path = match config {
            Some(path) => Some(expand_path(&path.to_string_lossy(), root)?),
            None => {
                let candidate = root.join(SETTINGS_FILE);
                candidate.is_file().then_some(candidate)
            }
        };

        if let Some(path) = config_path {
            let content = io::read_file(&path, "read settings file")?;
            settings.apply_file(&content, &path.to_string_lossy())?;
        }

        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    fn apply_file(&mut self, content: &str, source: &str) -> Result<()> {
        let file: SettingsFile =
            serde_json::from_str(content).map_err(|e| Error::config_invalid_json(source, e))?;

        if let Some(node) = file.node {
            self.node = node;
        }
        if let Some(use_shelm) = file.use_shelm {
            self.use_shelm = use_shelm;
        }
        if let Some(proxy) = file.proxy {
            self.proxy = proxy;
        }
        if let Some(jvm_sdk) = file.jvm_sdk {
            if jvm_sdk.version.trim().is_empty() {
                return Err(Error::config_invalid_value(
                    "jvmSdk.version",
                    Some(jvm_sdk.version),
                    "version cannot be empty",
                ));
            }
            self.jvm_sdk = jvm_sdk;
        }
        if let Some(lockfile) = file.lockfile {
            self.lockfile = expand_path(&lockfile, &self.root)?;
        }
        if let Some(packages) = file.disallowed_runtime_packages {
            self.disallowed_runtime_packages = packages;
        }
        Ok(())
    }

    /// Apply environment overrides through `lookup` so tests need not touch
    /// the real process environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |keys: &[&str]| {
            keys.iter()
                .find_map(|key| lookup(*key).filter(|value| !value.trim().is_empty()))
        };

        if let Some(http) = first(&["http_proxy", "HTTP_PROXY"]) {
            self.proxy.http = Some(http);
        }
        if let Some(https) = first(&["https_proxy", "HTTPS_PROXY"]) {
            self.proxy.https = Some(https);
        }
        if let Some(raw) = first(&["USE_SHELM"]) {
            match parse_yes_no(&raw) {
                Some(flag) => self.use_shelm = flag,
                None => tracing::warn!("Ignoring unrecognised USE_SHELM value '{}'", raw),
            }
        }
    }

    /// Absolute path of the lockfile checked by the dependency policy gate.
    pub fn lockfile_path(&self) -> PathBuf {
        self.root.join(&self.lockfile)
    }
}

/// Parse a yes/no style flag (`y`, `yes`, `true`, `1`, `on` and their negatives).
pub fn parse_yes_no(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "true" | "1" | "on" => Some(true),
        "n" | "no" | "false" | "0" | "off" => Some(false),
        _ => None,
    }
}

/// Expand `~` and `$VAR` references; relative results resolve against `root`.
pub fn expand_path(raw: &str, root: &Path) -> Result<PathBuf> {
    let expanded = shellexpand::full(raw).map_err(|e| {
        Error::config_invalid_value("path", Some(raw.to_string()), e.to_string())
    })?;
    let path = PathBuf::from(expanded.into_owned());
    Ok(if path.is_absolute() {
        path
    } else {
        root.join(path)
    })
}
