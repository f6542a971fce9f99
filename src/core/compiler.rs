//! Compiler collaborators: the Elm compiler and the Morphir IR compiler.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::Result;
use crate::process::{self, ProcessSpec};

/// How Elm package dependencies are fetched before compiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyFetch {
    /// Let `elm make` resolve packages itself.
    Elm,
    /// Pre-fetch packages with `shelm` (skipped when it isn't installed).
    Shelm,
}

impl DependencyFetch {
    pub fn from_flag(use_shelm: bool) -> Self {
        if use_shelm {
            DependencyFetch::Shelm
        } else {
            DependencyFetch::Elm
        }
    }
}

#[derive(Debug, Clone)]
pub struct ElmMake {
    /// Directory containing `elm.json`; the compiler runs inside it.
    pub root_dir: PathBuf,
    pub source: String,
    pub output: String,
    pub fetch: DependencyFetch,
}

impl ElmMake {
    pub fn new(
        root_dir: impl Into<PathBuf>,
        source: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            root_dir: root_dir.into(),
            source: source.into(),
            output: output.into(),
            fetch: DependencyFetch::Elm,
        }
    }

    pub fn fetch(mut self, fetch: DependencyFetch) -> Self {
        self.fetch = fetch;
        self
    }

    pub fn to_spec(&self) -> ProcessSpec {
        ProcessSpec::new("elm")
            .args(["make", self.source.as_str(), "--output", self.output.as_str()])
            .cwd(&self.root_dir)
    }

    pub fn run(&self) -> Result<()> {
        if self.fetch == DependencyFetch::Shelm {
            crate::log_status!("elm", "Fetching dependencies with shelm");
            process::run(&shelm_fetch(&self.root_dir))?;
        }
        process::run(&self.to_spec())?;
        Ok(())
    }
}

fn shelm_fetch(root_dir: &Path) -> ProcessSpec {
    ProcessSpec::new("shelm").arg("fetch").cwd(root_dir).optional()
}

/// Compile the package documentation only (`elm make --docs`).
pub fn elm_docs(root_dir: &Path, docs_output: &str) -> Result<()> {
    let spec = ProcessSpec::new("elm")
        .args(["make", "--docs", docs_output])
        .cwd(root_dir);
    process::run(&spec)?;
    Ok(())
}

/// A JavaScript CLI launched through Node.js.
#[derive(Debug, Clone)]
pub struct NodeCli {
    pub node: String,
    pub script: PathBuf,
    pub cwd: PathBuf,
}

impl NodeCli {
    pub fn new(node: impl Into<String>, script: impl Into<PathBuf>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            node: node.into(),
            script: script.into(),
            cwd: cwd.into(),
        }
    }

    pub fn command(&self, subcommand: &str) -> ProcessSpec {
        ProcessSpec::new(self.node.as_str())
            .path_arg(&self.script)
            .arg(subcommand)
            .cwd(&self.cwd)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MakeOptions {
    /// Emit the type-level artifact only.
    pub types_only: bool,
    /// Pass `-f` to force a full rebuild (first-generation CLI).
    pub force: bool,
}

impl MakeOptions {
    pub fn types_only() -> Self {
        Self {
            types_only: true,
            ..Self::default()
        }
    }

    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }
}

pub fn make_ir_spec(cli: &NodeCli, project_dir: &Path, output: &Path, options: MakeOptions) -> ProcessSpec {
    let mut spec = cli.command("make");
    if options.force {
        spec = spec.arg("-f");
    }
    spec = spec.arg("-p").path_arg(project_dir).arg("-o").path_arg(output);
    if options.types_only {
        spec = spec.arg("--types-only");
    }
    spec
}

/// Compile a Morphir project into its IR file.
pub fn make_ir(cli: &NodeCli, project_dir: &Path, output: &Path, options: MakeOptions) -> Result<()> {
    process::run(&make_ir_spec(cli, project_dir, output, options))?;
    Ok(())
}
