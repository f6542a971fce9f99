//! Code generator collaborator.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::compiler::NodeCli;
use crate::error::{Error, Result};
use crate::process::{self, ProcessSpec};

/// Output format of a generator run. Unknown tags pass through unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenTarget {
    TypeScript,
    Scala,
    Spark,
    JsonSchema,
    Other(String),
}

impl GenTarget {
    pub fn as_str(&self) -> &str {
        match self {
            GenTarget::TypeScript => "TypeScript",
            GenTarget::Scala => "Scala",
            GenTarget::Spark => "Spark",
            GenTarget::JsonSchema => "JsonSchema",
            GenTarget::Other(tag) => tag,
        }
    }
}

impl fmt::Display for GenTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let tag = s.trim();
        if tag.is_empty() {
            return Err(Error::validation_invalid_argument(
                "target",
                "Generator target cannot be empty",
                None,
                None,
            ));
        }
        Ok(match tag.to_ascii_lowercase().as_str() {
            "typescript" => GenTarget::TypeScript,
            "scala" => GenTarget::Scala,
            "spark" => GenTarget::Spark,
            "jsonschema" => GenTarget::JsonSchema,
            _ => GenTarget::Other(tag.to_string()),
        })
    }
}

pub fn generate_spec(cli: &NodeCli, input: &Path, output_dir: &Path, target: &GenTarget) -> ProcessSpec {
    cli.command("gen")
        .arg("-i")
        .path_arg(input)
        .arg("-o")
        .path_arg(output_dir)
        .arg("-t")
        .arg(target.as_str())
}

/// Generate source files for `target` from an IR file.
pub fn generate(cli: &NodeCli, input: &Path, output_dir: &Path, target: &GenTarget) -> Result<()> {
    process::run(&generate_spec(cli, input, output_dir, target))?;
    Ok(())
}

/// Generate JSON schema documents through the dedicated schema CLI.
pub fn json_schema_gen(cli: &NodeCli, input: &Path, output_dir: &Path, target: &GenTarget) -> Result<()> {
    let spec = cli
        .command("json-schema-gen")
        .arg("-i")
        .path_arg(input)
        .arg("-o")
        .path_arg(output_dir)
        .arg("-t")
        .arg(target.as_str());
    process::run(&spec).map_err(|err| err.with_hint("Check the IR file was produced by the make step"))?;
    Ok(())
}
