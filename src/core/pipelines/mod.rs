//! Concrete build and test pipelines.
//!
//! Sub-pipelines that appear inside larger ones (`clean`, `build-cli2`,
//! `test-unit`, ...) are built by functions so each tree owns its own copy.
//! All relative paths resolve against the project root in [`TaskContext`].

mod build;
mod setup;

use std::path::Path;

pub use setup::proxy_for;

use crate::compiler::{DependencyFetch, ElmMake, NodeCli};
use crate::error::Result;
use crate::node::{series, Node};
use crate::process::{self, ProcessSpec};
use crate::registry::Registry;
use crate::task::TaskContext;

pub const DEFAULT_PIPELINE: &str = "default";

/// First-generation Morphir CLI.
const MORPHIR_ELM: &str = "./cli/morphir-elm.js";
/// Second-generation Morphir CLI and its companion scripts.
const MORPHIR_CLI2: &str = "./cli2/lib/morphir.js";
const MORPHIR_JSON_SCHEMA_GEN: &str = "./cli2/lib/morphir-json-schema-gen.js";
const MORPHIR_DOCKERIZE: &str = "./cli2/lib/morphir-dockerize.js";

/// Registry with every pipeline defined for the project.
pub fn registry() -> Result<Registry> {
    let mut registry = Registry::new();

    registry.register_with_description(
        "troubleshoot",
        "Print the resolved build settings",
        setup::troubleshoot(),
    )?;
    registry.register_with_description(
        "clean",
        "Remove build outputs",
        setup::clean(),
    )?;
    registry.register_with_description(
        "check-package-lock",
        "Fail when a disallowed package is a runtime dependency",
        setup::check_package_lock(),
    )?;
    registry.register_with_description(
        "jvm-sdk",
        "Fetch the Morphir JVM SDK sources into redistributable/Scala/sdk",
        setup::jvm_sdk(),
    )?;
    registry.register_with_description(
        "make-cli",
        "Compile the first-generation CLI",
        build::make_cli(),
    )?;
    registry.register_with_description(
        "make-dev-cli",
        "Compile the development CLI",
        build::make_dev_cli(),
    )?;
    registry.register_with_description(
        "build-cli2",
        "Compile the second-generation CLI",
        build::build_cli2(),
    )?;
    registry.register_with_description("build", "Build every CLI and web artifact", build::build())?;
    registry.register_with_description("test-unit", "Run the Elm unit tests", test::test_unit())?;
    registry.register_with_description(
        "test-integration",
        "Run the integration tests against the reference model",
        test::test_integration(),
    )?;
    registry.register_with_description(
        "test-integration-spark",
        "Generate and test the Spark backend",
        test::test_integration_spark(),
    )?;
    registry.register_with_description(
        "test-morphir-ir",
        "Generate and test the TypeScript codecs of the Morphir IR",
        test::test_morphir_ir(),
    )?;
    registry.register_with_description(
        "test-morphir-ir-typescript",
        "Alias of test-morphir-ir",
        test::test_morphir_ir(),
    )?;
    registry.register_with_description(
        "test",
        "Unit and integration tests",
        test::test(),
    )?;
    registry.register_with_description(
        "csvfiles",
        "Create the Spark test CSV files",
        test::csvfiles(),
    )?;
    registry.register_with_description(
        DEFAULT_PIPELINE,
        "Clean, check the lockfile, fetch the JVM SDK and build",
        series(vec![
            setup::clean(),
            setup::check_package_lock(),
            setup::jvm_sdk(),
            build::build(),
        ]),
    )?;

    registry.set_default(DEFAULT_PIPELINE)?;
    Ok(registry)
}

fn morphir_elm(ctx: &TaskContext) -> NodeCli {
    node_cli(ctx, MORPHIR_ELM)
}

fn node_cli(ctx: &TaskContext, script: &str) -> NodeCli {
    NodeCli::new(ctx.settings().node.clone(), script, ctx.root())
}

/// Leaf running the command built by `spec` from the project root.
fn command<F>(name: &str, spec: F) -> Node
where
    F: Fn(&TaskContext) -> ProcessSpec + Send + Sync + 'static,
{
    Node::from_fn(name, move |ctx| {
        let mut spec = spec(ctx);
        if spec.cwd.is_none() {
            spec = spec.cwd(ctx.root());
        }
        process::run(&spec)?;
        Ok(())
    })
}

/// `npx <args>` from the project root.
fn npx(name: &str, args: &'static [&'static str]) -> Node {
    command(name, move |_| ProcessSpec::new("npx").args(args.iter().copied()))
}

/// Leaf compiling one Elm entry point inside `root_dir`.
///
/// `honor_shelm` selects whether the `USE_SHELM` strategy applies to it.
fn elm_make(
    name: &str,
    root_dir: &'static str,
    source: &'static str,
    output: &'static str,
    honor_shelm: bool,
) -> Node {
    Node::from_fn(name, move |ctx| {
        let fetch = if honor_shelm {
            DependencyFetch::from_flag(ctx.settings().use_shelm)
        } else {
            DependencyFetch::Elm
        };
        ElmMake::new(ctx.path(root_dir), source, output)
            .fetch(fetch)
            .run()
    })
}

fn rel(path: &'static str) -> &'static Path {
    Path::new(path)
}
