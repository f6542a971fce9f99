//! Build pipelines for the CLIs, the TypeScript API and the web apps.

use super::{elm_make, morphir_elm, npx, rel};
use crate::codegen::{self, GenTarget};
use crate::compiler::{self, MakeOptions};
use crate::node::{parallel, series, Node};
use crate::transfer;

pub fn make_cli() -> Node {
    elm_make("make-cli", "cli", "src/Morphir/Elm/CLI.elm", "Morphir.Elm.CLI.js", true)
}

pub fn make_dev_cli() -> Node {
    elm_make(
        "make-dev-cli",
        "cli",
        "src/Morphir/Elm/DevCLI.elm",
        "Morphir.Elm.DevCLI.js",
        true,
    )
}

pub fn build_cli2() -> Node {
    parallel(vec![
        npx("compile-cli2-ts", &["tsc", "--project", "cli2/tsconfig.json"]),
        elm_make("make-cli2", "cli2", "src/Morphir/Elm/CLI.elm", "Morphir.Elm.CLI.js", true),
    ])
    .named("build-cli2")
}

/// Type-level IR of the whole package, its TypeScript bindings, and the
/// compiled `lib` API on top of them.
pub fn build_api2() -> Node {
    series(vec![
        Node::from_fn("make-api2-ir", |ctx| {
            compiler::make_ir(
                &morphir_elm(ctx),
                rel("."),
                rel("./morphir-ir.json"),
                MakeOptions::types_only().forced(),
            )
        }),
        Node::from_fn("gen-api2-typescript", |ctx| {
            codegen::generate(
                &morphir_elm(ctx),
                rel("./morphir-ir.json"),
                rel("./lib/generated"),
                &GenTarget::TypeScript,
            )
        }),
        Node::from_fn("copy-api2-sdk", |ctx| {
            let pattern = ctx.path("lib/sdk/**/*");
            transfer::copy_glob(&pattern.to_string_lossy(), &ctx.path("lib/generated/morphir/sdk"))?;
            Ok(())
        }),
        npx("compile-api2-ts", &["tsc", "--project", "lib/tsconfig.json"]),
    ])
    .named("build-morphir-api2")
}

fn make_components() -> Node {
    Node::from_fn("make-components", |ctx| {
        transfer::concat(
            &[
                ctx.path("cli/web/insight.js"),
                ctx.path("cli/web/morphir-insight-element.js"),
            ],
            &ctx.path("cli/web/insight.js"),
        )
    })
}

pub fn build() -> Node {
    series(vec![
        Node::from_fn("check-elm-docs", |ctx| compiler::elm_docs(ctx.root(), "docs.json")),
        make_cli(),
        make_dev_cli(),
        build_cli2(),
        build_api2(),
        elm_make(
            "make-dev-server",
            "cli",
            "src/Morphir/Web/DevelopApp.elm",
            "web/index.js",
            true,
        ),
        elm_make(
            "make-dev-server-api",
            "cli",
            "src/Morphir/Web/DevelopApp.elm",
            "web/insightapp.js",
            false,
        ),
        elm_make(
            "make-insight-api",
            "cli",
            "src/Morphir/Web/Insight.elm",
            "web/insight.js",
            false,
        ),
        make_components(),
        elm_make(
            "make-try-morphir",
            "cli",
            "src/Morphir/Web/TryMorphir.elm",
            "web/try-morphir.html",
            false,
        ),
    ])
    .named("build")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_order() {
        let names = build().task_names();
        let position = |name: &str| names.iter().position(|n| n == name).unwrap();

        assert_eq!(names.first().map(String::as_str), Some("check-elm-docs"));
        assert!(position("make-cli") < position("compile-cli2-ts"));
        assert!(position("compile-api2-ts") < position("make-dev-server"));
        assert!(position("make-insight-api") < position("make-components"));
        assert_eq!(names.len(), 14);
    }

    #[test]
    fn cli2_steps_run_side_by_side() {
        let tree = build_cli2().render();
        assert_eq!(
            tree,
            "parallel (build-cli2)\n  - compile-cli2-ts\n  - make-cli2"
        );
    }
}
