//! Named pipelines.
//!
//! A `Registry` is built once at startup and passed by reference to
//! whoever needs to look pipelines up. Registering a name twice is an
//! error; existing entries are never overwritten.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::engine::{self, RunReport};
use crate::error::{Error, Result};
use crate::node::Node;
use crate::outcome::Outcome;
use crate::task::TaskContext;

#[derive(Debug)]
pub struct Pipeline {
    pub name: String,
    pub description: Option<String>,
    pub node: Node,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub default: bool,
    pub tasks: usize,
    pub tree: String,
}

#[derive(Debug, Default)]
pub struct Registry {
    pipelines: BTreeMap<String, Pipeline>,
    default: Option<String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, node: Node) -> Result<()> {
        self.insert(name.into(), None, node)
    }

    pub fn register_with_description(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        node: Node,
    ) -> Result<()> {
        self.insert(name.into(), Some(description.into()), node)
    }

    fn insert(&mut self, name: String, description: Option<String>, node: Node) -> Result<()> {
        if name.trim().is_empty() {
            return Err(Error::validation_invalid_argument(
                "name",
                "Pipeline name cannot be empty",
                None,
                None,
            ));
        }
        if self.pipelines.contains_key(&name) {
            return Err(Error::registry_duplicate_name(name));
        }

        let node = match node {
            Node::Leaf(_) => node,
            composite if composite.name().is_none() => composite.named(name.clone()),
            composite => composite,
        };

        self.pipelines.insert(
            name.clone(),
            Pipeline {
                name,
                description,
                node,
            },
        );
        Ok(())
    }

    /// Pipeline selected when the invoker names none.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.pipelines.contains_key(name) {
            return Err(Error::pipeline_not_found(name, self.names()));
        }
        self.default = Some(name.to_string());
        Ok(())
    }

    pub fn default_name(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn get(&self, name: &str) -> Option<&Pipeline> {
        self.pipelines.get(name)
    }

    /// Look a pipeline up by name, falling back to the default.
    pub fn resolve(&self, name: Option<&str>) -> Result<&Pipeline> {
        let name = match name.or(self.default.as_deref()) {
            Some(name) => name,
            None => {
                return Err(Error::validation_invalid_argument(
                    "pipeline",
                    "No pipeline given and no default pipeline is registered",
                    None,
                    Some(self.names()),
                ))
            }
        };

        self.get(name)
            .ok_or_else(|| Error::pipeline_not_found(name, self.names()))
    }

    pub fn names(&self) -> Vec<String> {
        self.pipelines.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    pub fn describe(&self) -> Vec<PipelineSummary> {
        self.pipelines
            .values()
            .map(|pipeline| PipelineSummary {
                name: pipeline.name.clone(),
                description: pipeline.description.clone(),
                default: self.default.as_deref() == Some(pipeline.name.as_str()),
                tasks: pipeline.node.leaf_count(),
                tree: pipeline.node.render(),
            })
            .collect()
    }

    pub fn run(&self, name: &str, ctx: &TaskContext) -> Result<Outcome> {
        let pipeline = self
            .get(name)
            .ok_or_else(|| Error::pipeline_not_found(name, self.names()))?;
        Ok(engine::run(&pipeline.node, ctx))
    }

    pub fn run_reported(&self, name: Option<&str>, ctx: &TaskContext) -> Result<(Outcome, RunReport)> {
        let pipeline = self.resolve(name)?;
        Ok(engine::run_reported(&pipeline.name, &pipeline.node, ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::node::series;
    use crate::settings::Settings;

    fn ok(name: &str) -> Node {
        Node::from_fn(name.to_string(), |_| Ok(()))
    }

    fn ctx() -> TaskContext {
        TaskContext::new(Settings::with_root("/tmp/project"))
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut registry = Registry::new();
        registry.register("build", ok("a")).unwrap();

        let err = registry.register("build", ok("b")).unwrap_err();
        assert_eq!(err.code, ErrorCode::RegistryDuplicateName);
        assert_eq!(registry.get("build").unwrap().node.task_names(), vec!["a"]);
    }

    #[test]
    fn empty_name_rejected() {
        let mut registry = Registry::new();
        let err = registry.register("  ", ok("a")).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationInvalidArgument);
    }

    #[test]
    fn anonymous_root_takes_pipeline_name() {
        let mut registry = Registry::new();
        registry.register("build", series(vec![ok("a")])).unwrap();
        assert_eq!(registry.get("build").unwrap().node.label(), "build");
    }

    #[test]
    fn resolve_falls_back_to_default() {
        let mut registry = Registry::new();
        registry.register("build", ok("a")).unwrap();
        registry.register("test", ok("b")).unwrap();
        registry.set_default("build").unwrap();

        assert_eq!(registry.resolve(None).unwrap().name, "build");
        assert_eq!(registry.resolve(Some("test")).unwrap().name, "test");
    }

    #[test]
    fn resolve_without_default_is_an_error() {
        let mut registry = Registry::new();
        registry.register("build", ok("a")).unwrap();
        assert!(registry.resolve(None).is_err());
    }

    #[test]
    fn unknown_pipeline_reports_available_names() {
        let mut registry = Registry::new();
        registry.register("build", ok("a")).unwrap();

        let err = registry.run("bild", &ctx()).unwrap_err();
        assert_eq!(err.code, ErrorCode::PipelineNotFound);
        assert_eq!(err.details["available"][0], "build");
    }

    #[test]
    fn set_default_requires_registered_name() {
        let mut registry = Registry::new();
        assert!(registry.set_default("missing").is_err());
    }

    #[test]
    fn describe_is_sorted_and_marks_default() {
        let mut registry = Registry::new();
        registry
            .register_with_description("test", "Run tests", series(vec![ok("a"), ok("b")]))
            .unwrap();
        registry.register("build", ok("c")).unwrap();
        registry.set_default("test").unwrap();

        let summaries = registry.describe();
        assert_eq!(summaries[0].name, "build");
        assert!(!summaries[0].default);
        assert_eq!(summaries[1].tasks, 2);
        assert!(summaries[1].default);
        assert_eq!(summaries[1].description.as_deref(), Some("Run tests"));
    }

    #[test]
    fn run_executes_registered_tree() {
        let mut registry = Registry::new();
        registry.register("ok", series(vec![ok("a")])).unwrap();
        registry
            .register("fails", Node::from_fn("boom", |_| Err(crate::Error::other("x"))))
            .unwrap();

        assert!(registry.run("ok", &ctx()).unwrap().is_success());
        assert!(!registry.run("fails", &ctx()).unwrap().is_success());
    }
}
