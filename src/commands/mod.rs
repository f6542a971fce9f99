use std::path::PathBuf;

use morphir_build::pipelines;
use morphir_build::settings::Settings;
use morphir_build::{Error, Registry, TaskContext};

pub type CmdResult<T> = morphir_build::Result<(T, i32)>;

/// Options shared by every command.
pub(crate) struct GlobalArgs {
    pub root: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

impl GlobalArgs {
    fn project_root(&self) -> morphir_build::Result<PathBuf> {
        match &self.root {
            Some(root) if root.is_dir() => Ok(root.clone()),
            Some(root) => Err(Error::validation_invalid_argument(
                "root",
                format!("Project root '{}' is not a directory", root.display()),
                Some(root.display().to_string()),
                None,
            )),
            None => std::env::current_dir().map_err(|e| {
                Error::internal_io(e.to_string(), Some("resolve current directory".to_string()))
            }),
        }
    }

    /// Settings and registry for the selected project.
    pub(crate) fn load(&self) -> morphir_build::Result<(TaskContext, Registry)> {
        let root = self.project_root()?;
        let settings = Settings::load(&root, self.config.as_deref())?;
        tracing::debug!(root = %settings.root.display(), "Loaded settings");
        Ok((TaskContext::new(settings), pipelines::registry()?))
    }
}

pub mod list;
pub mod run;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(cli: crate::Cli) -> (morphir_build::Result<serde_json::Value>, i32) {
    let global = GlobalArgs {
        root: cli.root,
        config: cli.config,
    };

    if cli.list {
        return dispatch!(list::ListArgs {}, &global, list);
    }

    let args = run::RunArgs {
        pipeline: cli.pipeline,
        dry_run: cli.dry_run,
    };
    dispatch!(args, &global, run)
}
