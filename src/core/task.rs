//! Leaf tasks and the context they run in.
//!
//! Every leaf conforms to one capability: [`Task::run`] returns `Ok(())` on
//! success or an [`Error`] describing why the wrapped effect failed. The
//! adapters below normalise the other shapes a task body can take:
//!
//! - [`from_fn`] - a body that already returns `Result<()>`
//! - [`effect`] - a void body; reports success unless it panics
//! - [`callback`] - a body that signals completion through a [`Completion`]
//! - [`future`] - a body that returns a future of `Result<()>`

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::settings::Settings;

pub trait Task: Send + Sync {
    fn name(&self) -> &str;
    fn run(&self, ctx: &TaskContext) -> Result<()>;
}

/// Execution context handed to every leaf.
///
/// Cloning is cheap; `Scoped` nodes hand their children a clone with the
/// scratch directory set.
#[derive(Debug, Clone)]
pub struct TaskContext {
    settings: Arc<Settings>,
    scratch: Option<PathBuf>,
}

impl TaskContext {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Arc::new(settings),
            scratch: None,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Project root all relative pipeline paths resolve against.
    pub fn root(&self) -> &Path {
        &self.settings.root
    }

    /// Resolve a path relative to the project root.
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.settings.root.join(relative)
    }

    /// Scratch directory of the nearest enclosing `Scoped` node.
    pub fn scratch_dir(&self) -> Result<&Path> {
        self.scratch.as_deref().ok_or_else(|| {
            Error::internal_unexpected("Task requires a scratch directory but none is in scope")
        })
    }

    pub(crate) fn with_scratch(&self, dir: PathBuf) -> Self {
        Self {
            settings: Arc::clone(&self.settings),
            scratch: Some(dir),
        }
    }
}

pub struct FnTask<F> {
    name: String,
    body: F,
}

impl<F> Task for FnTask<F>
where
    F: Fn(&TaskContext) -> Result<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, ctx: &TaskContext) -> Result<()> {
        (self.body)(ctx)
    }
}

pub fn from_fn<F>(name: impl Into<String>, body: F) -> FnTask<F>
where
    F: Fn(&TaskContext) -> Result<()> + Send + Sync,
{
    FnTask {
        name: name.into(),
        body,
    }
}

pub struct EffectTask<F> {
    name: String,
    body: F,
}

impl<F> Task for EffectTask<F>
where
    F: Fn(&TaskContext) + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    // Panics are turned into failures by the engine.
    fn run(&self, ctx: &TaskContext) -> Result<()> {
        (self.body)(ctx);
        Ok(())
    }
}

pub fn effect<F>(name: impl Into<String>, body: F) -> EffectTask<F>
where
    F: Fn(&TaskContext) + Send + Sync,
{
    EffectTask {
        name: name.into(),
        body,
    }
}

/// One-shot completion handle passed to callback-style tasks.
///
/// Signalling consumes the handle, so a task can complete at most once.
/// Dropping it without signalling counts as a failure.
pub struct Completion {
    tx: mpsc::Sender<Result<()>>,
}

impl Completion {
    pub fn success(self) {
        self.finish(Ok(()));
    }

    pub fn fail(self, err: Error) {
        self.finish(Err(err));
    }

    pub fn finish(self, result: Result<()>) {
        // The receiver outlives every handle the task can hold.
        let _ = self.tx.send(result);
    }
}

pub struct CallbackTask<F> {
    name: String,
    body: F,
}

impl<F> Task for CallbackTask<F>
where
    F: Fn(&TaskContext, Completion) + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, ctx: &TaskContext) -> Result<()> {
        let (tx, rx) = mpsc::channel();
        (self.body)(ctx, Completion { tx });
        rx.recv().unwrap_or_else(|_| {
            Err(Error::internal_unexpected(format!(
                "Task '{}' dropped its completion handle without signalling",
                self.name
            )))
        })
    }
}

pub fn callback<F>(name: impl Into<String>, body: F) -> CallbackTask<F>
where
    F: Fn(&TaskContext, Completion) + Send + Sync,
{
    CallbackTask {
        name: name.into(),
        body,
    }
}

pub struct FutureTask<F> {
    name: String,
    body: F,
}

impl<F, Fut> Task for FutureTask<F>
where
    F: Fn(&TaskContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>>,
{
    fn name(&self) -> &str {
        &self.name
    }

    // Driven on the worker thread that runs the leaf.
    fn run(&self, ctx: &TaskContext) -> Result<()> {
        futures::executor::block_on((self.body)(ctx))
    }
}

pub fn future<F, Fut>(name: impl Into<String>, body: F) -> FutureTask<F>
where
    F: Fn(&TaskContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>>,
{
    FutureTask {
        name: name.into(),
        body,
    }
}
