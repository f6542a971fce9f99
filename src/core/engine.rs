//! Runs composition trees.
//!
//! - `Series` runs children in order and stops at the first failure
//! - `Parallel` runs every child on its own scoped thread, never cancels
//!   siblings, and aggregates all failures
//! - `Scoped` owns a scratch directory for the lifetime of its child
//!
//! Nothing here retries; retry policy belongs to the leaf.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Error, FailedTaskDetails};
use crate::node::Node;
use crate::outcome::{Failure, Outcome};
use crate::task::{Task, TaskContext};

/// Run a node to its terminal outcome.
pub fn run(node: &Node, ctx: &TaskContext) -> Outcome {
    Execution::default().run_node(node, ctx)
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub pipeline: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub status: RunStatus,
    pub tasks_total: usize,
    pub tasks_started: usize,
    pub tasks_failed: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FailedTaskDetails>,
}

/// Run a node and summarise the run for reporting.
pub fn run_reported(pipeline: &str, node: &Node, ctx: &TaskContext) -> (Outcome, RunReport) {
    let run_id = uuid::Uuid::new_v4().to_string();
    let started_at = Utc::now();
    let clock = Instant::now();

    let span = tracing::info_span!("pipeline", pipeline = pipeline, run_id = %run_id);
    let _enter = span.enter();
    crate::log_status!("run", "Running pipeline '{}' ({} tasks)", pipeline, node.leaf_count());

    let execution = Execution::default();
    let outcome = execution.run_node(node, ctx);

    let (status, failures) = match &outcome {
        Outcome::Success => (RunStatus::Success, Vec::new()),
        Outcome::Failure(failure) => (RunStatus::Failed, failure.leaves()),
    };

    let report = RunReport {
        run_id,
        pipeline: pipeline.to_string(),
        started_at,
        duration_ms: clock.elapsed().as_millis() as u64,
        status,
        tasks_total: node.leaf_count(),
        tasks_started: execution.started.load(Ordering::SeqCst),
        tasks_failed: execution.failed.load(Ordering::SeqCst),
        failures,
    };

    match &outcome {
        Outcome::Success => crate::log_status!(
            "run",
            "Pipeline '{}' succeeded in {}ms",
            pipeline,
            report.duration_ms
        ),
        Outcome::Failure(failure) => tracing::error!("Pipeline '{}' failed: {}", pipeline, failure),
    }

    (outcome, report)
}

#[derive(Default)]
struct Execution {
    started: AtomicUsize,
    failed: AtomicUsize,
}

impl Execution {
    fn run_node(&self, node: &Node, ctx: &TaskContext) -> Outcome {
        match node {
            Node::Leaf(task) => self.run_leaf(task.as_ref(), ctx),
            Node::Series { children, .. } => self.run_series(node.label(), children, ctx),
            Node::Parallel { children, .. } => self.run_parallel(node.label(), children, ctx),
            Node::Scoped { prefix, child, .. } => {
                self.run_scoped(node.label(), prefix, child, ctx)
            }
        }
    }

    fn run_leaf(&self, task: &dyn Task, ctx: &TaskContext) -> Outcome {
        let name = task.name();
        self.started.fetch_add(1, Ordering::SeqCst);
        tracing::info!(task = name, "Starting");
        let clock = Instant::now();

        let result = panic::catch_unwind(AssertUnwindSafe(|| task.run(ctx))).unwrap_or_else(
            |payload| {
                Err(Error::internal_unexpected(format!(
                    "Task panicked: {}",
                    panic_message(&*payload)
                )))
            },
        );

        let elapsed_ms = clock.elapsed().as_millis() as u64;
        match result {
            Ok(()) => {
                tracing::info!(task = name, elapsed_ms, "Finished");
                Outcome::Success
            }
            Err(err) => {
                self.failed.fetch_add(1, Ordering::SeqCst);
                tracing::error!(task = name, elapsed_ms, code = err.code.as_str(), "Failed: {}", err);
                Outcome::Failure(Failure::leaf(name, err))
            }
        }
    }

    fn run_series(&self, label: String, children: &[Node], ctx: &TaskContext) -> Outcome {
        let span = tracing::debug_span!("series", node = %label);
        let _enter = span.enter();

        for (index, child) in children.iter().enumerate() {
            if let Outcome::Failure(failure) = self.run_node(child, ctx) {
                let not_started = children.len() - index - 1;
                if not_started > 0 {
                    tracing::warn!(
                        not_started,
                        "Stopping '{}' after '{}' failed",
                        label,
                        failure.node()
                    );
                }
                return Outcome::Failure(Failure::Series {
                    node: label,
                    child: Box::new(failure),
                });
            }
        }

        Outcome::Success
    }

    fn run_parallel(&self, label: String, children: &[Node], ctx: &TaskContext) -> Outcome {
        let span = tracing::debug_span!("parallel", node = %label);
        let _enter = span.enter();

        let outcomes: Vec<Outcome> = if children.len() <= 1 {
            children
                .iter()
                .map(|child| self.run_node(child, ctx))
                .collect()
        } else {
            thread::scope(|scope| {
                let handles: Vec<_> = children
                    .iter()
                    .map(|child| {
                        let span = span.clone();
                        scope.spawn(move || {
                            let _enter = span.enter();
                            self.run_node(child, ctx)
                        })
                    })
                    .collect();

                handles
                    .into_iter()
                    .zip(children)
                    .map(|(handle, child)| {
                        handle.join().unwrap_or_else(|payload| {
                            Outcome::Failure(Failure::leaf(
                                child.label(),
                                Error::internal_unexpected(format!(
                                    "Worker thread panicked: {}",
                                    panic_message(&*payload)
                                )),
                            ))
                        })
                    })
                    .collect()
            })
        };

        let failures: Vec<Failure> = outcomes
            .into_iter()
            .filter_map(|outcome| match outcome {
                Outcome::Success => None,
                Outcome::Failure(failure) => Some(failure),
            })
            .collect();

        if failures.is_empty() {
            Outcome::Success
        } else {
            Outcome::Failure(Failure::Parallel {
                node: label,
                failures,
            })
        }
    }

    fn run_scoped(&self, label: String, prefix: &str, child: &Node, ctx: &TaskContext) -> Outcome {
        let scratch = match tempfile::Builder::new()
            .prefix(&format!("{}-", prefix))
            .tempdir()
        {
            Ok(dir) => dir,
            Err(e) => {
                let err = Error::internal_io(e.to_string(), Some("create scratch directory".to_string()));
                return Outcome::Failure(Failure::leaf(label, err));
            }
        };

        let path = scratch.path().to_path_buf();
        tracing::debug!(path = %path.display(), "Created scratch directory");

        let outcome = self.run_node(child, &ctx.with_scratch(path.clone()));

        match (scratch.close(), outcome) {
            (Ok(()), outcome) => {
                tracing::debug!(path = %path.display(), "Removed scratch directory");
                outcome
            }
            (Err(e), Outcome::Success) => {
                let err = Error::internal_io(
                    e.to_string(),
                    Some(format!("remove scratch directory {}", path.display())),
                );
                Outcome::Failure(Failure::leaf(label, err))
            }
            (Err(e), failed) => {
                tracing::warn!("Failed to remove scratch directory {}: {}", path.display(), e);
                failed
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
