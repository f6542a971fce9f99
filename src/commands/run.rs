use serde::Serialize;
use serde_json::Value;

use morphir_build::engine::RunReport;
use morphir_build::{Error, Outcome};

use super::{CmdResult, GlobalArgs};

pub struct RunArgs {
    pub pipeline: Option<String>,
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RunOutput {
    DryRun {
        pipeline: String,
        tasks: Vec<String>,
        tree: String,
    },
    Run(RunReport),
}

pub fn run(args: RunArgs, global: &GlobalArgs) -> CmdResult<RunOutput> {
    let (ctx, registry) = global.load()?;

    if args.dry_run {
        let pipeline = registry.resolve(args.pipeline.as_deref())?;
        return Ok((
            RunOutput::DryRun {
                pipeline: pipeline.name.clone(),
                tasks: pipeline.node.task_names(),
                tree: pipeline.node.render(),
            },
            0,
        ));
    }

    let (outcome, report) = registry.run_reported(args.pipeline.as_deref(), &ctx)?;
    match outcome {
        Outcome::Success => Ok((RunOutput::Run(report), 0)),
        Outcome::Failure(failure) => {
            for leaf in failure.leaves() {
                tracing::error!(
                    task = %leaf.task,
                    path = %leaf.path.join(" > "),
                    code = %leaf.code,
                    "{}",
                    leaf.message
                );
            }
            Err(attach_report(failure.to_error(), &report))
        }
    }
}

/// Carry the run report in the error details so the envelope still has it.
fn attach_report(mut err: Error, report: &RunReport) -> Error {
    if let (Value::Object(details), Ok(report)) = (&mut err.details, serde_json::to_value(report)) {
        details.insert("report".to_string(), report);
    }
    err
}
