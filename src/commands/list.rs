use serde::Serialize;

use morphir_build::registry::PipelineSummary;

use super::{CmdResult, GlobalArgs};

pub struct ListArgs {}

#[derive(Debug, Serialize)]
pub struct ListOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    pub pipelines: Vec<PipelineSummary>,
}

pub fn run(_args: ListArgs, global: &GlobalArgs) -> CmdResult<ListOutput> {
    let (_, registry) = global.load()?;
    Ok((
        ListOutput {
            default: registry.default_name().map(str::to_string),
            pipelines: registry.describe(),
        },
        0,
    ))
}
