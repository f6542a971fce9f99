use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod output;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const LOG_ENV: &str = "MORPHIR_BUILD_LOG";
const DEFAULT_LOG_FILTER: &str = "morphir_build=info";

#[derive(Parser)]
#[command(name = "morphir-build")]
#[command(version = VERSION)]
#[command(about = "Build and test pipelines for the Morphir toolchain")]
struct Cli {
    /// Pipeline to run (defaults to `default`)
    pipeline: Option<String>,

    /// List registered pipelines with their task trees
    #[arg(long, conflicts_with_all = ["pipeline", "dry_run"])]
    list: bool,

    /// Project root; relative pipeline paths resolve against it
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Settings file (defaults to <root>/morphir-build.json when present)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the selected pipeline's tree without running it
    #[arg(long)]
    dry_run: bool,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn main() -> std::process::ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let (json_result, exit_code) = commands::run_json(cli);
    if let Err(err) = output::print_json_result(json_result) {
        tracing::error!("{}", err);
        return std::process::ExitCode::from(1);
    }

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_argument_is_optional() {
        let cli = Cli::try_parse_from(["morphir-build"]).unwrap();
        assert!(cli.pipeline.is_none());
        assert!(!cli.list);

        let cli = Cli::try_parse_from(["morphir-build", "test", "--root", "/work"]).unwrap();
        assert_eq!(cli.pipeline.as_deref(), Some("test"));
        assert_eq!(cli.root, Some(PathBuf::from("/work")));
    }

    #[test]
    fn list_conflicts_with_pipeline() {
        assert!(Cli::try_parse_from(["morphir-build", "build", "--list"]).is_err());
    }

    #[test]
    fn exit_codes_are_clamped() {
        assert_eq!(exit_code_to_u8(-1), 0);
        assert_eq!(exit_code_to_u8(3), 3);
        assert_eq!(exit_code_to_u8(300), 255);
    }
}
