use std::env;
use std::path::PathBuf;

use deck_gateway::{BridgeClient, GatewayServer};
use deck_store::WorkspacePaths;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliArgs {
    workspace: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CliCommand {
    Run(CliArgs),
    Help(String),
}

#[derive(Debug, thiserror::Error)]
enum MainError {
    #[error("{0}")]
    Args(String),
    #[error("stdio error: {0}")]
    Stdio(#[from] std::io::Error),
}

fn main() {
    // Stdout carries the protocol; diagnostics go to stderr only.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run() {
        eprintln!("deck-gateway failed: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), MainError> {
    let mut argv = env::args();
    let program = argv.next().unwrap_or_else(|| "deck-gateway".to_string());
    let command = parse_cli_args(argv.collect::<Vec<_>>(), &program)?;
    let CliCommand::Run(args) = command else {
        let CliCommand::Help(text) = command else {
            unreachable!();
        };
        println!("{text}");
        return Ok(());
    };

    // The bridge's port is resolved per tool call, not here, so the
    // protocol loop starts even when no bridge is running yet.
    let paths = WorkspacePaths::new(&args.workspace);
    tracing::info!(workspace = %args.workspace.display(), "serving tools over stdio");

    let mut server = GatewayServer::new(BridgeClient::for_workspace(paths));
    server.run_stdio()?;
    Ok(())
}

fn parse_cli_args(args: Vec<String>, program: &str) -> Result<CliCommand, MainError> {
    let mut parsed = CliArgs {
        workspace: PathBuf::from("."),
    };

    let mut idx = 0usize;
    while idx < args.len() {
        let arg = &args[idx];
        match arg.as_str() {
            "--help" | "-h" => return Ok(CliCommand::Help(usage(program))),
            "--workspace" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| MainError::Args("missing value for --workspace".to_string()))?;
                parsed.workspace = PathBuf::from(value);
            }
            other => {
                return Err(MainError::Args(format!(
                    "unknown argument: {other}\n\n{}",
                    usage(program)
                )));
            }
        }
        idx += 1;
    }

    Ok(CliCommand::Run(parsed))
}

fn usage(program: &str) -> String {
    format!(
        "Usage: {program} [--workspace <path>]\n\
Defaults:\n\
  --workspace .\n\
Serves tools over stdin/stdout, locating the bridge through the\n\
workspace's port file on each call."
    )
}
