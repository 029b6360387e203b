use std::env;
use std::path::PathBuf;

use deck_bridge::{run_bridge, BridgeState, ServeError, DEFAULT_BIND};
use deck_store::{StoreError, TaskStore};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliArgs {
    workspace: PathBuf,
    bind: String,
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
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Serve(#[from] ServeError),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("deck-bridge failed: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), MainError> {
    let mut argv = env::args();
    let program = argv.next().unwrap_or_else(|| "deck-bridge".to_string());
    let command = parse_cli_args(argv.collect::<Vec<_>>(), &program)?;
    let CliCommand::Run(args) = command else {
        let CliCommand::Help(text) = command else {
            unreachable!();
        };
        println!("{text}");
        return Ok(());
    };

    let store = TaskStore::open(&args.workspace)?;
    run_bridge(&args.bind, BridgeState::new(store)).await?;
    Ok(())
}

fn parse_cli_args(args: Vec<String>, program: &str) -> Result<CliCommand, MainError> {
    let mut parsed = CliArgs {
        workspace: PathBuf::from("."),
        bind: DEFAULT_BIND.to_string(),
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
            "--bind" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| MainError::Args("missing value for --bind".to_string()))?;
                if value.trim().is_empty() {
                    return Err(MainError::Args("bind address must not be empty".to_string()));
                }
                parsed.bind = value.trim().to_string();
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
        "Usage: {program} [--workspace <path>] [--bind <ip:port>]\n\
Defaults:\n\
  --workspace .\n\
  --bind {DEFAULT_BIND} (port 0 = OS-assigned, published via the port file)"
    )
}
