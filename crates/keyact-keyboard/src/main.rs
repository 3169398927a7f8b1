//! Keyact - scripted keyboard session.
//!
//! Loads the config, starts the background runtime, registers the built-in
//! actions and runs a script of keyboard commands, printing JSON output.
//!
//! Usage: `keyact [--config <path>] [script]` (the script defaults to stdin).

use std::io::Read;
use std::path::PathBuf;

use keyact_core::{load_config, load_config_from, KeyboardConfig};
use keyact_keyboard::Session;
use keyact_runtime::ScopeRuntime;
use tracing_subscriber::EnvFilter;

// =============================================================================
// Arguments
// =============================================================================

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    script: Option<PathBuf>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args::default();
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter.next().ok_or("--config needs a path")?;
                args.config = Some(PathBuf::from(path));
            }
            _ if args.script.is_none() => args.script = Some(PathBuf::from(arg)),
            _ => return Err(format!("Unexpected argument: {}", arg)),
        }
    }
    Ok(args)
}

fn read_script(path: Option<&PathBuf>) -> Result<String, String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e)),
        None => {
            let mut script = String::new();
            std::io::stdin()
                .read_to_string(&mut script)
                .map_err(|e| format!("Failed to read stdin: {}", e))?;
            Ok(script)
        }
    }
}

// =============================================================================
// Entry Point
// =============================================================================

fn run(args: Args, config: KeyboardConfig) -> Result<(), String> {
    let script = read_script(args.script.as_ref())?;

    let mut runtime =
        ScopeRuntime::start(config.runtime.worker_threads).map_err(|e| e.to_string())?;
    let session = Session::new(config, runtime.scope().clone()).map_err(|e| e.to_string())?;

    let output = runtime
        .block_on(session.run_script(&script))
        .map_err(|e| e.to_string())?;
    for value in output {
        println!("{}", value);
    }

    session.shutdown();
    runtime.shutdown();
    Ok(())
}

fn main() {
    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    // Config comes first: it holds the default log filter
    let (config, config_error) = match &args.config {
        Some(path) => load_config_from(path),
        None => load_config(),
    }
    .map_or_else(|e| (KeyboardConfig::default(), Some(e)), |c| (c, None));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .init();

    if let Some(e) = config_error {
        tracing::warn!("Config error: {} - using defaults", e);
    }
    tracing::info!("Keyact starting...");

    if let Err(e) = run(args, config) {
        tracing::error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
