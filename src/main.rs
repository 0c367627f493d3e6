//! Viewer entry point
//!
//! Parses the command line, routes logging into the session log file the
//! log panel tails, and starts the application.

use std::fs::File;
use std::path::PathBuf;

use log::warn;

use vesalius::{VesaliusApp, ViewerConfig};

fn main() -> anyhow::Result<()> {
    let mut config = parse_args(std::env::args().skip(1))?;
    config.log_file = init_logging();

    let app = VesaliusApp::new(config)?;
    app.run();
    Ok(())
}

fn parse_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<ViewerConfig> {
    let mut data_dir = PathBuf::from("data");
    let mut partof_root = None;
    let mut isa_root = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--partof-root" => {
                partof_root = Some(args.next().ok_or_else(|| {
                    anyhow::anyhow!("--partof-root needs a concept id")
                })?)
            }
            "--isa-root" => {
                isa_root = Some(
                    args.next()
                        .ok_or_else(|| anyhow::anyhow!("--isa-root needs a concept id"))?,
                )
            }
            "--help" | "-h" => {
                println!("usage: vesalius [DATA_DIR] [--partof-root ID] [--isa-root ID]");
                std::process::exit(0);
            }
            other => data_dir = PathBuf::from(other),
        }
    }

    let mut config = ViewerConfig::new(data_dir);
    if let Some(root) = partof_root {
        config.partof_root = root;
    }
    if let Some(root) = isa_root {
        config.isa_root = root;
    }
    Ok(config)
}

/// Sends log output to a session file so the in-app log panel can tail
/// it; falls back to stderr when the file cannot be created.
fn init_logging() -> Option<PathBuf> {
    let path = std::env::temp_dir().join("vesalius-session.log");
    match File::create(&path) {
        Ok(file) => {
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
                .target(env_logger::Target::Pipe(Box::new(file)))
                .init();
            Some(path)
        }
        Err(err) => {
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
                .init();
            warn!("session log unavailable at {}: {err}", path.display());
            None
        }
    }
}
