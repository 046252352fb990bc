use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use rosterd::config::Config;
use rosterd::ipc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Student roster sidecar: one JSON request per stdin line, one JSON
/// response per stdout line.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// JSON config file.
    #[arg(long, env = "ROSTERD_CONFIG")]
    config: Option<PathBuf>,
    /// Open this data directory at startup (overrides the config).
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(dir) = args.data_dir {
        config.data_dir = Some(dir);
    }

    // stdout is the IPC channel; logs go to stderr.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let mut state = ipc::AppState::new(config);
    if let Some(dir) = state.config.data_dir.clone() {
        // A store that fails to load must not be served as if it were empty.
        let report = state
            .open(&dir)
            .with_context(|| format!("startup load failed for {}", dir.to_string_lossy()))?;
        info!(source = report.source.as_str(), records = report.records, "store ready");
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                error!("stdin read failed: {e}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                let resp = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{resp}");
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }

    state.close()
}
