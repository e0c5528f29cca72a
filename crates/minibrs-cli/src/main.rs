mod cli;
mod commands;
mod shell;

use std::io::{self, Write};

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use minibrs_core::{AppConfig, ExitCode, MinibrsError};

use cli::{Cli, Commands};
use commands::{Context, error_envelope, execute};

fn main() {
    let cli = Cli::parse();
    let json_output = json_requested(cli.json, std::env::var("MINIBRS_JSON").ok().as_deref());

    if let Err(e) = run(cli, json_output) {
        let code = e
            .downcast_ref::<MinibrsError>()
            .map(MinibrsError::exit_code)
            .unwrap_or(ExitCode::GeneralError);

        if json_output {
            match serde_json::to_string_pretty(&error_envelope(&e)) {
                Ok(body) => println!("{body}"),
                Err(_) => eprintln!("Error: {e}"),
            }
        } else {
            eprintln!("Error: {e}");
        }
        std::process::exit(code as i32);
    }
}

/// `--json`, or `MINIBRS_JSON=1`.
fn json_requested(flag: bool, env: Option<&str>) -> bool {
    flag || env == Some("1")
}

fn run(cli: Cli, json_output: bool) -> Result<()> {
    // Command output owns stdout; logs stay quiet unless asked for.
    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(io::stderr)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::config_path);
    let mut config = AppConfig::load_from(&config_path)?;
    config.apply_env_overrides()?;
    if let Some(backend) = cli.backend {
        config.database.backend = backend;
    }

    let mut ctx = Context::new(config, config_path, json_output);
    match cli.command {
        None | Some(Commands::Shell) => shell::run(&mut ctx),
        Some(command) => {
            let mut stdout = io::stdout().lock();
            execute(command, &mut ctx, &mut stdout)?;
            stdout.flush()?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_output_switch() {
        assert!(json_requested(true, None));
        assert!(json_requested(false, Some("1")));
        assert!(!json_requested(false, Some("0")));
        assert!(!json_requested(false, Some("true")));
        assert!(!json_requested(false, None));
    }
}
