mod cli;
mod commands;
mod output;

use clap::Parser;
use gshell_credentials::CredentialError;
use std::process::ExitCode;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

use cli::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match commands::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(exit_status(&e))
        }
    }
}

/// Logs go to stderr so `--format json` output stays parseable.
fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Credential errors exit with their stable code, anything else with 1.
fn exit_status(e: &anyhow::Error) -> u8 {
    e.chain()
        .find_map(|cause| cause.downcast_ref::<CredentialError>())
        .and_then(|err| u8::try_from(err.code().code()).ok())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_status_uses_error_code() {
        let err = anyhow::Error::from(CredentialError::NoDomainConfigured);
        assert_eq!(exit_status(&err), 11);

        let wrapped = anyhow::Error::from(CredentialError::DomainNotFound("x".into()))
            .context("while listing");
        assert_eq!(exit_status(&wrapped), 10);

        assert_eq!(exit_status(&anyhow::anyhow!("other")), 1);
    }
}
