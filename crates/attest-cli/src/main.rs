use std::io::Write;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use attest_client::{ChallengeResponseClient, ClientConfig, Endpoint, StatusPolicy};

mod args;
pub mod exit_codes;
mod token;

use args::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = match run(cli).await {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            exit_codes::for_error(&e)
        }
    };
    std::process::exit(code);
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("attest_client=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ClientConfig::default()
        .with_address(cli.address.as_str())
        .with_port(cli.port)
        .with_timeout_secs(cli.timeout)
        .with_status_policy(if cli.strict_status {
            StatusPolicy::Strict
        } else {
            StatusPolicy::Lenient
        });
    let config = match cli.max_result_bytes {
        Some(limit) => config.with_max_result_bytes(limit),
        None => config,
    };

    let endpoint = match &cli.base_url {
        Some(url) => Endpoint::parse(url)?,
        None => config.endpoint()?,
    };

    let token = token::read_token(&cli.token, cli.max_token_bytes)?;
    tracing::debug!(
        path = %cli.token.display(),
        bytes = token.len(),
        endpoint = %endpoint,
        "loaded token"
    );

    let client = ChallengeResponseClient::new(&config)?;
    let result = client
        .submit_evidence(&token, &cli.media_type, endpoint.as_str())
        .await?;

    let mut stdout = std::io::stdout().lock();
    let write = |out: &mut std::io::StdoutLock<'_>| -> std::io::Result<()> {
        out.write_all(result.bytes())?;
        out.write_all(b"\n")?;
        out.flush()
    };
    write(&mut stdout).context("failed to write attestation result")?;

    Ok(())
}
