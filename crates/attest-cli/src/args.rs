use clap::builder::BoolishValueParser;
use clap::Parser;
use std::path::PathBuf;

use attest_client::{DEFAULT_PORT, PSA_TOKEN_MEDIA_TYPE};

/// Token size bound of the reference client's read buffer.
pub const DEFAULT_MAX_TOKEN_BYTES: u64 = 1024;

#[derive(Parser, Debug)]
#[command(
    name = "attest",
    version,
    about = "Submit an attestation token to a challenge-response verification service"
)]
pub struct Cli {
    /// Address of the verification service
    #[arg(short = 'l', long, env = "ATTEST_ADDRESS", default_value = "127.0.0.1")]
    pub address: String,

    /// Port of the verification service
    #[arg(short, long, env = "ATTEST_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Full base URL (overrides --address/--port), must end with '/'
    #[arg(long, env = "ATTEST_BASE_URL")]
    pub base_url: Option<String>,

    /// Path to the token to be verified
    #[arg(short, long)]
    pub token: PathBuf,

    /// Media type of the token
    #[arg(short, long, env = "ATTEST_MEDIA_TYPE", default_value = PSA_TOKEN_MEDIA_TYPE)]
    pub media_type: String,

    /// Per-request timeout in seconds
    #[arg(long, env = "ATTEST_TIMEOUT", default_value_t = 30)]
    pub timeout: u64,

    /// Treat non-2xx responses as errors
    #[arg(long, env = "ATTEST_STRICT_STATUS", value_parser = BoolishValueParser::new())]
    pub strict_status: bool,

    /// Reject attestation results larger than this many bytes
    #[arg(long, env = "ATTEST_MAX_RESULT_BYTES")]
    pub max_result_bytes: Option<usize>,

    /// Reject token files larger than this many bytes
    #[arg(long, default_value_t = DEFAULT_MAX_TOKEN_BYTES)]
    pub max_token_bytes: u64,

    /// Log protocol steps to stderr (same as RUST_LOG=attest_client=debug)
    #[arg(short, long)]
    pub verbose: bool,
}
