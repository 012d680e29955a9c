//! Challenge-response remote attestation client.
//!
//! This crate implements the relying-party side of the two-step
//! challenge-response verification protocol:
//!
//! - Session negotiation (`POST newSession?nonceSize=32`, read `Location`)
//! - Evidence submission with the declared media type
//! - Size-exact accumulation of the attestation result
//! - A pluggable [`Transport`] seam, reqwest-backed by default
//!
//! # Quick Start
//!
//! ```no_run
//! use attest_client::{ChallengeResponseClient, ClientConfig, PSA_TOKEN_MEDIA_TYPE};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ClientConfig::from_env();
//! let client = ChallengeResponseClient::new(&config)?;
//! let endpoint = config.endpoint()?;
//!
//! let token = std::fs::read("psa-token.cbor")?;
//! let result = client
//!     .submit_evidence(&token, PSA_TOKEN_MEDIA_TYPE, endpoint.as_str())
//!     .await?;
//! println!("{} bytes: {}", result.size(), result);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `ATTEST_ADDRESS` | Service address (default: `127.0.0.1`) |
//! | `ATTEST_PORT` | Service port (default: `8080`) |
//! | `ATTEST_TIMEOUT` | Request timeout in seconds (default: 30) |
//! | `ATTEST_STRICT_STATUS` | Treat non-2xx responses as errors |
//! | `ATTEST_MAX_RESULT_BYTES` | Ceiling on the accumulated result |

pub mod buffer;
pub mod client;
pub mod endpoint;
pub mod error;
pub mod types;

// Re-export main types
pub use buffer::ResponseBuffer;
pub use client::{
    ChallengeResponseClient, HttpRequest, ReqwestTransport, ResponseHead, Transport,
    SERVICE_HOST, SESSION_MEDIA_TYPE,
};
pub use endpoint::{join_session_url, Endpoint, API_PREFIX, DEFAULT_PORT, NONCE_SIZE};
pub use error::{exit_codes, AttestError, AttestResult, Step};
pub use types::{
    AttestationResult, ClientConfig, Evidence, Session, StatusPolicy, PSA_TOKEN_MEDIA_TYPE,
};
