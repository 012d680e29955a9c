//! Protocol data types and client configuration.

use std::fmt;

use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};

use crate::endpoint::{Endpoint, DEFAULT_PORT, NONCE_SIZE};
use crate::error::{AttestError, AttestResult};

/// Media type of the reference PSA attestation token.
pub const PSA_TOKEN_MEDIA_TYPE: &str = "application/psa-attestation-token";

/// Attestation token to verify, borrowed from the caller.
#[derive(Debug, Clone, Copy)]
pub struct Evidence<'a> {
    bytes: &'a [u8],
    media_type: &'a str,
}

impl<'a> Evidence<'a> {
    /// Validate and wrap evidence bytes with their declared media type.
    ///
    /// Rejects empty payloads and media types that are not `type/subtype`
    /// or cannot travel as a header value.
    pub fn new(bytes: &'a [u8], media_type: &'a str) -> AttestResult<Self> {
        if bytes.is_empty() {
            return Err(AttestError::input("empty evidence payload"));
        }

        let trimmed = media_type.trim();
        let well_formed = match trimmed.split_once('/') {
            Some((kind, sub)) => !kind.is_empty() && !sub.is_empty(),
            None => false,
        };
        if !well_formed || trimmed.len() != media_type.len() {
            return Err(AttestError::input(format!(
                "malformed media type: {media_type:?}"
            )));
        }
        if HeaderValue::from_str(media_type).is_err() {
            return Err(AttestError::input(format!(
                "media type is not a valid header value: {media_type:?}"
            )));
        }

        Ok(Self { bytes, media_type })
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn media_type(&self) -> &'a str {
        self.media_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Outcome of session negotiation.
#[derive(Debug, Clone)]
pub struct Session {
    /// Nonce size requested from the service.
    pub nonce_size: u32,

    /// `Location` header value, verbatim.
    pub location: String,

    /// HTTP status of the negotiation response.
    pub status: u16,

    /// Raw negotiation response body (the session document).
    pub document: Vec<u8>,
}

impl Session {
    pub(crate) fn new(location: String, status: u16, document: Vec<u8>) -> Self {
        Self {
            nonce_size: NONCE_SIZE,
            location,
            status,
            document,
        }
    }
}

/// Attestation result returned by the verification service.
///
/// The bytes are size-exact; no terminator is stored or counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationResult {
    /// HTTP status of the submission response.
    pub status: u16,

    bytes: Vec<u8>,
}

impl AttestationResult {
    pub(crate) fn new(status: u16, bytes: Vec<u8>) -> Self {
        Self { status, bytes }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Logical size of the result.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// View as UTF-8 text (typically JSON); `None` for binary payloads.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl fmt::Display for AttestationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.bytes))
    }
}

/// How HTTP status codes are interpreted on a completed exchange.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusPolicy {
    /// Any completed exchange counts; negotiation failure is detected only by
    /// the absence of a `Location` header.
    #[default]
    Lenient,

    /// Non-2xx on either step is an [`AttestError::UnexpectedStatus`].
    Strict,
}

/// Client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Verification service address.
    #[serde(default = "default_address")]
    pub address: String,

    /// Verification service port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Status code interpretation.
    #[serde(default)]
    pub status_policy: StatusPolicy,

    /// Ceiling on an accumulated response body; unlimited when unset.
    #[serde(default)]
    pub max_result_bytes: Option<usize>,
}

fn default_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_timeout() -> u64 {
    30
}

/// Same truthy set as clap's `BoolishValueParser`.
fn is_truthy(value: &str) -> bool {
    ["y", "yes", "t", "true", "on", "1"]
        .iter()
        .any(|t| value.trim().eq_ignore_ascii_case(t))
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            timeout_secs: default_timeout(),
            status_policy: StatusPolicy::default(),
            max_result_bytes: None,
        }
    }
}

impl ClientConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `ATTEST_ADDRESS` | Service address |
    /// | `ATTEST_PORT` | Service port |
    /// | `ATTEST_TIMEOUT` | Request timeout in seconds |
    /// | `ATTEST_STRICT_STATUS` | Treat non-2xx as errors |
    /// | `ATTEST_MAX_RESULT_BYTES` | Result size ceiling |
    pub fn from_env() -> Self {
        Self {
            address: std::env::var("ATTEST_ADDRESS")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(default_address),
            port: std::env::var("ATTEST_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_port),
            timeout_secs: std::env::var("ATTEST_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_timeout),
            status_policy: if std::env::var("ATTEST_STRICT_STATUS")
                .map(|v| is_truthy(&v))
                .unwrap_or(false)
            {
                StatusPolicy::Strict
            } else {
                StatusPolicy::Lenient
            },
            max_result_bytes: std::env::var("ATTEST_MAX_RESULT_BYTES")
                .ok()
                .and_then(|v| v.parse().ok()),
        }
    }

    /// Service endpoint for the configured address and port.
    pub fn endpoint(&self) -> AttestResult<Endpoint> {
        Endpoint::new(&self.address, self.port)
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_status_policy(mut self, policy: StatusPolicy) -> Self {
        self.status_policy = policy;
        self
    }

    pub fn with_max_result_bytes(mut self, limit: usize) -> Self {
        self.max_result_bytes = Some(limit);
        self
    }
}
