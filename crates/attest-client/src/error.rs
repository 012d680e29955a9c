//! Error types for the attestation client.

use std::fmt;

/// Protocol step an error or request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// `POST {base}newSession?nonceSize=32`.
    Negotiate,
    /// `POST {base}{session-location}` carrying the evidence.
    Submit,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Negotiate => f.write_str("session negotiation"),
            Self::Submit => f.write_str("evidence submission"),
        }
    }
}

/// Attestation client errors.
#[derive(Debug, thiserror::Error)]
pub enum AttestError {
    /// The HTTP exchange did not complete (connect, DNS, timeout, bad response).
    #[error("transport error: {message}")]
    Transport { message: String },

    /// Negotiation completed but carried no usable `Location` header.
    #[error("session location missing from negotiation response")]
    SessionLocationMissing,

    /// The response buffer could not grow to hold the next chunk.
    #[error("allocation failure: cannot grow response buffer by {requested} bytes (holding {held})")]
    AllocationFailure { requested: usize, held: usize },

    /// Caller supplied an empty or malformed evidence, media type or base URL.
    #[error("invalid input: {message}")]
    Input { message: String },

    /// Non-2xx status under [`StatusPolicy::Strict`](crate::StatusPolicy::Strict).
    #[error("{step} returned HTTP {status}")]
    UnexpectedStatus {
        step: Step,
        status: u16,
        body: Vec<u8>,
    },
}

/// Process exit codes. Part of the public contract of the `attest` binary.
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const INPUT_ERROR: i32 = 1; // Bad token file, media type or address
    pub const INTERNAL_ERROR: i32 = 2; // Token unreadable, runtime setup failed
    pub const PROTOCOL_ERROR: i32 = 3; // No session location, or status rejected
    pub const TRANSPORT_ERROR: i32 = 4; // Connection, DNS or timeout
    pub const RESOURCE_ERROR: i32 = 5; // Result buffer could not grow
}

impl AttestError {
    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Input { .. } => exit_codes::INPUT_ERROR,

            // Protocol violations
            Self::SessionLocationMissing => exit_codes::PROTOCOL_ERROR,
            Self::UnexpectedStatus { .. } => exit_codes::PROTOCOL_ERROR,

            Self::Transport { .. } => exit_codes::TRANSPORT_ERROR,
            Self::AllocationFailure { .. } => exit_codes::RESOURCE_ERROR,
        }
    }

    pub(crate) fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for AttestError {
    fn from(err: reqwest::Error) -> Self {
        // reqwest's Display hides the cause (e.g. "connection refused"), walk the chain.
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self::Transport { message }
    }
}

/// Result type for attestation operations.
pub type AttestResult<T> = Result<T, AttestError>;
