//! Service endpoint and protocol URL construction.

use std::fmt;

use url::Url;

use crate::error::{AttestError, AttestResult};

/// Fixed path prefix of the challenge-response API.
pub const API_PREFIX: &str = "challenge-response/v1/";

/// Nonce size requested when opening a session.
pub const NONCE_SIZE: u32 = 32;

/// Default service port.
pub const DEFAULT_PORT: u16 = 8080;

/// Base URL of a verification service, always ending in `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base: String,
}

impl Endpoint {
    /// Build `http://<address>:<port>/challenge-response/v1/`.
    ///
    /// ```
    /// use attest_client::Endpoint;
    ///
    /// let ep = Endpoint::new("127.0.0.1", 8080).unwrap();
    /// assert_eq!(ep.as_str(), "http://127.0.0.1:8080/challenge-response/v1/");
    /// ```
    pub fn new(address: &str, port: u16) -> AttestResult<Self> {
        let address = address.trim();
        if address.is_empty() {
            return Err(AttestError::input("empty service address"));
        }
        if address.contains(['/', '?', '#', '@']) || address.contains(char::is_whitespace) {
            return Err(AttestError::input(format!(
                "invalid service address: {address}"
            )));
        }

        // Bare IPv6 literals need brackets in the authority.
        if address.contains(':') && !address.starts_with('[') {
            return Self::parse(&format!("http://[{address}]:{port}/{API_PREFIX}"));
        }

        Self::parse(&format!("http://{address}:{port}/{API_PREFIX}"))
    }

    /// Accept a caller-supplied base URL.
    ///
    /// The URL must be absolute http(s), carry a host, have no query or
    /// fragment, and end in `/` so that protocol paths append cleanly.
    pub fn parse(base_url: &str) -> AttestResult<Self> {
        if base_url.is_empty() {
            return Err(AttestError::input("empty base URL"));
        }

        let parsed = Url::parse(base_url)
            .map_err(|e| AttestError::input(format!("malformed base URL {base_url}: {e}")))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AttestError::input(format!(
                "unsupported scheme in base URL: {}",
                parsed.scheme()
            )));
        }
        if parsed.host_str().is_none() {
            return Err(AttestError::input("base URL has no host"));
        }
        if parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(AttestError::input(
                "base URL must not carry a query or fragment",
            ));
        }
        if !base_url.ends_with('/') {
            return Err(AttestError::input(format!(
                "base URL must end with '/': {base_url}"
            )));
        }

        Ok(Self {
            base: base_url.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.base
    }

    /// `{base}newSession?nonceSize=32`.
    pub fn new_session_url(&self) -> String {
        format!("{}newSession?nonceSize={}", self.base, NONCE_SIZE)
    }

    /// Resolve the session resource returned by negotiation.
    pub fn session_url(&self, location: &str) -> String {
        join_session_url(&self.base, location)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base)
    }
}

/// Append a session location to a base URL ending in `/`.
///
/// The location is appended verbatim except for leading slashes, which the
/// base already supplies.
pub fn join_session_url(base: &str, location: &str) -> String {
    let location = location.trim_start_matches('/');
    let mut url = String::with_capacity(base.len() + location.len());
    url.push_str(base);
    url.push_str(location);
    url
}
