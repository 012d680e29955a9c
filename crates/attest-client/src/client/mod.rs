//! Challenge-response protocol driver.
//!
//! Two strictly sequential exchanges against the verification service:
//!
//! 1. `POST {base}newSession?nonceSize=32` (empty body), read `Location`.
//! 2. `POST {base}{location}` with the evidence, capture the response body.
//!
//! Every exchange gets its own [`ResponseBuffer`]; nothing is carried from
//! one step to the next except the session location.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, HOST};
use reqwest::Method;
use tracing::{debug, warn};

use crate::buffer::ResponseBuffer;
use crate::endpoint::Endpoint;
use crate::error::{AttestError, AttestResult, Step};
use crate::types::{AttestationResult, ClientConfig, Evidence, Session, StatusPolicy};

mod transport;

#[cfg(test)]
mod tests;

pub use transport::{HttpRequest, ReqwestTransport, ResponseHead, Transport};

/// Virtual host the service routes evidence submissions on.
pub const SERVICE_HOST: &str = "veraison.example";

/// Media type accepted back from an evidence submission.
pub const SESSION_MEDIA_TYPE: &str = "application/vnd.veraison.challenge-response-session+json";

/// Client for the challenge-response attestation protocol.
#[derive(Debug, Clone)]
pub struct ChallengeResponseClient<T = ReqwestTransport> {
    transport: T,
    status_policy: StatusPolicy,
    max_result_bytes: Option<usize>,
}

impl ChallengeResponseClient<ReqwestTransport> {
    pub fn new(config: &ClientConfig) -> AttestResult<Self> {
        let transport = ReqwestTransport::new(Duration::from_secs(config.timeout_secs))?;
        Ok(Self::with_transport(transport, config))
    }

    pub fn from_env() -> AttestResult<Self> {
        Self::new(&ClientConfig::from_env())
    }
}

impl<T: Transport> ChallengeResponseClient<T> {
    pub fn with_transport(transport: T, config: &ClientConfig) -> Self {
        Self {
            transport,
            status_policy: config.status_policy,
            max_result_bytes: config.max_result_bytes,
        }
    }

    pub fn status_policy(&self) -> StatusPolicy {
        self.status_policy
    }

    /// Open a verification session and resolve its location.
    ///
    /// Under [`StatusPolicy::Lenient`] any completed exchange is accepted and
    /// only the `Location` header decides success.
    pub async fn negotiate_session(&self, endpoint: &Endpoint) -> AttestResult<Session> {
        let request = HttpRequest {
            step: Step::Negotiate,
            method: Method::POST,
            url: endpoint.new_session_url(),
            headers: HeaderMap::new(),
            body: &[],
        };
        debug!(url = %request.url, "opening challenge-response session");

        let (head, body) = self.exchange(&request).await?;

        let location = match head.location() {
            Some(location) => location.to_string(),
            None => {
                warn!(
                    status = head.status.as_u16(),
                    "negotiation response carries no usable Location header"
                );
                return Err(AttestError::SessionLocationMissing);
            }
        };

        debug!(location = %location, status = head.status.as_u16(), "session created");
        Ok(Session::new(location, head.status.as_u16(), body.into_bytes()))
    }

    /// Submit evidence to an open session and capture the attestation result.
    pub async fn submit(
        &self,
        endpoint: &Endpoint,
        location: &str,
        evidence: Evidence<'_>,
    ) -> AttestResult<AttestationResult> {
        if location.trim().is_empty() {
            return Err(AttestError::input("empty session location"));
        }

        let url = endpoint.session_url(location);
        url::Url::parse(&url)
            .map_err(|e| AttestError::input(format!("invalid session URL {url}: {e}")))?;

        let content_type = HeaderValue::from_str(evidence.media_type()).map_err(|_| {
            AttestError::input(format!("invalid media type: {:?}", evidence.media_type()))
        })?;

        let mut headers = HeaderMap::with_capacity(3);
        headers.insert(CONTENT_TYPE, content_type);
        headers.insert(HOST, HeaderValue::from_static(SERVICE_HOST));
        headers.insert(ACCEPT, HeaderValue::from_static(SESSION_MEDIA_TYPE));

        let request = HttpRequest {
            step: Step::Submit,
            method: Method::POST,
            url,
            headers,
            body: evidence.bytes(),
        };
        debug!(
            url = %request.url,
            media_type = evidence.media_type(),
            bytes = evidence.len(),
            "submitting evidence"
        );

        let (head, body) = self.exchange(&request).await?;

        debug!(
            status = head.status.as_u16(),
            bytes = body.len(),
            "attestation result received"
        );
        Ok(AttestationResult::new(head.status.as_u16(), body.into_bytes()))
    }

    /// Negotiate a session, then submit `evidence` to it.
    ///
    /// Exactly one negotiation attempt; exactly one submission attempt, and
    /// only if negotiation succeeded.
    pub async fn run(
        &self,
        endpoint: &Endpoint,
        evidence: Evidence<'_>,
    ) -> AttestResult<AttestationResult> {
        let session = self.negotiate_session(endpoint).await?;
        self.submit(endpoint, &session.location, evidence).await
    }

    /// End-to-end flow over raw caller inputs.
    ///
    /// All inputs are validated before any network call is made.
    pub async fn submit_evidence(
        &self,
        evidence: &[u8],
        media_type: &str,
        base_url: &str,
    ) -> AttestResult<AttestationResult> {
        let evidence = Evidence::new(evidence, media_type)?;
        let endpoint = Endpoint::parse(base_url)?;
        self.run(&endpoint, evidence).await
    }

    /// One exchange into a fresh buffer, with the status policy applied.
    ///
    /// The buffer is dropped on every error path.
    async fn exchange(
        &self,
        request: &HttpRequest<'_>,
    ) -> AttestResult<(ResponseHead, ResponseBuffer)> {
        let mut body = ResponseBuffer::with_limit(self.max_result_bytes);

        let head = match self.transport.perform(request, &mut body).await {
            Ok(head) => head,
            Err(e) => {
                warn!(step = %request.step, url = %request.url, error = %e, "exchange failed");
                return Err(e);
            }
        };

        if self.status_policy == StatusPolicy::Strict && !head.status.is_success() {
            warn!(step = %request.step, status = head.status.as_u16(), "unexpected status");
            return Err(AttestError::UnexpectedStatus {
                step: request.step,
                status: head.status.as_u16(),
                body: body.into_bytes(),
            });
        }

        Ok((head, body))
    }
}
