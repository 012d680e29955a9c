//! Protocol driver tests over a scripted in-memory transport.
//!
//! Every test checks the live `ResponseBuffer` count afterwards: whichever
//! step fails, no buffer may outlive the call.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE, HOST};
use reqwest::{Method, StatusCode};

use super::*;
use crate::buffer::live;
use crate::types::PSA_TOKEN_MEDIA_TYPE;

const BASE: &str = "http://127.0.0.1:8080/challenge-response/v1/";

enum Reply {
    Complete {
        status: u16,
        headers: Vec<(&'static str, &'static str)>,
        chunks: Vec<&'static [u8]>,
    },
    /// Connection-level failure before any response arrives.
    Refused(&'static str),
    /// Some body chunks arrive, then the connection drops.
    Broken {
        chunks: Vec<&'static [u8]>,
        message: &'static str,
    },
}

fn reply(
    status: u16,
    headers: Vec<(&'static str, &'static str)>,
    chunks: Vec<&'static [u8]>,
) -> Reply {
    Reply::Complete {
        status,
        headers,
        chunks,
    }
}

fn session_created() -> Reply {
    reply(
        201,
        vec![("location", "session/abc123")],
        vec![b"{\"nonce\":\"", b"AAAA\"}"],
    )
}

#[derive(Debug)]
struct Recorded {
    step: Step,
    method: Method,
    url: String,
    headers: HeaderMap,
    body: Vec<u8>,
    live_buffers: isize,
}

struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    seen: Mutex<Vec<Recorded>>,
}

impl ScriptedTransport {
    fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn seen(&self) -> std::sync::MutexGuard<'_, Vec<Recorded>> {
        self.seen.lock().unwrap()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn perform(
        &self,
        request: &HttpRequest<'_>,
        sink: &mut ResponseBuffer,
    ) -> AttestResult<ResponseHead> {
        self.seen.lock().unwrap().push(Recorded {
            step: request.step,
            method: request.method.clone(),
            url: request.url.clone(),
            headers: request.headers.clone(),
            body: request.body.to_vec(),
            live_buffers: live::count(),
        });

        let next = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("unscripted request");

        match next {
            Reply::Complete {
                status,
                headers,
                chunks,
            } => {
                let mut map = HeaderMap::new();
                for (name, value) in headers {
                    map.insert(
                        HeaderName::from_bytes(name.as_bytes()).unwrap(),
                        HeaderValue::from_static(value),
                    );
                }
                for chunk in chunks {
                    sink.append(chunk)?;
                }
                Ok(ResponseHead {
                    status: StatusCode::from_u16(status).unwrap(),
                    headers: map,
                })
            }
            Reply::Refused(message) => Err(AttestError::Transport {
                message: message.to_string(),
            }),
            Reply::Broken { chunks, message } => {
                for chunk in chunks {
                    sink.append(chunk)?;
                }
                Err(AttestError::Transport {
                    message: message.to_string(),
                })
            }
        }
    }
}

fn client(replies: Vec<Reply>) -> ChallengeResponseClient<ScriptedTransport> {
    client_with(replies, ClientConfig::default())
}

fn client_with(
    replies: Vec<Reply>,
    config: ClientConfig,
) -> ChallengeResponseClient<ScriptedTransport> {
    ChallengeResponseClient::with_transport(ScriptedTransport::new(replies), &config)
}

fn endpoint() -> Endpoint {
    Endpoint::parse(BASE).unwrap()
}

#[tokio::test]
async fn test_negotiate_posts_empty_body_to_new_session() {
    let baseline = live::count();
    let cr = client(vec![session_created()]);

    let session = cr.negotiate_session(&endpoint()).await.unwrap();

    assert_eq!(session.location, "session/abc123");
    assert_eq!(session.nonce_size, 32);
    assert_eq!(session.status, 201);
    assert_eq!(session.document, b"{\"nonce\":\"AAAA\"}");

    let seen = cr.transport.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].step, Step::Negotiate);
    assert_eq!(seen[0].method, Method::POST);
    assert_eq!(seen[0].url, format!("{BASE}newSession?nonceSize=32"));
    assert!(seen[0].body.is_empty());
    assert!(seen[0].headers.is_empty());
    assert_eq!(seen[0].live_buffers, baseline + 1);
    drop(seen);

    assert_eq!(live::count(), baseline);
}

#[tokio::test]
async fn test_location_header_name_is_case_insensitive() {
    let cr = client(vec![reply(201, vec![("LOCATION", "session/xyz")], vec![])]);
    let session = cr.negotiate_session(&endpoint()).await.unwrap();
    assert_eq!(session.location, "session/xyz");
}

#[tokio::test]
async fn test_missing_location_stops_before_submission() {
    let baseline = live::count();
    let cr = client(vec![reply(201, vec![], vec![b"{}"])]);

    let err = cr
        .submit_evidence(b"token", PSA_TOKEN_MEDIA_TYPE, BASE)
        .await
        .unwrap_err();

    assert!(matches!(err, AttestError::SessionLocationMissing));
    assert_eq!(cr.transport.seen().len(), 1);
    assert_eq!(live::count(), baseline);
}

#[tokio::test]
async fn test_empty_location_is_missing() {
    let cr = client(vec![reply(201, vec![("location", "")], vec![])]);
    let err = cr.negotiate_session(&endpoint()).await.unwrap_err();
    assert!(matches!(err, AttestError::SessionLocationMissing));
}

#[test]
fn test_non_ascii_location_is_not_usable() {
    let mut headers = HeaderMap::new();
    headers.insert(
        reqwest::header::LOCATION,
        HeaderValue::from_bytes(b"session/\xe2\x98\x83").unwrap(),
    );
    let head = ResponseHead {
        status: StatusCode::CREATED,
        headers,
    };
    assert_eq!(head.location(), None);
}

#[tokio::test]
async fn test_transport_failure_on_negotiation_prevents_submission() {
    let baseline = live::count();
    let cr = client(vec![Reply::Refused("connection refused")]);

    let err = cr
        .submit_evidence(b"token", PSA_TOKEN_MEDIA_TYPE, BASE)
        .await
        .unwrap_err();

    match err {
        AttestError::Transport { message } => assert_eq!(message, "connection refused"),
        other => panic!("expected Transport, got {other:?}"),
    }
    assert_eq!(cr.transport.seen().len(), 1);
    assert_eq!(live::count(), baseline);
}

#[tokio::test]
async fn test_broken_negotiation_body_releases_partial_buffer() {
    let baseline = live::count();
    let cr = client(vec![Reply::Broken {
        chunks: vec![b"{\"nonce\":"],
        message: "connection reset",
    }]);

    let err = cr
        .submit_evidence(b"token", PSA_TOKEN_MEDIA_TYPE, BASE)
        .await
        .unwrap_err();

    assert!(matches!(err, AttestError::Transport { .. }));
    assert_eq!(cr.transport.seen().len(), 1);
    assert_eq!(live::count(), baseline);
}

#[tokio::test]
async fn test_broken_submission_body_releases_partial_buffer() {
    let baseline = live::count();
    let cr = client(vec![
        session_created(),
        Reply::Broken {
            chunks: vec![b"{\"status\":", b"\"compl"],
            message: "unexpected EOF",
        },
    ]);

    let err = cr
        .submit_evidence(b"token", PSA_TOKEN_MEDIA_TYPE, BASE)
        .await
        .unwrap_err();

    assert!(matches!(err, AttestError::Transport { .. }));
    assert_eq!(cr.transport.seen().len(), 2);
    assert_eq!(live::count(), baseline);
}

#[tokio::test]
async fn test_submission_sends_exactly_three_protocol_headers() {
    let cr = client(vec![
        session_created(),
        reply(200, vec![], vec![b"{}"]),
    ]);

    cr.submit_evidence(b"token", PSA_TOKEN_MEDIA_TYPE, BASE)
        .await
        .unwrap();

    let seen = cr.transport.seen();
    let submit = &seen[1];
    assert_eq!(submit.step, Step::Submit);
    assert_eq!(submit.method, Method::POST);
    assert_eq!(submit.url, format!("{BASE}session/abc123"));
    assert_eq!(submit.headers.len(), 3);
    assert_eq!(submit.headers[CONTENT_TYPE], PSA_TOKEN_MEDIA_TYPE);
    assert_eq!(submit.headers[HOST], "veraison.example");
    assert_eq!(
        submit.headers[ACCEPT],
        "application/vnd.veraison.challenge-response-session+json"
    );
}

#[tokio::test]
async fn test_submission_body_is_byte_exact_binary() {
    let evidence: Vec<u8> = vec![0xd2, 0x84, 0x00, 0x43, 0xa1, 0x00, 0x00, 0xff];
    let cr = client(vec![session_created(), reply(200, vec![], vec![b"ok"])]);

    cr.submit_evidence(&evidence, PSA_TOKEN_MEDIA_TYPE, BASE)
        .await
        .unwrap();

    assert_eq!(cr.transport.seen()[1].body, evidence);
}

#[tokio::test]
async fn test_result_accumulates_chunks_in_order() {
    let baseline = live::count();
    let cr = client(vec![
        session_created(),
        reply(200, vec![], vec![b"ab", b"cde", b"f"]),
    ]);

    let result = cr
        .submit_evidence(b"token", PSA_TOKEN_MEDIA_TYPE, BASE)
        .await
        .unwrap();

    assert_eq!(result.size(), 6);
    assert_eq!(result.bytes(), b"abcdef");
    assert_eq!(live::count(), baseline);
}

#[tokio::test]
async fn test_each_step_gets_its_own_buffer() {
    let cr = client(vec![
        session_created(),
        reply(200, vec![], vec![b"{\"status\":\"complete\"}"]),
    ]);

    let result = cr
        .submit_evidence(b"token", PSA_TOKEN_MEDIA_TYPE, BASE)
        .await
        .unwrap();

    // The negotiation body must not leak into the attestation result.
    assert_eq!(result.as_str(), Some("{\"status\":\"complete\"}"));
    for recorded in cr.transport.seen().iter() {
        assert_eq!(recorded.live_buffers, live::count() + 1);
    }
}

#[tokio::test]
async fn test_empty_result_body_is_success() {
    let cr = client(vec![session_created(), reply(204, vec![], vec![])]);

    let result = cr
        .submit_evidence(b"token", PSA_TOKEN_MEDIA_TYPE, BASE)
        .await
        .unwrap();

    assert!(result.is_empty());
    assert_eq!(result.size(), 0);
    assert_eq!(result.status, 204);
}

#[tokio::test]
async fn test_result_ceiling_aborts_with_allocation_failure() {
    let baseline = live::count();
    let cr = client_with(
        vec![
            session_created(),
            reply(200, vec![], vec![b"0123456789", b"abcdef"]),
        ],
        ClientConfig::default().with_max_result_bytes(12),
    );

    let err = cr
        .submit_evidence(b"token", PSA_TOKEN_MEDIA_TYPE, BASE)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AttestError::AllocationFailure {
            requested: 6,
            held: 10
        }
    ));
    assert_eq!(live::count(), baseline);
}

#[tokio::test]
async fn test_leading_slash_location_does_not_double_slash() {
    let cr = client(vec![
        reply(201, vec![("location", "/session/abc123")], vec![]),
        reply(200, vec![], vec![b"{}"]),
    ]);

    cr.submit_evidence(b"token", PSA_TOKEN_MEDIA_TYPE, BASE)
        .await
        .unwrap();

    assert_eq!(cr.transport.seen()[1].url, format!("{BASE}session/abc123"));
}

#[tokio::test]
async fn test_lenient_policy_accepts_error_status_with_location() {
    let cr = client(vec![
        reply(404, vec![("location", "session/abc123")], vec![b"not found"]),
        reply(500, vec![], vec![b"{\"status\":\"failed\"}"]),
    ]);
    assert_eq!(cr.status_policy(), StatusPolicy::Lenient);

    let result = cr
        .submit_evidence(b"token", PSA_TOKEN_MEDIA_TYPE, BASE)
        .await
        .unwrap();

    assert_eq!(result.status, 500);
    assert_eq!(result.bytes(), b"{\"status\":\"failed\"}");
}

#[tokio::test]
async fn test_strict_policy_rejects_error_status_on_negotiation() {
    let baseline = live::count();
    let cr = client_with(
        vec![reply(503, vec![("location", "session/abc123")], vec![b"busy"])],
        ClientConfig::default().with_status_policy(StatusPolicy::Strict),
    );

    let err = cr
        .submit_evidence(b"token", PSA_TOKEN_MEDIA_TYPE, BASE)
        .await
        .unwrap_err();

    match err {
        AttestError::UnexpectedStatus { step, status, body } => {
            assert_eq!(step, Step::Negotiate);
            assert_eq!(status, 503);
            assert_eq!(body, b"busy");
        }
        other => panic!("expected UnexpectedStatus, got {other:?}"),
    }
    assert_eq!(cr.transport.seen().len(), 1);
    assert_eq!(live::count(), baseline);
}

#[tokio::test]
async fn test_strict_policy_rejects_error_status_on_submission() {
    let cr = client_with(
        vec![session_created(), reply(415, vec![], vec![b"bad media type"])],
        ClientConfig::default().with_status_policy(StatusPolicy::Strict),
    );

    let err = cr
        .submit_evidence(b"token", "application/unknown", BASE)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AttestError::UnexpectedStatus {
            step: Step::Submit,
            status: 415,
            ..
        }
    ));
}

#[tokio::test]
async fn test_invalid_inputs_fail_before_any_request() {
    let cases: [(&[u8], &str, &str); 4] = [
        (&b""[..], PSA_TOKEN_MEDIA_TYPE, BASE),
        (&b"token"[..], "", BASE),
        (&b"token"[..], PSA_TOKEN_MEDIA_TYPE, ""),
        (
            &b"token"[..],
            PSA_TOKEN_MEDIA_TYPE,
            "http://127.0.0.1:8080/challenge-response/v1",
        ),
    ];

    for (evidence, media_type, base_url) in cases {
        let cr = client(vec![]);
        let err = cr
            .submit_evidence(evidence, media_type, base_url)
            .await
            .unwrap_err();
        assert!(matches!(err, AttestError::Input { .. }), "got {err:?}");
        assert!(cr.transport.seen().is_empty());
    }
}

#[tokio::test]
async fn test_submit_rejects_blank_location() {
    let cr = client(vec![]);
    let evidence = Evidence::new(b"token", PSA_TOKEN_MEDIA_TYPE).unwrap();

    let err = cr.submit(&endpoint(), "  ", evidence).await.unwrap_err();

    assert!(matches!(err, AttestError::Input { .. }));
    assert!(cr.transport.seen().is_empty());
}
