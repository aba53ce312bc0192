//! Login negotiation against the upstream auth endpoint.
//!
//! The backend's login contract has drifted over time, both in field naming
//! (`email` vs `uid`) and in body encoding (JSON vs form-url-encoded). Rather
//! than pinning one shape, login tries every combination in a fixed priority
//! order and accepts the first attempt that is HTTP-successful and yields a
//! bearer token, wherever the response happens to put it.

use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Field naming axis of a candidate encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FieldNaming {
    Email,
    Uid,
}

impl FieldNaming {
    const fn key(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Uid => "uid",
        }
    }
}

/// Transport encoding axis of a candidate encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Transport {
    Json,
    Form,
}

/// One candidate request shape: field naming x transport encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Candidate {
    pub(crate) transport: Transport,
    pub(crate) fields: FieldNaming,
}

impl Candidate {
    fn request(
        self,
        client: &Client,
        login_url: &str,
        identifier: &str,
        secret: &str,
    ) -> RequestBuilder {
        let mut payload = HashMap::new();
        payload.insert(self.fields.key(), identifier);
        payload.insert("password", secret);

        match self.transport {
            Transport::Json => client.post(login_url).json(&payload),
            Transport::Form => client.post(login_url).form(&payload),
        }
    }
}

/// Candidate encodings in priority order. Adding a new axis value extends the
/// cross product without touching the negotiation loop.
pub(crate) fn candidates() -> Vec<Candidate> {
    let mut out = Vec::with_capacity(4);
    for transport in [Transport::Json, Transport::Form] {
        for fields in [FieldNaming::Email, FieldNaming::Uid] {
            out.push(Candidate { transport, fields });
        }
    }
    out
}

/// Status and decoded body of one upstream attempt, kept for diagnostics.
#[derive(Clone, Debug, Serialize)]
pub(crate) struct AttemptDetail {
    pub(crate) status: u16,
    pub(crate) body: Value,
}

#[derive(Debug)]
pub(crate) enum NegotiationError {
    /// The upstream could not be reached at the transport level.
    Unreachable(String),
    /// Every candidate was tried; `last` holds the final attempt only.
    Rejected { last: Option<AttemptDetail> },
}

/// Response-body locations probed for the token, in order.
const TOKEN_PATHS: &[&[&str]] = &[
    &["token", "token"],
    &["token"],
    &["access_token"],
    &["jwt"],
    &["data", "token"],
];

/// Accept the first non-empty string found at any known token location.
pub(crate) fn extract_token(body: &Value) -> Option<String> {
    TOKEN_PATHS.iter().find_map(|path| {
        let mut cursor = body;
        for key in *path {
            cursor = cursor.get(key)?;
        }
        cursor
            .as_str()
            .filter(|token| !token.is_empty())
            .map(str::to_string)
    })
}

/// Decode an upstream body once: JSON when it parses, raw text otherwise.
fn decode_body(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

/// Try each candidate encoding until one succeeds and yields a token.
///
/// Transport failures abort immediately; they mean the backend is down, not
/// that the encoding was wrong. Rejections carry only the last attempt's
/// status and body, which keeps the diagnostic small and is enough to see
/// what the upstream finally said.
pub(crate) async fn negotiate(
    client: &Client,
    login_url: &str,
    identifier: &str,
    secret: &SecretString,
) -> Result<String, NegotiationError> {
    let mut last = None;

    for candidate in candidates() {
        let response = candidate
            .request(client, login_url, identifier, secret.expose_secret())
            .send()
            .await
            .map_err(|err| NegotiationError::Unreachable(err.to_string()))?;

        let status = response.status();
        let body = match response.bytes().await {
            Ok(bytes) => decode_body(&bytes),
            Err(err) => return Err(NegotiationError::Unreachable(err.to_string())),
        };

        debug!(?candidate, status = status.as_u16(), "login attempt");

        let token = status
            .is_success()
            .then(|| extract_token(&body))
            .flatten();

        last = Some(AttemptDetail {
            status: status.as_u16(),
            body,
        });

        if let Some(token) = token {
            return Ok(token);
        }
    }

    Err(NegotiationError::Rejected { last })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn candidates_cover_cross_product_in_priority_order() {
        let all = candidates();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].transport, Transport::Json);
        assert_eq!(all[0].fields, FieldNaming::Email);
        assert_eq!(all[1].transport, Transport::Json);
        assert_eq!(all[1].fields, FieldNaming::Uid);
        assert_eq!(all[2].transport, Transport::Form);
        assert_eq!(all[2].fields, FieldNaming::Email);
        assert_eq!(all[3].transport, Transport::Form);
        assert_eq!(all[3].fields, FieldNaming::Uid);
    }

    #[test]
    fn extract_token_probes_known_locations_in_order() {
        assert_eq!(
            extract_token(&json!({"token": {"token": "nested"}})),
            Some("nested".to_string())
        );
        assert_eq!(
            extract_token(&json!({"token": "flat"})),
            Some("flat".to_string())
        );
        assert_eq!(
            extract_token(&json!({"access_token": "oauth"})),
            Some("oauth".to_string())
        );
        assert_eq!(extract_token(&json!({"jwt": "jot"})), Some("jot".to_string()));
        assert_eq!(
            extract_token(&json!({"data": {"token": "wrapped"}})),
            Some("wrapped".to_string())
        );
    }

    #[test]
    fn extract_token_prefers_earlier_locations() {
        let body = json!({"access_token": "later", "token": "earlier"});
        assert_eq!(extract_token(&body), Some("earlier".to_string()));
    }

    #[test]
    fn extract_token_skips_non_string_and_empty_values() {
        assert_eq!(extract_token(&json!({"token": 42})), None);
        assert_eq!(extract_token(&json!({"token": ""})), None);
        assert_eq!(extract_token(&json!({"token": {"ttl": 60}})), None);
        assert_eq!(extract_token(&json!({"user": "alice"})), None);
    }

    #[test]
    fn decode_body_falls_back_to_raw_text() {
        assert_eq!(decode_body(br#"{"ok":true}"#), json!({"ok": true}));
        assert_eq!(
            decode_body(b"upstream exploded"),
            Value::String("upstream exploded".to_string())
        );
    }
}
