//! HTTP Signature authentication (draft-cavage-http-signatures-12).
//!
//! [`RequireAuth`] resolves the acting user from a signed request: the
//! `keyId` names a registered user id, and the signature must verify against
//! that user's stored Ed25519 public key. A bad or missing signature is a
//! 401; a storage failure during the key lookup is reported like any other
//! storage error (500, detail logged only).

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use ed25519_dalek::Verifier;
use socialgraph::{keys, UserId};
use socialgraph_api::error::{codes, ErrorResponse};

use crate::{error::AppError, handlers::AppState, storage::StorageError};

// ---------------------------------------------------------------------------
// Auth errors
// ---------------------------------------------------------------------------

/// Why a request could not be authenticated.
#[derive(Debug)]
pub enum AuthError {
    /// The signature is absent, malformed, stale, or does not verify. 401.
    Unauthorized(String),
    /// The key lookup itself failed. Handled like any other storage error.
    Storage(StorageError),
}

impl From<String> for AuthError {
    fn from(reason: String) -> Self {
        AuthError::Unauthorized(reason)
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::Unauthorized(reason) => {
                let body = ErrorResponse::new(codes::UNAUTHORIZED, reason);
                (StatusCode::UNAUTHORIZED, Json(body)).into_response()
            }
            AuthError::Storage(e) => AppError::from(e).into_response(),
        }
    }
}

// ---------------------------------------------------------------------------
// RequireAuth extractor
// ---------------------------------------------------------------------------

/// Axum extractor that requires a valid HTTP Signature from a registered user.
///
/// Returns 401 if the `Signature` header is absent or the signature is invalid.
#[derive(Debug, Clone, Copy)]
pub struct RequireAuth {
    /// The user named by `keyId` in the `Signature` header.
    pub user_id: UserId,
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AuthError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let app_state = AppState::from_ref(state);
        async move {
            match verify_http_signature(parts, &app_state).await {
                Ok(user_id) => Ok(RequireAuth { user_id }),
                Err(AuthError::Unauthorized(reason)) => {
                    tracing::warn!(
                        method = %parts.method,
                        path = %parts.uri.path(),
                        %reason,
                        "rejected request signature"
                    );
                    Err(AuthError::Unauthorized(reason))
                }
                Err(e) => Err(e),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Core verification logic
// ---------------------------------------------------------------------------

/// Parse and verify an HTTP Signature, returning the signing user on success.
///
/// Returns [`AuthError::Unauthorized`] with a human-readable reason on any
/// signature failure and [`AuthError::Storage`] if the key lookup fails.
async fn verify_http_signature(parts: &Parts, state: &AppState) -> Result<UserId, AuthError> {
    // --- 1. Extract and parse the Signature header ----------------------------
    let sig_header = parts
        .headers
        .get("signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| "missing Signature header".to_string())?;

    let parsed = parse_signature_header(sig_header)
        .map_err(|e| format!("invalid Signature header: {e}"))?;

    if !parsed.algorithm.eq_ignore_ascii_case("ed25519") {
        return Err(format!("unsupported algorithm: {}", parsed.algorithm).into());
    }
    for required in ["(request-target)", "date"] {
        if !parsed.headers.iter().any(|h| h == required) {
            return Err(format!("signature must cover {required}").into());
        }
    }

    // --- 2. Validate Date header (replay prevention) --------------------------
    let date_str = parts
        .headers
        .get("date")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| "missing Date header".to_string())?;

    validate_date(date_str, state.config.signature_skew_secs)
        .map_err(|e| format!("Date header invalid: {e}"))?;

    // --- 3. Look up the user's public key -------------------------------------
    let user_id: UserId = parsed
        .key_id
        .parse()
        .map_err(|_| format!("keyId must be a user id, got: {:?}", parsed.key_id))?;

    let profile = state
        .storage
        .get_user(user_id)
        .await
        .map_err(AuthError::Storage)?
        .ok_or_else(|| format!("user {user_id} not registered"))?;

    let verifying_key = keys::decode_public_key(&profile.public_key)
        .map_err(|e| format!("invalid public key for user {user_id}: {e}"))?;

    // --- 4. Reconstruct signing string and verify -----------------------------
    let signing_string = build_signing_string(parts, &parsed.headers)
        .map_err(|e| format!("signing string error: {e}"))?;

    let signature = keys::decode_signature(&parsed.signature)
        .map_err(|e| format!("malformed signature: {e}"))?;

    verifying_key
        .verify(signing_string.as_bytes(), &signature)
        .map_err(|_| "signature verification failed".to_string())?;

    Ok(user_id)
}

// ---------------------------------------------------------------------------
// Parsed Signature header
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub(crate) struct ParsedSignature {
    key_id: String,
    algorithm: String,
    headers: Vec<String>,
    signature: String,
}

/// Parse `Signature: keyId="...",algorithm="...",headers="...",signature="z..."`
pub(crate) fn parse_signature_header(header: &str) -> Result<ParsedSignature, String> {
    let mut key_id = None;
    let mut algorithm = None;
    let mut headers = None;
    let mut signature = None;

    for part in split_signature_params(header) {
        if let Some(rest) = part.strip_prefix("keyId=") {
            key_id = Some(unquote(rest)?);
        } else if let Some(rest) = part.strip_prefix("algorithm=") {
            algorithm = Some(unquote(rest)?);
        } else if let Some(rest) = part.strip_prefix("headers=") {
            let h = unquote(rest)?;
            headers = Some(
                h.split_whitespace()
                    .map(str::to_ascii_lowercase)
                    .collect::<Vec<_>>(),
            );
        } else if let Some(rest) = part.strip_prefix("signature=") {
            signature = Some(unquote(rest)?);
        }
    }

    Ok(ParsedSignature {
        key_id: key_id.ok_or("missing keyId")?,
        algorithm: algorithm.unwrap_or_else(|| "ed25519".into()),
        headers: headers.unwrap_or_else(|| vec!["date".into()]),
        signature: signature.ok_or("missing signature")?,
    })
}

/// Split a `Signature` header value at param boundaries.
///
/// Params are separated by `,` but only outside double-quoted strings.
fn split_signature_params(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in s.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            ',' if !in_quotes => {
                parts.push(current.trim().to_string());
                current = String::new();
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

/// Strip surrounding double-quotes from a parameter value.
fn unquote(s: &str) -> Result<String, String> {
    let s = s.trim();
    match s.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        Some(inner) => Ok(inner.to_string()),
        None => Err(format!("expected quoted string, got: {s:?}")),
    }
}

// ---------------------------------------------------------------------------
// Signing string construction
// ---------------------------------------------------------------------------

/// Build the signing string from request parts and the header list.
///
/// Each entry is `header-name: header-value`, joined by `\n`.
/// `(request-target)` is replaced by `method path` (lowercase method).
pub(crate) fn build_signing_string(parts: &Parts, headers: &[String]) -> Result<String, String> {
    let mut lines = Vec::with_capacity(headers.len());

    for header_name in headers {
        if header_name == "(request-target)" {
            let method = parts.method.as_str().to_lowercase();
            let path = parts
                .uri
                .path_and_query()
                .map(|pq| pq.as_str())
                .unwrap_or("/");
            lines.push(format!("(request-target): {method} {path}"));
        } else {
            let value = parts
                .headers
                .get(header_name.as_str())
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| format!("missing header: {header_name}"))?;
            lines.push(format!("{header_name}: {value}"));
        }
    }

    Ok(lines.join("\n"))
}

// ---------------------------------------------------------------------------
// Date validation (replay prevention)
// ---------------------------------------------------------------------------

/// Returns `Ok(())` if the date is within `max_skew_secs` of now.
///
/// Accepts the HTTP date format (`Thu, 01 Jan 2026 00:00:00 GMT`) and
/// RFC 3339.
pub(crate) fn validate_date(date_str: &str, max_skew_secs: i64) -> Result<(), String> {
    let dt = httpdate::parse_http_date(date_str)
        .map(chrono::DateTime::<chrono::Utc>::from)
        .or_else(|_| {
            chrono::DateTime::parse_from_rfc3339(date_str)
                .map(|d| d.with_timezone(&chrono::Utc))
        })
        .map_err(|_| format!("unparseable date: {date_str:?}"))?;

    let diff = (chrono::Utc::now() - dt).num_seconds().abs();
    if diff > max_skew_secs {
        return Err(format!(
            "Date is {diff}s from server clock (max {max_skew_secs}s allowed)"
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use axum::{body::Body, http::Request, routing::get, Router};
    use ed25519_dalek::{Signer, SigningKey};
    use rand::rngs::OsRng;
    use tower::ServiceExt;

    use super::*;
    use crate::{
        config::ServerConfig,
        handlers::test_support::{assert_opaque_internal_error, signed, BrokenStorage, TestApp},
        storage::{memory::MemoryStorage, NewUser, Storage},
    };

    async fn whoami(auth: RequireAuth) -> String {
        auth.user_id.to_string()
    }

    async fn app_with_user() -> (Router, SigningKey, UserId) {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let key = SigningKey::generate(&mut OsRng);
        let profile = storage
            .create_user(&NewUser {
                display_name: "Ana".into(),
                handle: "ana".into(),
                email: "ana@example.com".into(),
                public_key: keys::encode_public_key(&key.verifying_key()),
            })
            .await
            .unwrap();
        let state = AppState {
            storage,
            config: ServerConfig::default(),
        };
        let app = Router::new().route("/whoami", get(whoami)).with_state(state);
        (app, key, profile.id)
    }

    fn signed_get(key: &SigningKey, key_id: &str, path: &str) -> Request<Body> {
        let (date, sig) = keys::sign_request(key, key_id, "GET", path, "localhost");
        Request::builder()
            .uri(path)
            .header("host", "localhost")
            .header("date", date)
            .header("signature", sig)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn valid_signature_resolves_the_user() {
        let (app, key, id) = app_with_user().await;
        let resp = app
            .oneshot(signed_get(&key, &id.to_string(), "/whoami"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_signature_is_unauthorized() {
        let (app, _, _) = app_with_user().await;
        let req = Request::builder().uri("/whoami").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn wrong_key_is_unauthorized() {
        let (app, _, id) = app_with_user().await;
        let other = SigningKey::generate(&mut OsRng);
        let resp = app
            .oneshot(signed_get(&other, &id.to_string(), "/whoami"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_or_non_numeric_key_id_is_unauthorized() {
        let (app, key, _) = app_with_user().await;
        for key_id in ["999", "ana"] {
            let resp = app
                .clone()
                .oneshot(signed_get(&key, key_id, "/whoami"))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "keyId {key_id}");
        }
    }

    #[tokio::test]
    async fn signature_over_another_path_is_rejected() {
        let (app, key, id) = app_with_user().await;
        let mut req = signed_get(&key, &id.to_string(), "/elsewhere");
        *req.uri_mut() = "/whoami".parse().unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn signature_must_cover_date_and_target() {
        let (app, key, id) = app_with_user().await;
        let date = httpdate::fmt_http_date(std::time::SystemTime::now());
        let sig = key.sign(format!("host: localhost\ndate: {date}").as_bytes());
        let header = format!(
            r#"keyId="{id}",algorithm="ed25519",headers="host date",signature="{}""#,
            keys::encode_signature(&sig)
        );
        let req = Request::builder()
            .uri("/whoami")
            .header("host", "localhost")
            .header("date", date)
            .header("signature", header)
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn storage_failure_during_key_lookup_is_an_opaque_500() {
        let storage = Arc::new(BrokenStorage::default());
        let app = TestApp::with_storage(storage.clone());
        let ana = app.user("ana").await;
        storage.lookups_fail.store(true, Ordering::SeqCst);

        let path = format!("/v1/users/{}/mutual", ana.id);
        let resp = app.send(signed(&ana, "GET", &path, None)).await;
        assert_opaque_internal_error(resp).await;
    }

    #[test]
    fn header_list_is_parsed_lowercase() {
        let parsed = parse_signature_header(
            r#"keyId="1",algorithm="ed25519",headers="(request-target) Host Date",signature="zabc""#,
        )
        .unwrap();
        assert_eq!(parsed.headers, vec!["(request-target)", "host", "date"]);
        assert_eq!(parsed.key_id, "1");
    }

    #[test]
    fn parse_rejects_unquoted_and_missing_params() {
        assert!(parse_signature_header("").is_err());
        assert!(parse_signature_header(r#"keyId=1,signature="zabc""#).is_err());
        assert!(parse_signature_header(r#"keyId="1""#).is_err());
    }

    #[test]
    fn split_keeps_commas_inside_quotes() {
        let parts = split_signature_params(r#"a="x,y",b="z""#);
        assert_eq!(parts, vec![r#"a="x,y""#, r#"b="z""#]);
    }

    #[test]
    fn date_skew_is_enforced() {
        let now = httpdate::fmt_http_date(std::time::SystemTime::now());
        assert!(validate_date(&now, 300).is_ok());
        assert!(validate_date("Thu, 01 Jan 2020 00:00:00 GMT", 300).is_err());
        assert!(validate_date("Thu, 01 Jan 2099 00:00:00 GMT", 300).is_err());
        assert!(validate_date("yesterday", 300).is_err());
    }

    #[test]
    fn signing_string_matches_the_client_side() {
        let req = Request::builder()
            .method("POST")
            .uri("/v1/users/1/following?x=1")
            .header("host", "example.com")
            .header("date", "Thu, 01 Jan 2026 00:00:00 GMT")
            .body(())
            .unwrap();
        let (parts, _) = req.into_parts();
        let headers: Vec<String> = ["(request-target)", "host", "date"]
            .map(String::from)
            .to_vec();
        let built = build_signing_string(&parts, &headers).unwrap();
        assert_eq!(
            built,
            keys::signing_string(
                "POST",
                "/v1/users/1/following?x=1",
                "example.com",
                "Thu, 01 Jan 2026 00:00:00 GMT"
            )
        );
        let key = SigningKey::generate(&mut OsRng);
        assert!(key
            .verifying_key()
            .verify(built.as_bytes(), &key.sign(built.as_bytes()))
            .is_ok());
    }
}
