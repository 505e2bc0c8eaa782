use axum::{
    body::Body,
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// The configured API token, stored as its SHA-256 digest.
#[derive(Clone)]
pub struct ApiToken {
    digest: [u8; 32],
}

impl ApiToken {
    pub fn new(plaintext: &str) -> Self {
        Self {
            digest: hash_token(plaintext),
        }
    }

    /// Constant-time check; digests keep the comparison length fixed.
    pub fn matches(&self, presented: &str) -> bool {
        self.digest.ct_eq(&hash_token(presented)).into()
    }
}

fn hash_token(plaintext: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(plaintext.as_bytes());
    hasher.finalize().into()
}

/// Extract Bearer token from Authorization header.
fn extract_bearer(req: &Request<Body>) -> Option<&str> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?;
    if token.is_empty() {
        return None;
    }
    Some(token)
}

/// Middleware: requires `Authorization: Bearer <api_token>`.
/// Expects `ApiToken` as a request extension.
pub async fn require_api_token(request: Request<Body>, next: Next) -> Result<Response, Response> {
    let expected = request.extensions().get::<ApiToken>().cloned().ok_or_else(|| {
        (StatusCode::INTERNAL_SERVER_ERROR, "api token not configured").into_response()
    })?;

    let authorized = extract_bearer(&request)
        .map(|token| expected.matches(token))
        .unwrap_or(false);
    if !authorized {
        tracing::warn!(path = %request.uri().path(), "rejected api request without valid token");
        return Err((
            StatusCode::UNAUTHORIZED,
            axum::Json(serde_json::json!({"error": "invalid or missing token"})),
        )
            .into_response());
    }

    Ok(next.run(request).await)
}
