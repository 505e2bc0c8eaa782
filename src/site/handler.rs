use crate::auth::cookie::{access_cookie, access_cookie_name, consent_cookie, consent_cookie_name};
use crate::fingerprint::VisitorFingerprint;
use crate::pipeline::recorder::SharedRecorder;
use crate::project::{is_valid_project_name, SiteProject};
use crate::site::assets::{mime_type, AssetError, AssetStore};
use crate::site::gate::{AccessGate, GateDecision, GateRequest};
use crate::site::pages;
use crate::site::rewrite::{is_rewritable, ContentRewriter};
use axum::body::Body;
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::io::ReaderStream;

/// Everything the public site routes need.
pub struct SiteState {
    pub gate: AccessGate,
    pub recorder: SharedRecorder,
    pub fingerprint: Arc<dyn VisitorFingerprint>,
    pub assets: AssetStore,
    pub rewriter: ContentRewriter,
    pub secure_cookies: bool,
    pub trust_forwarded_for: bool,
}

/// Gate-relevant query parameters. Repeats are allowed; the first one wins.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SiteQuery {
    pub consent: Option<String>,
    pub password: Option<String>,
}

impl SiteQuery {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut query = Self::default();
        for (name, value) in pairs {
            let slot = match name.as_str() {
                "consent" => &mut query.consent,
                "password" => &mut query.password,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        query
    }
}

/// Request facts shared by the root and sub-path handlers.
struct SiteRequest {
    query: SiteQuery,
    jar: CookieJar,
    headers: HeaderMap,
    uri: Uri,
    peer: SocketAddr,
}

/// GET /s/{name} and /s/{name}/
pub async fn serve_site_root(
    State(state): State<Arc<SiteState>>,
    Path(name): Path<String>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Query(pairs): Query<Vec<(String, String)>>,
    jar: CookieJar,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let req = SiteRequest {
        query: SiteQuery::from_pairs(pairs),
        jar,
        headers,
        uri,
        peer,
    };
    serve_site(&state, &name, "", req).await
}

/// GET /s/{name}/{*path}
pub async fn serve_site_path(
    State(state): State<Arc<SiteState>>,
    Path((name, path)): Path<(String, String)>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Query(pairs): Query<Vec<(String, String)>>,
    jar: CookieJar,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let req = SiteRequest {
        query: SiteQuery::from_pairs(pairs),
        jar,
        headers,
        uri,
        peer,
    };
    serve_site(&state, &name, &path, req).await
}

/// GET /auth/{name} - consent or password page for a site.
pub async fn site_auth_page(
    Path(name): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !is_valid_project_name(&name) {
        return pages::not_found();
    }
    let require_password = params.contains_key("requirePassword");
    let invalid_password = params.get("error").map(String::as_str) == Some("invalid_password");
    pages::site_auth(&name, require_password, invalid_password)
}

async fn serve_site(state: &SiteState, name: &str, path: &str, req: SiteRequest) -> Response {
    let consent_name = consent_cookie_name(name);
    let access_name = access_cookie_name(name);
    let gate_req = GateRequest {
        consent_param: req.query.consent.is_some(),
        password_param: req.query.password.as_deref(),
        consent_cookie: req.jar.get(&consent_name).map(|c| c.value()),
        access_cookie: req.jar.get(&access_name).map(|c| c.value()),
    };

    let decision = match state.gate.evaluate(name, &gate_req).await {
        Ok(decision) => decision,
        Err(e) => return e.into_response(),
    };

    let clean_url = req.uri.path();
    match decision {
        GateDecision::NotFound => pages::not_found(),
        GateDecision::ProjectDisabled => pages::project_disabled(),
        GateDecision::AccountDisabled => pages::account_disabled(),
        GateDecision::GrantConsent => {
            redirect_setting(clean_url, consent_cookie(name, state.secure_cookies))
        }
        GateDecision::RedirectClean => redirect(clean_url),
        GateDecision::GrantAccess(token) => {
            redirect_setting(clean_url, access_cookie(name, &token, state.secure_cookies))
        }
        GateDecision::InvalidPassword => {
            redirect(&format!("/auth/{name}?requirePassword&error=invalid_password"))
        }
        GateDecision::RequirePassword => redirect(&format!("/auth/{name}?requirePassword")),
        GateDecision::RequireConsent => redirect(&format!("/auth/{name}")),
        GateDecision::Serve(project) => {
            let (relative, is_root) = asset_path(path);
            if is_root {
                let ip = client_ip(&req.headers, req.peer, state.trust_forwarded_for);
                let user_agent = req
                    .headers
                    .get(header::USER_AGENT)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("");
                let visitor = state.fingerprint.fingerprint(&ip, user_agent);
                // Bounded by the recorder's own timeout; never fails the request.
                state.recorder.record_visit(project.id, &visitor).await;
            }
            deliver(state, &project, &relative).await
        }
    }
}

/// Map the request path to a file path and whether it is the site's root document.
fn asset_path(path: &str) -> (String, bool) {
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() {
        return ("index.html".to_string(), true);
    }
    if trimmed.ends_with('/') {
        return (format!("{trimmed}index.html"), false);
    }
    (trimmed.to_string(), trimmed == "index.html")
}

fn client_ip(headers: &HeaderMap, peer: SocketAddr, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }
    peer.ip().to_string()
}

fn redirect(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

fn redirect_setting(location: &str, cookie: String) -> Response {
    (
        StatusCode::FOUND,
        [
            (header::LOCATION, location.to_string()),
            (header::SET_COOKIE, cookie),
        ],
    )
        .into_response()
}

async fn deliver(state: &SiteState, project: &SiteProject, relative: &str) -> Response {
    let content_type = mime_type(relative);

    if is_rewritable(relative) {
        return match state
            .assets
            .read(&project.owner_username, &project.name, relative)
            .await
        {
            Ok(bytes) => {
                let body = match String::from_utf8(bytes) {
                    Ok(text) if !state.rewriter.is_empty() => Body::from(state.rewriter.apply(&text)),
                    Ok(text) => Body::from(text),
                    Err(e) => Body::from(e.into_bytes()),
                };
                ([(header::CONTENT_TYPE, content_type)], body).into_response()
            }
            Err(e) => asset_error(e, project, relative),
        };
    }

    match state
        .assets
        .open(&project.owner_username, &project.name, relative)
        .await
    {
        Ok((file, len)) => (
            [
                (header::CONTENT_TYPE, content_type.to_string()),
                (header::CONTENT_LENGTH, len.to_string()),
            ],
            Body::from_stream(ReaderStream::new(file)),
        )
            .into_response(),
        Err(e) => asset_error(e, project, relative),
    }
}

fn asset_error(err: AssetError, project: &SiteProject, relative: &str) -> Response {
    match err {
        AssetError::NotFound | AssetError::InvalidPath => {
            (StatusCode::NOT_FOUND, "File not found").into_response()
        }
        AssetError::Io(e) => {
            tracing::error!(error = %e, project = %project.name, path = relative, "failed to read site file");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to read file").into_response()
        }
    }
}
