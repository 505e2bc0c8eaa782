//! Server-rendered pages shown to site visitors instead of JSON errors.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

const STYLE: &str = r#"
* { margin: 0; padding: 0; box-sizing: border-box; }
body {
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, 'Helvetica Neue', Arial, sans-serif;
    background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
    min-height: 100vh; display: flex; align-items: center; justify-content: center; padding: 20px;
}
.container {
    background: white; border-radius: 16px; box-shadow: 0 20px 60px rgba(0, 0, 0, 0.3);
    max-width: 460px; width: 100%; padding: 48px 40px; text-align: center;
}
.icon { font-size: 40px; margin-bottom: 24px; }
h1 { font-size: 26px; color: #1a202c; margin-bottom: 16px; font-weight: 700; }
p { color: #718096; font-size: 15px; line-height: 1.6; margin-bottom: 28px; }
.notice { background: #f7fafc; border: 1px solid #e2e8f0; border-radius: 8px; padding: 16px; text-align: left; }
.alert { background: #fff5f5; border: 1px solid #feb2b2; color: #c53030; border-radius: 8px; padding: 12px; margin-bottom: 20px; }
input[type=password] { width: 100%; padding: 12px; border: 1px solid #cbd5e0; border-radius: 8px; margin-bottom: 16px; font-size: 15px; }
.btn {
    display: inline-block; width: 100%; padding: 12px 32px; border: 0; cursor: pointer;
    background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); color: white;
    text-decoration: none; border-radius: 8px; font-weight: 600; font-size: 15px;
}
"#;

fn html(status: StatusCode, body: String) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        body,
    )
        .into_response()
}

fn card(title: &str, inner: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title}</title>
<style>{STYLE}</style>
</head>
<body>
<div class="container">
{inner}
</div>
</body>
</html>"#
    )
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Unknown or unpublished project: alert and go back.
pub fn not_found() -> Response {
    html(
        StatusCode::NOT_FOUND,
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<title>Error</title>
</head>
<body>
<script>
alert('Project not found');
window.history.back();
</script>
</body>
</html>"#
            .to_string(),
    )
}

pub fn project_disabled() -> Response {
    html(
        StatusCode::FORBIDDEN,
        card(
            "Project Disabled",
            r#"<div class="icon">&#128683;</div>
<h1>Project Disabled</h1>
<p>This project has been disabled by an administrator and is currently unavailable.</p>
<a href="/" class="btn">Return to Home</a>"#,
        ),
    )
}

pub fn account_disabled() -> Response {
    html(
        StatusCode::FORBIDDEN,
        card(
            "Account Disabled",
            r#"<div class="icon">&#128683;</div>
<h1>Account Disabled</h1>
<p>This project is currently unavailable because the owner's account has been disabled by an administrator.</p>
<a href="/" class="btn">Return to Home</a>"#,
        ),
    )
}

/// Consent notice, or a password form when `require_password` is set.
pub fn site_auth(project: &str, require_password: bool, invalid_password: bool) -> Response {
    let name = escape(project);
    let mut inner = String::from(r#"<div class="icon">&#128274;</div><h1>Access Required</h1>"#);

    if require_password {
        inner.push_str("<p>This site is password protected</p>");
        if invalid_password {
            inner.push_str(
                r#"<div class="alert">The password you entered is incorrect. Please try again.</div>"#,
            );
        }
        inner.push_str(&format!(
            r#"<form method="get" action="/s/{name}/">
<input type="password" name="password" placeholder="Enter site password" required autofocus>
<button type="submit" class="btn">Access Site</button>
</form>"#
        ));
    } else {
        inner.push_str("<p>You need to consent to access this site</p>");
        inner.push_str(&format!(
            r#"<p class="notice">This website is user-uploaded content and not affiliated with this platform.</p>
<a href="/s/{name}/?consent=true" class="btn">Continue</a>"#
        ));
    }

    html(StatusCode::OK, card("Access Required", &inner))
}
