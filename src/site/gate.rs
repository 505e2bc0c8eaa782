use crate::auth::cookie::AccessSigner;
use crate::auth::password::verify_password_blocking;
use crate::error::AppResult;
use crate::project::{is_valid_project_name, ProjectDirectory, SiteProject};

/// What the visitor brought with this request.
#[derive(Debug, Default, Clone, Copy)]
pub struct GateRequest<'a> {
    /// `consent` query parameter present.
    pub consent_param: bool,
    pub password_param: Option<&'a str>,
    pub consent_cookie: Option<&'a str>,
    pub access_cookie: Option<&'a str>,
}

/// Terminal outcome for one site request.
#[derive(Debug)]
pub enum GateDecision {
    NotFound,
    ProjectDisabled,
    AccountDisabled,
    /// Store consent, then redirect to the clean URL.
    GrantConsent,
    /// Password supplied for an open site; just drop the query.
    RedirectClean,
    /// Password accepted; carries the access cookie token.
    GrantAccess(String),
    InvalidPassword,
    RequirePassword,
    RequireConsent,
    Serve(SiteProject),
}

/// Per-request authorization for published sites.
///
/// Stateless: every transition is driven by query parameters and cookies,
/// and checks run in a fixed order so a disabled project or account wins
/// over any credentials the visitor holds.
#[derive(Clone)]
pub struct AccessGate {
    projects: ProjectDirectory,
    signer: AccessSigner,
}

impl AccessGate {
    pub fn new(projects: ProjectDirectory, signer: AccessSigner) -> Self {
        Self { projects, signer }
    }

    pub async fn evaluate(&self, name: &str, req: &GateRequest<'_>) -> AppResult<GateDecision> {
        if !is_valid_project_name(name) {
            return Ok(GateDecision::NotFound);
        }
        let Some(project) = self.projects.find_published(name).await? else {
            return Ok(GateDecision::NotFound);
        };

        if !project.is_active {
            return Ok(GateDecision::ProjectDisabled);
        }
        if !project.owner_is_active {
            return Ok(GateDecision::AccountDisabled);
        }

        if req.consent_param {
            return Ok(GateDecision::GrantConsent);
        }

        if let Some(password) = req.password_param {
            let Some(hash) = project.required_password_hash() else {
                return Ok(GateDecision::RedirectClean);
            };
            let ok = match verify_password_blocking(password.to_string(), hash.to_string()).await {
                Ok(ok) => ok,
                Err(e) => {
                    tracing::error!(error = %e, project = %project.name, "stored password hash unusable");
                    false
                }
            };
            if ok {
                return Ok(GateDecision::GrantAccess(self.signer.token(&project.name, hash)));
            }
            tracing::info!(project = %project.name, "site password rejected");
            return Ok(GateDecision::InvalidPassword);
        }

        if let Some(hash) = project.required_password_hash() {
            let valid = req
                .access_cookie
                .map(|token| self.signer.verify(&project.name, hash, token))
                .unwrap_or(false);
            if !valid {
                return Ok(GateDecision::RequirePassword);
            }
        }

        if !project.owner_is_admin && req.consent_cookie != Some("true") {
            return Ok(GateDecision::RequireConsent);
        }

        Ok(GateDecision::Serve(project))
    }
}
