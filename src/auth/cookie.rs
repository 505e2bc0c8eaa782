//! Per-site consent and access cookies.
//!
//! The access cookie carries an HMAC of the project name and its current
//! password hash. Changing the password changes the expected value, so every
//! previously issued cookie stops verifying without any server-side state.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

pub const CONSENT_MAX_AGE_SECS: u64 = 365 * 24 * 60 * 60;
pub const ACCESS_MAX_AGE_SECS: u64 = 7 * 24 * 60 * 60;

pub fn consent_cookie_name(project: &str) -> String {
    format!("consent_{project}")
}

pub fn access_cookie_name(project: &str) -> String {
    format!("project_auth_{project}")
}

/// `Set-Cookie` value recording consent for one site.
pub fn consent_cookie(project: &str, secure: bool) -> String {
    let secure_flag = if secure { "; Secure" } else { "" };
    format!(
        "{}=true; SameSite=Lax; Path=/s/{project}; Max-Age={CONSENT_MAX_AGE_SECS}{secure_flag}",
        consent_cookie_name(project)
    )
}

/// `Set-Cookie` value granting password access to one site.
pub fn access_cookie(project: &str, token: &str, secure: bool) -> String {
    let secure_flag = if secure { "; Secure" } else { "" };
    format!(
        "{}={token}; HttpOnly; SameSite=Lax; Path=/s/{project}; Max-Age={ACCESS_MAX_AGE_SECS}{secure_flag}",
        access_cookie_name(project)
    )
}

/// Derives and checks access-cookie tokens.
#[derive(Clone)]
pub struct AccessSigner {
    secret: Vec<u8>,
}

impl AccessSigner {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
        }
    }

    fn mac(&self, project: &str, password_hash: &str) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC can take key of any size");
        mac.update(project.as_bytes());
        mac.update(&[0]);
        mac.update(password_hash.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }

    /// Hex token for `project` under its current password hash.
    pub fn token(&self, project: &str, password_hash: &str) -> String {
        hex::encode(self.mac(project, password_hash))
    }

    pub fn verify(&self, project: &str, password_hash: &str, presented: &str) -> bool {
        let Ok(presented) = hex::decode(presented) else {
            return false;
        };
        let expected = self.mac(project, password_hash);
        expected.as_slice().ct_eq(&presented).into()
    }
}
