//! Token manager — the chained handshake that produces a write credential.
//!
//! The privileged credential comes out of a strict 3-step chain against the
//! portal's token endpoint, each step feeding the next:
//!
//! 1. primary login with the read-scoped account → bearer token
//! 2. exchange that token for one scoped to the map server URL
//! 3. privileged login with the write-scoped account → final token + expiry,
//!    plus the fixed-name role cookie from the accumulated Set-Cookie headers
//!
//! Any step failure is terminal — there is no retry here. The credential
//! cache is consulted before the chain runs and overwritten after it
//! succeeds; a valid cached credential short-circuits all network traffic.
//!
//! The HTTP exchange sits behind [`TokenEndpoint`] so the chain logic is
//! testable with canned responses.

use std::path::PathBuf;

use chrono::Utc;
use serde::Deserialize;

use fieldsync_core::{Credential, Settings};

use crate::cache;
use crate::error::AuthError;

/// Parsed body of one token-endpoint response. Both fields are optional on
/// the wire; each step checks for what it requires.
#[derive(Debug, Default, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub expires: Option<i64>,
}

/// One exchange with the token endpoint: the parsed body plus the raw
/// `Set-Cookie` header values the response carried.
#[derive(Debug, Default)]
pub struct TokenExchange {
    pub body: TokenResponse,
    pub cookies: Vec<String>,
}

/// Transport seam for the token endpoint (form-encoded POST).
pub trait TokenEndpoint {
    fn exchange(&self, form: &[(&str, &str)]) -> Result<TokenExchange, AuthError>;
}

/// Production endpoint: posts through a shared blocking agent with the
/// service's referer header.
pub struct UreqTokenEndpoint {
    agent: ureq::Agent,
    url: String,
    referer: String,
}

impl UreqTokenEndpoint {
    pub fn new(agent: ureq::Agent, settings: &Settings) -> Self {
        Self {
            agent,
            url: settings.token_url(),
            referer: settings.referer.clone(),
        }
    }
}

impl TokenEndpoint for UreqTokenEndpoint {
    fn exchange(&self, form: &[(&str, &str)]) -> Result<TokenExchange, AuthError> {
        let response = self
            .agent
            .post(&self.url)
            .set("Referer", &self.referer)
            .send_form(form)
            .map_err(|e| AuthError::Transport {
                source: Box::new(e),
            })?;
        let cookies: Vec<String> = response
            .all("set-cookie")
            .into_iter()
            .map(str::to_string)
            .collect();
        let body: TokenResponse = response.into_json().map_err(AuthError::Malformed)?;
        Ok(TokenExchange { body, cookies })
    }
}

/// Acquires and caches the privileged credential pair.
pub struct TokenManager<'a, E: TokenEndpoint> {
    settings: &'a Settings,
    endpoint: E,
    home: PathBuf,
}

impl<'a, E: TokenEndpoint> TokenManager<'a, E> {
    pub fn new(settings: &'a Settings, endpoint: E, home: PathBuf) -> Self {
        Self {
            settings,
            endpoint,
            home,
        }
    }

    /// Return a valid credential, from cache when possible.
    pub fn acquire(&self) -> Result<Credential, AuthError> {
        let now_ms = Utc::now().timestamp_millis();
        if let Some(credential) = cache::load_at(&self.home, now_ms) {
            tracing::debug!("credential cache hit");
            return Ok(credential);
        }
        self.acquire_fresh()
    }

    /// Run the handshake unconditionally and overwrite the cache.
    pub fn acquire_fresh(&self) -> Result<Credential, AuthError> {
        let credential = self.handshake()?;
        cache::save_at(&self.home, &credential)?;
        Ok(credential)
    }

    fn handshake(&self) -> Result<Credential, AuthError> {
        let expiration = self.settings.token_lifetime_minutes.to_string();
        let referer = self.settings.portal_url.clone();
        let mut cookies: Vec<String> = Vec::new();

        // Step 1: read-scoped login.
        let read_password = self.settings.read_password()?;
        let step1 = self.endpoint.exchange(&[
            ("request", "getToken"),
            ("username", &self.settings.read_username),
            ("password", &read_password),
            ("expiration", &expiration),
            ("referer", &referer),
            ("f", "json"),
        ])?;
        cookies.extend(step1.cookies);
        let primary = step1.body.token.ok_or(AuthError::PrimaryLogin)?;
        tracing::debug!("handshake step 1 complete");

        // Step 2: exchange for a token scoped to the map server.
        let server_url = self.settings.server_url();
        let step2 = self.endpoint.exchange(&[
            ("request", "getToken"),
            ("token", &primary),
            ("serverUrl", &server_url),
            ("referer", &referer),
            ("f", "json"),
        ])?;
        cookies.extend(step2.cookies);
        if step2.body.token.is_none() {
            return Err(AuthError::ScopeExchange);
        }
        tracing::debug!("handshake step 2 complete");

        // Step 3: write-scoped login; this response carries the role cookie.
        let write_password = self.settings.write_password()?;
        let step3 = self.endpoint.exchange(&[
            ("request", "getToken"),
            ("username", &self.settings.write_username),
            ("password", &write_password),
            ("expiration", &expiration),
            ("referer", &referer),
            ("f", "json"),
        ])?;
        cookies.extend(step3.cookies);

        let (token, expires_at_ms) = match (step3.body.token, step3.body.expires) {
            (Some(token), Some(expires)) => (token, expires),
            _ => return Err(AuthError::PrivilegedLogin),
        };
        let session_cookie = find_cookie(&cookies, &self.settings.role_cookie).ok_or_else(|| {
            AuthError::MissingSessionCookie {
                name: self.settings.role_cookie.clone(),
            }
        })?;
        tracing::debug!("handshake complete; token expires at {expires_at_ms}");

        Ok(Credential {
            token,
            expires_at_ms,
            session_cookie,
        })
    }
}

/// Latest value of the named cookie across all Set-Cookie headers seen, with
/// surrounding quotes and attributes stripped.
fn find_cookie(headers: &[String], name: &str) -> Option<String> {
    headers.iter().rev().find_map(|header| {
        let (cookie_name, rest) = header.split_once('=')?;
        if !cookie_name.trim().eq_ignore_ascii_case(name) {
            return None;
        }
        let value = rest.split(';').next().unwrap_or(rest).trim().trim_matches('"');
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
