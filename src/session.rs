//! Session establishment against the plate service.
//!
//! Every worker owns exactly one [`Session`]: a configured HTTP agent plus
//! the `JSESSIONID` token the service issued during the terms-acknowledgment
//! bootstrap. The service refuses check requests from sessions that have not
//! acknowledged terms, so establishment is a mandatory precondition, not an
//! optimization. Sessions are never shared across workers and release their
//! transport state on drop, on every exit path.

use std::fmt;
use std::time::Duration;

use ureq::Agent;

use crate::check::{CheckError, PlateCheck, Status, build_payload, status_from_response};
use crate::config::{BOOTSTRAP_FORM, ServiceConfig};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Name of the cookie carrying the service-issued session token.
pub const SESSION_COOKIE: &str = "JSESSIONID";

/// Errors that can occur while establishing a session.
#[derive(Debug)]
#[non_exhaustive]
pub enum SessionError {
    /// The transport could not connect or the request failed outright.
    Connect(Box<ureq::Error>),
    /// The bootstrap request was answered with a non-success status.
    BadStatus(u16),
    /// The bootstrap response body was not structurally parseable.
    MalformedBody(serde_json::Error),
    /// The response carried no `JSESSIONID` cookie.
    MissingToken,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect(e) => write!(f, "session bootstrap failed: {e}"),
            Self::BadStatus(code) => {
                write!(f, "session bootstrap answered with HTTP {code}")
            }
            Self::MalformedBody(e) => {
                write!(f, "unparseable session bootstrap response: {e}")
            }
            Self::MissingToken => {
                write!(f, "no {SESSION_COOKIE} cookie in session bootstrap response")
            }
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Connect(e) => Some(e.as_ref()),
            Self::MalformedBody(e) => Some(e),
            Self::BadStatus(_) | Self::MissingToken => None,
        }
    }
}

/// An established, single-owner session with the plate service.
#[derive(Debug)]
pub struct Session {
    agent: Agent,
    token: String,
    config: ServiceConfig,
}

impl Session {
    /// Perform the bootstrap round trip and return an established session.
    ///
    /// Posts the terms-acknowledgment form to the check endpoint with the
    /// initiation page as `Referer`, requires a success status and a
    /// structurally parseable body, and captures the `JSESSIONID` cookie.
    /// There is no retry; a failure here aborts this worker's participation
    /// in the pool. Partially-created transport state is released by drop
    /// before the error propagates.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] on connection failure, a non-success
    /// bootstrap status, an unparseable body, or a missing session cookie.
    pub fn establish(config: &ServiceConfig) -> Result<Self, SessionError> {
        let agent_config = Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .user_agent(config.user_agent.clone())
            .build();
        let agent = Agent::new_with_config(agent_config);

        let mut resp = agent
            .post(&config.check_url)
            .header("Referer", &config.init_referer)
            .send_form(BOOTSTRAP_FORM.iter().copied())
            .map_err(|e| match e {
                ureq::Error::StatusCode(code) => SessionError::BadStatus(code),
                other => SessionError::Connect(Box::new(other)),
            })?;

        let token = resp
            .headers()
            .get_all("set-cookie")
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(session_token)
            .ok_or(SessionError::MissingToken)?;

        // the service labels the body text/html but it is JSON; a body
        // that does not parse means the handshake was not honored
        let body = resp
            .body_mut()
            .read_to_string()
            .map_err(|e| SessionError::Connect(Box::new(e)))?;
        serde_json::from_str::<serde_json::Value>(&body)
            .map_err(SessionError::MalformedBody)?;

        Ok(Self {
            agent,
            token,
            config: config.clone(),
        })
    }

    /// The service-issued session token.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl PlateCheck for Session {
    fn check(&mut self, plate: &str) -> Result<Status, CheckError> {
        let payload = build_payload(plate, &self.config);
        let mut resp = self
            .agent
            .post(&self.config.check_url)
            .header("Accept", "*/*")
            .header("Accept-Language", "en-US,en;q=0.9")
            .header("Origin", &self.config.origin)
            .header("Referer", &self.config.check_referer)
            .header("Cookie", format!("{SESSION_COOKIE}={}", self.token))
            .send_form(payload)?;

        let body = resp.body_mut().read_to_string()?;
        let parsed: serde_json::Value =
            serde_json::from_str(&body).map_err(CheckError::Parse)?;
        Ok(status_from_response(&parsed))
    }
}

/// Pull the session token out of one `Set-Cookie` header value.
fn session_token(header: &str) -> Option<String> {
    let first = header.split(';').next()?;
    let (name, value) = first.split_once('=')?;
    if name.trim() == SESSION_COOKIE && !value.is_empty() {
        Some(value.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_parsed_from_set_cookie() {
        let header = "JSESSIONID=0000abcDEF:-1; Path=/wasapp; Secure; HttpOnly";
        assert_eq!(session_token(header), Some("0000abcDEF:-1".to_string()));
    }

    #[test]
    fn other_cookies_ignored() {
        assert_eq!(session_token("AWSALB=xyz; Path=/"), None);
        assert_eq!(session_token("JSESSIONID=; Path=/"), None);
        assert_eq!(session_token("garbage"), None);
    }

    #[test]
    fn session_error_is_send_sync() {
        fn assert_normal<T: Sized + Send + Sync>() {}
        assert_normal::<SessionError>();
    }
}
