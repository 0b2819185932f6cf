//! Static service configuration for the DMV personalized-plate endpoint.
//!
//! The DMV serves both the terms-acknowledgment bootstrap and the per-plate
//! check from the same `checkPers.do` endpoint; only the form body differs.
//! All values here were captured from the production site and must be sent
//! verbatim for the service to answer.

use std::env;

/// Shortest plate the service accepts.
pub const MIN_PLATE_LENGTH: usize = 2;
/// Longest plate the service accepts; also the number of positional
/// `plateChar{i}` form fields in every check request.
pub const MAX_PLATE_LENGTH: usize = 7;

/// Default number of concurrent workers (and therefore DMV sessions).
pub const DEFAULT_WORKERS: usize = 10;

/// Environment variable that overrides the check endpoint. Used by the test
/// suite to point the binary at a local stub service.
pub const URL_ENV_VAR: &str = "PLATE_AVAIL_URL";

const CHECK_URL: &str = "https://www.dmv.ca.gov/wasapp/ipp2/checkPers.do";
const INIT_REFERER: &str = "https://www.dmv.ca.gov/wasapp/ipp2/initPers.do";
const CHECK_REFERER: &str = "https://www.dmv.ca.gov/wasapp/ipp2/startPers.do";
const ORIGIN: &str = "https://www.dmv.ca.gov";

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                          AppleWebKit/537.36 (KHTML, like Gecko) \
                          Chrome/134.0.0.0 Safari/537.36";

/// Form body of the session bootstrap request (terms acknowledgment).
pub const BOOTSTRAP_FORM: &[(&str, &str)] =
    &[("acknowledged", "true"), ("_acknowledged", "on")];

/// Everything a worker needs to talk to the plate service.
///
/// The fields below the URLs are the static form fields merged into every
/// check payload; they select the plate program being queried and are not
/// derived from the candidate.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Endpoint receiving both bootstrap and check POSTs.
    pub check_url: String,
    /// `Referer` sent with the bootstrap request.
    pub init_referer: String,
    /// `Referer` sent with every check request.
    pub check_referer: String,
    /// `Origin` sent with every check request.
    pub origin: String,
    /// Browser user agent the service expects.
    pub user_agent: String,
    /// Plate program category (`Z` = 1960s Legacy).
    pub plate_type: String,
    /// Display name of the plate program.
    pub plate_name: String,
    /// Value of the `plateLength` form field (always the maximum).
    pub plate_length: String,
    /// Vehicle category the check is scoped to.
    pub vehicle_type: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            check_url: CHECK_URL.to_string(),
            init_referer: INIT_REFERER.to_string(),
            check_referer: CHECK_REFERER.to_string(),
            origin: ORIGIN.to_string(),
            user_agent: USER_AGENT.to_string(),
            plate_type: "Z".to_string(),
            plate_name: "California 1960s Legacy".to_string(),
            plate_length: MAX_PLATE_LENGTH.to_string(),
            vehicle_type: "AUTO".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Default configuration, honoring the [`URL_ENV_VAR`] endpoint override.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = env::var(URL_ENV_VAR) {
            config.check_url = url;
        }
        config
    }
}
