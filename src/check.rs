//! Plate status classification and check-request payload construction.

use std::fmt;

use crate::config::{MAX_PLATE_LENGTH, ServiceConfig};

/// The availability status the plate service reported for a candidate.
///
/// The service contract only names `AVAILABLE` and `UNAVAILABLE`; anything
/// else it returns is carried verbatim in [`Status::Other`]. A structurally
/// valid response that lacks a `code` field maps to [`Status::Unknown`], and
/// [`Status::Error`] is recorded for a failed check when the pool runs with
/// [`ErrorPolicy::RecordAndContinue`](crate::pool::ErrorPolicy).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[must_use]
#[non_exhaustive]
pub enum Status {
    /// The plate can be ordered.
    Available,
    /// The plate is taken or rejected by the service.
    Unavailable,
    /// The service answered without a recognizable status code.
    Unknown,
    /// The check itself failed and the failure was recorded instead of
    /// aborting the run.
    Error,
    /// Any other code the service returned, verbatim.
    Other(String),
}

impl Status {
    /// Map a wire status code to a [`Status`].
    pub fn from_code(code: &str) -> Self {
        match code {
            "AVAILABLE" => Self::Available,
            "UNAVAILABLE" => Self::Unavailable,
            "UNKNOWN" => Self::Unknown,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether this candidate came back orderable.
    #[must_use]
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available => write!(f, "AVAILABLE"),
            Self::Unavailable => write!(f, "UNAVAILABLE"),
            Self::Unknown => write!(f, "UNKNOWN"),
            Self::Error => write!(f, "ERROR"),
            Self::Other(code) => write!(f, "{code}"),
        }
    }
}

/// Errors that can occur while checking a single candidate.
///
/// Implements [`std::error::Error`] with proper
/// [`source`](std::error::Error::source) chaining.
#[derive(Debug)]
#[non_exhaustive]
pub enum CheckError {
    /// A network or HTTP error prevented the check request.
    Transport(Box<ureq::Error>),
    /// The response body was not structurally parseable.
    Parse(serde_json::Error),
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "check request failed: {e}"),
            Self::Parse(e) => write!(f, "unparseable check response: {e}"),
        }
    }
}

impl std::error::Error for CheckError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e.as_ref()),
            Self::Parse(e) => Some(e),
        }
    }
}

impl From<ureq::Error> for CheckError {
    fn from(e: ureq::Error) -> Self {
        Self::Transport(Box::new(e))
    }
}

/// Something that can classify one candidate plate.
///
/// [`Session`](crate::session::Session) is the real implementation; tests
/// substitute stubs so pool semantics can be exercised without a network.
pub trait PlateCheck {
    /// Check one candidate, returning its classification.
    ///
    /// # Errors
    ///
    /// Returns [`CheckError`] when the request cannot be issued or the
    /// response body cannot be parsed. A parseable body without a status
    /// code is not an error; it yields [`Status::Unknown`].
    fn check(&mut self, plate: &str) -> Result<Status, CheckError>;
}

/// Build the form body of a check request for one candidate.
///
/// The static program fields come from `config`; the candidate's characters
/// fill the positional `plateChar{i}` fields, one per position, with every
/// unused trailing position sent blank. Pure function: each call produces a
/// fresh payload, so workers can never corrupt a shared template.
///
/// ```
/// use plate_avail::check::build_payload;
/// use plate_avail::config::ServiceConfig;
///
/// let payload = build_payload("cat", &ServiceConfig::default());
/// assert!(payload.contains(&("plateChar0".to_string(), "c".to_string())));
/// assert!(payload.contains(&("plateChar6".to_string(), String::new())));
/// ```
#[must_use]
pub fn build_payload(plate: &str, config: &ServiceConfig) -> Vec<(String, String)> {
    let mut payload = Vec::with_capacity(4 + MAX_PLATE_LENGTH);
    payload.push(("plateType".to_string(), config.plate_type.clone()));
    payload.push(("plateName".to_string(), config.plate_name.clone()));
    payload.push(("plateLength".to_string(), config.plate_length.clone()));
    payload.push(("vehicleType".to_string(), config.vehicle_type.clone()));

    let mut chars = plate.chars();
    for i in 0..MAX_PLATE_LENGTH {
        let value = chars.next().map(String::from).unwrap_or_default();
        payload.push((format!("plateChar{i}"), value));
    }
    payload
}

/// Extract the status code from a parsed check response.
///
/// The service answers with a JSON object whose `code` field carries the
/// classification; a response without that field maps to [`Status::Unknown`].
#[must_use]
pub fn status_from_response(body: &serde_json::Value) -> Status {
    match body.get("code").and_then(|c| c.as_str()) {
        Some(code) => Status::from_code(code),
        None => Status::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_codes_map_to_variants() {
        assert_eq!(Status::from_code("AVAILABLE"), Status::Available);
        assert_eq!(Status::from_code("UNAVAILABLE"), Status::Unavailable);
        assert_eq!(Status::from_code("UNKNOWN"), Status::Unknown);
    }

    #[test]
    fn unrecognized_codes_pass_through_verbatim() {
        match Status::from_code("TAKEN") {
            Status::Other(code) => assert_eq!(code, "TAKEN"),
            other => panic!("expected Other, got {other:?}"),
        }
        assert_eq!(Status::from_code("TAKEN").to_string(), "TAKEN");
    }

    #[test]
    fn display_uses_wire_spelling() {
        assert_eq!(Status::Available.to_string(), "AVAILABLE");
        assert_eq!(Status::Unavailable.to_string(), "UNAVAILABLE");
        assert_eq!(Status::Unknown.to_string(), "UNKNOWN");
        assert_eq!(Status::Error.to_string(), "ERROR");
    }

    #[test]
    fn payload_fills_positions_and_blanks_the_rest() {
        let payload = build_payload("catdog", &ServiceConfig::default());
        let get = |k: &str| {
            payload
                .iter()
                .find(|(key, _)| key == k)
                .map(|(_, v)| v.as_str())
                .unwrap()
        };
        assert_eq!(get("plateChar0"), "c");
        assert_eq!(get("plateChar5"), "g");
        assert_eq!(get("plateChar6"), "");
        assert_eq!(get("plateType"), "Z");
        assert_eq!(get("plateName"), "California 1960s Legacy");
        assert_eq!(get("plateLength"), "7");
        assert_eq!(get("vehicleType"), "AUTO");
    }

    #[test]
    fn payload_has_one_field_per_position() {
        let payload = build_payload("hi", &ServiceConfig::default());
        let positional = payload
            .iter()
            .filter(|(k, _)| k.starts_with("plateChar"))
            .count();
        assert_eq!(positional, MAX_PLATE_LENGTH);
    }

    #[test]
    fn payload_is_fresh_per_call() {
        let config = ServiceConfig::default();
        let first = build_payload("abc", &config);
        let second = build_payload("xy", &config);
        assert_ne!(first, second);
        // the longer plate's trailing characters must not leak into the
        // shorter plate's payload
        assert!(second.contains(&("plateChar2".to_string(), String::new())));
    }

    #[test]
    fn missing_code_field_is_unknown() {
        let body = serde_json::json!({ "message": "hello" });
        assert_eq!(status_from_response(&body), Status::Unknown);
    }

    #[test]
    fn code_field_is_classified() {
        let body = serde_json::json!({ "code": "AVAILABLE" });
        assert_eq!(status_from_response(&body), Status::Available);
    }

    #[test]
    fn status_is_send_sync_unpin() {
        fn assert_normal<T: Sized + Send + Sync + Unpin>() {}
        assert_normal::<Status>();
    }

    #[test]
    fn check_error_is_send_sync() {
        fn assert_normal<T: Sized + Send + Sync>() {}
        assert_normal::<CheckError>();
    }
}
