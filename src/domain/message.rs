use serde::{Deserialize, Serialize};
use std::fmt;

pub const PURCHASE_VERIFICATION_FAILED: &str = "Purchase token verification failed";
pub const PROFILE_CREATION_FAILED: &str = "VPN profile creation failed";

/// User-presentable error shown once per aborted attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorMessage {
    pub title: String,
    pub body: String,
}

impl ErrorMessage {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    pub fn purchase_rejected() -> Self {
        Self::new(PURCHASE_VERIFICATION_FAILED, "Failed to verify purchase token.")
    }

    pub fn subscriber_credential_failed() -> Self {
        Self::new(PROFILE_CREATION_FAILED, "Failed to get Subscriber credential.")
    }

    pub fn timezones_failed() -> Self {
        Self::new(PROFILE_CREATION_FAILED, "Failed to get timezones for the region.")
    }

    pub fn timezone_unmatched(timezone_id: &str) -> Self {
        Self::new(
            PROFILE_CREATION_FAILED,
            format!("Couldn't get matching timezone for : {timezone_id}"),
        )
    }

    pub fn hostnames_failed() -> Self {
        Self::new(PROFILE_CREATION_FAILED, "Failed to get hostnames for the region.")
    }

    pub fn profile_credentials_failed() -> Self {
        Self::new(PROFILE_CREATION_FAILED, "Failed to get profile credentials.")
    }
}

/// Toast text: title and body on separate lines.
impl fmt::Display for ErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{}", self.title, self.body)
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    #[serde(rename = "error-title", default)]
    title: String,
}

/// Converts a failure payload into an `ErrorMessage`.
///
/// The server's title is used for both title and body. Absent payloads and
/// envelopes without a usable title produce `fallback`.
pub fn translate(payload: Option<&str>, fallback: ErrorMessage) -> ErrorMessage {
    let Some(raw) = payload else {
        return fallback;
    };

    match serde_json::from_str::<ErrorEnvelope>(raw) {
        Ok(envelope) if !envelope.title.trim().is_empty() => {
            ErrorMessage::new(envelope.title.clone(), envelope.title)
        }
        Ok(_) => fallback,
        Err(e) => {
            tracing::debug!("unparseable error payload: {e}");
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_used_as_title_and_body() {
        let payload = r#"{"error-title": "X", "error-message": "ignored"}"#;
        let message = translate(Some(payload), ErrorMessage::hostnames_failed());
        assert_eq!(message, ErrorMessage::new("X", "X"));
    }

    #[test]
    fn test_absent_payload_uses_fallback() {
        let message = translate(None, ErrorMessage::timezones_failed());
        assert_eq!(message, ErrorMessage::timezones_failed());
    }

    #[test]
    fn test_unusable_payload_degrades_to_fallback() {
        for payload in ["<html>502</html>", "{}", r#"{"error-title": ""}"#, "[1,2]"] {
            let message = translate(Some(payload), ErrorMessage::hostnames_failed());
            assert_eq!(message, ErrorMessage::hostnames_failed(), "payload {payload}");
        }
    }

    #[test]
    fn test_display_is_toast_text() {
        let message = ErrorMessage::timezone_unmatched("Pacific/Noop");
        assert_eq!(
            message.to_string(),
            "VPN profile creation failed\nCouldn't get matching timezone for : Pacific/Noop"
        );
    }
}
