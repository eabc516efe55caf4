use serde::Deserialize;

/// Completion of a single remote call as reported by the transport.
///
/// Blank payloads are folded into `None` here, so everything downstream only
/// has to distinguish "payload present" from "payload absent".
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct RemoteResponse {
    pub success: bool,
    #[serde(default, deserialize_with = "deserialize_payload")]
    pub payload: Option<String>,
}

impl RemoteResponse {
    pub fn new(success: bool, payload: Option<String>) -> Self {
        Self {
            success,
            payload: normalize(payload),
        }
    }

    pub fn ok(payload: impl Into<String>) -> Self {
        Self::new(true, Some(payload.into()))
    }

    pub fn ok_empty() -> Self {
        Self::new(true, None)
    }

    pub fn failed(payload: Option<String>) -> Self {
        Self::new(false, payload)
    }

    pub fn payload(&self) -> Option<&str> {
        self.payload.as_deref()
    }
}

fn normalize(payload: Option<String>) -> Option<String> {
    payload.filter(|p| !p.trim().is_empty())
}

fn deserialize_payload<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    // Scenario files may embed payloads as raw JSON values rather than strings.
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let payload = match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    };
    Ok(normalize(payload))
}
