use super::host::Host;
use serde::{Deserialize, Serialize};

/// Connection credentials returned by the profile-credential call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProfileCredentials {
    pub api_auth_token: String,
    pub client_id: String,
    pub mapped_ipv4_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapped_ipv6_address: Option<String>,
    pub server_public_key: String,
}

impl ProfileCredentials {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Everything downstream needs to configure the tunnel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProvisionedProfile {
    #[serde(flatten)]
    pub host: Host,
    pub region: String,
    pub client_public_key: String,
    pub credentials: ProfileCredentials,
}
