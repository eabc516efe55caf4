use crate::domain::payload::RemoteResponse;
use crate::domain::pipeline::{RemoteCall, Step};
use crate::domain::ports::RemoteGateway;
use crate::domain::preferences::StoredPreferences;
use crate::error::{ProvisionError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Canned service responses plus the device state they run against.
///
/// A step with no response behaves like a transport failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Scenario {
    pub preferences: StoredPreferences,
    pub vpn_connected: bool,
    pub client_public_key: Option<String>,
    /// Simulated round-trip time for every call.
    pub latency_ms: u64,
    pub purchase: Option<RemoteResponse>,
    pub subscriber_credential: Option<RemoteResponse>,
    pub timezones: Option<RemoteResponse>,
    pub hostnames: Option<RemoteResponse>,
    pub profile_credentials: Option<RemoteResponse>,
}

impl Scenario {
    /// A purchased device in `America/New_York` that provisions into `us-east`.
    pub fn happy_path() -> Self {
        Self {
            preferences: StoredPreferences {
                purchase_token: "purchase-token".into(),
                product_id: "monthly-subscription".into(),
                purchase_expiry: 1_893_456_000_000,
                is_subscription_purchase: true,
                ..Default::default()
            },
            purchase: Some(RemoteResponse::ok_empty()),
            subscriber_credential: Some(RemoteResponse::ok("subscriber-credential")),
            timezones: Some(RemoteResponse::ok(
                r#"[{"name": "us-east", "timezones": ["America/New_York"]},
                    {"name": "us-west", "timezones": ["America/Los_Angeles"]}]"#,
            )),
            hostnames: Some(RemoteResponse::ok(
                r#"[{"hostname": "ny-1.vpn.example", "display-name": "New York 1", "capacity-score": 1},
                    {"hostname": "ny-2.vpn.example", "display-name": "New York 2", "capacity-score": 0}]"#,
            )),
            profile_credentials: Some(RemoteResponse::ok(
                r#"{"api-auth-token": "auth-token", "client-id": "client-id",
                    "mapped-ipv4-address": "10.64.0.2", "server-public-key": "server-key"}"#,
            )),
            ..Default::default()
        }
    }

    pub fn response_for(&self, step: Step) -> Option<&RemoteResponse> {
        match step {
            Step::PurchaseVerification => self.purchase.as_ref(),
            Step::SubscriberCredential => self.subscriber_credential.as_ref(),
            Step::Timezones => self.timezones.as_ref(),
            Step::Hostnames => self.hostnames.as_ref(),
            Step::ProfileCredentials => self.profile_credentials.as_ref(),
        }
    }

    /// Replaces the response for `step` with a bare failure.
    pub fn fail_at(mut self, step: Step) -> Self {
        let failed = Some(RemoteResponse::failed(None));
        match step {
            Step::PurchaseVerification => self.purchase = failed,
            Step::SubscriberCredential => self.subscriber_credential = failed,
            Step::Timezones => self.timezones = failed,
            Step::Hostnames => self.hostnames = failed,
            Step::ProfileCredentials => self.profile_credentials = failed,
        }
        self
    }
}

/// Gateway answering from a [`Scenario`] and recording every call issued.
#[derive(Clone)]
pub struct ScriptedGateway {
    scenario: Arc<Scenario>,
    calls: Arc<Mutex<Vec<RemoteCall>>>,
}

impl ScriptedGateway {
    pub fn new(scenario: Scenario) -> Self {
        Self {
            scenario: Arc::new(scenario),
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn steps(&self) -> Vec<Step> {
        self.calls().iter().map(RemoteCall::step).collect()
    }
}

#[async_trait]
impl RemoteGateway for ScriptedGateway {
    async fn call(&self, call: &RemoteCall) -> Result<RemoteResponse> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call.clone());
        }
        if self.scenario.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.scenario.latency_ms)).await;
        }
        let step = call.step();
        self.scenario
            .response_for(step)
            .cloned()
            .ok_or_else(|| ProvisionError::Transport(format!("no response scripted for {step}")))
    }
}
