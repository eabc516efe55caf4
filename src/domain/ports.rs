use super::host::Host;
use super::message::ErrorMessage;
use super::payload::RemoteResponse;
use super::pipeline::RemoteCall;
use super::preferences::StoredPreferences;
use crate::error::Result;
use async_trait::async_trait;

/// Transport for the provisioning service calls.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    async fn call(&self, call: &RemoteCall) -> Result<RemoteResponse>;
}

/// Persisted key-value preferences.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn load(&self) -> Result<StoredPreferences>;
    async fn save(&self, prefs: StoredPreferences) -> Result<()>;
    async fn set_server_region(&self, region: &str) -> Result<()>;
    /// Clears all purchase fields in a single write.
    async fn reset_purchase(&self) -> Result<()>;
}

/// The device's VPN connection, as far as provisioning cares about it.
#[async_trait]
pub trait VpnConnection: Send + Sync {
    async fn is_connected(&self) -> bool;
    async fn stop(&self) -> Result<()>;
}

/// Re-validates purchases still pending with the store.
#[async_trait]
pub trait PurchaseReconciler: Send + Sync {
    async fn reconcile(&self) -> Result<()>;
}

/// The UI surface hosting the attempt.
pub trait Notifier: Send + Sync {
    /// False once the hosting UI is gone; completions are then dropped.
    fn is_alive(&self) -> bool;
    fn show_error(&self, message: &ErrorMessage);
    fn show_host(&self, host: &Host);
    fn dismiss_progress(&self);
}

pub type RemoteGatewayBox = Box<dyn RemoteGateway>;
pub type PreferenceStoreBox = Box<dyn PreferenceStore>;
pub type VpnConnectionBox = Box<dyn VpnConnection>;
pub type PurchaseReconcilerBox = Box<dyn PurchaseReconciler>;
pub type NotifierBox = Box<dyn Notifier>;

pub type PreferenceStoreFactory = Box<dyn Fn() -> PreferenceStoreBox + Send + Sync>;
