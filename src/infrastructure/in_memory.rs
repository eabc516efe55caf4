use crate::domain::host::Host;
use crate::domain::message::ErrorMessage;
use crate::domain::ports::{Notifier, PreferenceStore, PurchaseReconciler, VpnConnection};
use crate::domain::preferences::StoredPreferences;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

/// A thread-safe in-memory preference store.
///
/// Clones share the same underlying preferences, so a test can keep a handle
/// and inspect what the provisioner wrote.
#[derive(Default, Clone)]
pub struct InMemoryPreferenceStore {
    prefs: Arc<RwLock<StoredPreferences>>,
}

impl InMemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(prefs: StoredPreferences) -> Self {
        Self {
            prefs: Arc::new(RwLock::new(prefs)),
        }
    }
}

#[async_trait]
impl PreferenceStore for InMemoryPreferenceStore {
    async fn load(&self) -> Result<StoredPreferences> {
        Ok(self.prefs.read().await.clone())
    }

    async fn save(&self, prefs: StoredPreferences) -> Result<()> {
        *self.prefs.write().await = prefs;
        Ok(())
    }

    async fn set_server_region(&self, region: &str) -> Result<()> {
        self.prefs.write().await.server_region = region.to_string();
        Ok(())
    }

    async fn reset_purchase(&self) -> Result<()> {
        self.prefs.write().await.reset_purchase();
        Ok(())
    }
}

/// Connection flag with no real tunnel behind it.
#[derive(Default, Clone)]
pub struct InMemoryConnection {
    connected: Arc<AtomicBool>,
}

impl InMemoryConnection {
    pub fn new(connected: bool) -> Self {
        Self {
            connected: Arc::new(AtomicBool::new(connected)),
        }
    }
}

#[async_trait]
impl VpnConnection for InMemoryConnection {
    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn stop(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Counts reconciliation passes.
#[derive(Default, Clone)]
pub struct CountingReconciler {
    passes: Arc<AtomicUsize>,
}

impl CountingReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn passes(&self) -> usize {
        self.passes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PurchaseReconciler for CountingReconciler {
    async fn reconcile(&self) -> Result<()> {
        self.passes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct NotifierLog {
    errors: Vec<ErrorMessage>,
    hosts: Vec<Host>,
    dismissals: usize,
}

/// Notifier that records what would have been shown.
#[derive(Clone)]
pub struct RecordingNotifier {
    alive: Arc<AtomicBool>,
    log: Arc<Mutex<NotifierLog>>,
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            alive: Arc::new(AtomicBool::new(true)),
            log: Arc::default(),
        }
    }

    /// Simulates the hosting UI being destroyed.
    pub fn tear_down(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    pub fn errors(&self) -> Vec<ErrorMessage> {
        self.log.lock().map(|l| l.errors.clone()).unwrap_or_default()
    }

    pub fn hosts(&self) -> Vec<Host> {
        self.log.lock().map(|l| l.hosts.clone()).unwrap_or_default()
    }

    pub fn dismissals(&self) -> usize {
        self.log.lock().map(|l| l.dismissals).unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn show_error(&self, message: &ErrorMessage) {
        if let Ok(mut log) = self.log.lock() {
            log.errors.push(message.clone());
        }
    }

    fn show_host(&self, host: &Host) {
        if let Ok(mut log) = self.log.lock() {
            log.hosts.push(host.clone());
        }
    }

    fn dismiss_progress(&self) {
        if let Ok(mut log) = self.log.lock() {
            log.dismissals += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::preferences::AUTOMATIC_REGION;

    #[tokio::test]
    async fn test_in_memory_preference_store() {
        let store = InMemoryPreferenceStore::new();
        assert_eq!(store.load().await.unwrap(), StoredPreferences::default());

        let prefs = StoredPreferences {
            purchase_token: "token".into(),
            product_id: "yearly".into(),
            purchase_expiry: 7,
            is_subscription_purchase: true,
            server_region: AUTOMATIC_REGION.into(),
        };
        store.save(prefs.clone()).await.unwrap();
        store.set_server_region("eu-west").await.unwrap();

        let shared = store.clone();
        let loaded = shared.load().await.unwrap();
        assert_eq!(loaded.server_region, "eu-west");
        assert_eq!(loaded.purchase_token, "token");

        store.reset_purchase().await.unwrap();
        let loaded = shared.load().await.unwrap();
        assert_eq!(loaded.purchase_token, "");
        assert!(!loaded.is_subscription_purchase);
        assert_eq!(loaded.server_region, "eu-west");
    }

    #[tokio::test]
    async fn test_in_memory_connection_stop() {
        let connection = InMemoryConnection::new(true);
        assert!(connection.is_connected().await);
        connection.stop().await.unwrap();
        assert!(!connection.is_connected().await);
    }

    #[test]
    fn test_recording_notifier_tear_down() {
        let notifier = RecordingNotifier::new();
        let handle = notifier.clone();
        assert!(notifier.is_alive());
        handle.tear_down();
        assert!(!notifier.is_alive());

        notifier.show_error(&ErrorMessage::timezones_failed());
        notifier.dismiss_progress();
        assert_eq!(handle.errors(), vec![ErrorMessage::timezones_failed()]);
        assert_eq!(handle.dismissals(), 1);
    }
}
