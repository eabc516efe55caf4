#![allow(dead_code)]

use vpn_provision::application::provisioner::{Ports, Provisioner, ProvisionerSettings};
use vpn_provision::domain::host::HostSelection;
use vpn_provision::infrastructure::in_memory::{
    CountingReconciler, InMemoryConnection, InMemoryPreferenceStore, RecordingNotifier,
};
use vpn_provision::infrastructure::scripted::{Scenario, ScriptedGateway};

/// A provisioner wired to in-memory adapters, with handles kept for inspection.
pub struct Harness {
    pub provisioner: Provisioner,
    pub gateway: ScriptedGateway,
    pub store: InMemoryPreferenceStore,
    pub connection: InMemoryConnection,
    pub reconciler: CountingReconciler,
    pub notifier: RecordingNotifier,
}

pub fn harness(scenario: Scenario, device_timezone: &str) -> Harness {
    let gateway = ScriptedGateway::new(scenario.clone());
    let store = InMemoryPreferenceStore::with(scenario.preferences.clone());
    let connection = InMemoryConnection::new(scenario.vpn_connected);
    let reconciler = CountingReconciler::new();
    let notifier = RecordingNotifier::new();

    let provisioner = Provisioner::new(
        Ports {
            gateway: Box::new(gateway.clone()),
            preferences: Box::new(store.clone()),
            connection: Box::new(connection.clone()),
            reconciler: Box::new(reconciler.clone()),
            notifier: Box::new(notifier.clone()),
        },
        ProvisionerSettings {
            device_timezone: device_timezone.to_string(),
            client_public_key: "client-public-key".to_string(),
            host_selection: HostSelection::LeastLoaded,
        },
    );

    Harness {
        provisioner,
        gateway,
        store,
        connection,
        reconciler,
        notifier,
    }
}
