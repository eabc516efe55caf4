use vpn_provision::domain::payload::RemoteResponse;
use vpn_provision::domain::pipeline::RemoteCall;
use vpn_provision::domain::ports::{PreferenceStoreBox, RemoteGatewayBox};
use vpn_provision::infrastructure::in_memory::InMemoryPreferenceStore;
use vpn_provision::infrastructure::scripted::{Scenario, ScriptedGateway};

#[tokio::test]
async fn test_ports_as_trait_objects() {
    let store: PreferenceStoreBox = Box::new(InMemoryPreferenceStore::new());
    let gateway: RemoteGatewayBox = Box::new(ScriptedGateway::new(Scenario::happy_path()));

    // Verify Send + Sync by spawning tasks
    let store_handle = tokio::spawn(async move {
        store.set_server_region("eu-west").await.unwrap();
        store.load().await.unwrap()
    });

    let gateway_handle = tokio::spawn(async move {
        gateway
            .call(&RemoteCall::VerifySubscriberCredential)
            .await
            .unwrap()
    });

    let prefs = store_handle.await.unwrap();
    assert_eq!(prefs.server_region, "eu-west");

    let response = gateway_handle.await.unwrap();
    assert_eq!(response, RemoteResponse::ok("subscriber-credential"));
}
