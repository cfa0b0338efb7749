//! Patching realistic webhook configurations held in a `MemoryStore`.

use k8s_openapi::api::admissionregistration::v1::{
    MutatingWebhookConfiguration, ValidatingWebhookConfiguration,
};
use k8s_openapi::ByteString;
use serde_json::json;
use webhook_ca_patcher::{patch_ca_bundle, MemoryStore, WebhookConfigStore};

const PEM: &[u8] =
    b"-----BEGIN CERTIFICATE-----\nMIIBszCCAVmgAwIBAgIUfake\n-----END CERTIFICATE-----\n";

fn sidecar_injector() -> MutatingWebhookConfiguration {
    serde_json::from_value(json!({
        "apiVersion": "admissionregistration.k8s.io/v1",
        "kind": "MutatingWebhookConfiguration",
        "metadata": {
            "name": "sidecar-injector",
            "labels": { "app": "sidecar-injector" }
        },
        "webhooks": [
            {
                "name": "namespace.sidecar-injector.io",
                "admissionReviewVersions": ["v1", "v1beta1"],
                "sideEffects": "None",
                "failurePolicy": "Fail",
                "clientConfig": {
                    "service": {
                        "name": "sidecar-injector",
                        "namespace": "mesh-system",
                        "path": "/inject",
                        "port": 443
                    },
                    "caBundle": "b2xkIENB"
                },
                "rules": [{
                    "operations": ["CREATE"],
                    "apiGroups": [""],
                    "apiVersions": ["v1"],
                    "resources": ["pods"]
                }],
                "namespaceSelector": {
                    "matchLabels": { "sidecar-injection": "enabled" }
                }
            },
            {
                "name": "object.sidecar-injector.io",
                "admissionReviewVersions": ["v1"],
                "sideEffects": "None",
                "clientConfig": {
                    "url": "https://injector.example.com/inject"
                }
            },
            {
                "name": "namespace.sidecar-injector.io",
                "admissionReviewVersions": ["v1"],
                "sideEffects": "NoneOnDryRun",
                "timeoutSeconds": 5,
                "clientConfig": {
                    "service": {
                        "name": "sidecar-injector-canary",
                        "namespace": "mesh-system"
                    }
                }
            }
        ]
    }))
    .unwrap()
}

#[tokio::test]
async fn only_ca_bundles_of_matching_entries_change() {
    let store = MemoryStore::with_objects([sidecar_injector()]);
    let before = store.snapshot("sidecar-injector").await.unwrap();

    patch_ca_bundle(
        &store,
        "sidecar-injector",
        "namespace.sidecar-injector.io",
        PEM,
    )
    .await
    .unwrap();

    let after = store.snapshot("sidecar-injector").await.unwrap();
    let before_hooks = before.webhooks.unwrap();
    let after_hooks = after.webhooks.unwrap();
    assert_eq!(before_hooks.len(), after_hooks.len());

    for (old, new) in before_hooks.iter().zip(&after_hooks) {
        assert_eq!(old.name, new.name, "entry order must be preserved");
        if new.name == "namespace.sidecar-injector.io" {
            assert_eq!(new.client_config.ca_bundle, Some(ByteString(PEM.to_vec())));
            let mut restored = new.clone();
            restored.client_config.ca_bundle = old.client_config.ca_bundle.clone();
            assert_eq!(&restored, old);
        } else {
            assert_eq!(new, old);
        }
    }

    assert_eq!(after.metadata.labels, before.metadata.labels);
    assert_eq!(after.metadata.name, before.metadata.name);
}

#[tokio::test]
async fn unknown_entry_leaves_store_untouched() {
    let store = MemoryStore::with_objects([sidecar_injector()]);
    let before = store.snapshot("sidecar-injector").await.unwrap();

    let err = patch_ca_bundle(&store, "sidecar-injector", "missing.example.com", PEM)
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("missing.example.com"), "got: {}", message);
    assert!(message.contains("sidecar-injector"), "got: {}", message);
    assert!(message.contains("not found"), "got: {}", message);
    assert_eq!(store.snapshot("sidecar-injector").await.unwrap(), before);
    assert_eq!(store.updates(), 0);
}

#[tokio::test]
async fn repeated_patch_converges() {
    let store = MemoryStore::with_objects([sidecar_injector()]);

    for _ in 0..2 {
        patch_ca_bundle(
            &store,
            "sidecar-injector",
            "object.sidecar-injector.io",
            PEM,
        )
        .await
        .unwrap();
    }

    let stored = store.get("sidecar-injector").await.unwrap();
    let bundles: Vec<_> = stored
        .webhooks
        .unwrap()
        .into_iter()
        .map(|webhook| webhook.client_config.ca_bundle)
        .collect();
    assert_eq!(
        bundles,
        vec![
            Some(ByteString(b"old CA".to_vec())),
            Some(ByteString(PEM.to_vec())),
            None,
        ]
    );
    assert_eq!(store.updates(), 2);
}

#[tokio::test]
async fn validating_configuration_with_duplicates() {
    let config: ValidatingWebhookConfiguration = serde_json::from_value(json!({
        "apiVersion": "admissionregistration.k8s.io/v1",
        "kind": "ValidatingWebhookConfiguration",
        "metadata": { "name": "config1" },
        "webhooks": [
            {
                "name": "webhook1",
                "admissionReviewVersions": ["v1"],
                "sideEffects": "None",
                "clientConfig": {}
            },
            {
                "name": "webhook1",
                "admissionReviewVersions": ["v1"],
                "sideEffects": "None",
                "clientConfig": {}
            }
        ]
    }))
    .unwrap();
    let store = MemoryStore::with_objects([config]);

    patch_ca_bundle(&store, "config1", "webhook1", b"fake CA")
        .await
        .unwrap();

    let stored = store.snapshot("config1").await.unwrap();
    for webhook in stored.webhooks.unwrap() {
        assert_eq!(
            webhook.client_config.ca_bundle,
            Some(ByteString(b"fake CA".to_vec()))
        );
    }
}
