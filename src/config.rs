//! Admission webhook configuration model
//!
//! Mutating and validating webhook configurations share the same shape: a
//! cluster-scoped object holding an ordered list of named webhooks, each with
//! a `clientConfig` carrying the CA bundle used to verify the webhook server.
//! [`WebhookConfiguration`] exposes that shared shape so the patcher can work
//! on either kind.

use std::fmt::Debug;

use k8s_openapi::api::admissionregistration::v1::{
    MutatingWebhookConfiguration, ValidatingWebhookConfiguration, WebhookClientConfig,
};
use k8s_openapi::ByteString;
use kube::Resource;
use serde::{de::DeserializeOwned, Serialize};

/// A Kubernetes object holding a list of admission webhook entries
pub trait WebhookConfiguration:
    Resource<DynamicType = ()>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// Client configs of every entry named `webhook_name`, in entry order
    ///
    /// Entry names are not unique within a configuration, so any number of
    /// client configs may be returned.
    fn client_configs_mut(&mut self, webhook_name: &str) -> Vec<&mut WebhookClientConfig>;

    /// Names of all entries, in entry order
    fn webhook_names(&self) -> Vec<&str>;

    /// Overwrite the CA bundle of every entry named `webhook_name`
    ///
    /// Returns the number of entries that were updated. Nothing else on the
    /// entries is touched.
    fn set_ca_bundle(&mut self, webhook_name: &str, ca_bundle: &[u8]) -> usize {
        let configs = self.client_configs_mut(webhook_name);
        let matched = configs.len();
        for client_config in configs {
            client_config.ca_bundle = Some(ByteString(ca_bundle.to_vec()));
        }
        matched
    }
}

macro_rules! impl_webhook_configuration {
    ($config:ty) => {
        impl WebhookConfiguration for $config {
            fn client_configs_mut(&mut self, webhook_name: &str) -> Vec<&mut WebhookClientConfig> {
                self.webhooks
                    .iter_mut()
                    .flatten()
                    .filter(|webhook| webhook.name == webhook_name)
                    .map(|webhook| &mut webhook.client_config)
                    .collect()
            }

            fn webhook_names(&self) -> Vec<&str> {
                self.webhooks
                    .iter()
                    .flatten()
                    .map(|webhook| webhook.name.as_str())
                    .collect()
            }
        }
    };
}

impl_webhook_configuration!(MutatingWebhookConfiguration);
impl_webhook_configuration!(ValidatingWebhookConfiguration);
