//! CA bundle patching
//!
//! Installs a CA bundle into every webhook entry with a given name inside a
//! webhook configuration. The configuration is read once, mutated in memory
//! and written back with a single update, so either every matching entry is
//! persisted with the new bundle or none is.

use std::path::Path;

use tracing::{debug, info, instrument};

use crate::config::WebhookConfiguration;
use crate::error::{Error, Result};
use crate::store::WebhookConfigStore;

/// Overwrite the CA bundle of every entry named `webhook_name` in the
/// configuration `config_name`
///
/// Fails with [`Error::ConfigNotFound`] if the configuration does not exist
/// and with [`Error::EntryNotFound`] if no entry carries `webhook_name`.
/// Duplicate entry names are all patched. The bundle is installed as given,
/// without PEM validation. Store failures on write are returned unchanged.
#[instrument(skip(store, ca_bundle), fields(ca_bundle_len = ca_bundle.len()))]
pub async fn patch_ca_bundle<S>(
    store: &S,
    config_name: &str,
    webhook_name: &str,
    ca_bundle: &[u8],
) -> Result<()>
where
    S: WebhookConfigStore + ?Sized,
{
    let mut config = store.get(config_name).await?;

    let matched = config.set_ca_bundle(webhook_name, ca_bundle);
    if matched == 0 {
        debug!(entries = ?config.webhook_names(), "No webhook entry matched");
        return Err(Error::EntryNotFound {
            webhook: webhook_name.to_string(),
            config: config_name.to_string(),
        });
    }

    store.update(&config).await?;
    info!(
        matched,
        "Patched CA bundle of webhook {} in config {}", webhook_name, config_name
    );
    Ok(())
}

/// Patcher bound to one store
pub struct CaBundlePatcher<S> {
    store: S,
}

impl<S: WebhookConfigStore> CaBundlePatcher<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// See [`patch_ca_bundle`]
    pub async fn patch(
        &self,
        config_name: &str,
        webhook_name: &str,
        ca_bundle: &[u8],
    ) -> Result<()> {
        patch_ca_bundle(&self.store, config_name, webhook_name, ca_bundle).await
    }
}

/// Read a CA bundle from disk
///
/// The contents are not parsed. An empty file is rejected, since an empty
/// `caBundle` makes the API server fall back to its system trust roots.
pub async fn load_ca_bundle(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    let bundle = tokio::fs::read(path).await?;
    if bundle.is_empty() {
        return Err(Error::ConfigError(format!(
            "CA bundle file {} is empty",
            path.display()
        )));
    }
    debug!(path = %path.display(), len = bundle.len(), "Loaded CA bundle");
    Ok(bundle)
}
