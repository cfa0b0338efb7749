//! Webhook configuration stores
//!
//! The patcher only needs two capabilities from wherever configurations
//! live: fetch one by name and write one back whole. [`KubeStore`] backs
//! them with the Kubernetes API, [`MemoryStore`] with a local map.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use kube::api::{Api, PostParams};
use kube::{Client, ResourceExt};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::config::WebhookConfiguration;
use crate::error::{Error, Result};

/// Get-by-name and update-whole-resource access to webhook configurations
#[async_trait]
pub trait WebhookConfigStore: Send + Sync {
    type Config: WebhookConfiguration;

    /// Fetch a configuration by name
    ///
    /// Returns [`Error::ConfigNotFound`] when no configuration has that name.
    async fn get(&self, name: &str) -> Result<Self::Config>;

    /// Replace the stored configuration with `config`, returning what was stored
    async fn update(&self, config: &Self::Config) -> Result<Self::Config>;
}

/// Store backed by the cluster-scoped Kubernetes API for `K`
pub struct KubeStore<K: WebhookConfiguration> {
    api: Api<K>,
}

impl<K: WebhookConfiguration> KubeStore<K> {
    pub fn new(client: Client) -> Self {
        Self {
            api: Api::all(client),
        }
    }
}

#[async_trait]
impl<K: WebhookConfiguration> WebhookConfigStore for KubeStore<K> {
    type Config = K;

    #[instrument(skip(self))]
    async fn get(&self, name: &str) -> Result<K> {
        self.api
            .get_opt(name)
            .await?
            .ok_or_else(|| Error::ConfigNotFound(name.to_string()))
    }

    #[instrument(skip(self, config), fields(name = %config.name_any()))]
    async fn update(&self, config: &K) -> Result<K> {
        let name = config.meta().name.clone().ok_or_else(|| {
            Error::ConfigError("webhook configuration has no metadata.name".to_string())
        })?;

        // replace carries the fetched resourceVersion, so a concurrent
        // writer makes this fail with a 409 rather than being overwritten
        let stored = self
            .api
            .replace(&name, &PostParams::default(), config)
            .await?;
        debug!(
            resource_version = ?stored.meta().resource_version,
            "Replaced webhook configuration"
        );
        Ok(stored)
    }
}

/// In-process store keyed by configuration name
///
/// Every insert and update stamps a fresh `resourceVersion`, and updates
/// carrying a stale version are rejected the way the API server rejects
/// them. Read and update calls are counted.
pub struct MemoryStore<K: WebhookConfiguration> {
    objects: RwLock<BTreeMap<String, K>>,
    version: AtomicU64,
    reads: AtomicUsize,
    updates: AtomicUsize,
}

impl<K: WebhookConfiguration> Default for MemoryStore<K> {
    fn default() -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            version: AtomicU64::new(0),
            reads: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
        }
    }
}

impl<K: WebhookConfiguration> MemoryStore<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with `objects`
    pub fn with_objects(objects: impl IntoIterator<Item = K>) -> Self {
        let store = Self::default();
        let map = objects
            .into_iter()
            .map(|mut object| {
                store.stamp(&mut object);
                (object.name_any(), object)
            })
            .collect();
        Self {
            objects: RwLock::new(map),
            ..store
        }
    }

    /// Insert or overwrite an object without a version check
    pub async fn insert(&self, mut object: K) {
        self.stamp(&mut object);
        self.objects.write().await.insert(object.name_any(), object);
    }

    /// Current stored copy of `name`, without counting as a read
    pub async fn snapshot(&self, name: &str) -> Option<K> {
        self.objects.read().await.get(name).cloned()
    }

    /// Number of `get` calls served
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    /// Number of `update` calls received, successful or not
    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::Relaxed)
    }

    fn stamp(&self, object: &mut K) {
        let version = self.version.fetch_add(1, Ordering::Relaxed) + 1;
        object.meta_mut().resource_version = Some(version.to_string());
    }
}

#[async_trait]
impl<K: WebhookConfiguration> WebhookConfigStore for MemoryStore<K> {
    type Config = K;

    async fn get(&self, name: &str) -> Result<K> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.objects
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| Error::ConfigNotFound(name.to_string()))
    }

    async fn update(&self, config: &K) -> Result<K> {
        self.updates.fetch_add(1, Ordering::Relaxed);
        let name = config.meta().name.clone().ok_or_else(|| {
            Error::ConfigError("webhook configuration has no metadata.name".to_string())
        })?;

        let mut objects = self.objects.write().await;
        let current = objects
            .get(&name)
            .ok_or_else(|| Error::ConfigNotFound(name.clone()))?;

        let expected = current.meta().resource_version.as_deref();
        let given = config.meta().resource_version.as_deref();
        if given.is_some() && given != expected {
            return Err(Error::StoreError(format!(
                "conflict updating \"{}\": resource version {} is stale (current {})",
                name,
                given.unwrap_or_default(),
                expected.unwrap_or_default()
            )));
        }

        let mut stored = config.clone();
        self.stamp(&mut stored);
        objects.insert(name, stored.clone());
        Ok(stored)
    }
}
