//! webhook-ca-patcher: CA bundle installation for Kubernetes admission webhooks
//!
//! This crate locates named entries inside a mutating or validating webhook
//! configuration and installs a CA bundle into their client config, writing
//! the configuration back with a single update.

pub mod config;
pub mod error;
pub mod patch;
pub mod store;

pub use crate::config::WebhookConfiguration;
pub use crate::error::{Error, Result};
pub use crate::patch::{load_ca_bundle, patch_ca_bundle, CaBundlePatcher};
pub use crate::store::{KubeStore, MemoryStore, WebhookConfigStore};
