//! Exporter Configuration
//!
//! Process-wide configuration: which listen endpoints to expose and which
//! metric domains to enable. The configuration is read exactly once by the
//! embedding program and published through a one-shot barrier; domain
//! adapters block on the barrier before consulting the feature gate.

use std::path::Path;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::{Error, Result};

/// Exporter configuration.
///
/// Mirrors the `health.*` options of the embedding program's config tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Listen addresses (host:port) for the exposition server, in order.
    #[serde(default)]
    pub endpoints: Vec<String>,

    /// Enabled metric-domain tags, matched case-insensitively (e.g. "GPU").
    #[serde(default)]
    pub metrics: Vec<String>,
}

impl HealthConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml(&raw)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(raw: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Feature gate: true iff some configured metrics entry equals `name`
    /// ignoring case.
    pub fn capture_metric(&self, name: &str) -> bool {
        self.metrics
            .iter()
            .any(|tag| tag.eq_ignore_ascii_case(name))
    }
}

// =============================================================================
// One-Shot Configuration Cell
// =============================================================================

/// Read-once configuration slot with a publication barrier.
///
/// `publish` succeeds exactly once; every `wait` call after publication
/// returns immediately. Waiters that arrive before publication suspend until
/// the barrier fires.
#[derive(Debug)]
pub struct ConfigCell {
    slot: watch::Sender<Option<Arc<HealthConfig>>>,
}

impl ConfigCell {
    /// Create an empty, unpublished cell.
    pub fn new() -> Self {
        let (slot, _) = watch::channel(None);
        Self { slot }
    }

    /// Publish the configuration, firing the barrier.
    ///
    /// Fails with [`Error::ConfigAlreadyPublished`] on any call after the
    /// first.
    pub fn publish(&self, config: HealthConfig) -> Result<()> {
        let mut incoming = Some(Arc::new(config));
        let stored = self.slot.send_if_modified(|current| {
            if current.is_none() {
                *current = incoming.take();
                true
            } else {
                false
            }
        });
        if stored {
            Ok(())
        } else {
            Err(Error::ConfigAlreadyPublished)
        }
    }

    /// Block until the configuration has been published, then return it.
    pub async fn wait(&self) -> Arc<HealthConfig> {
        let mut rx = self.slot.subscribe();
        // The sender lives inside self, so the channel cannot close while we
        // hold &self.
        let guard = rx
            .wait_for(|slot| slot.is_some())
            .await
            .expect("config cell sender dropped while waiting");
        guard
            .as_ref()
            .map(Arc::clone)
            .expect("config cell observed ready without a value")
    }

    /// Non-blocking read; `None` until published.
    pub fn get(&self) -> Option<Arc<HealthConfig>> {
        self.slot.borrow().as_ref().map(Arc::clone)
    }
}

impl Default for ConfigCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-global configuration cell for embedding contexts that need one.
///
/// Library consumers that prefer explicit dependency passing can construct
/// their own [`ConfigCell`] and hand it to the domain adapters instead.
pub static CONFIG: Lazy<ConfigCell> = Lazy::new(ConfigCell::new);

// =============================================================================
// Tests
// =============================================================================
