//! GPU Domain Adapter
//!
//! Probes the NVIDIA kernel driver through procfs and, when present, exposes
//! one info sample per device. On hosts without the driver the collector
//! fails to construct; the adapter layer logs and disables the domain.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use prometheus::core::{Collector, Desc};
use prometheus::{proto, Registry};
use tracing::warn;

use crate::adapters::DomainAdapter;
use crate::error::{Error, Result};
use crate::metrics::{const_metric, merge_families, MetricKind};

const NVIDIA_PROC_DIR: &str = "driver/nvidia";

/// Accelerator metrics domain. Gated by the `GPU` tag.
#[derive(Debug, Default)]
pub struct GpuAdapter {
    proc_root: Option<PathBuf>,
}

#[async_trait]
impl DomainAdapter for GpuAdapter {
    fn name(&self) -> &'static str {
        "gpu"
    }

    fn gate_tag(&self) -> &'static str {
        "GPU"
    }

    async fn register(&self, registry: &Registry) -> Result<()> {
        let collector = match &self.proc_root {
            Some(root) => NvidiaCollector::with_proc_root(root.clone())?,
            None => NvidiaCollector::new()?,
        };
        match registry.register(Box::new(collector)) {
            Ok(()) => Ok(()),
            Err(prometheus::Error::AlreadyReg) => Err(Error::AlreadyRegistered),
            Err(e) => Err(Error::Prometheus(e)),
        }
    }
}

// =============================================================================
// NVIDIA Collector
// =============================================================================

/// Reports `machine_gpu_info{minor,model}` for each device the driver knows.
///
/// Device discovery happens per scrape, so hot-plugged devices appear without
/// a restart. Construction only verifies the driver directory exists.
#[derive(Debug)]
pub struct NvidiaCollector {
    desc: Desc,
    gpus_dir: PathBuf,
}

impl NvidiaCollector {
    /// Probe `/proc` for the NVIDIA driver.
    pub fn new() -> Result<Self> {
        Self::with_proc_root(PathBuf::from("/proc"))
    }

    /// Probe an alternate procfs root.
    pub fn with_proc_root(proc_root: PathBuf) -> Result<Self> {
        let driver_dir = proc_root.join(NVIDIA_PROC_DIR);
        if !driver_dir.is_dir() {
            return Err(Error::CollectorUnavailable(format!(
                "nvidia driver not present at {}",
                driver_dir.display()
            )));
        }
        Ok(Self {
            desc: crate::metrics::new_desc(
                "gpu",
                "info",
                "Constant 1 labeled by GPU minor number and model name.",
                &["minor", "model"],
            )?,
            gpus_dir: driver_dir.join("gpus"),
        })
    }

    fn device_families(&self) -> Vec<proto::MetricFamily> {
        let entries = match fs::read_dir(&self.gpus_dir) {
            Ok(entries) => entries,
            Err(error) => {
                warn!(%error, dir = %self.gpus_dir.display(), "failed to list gpu devices");
                return Vec::new();
            }
        };

        let mut families = Vec::new();
        for entry in entries.flatten() {
            let minor = entry.file_name().to_string_lossy().into_owned();
            let model = read_model(&entry.path().join("information"));
            match const_metric(&self.desc, MetricKind::Gauge, 1.0, &[&minor, &model]) {
                Ok(family) => families.push(family),
                Err(error) => warn!(%error, minor, "failed to build gpu info sample"),
            }
        }
        merge_families(families)
    }
}

impl Collector for NvidiaCollector {
    fn desc(&self) -> Vec<&Desc> {
        vec![&self.desc]
    }

    fn collect(&self) -> Vec<proto::MetricFamily> {
        self.device_families()
    }
}

/// Extract the `Model:` field from a device information file.
fn read_model(path: &Path) -> String {
    let Ok(raw) = fs::read_to_string(path) else {
        return String::new();
    };
    raw.lines()
        .find_map(|line| line.strip_prefix("Model:"))
        .map(|model| model.trim().to_string())
        .unwrap_or_default()
}
