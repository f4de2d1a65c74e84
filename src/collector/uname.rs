//! Uname Collector
//!
//! Kernel and host identification labels from `/proc/sys/kernel`.

use std::path::{Path, PathBuf};

use prometheus::core::Desc;

use crate::collector::HostCollector;
use crate::error::Result;
use crate::metrics::{new_desc, MetricSink};

const KERNEL_ROOT: &str = "/proc/sys/kernel";

/// Exposes `machine_uname_info{sysname, release, version, nodename} 1`.
pub struct UnameCollector {
    desc: Desc,
    root: PathBuf,
}

impl UnameCollector {
    pub fn new() -> Result<Self> {
        Self::with_root(KERNEL_ROOT)
    }

    fn with_root(root: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            desc: new_desc(
                "uname",
                "info",
                "Labeled system information as provided by the uname system call.",
                &["sysname", "release", "version", "nodename"],
            )?,
            root: root.into(),
        })
    }

    fn read_field(root: &Path, name: &str) -> String {
        std::fs::read_to_string(root.join(name))
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    }
}

impl HostCollector for UnameCollector {
    fn update(&self, sink: &MetricSink) -> Result<()> {
        let sysname = Self::read_field(&self.root, "ostype");
        let release = Self::read_field(&self.root, "osrelease");
        let version = Self::read_field(&self.root, "version");
        let nodename = Self::read_field(&self.root, "hostname");
        sink.const_gauge(&self.desc, 1.0, &[&sysname, &release, &version, &nodename])
    }
}
