//! Entropy Collector
//!
//! Available entropy from `/proc/sys/kernel/random/entropy_avail`.

use prometheus::core::Desc;

use crate::collector::HostCollector;
use crate::error::{Error, Result};
use crate::metrics::{new_desc, MetricSink};

const PROC_ENTROPY: &str = "/proc/sys/kernel/random/entropy_avail";

/// Exposes `machine_entropy_available_bits`.
pub struct EntropyCollector {
    desc: Desc,
}

impl EntropyCollector {
    pub fn new() -> Result<Self> {
        Ok(Self {
            desc: new_desc("entropy", "available_bits", "Bits of available entropy.", &[])?,
        })
    }
}

impl HostCollector for EntropyCollector {
    fn update(&self, sink: &MetricSink) -> Result<()> {
        let raw = std::fs::read_to_string(PROC_ENTROPY)?;
        let bits: f64 = raw.trim().parse().map_err(|_| Error::ProcParse {
            path: PROC_ENTROPY.to_string(),
            reason: format!("non-numeric content '{}'", raw.trim()),
        })?;
        sink.const_gauge(&self.desc, bits, &[])
    }
}
