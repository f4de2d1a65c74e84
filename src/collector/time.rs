//! Time Collector
//!
//! Current system time, useful for detecting clock skew between hosts.

use std::time::{SystemTime, UNIX_EPOCH};

use prometheus::core::Desc;

use crate::collector::HostCollector;
use crate::error::Result;
use crate::metrics::{new_desc, MetricSink};

/// Exposes `machine_time_seconds`.
pub struct TimeCollector {
    desc: Desc,
}

impl TimeCollector {
    pub fn new() -> Result<Self> {
        Ok(Self {
            desc: new_desc(
                "time",
                "seconds",
                "System time in seconds since epoch (1970).",
                &[],
            )?,
        })
    }
}

impl HostCollector for TimeCollector {
    fn update(&self, sink: &MetricSink) -> Result<()> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        sink.const_gauge(&self.desc, now, &[])
    }
}
