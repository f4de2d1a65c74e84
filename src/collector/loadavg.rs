//! Load Average Collector
//!
//! 1, 5, and 15 minute load averages from `/proc/loadavg`.

use prometheus::core::Desc;

use crate::collector::HostCollector;
use crate::error::{Error, Result};
use crate::metrics::{new_desc, MetricSink};

const PROC_LOADAVG: &str = "/proc/loadavg";

/// Exposes `machine_load1`, `machine_load5`, and `machine_load15`.
pub struct LoadavgCollector {
    descs: [Desc; 3],
}

impl LoadavgCollector {
    pub fn new() -> Result<Self> {
        Ok(Self {
            descs: [
                new_desc("", "load1", "1m load average.", &[])?,
                new_desc("", "load5", "5m load average.", &[])?,
                new_desc("", "load15", "15m load average.", &[])?,
            ],
        })
    }
}

impl HostCollector for LoadavgCollector {
    fn update(&self, sink: &MetricSink) -> Result<()> {
        let raw = std::fs::read_to_string(PROC_LOADAVG)?;
        let loads = parse_loadavg(&raw)?;
        for (desc, load) in self.descs.iter().zip(loads) {
            sink.const_gauge(desc, load, &[])?;
        }
        Ok(())
    }
}

pub(crate) fn parse_loadavg(raw: &str) -> Result<[f64; 3]> {
    let mut fields = raw.split_whitespace();
    let mut loads = [0.0; 3];
    for slot in &mut loads {
        let field = fields.next().ok_or_else(|| Error::ProcParse {
            path: PROC_LOADAVG.to_string(),
            reason: "fewer than three load fields".to_string(),
        })?;
        *slot = field.parse().map_err(|_| Error::ProcParse {
            path: PROC_LOADAVG.to_string(),
            reason: format!("non-numeric load '{field}'"),
        })?;
    }
    Ok(loads)
}
