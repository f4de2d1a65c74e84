//! CPU Collector
//!
//! Per-cpu, per-mode time counters from `/proc/stat`.

use prometheus::core::Desc;

use crate::collector::HostCollector;
use crate::error::{Error, Result};
use crate::metrics::{new_desc, MetricSink};

const PROC_STAT: &str = "/proc/stat";

/// Kernel tick length in seconds (USER_HZ is 100 on Linux).
const TICK_SECONDS: f64 = 0.01;

const MODES: [&str; 8] = [
    "user", "nice", "system", "idle", "iowait", "irq", "softirq", "steal",
];

/// Exposes `machine_cpu_seconds_total{cpu, mode}`.
pub struct CpuCollector {
    desc: Desc,
}

impl CpuCollector {
    pub fn new() -> Result<Self> {
        Ok(Self {
            desc: new_desc(
                "cpu",
                "seconds_total",
                "Seconds the cpus spent in each mode.",
                &["cpu", "mode"],
            )?,
        })
    }
}

impl HostCollector for CpuCollector {
    fn update(&self, sink: &MetricSink) -> Result<()> {
        let raw = std::fs::read_to_string(PROC_STAT)?;
        for line in parse_proc_stat(&raw)? {
            for (mode, seconds) in MODES.iter().zip(line.seconds) {
                sink.const_counter(&self.desc, seconds, &[&line.cpu, mode])?;
            }
        }
        Ok(())
    }
}

/// Per-cpu time breakdown, in seconds.
#[derive(Debug, PartialEq)]
pub(crate) struct CpuLine {
    pub cpu: String,
    pub seconds: [f64; 8],
}

/// Parse the `cpuN` rows of a `/proc/stat` dump. The aggregate `cpu` row is
/// skipped; consumers sum over the label instead.
pub(crate) fn parse_proc_stat(raw: &str) -> Result<Vec<CpuLine>> {
    let mut lines = Vec::new();
    for line in raw.lines() {
        let mut fields = line.split_whitespace();
        let Some(tag) = fields.next() else { continue };
        if !tag.starts_with("cpu") || tag == "cpu" {
            continue;
        }

        let mut seconds = [0.0; 8];
        for slot in &mut seconds {
            let field = fields.next().ok_or_else(|| Error::ProcParse {
                path: PROC_STAT.to_string(),
                reason: format!("truncated row '{tag}'"),
            })?;
            let ticks: f64 = field.parse().map_err(|_| Error::ProcParse {
                path: PROC_STAT.to_string(),
                reason: format!("non-numeric field '{field}' in row '{tag}'"),
            })?;
            *slot = ticks * TICK_SECONDS;
        }
        lines.push(CpuLine {
            cpu: tag.to_string(),
            seconds,
        });
    }
    Ok(lines)
}
