//! Memory Collector
//!
//! Gauges derived from `/proc/meminfo`. Field names become metric names
//! (`machine_memory_MemTotal_bytes`), so the descriptor set is data-driven;
//! descriptors are cached so each is still built only once per process.

use std::collections::HashMap;

use parking_lot::Mutex;
use prometheus::core::Desc;

use crate::collector::HostCollector;
use crate::error::{Error, Result};
use crate::metrics::{new_desc, MetricSink};

const PROC_MEMINFO: &str = "/proc/meminfo";

/// Exposes one gauge per `/proc/meminfo` field.
pub struct MeminfoCollector {
    descs: Mutex<HashMap<String, Desc>>,
}

impl MeminfoCollector {
    pub fn new() -> Result<Self> {
        Ok(Self {
            descs: Mutex::new(HashMap::new()),
        })
    }

    fn desc_for(&self, field: &str, in_bytes: bool) -> Result<Desc> {
        let mut descs = self.descs.lock();
        if let Some(desc) = descs.get(field) {
            return Ok(desc.clone());
        }
        let name = if in_bytes {
            format!("{field}_bytes")
        } else {
            field.to_string()
        };
        let desc = new_desc("memory", &name, "Memory information field from /proc/meminfo.", &[])?;
        descs.insert(field.to_string(), desc.clone());
        Ok(desc)
    }
}

impl HostCollector for MeminfoCollector {
    fn update(&self, sink: &MetricSink) -> Result<()> {
        let raw = std::fs::read_to_string(PROC_MEMINFO)?;
        for field in parse_meminfo(&raw)? {
            let desc = self.desc_for(&field.name, field.in_bytes)?;
            sink.const_gauge(&desc, field.value, &[])?;
        }
        Ok(())
    }
}

#[derive(Debug, PartialEq)]
pub(crate) struct MeminfoField {
    /// Sanitized field name, valid as a metric-name fragment.
    pub name: String,
    /// Value, converted to bytes when the source is in kB.
    pub value: f64,
    pub in_bytes: bool,
}

pub(crate) fn parse_meminfo(raw: &str) -> Result<Vec<MeminfoField>> {
    let mut fields = Vec::new();
    for line in raw.lines() {
        let mut parts = line.split_whitespace();
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };
        let value: f64 = value.parse().map_err(|_| Error::ProcParse {
            path: PROC_MEMINFO.to_string(),
            reason: format!("non-numeric value in '{line}'"),
        })?;
        let in_bytes = parts.next() == Some("kB");

        let name: String = key
            .trim_end_matches(':')
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();

        fields.push(MeminfoField {
            name,
            value: if in_bytes { value * 1024.0 } else { value },
            in_bytes,
        });
    }
    Ok(fields)
}
