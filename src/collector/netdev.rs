//! Network Device Collector
//!
//! Per-interface receive and transmit counters from `/proc/net/dev`.

use prometheus::core::Desc;

use crate::collector::HostCollector;
use crate::error::{Error, Result};
use crate::metrics::{new_desc, MetricSink};

const PROC_NET_DEV: &str = "/proc/net/dev";

/// Exposes `machine_network_{receive,transmit}_{bytes,packets}_total{device}`.
pub struct NetdevCollector {
    receive_bytes: Desc,
    receive_packets: Desc,
    transmit_bytes: Desc,
    transmit_packets: Desc,
}

impl NetdevCollector {
    pub fn new() -> Result<Self> {
        let desc = |name, help| new_desc("network", name, help, &["device"]);
        Ok(Self {
            receive_bytes: desc("receive_bytes_total", "Network device bytes received.")?,
            receive_packets: desc("receive_packets_total", "Network device packets received.")?,
            transmit_bytes: desc("transmit_bytes_total", "Network device bytes transmitted.")?,
            transmit_packets: desc(
                "transmit_packets_total",
                "Network device packets transmitted.",
            )?,
        })
    }
}

impl HostCollector for NetdevCollector {
    fn update(&self, sink: &MetricSink) -> Result<()> {
        let raw = std::fs::read_to_string(PROC_NET_DEV)?;
        for stats in parse_net_dev(&raw)? {
            let device = stats.device.as_str();
            sink.const_counter(&self.receive_bytes, stats.receive_bytes, &[device])?;
            sink.const_counter(&self.receive_packets, stats.receive_packets, &[device])?;
            sink.const_counter(&self.transmit_bytes, stats.transmit_bytes, &[device])?;
            sink.const_counter(&self.transmit_packets, stats.transmit_packets, &[device])?;
        }
        Ok(())
    }
}

#[derive(Debug, PartialEq)]
pub(crate) struct InterfaceStats {
    pub device: String,
    pub receive_bytes: f64,
    pub receive_packets: f64,
    pub transmit_bytes: f64,
    pub transmit_packets: f64,
}

pub(crate) fn parse_net_dev(raw: &str) -> Result<Vec<InterfaceStats>> {
    let mut interfaces = Vec::new();
    // First two lines are column headers.
    for line in raw.lines().skip(2) {
        let Some((device, counters)) = line.split_once(':') else {
            continue;
        };
        let fields: Vec<&str> = counters.split_whitespace().collect();
        // 8 receive columns then 8 transmit columns.
        if fields.len() < 16 {
            return Err(Error::ProcParse {
                path: PROC_NET_DEV.to_string(),
                reason: format!("short row for device '{}'", device.trim()),
            });
        }
        let parse = |field: &str| -> Result<f64> {
            field.parse().map_err(|_| Error::ProcParse {
                path: PROC_NET_DEV.to_string(),
                reason: format!("non-numeric counter '{field}'"),
            })
        };
        interfaces.push(InterfaceStats {
            device: device.trim().to_string(),
            receive_bytes: parse(fields[0])?,
            receive_packets: parse(fields[1])?,
            transmit_bytes: parse(fields[8])?,
            transmit_packets: parse(fields[9])?,
        });
    }
    Ok(interfaces)
}
