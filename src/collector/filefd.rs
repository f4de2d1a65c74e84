//! File Descriptor Collector
//!
//! Allocated and maximum file handles from `/proc/sys/fs/file-nr`.

use prometheus::core::Desc;

use crate::collector::HostCollector;
use crate::error::{Error, Result};
use crate::metrics::{new_desc, MetricSink};

const PROC_FILE_NR: &str = "/proc/sys/fs/file-nr";

/// Exposes `machine_filefd_allocated` and `machine_filefd_maximum`.
pub struct FileFdCollector {
    allocated: Desc,
    maximum: Desc,
}

impl FileFdCollector {
    pub fn new() -> Result<Self> {
        Ok(Self {
            allocated: new_desc("filefd", "allocated", "File descriptors allocated.", &[])?,
            maximum: new_desc("filefd", "maximum", "File descriptor limit.", &[])?,
        })
    }
}

impl HostCollector for FileFdCollector {
    fn update(&self, sink: &MetricSink) -> Result<()> {
        let raw = std::fs::read_to_string(PROC_FILE_NR)?;
        let (allocated, maximum) = parse_file_nr(&raw)?;
        sink.const_gauge(&self.allocated, allocated, &[])?;
        sink.const_gauge(&self.maximum, maximum, &[])?;
        Ok(())
    }
}

/// `file-nr` holds three fields: allocated, unused (always 0 since 2.6), max.
pub(crate) fn parse_file_nr(raw: &str) -> Result<(f64, f64)> {
    let fields: Vec<&str> = raw.split_whitespace().collect();
    if fields.len() != 3 {
        return Err(Error::ProcParse {
            path: PROC_FILE_NR.to_string(),
            reason: format!("expected 3 fields, got {}", fields.len()),
        });
    }
    let parse = |field: &str| -> Result<f64> {
        field.parse().map_err(|_| Error::ProcParse {
            path: PROC_FILE_NR.to_string(),
            reason: format!("non-numeric field '{field}'"),
        })
    };
    Ok((parse(fields[0])?, parse(fields[2])?))
}
