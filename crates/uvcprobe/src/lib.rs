//! Command line front end for [`lsusb_tree`] and [`uvcprobe_core`]

use eyre::WrapErr;
use lsusb_tree::DeviceTree;
use lsusb_tree::Schema;
use rayon::prelude::*;
use uvcprobe_core::Report;

pub mod cli;
pub mod output;

/// Parse all devices in an `lsusb -v` dump, in parallel.
///
/// Devices are returned in input order. Any failure aborts the whole parse,
/// and the error reported is that of the earliest failing device.
pub fn parse_devices(input: &str, schema: &Schema) -> eyre::Result<Vec<DeviceTree>> {
    let blocks: Vec<&str> = lsusb_tree::split_devices(input).collect();
    tracing::debug!(count = blocks.len(), "Split input into device blocks");
    let results: Vec<eyre::Result<DeviceTree>> = blocks
        .par_iter()
        .map(|block| {
            lsusb_tree::parse_device(block, schema).wrap_err_with(|| {
                format!(
                    "Failed to parse device: {}",
                    block.lines().next().unwrap_or_default()
                )
            })
        })
        .collect();
    results.into_iter().collect()
}

/// Build reports for all video devices, in input order
pub fn build_reports(devices: &[DeviceTree]) -> eyre::Result<Vec<Report>> {
    let results: Vec<eyre::Result<Option<Report>>> = devices
        .par_iter()
        .map(|device| {
            Report::from_tree(device).wrap_err_with(|| {
                let field = |key: &str| {
                    device
                        .tree("Device Descriptor")
                        .and_then(|descriptor| descriptor.text(key))
                        .unwrap_or("?")
                };
                format!(
                    "Failed to build report for device {} {}",
                    field("idVendor"),
                    field("idProduct")
                )
            })
        })
        .collect();
    let reports: Vec<Option<Report>> = results.into_iter().collect::<eyre::Result<_>>()?;
    Ok(reports.into_iter().flatten().collect())
}
