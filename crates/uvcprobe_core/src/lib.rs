//! # `uvcprobe_core` - Capability reports for USB video devices
//!
//! Takes the [`DeviceTree`](lsusb_tree::DeviceTree)s produced by
//! [`lsusb_tree`] and extracts what a USB Video Class device can stream:
//! formats, resolutions, frame rates and bit rates, as well as an estimate of
//! what the isochronous endpoints can carry.

use compact_str::CompactString;

pub mod decode;
pub mod report;
mod summary;

pub use report::EndpointInfo;
pub use report::Report;
pub use report::Resolution;
pub use report::VideoFormat;
pub use summary::Summary;

/// Errors from extracting a report out of a device tree
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReportError {
    #[error("Missing field {0}")]
    MissingField(&'static str),
    #[error("Invalid number for {0}: {1:?}")]
    InvalidNumber(CompactString, CompactString),
    #[error("Malformed wMaxPacketSize {0:?}: {1}")]
    MalformedPacketSize(CompactString, String),
    #[error("Malformed guidFormat {0:?}")]
    InvalidFourcc(CompactString),
    #[error("Frame descriptor {0} found before any format descriptor")]
    OrphanedFrame(CompactString),
}
