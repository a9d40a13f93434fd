//! Parser for the verbose output of `lsusb -v`
//!
//! The output of `lsusb -v` has no formal grammar. It is a dump meant for
//! humans, where the structure is conveyed by two-space indentation:
//!
//! ```text
//! Bus 001 Device 003: ID 046d:0825 Logitech, Inc. Webcam C270
//! Device Descriptor:
//!   bLength                18
//!   idVendor           0x046d Logitech, Inc.
//!   Configuration Descriptor:
//!     bmAttributes         0x80
//!       (Bus Powered)
//! ```
//!
//! Parsing is done in two steps:
//! 1. [`partition`] groups lines into [`Node`]s based on indentation only.
//! 2. The nodes are turned into a [`DeviceTree`], using a [`Schema`] that knows
//!    which descriptor groups may repeat.
//!
//! Use [`parse_dump`] or [`split_devices`] + [`parse_device`] for the whole
//! pipeline.

use compact_str::CompactString;

mod partition;
pub mod schema;
mod tree;

pub use partition::Node;
pub use partition::partition;
pub use schema::Arity;
pub use schema::Schema;
pub use tree::DeviceTree;
pub use tree::RAW_VALUE;
pub use tree::Value;
pub use tree::build_tree;

/// Errors from parsing `lsusb -v` output
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseError {
    #[error("Device record does not start with a 'Bus' line: {0:?}")]
    MissingBusLine(CompactString),
    #[error("Unknown descriptor group: {0:?}")]
    UnknownGroup(CompactString),
    #[error("Duplicate single-valued field: {0:?}")]
    DuplicateKey(CompactString),
    #[error("Unexpected indentation at: {0:?}")]
    UnexpectedIndent(CompactString),
}

/// Split a full dump into the text blocks for each device.
///
/// Devices are separated by blank lines. Blocks that are empty after trimming
/// are skipped.
pub fn split_devices(input: &str) -> impl Iterator<Item = &str> {
    input
        .split("\n\n")
        .map(str::trim)
        .filter(|block| !block.is_empty())
}

/// Parse the text block of a single device into a tree.
///
/// The first line (after removing noise lines) must be the `Bus ...` identity
/// line. It is not part of the resulting tree.
pub fn parse_device(block: &str, schema: &Schema) -> Result<DeviceTree, ParseError> {
    let lines: Vec<&str> = block
        .lines()
        .filter(|line| {
            let noise = schema.is_noise(line);
            if noise {
                tracing::debug!("Dropping noise line: {:?}", line.trim());
            }
            !noise
        })
        .collect();

    let Some((first, rest)) = lines.split_first() else {
        return Err(ParseError::MissingBusLine(CompactString::default()));
    };
    if !first.starts_with("Bus") {
        return Err(ParseError::MissingBusLine((*first).into()));
    }
    tracing::trace!(device = *first, "Parsing device");
    let nodes = partition(rest, schema)?;
    build_tree(&nodes, schema)
}

/// Parse every device in a dump, in input order.
///
/// Stops at the first device that fails to parse.
pub fn parse_dump(input: &str, schema: &Schema) -> Result<Vec<DeviceTree>, ParseError> {
    split_devices(input)
        .map(|block| parse_device(block, schema))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_devices() {
        let input = "Bus 001\nDevice Descriptor:\n  bLength  18\n\nBus 002\n\n\n\nBus 003\n";
        let blocks: Vec<_> = split_devices(input).collect();
        assert_eq!(
            blocks,
            vec!["Bus 001\nDevice Descriptor:\n  bLength  18", "Bus 002", "Bus 003"]
        );
        assert_eq!(split_devices("\n\n  \n\n").count(), 0);
    }

    #[test]
    fn test_parse_device() {
        let input = indoc! {"
            Bus 001 Device 002: ID 1234:5678 Some device
            Device Descriptor:
              bLength                18
              idVendor           0x1234 Some vendor
            Device Status:     0x0000
              (Bus Powered)
        "};
        let tree = parse_device(input, &Schema::lsusb()).unwrap();
        let descriptor = tree.tree("Device Descriptor").unwrap();
        assert_eq!(descriptor.text("bLength"), Some("18"));
        assert_eq!(descriptor.text("idVendor"), Some("0x1234 Some vendor"));
        let status = tree.tree("Device").unwrap();
        assert_eq!(status.text("raw_value"), Some("Status:     0x0000"));
        assert_eq!(status.get("(Bus Powered)"), Some(&Value::Flag));
    }

    #[test]
    fn test_parse_device_drops_noise() {
        let input = indoc! {"
            Bus 001 Device 002: ID 1234:5678 Some device
            Device Descriptor:
              bLength                18
                Warning: Descriptor too short
              bNumConfigurations      1
        "};
        let tree = parse_device(input, &Schema::lsusb()).unwrap();
        let descriptor = tree.tree("Device Descriptor").unwrap();
        assert_eq!(
            descriptor.iter().map(|(k, _)| k).collect::<Vec<_>>(),
            vec!["bLength", "bNumConfigurations"]
        );
    }

    #[test]
    fn test_parse_device_noise_before_bus_line() {
        let input = "Warning: Descriptor too short\nBus 001 Device 002: ID 1234:5678\n";
        let tree = parse_device(input, &Schema::lsusb()).unwrap();
        assert!(tree.is_empty());
    }

    #[test]
    fn test_parse_device_missing_bus_line() {
        let input = "Device Descriptor:\n  bLength  18\n";
        assert_eq!(
            parse_device(input, &Schema::lsusb()),
            Err(ParseError::MissingBusLine("Device Descriptor:".into()))
        );
        assert_eq!(
            parse_device("", &Schema::lsusb()),
            Err(ParseError::MissingBusLine("".into()))
        );
    }

    #[test]
    fn test_parse_dump_stops_at_first_error() {
        let input = indoc! {"
            Bus 001 Device 001: ID 1d6b:0002
            Device Descriptor:
              bLength                18

            Bus 001 Device 002: ID 1234:5678
            Mystery Descriptor:
              bLength                 9
        "};
        assert_eq!(
            parse_dump(input, &Schema::lsusb()),
            Err(ParseError::UnknownGroup("Mystery Descriptor".into()))
        );
    }
}
