//! Extract capability reports from device trees

use compact_str::CompactString;
use compact_str::format_compact;
use lsusb_tree::DeviceTree;
use serde::Serialize;

use crate::ReportError;
use crate::decode;
use crate::decode::UNKNOWN;

/// Subclass of the interfaces that carry video
const VIDEO_STREAMING: &str = "2 Video Streaming";

/// What a USB video device can stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    #[serde(rename = "idVendor")]
    pub id_vendor: CompactString,
    #[serde(rename = "idProduct")]
    pub id_product: CompactString,
    #[serde(rename = "iProduct")]
    pub i_product: CompactString,
    #[serde(rename = "bcdUSB")]
    pub bcd_usb: CompactString,
    pub formats: Vec<VideoFormat>,
    pub endpoints: Vec<EndpointInfo>,
}

/// A pixel format with the resolutions it is offered in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoFormat {
    /// Such as `MJPEG` or `UNCOMPRESSED`
    pub name: CompactString,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fourcc: Option<CompactString>,
    /// Bits per pixel
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bpp: Option<u32>,
    pub resolutions: Vec<Resolution>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub w: u32,
    pub h: u32,
    /// `WxH`
    pub resolution: CompactString,
    pub humanbitrate: String,
    pub minbps: u64,
    pub maxbps: u64,
    /// Frame rates in the order the device lists them
    pub fps: Vec<u32>,
}

/// An endpoint of a video streaming interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointInfo {
    pub interval: CompactString,
    pub maxburst: CompactString,
    pub mult: CompactString,
    pub packet: CompactString,
    /// Estimated maximum bit rate
    pub bitrate: u64,
    pub humanbitrate: String,
}

impl Report {
    /// Build a report for a device.
    ///
    /// Returns `Ok(None)` if the device has no video streaming interface in
    /// its first configuration.
    pub fn from_tree(device: &DeviceTree) -> Result<Option<Self>, ReportError> {
        let Some(descriptor) = device.tree("Device Descriptor") else {
            tracing::debug!("No device descriptor, skipping");
            return Ok(None);
        };
        let Some(config) = descriptor.list("Configuration Descriptor").first() else {
            tracing::debug!(
                device = descriptor.text("idVendor").unwrap_or(UNKNOWN),
                "No configuration descriptor, skipping"
            );
            return Ok(None);
        };
        let interfaces: Vec<_> = config
            .list("Interface Descriptor")
            .iter()
            .filter(|interface| interface.text("bInterfaceSubClass") == Some(VIDEO_STREAMING))
            .collect();
        if interfaces.is_empty() {
            tracing::debug!(
                vendor = descriptor.text("idVendor").unwrap_or(UNKNOWN),
                product = descriptor.text("idProduct").unwrap_or(UNKNOWN),
                "Not a video device, skipping"
            );
            return Ok(None);
        }

        let mut report = Self {
            id_vendor: identity(descriptor, "idVendor")?,
            id_product: identity(descriptor, "idProduct")?,
            i_product: identity(descriptor, "iProduct")?,
            bcd_usb: identity(descriptor, "bcdUSB")?,
            formats: Vec::new(),
            endpoints: Vec::new(),
        };
        for interface in interfaces {
            report.add_interface(interface)?;
        }
        Ok(Some(report))
    }

    fn add_interface(&mut self, interface: &DeviceTree) -> Result<(), ReportError> {
        for descriptor in interface.list("VideoStreaming Interface Descriptor") {
            if descriptor.contains_key("bFormatIndex") {
                self.formats.push(VideoFormat::from_descriptor(descriptor)?);
            }
            if descriptor.contains_key("bFrameIndex") {
                // Frames belong to the last format seen, even across
                // alternate settings.
                let format = self.formats.last_mut().ok_or_else(|| {
                    ReportError::OrphanedFrame(
                        descriptor
                            .text("bFrameIndex")
                            .unwrap_or(UNKNOWN)
                            .into(),
                    )
                })?;
                format
                    .resolutions
                    .push(Resolution::from_descriptor(descriptor)?);
            }
        }
        for endpoint in interface.list("Endpoint Descriptor") {
            self.endpoints.push(EndpointInfo::from_descriptor(endpoint)?);
        }
        Ok(())
    }

    /// Base name (without extension) of report files for this device, such
    /// as `0x046d_0x0825_USB2.00`
    pub fn base_name(&self) -> String {
        format!(
            "{}_{}_USB{}",
            first_token(&self.id_vendor),
            first_token(&self.id_product),
            self.bcd_usb
        )
    }

    /// Product name without the string descriptor index
    pub fn product_name(&self) -> &str {
        self.i_product
            .split_once(' ')
            .map_or(self.i_product.as_str(), |(_, name)| name)
    }
}

impl VideoFormat {
    fn from_descriptor(descriptor: &DeviceTree) -> Result<Self, ReportError> {
        let subtype = descriptor
            .text("bDescriptorSubtype")
            .ok_or(ReportError::MissingField("bDescriptorSubtype"))?;
        let fourcc = descriptor
            .text("guidFormat")
            .map(decode::fourcc)
            .transpose()?;
        Ok(Self {
            name: format_name(subtype)?,
            fourcc,
            bpp: decode::optional_number(descriptor, "bBitsPerPixel")?,
            resolutions: Vec::new(),
        })
    }
}

/// Get the format name out of a subtype such as `4 (FORMAT_UNCOMPRESSED)`
fn format_name(subtype: &str) -> Result<CompactString, ReportError> {
    let token = subtype
        .split_whitespace()
        .nth(1)
        .ok_or(ReportError::MissingField("bDescriptorSubtype"))?;
    let token = token
        .strip_prefix(['(', '[', '{', '<'])
        .unwrap_or(token);
    let token = token
        .strip_suffix([')', ']', '}', '>'])
        .unwrap_or(token);
    Ok(token.strip_prefix("FORMAT_").unwrap_or(token).into())
}

impl Resolution {
    fn from_descriptor(descriptor: &DeviceTree) -> Result<Self, ReportError> {
        let minbps = decode::number(descriptor, "dwMinBitRate")?;
        let maxbps = decode::number(descriptor, "dwMaxBitRate")?;
        Ok(Self {
            w: decode::number(descriptor, "wWidth")?,
            h: decode::number(descriptor, "wHeight")?,
            resolution: format_compact!(
                "{}x{}",
                descriptor.text("wWidth").unwrap_or(UNKNOWN),
                descriptor.text("wHeight").unwrap_or(UNKNOWN)
            ),
            humanbitrate: decode::humanize_range(minbps, maxbps),
            minbps,
            maxbps,
            fps: decode::frame_rates(descriptor)?,
        })
    }

    /// Highest frame rate, if any
    pub fn max_fps(&self) -> Option<u32> {
        self.fps.iter().copied().max()
    }
}

impl EndpointInfo {
    fn from_descriptor(endpoint: &DeviceTree) -> Result<Self, ReportError> {
        let field = |key: &str| -> CompactString { endpoint.text(key).unwrap_or(UNKNOWN).into() };
        let bitrate = decode::estimate_bitrate(endpoint)?;
        Ok(Self {
            interval: field("bInterval"),
            maxburst: field("bMaxBurst"),
            mult: field("Mult"),
            packet: field("wMaxPacketSize"),
            bitrate,
            humanbitrate: decode::humanize(bitrate),
        })
    }
}

fn identity(descriptor: &DeviceTree, key: &'static str) -> Result<CompactString, ReportError> {
    descriptor
        .text(key)
        .map(Into::into)
        .ok_or(ReportError::MissingField(key))
}

fn first_token(value: &str) -> &str {
    value.split_whitespace().next().unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use lsusb_tree::Schema;
    use pretty_assertions::assert_eq;

    fn device(input: &str) -> DeviceTree {
        lsusb_tree::parse_device(input, &Schema::lsusb()).unwrap()
    }

    const MINIMAL: &str = indoc! {"
        Bus 001 Device 004: ID 1234:5678 Test Camera
        Device Descriptor:
          bcdUSB               2.00
          idVendor           0x1234 Test Vendor
          idProduct          0x5678 Test Camera
          iProduct                2 Test Camera
          Configuration Descriptor:
            Interface Descriptor:
              bInterfaceNumber        1
              bInterfaceSubClass      2 Video Streaming
              VideoStreaming Interface Descriptor:
                bDescriptorSubtype                  4 (FORMAT_UNCOMPRESSED)
                bFormatIndex                        1
              VideoStreaming Interface Descriptor:
                bDescriptorSubtype                  5 (FRAME_UNCOMPRESSED)
                bFrameIndex                         1
                wWidth                            640
                wHeight                           480
                dwMinBitRate                 10000000
                dwMaxBitRate                 10000000
                dwFrameInterval( 0)            333333
    "};

    #[test]
    fn test_end_to_end() {
        let report = Report::from_tree(&device(MINIMAL)).unwrap().unwrap();
        assert_eq!(
            report,
            Report {
                id_vendor: "0x1234 Test Vendor".into(),
                id_product: "0x5678 Test Camera".into(),
                i_product: "2 Test Camera".into(),
                bcd_usb: "2.00".into(),
                formats: vec![VideoFormat {
                    name: "UNCOMPRESSED".into(),
                    fourcc: None,
                    bpp: None,
                    resolutions: vec![Resolution {
                        w: 640,
                        h: 480,
                        resolution: "640x480".into(),
                        humanbitrate: "10000Kb/s".into(),
                        minbps: 10_000_000,
                        maxbps: 10_000_000,
                        fps: vec![30],
                    }],
                }],
                endpoints: vec![],
            }
        );
        assert_eq!(report.base_name(), "0x1234_0x5678_USB2.00");
        assert_eq!(report.product_name(), "Test Camera");
    }

    #[test]
    fn test_end_to_end_ten_megabit() {
        let input = MINIMAL.replace("10000000", "10000001");
        let report = Report::from_tree(&device(&input)).unwrap().unwrap();
        let resolution = &report.formats[0].resolutions[0];
        assert_eq!(resolution.humanbitrate, "10Mb/s");
        assert_eq!(resolution.fps, vec![30]);
    }

    #[test]
    fn test_serialize() {
        let report = Report::from_tree(&device(MINIMAL)).unwrap().unwrap();
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            serde_json::json!({
                "idVendor": "0x1234 Test Vendor",
                "idProduct": "0x5678 Test Camera",
                "iProduct": "2 Test Camera",
                "bcdUSB": "2.00",
                "formats": [{
                    "name": "UNCOMPRESSED",
                    "resolutions": [{
                        "w": 640,
                        "h": 480,
                        "resolution": "640x480",
                        "humanbitrate": "10000Kb/s",
                        "minbps": 10000000,
                        "maxbps": 10000000,
                        "fps": [30],
                    }],
                }],
                "endpoints": [],
            })
        );
    }

    #[test]
    fn test_not_a_video_device() {
        let input = MINIMAL.replace("2 Video Streaming", "1 Video Control");
        assert_eq!(Report::from_tree(&device(&input)).unwrap(), None);
    }

    #[test]
    fn test_no_configuration() {
        let input = indoc! {"
            Bus 001 Device 001: ID 1d6b:0002
            Device Descriptor:
              idVendor           0x1d6b Linux Foundation
        "};
        assert_eq!(Report::from_tree(&device(input)).unwrap(), None);
        assert_eq!(Report::from_tree(&DeviceTree::default()).unwrap(), None);
    }

    #[test]
    fn test_missing_identity() {
        let input = MINIMAL.replace("  bcdUSB               2.00\n", "");
        assert_eq!(
            Report::from_tree(&device(&input)),
            Err(ReportError::MissingField("bcdUSB"))
        );
    }

    #[test]
    fn test_orphaned_frame() {
        let input = indoc! {"
            Bus 001 Device 004: ID 1234:5678
            Device Descriptor:
              bcdUSB               2.00
              idVendor           0x1234
              idProduct          0x5678
              iProduct                0
              Configuration Descriptor:
                Interface Descriptor:
                  bInterfaceSubClass      2 Video Streaming
                  VideoStreaming Interface Descriptor:
                    bFrameIndex                         3
                    wWidth                            640
        "};
        assert_eq!(
            Report::from_tree(&device(input)),
            Err(ReportError::OrphanedFrame("3".into()))
        );
    }

    #[test]
    fn test_format_and_frame_in_one_descriptor() {
        let input = indoc! {"
            Bus 001 Device 004: ID 1234:5678
            Device Descriptor:
              bcdUSB               2.00
              idVendor           0x1234
              idProduct          0x5678
              iProduct                0
              Configuration Descriptor:
                Interface Descriptor:
                  bInterfaceSubClass      2 Video Streaming
                  VideoStreaming Interface Descriptor:
                    bDescriptorSubtype                  6 (FORMAT_MJPEG)
                    bFormatIndex                        1
                    bFrameIndex                         1
                    wWidth                            640
                    wHeight                           480
                    dwMinBitRate                 24576000
                    dwMaxBitRate                 24576000
                    dwFrameInterval( 0)            333333
        "};
        let report = Report::from_tree(&device(input)).unwrap().unwrap();
        assert_eq!(report.formats.len(), 1);
        assert_eq!(report.formats[0].name, "MJPEG");
        let resolutions: Vec<_> = report.formats[0]
            .resolutions
            .iter()
            .map(|r| (r.resolution.as_str(), r.fps.clone()))
            .collect();
        assert_eq!(resolutions, vec![("640x480", vec![30])]);
    }

    #[test]
    fn test_invalid_width() {
        let input = MINIMAL.replace("wWidth                            640", "wWidth  wide");
        assert_eq!(
            Report::from_tree(&device(&input)),
            Err(ReportError::InvalidNumber("wWidth".into(), "wide".into()))
        );
    }

    #[test]
    fn test_format_name() {
        assert_eq!(format_name("4 (FORMAT_UNCOMPRESSED)").unwrap(), "UNCOMPRESSED");
        assert_eq!(format_name("6 (FORMAT_MJPEG)").unwrap(), "MJPEG");
        assert_eq!(format_name("16 (FORMAT_FRAME_BASED)").unwrap(), "FRAME_BASED");
        assert_eq!(format_name("4 FORMAT_UNCOMPRESSED").unwrap(), "UNCOMPRESSED");
        assert_eq!(
            format_name("4"),
            Err(ReportError::MissingField("bDescriptorSubtype"))
        );
    }

    #[test]
    fn test_endpoint_defaults() {
        let input = indoc! {"
            Bus 001 Device 004
            Endpoint Descriptor:
              bEndpointAddress     0x81  EP 1 IN
              wMaxPacketSize     0x1400  3x 1024 bytes
        "};
        let tree = device(input);
        let endpoint = EndpointInfo::from_descriptor(&tree.list("Endpoint Descriptor")[0]).unwrap();
        assert_eq!(
            endpoint,
            EndpointInfo {
                interval: "?".into(),
                maxburst: "?".into(),
                mult: "?".into(),
                packet: "0x1400  3x 1024 bytes".into(),
                bitrate: 196_608_000,
                humanbitrate: "196Mb/s".into(),
            }
        );
    }

    #[test]
    fn test_max_fps() {
        let mut resolution = Resolution {
            w: 1,
            h: 1,
            resolution: "1x1".into(),
            humanbitrate: String::new(),
            minbps: 0,
            maxbps: 0,
            fps: vec![15, 30, 5],
        };
        assert_eq!(resolution.max_fps(), Some(30));
        resolution.fps.clear();
        assert_eq!(resolution.max_fps(), None);
    }
}
