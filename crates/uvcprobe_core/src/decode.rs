//! Decoding of individual descriptor fields

use std::str::FromStr;

use compact_str::CompactString;
use lsusb_tree::DeviceTree;
use lsusb_tree::Value;
use winnow::ModalResult;
use winnow::Parser;
use winnow::ascii::dec_uint;
use winnow::ascii::space1;
use winnow::combinator::trace;
use winnow::error::StrContext;
use winnow::error::StrContextValue;
use winnow::token::take_till;

use crate::ReportError;

/// Frame intervals are given in units of 100 ns
const TICKS_PER_SECOND: u32 = 10_000_000;

/// Transaction opportunities per second (one per high speed microframe)
const TRANSACTIONS_PER_SECOND: u64 = 8000;

/// Prefix of the discrete frame interval fields in frame descriptors
const FRAME_INTERVAL_PREFIX: &str = "dwFrameInterval";

/// Placeholder for fields that are missing
pub(crate) const UNKNOWN: &str = "?";

/// Format a bit rate for humans, rounding down.
///
/// ```
/// # use uvcprobe_core::decode::humanize;
/// assert_eq!(humanize(147_456_000), "147Mb/s");
/// assert_eq!(humanize(6_144_000), "6144Kb/s");
/// ```
pub fn humanize(bps: u64) -> String {
    if bps > 10_000_000 {
        format!("{}Mb/s", bps / 1_000_000)
    } else if bps > 10_000 {
        format!("{}Kb/s", bps / 1_000)
    } else {
        format!("{bps}b/s")
    }
}

/// Format a bit rate range, or a single bit rate if both ends are the same
pub fn humanize_range(min: u64, max: u64) -> String {
    if min == max {
        humanize(min)
    } else {
        format!("{}-{}", humanize(min), humanize(max))
    }
}

/// Convert a frame interval (in 100 ns units) to frames per second.
///
/// Returns `None` for an interval of zero.
pub fn frames_per_second(interval: u32) -> Option<u32> {
    if interval == 0 {
        return None;
    }
    let fps = (f64::from(TICKS_PER_SECOND) / f64::from(interval)).round_ties_even();
    Some(fps as u32)
}

/// Frame rates for all discrete frame intervals in a frame descriptor, in the
/// order they are listed.
pub fn frame_rates(frame: &DeviceTree) -> Result<Vec<u32>, ReportError> {
    frame
        .iter()
        .filter(|(key, _)| key.starts_with(FRAME_INTERVAL_PREFIX))
        .map(|(key, value)| {
            let text = match value {
                Value::Text(text) => text.as_str(),
                _ => "",
            };
            let interval = parse_number(key, text)?;
            frames_per_second(interval)
                .ok_or_else(|| ReportError::InvalidNumber(key.into(), text.into()))
        })
        .collect()
}

/// Get the FourCC out of a `guidFormat` field.
///
/// The GUID is printed as `{32595559-0000-0010-8000-00aa00389b71}`, where the
/// first group is the FourCC as a little endian number.
pub fn fourcc(guid: &str) -> Result<CompactString, ReportError> {
    [7, 5, 3, 1]
        .into_iter()
        .map(|start| {
            guid.get(start..start + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .map(char::from)
                .ok_or_else(|| ReportError::InvalidFourcc(guid.into()))
        })
        .collect()
}

/// Decoded `wMaxPacketSize` field, such as `0x1400  3x 1024 bytes`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketSize {
    /// Transactions per microframe
    pub transactions: u64,
    /// Bytes per transaction
    pub size: u64,
}

impl PacketSize {
    pub fn parse(field: &str) -> Result<Self, ReportError> {
        packet_size
            .parse(field.trim())
            .map_err(|error| {
                ReportError::MalformedPacketSize(field.into(), error.inner().to_string())
            })
    }

    /// Bytes per microframe
    pub fn bytes(&self) -> u64 {
        self.transactions.saturating_mul(self.size)
    }
}

fn packet_size(i: &mut &str) -> ModalResult<PacketSize> {
    let parser = (
        take_till(1.., [' ', '\t']).context(StrContext::Label("raw value")),
        space1,
        dec_uint::<_, u64, _>.context(StrContext::Label("multiplier")),
        'x'.context(StrContext::Expected(StrContextValue::CharLiteral('x'))),
        space1,
        dec_uint::<_, u64, _>.context(StrContext::Label("size")),
        space1,
        "bytes".context(StrContext::Expected(StrContextValue::StringLiteral("bytes"))),
    )
        .map(|(_, _, transactions, _, _, size, _, _)| PacketSize { transactions, size });
    trace("packet_size", parser).parse_next(i)
}

/// Estimate the bit rate an endpoint can carry.
///
/// This is the theoretical maximum: full packets in every microframe, with
/// burst and mult (USB 3) taken into account.
pub fn estimate_bitrate(endpoint: &DeviceTree) -> Result<u64, ReportError> {
    let field = endpoint.text("wMaxPacketSize").unwrap_or(UNKNOWN);
    let mut bytes = PacketSize::parse(field)?.bytes();
    if let Some(burst) = optional_number::<u64>(endpoint, "bMaxBurst")? {
        bytes = bytes.saturating_mul(burst.saturating_add(1));
    }
    if let Some(mult) = optional_number::<u64>(endpoint, "Mult")? {
        bytes = bytes.saturating_mul(mult.saturating_add(1));
    }
    Ok(bytes
        .saturating_mul(TRANSACTIONS_PER_SECOND)
        .saturating_mul(8))
}

/// Get a required numeric field
pub(crate) fn number<T: FromStr>(tree: &DeviceTree, key: &'static str) -> Result<T, ReportError> {
    let text = tree.text(key).ok_or(ReportError::MissingField(key))?;
    parse_number(key, text)
}

/// Get an optional numeric field
pub(crate) fn optional_number<T: FromStr>(
    tree: &DeviceTree,
    key: &'static str,
) -> Result<Option<T>, ReportError> {
    tree.text(key).map(|text| parse_number(key, text)).transpose()
}

fn parse_number<T: FromStr>(key: &str, text: &str) -> Result<T, ReportError> {
    text.parse()
        .map_err(|_| ReportError::InvalidNumber(key.into(), text.into()))
}
