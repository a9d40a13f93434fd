//! Knowledge about the descriptor groups lsusb can print

use ahash::AHashMap;
use compact_str::CompactString;

/// How many times a descriptor group may occur among its siblings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arity {
    /// At most once, stored as a nested tree
    Single,
    /// Any number of times, stored as a list of trees
    Multiple,
}

/// Descriptor groups with their arity, and the quirks of the lsusb output.
///
/// The default schema ([`Schema::lsusb`]) is derived from observed output of
/// lsusb from usbutils. Other versions of lsusb may print groups not listed
/// here, in which case parsing fails with
/// [`ParseError::UnknownGroup`](crate::ParseError::UnknownGroup).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    groups: AHashMap<CompactString, Arity>,
    /// Bit field headers. These have the raw value on the header line and the
    /// decoded bits indented below.
    bitmask_prefixes: Vec<CompactString>,
    /// Headers whose indented lines are not part of the structure
    discard_children_prefixes: Vec<CompactString>,
    /// Lines containing any of these are ignored
    noise_markers: Vec<CompactString>,
}

impl Default for Schema {
    fn default() -> Self {
        Self::lsusb()
    }
}

impl Schema {
    /// A schema without any groups or quirks
    pub fn empty() -> Self {
        Self {
            groups: AHashMap::new(),
            bitmask_prefixes: Vec::new(),
            discard_children_prefixes: Vec::new(),
            noise_markers: Vec::new(),
        }
    }

    /// Schema for the output of `lsusb -v`
    pub fn lsusb() -> Self {
        use Arity::Multiple;
        use Arity::Single;

        let groups = [
            ("Device Descriptor", Single),
            ("Configuration Descriptor", Multiple),
            ("Interface Descriptor", Multiple),
            ("Endpoint Descriptor", Multiple),
            ("Hub Descriptor", Single),
            // Printed with a single space of indentation
            (" Hub Port Status", Single),
            ("Binary Object Store Descriptor", Single),
            ("USB 2.0 Extension Device Capability", Single),
            ("SuperSpeed USB Device Capability", Single),
            ("SuperSpeedPlus USB Device Capability", Single),
            ("Container ID Device Capability", Single),
            ("Interface Association", Multiple),
            ("VideoControl Interface Descriptor", Multiple),
            ("VideoStreaming Interface Descriptor", Multiple),
            ("AudioControl Interface Descriptor", Multiple),
            ("AudioStreaming Interface Descriptor", Multiple),
            ("AudioStreaming Endpoint Descriptor", Multiple),
            ("Device Qualifier (for other device speed)", Single),
            ("CDC Header", Single),
            ("CDC Union", Single),
            ("CDC Ethernet", Single),
        ];

        let mut schema = groups
            .into_iter()
            .fold(Self::empty(), |schema, (name, arity)| {
                schema.with_group(name, arity)
            });
        for prefix in [
            "bm",
            "wHubCharacteristic",
            "wSpeedsSupported",
            "bFunctionalitySupport",
            "Device Status:",
            "bFlags",
            "wChannelConfig",
        ] {
            schema = schema.with_bitmask_prefix(prefix);
        }
        schema
            .with_discard_children_prefix("iInterface")
            .with_noise_marker("Warning: Descriptor too short")
    }

    /// Add (or replace) a descriptor group
    pub fn with_group(mut self, name: impl Into<CompactString>, arity: Arity) -> Self {
        self.groups.insert(name.into(), arity);
        self
    }

    /// Add a prefix of headers that are bit fields
    pub fn with_bitmask_prefix(mut self, prefix: impl Into<CompactString>) -> Self {
        self.bitmask_prefixes.push(prefix.into());
        self
    }

    /// Add a prefix of headers whose indented lines should be ignored
    pub fn with_discard_children_prefix(mut self, prefix: impl Into<CompactString>) -> Self {
        self.discard_children_prefixes.push(prefix.into());
        self
    }

    /// Add a marker for lines to ignore
    pub fn with_noise_marker(mut self, marker: impl Into<CompactString>) -> Self {
        self.noise_markers.push(marker.into());
        self
    }

    /// Look up the arity of a group (name without trailing colon)
    pub fn arity(&self, name: &str) -> Option<Arity> {
        self.groups.get(name).copied()
    }

    /// Get the bitmask prefix that `header` starts with, if any
    pub fn bitmask_prefix(&self, header: &str) -> Option<&str> {
        self.bitmask_prefixes
            .iter()
            .map(CompactString::as_str)
            .find(|prefix| header.starts_with(*prefix))
    }

    /// Should the lines indented below `header` be ignored?
    pub fn discards_children(&self, header: &str) -> bool {
        self.discard_children_prefixes
            .iter()
            .any(|prefix| header.starts_with(prefix.as_str()))
    }

    /// Is this line noise that should be ignored?
    pub fn is_noise(&self, line: &str) -> bool {
        self.noise_markers
            .iter()
            .any(|marker| line.contains(marker.as_str()))
    }
}
