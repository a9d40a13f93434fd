//! Human readable rendering of reports

use std::fmt::Display;

use itertools::Itertools;

use crate::Report;

/// Plain text summary of a [`Report`], as written to `.txt` report files
#[derive(Debug, Clone, Copy)]
pub struct Summary<'report>(pub &'report Report);

impl Report {
    pub fn summary(&self) -> Summary<'_> {
        Summary(self)
    }
}

impl Display for Summary<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let report = self.0;
        writeln!(f, "{}", report.product_name())?;
        writeln!(f, "Vendor ID: {}", report.id_vendor)?;
        writeln!(f, "Product ID: {}", report.id_product)?;
        writeln!(f, "USB version: {}", report.bcd_usb)?;
        write!(f, "Endpoints:")?;
        let endpoints = report
            .endpoints
            .iter()
            .map(|ep| (ep.bitrate, ep.humanbitrate.as_str()))
            .sorted()
            .dedup();
        for (_, human) in endpoints {
            write!(f, " {human}")?;
        }
        writeln!(f)?;
        writeln!(f, "Formats:")?;
        for format in &report.formats {
            write!(f, "- {}", format.name)?;
            if let Some(fourcc) = &format.fourcc {
                write!(f, ", {fourcc}")?;
            }
            if let Some(bpp) = format.bpp {
                write!(f, ", {bpp}bpp")?;
            }
            writeln!(f)?;
            for resolution in &format.resolutions {
                match resolution.max_fps() {
                    Some(fps) => write!(f, "  {} @ {fps}fps", resolution.resolution)?,
                    None => write!(f, "  {} @ ?fps", resolution.resolution)?,
                }
                writeln!(f, " ~ {}", resolution.humanbitrate)?;
            }
        }
        Ok(())
    }
}
