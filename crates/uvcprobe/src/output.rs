//! Writing device trees and reports

use std::io::Write;

use camino::Utf8Path;
use camino::Utf8PathBuf;
use eyre::WrapErr;
use lsusb_tree::DeviceTree;
use uvcprobe_core::Report;

/// Format of per-device report files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportFormat {
    Json,
    Yaml,
    /// Human readable summary
    Txt,
}

impl ReportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Txt => "txt",
        }
    }

    /// Render a report in this format
    pub fn render(self, report: &Report) -> eyre::Result<String> {
        Ok(match self {
            Self::Json => serde_json::to_string(report)?,
            Self::Yaml => serde_yaml::to_string(report)?,
            Self::Txt => report.summary().to_string(),
        })
    }
}

/// Write all device trees as one JSON array
pub fn write_trees(mut out: impl Write, devices: &[DeviceTree], pretty: bool) -> eyre::Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut out, devices)?;
    } else {
        serde_json::to_writer(&mut out, devices)?;
    }
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Write report files for each report in each format.
///
/// Returns the paths written.
pub fn write_reports(
    dir: &Utf8Path,
    reports: &[Report],
    formats: &[ReportFormat],
) -> eyre::Result<Vec<Utf8PathBuf>> {
    std::fs::create_dir_all(dir).wrap_err_with(|| format!("Failed to create {dir}"))?;
    let mut written = Vec::new();
    for report in reports {
        let base_name = report.base_name();
        for &format in formats {
            let path = dir.join(format!("{base_name}.{}", format.extension()));
            let contents = format
                .render(report)
                .wrap_err_with(|| format!("Failed to render report for {base_name}"))?;
            std::fs::write(&path, contents).wrap_err_with(|| format!("Failed to write {path}"))?;
            tracing::debug!(%path, "Wrote report");
            written.push(path);
        }
    }
    Ok(written)
}
